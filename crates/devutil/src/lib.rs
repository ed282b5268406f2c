//! Building blocks of the `devutil` console utility.

pub mod cmd_find;
pub mod cmd_list;
pub mod common;
pub mod shell;
