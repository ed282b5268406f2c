//! Interactive menu driving list and search against a loaded catalog.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use device_catalog::Catalog;
use tracing::debug;

use crate::{cmd_find, cmd_list};

const MENU: &str = "\nPlease select an option:\n\
                    [1] Show all devices\n\
                    [2] Search devices by serial number\n\
                    [3] Exit";

/// Run the menu until the user exits or input ends.
pub fn run<R: BufRead, W: Write>(catalog: &Catalog, mut input: R, out: &mut W) -> Result<()> {
    loop {
        writeln!(out, "{MENU}")?;
        out.flush()?;
        let Some(choice) = read_line(&mut input)? else {
            break;
        };
        debug!(choice = %choice, "menu selection");

        match choice.as_str() {
            "1" => cmd_list::print_table(catalog, out)?,
            "2" => {
                write!(out, "Enter serial number of the device: ")?;
                out.flush()?;
                let Some(serial) = read_line(&mut input)? else {
                    break;
                };
                match catalog.find(&serial) {
                    Some(record) => cmd_find::print_record(&serial, record, out)?,
                    None => writeln!(out, "Device not found.")?,
                }
            }
            "3" => break,
            _ => writeln!(
                out,
                "Error: Invalid input. Please choose from the above options."
            )?,
        }
    }
    writeln!(out, "Program terminated.")?;
    Ok(())
}

/// Next trimmed line, or `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
