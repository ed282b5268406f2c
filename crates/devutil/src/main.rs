use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use device_catalog::Ingest;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use devutil::{cmd_find, cmd_list, common, shell};

#[derive(Parser, Debug)]
#[command(name = "devutil", version, about = "Device inventory console utility")]
struct Cli {
    /// Device inventory XML file
    file: PathBuf,
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long)]
    json: bool,
    /// Defaults to the interactive menu
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Cmd {
    /// Show all devices
    List,
    /// Search a device by serial number
    Find { serial: String },
    /// Interactive menu
    Shell,
}

fn main() -> Result<()> {
    let Cli {
        file,
        verbose,
        json,
        cmd,
    } = Cli::parse();

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let Ingest { catalog, rejected } = common::load_catalog(&file)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(rejection) = &rejected {
        common::report_rejection(rejection, &mut out)?;
    }
    if catalog.is_empty() {
        warn!(path = %file.display(), "no devices loaded");
    }

    match cmd.unwrap_or(Cmd::Shell) {
        Cmd::List => cmd_list::run(&catalog, json, &mut out)?,
        Cmd::Find { serial } => cmd_find::run(&catalog, serial.trim(), json, &mut out)?,
        Cmd::Shell => shell::run(&catalog, io::stdin().lock(), &mut out)?,
    }

    Ok(())
}
