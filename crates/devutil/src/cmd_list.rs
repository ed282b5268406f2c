use std::io::Write;

use anyhow::Result;
use device_catalog::Catalog;
use device_xml::{fields, DeviceRecord};
use serde::Serialize;
use tracing::info;

use crate::common::{self, ABSENT, RULE};

#[derive(Serialize)]
struct DeviceEntry<'a> {
    ordinal: usize,
    serial: &'a str,
    fields: &'a DeviceRecord,
}

pub fn run<W: Write>(catalog: &Catalog, json: bool, out: &mut W) -> Result<()> {
    info!(count = catalog.len(), "listing devices");

    if json {
        let entries: Vec<DeviceEntry<'_>> = catalog
            .list_all()
            .map(|entry| DeviceEntry {
                ordinal: entry.ordinal,
                serial: entry.serial,
                fields: entry.record,
            })
            .collect();
        return common::print_json(&entries, out);
    }

    print_table(catalog, out)
}

/// Render every catalog entry as one table row.
pub fn print_table<W: Write>(catalog: &Catalog, out: &mut W) -> Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        "{:<5} {:<20} {:<20} {:<20} {:<20} {:<10} {:<10} {:<10} {}",
        "No",
        "Serial Number",
        "IP Address",
        "Device Name",
        "Model Name",
        "Type",
        "Port",
        "SSL",
        "Password"
    )?;
    writeln!(out, "{RULE}")?;
    for entry in catalog.list_all() {
        let field = |key: &str| entry.record.get(key).unwrap_or(ABSENT);
        writeln!(
            out,
            "{:<5} {:<20} {:<20} {:<20} {:<20} {:<10} {:<10} {:<10} {}",
            entry.ordinal,
            entry.serial,
            field(fields::ADDRESS),
            field(fields::DEV_NAME),
            field(fields::MODEL_NAME),
            field(fields::TYPE),
            field(fields::COMM_PORT_NO),
            field(fields::COMM_USE_SSL),
            field(fields::COMM_PASSWORD),
        )?;
    }
    writeln!(out, "{RULE}")?;
    Ok(())
}
