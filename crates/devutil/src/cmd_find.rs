use std::io::Write;

use anyhow::Result;
use device_catalog::Catalog;
use device_xml::{fields, DeviceRecord};
use serde::Serialize;
use tracing::{debug, info};

use crate::common::{self, ABSENT, RULE};

#[derive(Serialize)]
struct FoundDevice<'a> {
    serial: &'a str,
    fields: &'a DeviceRecord,
}

pub fn run<W: Write>(catalog: &Catalog, serial: &str, json: bool, out: &mut W) -> Result<()> {
    let found = catalog.find(serial);
    info!(serial, found = found.is_some(), "device lookup");

    if json {
        let payload = found.map(|record| FoundDevice {
            serial,
            fields: record,
        });
        return common::print_json(&payload, out);
    }

    match found {
        Some(record) => print_record(serial, record, out),
        None => {
            debug!(serial, "serial number not in catalog");
            writeln!(out, "Device not found.")?;
            Ok(())
        }
    }
}

/// Render a single device as a one-row table.
pub fn print_record<W: Write>(serial: &str, record: &DeviceRecord, out: &mut W) -> Result<()> {
    let field = |key: &str| record.get(key).unwrap_or(ABSENT);
    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        "{:<20} {:<20} {:<20} {:<20} {:<10} {:<10} {:<10} {}",
        "Serial Number", "IP Address", "Device Name", "Model Name", "Type", "Port", "SSL", "Password"
    )?;
    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        "{:<20} {:<20} {:<20} {:<20} {:<10} {:<10} {:<10} {}",
        serial,
        field(fields::ADDRESS),
        field(fields::DEV_NAME),
        field(fields::MODEL_NAME),
        field(fields::TYPE),
        field(fields::COMM_PORT_NO),
        field(fields::COMM_USE_SSL),
        field(fields::COMM_PASSWORD),
    )?;
    writeln!(out, "{RULE}")?;
    Ok(())
}
