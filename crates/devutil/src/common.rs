use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use device_catalog::{Catalog, CatalogError, Ingest, Rejection, Validator};
use serde::Serialize;
use tracing::info;

/// Horizontal rule framing the device tables.
pub const RULE: &str = "-------------------------------------------------------------------------------------------------------------------------------------------";

/// Rendered in place of a field the record does not carry.
pub const ABSENT: &str = "-";

/// Ensure `path` names an existing file with an `.xml` extension.
pub fn check_input_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!(
            "file does not exist: {}. Please provide a valid file path.",
            path.display()
        );
    }
    let is_xml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    if !is_xml {
        bail!(
            "given file is not an XML file, the file extension is wrong: {}",
            path.display()
        );
    }
    Ok(())
}

/// Check, read and ingest the inventory file at `path`.
pub fn load_catalog(path: &Path) -> Result<Ingest> {
    check_input_file(path)?;
    let xml = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    info!(path = %path.display(), bytes = xml.len(), "loading device inventory");
    Catalog::from_xml(&xml, &Validator::default()).map_err(|err| {
        let context = match &err {
            CatalogError::Xml(xml) if xml.is_malformed() => "invalid XML format",
            _ => "unexpected error while parsing XML",
        };
        anyhow::Error::new(err).context(context)
    })
}

/// Print the diagnostic for the record that halted ingestion.
pub fn report_rejection<W: Write>(rejection: &Rejection, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "Error: Invalid device information. Please refer below details."
    )?;
    write!(out, "{rejection}")?;
    writeln!(out)?;
    Ok(())
}

pub fn print_json<T: Serialize, W: Write>(value: &T, out: &mut W) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    writeln!(out, "{text}")?;
    Ok(())
}
