//! Device catalog: validated device records keyed by serial number.
//!
//! Records are ingested in document order with a first-error-wins policy.
//! The first record that fails validation halts ingestion; everything
//! accepted before it stays in the catalog, nothing after it is read.

mod validate;

use std::collections::HashMap;
use std::fmt;

use device_xml::{BuiltDevice, DeviceRecord, XmlError};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use validate::{parse_address, AddressRule, Rule, Validator, Violation, ViolationKind};

/// Error type produced while building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The source document could not be parsed or a device could not be built.
    #[error(transparent)]
    Xml(#[from] XmlError),
    /// A field a validation rule depends on is absent from the record.
    #[error("device #{ordinal} ({serial}) has no {field} field")]
    MissingField {
        ordinal: usize,
        serial: String,
        field: &'static str,
    },
}

/// The record that stopped ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub ordinal: usize,
    pub serial: String,
    pub record: DeviceRecord,
    pub violation: Violation,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device index: {}", self.ordinal)?;
        for (key, value) in self.record.iter() {
            writeln!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}

/// Outcome of [`Catalog::ingest`].
#[derive(Debug)]
pub struct Ingest {
    pub catalog: Catalog,
    /// Set when a record failed validation and ingestion was halted.
    pub rejected: Option<Rejection>,
}

/// Device records keyed by serial number.
///
/// Iteration follows first-insertion order. Inserting a serial that is
/// already present replaces its record but keeps its position.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<(String, DeviceRecord)>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Parse `xml` and ingest every device it describes.
    pub fn from_xml(xml: &str, validator: &Validator) -> Result<Ingest, CatalogError> {
        let root = device_xml::parse_document(xml)?;
        Self::ingest(device_xml::devices(&root), validator)
    }

    /// Validate and store devices in order, stopping at the first invalid one.
    pub fn ingest<I>(devices: I, validator: &Validator) -> Result<Ingest, CatalogError>
    where
        I: IntoIterator<Item = Result<BuiltDevice, XmlError>>,
    {
        let mut catalog = Catalog::default();
        let mut rejected = None;

        for device in devices {
            let BuiltDevice {
                ordinal,
                serial,
                record,
            } = device?;
            match validator.validate(&record) {
                Ok(()) => {
                    debug!(ordinal, serial = %serial, "accepted device");
                    catalog.insert(serial, record);
                }
                Err(Violation {
                    field,
                    kind: ViolationKind::Missing,
                }) => {
                    return Err(CatalogError::MissingField {
                        ordinal,
                        serial,
                        field,
                    });
                }
                Err(violation) => {
                    warn!(ordinal, serial = %serial, %violation, "invalid device, halting ingestion");
                    rejected = Some(Rejection {
                        ordinal,
                        serial,
                        record,
                        violation,
                    });
                    break;
                }
            }
        }

        info!(
            devices = catalog.len(),
            halted = rejected.is_some(),
            "device catalog built"
        );
        Ok(Ingest { catalog, rejected })
    }

    fn insert(&mut self, serial: String, record: DeviceRecord) {
        match self.index.get(&serial) {
            Some(&slot) => {
                debug!(serial = %serial, "duplicate serial number, replacing record");
                self.entries[slot].1 = record;
            }
            None => {
                self.index.insert(serial.clone(), self.entries.len());
                self.entries.push((serial, record));
            }
        }
    }

    /// Iterate over every stored device. Each call starts from the beginning.
    pub fn list_all(&self) -> Entries<'_> {
        Entries {
            inner: self.entries.iter().enumerate(),
        }
    }

    /// Exact-match lookup by serial number.
    pub fn find(&self, serial: &str) -> Option<&DeviceRecord> {
        self.index.get(serial).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.index.contains_key(serial)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A catalog row as seen through [`Catalog::list_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry<'a> {
    /// 1-based listing position.
    pub ordinal: usize,
    pub serial: &'a str,
    pub record: &'a DeviceRecord,
}

/// Iterator returned by [`Catalog::list_all`].
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, (String, DeviceRecord)>>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = CatalogEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(idx, (serial, record))| CatalogEntry {
            ordinal: idx + 1,
            serial,
            record,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Entries<'_> {}
