//! Flat per-device attribute mapping.

use crate::fields;

/// Flat mapping from field name to text value for a single device.
///
/// Field names are either the tag of a direct child of the device element or,
/// for children of [`fields::COMM_SETTING`], the flattened
/// `CommSetting_<tag>` form. Keys keep the order in which they were first
/// seen; inserting an existing key replaces its value in place.
///
/// The documented keys are listed in [`fields::REQUIRED`]. Any other field
/// found in the document is retained but never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    entries: Vec<(String, String)>,
}

impl DeviceRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a field value by exact name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over `(name, value)` pairs in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Required keys absent from this record, in [`fields::REQUIRED`] order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        fields::REQUIRED
            .iter()
            .copied()
            .filter(|key| !self.contains(key))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for DeviceRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = DeviceRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DeviceRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
