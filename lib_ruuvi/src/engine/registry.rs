//! # Beacon Registry
//!
//! Maps opaque device identifiers (hardware addresses, compared as
//! case-sensitive strings) to the display names configured by the operator.
//! The mapping is loaded once at startup and never mutated afterwards, so it
//! is shared behind a plain `Arc` without any locking.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// A configured beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconEntry {
    /// Hardware address as it appears in advertisements.
    pub device_id: String,
    /// Human readable label used for the `location` metric label.
    pub display_name: String,
}

/// On-disk shape of one entry: `{"name": "<display label>"}`.
#[derive(Debug, Deserialize)]
struct BeaconConfig {
    name: String,
}

/// Read-only lookup from device identifier to [`BeaconEntry`].
#[derive(Debug, Clone, Default)]
pub struct BeaconRegistry {
    entries: HashMap<String, BeaconEntry>,
}

impl BeaconRegistry {
    /// Loads the mapping from a JSON file of the form
    /// `{ "<device_id>": {"name": "<display label>"}, ... }`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses the mapping from an in-memory JSON document.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let parsed: HashMap<String, BeaconConfig> = serde_json::from_str(raw)?;
        Ok(Self::from_entries(parsed.into_iter().map(|(device_id, cfg)| BeaconEntry {
            device_id,
            display_name: cfg.name,
        })))
    }

    /// Builds a registry from already constructed entries.
    pub fn from_entries(entries: impl IntoIterator<Item = BeaconEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.device_id.clone(), entry))
                .collect(),
        }
    }

    /// Returns the configured display name, or the raw identifier itself when
    /// the device is not registered. Never fails.
    pub fn resolve<'a>(&'a self, device_id: &'a str) -> &'a str {
        self.entries
            .get(device_id)
            .map(|entry| entry.display_name.as_str())
            .unwrap_or(device_id)
    }

    /// Looks up the full entry for a registered device.
    pub fn get(&self, device_id: &str) -> Option<&BeaconEntry> {
        self.entries.get(device_id)
    }

    /// All registered identifiers, sorted for stable logging and fetch order.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of configured beacons.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no beacons are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resolve_known_and_unknown() {
        let registry = BeaconRegistry::from_json(r#"{"AA:BB": {"name": "kitchen"}}"#).unwrap();
        assert_eq!(registry.resolve("AA:BB"), "kitchen");
        assert_eq!(registry.resolve("CC:DD"), "CC:DD");
    }

    #[test]
    fn test_identifiers_are_case_sensitive() {
        let registry = BeaconRegistry::from_json(r#"{"aa:bb": {"name": "attic"}}"#).unwrap();
        assert_eq!(registry.resolve("AA:BB"), "AA:BB");
        assert_eq!(registry.resolve("aa:bb"), "attic");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"F1:00": {{"name": "sauna"}}, "E2:01": {{"name": "garage"}}}}"#
        )
        .unwrap();

        let registry = BeaconRegistry::load(file.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.device_ids(), vec!["E2:01".to_string(), "F1:00".to_string()]);
        assert_eq!(registry.get("F1:00").unwrap().display_name, "sauna");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BeaconRegistry::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"AA:BB": "kitchen"}}"#).unwrap();
        let err = BeaconRegistry::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
