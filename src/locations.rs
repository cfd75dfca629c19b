//! Reusable GPS location presets, persisted as a JSON list.
//!
//! A preset bundles the location-related field values (latitude, city,
//! country, ...) under a user-chosen name so they can be stamped onto photos
//! in one action. Use counts and timestamps feed the same recency ranking as
//! keywords.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPreset {
    pub id: Uuid,
    pub name: String,
    pub use_count: i64,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Field name → value, e.g. `"CityCreated" -> "Lisbon"`.
    pub data: BTreeMap<String, String>,
}

/// JSON-backed list of location presets.
#[derive(Debug)]
pub struct LocationStore {
    path: PathBuf,
    presets: Vec<LocationPreset>,
}

impl LocationStore {
    /// Load presets, starting empty when the file is missing or corrupt.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let presets = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(presets) => presets,
                Err(e) => {
                    log::warn!("Ignoring unreadable location store {}: {e}", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, presets }
    }

    pub fn save(&self) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(&self.presets).context("Failed to serialize presets")?;
        std::fs::write(&self.path, contents).context("Failed to write location store")?;
        Ok(())
    }

    pub fn presets(&self) -> &[LocationPreset] {
        &self.presets
    }

    /// Add a new preset and return it.
    pub fn add(&mut self, name: &str, data: BTreeMap<String, String>) -> LocationPreset {
        let preset = LocationPreset {
            id: Uuid::new_v4(),
            name: name.to_string(),
            use_count: 0,
            last_used: None,
            created_at: Utc::now(),
            data,
        };
        self.presets.push(preset.clone());
        preset
    }

    /// Replace the name and data of an existing preset. Returns false when
    /// the id is unknown.
    pub fn update(&mut self, id: Uuid, name: &str, data: BTreeMap<String, String>) -> bool {
        match self.presets.iter_mut().find(|p| p.id == id) {
            Some(preset) => {
                preset.name = name.to_string();
                preset.data = data;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.presets.len();
        self.presets.retain(|p| p.id != id);
        self.presets.len() != before
    }

    /// Bump the usage bookkeeping of a preset after it was applied.
    pub fn mark_used(&mut self, id: Uuid) -> bool {
        match self.presets.iter_mut().find(|p| p.id == id) {
            Some(preset) => {
                preset.use_count += 1;
                preset.last_used = Some(Utc::now());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn add_assigns_id_and_bookkeeping() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = LocationStore::load(dir.path().join("locations.json"));

        let preset = store.add("Lisbon", data(&[("CityCreated", "Lisbon")]));
        assert_eq!(preset.name, "Lisbon");
        assert_eq!(preset.use_count, 0);
        assert!(preset.last_used.is_none());
    }

    #[test]
    fn mark_used_updates_count_and_timestamp() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = LocationStore::load(dir.path().join("locations.json"));
        let id = store.add("Lisbon", data(&[])).id;

        assert!(store.mark_used(id));
        assert!(store.mark_used(id));
        let preset = store.presets().iter().find(|p| p.id == id).unwrap();
        assert_eq!(preset.use_count, 2);
        assert!(preset.last_used.is_some());

        assert!(!store.mark_used(Uuid::new_v4()));
    }

    #[test]
    fn update_and_remove() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = LocationStore::load(dir.path().join("locations.json"));
        let id = store.add("Lisbon", data(&[("CityCreated", "Lisbon")])).id;

        assert!(store.update(id, "Lisboa", data(&[("CityCreated", "Lisboa")])));
        assert_eq!(store.presets()[0].name, "Lisboa");

        assert!(store.remove(id));
        assert!(store.presets().is_empty());
        assert!(!store.remove(id));
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("locations.json");

        let mut store = LocationStore::load(&path);
        store.add("Lisbon", data(&[("CountryCreated", "Portugal")]));
        store.save().unwrap();

        let reloaded = LocationStore::load(&path);
        assert_eq!(reloaded.presets().len(), 1);
        assert_eq!(reloaded.presets()[0].data["CountryCreated"], "Portugal");
    }

    #[test]
    fn corrupt_store_starts_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("locations.json");
        std::fs::write(&path, "[{broken").unwrap();

        let store = LocationStore::load(&path);
        assert!(store.presets().is_empty());
    }
}
