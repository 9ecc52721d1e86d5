use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::store::{KvStore, StoreError};

const STORE_FILE: &str = "progress.json";

/// Key-value store persisted as a single JSON object on disk. Every write
/// rewrites the whole file through a `.tmp` sibling and a rename.
pub struct JsonStore {
    base_dir: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonStore {
    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir)?;
        let mut store = Self {
            base_dir,
            values: BTreeMap::new(),
        };
        store.values = store.load();
        Ok(store)
    }

    fn file_path(&self) -> PathBuf {
        self.base_dir.join(STORE_FILE)
    }

    /// A missing or corrupt file reads as empty; callers fall back to defaults.
    fn load(&self) -> BTreeMap<String, String> {
        let path = self.file_path();
        if !path.exists() {
            return BTreeMap::new();
        }
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                BTreeMap::new()
            }
        }
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let path = self.file_path();
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(values)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Commit `values` to disk first and only then adopt them, so a failed
    /// write leaves memory and disk in agreement.
    fn commit(&mut self, values: BTreeMap<String, String>) -> Result<(), StoreError> {
        self.save(&values)?;
        self.values = values;
        Ok(())
    }
}

impl KvStore for JsonStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        let mut values = self.values.clone();
        values.insert(key.to_string(), value.to_string());
        self.commit(values)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if !self.values.contains_key(key) {
            return Ok(());
        }
        let mut values = self.values.clone();
        values.remove(key);
        self.commit(values)
    }
}
