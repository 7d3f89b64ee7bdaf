use std::fs::{self, File};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Load-current-value / replace-current-value store backed by one JSON file.
/// Missing or corrupt files load as the type's default, never an error.
pub struct JsonStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Default> JsonStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn load(&self) -> T {
        File::open(&self.path)
            .ok()
            .and_then(|file| serde_json::from_reader(file).ok())
            .unwrap_or_default()
    }

    pub fn replace(&self, value: &T) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if parent != Path::new("") {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, value)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Persisted integer with the same load-or-zero contract, used for the
/// current cue-group pointer. Mutations persist immediately; a failed write
/// is logged and the in-memory value stays authoritative.
pub struct CounterStore {
    store: JsonStore<usize>,
    value: usize,
}

impl CounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let store = JsonStore::new(path);
        let value = store.load();
        Self { store, value }
    }

    pub fn get(&self) -> usize {
        self.value
    }

    pub fn set(&mut self, value: usize) {
        self.value = value;
        if let Err(err) = self.store.replace(&self.value) {
            log::warn!(
                "failed to persist counter to {:?}: {:#}",
                self.store.path(),
                err
            );
        }
    }

    pub fn increment(&mut self) {
        self.set(self.value + 1);
    }

    pub fn decrement(&mut self) {
        self.set(self.value.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::table::RawTable;

    #[test]
    fn test_missing_table_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store: JsonStore<RawTable> = JsonStore::new(temp_dir.path().join("absent.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_table_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("table.json");
        std::fs::write(&path, b"}}not json{{").unwrap();
        let store: JsonStore<RawTable> = JsonStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_table_replace_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store: JsonStore<RawTable> = JsonStore::new(temp_dir.path().join("table.json"));

        let mut table = RawTable::new(vec!["A", "B"]);
        table.push_row(vec!["1", "2"]);
        store.replace(&table).unwrap();
        assert_eq!(store.load(), table);
    }

    #[test]
    fn test_counter_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cue_num.json");

        let mut counter = CounterStore::new(&path);
        assert_eq!(counter.get(), 0);
        counter.set(4);
        counter.increment();
        counter.decrement();

        let counter = CounterStore::new(&path);
        assert_eq!(counter.get(), 4);
    }
}
