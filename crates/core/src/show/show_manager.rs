use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::table::RawTable;

const ATTRIBUTES_FILE: &str = "attributes.csv";
const STATES_FILE: &str = "states.csv";
const CUES_FILE: &str = "all_cues.csv";

/// The three operator tables a show folder is made of.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowTables {
    pub attributes: RawTable,
    pub states: RawTable,
    pub cues: RawTable,
}

/// Imports and exports shows as folders of three CSV tables: a saved-shows
/// directory the operator writes to, and a read-only examples directory
/// shipped alongside the server.
pub struct ShowManager {
    shows_dir: PathBuf,
    examples_dir: PathBuf,
}

impl ShowManager {
    pub fn new(shows_dir: impl Into<PathBuf>, examples_dir: impl Into<PathBuf>) -> Self {
        Self {
            shows_dir: shows_dir.into(),
            examples_dir: examples_dir.into(),
        }
    }

    /// Write the current tables to `<shows>/<name>/`, creating the folder if
    /// absent. Returns the folder written.
    pub fn save_show(&self, name: &str, tables: &ShowTables) -> Result<PathBuf> {
        let folder = self.shows_dir.join(name);
        fs::create_dir_all(&folder)
            .with_context(|| format!("creating show folder {:?}", folder))?;

        for (filename, table) in [
            (ATTRIBUTES_FILE, &tables.attributes),
            (STATES_FILE, &tables.states),
            (CUES_FILE, &tables.cues),
        ] {
            let path = folder.join(filename);
            fs::write(&path, table.to_csv())
                .with_context(|| format!("writing {:?}", path))?;
        }
        Ok(folder)
    }

    /// Open a saved show. `None` is the distinguished not-found condition;
    /// the operator is told the show does not exist.
    pub fn open_show(&self, name: &str) -> Option<ShowTables> {
        open_folder(&self.shows_dir.join(name))
    }

    /// Open one of the example shows shipped with the server.
    pub fn open_example(&self, name: &str) -> Option<ShowTables> {
        open_folder(&self.examples_dir.join(name))
    }

    /// Names of the saved show folders, sorted. An absent shows directory
    /// simply lists nothing.
    pub fn list_shows(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.shows_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }
}

fn open_folder(folder: &Path) -> Option<ShowTables> {
    let read = |filename: &str| -> Option<RawTable> {
        let text = fs::read_to_string(folder.join(filename)).ok()?;
        Some(RawTable::from_csv(&text))
    };
    Some(ShowTables {
        attributes: read(ATTRIBUTES_FILE)?,
        states: read(STATES_FILE)?,
        cues: read(CUES_FILE)?,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::templates;

    fn tables() -> ShowTables {
        ShowTables {
            attributes: templates::attributes_template(),
            states: templates::states_template(),
            cues: templates::cues_template(),
        }
    }

    #[test]
    fn test_save_then_open_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ShowManager::new(temp_dir.path().join("shows"), temp_dir.path().join("ex"));

        manager.save_show("opening night", &tables()).unwrap();
        let opened = manager.open_show("opening night").unwrap();
        assert_eq!(opened, tables());
    }

    #[test]
    fn test_open_missing_show_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ShowManager::new(temp_dir.path().join("shows"), temp_dir.path().join("ex"));
        assert!(manager.open_show("never saved").is_none());
        assert!(manager.open_example("never shipped").is_none());
    }

    #[test]
    fn test_list_shows_sorted_and_tolerates_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ShowManager::new(temp_dir.path().join("shows"), temp_dir.path().join("ex"));
        assert!(manager.list_shows().is_empty());

        manager.save_show("second", &tables()).unwrap();
        manager.save_show("first", &tables()).unwrap();
        assert_eq!(manager.list_shows(), vec!["first", "second"]);
    }
}
