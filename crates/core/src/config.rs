use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server configuration: where the data lives and how to reach the mesh
/// daemon. Stored as JSON next to the data it describes; a missing or
/// unreadable file falls back to defaults so a fresh checkout just runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory for persisted tables, the group pointer, and the error log.
    pub data_dir: PathBuf,
    /// Directory operator-saved shows are written to.
    pub shows_dir: PathBuf,
    /// Directory of read-only example shows.
    pub examples_dir: PathBuf,
    /// Mesh daemon binary to invoke.
    pub daemon_binary: String,
    /// Bound on each daemon invocation, keeping a wedged daemon from
    /// stalling the scheduler.
    pub daemon_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            shows_dir: PathBuf::from("shows"),
            examples_dir: PathBuf::from("example_shows"),
            daemon_binary: "alfred".to_string(),
            daemon_timeout_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file, falling back to defaults when
    /// the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("ignoring unreadable config {:?}: {}", path, err);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if parent != Path::new("") {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn daemon_timeout(&self) -> Duration {
        Duration::from_millis(self.daemon_timeout_ms)
    }

    pub fn attributes_path(&self) -> PathBuf {
        self.data_dir.join("attributes.json")
    }

    pub fn states_path(&self) -> PathBuf {
        self.data_dir.join("states.json")
    }

    pub fn cues_path(&self) -> PathBuf {
        self.data_dir.join("all_cues.json")
    }

    pub fn cue_num_path(&self) -> PathBuf {
        self.data_dir.join("cue_num.json")
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.data_dir.join("errors.json")
    }
}
