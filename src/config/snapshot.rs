use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SnapshotConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Primary file name inside `link.data_dir`; the backup is `<file_name>.bak`
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Period of the background flush, which only writes when the tree changed
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            file_name: default_file_name(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl SnapshotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() || self.file_name.contains(['/', '\\']) {
            return Err(Error::InvalidConfig(format!(
                "snapshot.file_name {:?} must be a plain file name",
                self.file_name
            )));
        }
        if self.flush_interval_ms == 0 {
            return Err(Error::InvalidConfig("snapshot.flush_interval_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn path_in(
        &self,
        data_dir: &Path,
    ) -> PathBuf {
        data_dir.join(&self.file_name)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_file_name() -> String {
    "nodes.json".to_string()
}

fn default_flush_interval_ms() -> u64 {
    5000
}
