use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LinkConfig {
    /// Link name, also the log sub directory
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Directory holding the snapshot files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_dir: default_log_dir(),
            data_dir: default_data_dir(),
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig("link.name cannot be empty".into()));
        }
        if self.name.contains(['/', '\\']) {
            return Err(Error::InvalidConfig(format!(
                "link.name {:?} must not contain path separators",
                self.name
            )));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("link.data_dir cannot be empty".into()));
        }
        Ok(())
    }
}

fn default_name() -> String {
    "nodelink".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
