//! Configuration management for the node link.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation

mod link;
mod monitoring;
mod responder;
mod snapshot;

pub use link::*;
pub use monitoring::*;
pub use responder::*;
pub use snapshot::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

pub const ENV_PREFIX: &str = "NODELINK";

/// Main configuration container.
///
/// Sources merged in order, later ones win:
/// 1. Type defaults
/// 2. Configuration file named by `CONFIG_PATH`
/// 3. `NODELINK__*` environment variables
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NodeLinkConfig {
    /// Identity and directories of this link
    #[serde(default)]
    pub link: LinkConfig,
    /// Request dispatch behaviour
    #[serde(default)]
    pub responder: ResponderConfig,
    /// Node tree persistence
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Metrics exporter
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl NodeLinkConfig {
    /// Loads configuration from all sources without validating it.
    ///
    /// Callers must call [`Self::validate`] once every override is applied.
    ///
    /// # Examples
    /// ```ignore
    /// let cfg = NodeLinkConfig::new()?
    ///     .with_override_config("custom.toml")?
    ///     .validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }
        builder = builder.add_source(environment());
        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies overrides from `path` on top of the current values. Environment
    /// variables still take precedence.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated configuration.
    pub fn validate(self) -> Result<Self> {
        self.link.validate()?;
        self.responder.validate()?;
        self.snapshot.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
