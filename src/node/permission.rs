use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// Who may write a node's value (`$writable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Writable {
    #[default]
    Never,
    Config,
    Write,
}

impl Writable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Writable::Never => "never",
            Writable::Config => "config",
            Writable::Write => "write",
        }
    }

    /// Permit needed to write the value, `None` when nobody may.
    pub fn required_permission(&self) -> Option<Permission> {
        match self {
            Writable::Never => None,
            Writable::Config => Some(Permission::Config),
            Writable::Write => Some(Permission::Write),
        }
    }
}

impl FromStr for Writable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Writable::Never),
            "config" => Ok(Writable::Config),
            "write" => Ok(Writable::Write),
            other => Err(format!("unknown writable mode {other}")),
        }
    }
}

/// Capability levels, ordered from weakest to strongest.
///
/// As a requirement, `Never` can not be satisfied by any permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    None,
    Read,
    Write,
    Config,
    Never,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::None => "none",
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Config => "config",
            Permission::Never => "never",
        }
    }

    /// Whether a caller holding `self` may perform an operation requiring `required`.
    pub fn allows(
        &self,
        required: Permission,
    ) -> bool {
        required != Permission::Never && *self != Permission::Never && *self >= required
    }
}

impl fmt::Display for Permission {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Permission::None),
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "config" => Ok(Permission::Config),
            "never" => Ok(Permission::Never),
            other => Err(format!("unknown permission {other}")),
        }
    }
}
