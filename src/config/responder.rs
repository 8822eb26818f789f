use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Permission;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponderConfig {
    /// Capability assumed for requests that carry no `permit`
    #[serde(default = "default_permit")]
    pub default_permit: Permission,

    /// Attach the debug rendering of handler errors as `detail`
    #[serde(default = "default_include_error_detail")]
    pub include_error_detail: bool,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            default_permit: default_permit(),
            include_error_detail: default_include_error_detail(),
        }
    }
}

impl ResponderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_permit == Permission::Never {
            return Err(Error::InvalidConfig(
                "responder.default_permit cannot be never".into(),
            ));
        }
        Ok(())
    }
}

fn default_permit() -> Permission {
    Permission::Config
}

fn default_include_error_detail() -> bool {
    false
}
