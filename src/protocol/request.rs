use serde_json::Map as JsonMap;
use serde_json::Value as JsonValue;

use crate::Error;
use crate::Permission;
use crate::ProtocolError;
use crate::Result;
use crate::Rid;
use crate::Sid;

/// One inbound request object.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub rid: Rid,
    pub method: Option<String>,
    pub path: Option<String>,
    body: JsonMap<String, JsonValue>,
}

impl Request {
    /// Returns `None` when the object carries no integer `rid`; such requests
    /// can not be answered and are dropped by the dispatcher.
    pub fn from_json(value: JsonValue) -> Option<Self> {
        let JsonValue::Object(body) = value else {
            return None;
        };
        let rid = body.get("rid")?.as_i64()?;
        let method = body.get("method").and_then(JsonValue::as_str).map(str::to_string);
        let path = body.get("path").and_then(JsonValue::as_str).map(str::to_string);
        Some(Self {
            rid,
            method,
            path,
            body,
        })
    }

    pub fn field(
        &self,
        name: &str,
    ) -> Option<&JsonValue> {
        self.body.get(name)
    }

    pub fn require_path(&self) -> Result<&str> {
        self.path.as_deref().ok_or_else(|| ProtocolError::MissingField("path").into())
    }

    /// `params` of an invoke; absent means empty.
    pub fn params(&self) -> Result<JsonMap<String, JsonValue>> {
        match self.body.get("params") {
            None | Some(JsonValue::Null) => Ok(JsonMap::new()),
            Some(JsonValue::Object(params)) => Ok(params.clone()),
            Some(_) => Err(ProtocolError::InvalidField {
                field: "params",
                reason: "expected an object".into(),
            }
            .into()),
        }
    }

    /// The caller's capability, or `default` when the request carries none.
    pub fn permit(
        &self,
        default: Permission,
    ) -> Result<Permission> {
        match self.body.get("permit") {
            None | Some(JsonValue::Null) => Ok(default),
            Some(JsonValue::String(s)) => s.parse::<Permission>().map_err(|reason| {
                Error::from(ProtocolError::InvalidField {
                    field: "permit",
                    reason,
                })
            }),
            Some(_) => Err(ProtocolError::InvalidField {
                field: "permit",
                reason: "expected a string".into(),
            }
            .into()),
        }
    }

    /// `paths: [{path, sid}]` of a subscribe request.
    pub fn subscribe_paths(&self) -> Result<Vec<(String, Sid)>> {
        let entries = self
            .body
            .get("paths")
            .and_then(JsonValue::as_array)
            .ok_or(ProtocolError::MissingField("paths"))?;

        entries
            .iter()
            .map(|entry| {
                let path = entry.get("path").and_then(JsonValue::as_str);
                let sid = entry.get("sid").and_then(JsonValue::as_i64);
                match (path, sid) {
                    (Some(path), Some(sid)) => Ok((path.to_string(), sid)),
                    _ => Err(Error::from(ProtocolError::InvalidField {
                        field: "paths",
                        reason: format!("entry {entry} needs a string path and an integer sid"),
                    })),
                }
            })
            .collect()
    }

    /// `sids: [sid]` of an unsubscribe request.
    pub fn sids(&self) -> Result<Vec<Sid>> {
        let entries = self
            .body
            .get("sids")
            .and_then(JsonValue::as_array)
            .ok_or(ProtocolError::MissingField("sids"))?;

        entries
            .iter()
            .map(|sid| {
                sid.as_i64().ok_or_else(|| {
                    Error::from(ProtocolError::InvalidField {
                        field: "sids",
                        reason: format!("{sid} is not an integer"),
                    })
                })
            })
            .collect()
    }
}
