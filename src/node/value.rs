use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map as JsonMap;
use serde_json::Number;
use serde_json::Value as JsonValue;

/// Strings carrying this prefix are binary payloads on the wire and on disk.
pub const BINARY_PREFIX: &str = "\u{1b}bytes:";

/// Payload of a node value, tagged by type.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    Bool(bool),
    Number(Number),
    String(String),
    Map(JsonMap<String, JsonValue>),
    List(Vec<JsonValue>),
    Binary(Vec<u8>),
}

impl ValueData {
    pub fn from_f64(n: f64) -> Option<Self> {
        Number::from_f64(n).map(ValueData::Number)
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            ValueData::Bool(_) => ValueType::Bool,
            ValueData::Number(_) => ValueType::Number,
            ValueData::String(_) => ValueType::String,
            ValueData::Map(_) => ValueType::Map,
            ValueData::List(_) => ValueType::Array,
            ValueData::Binary(_) => ValueType::Binary,
        }
    }

    /// Wire/disk representation. Binary is folded into a prefixed base64 string.
    pub fn to_json(&self) -> JsonValue {
        match self {
            ValueData::Bool(b) => JsonValue::Bool(*b),
            ValueData::Number(n) => JsonValue::Number(n.clone()),
            ValueData::String(s) => JsonValue::String(s.clone()),
            ValueData::Map(m) => JsonValue::Object(m.clone()),
            ValueData::List(l) => JsonValue::Array(l.clone()),
            ValueData::Binary(bytes) => JsonValue::String(format!("{}{}", BINARY_PREFIX, BASE64.encode(bytes))),
        }
    }

    /// Returns `None` for JSON `null`, which means "no value".
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(ValueData::Bool(*b)),
            JsonValue::Number(n) => Some(ValueData::Number(n.clone())),
            JsonValue::String(s) => match s.strip_prefix(BINARY_PREFIX) {
                Some(encoded) => match BASE64.decode(encoded) {
                    Ok(bytes) => Some(ValueData::Binary(bytes)),
                    Err(_) => Some(ValueData::String(s.clone())),
                },
                None => Some(ValueData::String(s.clone())),
            },
            JsonValue::Object(m) => Some(ValueData::Map(m.clone())),
            JsonValue::Array(l) => Some(ValueData::List(l.clone())),
        }
    }
}

impl From<bool> for ValueData {
    fn from(b: bool) -> Self {
        ValueData::Bool(b)
    }
}

impl From<i64> for ValueData {
    fn from(n: i64) -> Self {
        ValueData::Number(Number::from(n))
    }
}

impl From<u64> for ValueData {
    fn from(n: u64) -> Self {
        ValueData::Number(Number::from(n))
    }
}

impl From<&str> for ValueData {
    fn from(s: &str) -> Self {
        ValueData::String(s.to_string())
    }
}

impl From<String> for ValueData {
    fn from(s: String) -> Self {
        ValueData::String(s)
    }
}

impl From<Vec<u8>> for ValueData {
    fn from(bytes: Vec<u8>) -> Self {
        ValueData::Binary(bytes)
    }
}

/// A value together with the moment it was produced.
///
/// Timestamps are supplied by the caller and are not forced to be monotonic.
/// Equality covers the type tag, the payload and the full timestamp precision.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    data: ValueData,
    timestamp: DateTime<Utc>,
}

impl Value {
    pub fn new(
        data: impl Into<ValueData>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            data: data.into(),
            timestamp,
        }
    }

    pub fn now(data: impl Into<ValueData>) -> Self {
        Self::new(data, Utc::now())
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    pub fn into_data(self) -> ValueData {
        self.data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value_type(&self) -> ValueType {
        self.data.value_type()
    }

    pub fn to_json(&self) -> JsonValue {
        self.data.to_json()
    }

    /// RFC 3339 with as many fractional digits as needed, so nanoseconds survive.
    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|ts| ts.with_timezone(&Utc))
}

/// Declared value type of a node (`$type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Number,
    String,
    Map,
    Array,
    Binary,
    Dynamic,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Map => "map",
            ValueType::Array => "array",
            ValueType::Binary => "binary",
            ValueType::Dynamic => "dynamic",
        }
    }

    pub fn accepts(
        &self,
        data: &ValueData,
    ) -> bool {
        *self == ValueType::Dynamic || *self == data.value_type()
    }
}

impl fmt::Display for ValueType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(ValueType::Bool),
            "number" => Ok(ValueType::Number),
            "string" => Ok(ValueType::String),
            "map" => Ok(ValueType::Map),
            "array" => Ok(ValueType::Array),
            "binary" => Ok(ValueType::Binary),
            "dynamic" => Ok(ValueType::Dynamic),
            other => Err(format!("unknown value type {other}")),
        }
    }
}
