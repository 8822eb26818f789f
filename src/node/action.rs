use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Map as JsonMap;
use serde_json::Value as JsonValue;

use super::Node;
use super::Permission;
use super::ValueType;
use crate::InvokeStream;
use crate::Result;

pub type ActionHandler = dyn Fn(ActionInvocation) -> Result<ActionResult> + Send + Sync;

/// Declared nature of an action's output (`$result`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    Values,
    Table,
    /// Keeps the invoke stream open so the handler can push rows later
    Stream,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Values => "values",
            ResultType::Table => "table",
            ResultType::Stream => "stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value_type: ValueType,
}

impl Parameter {
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        json!({ "name": self.name, "type": self.value_type.as_str() })
    }
}

/// Everything a handler gets to see about one invocation.
pub struct ActionInvocation {
    pub node: Arc<Node>,
    pub params: JsonMap<String, JsonValue>,
    /// Present only for [`ResultType::Stream`] actions
    pub stream: Option<Arc<InvokeStream>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionResult {
    pub rows: Vec<Vec<JsonValue>>,
}

impl ActionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row(values: Vec<JsonValue>) -> Self {
        Self { rows: vec![values] }
    }

    pub fn rows(rows: Vec<Vec<JsonValue>>) -> Self {
        Self { rows }
    }
}

/// An invokable behaviour attached to a node.
#[derive(Clone)]
pub struct Action {
    permission: Permission,
    result_type: ResultType,
    params: Vec<Parameter>,
    columns: Vec<Parameter>,
    handler: Arc<ActionHandler>,
}

impl Action {
    pub fn new<F>(
        permission: Permission,
        handler: F,
    ) -> Self
    where
        F: Fn(ActionInvocation) -> Result<ActionResult> + Send + Sync + 'static,
    {
        Self {
            permission,
            result_type: ResultType::default(),
            params: Vec::new(),
            columns: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_result_type(
        mut self,
        result_type: ResultType,
    ) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn with_param(
        mut self,
        param: Parameter,
    ) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_column(
        mut self,
        column: Parameter,
    ) -> Self {
        self.columns.push(column);
        self
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn columns(&self) -> &[Parameter] {
        &self.columns
    }

    pub fn columns_json(&self) -> Vec<JsonValue> {
        self.columns.iter().map(Parameter::to_json).collect()
    }

    pub fn params_json(&self) -> Vec<JsonValue> {
        self.params.iter().map(Parameter::to_json).collect()
    }

    pub fn invoke(
        &self,
        invocation: ActionInvocation,
    ) -> Result<ActionResult> {
        (self.handler)(invocation)
    }
}

impl fmt::Debug for Action {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Action")
            .field("permission", &self.permission)
            .field("result_type", &self.result_type)
            .field("params", &self.params)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}
