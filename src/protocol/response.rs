use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::Rid;

/// Lifecycle of one outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    #[default]
    Initialized,
    Open,
    Closed,
}

impl StreamState {
    /// `initialized` is never written; the field is simply omitted.
    pub fn on_wire(self) -> Option<StreamState> {
        match self {
            StreamState::Initialized => None,
            state => Some(state),
        }
    }

    /// Initialized and open streams stay tracked by the connection.
    pub fn is_tracked(self) -> bool {
        self != StreamState::Closed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub rid: Rid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn new(
        rid: Rid,
        state: StreamState,
    ) -> Self {
        Self {
            rid,
            stream: state.on_wire(),
            columns: None,
            updates: None,
            error: None,
        }
    }

    pub fn closed(rid: Rid) -> Self {
        Self::new(rid, StreamState::Closed)
    }

    pub fn error(
        rid: Rid,
        error: ErrorBody,
    ) -> Self {
        Self {
            error: Some(error),
            ..Self::closed(rid)
        }
    }

    pub fn with_updates(
        mut self,
        updates: Vec<JsonValue>,
    ) -> Self {
        if !updates.is_empty() {
            self.updates = Some(updates);
        }
        self
    }

    pub fn with_columns(
        mut self,
        columns: Vec<JsonValue>,
    ) -> Self {
        if !columns.is_empty() {
            self.columns = Some(columns);
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseBatch {
    pub responses: Vec<Response>,
}

impl ResponseBatch {
    pub fn single(response: Response) -> Self {
        Self {
            responses: vec![response],
        }
    }

    pub fn push(
        &mut self,
        response: Response,
    ) {
        self.responses.push(response);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<JsonValue> {
        serde_json::to_value(self)
    }
}
