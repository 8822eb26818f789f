//! Wire envelopes exchanged with the remote requester.
//!
//! Requests arrive as already-parsed JSON objects; responses are serialized
//! with serde into `{"responses": [...]}` batches.

mod request;
mod response;

pub use request::*;
pub use response::*;

/// Rid used for unsolicited value pushes.
pub const PUSH_RID: crate::Rid = 0;
