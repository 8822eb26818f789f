//! Responder side of a publish/subscribe IoT node protocol.
//!
//! A [`Link`] serves a [`NodeTree`] to one remote peer: request batches are
//! dispatched by the [`Responder`], live value and path subscriptions are kept
//! in a [`SubscriptionIndex`] and the tree is persisted by a
//! [`SnapshotManager`].

mod config;
mod connection;
mod errors;
mod link;
mod metrics;
mod node;
mod protocol;
mod responder;
mod snapshot;
mod subscription;
pub mod utils;

pub use config::*;
pub use connection::*;
pub use errors::*;
pub use link::*;
pub use metrics::*;
pub use node::*;
pub use protocol::*;
pub use responder::*;
pub use snapshot::*;
pub use subscription::*;
pub use utils::*;

/// Request identifier chosen by the remote endpoint.
pub type Rid = i64;
/// Value subscription identifier chosen by the remote endpoint.
pub type Sid = i64;

#[cfg(test)]
mod link_test;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
