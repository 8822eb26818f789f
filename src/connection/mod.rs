//! Connection seam between the responder and the transport.

#[allow(clippy::module_inception)]
mod connection;
mod tracker;
mod writer;

pub use connection::*;
pub use tracker::*;
pub use writer::*;

#[cfg(test)]
mod connection_test;
