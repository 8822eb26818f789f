//! Request dispatcher and method handlers.
//!
//! A [`Responder`] parses one inbound batch, runs each request through its
//! [`ResponderMethod`], tracks the streams left open and writes every response
//! in one outbound batch. Work that must not overtake the batch (registering
//! a list stream, flushing buffered invoke rows) runs after the write.

mod close;
mod invoke;
mod invoke_stream;
mod list;
mod method;
mod remove;
#[allow(clippy::module_inception)]
mod responder;
mod set;
mod subscribe;

pub use close::*;
pub use invoke::*;
pub use invoke_stream::*;
pub use list::*;
pub use method::*;
pub use remove::*;
pub use responder::*;
pub use set::SetMethod;
pub use subscribe::*;

#[cfg(test)]
mod invoke_stream_test;
