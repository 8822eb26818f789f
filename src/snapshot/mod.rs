//! Durable snapshots of the node tree.
//!
//! The document is JSON: `$`-prefixed keys are config (`$$` ones secret),
//! `@`-prefixed keys are attributes, `?value`/`?ts` hold the stored value and
//! every other key is a child node. The previous document is kept as
//! `<file>.bak`.

mod decoder;
mod encoder;
mod manager;

pub use decoder::*;
pub use encoder::*;
pub use manager::*;
