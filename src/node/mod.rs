//! Hierarchical node tree.
//!
//! Nodes are path addressable, own their children and carry a typed value
//! slot plus config/attribute maps. Mutations that other components observe
//! are performed through [`NodeTree`], which reports them to a single
//! registered [`TreeListener`].

mod action;
mod listener;
#[allow(clippy::module_inception)]
mod node;
mod permission;
mod tree;
mod value;

pub use action::*;
pub use listener::*;
pub use node::*;
pub use permission::*;
pub use tree::*;
pub use value::*;

/// `$` keys with dedicated meaning; never stored in the free config map.
pub const RESERVED_CONFIGS: &[&str] = &[
    "is",
    "name",
    "type",
    "interface",
    "writable",
    "hidden",
    "invokable",
    "params",
    "columns",
    "result",
    "password",
];

pub fn is_reserved_config(key: &str) -> bool {
    key.starts_with('$') || RESERVED_CONFIGS.contains(&key)
}
