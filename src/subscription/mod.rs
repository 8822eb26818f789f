//! Value and path subscriptions with update fan-out.

mod bi_index;
mod index;
mod list_stream;

pub use bi_index::*;
pub use index::*;
pub use list_stream::*;
