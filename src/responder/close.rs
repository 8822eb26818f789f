use tracing::trace;

use super::MethodContext;
use super::MethodOutcome;
use super::MethodResult;
use super::ResponderMethod;

/// Terminates the stream opened under the same rid.
pub struct CloseMethod;

impl ResponderMethod for CloseMethod {
    fn name(&self) -> &'static str {
        "close"
    }

    fn requires_node(&self) -> bool {
        false
    }

    fn execute(
        &self,
        ctx: &MethodContext<'_>,
    ) -> MethodResult {
        let rid = ctx.request.rid;
        match ctx.conn.tracker().remove(rid) {
            Some(stream) => stream.terminate(),
            None => trace!(rid, "close for untracked rid"),
        }
        Ok(MethodOutcome::closed())
    }
}
