use tracing::debug;

use super::MethodContext;
use super::MethodOutcome;
use super::MethodResult;
use super::ResponderMethod;
use crate::Permission;
use crate::ProtocolError;

/// `paths: [{path, sid}]`. Stops at the first entry that fails; earlier
/// entries stay subscribed.
pub struct SubscribeMethod;

impl ResponderMethod for SubscribeMethod {
    fn name(&self) -> &'static str {
        "subscribe"
    }

    fn requires_node(&self) -> bool {
        false
    }

    fn execute(
        &self,
        ctx: &MethodContext<'_>,
    ) -> MethodResult {
        ctx.require(Permission::Read)?;
        for (path, sid) in ctx.request.subscribe_paths()? {
            let node = ctx.tree.lookup(&path).ok_or(ProtocolError::NodeNotFound(path))?;
            ctx.subscriptions.add_value_sub(&node, sid)?;
        }
        Ok(MethodOutcome::closed())
    }
}

/// `sids: [sid]`. Unknown sids are ignored.
pub struct UnsubscribeMethod;

impl ResponderMethod for UnsubscribeMethod {
    fn name(&self) -> &'static str {
        "unsubscribe"
    }

    fn requires_node(&self) -> bool {
        false
    }

    fn execute(
        &self,
        ctx: &MethodContext<'_>,
    ) -> MethodResult {
        for sid in ctx.request.sids()? {
            if !ctx.subscriptions.remove_value_sub_by_sid(sid) {
                debug!(sid, "unsubscribe for unknown sid");
            }
        }
        Ok(MethodOutcome::closed())
    }
}
