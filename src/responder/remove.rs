use super::set::reject_reserved;
use super::MethodContext;
use super::MethodOutcome;
use super::MethodResult;
use super::ResponderMethod;
use crate::MetaKey;
use crate::Permission;
use crate::ProtocolError;

/// Removes an attribute or config. Nodes themselves are not removable remotely.
pub struct RemoveMethod;

impl ResponderMethod for RemoveMethod {
    fn name(&self) -> &'static str {
        "remove"
    }

    fn execute(
        &self,
        ctx: &MethodContext<'_>,
    ) -> MethodResult {
        let target = ctx.target()?;
        match &target.meta {
            None => Err(ProtocolError::InvalidField {
                field: "path",
                reason: "only attributes and configs can be removed".into(),
            }
            .into()),
            Some(MetaKey::Attribute(key)) => {
                ctx.require(Permission::Write)?;
                ctx.tree.remove_attribute(&target.node, key);
                Ok(MethodOutcome::closed())
            }
            Some(MetaKey::Config(key)) => {
                ctx.require(Permission::Config)?;
                reject_reserved(key)?;
                ctx.tree.remove_config(&target.node, key);
                Ok(MethodOutcome::closed())
            }
        }
    }
}
