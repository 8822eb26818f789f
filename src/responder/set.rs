use super::MethodContext;
use super::MethodOutcome;
use super::MethodResult;
use super::ResponderMethod;
use crate::is_reserved_config;
use crate::MetaKey;
use crate::Permission;
use crate::ProtocolError;
use crate::Value;
use crate::ValueData;

pub struct SetMethod;

impl ResponderMethod for SetMethod {
    fn name(&self) -> &'static str {
        "set"
    }

    fn execute(
        &self,
        ctx: &MethodContext<'_>,
    ) -> MethodResult {
        let target = ctx.target()?;
        let value = ctx.request.field("value").ok_or(ProtocolError::MissingField("value"))?;
        let node = &target.node;

        match &target.meta {
            None => {
                let required = node
                    .writable()
                    .required_permission()
                    .ok_or_else(|| ProtocolError::NotWritable(node.path().to_string()))?;
                ctx.require(required)?;

                match ValueData::from_json(value) {
                    None => ctx.tree.clear_value(node),
                    Some(data) => {
                        if let Some(value_type) = node.value_type() {
                            if !value_type.accepts(&data) {
                                return Err(ProtocolError::InvalidField {
                                    field: "value",
                                    reason: format!("expected {value_type}, got {}", data.value_type()),
                                }
                                .into());
                            }
                        }
                        ctx.tree.set_value(node, Value::now(data));
                    }
                }
            }
            Some(MetaKey::Attribute(key)) => {
                ctx.require(Permission::Write)?;
                ctx.tree.set_attribute(node, key, value.clone());
            }
            Some(MetaKey::Config(key)) => {
                ctx.require(Permission::Config)?;
                reject_reserved(key)?;
                ctx.tree.set_config(node, key, value.clone());
            }
        }
        Ok(MethodOutcome::closed())
    }
}

pub(super) fn reject_reserved(key: &str) -> std::result::Result<(), ProtocolError> {
    if is_reserved_config(key) {
        return Err(ProtocolError::InvalidField {
            field: "path",
            reason: format!("${key} is reserved"),
        });
    }
    Ok(())
}
