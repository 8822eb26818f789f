use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::InvokeStream;
use super::MethodContext;
use super::MethodOutcome;
use super::MethodResult;
use super::ResponderMethod;
use crate::ActionInvocation;
use crate::ActionResult;
use crate::ProtocolError;
use crate::ResultType;

pub struct InvokeMethod;

impl ResponderMethod for InvokeMethod {
    fn name(&self) -> &'static str {
        "invoke"
    }

    fn execute(
        &self,
        ctx: &MethodContext<'_>,
    ) -> MethodResult {
        let node = ctx.node_target()?;
        let action = node
            .action()
            .ok_or_else(|| ProtocolError::NotInvokable(node.path().to_string()))?;
        ctx.require(action.permission())?;
        let params = ctx.request.params()?;

        if action.result_type() != ResultType::Stream {
            let result = action.invoke(ActionInvocation {
                node: node.clone(),
                params,
                stream: None,
            })?;
            return Ok(MethodOutcome::closed()
                .with_updates(into_updates(result))
                .with_columns(action.columns_json()));
        }

        let stream = Arc::new(InvokeStream::new(ctx.request.rid, ctx.conn.handle()));
        let result = action.invoke(ActionInvocation {
            node: node.clone(),
            params,
            stream: Some(stream.clone()),
        })?;

        let mut updates = into_updates(result);
        if stream.is_closed() {
            updates.extend(stream.take_pending());
            return Ok(MethodOutcome::closed()
                .with_updates(updates)
                .with_columns(action.columns_json()));
        }

        let activate = stream.clone();
        Ok(MethodOutcome::open()
            .with_updates(updates)
            .with_columns(action.columns_json())
            .with_handle(stream)
            .after_sent(move || activate.activate()))
    }
}

fn into_updates(result: ActionResult) -> Vec<JsonValue> {
    result.rows.into_iter().map(JsonValue::Array).collect()
}
