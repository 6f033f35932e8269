use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::json::{json, Value};

/// Trivial diagnostic op: returns the payload back so controller <-> agent
/// plumbing can be smoke-tested end to end.
#[crate::register_op]
#[derive(Default)]
pub struct EchoOp {}

#[async_trait]
impl OpLogic for EchoOp {
    fn get_op(&self) -> Op {
        Op::new(
            "echo",
            "Returns the payload back unchanged.",
            "Diagnostics",
        )
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        let echoed = if payload.is_null() {
            json!({})
        } else {
            payload.clone()
        };

        // Non-object payloads are still echoed, flagged so the caller sees it.
        if !echoed.is_object() {
            return Ok(json!({"ok": true, "echo": echoed, "note": "payload_was_not_object"}));
        }

        Ok(json!({"ok": true, "echo": echoed}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_object_payload() {
        let out = EchoOp::default()
            .run(&json!({"hello": "world"}))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(true));
        assert_eq!(out["echo"], json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn null_payload_echoes_empty_object() {
        let out = EchoOp::default().run(&Value::Null).await.unwrap();
        assert_eq!(out["echo"], json!({}));
    }

    #[tokio::test]
    async fn non_object_payload_is_flagged() {
        let out = EchoOp::default().run(&json!([1, 2, 3])).await.unwrap();
        assert_eq!(out["note"], json!("payload_was_not_object"));
        assert_eq!(out["echo"], json!([1, 2, 3]));
    }
}
