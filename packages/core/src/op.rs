//! The op seam: metadata, the logic trait, and the error taxonomy.

use opswarm_types::async_trait;
use opswarm_types::json::{Deserialize, Serialize, Value};
use schemars::JsonSchema;

/// Static metadata describing one op.
///
/// The `name` is the wire identifier the controller dispatches on; it must
/// be unique across the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Op {
    pub name: String,
    pub description: String,
    pub category: String,
}

impl Op {
    pub fn new(name: &str, description: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
        }
    }
}

/// Errors an op can surface to the caller.
///
/// These map one-to-one onto the failure kinds of the op contract; the
/// `Display` string is what gets posted back to the controller in the
/// task's `error` field. Nothing here is retried by the agent.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// Malformed payload field (wrong type, out of range, missing).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Model artifact missing or unreadable.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// Accelerator or model runtime fault.
    #[error("device error: {0}")]
    DeviceError(String),
    /// Input tensor size inconsistent with the model's expected input.
    #[error("input size mismatch: got {got} values, expected {expected}")]
    ShapeMismatch { got: usize, expected: usize },
    /// Op-side fault outside the payload contract (I/O, join errors).
    #[error("{0}")]
    Internal(String),
}

impl OpError {
    /// Convenience for the common "field must be X" validation failures.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// A named, independently invocable unit of work exposed by the agent.
///
/// Ops are stateless: each invocation is independent and idempotent given
/// identical inputs. They perform no writes and hold no mutable state
/// between calls.
#[async_trait]
pub trait OpLogic: Send + Sync {
    /// Op metadata (name, description, category).
    fn get_op(&self) -> Op;

    /// Execute one call against a JSON payload.
    async fn run(&self, payload: &Value) -> Result<Value, OpError>;
}
