//! The `map_classify_tpu` op: one forward pass of a quantized classifier.
//!
//! The op is deliberately small and pure: no preprocessing, no batching,
//! no label mapping. The caller supplies an already-quantized flat tensor
//! and gets raw class indices back. Retry and fallback policy belong to
//! the controller, not here.

use std::time::Instant;

use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::elapsed_ms;
use opswarm_types::json::{from_value, json, to_value, Deserialize, Serialize, Value};
use opswarm_types::tokio;
use opswarm_types::JsonSchema;
use tract_tflite::prelude::*;

use crate::runtime;

pub const OP_NAME: &str = "map_classify_tpu";
pub const DEFAULT_TOPK: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationRequest {
    /// Flattened input tensor; every value must fit the signed 8-bit range.
    pub input: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topk: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredClass {
    pub index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationResult {
    pub op: String,
    pub model_path: String,
    pub topk: Vec<ScoredClass>,
    pub elapsed_ms: f64,
}

/// The k highest scores, descending, ties broken by ascending index.
fn top_k(scores: &[f32], k: usize) -> Vec<ScoredClass> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    indexed.truncate(k.min(scores.len()));
    indexed
        .into_iter()
        .map(|(index, score)| ScoredClass { index, score })
        .collect()
}

fn run_inference(path: &str, input: &[i64], k: usize) -> Result<Vec<ScoredClass>, OpError> {
    let model = runtime::get_model(path)?;

    if input.len() != model.input_len {
        return Err(OpError::ShapeMismatch {
            got: input.len(),
            expected: model.input_len,
        });
    }

    let mut tensor = match model.input_dt.unquantized() {
        DatumType::I8 => {
            let data: Vec<i8> = input.iter().map(|&v| v as i8).collect();
            Tensor::from_shape(&model.input_shape, &data)
        }
        DatumType::U8 => {
            // u8 models get the request bytes reinterpreted; the wire
            // convention is signed quantized values either way.
            let data: Vec<u8> = input.iter().map(|&v| v as i8 as u8).collect();
            Tensor::from_shape(&model.input_shape, &data)
        }
        dt => {
            return Err(OpError::DeviceError(format!(
                "unsupported input dtype {dt:?}"
            )))
        }
    }
    .map_err(|e| OpError::DeviceError(format!("failed to build input tensor: {e}")))?;

    // Quantized facts carry zero-point/scale; the raw bytes are already in
    // the model's domain, so only the datum type is rewritten.
    if model.input_dt.is_quantized() {
        unsafe { tensor.set_datum_type(model.input_dt) };
    }

    let outputs = model
        .plan
        .run(tvec!(tensor.into()))
        .map_err(|e| OpError::DeviceError(format!("inference failed: {e}")))?;

    let output = outputs
        .first()
        .ok_or_else(|| OpError::DeviceError("model produced no outputs".to_string()))?;
    let scores = output
        .cast_to::<f32>()
        .map_err(|e| OpError::DeviceError(format!("output cast failed: {e}")))?;
    let scores = scores
        .as_slice::<f32>()
        .map_err(|e| OpError::DeviceError(format!("output read failed: {e}")))?;

    Ok(top_k(scores, k.min(model.class_count)))
}

/// Quantized TFLite classification.
///
/// Payload: `{"input": [i8...], "model_path": optional, "topk": optional}`.
/// Response: `{"op", "model_path", "topk": [{index, score}...], "elapsed_ms"}`.
#[crate::register_op]
#[derive(Default)]
pub struct ClassifyTpuOp {}

#[async_trait]
impl OpLogic for ClassifyTpuOp {
    fn get_op(&self) -> Op {
        Op::new(
            OP_NAME,
            "Runs a quantized TFLite classifier over a flat int8 tensor.",
            "AI/ML",
        )
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        let t0 = Instant::now();

        let request: ClassificationRequest = from_value(payload.clone())
            .map_err(|e| OpError::invalid(format!("invalid payload: {e}")))?;

        let topk = match request.topk {
            None => DEFAULT_TOPK,
            Some(k) if k > 0 => k as usize,
            Some(k) => {
                return Err(OpError::invalid(format!(
                    "topk must be a positive integer (got {k})"
                )))
            }
        };

        if let Some(&v) = request.input.iter().find(|v| !(-128..=127).contains(*v)) {
            return Err(OpError::invalid(format!(
                "input values must be signed 8-bit integers (got {v})"
            )));
        }

        let model_path = runtime::resolve_model_path(request.model_path.as_deref());

        let path = model_path.clone();
        let input = request.input;
        let topk = tokio::task::spawn_blocking(move || run_inference(&path, &input, topk))
            .await
            .map_err(|e| OpError::Internal(format!("inference task join error: {e}")))??;

        let result = ClassificationResult {
            op: OP_NAME.to_string(),
            model_path,
            topk,
            elapsed_ms: elapsed_ms(t0),
        };

        to_value(result).map_err(|e| OpError::Internal(e.to_string()))
    }
}
