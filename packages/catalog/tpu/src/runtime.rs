//! Model loading and the process-wide plan cache.
//!
//! One model stays resident at a time; a request naming a different path
//! replaces it.
//! The cache is an optimization only; results are identical with or
//! without a warm slot.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use opswarm::OpError;
use tract_tflite::prelude::*;

pub const MODEL_PATH_ENV: &str = "TPU_MODEL_PATH";
pub const DEFAULT_MODEL_PATH: &str = "/models/model_edgetpu.tflite";

pub type TractRunnableModel =
    RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A compiled model pinned in memory, ready to run.
#[derive(Debug)]
pub struct LoadedModel {
    pub path: String,
    pub plan: TractRunnableModel,
    pub input_dt: DatumType,
    pub input_shape: Vec<usize>,
    pub input_len: usize,
    pub class_count: usize,
}

static MODEL_SLOT: Lazy<Mutex<Option<Arc<LoadedModel>>>> = Lazy::new(|| Mutex::new(None));

/// Resolve the model path: request value, then env, then the default.
pub fn resolve_model_path(requested: Option<&str>) -> String {
    requested
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(MODEL_PATH_ENV).ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string())
}

/// Fetch the resident model for `path`, loading it if the slot holds
/// nothing or a different artifact.
pub fn get_model(path: &str) -> Result<Arc<LoadedModel>, OpError> {
    let mut slot = MODEL_SLOT
        .lock()
        .map_err(|_| OpError::Internal("model cache lock poisoned".to_string()))?;

    if let Some(model) = slot.as_ref() {
        if model.path == path {
            return Ok(model.clone());
        }
    }

    let loaded = Arc::new(load_model(path)?);
    tracing::info!(model_path = %path, inputs = loaded.input_len, classes = loaded.class_count, "loaded tflite model");
    *slot = Some(loaded.clone());
    Ok(loaded)
}

fn load_model(path: &str) -> Result<LoadedModel, OpError> {
    let bytes =
        std::fs::read(path).map_err(|e| OpError::ModelNotFound(format!("{path}: {e}")))?;

    let mut cursor = Cursor::new(bytes);
    let model = tract_tflite::tflite()
        .model_for_read(&mut cursor)
        .map_err(|e| OpError::DeviceError(format!("tflite parse error: {e}")))?;

    let input_outlet = model
        .input_outlets()
        .map_err(|e| OpError::DeviceError(e.to_string()))?
        .first()
        .copied()
        .ok_or_else(|| OpError::DeviceError("model has no inputs".to_string()))?;
    let input_fact = model
        .outlet_fact(input_outlet)
        .map_err(|e| OpError::DeviceError(e.to_string()))?
        .clone();

    let input_dt = input_fact.datum_type;
    match input_dt.unquantized() {
        DatumType::I8 | DatumType::U8 => {}
        dt => {
            return Err(OpError::DeviceError(format!(
                "unsupported input dtype {dt:?} (expected a quantized int8 model)"
            )))
        }
    }

    let input_shape: Vec<usize> = input_fact
        .shape
        .as_concrete()
        .map(|dims| dims.to_vec())
        .ok_or_else(|| OpError::DeviceError("model input shape is not concrete".to_string()))?;
    let input_len = input_shape.iter().product();

    let output_outlet = model
        .output_outlets()
        .map_err(|e| OpError::DeviceError(e.to_string()))?
        .first()
        .copied()
        .ok_or_else(|| OpError::DeviceError("model has no outputs".to_string()))?;
    let class_count: usize = model
        .outlet_fact(output_outlet)
        .map_err(|e| OpError::DeviceError(e.to_string()))?
        .shape
        .as_concrete()
        .map(|dims| dims.iter().product())
        .ok_or_else(|| OpError::DeviceError("model output shape is not concrete".to_string()))?;

    let plan = model
        .into_optimized()
        .and_then(|m| m.into_runnable())
        .map_err(|e| OpError::DeviceError(format!("failed to compile model: {e}")))?;

    Ok(LoadedModel {
        path: path.to_string(),
        plan,
        input_dt,
        input_shape,
        input_len,
        class_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_path_takes_precedence() {
        assert_eq!(resolve_model_path(Some("/tmp/m.tflite")), "/tmp/m.tflite");
    }

    #[test]
    fn empty_request_falls_through() {
        // Either the env override or the compiled-in default; never empty.
        assert!(!resolve_model_path(Some("")).is_empty());
        assert!(!resolve_model_path(None).is_empty());
    }

    #[test]
    fn missing_artifact_is_model_not_found() {
        let err = load_model("/does/not/exist.tflite").unwrap_err();
        assert!(matches!(err, OpError::ModelNotFound(_)));
    }

    #[test]
    fn garbage_artifact_is_device_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.tflite");
        std::fs::write(&path, b"not a flatbuffer").unwrap();
        let err = load_model(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, OpError::DeviceError(_)));
    }
}
