//! Tests for the classification op contract.
//!
//! Validation and error-path tests run anywhere. Tests that need a real
//! quantized .tflite artifact are marked #[ignore]; point TPU_MODEL_PATH
//! at a classifier and run with -- --include-ignored to exercise them.

use opswarm::{OpError, OpLogic};
use opswarm_catalog_tpu::classify::ClassifyTpuOp;
use serde_json::json;

#[tokio::test]
async fn missing_input_is_invalid_parameter() {
    let err = ClassifyTpuOp::default().run(&json!({})).await.unwrap_err();
    assert!(matches!(err, OpError::InvalidParameter(_)));
}

#[tokio::test]
async fn non_positive_topk_is_invalid_parameter() {
    for bad in [0, -3] {
        let err = ClassifyTpuOp::default()
            .run(&json!({"input": [0, 1], "topk": bad}))
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidParameter(_)));
    }
}

#[tokio::test]
async fn fractional_topk_is_invalid_parameter() {
    let err = ClassifyTpuOp::default()
        .run(&json!({"input": [0, 1], "topk": 2.5}))
        .await
        .unwrap_err();
    assert!(matches!(err, OpError::InvalidParameter(_)));
}

#[tokio::test]
async fn out_of_range_input_is_invalid_parameter() {
    for bad in [128i64, -129, 1000] {
        let err = ClassifyTpuOp::default()
            .run(&json!({"input": [0, bad]}))
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidParameter(_)));
    }
}

#[tokio::test]
async fn missing_model_is_model_not_found() {
    let err = ClassifyTpuOp::default()
        .run(&json!({"input": vec![0i64; 4], "model_path": "/does/not/exist.tflite"}))
        .await
        .unwrap_err();
    assert!(matches!(err, OpError::ModelNotFound(_)));
}

#[tokio::test]
async fn parameter_validation_precedes_model_load() {
    // A bad topk must fail before the (also bad) model path is touched.
    let err = ClassifyTpuOp::default()
        .run(&json!({"input": [0], "topk": 0, "model_path": "/does/not/exist.tflite"}))
        .await
        .unwrap_err();
    assert!(matches!(err, OpError::InvalidParameter(_)));
}

mod with_model {
    //! Model-dependent coverage, ignored unless an artifact is supplied.

    use super::*;

    fn model_path() -> String {
        std::env::var("TPU_MODEL_PATH").expect("set TPU_MODEL_PATH to run model tests")
    }

    fn input_len(path: &str) -> usize {
        opswarm_catalog_tpu::runtime::get_model(path)
            .expect("model loads")
            .input_len
    }

    #[tokio::test]
    #[ignore]
    async fn repeated_calls_are_deterministic() {
        let path = model_path();
        let payload = json!({"input": vec![0i64; input_len(&path)], "model_path": path});

        let a = ClassifyTpuOp::default().run(&payload).await.unwrap();
        let b = ClassifyTpuOp::default().run(&payload).await.unwrap();
        assert_eq!(a["topk"], b["topk"]);
        assert_eq!(a["op"], json!("map_classify_tpu"));
    }

    #[tokio::test]
    #[ignore]
    async fn topk_defaults_to_five_and_is_sorted() {
        let path = model_path();
        let payload = json!({"input": vec![1i64; input_len(&path)], "model_path": path});

        let out = ClassifyTpuOp::default().run(&payload).await.unwrap();
        let topk = out["topk"].as_array().unwrap();
        assert!(topk.len() <= 5);
        let scores: Vec<f64> = topk.iter().map(|s| s["score"].as_f64().unwrap()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(out["elapsed_ms"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    #[ignore]
    async fn wrong_input_length_is_shape_mismatch() {
        let path = model_path();
        let payload = json!({"input": vec![0i64; input_len(&path) + 1], "model_path": path});

        let err = ClassifyTpuOp::default().run(&payload).await.unwrap_err();
        assert!(matches!(err, OpError::ShapeMismatch { .. }));
    }
}
