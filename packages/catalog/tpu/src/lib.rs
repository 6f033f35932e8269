//! TPU-style inference catalog for opswarm.
//!
//! This crate contains the quantized TFLite classification op. It is kept
//! out of the standard catalog because it carries the heavy `tract-tflite`
//! dependency.

use std::sync::Arc;

pub use opswarm::{inventory, register_op, OpConstructor, OpLogic};

pub mod classify;
pub mod runtime;

pub use classify::{ClassificationRequest, ClassificationResult, ScoredClass};

pub fn get_catalog() -> Vec<Arc<dyn OpLogic>> {
    opswarm::get_catalog()
}
