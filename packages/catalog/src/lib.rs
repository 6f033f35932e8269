//! Standard op catalog for opswarm.
//!
//! This crate contains the CPU-only ops:
//! - Diagnostics (echo)
//! - Text (tokenize, summarize)
//! - Data (csv shards, risk aggregation)
//! - Compute (fibonacci, prime factorization, subset sum, SAT verification)
//!
//! TPU-backed inference lives in `opswarm-catalog-tpu`.

use std::sync::Arc;

pub use opswarm::{inventory, register_op, OpConstructor, OpLogic};
// Re-exported so the TPU crate's link-time registrations always ship with
// the catalog.
pub use opswarm_catalog_tpu as tpu;

pub mod csv_shard;
pub mod echo;
pub mod fibonacci;
pub mod prime_factor;
pub mod risk;
pub mod sat_verify;
pub mod subset_sum;
pub mod summarize;
pub mod tokenize;

pub fn get_catalog() -> Vec<Arc<dyn OpLogic>> {
    opswarm::get_catalog()
}
