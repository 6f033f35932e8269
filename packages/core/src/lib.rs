//! Core op model for opswarm.
//!
//! This crate contains the pieces every catalog crate builds on:
//! - the [`op::OpLogic`] trait and [`op::Op`] metadata
//! - the [`op::OpError`] taxonomy surfaced to the controller
//! - [`OpConstructor`] and [`get_catalog()`] for link-time registration
//! - [`registry::OpRegistry`] used by the agent for dispatch

use std::sync::Arc;

pub mod op;
pub mod registry;

pub use op::{Op, OpError, OpLogic};
pub use opswarm_catalog_macros::register_op;
pub use registry::OpRegistry;

pub use inventory;

/// An op constructor function type.
pub struct OpConstructor {
    constructor: fn() -> Arc<dyn OpLogic>,
}

impl OpConstructor {
    pub const fn new(constructor: fn() -> Arc<dyn OpLogic>) -> Self {
        Self { constructor }
    }

    pub fn construct(&self) -> Arc<dyn OpLogic> {
        (self.constructor)()
    }
}

inventory::collect!(OpConstructor);

/// Materialize every op registered anywhere in the linked binary.
pub fn get_catalog() -> Vec<Arc<dyn OpLogic>> {
    inventory::iter::<OpConstructor>()
        .map(|oc| oc.construct())
        .collect()
}
