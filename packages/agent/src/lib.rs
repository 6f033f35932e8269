//! The opswarm agent: a long-running worker process that leases tasks
//! from a controller and dispatches them to the op catalog.
//!
//! Controller contract:
//! - Lease task:  `GET  {prefix}/task?agent=NAME&wait_ms=MS`
//! - Register:    `POST {prefix}/agents/register`
//! - Heartbeat:   `POST {prefix}/agents/heartbeat`
//! - Result:      `POST {prefix}/result`
//!
//! Endpoints are probed under the configured prefix first, then bare, so
//! the agent works against controllers with and without an `/api` mount.

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod task;
pub mod worker;

pub use config::AgentConfig;
pub use controller::ControllerClient;
pub use error::AgentError;
pub use metrics::SystemMetrics;
pub use task::{TaskEnvelope, TaskStatus};
pub use worker::AgentState;
