//! Shared types and re-exports for the opswarm workspace.
//!
//! Downstream crates import their async/error/serialization surface from
//! here so the whole workspace agrees on one version of each.

pub use anyhow::{anyhow, bail, Context, Error, Result};
pub use async_trait::async_trait;
pub use futures;
pub use schemars::JsonSchema;
pub use tokio;

/// JSON (de)serialization surface used across all op crates.
pub mod json {
    pub use serde::de::DeserializeOwned;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{from_str, from_value, json, to_string, to_value, Map, Number, Value};
}

/// Current wall-clock duration helper used by compute ops.
///
/// Returns elapsed milliseconds as f64 so results serialize as JSON floats.
pub fn elapsed_ms(start: std::time::Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_ms_is_non_negative() {
        let start = std::time::Instant::now();
        assert!(elapsed_ms(start) >= 0.0);
    }
}
