use std::collections::HashSet;

use opswarm_types::json::{Map, Value};
use sysinfo::System;

const DEFAULT_CONTROLLER_URL: &str = "http://controller:8080";
const DEFAULT_API_PREFIX: &str = "/api";
const DEFAULT_TASKS: &str = "echo";

/// Runtime configuration for a single agent process, read once from the
/// environment at startup.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Controller base URL with no trailing slash.
    pub controller_url: String,
    /// Normalized API prefix (leading slash, no trailing slash). May be
    /// empty to talk to a controller that mounts its routes at the root.
    pub api_prefix: String,
    pub agent_name: String,
    /// Op names this agent advertises. `*` or `all` enables everything.
    pub tasks: Vec<String>,
    /// Free-form labels reported at registration time.
    pub labels: Map<String, Value>,
    pub heartbeat_secs: f64,
    /// Long-poll window for task leases, in milliseconds.
    pub wait_ms: u64,
    /// Pause between empty leases, keeps idle agents from spinning.
    pub lease_idle_secs: f64,
    pub http_timeout_secs: f64,
    pub workers: usize,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let controller_url = std::env::var("CONTROLLER_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTROLLER_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let api_prefix = normalize_prefix(
            &std::env::var("API_PREFIX").unwrap_or_else(|_| DEFAULT_API_PREFIX.to_string()),
        );

        let agent_name = std::env::var("AGENT_NAME")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(System::host_name)
            .unwrap_or_else(|| "agent".to_string());

        let tasks = parse_tasks(&std::env::var("TASKS").unwrap_or_else(|_| DEFAULT_TASKS.to_string()));

        let labels = parse_labels(&std::env::var("AGENT_LABELS").unwrap_or_default());

        AgentConfig {
            controller_url,
            api_prefix,
            agent_name,
            tasks,
            labels,
            heartbeat_secs: env_parse("HEARTBEAT_SEC", 3.0),
            wait_ms: env_parse("WAIT_MS", 2_000),
            lease_idle_secs: env_parse("LEASE_IDLE_SEC", 0.05),
            http_timeout_secs: env_parse("HTTP_TIMEOUT", 6.0),
            workers: env_parse("WORKERS", 1).max(1),
        }
    }

    /// Returns the set of enabled op names, or `None` when every op in the
    /// catalog should be served.
    pub fn enabled_ops(&self) -> Option<HashSet<String>> {
        if self.tasks.iter().any(|t| t == "*" || t == "all") {
            return None;
        }
        Some(self.tasks.iter().cloned().collect())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Normalizes a route prefix to `/foo` form; empty input stays empty.
pub(crate) fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

pub(crate) fn parse_tasks(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parses `k=v,other` label lists. Bare keys become boolean `true`.
pub(crate) fn parse_labels(raw: &str) -> Map<String, Value> {
    let mut labels = Map::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((k, v)) => {
                labels.insert(k.trim().to_string(), Value::String(v.trim().to_string()));
            }
            None => {
                labels.insert(part.to_string(), Value::Bool(true));
            }
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(normalize_prefix("/api"), "/api");
        assert_eq!(normalize_prefix("api/"), "/api");
        assert_eq!(normalize_prefix("//api//"), "/api");
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
    }

    #[test]
    fn tasks_are_split_and_trimmed() {
        assert_eq!(parse_tasks("echo, fibonacci ,"), vec!["echo", "fibonacci"]);
        assert!(parse_tasks("").is_empty());
    }

    #[test]
    fn wildcard_tasks_enable_all_ops() {
        let mut config = AgentConfig::from_env();
        config.tasks = vec!["*".to_string()];
        assert!(config.enabled_ops().is_none());
        config.tasks = vec!["echo".to_string()];
        let enabled = config.enabled_ops().unwrap();
        assert!(enabled.contains("echo"));
        assert_eq!(enabled.len(), 1);
    }

    #[test]
    fn labels_parse_pairs_and_flags() {
        let labels = parse_labels("zone=eu-west, tpu, rev=2");
        assert_eq!(labels.get("zone"), Some(&Value::String("eu-west".into())));
        assert_eq!(labels.get("tpu"), Some(&Value::Bool(true)));
        assert_eq!(labels.get("rev"), Some(&Value::String("2".into())));
        assert!(parse_labels("").is_empty());
    }
}
