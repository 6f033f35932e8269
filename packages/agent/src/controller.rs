use std::sync::Mutex;
use std::time::Duration;

use opswarm_types::json::{json, Value};
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::task::TaskEnvelope;

/// HTTP client for the controller API.
///
/// Controllers mount their routes either under a prefix (`/api/...`) or at
/// the root, and older builds serve results at `/result` instead of
/// `{prefix}/result`. Both quirks are probed at runtime: registration walks
/// the candidate prefixes and the result path falls back once on 404, then
/// sticks with whatever worked.
pub struct ControllerClient {
    http: reqwest::Client,
    base: String,
    agent_name: String,
    candidates: Vec<String>,
    prefix: Mutex<String>,
    result_path: Mutex<Option<String>>,
}

impl ControllerClient {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.http_timeout_secs))
            .build()?;
        let mut candidates = vec![config.api_prefix.clone()];
        if !config.api_prefix.is_empty() {
            candidates.push(String::new());
        }
        Ok(ControllerClient {
            http,
            base: config.controller_url.clone(),
            agent_name: config.agent_name.clone(),
            prefix: Mutex::new(config.api_prefix.clone()),
            result_path: Mutex::new(None),
            candidates,
        })
    }

    fn url(&self, path: &str) -> String {
        let prefix = self.prefix.lock().map(|p| p.clone()).unwrap_or_default();
        format!("{}{}{}", self.base, prefix, path)
    }

    /// Sends a request, returning (status, body). A transport-level
    /// failure is reported as status 0 so callers can treat it like any
    /// other retryable response.
    async fn send_json(&self, request: reqwest::RequestBuilder) -> (u16, Value) {
        match request.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.json::<Value>().await.unwrap_or(Value::Null);
                (status, body)
            }
            Err(e) => {
                debug!(error = %e, "controller request failed");
                (0, Value::Null)
            }
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> (u16, Value) {
        self.send_json(self.http.post(url).json(body)).await
    }

    /// Query parameters go through reqwest so names with spaces or `&`
    /// are percent-encoded.
    fn lease_request(&self, wait_ms: u64) -> reqwest::RequestBuilder {
        let wait = wait_ms.to_string();
        self.http.get(self.url("/task")).query(&[
            ("agent", self.agent_name.as_str()),
            ("wait_ms", wait.as_str()),
        ])
    }

    /// Registers this agent, probing prefix candidates until one answers
    /// with anything other than 404. Returns true on a 2xx response.
    pub async fn register(&self, ops: &[String], labels: &Value, metrics: Value) -> bool {
        let body = json!({
            "agent": self.agent_name,
            "labels": labels,
            "capabilities": {"ops": ops},
            "metrics": metrics,
        });
        for candidate in &self.candidates {
            let url = format!("{}{}/agents/register", self.base, candidate);
            let (status, _) = self.post_json(&url, &body).await;
            if status == 404 {
                debug!(url, "register path not found, trying next prefix");
                continue;
            }
            if status == 0 {
                continue;
            }
            if let Ok(mut prefix) = self.prefix.lock() {
                *prefix = candidate.clone();
            }
            if (200..300).contains(&status) {
                return true;
            }
            warn!(status, url, "unexpected register response");
            return false;
        }
        false
    }

    /// Sends a heartbeat with the current metrics snapshot.
    pub async fn heartbeat(&self, metrics: Value) -> bool {
        let body = json!({
            "agent": self.agent_name,
            "metrics": metrics,
        });
        let url = self.url("/agents/heartbeat");
        let (status, _) = self.post_json(&url, &body).await;
        (200..300).contains(&status)
    }

    /// Long-polls for the next task. `Ok(None)` means the window expired
    /// without work; `Err` covers transport failures and non-2xx responses.
    pub async fn lease(&self, wait_ms: u64) -> Result<Option<TaskEnvelope>, AgentError> {
        let (status, body) = self.send_json(self.lease_request(wait_ms)).await;
        match status {
            s if (200..300).contains(&s) => {
                if body.is_null() {
                    return Ok(None);
                }
                let task: TaskEnvelope = opswarm_types::json::from_value(body)
                    .map_err(|e| AgentError::Http(format!("bad task envelope: {e}")))?;
                if task.op.is_none() && task.id.is_none() {
                    return Ok(None);
                }
                Ok(Some(task))
            }
            404 => Ok(None),
            0 => Err(AgentError::Http("controller unreachable".to_string())),
            s => Err(AgentError::Http(format!("lease returned status {s}"))),
        }
    }

    /// Posts a task result. On the first 404 the bare `/result` route is
    /// tried and remembered.
    pub async fn post_result(&self, body: &Value) -> bool {
        let path = self
            .result_path
            .lock()
            .ok()
            .and_then(|p| p.clone());
        if let Some(path) = path {
            let (status, _) = self.post_json(&format!("{}{}", self.base, path), body).await;
            return (200..300).contains(&status);
        }

        let prefixed = format!("{}/result", self.prefix.lock().map(|p| p.clone()).unwrap_or_default());
        let (status, _) = self.post_json(&format!("{}{}", self.base, prefixed), body).await;
        if status == 404 {
            let (status, _) = self.post_json(&format!("{}/result", self.base), body).await;
            if (200..300).contains(&status) {
                if let Ok(mut slot) = self.result_path.lock() {
                    *slot = Some("/result".to_string());
                }
                return true;
            }
            return false;
        }
        if (200..300).contains(&status) {
            if let Ok(mut slot) = self.result_path.lock() {
                *slot = Some(prefixed);
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opswarm_types::json::Map;

    fn config() -> AgentConfig {
        AgentConfig {
            controller_url: "http://controller:8080".to_string(),
            api_prefix: "/api".to_string(),
            agent_name: "edge node&1".to_string(),
            tasks: vec!["echo".to_string()],
            labels: Map::new(),
            heartbeat_secs: 3.0,
            wait_ms: 2_000,
            lease_idle_secs: 0.05,
            http_timeout_secs: 6.0,
            workers: 1,
        }
    }

    #[test]
    fn lease_query_is_percent_encoded() {
        let client = ControllerClient::new(&config()).unwrap();
        let request = client.lease_request(2_000).build().unwrap();
        let url = request.url();
        assert_eq!(url.path(), "/api/task");
        let query = url.query().unwrap();
        assert!(query.contains("wait_ms=2000"));
        assert!(query.contains("%26"));
        assert!(!query.contains(' '));
    }
}
