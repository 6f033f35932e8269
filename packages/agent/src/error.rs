/// Fatal agent-level failures. Transient controller trouble (failed
/// heartbeats, lease timeouts) is logged and retried instead.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http client error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        AgentError::Http(e.to_string())
    }
}
