use opswarm_types::json::{json, Deserialize, Serialize, Value};

/// Task leased from the controller. Every field is optional because the
/// controller's envelope has drifted across versions; the worker validates
/// what it actually needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskEnvelope {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub job_id: Option<Value>,
    #[serde(default)]
    pub op: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl TaskEnvelope {
    /// Best-effort task identifier for logging.
    pub fn display_id(&self) -> String {
        match &self.id {
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => "?".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Ok,
    Error,
}

/// Builds the result body posted back to the controller. The task id is
/// reported under both `task_id` and `id` for older controller builds,
/// and `task_id`/`job_id` fill in for each other when a lease carries
/// only one, so controllers keying on either field can correlate.
pub fn result_body(
    agent: &str,
    task: &TaskEnvelope,
    status: TaskStatus,
    result: Option<Value>,
    error: Option<String>,
) -> Value {
    let task_id = task
        .id
        .clone()
        .filter(|v| !v.is_null())
        .or_else(|| task.job_id.clone().filter(|v| !v.is_null()))
        .unwrap_or_else(|| Value::String(String::new()));
    let job_id = task
        .job_id
        .clone()
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| task_id.clone());
    json!({
        "agent": agent,
        "task_id": task_id,
        "id": task_id,
        "job_id": job_id,
        "status": status,
        "result": result,
        "error": error,
    })
}
