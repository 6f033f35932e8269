use std::sync::Arc;
use std::time::{Duration, Instant};

use opswarm::registry::OpRegistry;
use opswarm_types::json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::controller::ControllerClient;
use crate::metrics::SystemMetrics;
use crate::task::{result_body, TaskEnvelope, TaskStatus};

/// Shared state handed to every worker and the heartbeat loop.
pub struct AgentState {
    pub config: AgentConfig,
    pub client: ControllerClient,
    pub registry: OpRegistry,
    pub metrics: SystemMetrics,
}

/// Leases tasks and executes them until cancelled. Each worker is an
/// independent lease loop; the controller serializes task handout.
pub async fn worker_loop(worker_id: usize, state: Arc<AgentState>, cancel: CancellationToken) {
    info!(worker_id, "worker started");
    loop {
        let lease = tokio::select! {
            _ = cancel.cancelled() => break,
            lease = state.client.lease(state.config.wait_ms) => lease,
        };
        match lease {
            Ok(Some(task)) => {
                state.metrics.worker_started();
                run_task(worker_id, &state, task).await;
                state.metrics.worker_finished();
            }
            Ok(None) => {
                idle_pause(&state.config, &cancel).await;
            }
            Err(e) => {
                warn!(worker_id, error = %e, "lease failed, backing off");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    }
    info!(worker_id, "worker stopped");
}

async fn idle_pause(config: &AgentConfig, cancel: &CancellationToken) {
    if config.lease_idle_secs <= 0.0 {
        return;
    }
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(Duration::from_secs_f64(config.lease_idle_secs)) => {}
    }
}

async fn run_task(worker_id: usize, state: &AgentState, task: TaskEnvelope) {
    let task_id = task.display_id();
    let op_name = task.op.clone().unwrap_or_default();
    debug!(worker_id, task_id, op = op_name, "task leased");

    let Some(op) = state.registry.get(&op_name) else {
        warn!(worker_id, task_id, op = op_name, "unknown op");
        let body = result_body(
            &state.config.agent_name,
            &task,
            TaskStatus::Error,
            None,
            Some(format!("unknown op: {op_name}")),
        );
        post_result(state, &task_id, &body).await;
        return;
    };

    let payload = task.payload.clone().unwrap_or(Value::Null);
    let start = Instant::now();
    let (status, result, err) = match op.run(&payload).await {
        Ok(result) => (TaskStatus::Ok, Some(result), None),
        Err(e) => (TaskStatus::Error, None, Some(e.to_string())),
    };
    let elapsed_ms = opswarm_types::elapsed_ms(start);
    match status {
        TaskStatus::Ok => info!(worker_id, task_id, op = op_name, elapsed_ms, "task done"),
        TaskStatus::Error => {
            warn!(worker_id, task_id, op = op_name, elapsed_ms, error = err.as_deref(), "task failed")
        }
    }

    let body = result_body(&state.config.agent_name, &task, status, result, err);
    post_result(state, &task_id, &body).await;
}

async fn post_result(state: &AgentState, task_id: &str, body: &Value) {
    if !state.client.post_result(body).await {
        error!(task_id, "failed to post result, dropping");
    }
}

/// Reports liveness and metrics on a fixed cadence until cancelled.
pub async fn heartbeat_loop(state: Arc<AgentState>, cancel: CancellationToken) {
    let period = Duration::from_secs_f64(state.config.heartbeat_secs.max(0.5));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }
        if !state.client.heartbeat(state.metrics.collect()).await {
            debug!("heartbeat not accepted");
        }
    }
}
