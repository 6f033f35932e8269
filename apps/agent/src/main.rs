use std::sync::Arc;
use std::time::Duration;

use opswarm::registry::OpRegistry;
use opswarm_agent::worker::{heartbeat_loop, worker_loop};
use opswarm_agent::{AgentConfig, AgentState, ControllerClient, SystemMetrics};
use opswarm_types::json::Value;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config = AgentConfig::from_env();
    tracing::info!(
        agent = %config.agent_name,
        controller = %config.controller_url,
        workers = config.workers,
        "starting agent"
    );

    let registry = OpRegistry::from_ops(opswarm_catalog::get_catalog())
        .restrict(config.enabled_ops().as_ref());
    if registry.is_empty() {
        tracing::warn!("no ops enabled, agent will lease tasks it cannot run");
    }
    tracing::info!(ops = ?registry.names(), "op catalog ready");

    let client = ControllerClient::new(&config)?;
    let metrics = SystemMetrics::new();
    register_with_retry(&client, &config, &registry, &metrics).await;

    let state = Arc::new(AgentState {
        config,
        client,
        registry,
        metrics,
    });

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let mut handles = Vec::new();
    handles.push(tokio::spawn(heartbeat_loop(state.clone(), cancel.clone())));
    for worker_id in 0..state.config.workers {
        handles.push(tokio::spawn(worker_loop(worker_id, state.clone(), cancel.clone())));
    }

    for handle in handles {
        let _ = handle.await;
    }
    tracing::info!("agent stopped");
    Ok(())
}

/// Registration is retried forever with jittered backoff, so the agent can
/// come up before the controller does.
async fn register_with_retry(
    client: &ControllerClient,
    config: &AgentConfig,
    registry: &OpRegistry,
    metrics: &SystemMetrics,
) {
    let ops = registry.names();
    let labels = Value::Object(config.labels.clone());
    let mut delay = Duration::from_millis(500);
    loop {
        if client.register(&ops, &labels, metrics.collect()).await {
            tracing::info!(ops = ?ops, "registered with controller");
            return;
        }
        let jitter = Duration::from_millis(rand::rng().random_range(0..250));
        tracing::warn!(retry_in = ?(delay + jitter), "registration failed, retrying");
        tokio::time::sleep(delay + jitter).await;
        delay = (delay * 2).min(Duration::from_secs(10));
    }
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(sig) => sig,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to install SIGTERM handler");
                        let _ = ctrl_c.await;
                        cancel.cancel();
                        return;
                    }
                };
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        tracing::info!("shutdown signal received, draining workers");
        cancel.cancel();
    });
}
