//! `cardfleet run`: reconcile until interrupted.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::runtime::FleetRuntime;
use crate::domain::models::Config;

/// Printed when `run` exits.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub stopped_bots: usize,
}

impl CommandOutput for RunSummary {
    fn to_human(&self) -> String {
        format!("Bot manager stopped ({} bots shut down).", self.stopped_bots)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "status": "stopped", "stopped_bots": self.stopped_bots })
    }
}

/// Run the bot manager until Ctrl-C or SIGTERM.
pub async fn execute(config: Config, json_mode: bool) -> Result<()> {
    let runtime = FleetRuntime::build(&config).await?;
    let shutdown = runtime.root.child_token();

    let reconciler = runtime.reconciler;
    let loop_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        reconciler.run(loop_shutdown).await;
    });

    wait_for_signal().await;
    tracing::info!("Shutdown signal received, stopping bots");

    shutdown.cancel();
    if let Err(e) = handle.await {
        tracing::error!(error = %e, "Reconciliation task panicked");
    }

    let stopped_bots = runtime.fleet.running_count().await;
    runtime.fleet.shutdown().await;

    output(&RunSummary { stopped_bots }, json_mode);
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
