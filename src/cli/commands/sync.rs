//! `cardfleet sync`: one reconciliation cycle.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::{detail_table, output, CommandOutput};
use crate::cli::runtime::FleetRuntime;
use crate::domain::models::Config;
use crate::services::CycleReport;

/// Report of a one-off `sync`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct SyncOutput(pub CycleReport);

impl CommandOutput for SyncOutput {
    fn to_human(&self) -> String {
        let r = &self.0;
        let rows = [
            ("desired", r.desired.to_string()),
            ("started", r.started.to_string()),
            ("already running", r.already_running.to_string()),
            ("replaced", r.replaced.to_string()),
            ("conflicts", r.conflicts.to_string()),
            ("creation failures", r.creation_failures.to_string()),
            ("invalidated", r.invalidated.to_string()),
            ("revalidated", r.revalidated.to_string()),
            ("transient failures", r.transient_failures.to_string()),
            ("stopped", r.stopped_stale.to_string()),
            ("running", r.running.to_string()),
        ];
        format!("Sync complete:\n{}", detail_table(&rows))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or_default()
    }
}

/// Run one cycle, then stop every bot it started.
pub async fn execute(config: Config, json_mode: bool) -> Result<()> {
    let runtime = FleetRuntime::build(&config).await?;

    let result = runtime.reconciler.reconcile_once().await;
    runtime.fleet.shutdown().await;

    let report = result.context("Failed to read visit cards")?;
    output(&SyncOutput(report), json_mode);
    Ok(())
}
