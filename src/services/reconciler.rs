//! Reconciler: drives the running fleet towards the cards in the database.
//!
//! Every cycle re-reads the desired state, validates each token against
//! Telegram, starts what is missing and stops what is no longer wanted. The
//! loop keeps no state of its own between cycles, so a missed or reordered
//! change in the database is picked up on the next pass.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{DomainResult, FleetError};
use crate::domain::models::{BotBinding, BotToken, CardId};
use crate::domain::ports::{BotGateway, CardStore};
use crate::services::failure_classifier::{FailureClass, FailureClassifier};
use crate::services::fleet_registry::{FleetRegistry, StartOutcome};

/// Prefix of the diagnostic stored for a rejected token.
pub const TOKEN_VALIDATION_FAILED_PREFIX: &str = "Token validation failed: ";

/// Counters for one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Cards returned by the store.
    pub desired: usize,
    /// Workers started for the first time.
    pub started: usize,
    /// Cards whose worker was already running with the right token.
    pub already_running: usize,
    /// Cards whose worker was swapped to a new token.
    pub replaced: usize,
    /// Start attempts rejected because the token belongs to another card.
    pub conflicts: usize,
    /// Start attempts that failed to authenticate or set up.
    pub creation_failures: usize,
    /// Tokens marked invalid this cycle.
    pub invalidated: usize,
    /// Cards whose stale validity diagnostic was cleared.
    pub revalidated: usize,
    /// Validations that failed for connectivity reasons.
    pub transient_failures: usize,
    /// Workers stopped because no valid card wants them any more.
    pub stopped_stale: usize,
    /// Running workers at the end of the cycle.
    pub running: usize,
}

/// Periodic reconciliation of the bot fleet.
pub struct Reconciler {
    store: Arc<dyn CardStore>,
    gateway: Arc<dyn BotGateway>,
    fleet: Arc<FleetRegistry>,
    classifier: Arc<dyn FailureClassifier>,
    interval: Duration,
}

impl Reconciler {
    /// Create a reconciler that runs a cycle every `interval`.
    pub fn new(
        store: Arc<dyn CardStore>,
        gateway: Arc<dyn BotGateway>,
        fleet: Arc<FleetRegistry>,
        classifier: Arc<dyn FailureClassifier>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            fleet,
            classifier,
            interval,
        }
    }

    /// The registry this reconciler drives.
    pub fn fleet(&self) -> &Arc<FleetRegistry> {
        &self.fleet
    }

    /// Run cycles every interval until `shutdown` is cancelled.
    ///
    /// The first cycle runs after one full interval. A failed cycle (store
    /// unreachable) is logged and retried on the next tick.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip first tick (fires immediately)
        ticker.tick().await;

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Bot manager started, monitoring visit cards with bot tokens"
        );

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    tracing::info!("Received shutdown signal, stopping reconciliation");
                    break;
                }

                _ = ticker.tick() => {
                    let start = Instant::now();
                    match self.reconcile_once().await {
                        Ok(report) => tracing::info!(
                            running = report.running,
                            started = report.started,
                            replaced = report.replaced,
                            stopped = report.stopped_stale,
                            invalidated = report.invalidated,
                            conflicts = report.conflicts,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Sync complete"
                        ),
                        Err(e) => tracing::error!(
                            error = %e,
                            "Error fetching visit cards for bot sync"
                        ),
                    }
                }
            }
        }
    }

    /// Run one reconciliation cycle.
    ///
    /// Only a failure to read the desired state is returned as an error;
    /// everything else is logged and counted in the report.
    pub async fn reconcile_once(&self) -> DomainResult<CycleReport> {
        tracing::debug!("Starting bot sync cycle");
        let desired = self.store.list_active().await?;
        tracing::debug!(count = desired.len(), "Found active visit cards");

        let mut report = CycleReport {
            desired: desired.len(),
            ..CycleReport::default()
        };
        let mut wanted: HashMap<CardId, BotToken> = HashMap::new();
        let mut to_run: Vec<&BotBinding> = Vec::new();

        for binding in &desired {
            if !binding.token.is_usable() {
                continue;
            }
            if self.validate(binding, &mut report).await {
                wanted.insert(binding.card_id, binding.token.clone());
                to_run.push(binding);
            }
        }

        // Free tokens that another card now wants before starting anything.
        self.sweep(&wanted, true, &mut report).await;

        for binding in to_run {
            self.ensure_running(binding, &mut report).await;
        }

        self.sweep(&wanted, false, &mut report).await;

        report.running = self.fleet.running_count().await;
        Ok(report)
    }

    /// Stop running workers whose card no longer wants their token.
    ///
    /// With `keep_movable`, a card that only switched to an unclaimed token
    /// keeps its worker so that `start` replaces it in place.
    async fn sweep(&self, wanted: &HashMap<CardId, BotToken>, keep_movable: bool, report: &mut CycleReport) {
        let wanted_tokens: HashSet<&BotToken> = wanted.values().collect();

        for (card_id, token) in self.fleet.bindings().await {
            let stale = match wanted.get(&card_id) {
                Some(want) if *want == token => false,
                Some(_) => !keep_movable || wanted_tokens.contains(&token),
                None => true,
            };
            if stale {
                tracing::info!(
                    card_id = %card_id,
                    token = %token,
                    "Stopping bot, visit card removed, token changed or marked invalid"
                );
                self.fleet.stop_by_card(card_id).await;
                report.stopped_stale += 1;
            }
        }
    }

    /// Validate a card's token. Returns false when the token was rejected.
    async fn validate(&self, binding: &BotBinding, report: &mut CycleReport) -> bool {
        let card_id = binding.card_id;

        let error = match self.gateway.authenticate(&binding.token).await {
            Ok(_) => {
                if binding.has_validity_flag() {
                    match self.store.set_token_validity(card_id, true, "").await {
                        Ok(()) => {
                            report.revalidated += 1;
                            tracing::info!(card_id = %card_id, "Token validated successfully");
                        }
                        Err(e) => tracing::error!(card_id = %card_id, error = %e, "Failed to clear token error"),
                    }
                }
                return true;
            }
            Err(e) => e,
        };

        match self.classifier.classify(&error.to_string()) {
            FailureClass::Transient => {
                report.transient_failures += 1;
                tracing::warn!(
                    card_id = %card_id,
                    error = %error,
                    "Network error validating token, not marking as invalid"
                );
                true
            }
            FailureClass::Permanent => {
                report.invalidated += 1;
                tracing::warn!(card_id = %card_id, error = %error, "Invalid token for visit card");

                let message = format!("{TOKEN_VALIDATION_FAILED_PREFIX}{error}");
                if let Err(e) = self.store.set_token_validity(card_id, false, &message).await {
                    tracing::error!(card_id = %card_id, error = %e, "Failed to mark token invalid");
                }
                self.fleet.stop(&binding.token).await;
                false
            }
        }
    }

    async fn ensure_running(&self, binding: &BotBinding, report: &mut CycleReport) {
        let card_id = binding.card_id;
        match self.fleet.start(binding.token.clone(), card_id).await {
            Ok(StartOutcome::Started) => {
                report.started += 1;
                tracing::info!(card_id = %card_id, "Successfully started bot");
            }
            Ok(StartOutcome::Replaced) => {
                report.replaced += 1;
                tracing::info!(card_id = %card_id, "Replaced bot with new token");
            }
            Ok(StartOutcome::AlreadyRunning) => report.already_running += 1,
            Err(e @ FleetError::Conflict { .. }) => {
                report.conflicts += 1;
                tracing::warn!(card_id = %card_id, error = %e, "Failed to start bot");
            }
            Err(e @ FleetError::Creation { .. }) => {
                report.creation_failures += 1;
                tracing::error!(card_id = %card_id, error = %e, "Failed to start bot");
            }
            Err(e @ FleetError::ShuttingDown { .. }) => {
                tracing::debug!(card_id = %card_id, error = %e, "Skipped bot start");
            }
        }
    }
}
