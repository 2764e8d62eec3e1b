//! Wiring of the fleet from configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::adapters::sqlite::{initialize_database, SqliteCardStore};
use crate::adapters::telegram::TelegramGateway;
use crate::domain::models::Config;
use crate::domain::ports::{BotGateway, CardStore};
use crate::services::{FailureClassifier, FleetRegistry, PatternClassifier, Reconciler, WorkerConfig, WorkerContext};

/// Everything a command needs to drive the fleet.
pub struct FleetRuntime {
    pub reconciler: Reconciler,
    pub fleet: Arc<FleetRegistry>,
    pub root: CancellationToken,
}

impl FleetRuntime {
    /// Connect to the database and assemble the engine.
    pub async fn build(config: &Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .context("Failed to initialize database")?;
        let store: Arc<dyn CardStore> = Arc::new(SqliteCardStore::new(pool));
        let gateway: Arc<dyn BotGateway> = Arc::new(TelegramGateway::new(&config.telegram)?);

        Ok(Self::assemble(config, store, gateway))
    }

    /// Assemble the engine over existing adapters.
    pub fn assemble(config: &Config, store: Arc<dyn CardStore>, gateway: Arc<dyn BotGateway>) -> Self {
        let classifier: Arc<dyn FailureClassifier> = Arc::new(PatternClassifier::with_extra_patterns(
            config.fleet.extra_transient_patterns.iter().cloned(),
        ));

        let context = WorkerContext {
            gateway: gateway.clone(),
            store: store.clone(),
            classifier: classifier.clone(),
            config: WorkerConfig {
                poll_interval: config.fleet.poll_interval(),
            },
        };

        let root = CancellationToken::new();
        let fleet = Arc::new(FleetRegistry::new(context, root.clone(), config.fleet.settle_delay()));
        let reconciler = Reconciler::new(store, gateway, fleet.clone(), classifier, config.fleet.sync_interval());

        Self { reconciler, fleet, root }
    }
}
