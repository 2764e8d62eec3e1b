//! Fleet engine services.
//!
//! - `failure_classifier`: transient vs permanent gateway failures
//! - `bot_worker`: one polling task per bot token
//! - `fleet_registry`: the dual-indexed set of running workers
//! - `reconciler`: periodic sync of the fleet with the card store

pub mod bot_worker;
pub mod failure_classifier;
pub mod fleet_registry;
pub mod reconciler;

pub use bot_worker::{BotInstance, PendingBot, StopReason, WorkerConfig, WorkerContext};
pub use failure_classifier::{FailureClass, FailureClassifier, PatternClassifier};
pub use fleet_registry::{FleetRegistry, StartOutcome};
pub use reconciler::{CycleReport, Reconciler};
