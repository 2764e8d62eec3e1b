//! Fleet registry: the set of running bot workers.
//!
//! Workers are indexed twice, by card and by token, under one lock. The two
//! indices always hold the same instances, at most one per card and at most
//! one per token. Both indices are private; all changes go through
//! [`FleetRegistry::start`], [`FleetRegistry::stop`] and
//! [`FleetRegistry::stop_by_card`].
//!
//! The lock is never held across network I/O, a worker shutdown, or the
//! settling delay. A stopped worker is moved to a draining list until its task
//! has exited, and any `start` that touches the same card or token waits for
//! the drain to finish and then re-checks the indices before inserting.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::FleetError;
use crate::domain::models::{BotToken, CardId};
use crate::services::bot_worker::{BotInstance, StopReason, WorkerContext};

/// Result of a successful [`FleetRegistry::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new worker was started.
    Started,
    /// The card was already running this token.
    AlreadyRunning,
    /// The card's previous worker (other token) was stopped and replaced.
    Replaced,
}

#[derive(Default)]
struct FleetIndex {
    by_card: HashMap<CardId, Arc<BotInstance>>,
    by_token: HashMap<BotToken, Arc<BotInstance>>,
    /// Removed from the indices, task not yet exited.
    draining: Vec<Arc<BotInstance>>,
}

impl FleetIndex {
    fn insert(&mut self, instance: Arc<BotInstance>) {
        self.by_card.insert(instance.card_id(), instance.clone());
        self.by_token.insert(instance.token().clone(), instance);
    }

    /// Move an instance from both indices to the draining list and signal it.
    fn detach(&mut self, instance: &Arc<BotInstance>, reason: StopReason) {
        self.by_card.remove(&instance.card_id());
        self.by_token.remove(instance.token());
        instance.signal_stop(reason);
        self.draining.push(instance.clone());
    }

    fn draining_for(&self, card_id: CardId, token: &BotToken) -> Option<Arc<BotInstance>> {
        self.draining
            .iter()
            .find(|i| i.card_id() == card_id || i.token() == token)
            .cloned()
    }

    fn forget_drained(&mut self, instance: &Arc<BotInstance>) {
        self.draining.retain(|i| !Arc::ptr_eq(i, instance));
    }
}

/// What `start` has to do after inspecting the index.
enum StartStep {
    Done(StartOutcome),
    WaitFor(Arc<BotInstance>, bool),
    Connect,
}

/// Concurrency-safe registry of running bot workers.
pub struct FleetRegistry {
    index: RwLock<FleetIndex>,
    context: WorkerContext,
    root: CancellationToken,
    settle_delay: Duration,
}

impl FleetRegistry {
    /// Create a registry whose workers stop when `root` is cancelled.
    pub fn new(context: WorkerContext, root: CancellationToken, settle_delay: Duration) -> Self {
        Self {
            index: RwLock::new(FleetIndex::default()),
            context,
            root,
            settle_delay,
        }
    }

    /// Ensure a worker runs for `card_id` with `token`.
    ///
    /// - Same card, same token already running: no-op.
    /// - Same card, different token: the old worker is stopped and awaited,
    ///   then after the settling delay the new one is created.
    /// - Token running for a different card: [`FleetError::Conflict`], the
    ///   existing binding is left alone.
    /// - Authentication failure: [`FleetError::Creation`], nothing changes.
    /// - Called during or after [`FleetRegistry::shutdown`]:
    ///   [`FleetError::ShuttingDown`], nothing is spawned.
    pub async fn start(&self, token: BotToken, card_id: CardId) -> Result<StartOutcome, FleetError> {
        let mut replaced = false;

        loop {
            let step = {
                let mut index = self.index.write().await;
                if self.root.is_cancelled() {
                    return Err(FleetError::ShuttingDown { card_id });
                }
                Self::plan_start(&mut index, &token, card_id)?
            };

            match step {
                StartStep::Done(outcome) => return Ok(outcome),
                StartStep::WaitFor(previous, is_replacement) => {
                    if is_replacement {
                        tracing::info!(
                            card_id = %card_id,
                            old_token = %previous.token(),
                            new_token = %token,
                            "Visit card changed token, stopping old bot"
                        );
                    }
                    self.finish_drain(&previous).await;
                    if is_replacement {
                        replaced = true;
                        tokio::time::sleep(self.settle_delay).await;
                    }
                }
                StartStep::Connect => {
                    let pending = BotInstance::connect(self.context.clone(), card_id, token.clone())
                        .await
                        .map_err(|source| FleetError::Creation { card_id, source })?;

                    let mut index = self.index.write().await;
                    // Shutdown drained the index while we were connecting.
                    if self.root.is_cancelled() {
                        return Err(FleetError::ShuttingDown { card_id });
                    }
                    // Re-check: another start may have claimed the slot meanwhile.
                    if index.by_card.contains_key(&card_id)
                        || index.by_token.contains_key(&token)
                        || index.draining_for(card_id, &token).is_some()
                    {
                        tracing::debug!(card_id = %card_id, "Fleet changed during bot startup, retrying");
                        continue;
                    }

                    index.insert(pending.spawn(&self.root));
                    return Ok(if replaced {
                        StartOutcome::Replaced
                    } else {
                        StartOutcome::Started
                    });
                }
            }
        }
    }

    fn plan_start(index: &mut FleetIndex, token: &BotToken, card_id: CardId) -> Result<StartStep, FleetError> {
        if let Some(existing) = index.by_card.get(&card_id).cloned() {
            if existing.token() == token {
                tracing::debug!(card_id = %card_id, token = %token, "Bot already running");
                return Ok(StartStep::Done(StartOutcome::AlreadyRunning));
            }
            if let Some(owner) = index.by_token.get(token) {
                return Err(FleetError::Conflict {
                    token: token.clone(),
                    existing_card: owner.card_id(),
                });
            }
            index.detach(&existing, StopReason::Replaced);
            return Ok(StartStep::WaitFor(existing, true));
        }

        if let Some(owner) = index.by_token.get(token) {
            tracing::warn!(
                token = %token,
                card_id = %card_id,
                existing_card = %owner.card_id(),
                "Token is already in use by another visit card"
            );
            return Err(FleetError::Conflict {
                token: token.clone(),
                existing_card: owner.card_id(),
            });
        }

        if let Some(draining) = index.draining_for(card_id, token) {
            return Ok(StartStep::WaitFor(draining, false));
        }

        Ok(StartStep::Connect)
    }

    /// Stop the worker running `token`, if any, and wait for it to exit.
    pub async fn stop(&self, token: &BotToken) {
        let target = {
            let mut index = self.index.write().await;
            match index.by_token.get(token).cloned() {
                Some(instance) => {
                    index.detach(&instance, StopReason::Requested);
                    Some(instance)
                }
                None => index.draining.iter().find(|i| i.token() == token).cloned(),
            }
        };

        if let Some(instance) = target {
            self.finish_drain(&instance).await;
            tracing::info!(card_id = %instance.card_id(), token = %token, "Stopped bot");
        }
    }

    /// Stop the worker for `card_id`, if any, and wait for it to exit.
    pub async fn stop_by_card(&self, card_id: CardId) {
        let target = {
            let mut index = self.index.write().await;
            match index.by_card.get(&card_id).cloned() {
                Some(instance) => {
                    index.detach(&instance, StopReason::Requested);
                    Some(instance)
                }
                None => index.draining.iter().find(|i| i.card_id() == card_id).cloned(),
            }
        };

        if let Some(instance) = target {
            self.finish_drain(&instance).await;
            tracing::info!(card_id = %card_id, token = %instance.token(), "Stopped bot");
        }
    }

    /// Tokens of all running workers.
    pub async fn running_tokens(&self) -> HashSet<BotToken> {
        self.index.read().await.by_token.keys().cloned().collect()
    }

    /// Number of running workers.
    pub async fn running_count(&self) -> usize {
        self.index.read().await.by_token.len()
    }

    /// Card to token bindings of all running workers.
    pub async fn bindings(&self) -> HashMap<CardId, BotToken> {
        self.index
            .read()
            .await
            .by_card
            .iter()
            .map(|(card, instance)| (*card, instance.token().clone()))
            .collect()
    }

    /// Cancel the root scope and wait for every worker to exit.
    pub async fn shutdown(&self) {
        self.root.cancel();

        let instances: Vec<Arc<BotInstance>> = {
            let mut index = self.index.write().await;
            let mut all: Vec<_> = index.by_card.drain().map(|(_, i)| i).collect();
            index.by_token.clear();
            all.extend(index.draining.drain(..));
            all
        };

        let count = instances.len();
        join_all(instances.iter().map(|i| i.wait_stopped())).await;
        tracing::info!(stopped = count, "Fleet shut down");
    }

    /// Whether [`FleetRegistry::shutdown`] has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.root.is_cancelled()
    }

    async fn finish_drain(&self, instance: &Arc<BotInstance>) {
        instance.wait_stopped().await;
        self.index.write().await.forget_drained(instance);
    }

    #[cfg(test)]
    async fn check_invariants(&self) {
        let index = self.index.read().await;
        assert_eq!(index.by_card.len(), index.by_token.len());
        for (card, instance) in &index.by_card {
            assert_eq!(instance.card_id(), *card);
            let by_token = index
                .by_token
                .get(instance.token())
                .expect("instance missing from token index");
            assert!(Arc::ptr_eq(instance, by_token));
        }
    }
}
