//! Bot worker: one polling task per running bot token.
//!
//! A worker is created in two steps. [`BotInstance::connect`] authenticates
//! the token and clears any webhook, producing a [`PendingBot`] that has no
//! task yet; [`PendingBot::spawn`] starts the poll loop and returns the
//! [`BotInstance`] handle the fleet registry keeps. Splitting the two lets the
//! registry do the network round-trips without holding its lock and only
//! spawn once the slot is known to be free.
//!
//! Stopping is two-phase: [`BotInstance::signal_stop`] cancels the task's
//! token, [`BotInstance::wait_stopped`] resolves once the task has exited.
//! Cancellation is observed between ticks and while an update poll is in
//! flight. A batch that has already arrived is always dispatched in full.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::domain::errors::GatewayError;
use crate::domain::models::{BotIdentity, BotToken, CardId, IncomingMessage, Update};
use crate::domain::ports::{BotGateway, CardStore};
use crate::services::failure_classifier::{FailureClass, FailureClassifier};

/// Reply to `/help`.
pub const HELP_TEXT: &str = "Commands:\n/start - Welcome message\n/help - Show this help message";

/// Reply to any command other than `/start` and `/help`.
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Type /help for available commands.";

/// Reply when the card content cannot be loaded.
pub const PROFILE_ERROR_TEXT: &str = "Sorry, there was an error retrieving company information.";

/// Why a worker was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Explicit stop through the registry.
    Requested,
    /// The card switched to a different token.
    Replaced,
    /// Process-wide shutdown.
    Shutdown,
}

impl StopReason {
    /// Stable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Replaced => "replaced",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Worker timing.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Interval between update polls.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Shared collaborators handed to every worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub gateway: Arc<dyn BotGateway>,
    pub store: Arc<dyn CardStore>,
    pub classifier: Arc<dyn FailureClassifier>,
    pub config: WorkerConfig,
}

/// An authenticated bot that has not started polling yet.
pub struct PendingBot {
    card_id: CardId,
    token: BotToken,
    identity: BotIdentity,
    context: WorkerContext,
}

impl PendingBot {
    /// Card this bot will serve.
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    /// Token the bot authenticated with.
    pub fn token(&self) -> &BotToken {
        &self.token
    }

    /// Identity reported by `getMe`.
    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Start the poll loop under a child of `parent`.
    ///
    /// Cancelling `parent` stops the worker with [`StopReason::Shutdown`].
    pub fn spawn(self, parent: &CancellationToken) -> Arc<BotInstance> {
        let cancel = parent.child_token();
        let stop_reason = Arc::new(OnceLock::new());
        let tracker = TaskTracker::new();
        let instance_id = Uuid::new_v4();

        let worker = BotWorker::new(self.card_id, self.token.clone(), self.context);
        tracker.spawn(worker.run(instance_id, cancel.clone(), stop_reason.clone()));
        tracker.close();

        tracing::info!(
            card_id = %self.card_id,
            token = %self.token,
            bot = %self.identity.username,
            instance_id = %instance_id,
            "Started bot"
        );

        Arc::new(BotInstance {
            id: instance_id,
            card_id: self.card_id,
            token: self.token,
            identity: self.identity,
            cancel,
            stop_reason,
            tracker,
        })
    }
}

/// Handle to a running bot worker.
pub struct BotInstance {
    id: Uuid,
    card_id: CardId,
    token: BotToken,
    identity: BotIdentity,
    cancel: CancellationToken,
    stop_reason: Arc<OnceLock<StopReason>>,
    tracker: TaskTracker,
}

impl BotInstance {
    /// Authenticate `token` and prepare a worker for `card_id`.
    ///
    /// A failure to clear the webhook is logged and otherwise ignored; a
    /// failure to authenticate is returned to the caller.
    pub async fn connect(
        context: WorkerContext,
        card_id: CardId,
        token: BotToken,
    ) -> Result<PendingBot, GatewayError> {
        let identity = context.gateway.authenticate(&token).await?;

        match context.gateway.clear_webhook(&token).await {
            Ok(()) => tracing::debug!(card_id = %card_id, "Cleared webhook"),
            Err(e) => tracing::warn!(
                card_id = %card_id,
                error = %e,
                "Could not clear webhook, polling anyway"
            ),
        }

        tracing::info!(
            card_id = %card_id,
            bot = %identity.username,
            "Authorized bot"
        );

        Ok(PendingBot {
            card_id,
            token,
            identity,
            context,
        })
    }

    /// Unique id of this worker instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Card this worker serves.
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    /// Token this worker polls with.
    pub fn token(&self) -> &BotToken {
        &self.token
    }

    /// Identity reported by `getMe` at connect time.
    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Ask the worker to exit. An in-flight poll is abandoned; a batch being
    /// dispatched finishes first.
    ///
    /// The first reason recorded wins.
    pub fn signal_stop(&self, reason: StopReason) {
        let _ = self.stop_reason.set(reason);
        self.cancel.cancel();
    }

    /// Wait until the worker task has fully exited.
    pub async fn wait_stopped(&self) {
        self.tracker.wait().await;
    }

    /// Signal and wait.
    pub async fn stop(&self, reason: StopReason) {
        self.signal_stop(reason);
        self.wait_stopped().await;
    }

    /// Whether a stop has been signalled, directly or through the parent scope.
    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the worker task has exited.
    pub fn is_finished(&self) -> bool {
        self.tracker.is_closed() && self.tracker.is_empty()
    }

    /// Reason the worker was stopped, if it was.
    pub fn stop_reason(&self) -> Option<StopReason> {
        resolve_reason(&self.cancel, &self.stop_reason)
    }
}

impl std::fmt::Debug for BotInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotInstance")
            .field("id", &self.id)
            .field("card_id", &self.card_id)
            .field("token", &self.token)
            .field("bot", &self.identity.username)
            .finish_non_exhaustive()
    }
}

fn resolve_reason(cancel: &CancellationToken, cell: &OnceLock<StopReason>) -> Option<StopReason> {
    match cell.get() {
        Some(reason) => Some(*reason),
        // Cancelled without a recorded reason means the parent scope went away.
        None if cancel.is_cancelled() => Some(StopReason::Shutdown),
        None => None,
    }
}

/// The poll-and-dispatch loop for one token.
struct BotWorker {
    card_id: CardId,
    token: BotToken,
    context: WorkerContext,
    /// Highest update id seen so far.
    cursor: i64,
}

impl BotWorker {
    fn new(card_id: CardId, token: BotToken, context: WorkerContext) -> Self {
        Self {
            card_id,
            token,
            context,
            cursor: 0,
        }
    }

    async fn run(
        mut self,
        instance_id: Uuid,
        cancel: CancellationToken,
        stop_reason: Arc<OnceLock<StopReason>>,
    ) {
        let mut ticker = tokio::time::interval(self.context.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    if self.poll_once(&cancel).await.is_none() {
                        break;
                    }
                }
            }
        }

        let reason = resolve_reason(&cancel, &stop_reason).unwrap_or(StopReason::Shutdown);
        tracing::info!(
            card_id = %self.card_id,
            token = %self.token,
            instance_id = %instance_id,
            reason = reason.as_str(),
            last_update_id = self.cursor,
            "Bot worker exited"
        );
    }

    /// Poll once and dispatch the batch. Returns the number of updates
    /// handled, or `None` if `cancel` fired while the poll was in flight.
    async fn poll_once(&mut self, cancel: &CancellationToken) -> Option<usize> {
        let offset = self.cursor + 1;
        let polled = tokio::select! {
            biased;

            () = cancel.cancelled() => return None,

            polled = self.context.gateway.poll_updates(&self.token, offset) => polled,
        };

        let updates = match polled {
            Ok(updates) => updates,
            Err(e) => {
                self.log_poll_failure(&e);
                return Some(0);
            }
        };

        for update in &updates {
            self.dispatch(update).await;
            if update.update_id > self.cursor {
                self.cursor = update.update_id;
            }
        }

        Some(updates.len())
    }

    fn log_poll_failure(&self, error: &GatewayError) {
        // Validity decisions belong to the reconciler; the worker keeps polling.
        match self.context.classifier.classify(&error.to_string()) {
            FailureClass::Transient => tracing::warn!(
                card_id = %self.card_id,
                error = %error,
                "Network error getting updates"
            ),
            FailureClass::Permanent => tracing::error!(
                card_id = %self.card_id,
                error = %error,
                "Error getting updates"
            ),
        }
    }

    async fn dispatch(&self, update: &Update) {
        let Some(message) = &update.message else {
            return;
        };

        match message.command() {
            Some(command) => self.handle_command(message, command).await,
            None => self.send_welcome(message.chat_id).await,
        }
    }

    async fn handle_command(&self, message: &IncomingMessage, command: &str) {
        tracing::debug!(card_id = %self.card_id, command, "Handling command");
        match command {
            "start" => self.send_welcome(message.chat_id).await,
            "help" => self.send_text(message.chat_id, HELP_TEXT).await,
            _ => self.send_text(message.chat_id, UNKNOWN_COMMAND_TEXT).await,
        }
    }

    async fn send_welcome(&self, chat_id: i64) {
        let profile = match self.context.store.get_profile(self.card_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(card_id = %self.card_id, "Visit card not found for welcome message");
                self.send_text(chat_id, PROFILE_ERROR_TEXT).await;
                return;
            }
            Err(e) => {
                tracing::error!(card_id = %self.card_id, error = %e, "Error loading visit card");
                self.send_text(chat_id, PROFILE_ERROR_TEXT).await;
                return;
            }
        };

        match self.context.store.increment_bot_views(self.card_id).await {
            Ok(count) => tracing::debug!(card_id = %self.card_id, bot_view_count = count, "Incremented bot view count"),
            Err(e) => tracing::warn!(card_id = %self.card_id, error = %e, "Failed to increment bot view count"),
        }

        let text = profile.welcome_text();
        let result = match profile.logo() {
            Some(logo) => {
                self.context
                    .gateway
                    .send_photo(&self.token, chat_id, logo, &text)
                    .await
            }
            None => self.context.gateway.send_text(&self.token, chat_id, &text).await,
        };

        if let Err(e) = result {
            tracing::warn!(card_id = %self.card_id, chat_id, error = %e, "Failed to send welcome message");
        }
    }

    async fn send_text(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.context.gateway.send_text(&self.token, chat_id, text).await {
            tracing::warn!(card_id = %self.card_id, chat_id, error = %e, "Failed to send message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainResult;
    use crate::domain::models::{BotBinding, CardProfile};
    use crate::services::failure_classifier::PatternClassifier;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Text(i64, String),
        Photo(i64, String, String),
    }

    #[derive(Default)]
    struct ScriptedGateway {
        polls: StdMutex<VecDeque<Result<Vec<Update>, GatewayError>>>,
        offsets: StdMutex<Vec<i64>>,
        sent: StdMutex<Vec<Sent>>,
        reject_auth: bool,
        fail_webhook: bool,
        poll_delay: Duration,
    }

    impl ScriptedGateway {
        fn push_poll(&self, result: Result<Vec<Update>, GatewayError>) {
            self.polls.lock().unwrap().push_back(result);
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn offsets(&self) -> Vec<i64> {
            self.offsets.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BotGateway for ScriptedGateway {
        async fn authenticate(&self, _token: &BotToken) -> Result<BotIdentity, GatewayError> {
            if self.reject_auth {
                return Err(GatewayError::api(Some(401), "Unauthorized"));
            }
            Ok(BotIdentity {
                id: 1,
                username: "acme_bot".to_string(),
            })
        }

        async fn clear_webhook(&self, _token: &BotToken) -> Result<(), GatewayError> {
            if self.fail_webhook {
                return Err(GatewayError::Transport("connection reset".to_string()));
            }
            Ok(())
        }

        async fn poll_updates(&self, _token: &BotToken, offset: i64) -> Result<Vec<Update>, GatewayError> {
            self.offsets.lock().unwrap().push(offset);
            if !self.poll_delay.is_zero() {
                tokio::time::sleep(self.poll_delay).await;
            }
            self.polls.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn send_text(&self, _token: &BotToken, chat_id: i64, text: &str) -> Result<(), GatewayError> {
            self.sent.lock().unwrap().push(Sent::Text(chat_id, text.to_string()));
            Ok(())
        }

        async fn send_photo(&self, _token: &BotToken, chat_id: i64, photo_url: &str, caption: &str) -> Result<(), GatewayError> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Photo(chat_id, photo_url.to_string(), caption.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct ProfileStore {
        profiles: HashMap<CardId, CardProfile>,
        views: StdMutex<HashMap<CardId, u64>>,
    }

    impl ProfileStore {
        fn with_profile(profile: CardProfile) -> Self {
            let mut profiles = HashMap::new();
            profiles.insert(profile.card_id, profile);
            Self {
                profiles,
                views: StdMutex::new(HashMap::new()),
            }
        }

        fn views(&self, card_id: CardId) -> u64 {
            self.views.lock().unwrap().get(&card_id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl CardStore for ProfileStore {
        async fn list_active(&self) -> DomainResult<Vec<BotBinding>> {
            Ok(Vec::new())
        }

        async fn set_token_validity(&self, _card_id: CardId, _valid: bool, _message: &str) -> DomainResult<()> {
            Ok(())
        }

        async fn increment_bot_views(&self, card_id: CardId) -> DomainResult<u64> {
            let mut views = self.views.lock().unwrap();
            let count = views.entry(card_id).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        async fn get_profile(&self, card_id: CardId) -> DomainResult<Option<CardProfile>> {
            Ok(self.profiles.get(&card_id).cloned())
        }
    }

    fn profile(logo: Option<&str>) -> CardProfile {
        CardProfile {
            card_id: CardId(1),
            title: "Acme".to_string(),
            description: "Rockets and anvils".to_string(),
            logo_url: logo.map(str::to_string),
        }
    }

    fn context(gateway: Arc<ScriptedGateway>, store: Arc<ProfileStore>) -> WorkerContext {
        WorkerContext {
            gateway,
            store,
            classifier: Arc::new(PatternClassifier::default()),
            config: WorkerConfig {
                poll_interval: Duration::from_millis(10),
            },
        }
    }

    fn worker(gateway: &Arc<ScriptedGateway>, store: &Arc<ProfileStore>) -> BotWorker {
        BotWorker::new(CardId(1), BotToken::new("T1"), context(gateway.clone(), store.clone()))
    }

    #[tokio::test]
    async fn test_plain_message_sends_text_welcome_and_counts_view() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::with_profile(profile(None)));
        gateway.push_poll(Ok(vec![Update::message(5, 42, "hi")]));

        let mut worker = worker(&gateway, &store);
        assert_eq!(worker.poll_once(&CancellationToken::new()).await, Some(1));

        assert_eq!(gateway.sent(), vec![Sent::Text(42, "Acme\n\nRockets and anvils".to_string())]);
        assert_eq!(store.views(CardId(1)), 1);
        assert_eq!(worker.cursor, 5);
    }

    #[tokio::test]
    async fn test_start_command_sends_photo_when_logo_is_set() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::with_profile(profile(Some("https://cdn.example.com/logo.png"))));
        gateway.push_poll(Ok(vec![Update::message(1, 7, "/start")]));

        let live = CancellationToken::new();
        let mut worker = worker(&gateway, &store);
        worker.poll_once(&live).await;

        assert_eq!(
            gateway.sent(),
            vec![Sent::Photo(
                7,
                "https://cdn.example.com/logo.png".to_string(),
                "Acme\n\nRockets and anvils".to_string()
            )]
        );
        assert_eq!(store.views(CardId(1)), 1);
    }

    #[tokio::test]
    async fn test_help_and_unknown_commands() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::with_profile(profile(None)));
        gateway.push_poll(Ok(vec![
            Update::message(3, 9, "/help"),
            Update::message(4, 9, "/pricing"),
        ]));

        let live = CancellationToken::new();
        let mut worker = worker(&gateway, &store);
        worker.poll_once(&live).await;

        assert_eq!(
            gateway.sent(),
            vec![
                Sent::Text(9, HELP_TEXT.to_string()),
                Sent::Text(9, UNKNOWN_COMMAND_TEXT.to_string()),
            ]
        );
        assert_eq!(store.views(CardId(1)), 0);
    }

    #[tokio::test]
    async fn test_missing_profile_replies_with_error_and_does_not_count() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::default());
        gateway.push_poll(Ok(vec![Update::message(1, 3, "hello")]));

        let live = CancellationToken::new();
        let mut worker = worker(&gateway, &store);
        worker.poll_once(&live).await;

        assert_eq!(gateway.sent(), vec![Sent::Text(3, PROFILE_ERROR_TEXT.to_string())]);
        assert_eq!(store.views(CardId(1)), 0);
    }

    #[tokio::test]
    async fn test_cursor_advances_to_max_update_id_including_non_messages() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::with_profile(profile(None)));
        gateway.push_poll(Ok(vec![
            Update::message(10, 1, "a"),
            Update { update_id: 12, message: None },
            Update::message(11, 1, "b"),
        ]));

        let live = CancellationToken::new();
        let mut worker = worker(&gateway, &store);
        worker.poll_once(&live).await;
        worker.poll_once(&live).await;

        assert_eq!(worker.cursor, 12);
        assert_eq!(gateway.offsets(), vec![1, 13]);
    }

    #[tokio::test]
    async fn test_transient_poll_errors_keep_cursor() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::with_profile(profile(None)));
        gateway.push_poll(Ok(vec![Update::message(4, 1, "a")]));
        for _ in 0..3 {
            gateway.push_poll(Err(GatewayError::Transport("connection refused".to_string())));
        }

        let live = CancellationToken::new();
        let mut worker = worker(&gateway, &store);
        for _ in 0..4 {
            worker.poll_once(&live).await;
        }

        assert_eq!(worker.cursor, 4);
        assert_eq!(gateway.offsets(), vec![1, 5, 5, 5]);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_token() {
        let gateway = Arc::new(ScriptedGateway {
            reject_auth: true,
            ..Default::default()
        });
        let store = Arc::new(ProfileStore::default());

        let result = BotInstance::connect(context(gateway, store), CardId(1), BotToken::new("bad")).await;
        assert!(matches!(result, Err(GatewayError::Api { code: Some(401), .. })));
    }

    #[tokio::test]
    async fn test_connect_tolerates_webhook_failure() {
        let gateway = Arc::new(ScriptedGateway {
            fail_webhook: true,
            ..Default::default()
        });
        let store = Arc::new(ProfileStore::default());

        let pending = BotInstance::connect(context(gateway, store), CardId(2), BotToken::new("T2"))
            .await
            .expect("webhook failure should not block startup");
        assert_eq!(pending.card_id(), CardId(2));
        assert_eq!(pending.identity().username, "acme_bot");
    }

    #[tokio::test]
    async fn test_stop_waits_for_worker_exit() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::with_profile(profile(None)));
        let root = CancellationToken::new();

        let pending = BotInstance::connect(context(gateway, store), CardId(1), BotToken::new("T1"))
            .await
            .unwrap();
        let instance = pending.spawn(&root);
        assert!(!instance.is_finished());
        assert_eq!(instance.stop_reason(), None);

        instance.stop(StopReason::Requested).await;

        assert!(instance.is_finished());
        assert_eq!(instance.stop_reason(), Some(StopReason::Requested));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_abandons_in_flight_poll() {
        let gateway = Arc::new(ScriptedGateway {
            poll_delay: Duration::from_secs(30),
            ..Default::default()
        });
        let store = Arc::new(ProfileStore::default());
        let mut ctx = context(gateway.clone(), store);
        ctx.config.poll_interval = Duration::from_secs(1);

        let instance = BotInstance::connect(ctx, CardId(1), BotToken::new("T1"))
            .await
            .unwrap()
            .spawn(&CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(gateway.offsets(), vec![1], "first poll should be in flight");

        let begun = tokio::time::Instant::now();
        instance.stop(StopReason::Requested).await;

        assert!(begun.elapsed() < Duration::from_secs(1), "stop waited {:?}", begun.elapsed());
        assert!(instance.is_finished());
        assert_eq!(instance.stop_reason(), Some(StopReason::Requested));
    }

    #[tokio::test]
    async fn test_cancelled_poll_leaves_cursor_alone() {
        let gateway = Arc::new(ScriptedGateway {
            poll_delay: Duration::from_secs(30),
            ..Default::default()
        });
        let store = Arc::new(ProfileStore::with_profile(profile(None)));
        gateway.push_poll(Ok(vec![Update::message(8, 1, "hi")]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut worker = worker(&gateway, &store);
        assert_eq!(worker.poll_once(&cancel).await, None);

        assert_eq!(worker.cursor, 0);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_root_cancellation_stops_worker_as_shutdown() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::default());
        let root = CancellationToken::new();

        let instance = BotInstance::connect(context(gateway, store), CardId(1), BotToken::new("T1"))
            .await
            .unwrap()
            .spawn(&root);

        root.cancel();
        instance.wait_stopped().await;

        assert_eq!(instance.stop_reason(), Some(StopReason::Shutdown));
    }

    #[tokio::test]
    async fn test_first_stop_reason_wins() {
        let gateway = Arc::new(ScriptedGateway::default());
        let store = Arc::new(ProfileStore::default());
        let root = CancellationToken::new();

        let instance = BotInstance::connect(context(gateway, store), CardId(1), BotToken::new("T1"))
            .await
            .unwrap()
            .spawn(&root);

        instance.signal_stop(StopReason::Replaced);
        instance.stop(StopReason::Requested).await;

        assert_eq!(instance.stop_reason(), Some(StopReason::Replaced));
    }
}
