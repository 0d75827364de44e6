pub mod backend;
pub mod errors;
pub mod models;
pub mod services;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, Utc};

use backend::subscription::Subscription;
use backend::traits::{AuthProvider, AuthUser, TradeStore};
use errors::CoreError;
use models::analytics::{MonthlyProgress, OutcomeDistribution, PerformanceSummary};
use models::settings::UserSettings;
use models::trade::{Outcome, Trade, TradeDraft};
use services::journal_service::JournalService;
use services::metrics_service::MetricsService;

/// Answer from the human confirmation boundary in front of
/// destructive actions. Declining is a no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Main entry point for the trade-journal core library.
///
/// Holds the injected backend collaborators and opens authenticated
/// sessions. Both collaborators are trait objects, so the core runs
/// unchanged against the hosted backend or the in-memory fake.
#[must_use]
pub struct TradeJournal {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn TradeStore>,
}

impl TradeJournal {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn TradeStore>) -> Self {
        Self { auth, store }
    }

    /// Sign in and open a live session for the user.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<JournalSession, CoreError> {
        let user = self.auth.sign_in(email, password).await?;
        Ok(self.open_session(user).await)
    }

    /// Create an account and open a live session for it.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<JournalSession, CoreError> {
        let user = self.auth.sign_up(email, password).await?;
        Ok(self.open_session(user).await)
    }

    /// Acquire both store subscriptions for the user and build the
    /// session around them.
    ///
    /// A failed subscription is logged and replaced with an empty feed:
    /// the session starts from an empty/default snapshot instead of
    /// failing, per the error-handling contract.
    async fn open_session(&self, user: AuthUser) -> JournalSession {
        let trade_feed = match self.store.subscribe_trades(&user.uid).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = %e, "trade subscription failed; starting empty");
                Subscription::empty()
            }
        };
        let settings_feed = match self.store.subscribe_settings(&user.uid).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = %e, "settings subscription failed; using defaults");
                Subscription::empty()
            }
        };

        let mut session = JournalSession {
            user,
            auth: Arc::clone(&self.auth),
            store: Arc::clone(&self.store),
            trades: Vec::new(),
            settings: UserSettings::default(),
            trade_feed,
            settings_feed,
            metrics: MetricsService::new(),
            journal: JournalService::new(),
        };
        // Both stores deliver the current state as the first snapshot.
        session.poll_updates();
        session
    }
}

impl std::fmt::Debug for TradeJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeJournal")
            .field("auth", &self.auth.name())
            .field("store", &self.store.name())
            .finish()
    }
}

/// An authenticated session: the user's live trade snapshot, their
/// settings, and every derived analytics view over them.
///
/// The session subscribes to the store once at construction and releases
/// both subscriptions on sign-out or drop. Incoming snapshots are full
/// replacements applied in delivery order; the session never mutates the
/// snapshot locally, so a failed write leaves the last confirmed state
/// intact.
#[must_use]
pub struct JournalSession {
    user: AuthUser,
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn TradeStore>,

    trades: Vec<Trade>,
    settings: UserSettings,
    trade_feed: Subscription<Vec<Trade>>,
    settings_feed: Subscription<UserSettings>,

    metrics: MetricsService,
    journal: JournalService,
}

impl JournalSession {
    // ── Snapshot intake ─────────────────────────────────────────────

    /// Drain every pending snapshot and apply them in delivery order.
    /// Returns the number of snapshots applied. Two snapshots arriving
    /// out of order are applied as delivered — last write by arrival
    /// wins, an accepted limitation of the replacement model.
    pub fn poll_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Some(snapshot) = self.trade_feed.try_next() {
            self.trades = snapshot;
            applied += 1;
        }
        while let Some(snapshot) = self.settings_feed.try_next() {
            self.settings = snapshot;
            applied += 1;
        }
        applied
    }

    /// Wait for the next trade snapshot and apply it (along with any
    /// settings snapshots queued behind it).
    pub async fn next_update(&mut self) -> bool {
        match self.trade_feed.next().await {
            Some(snapshot) => {
                self.trades = snapshot;
                self.poll_updates();
                true
            }
            None => false,
        }
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Validate a trade-entry draft and persist it.
    ///
    /// Validation failures never reach the store. On success the
    /// store-assigned id is returned; the local snapshot is not touched
    /// until the store's next snapshot confirms the write.
    pub async fn submit_trade(&mut self, draft: &TradeDraft) -> Result<String, CoreError> {
        let new_trade = draft.validate()?;
        self.store.create_trade(&self.user.uid, new_trade).await
    }

    /// Delete a trade after the interactive confirmation.
    ///
    /// Declining performs no action and is not an error. A store
    /// failure (e.g. unknown id) is reported and leaves the in-memory
    /// trade list unchanged.
    pub async fn delete_trade(
        &mut self,
        trade_id: &str,
        confirmation: Confirmation,
    ) -> Result<bool, CoreError> {
        if confirmation == Confirmation::Declined {
            return Ok(false);
        }
        self.store.delete_trade(&self.user.uid, trade_id).await?;
        Ok(true)
    }

    /// Validate and save the settings document, overwriting it
    /// wholesale. The local copy updates when the snapshot arrives.
    pub async fn save_settings(&mut self, settings: &UserSettings) -> Result<(), CoreError> {
        settings.validate()?;
        self.store.save_settings(&self.user.uid, settings).await
    }

    /// End the session: release both subscriptions, then sign out of
    /// the identity provider.
    pub async fn sign_out(self) -> Result<(), CoreError> {
        let JournalSession {
            user,
            auth,
            trade_feed,
            settings_feed,
            ..
        } = self;
        trade_feed.unsubscribe();
        settings_feed.unsubscribe();
        auth.sign_out(&user).await
    }

    // ── State accessors ─────────────────────────────────────────────

    #[must_use]
    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    /// The current trade snapshot, in store delivery order.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    #[must_use]
    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    /// Trades ordered newest first for the journal table.
    #[must_use]
    pub fn recent_trades(&self) -> Vec<&Trade> {
        self.journal.recent_first(&self.trades)
    }

    #[must_use]
    pub fn find_trade(&self, trade_id: &str) -> Option<&Trade> {
        self.journal.find(&self.trades, trade_id)
    }

    /// Case-insensitive search across asset and note.
    #[must_use]
    pub fn search_trades(&self, query: &str) -> Vec<&Trade> {
        self.journal.search(&self.trades, query)
    }

    #[must_use]
    pub fn trades_with_outcome(&self, outcome: Outcome) -> Vec<&Trade> {
        self.journal.with_outcome(&self.trades, outcome)
    }

    // ── Derived analytics ───────────────────────────────────────────

    #[must_use]
    pub fn net_profit(&self) -> f64 {
        self.metrics.net_profit(&self.trades)
    }

    #[must_use]
    pub fn win_rate(&self) -> f64 {
        self.metrics.win_rate(&self.trades)
    }

    #[must_use]
    pub fn profit_factor(&self) -> f64 {
        self.metrics.profit_factor(&self.trades)
    }

    /// Cumulative balance curve for the growth chart (leading 0).
    #[must_use]
    pub fn balance_curve(&self) -> Vec<f64> {
        self.metrics.balance_curve(&self.trades)
    }

    /// Per-day signed P/L for the calendar heatmap.
    #[must_use]
    pub fn daily_pnl(&self, year: i32, month: u32) -> BTreeMap<u32, f64> {
        self.metrics.daily_pnl(&self.trades, year, month)
    }

    /// Net P/L for a calendar month (calendar header total).
    #[must_use]
    pub fn monthly_pnl(&self, year: i32, month: u32) -> f64 {
        self.metrics.monthly_pnl(&self.trades, year, month)
    }

    #[must_use]
    pub fn outcome_distribution(&self) -> OutcomeDistribution {
        self.metrics.outcome_distribution(&self.trades)
    }

    #[must_use]
    pub fn performance_summary(&self) -> PerformanceSummary {
        self.metrics.performance_summary(&self.trades)
    }

    /// Progress toward the configured target for the given month.
    #[must_use]
    pub fn monthly_progress(&self, year: i32, month: u32) -> MonthlyProgress {
        self.metrics
            .monthly_progress(&self.trades, year, month, self.settings.monthly_target)
    }

    /// Progress for the current calendar month (dashboard bar).
    #[must_use]
    pub fn current_monthly_progress(&self) -> MonthlyProgress {
        let today = Utc::now().date_naive();
        self.monthly_progress(today.year(), today.month())
    }
}

impl std::fmt::Debug for JournalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalSession")
            .field("user", &self.user.email)
            .field("trades", &self.trades.len())
            .field("settings", &self.settings)
            .finish()
    }
}
