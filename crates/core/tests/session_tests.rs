// ═══════════════════════════════════════════════════════════════════
// Session & Backend Integration — TradeJournal facade over the
// in-memory backend: auth, live snapshots, writes, teardown.
// ═══════════════════════════════════════════════════════════════════

use std::sync::Arc;

use async_trait::async_trait;

use trade_journal_core::backend::memory::MemoryBackend;
use trade_journal_core::backend::subscription::Subscription;
use trade_journal_core::backend::traits::{AuthProvider, TradeStore};
use trade_journal_core::errors::CoreError;
use trade_journal_core::models::settings::UserSettings;
use trade_journal_core::models::trade::{NewTrade, Trade, TradeDraft};
use trade_journal_core::{Confirmation, TradeJournal};

fn journal() -> (MemoryBackend, TradeJournal) {
    let backend = MemoryBackend::new();
    let journal = TradeJournal::new(Arc::new(backend.clone()), Arc::new(backend.clone()));
    (backend, journal)
}

fn valid_draft(asset: &str, outcome: &str, amount: &str) -> TradeDraft {
    TradeDraft {
        asset: asset.to_string(),
        setup: "Breakout".to_string(),
        side: "Long".to_string(),
        outcome: outcome.to_string(),
        mood: "Calm".to_string(),
        amount: amount.to_string(),
        risk_reward: "1.5".to_string(),
        note: String::new(),
        setup_confirmed: true,
        risk_confirmed: true,
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Authentication
// ═══════════════════════════════════════════════════════════════════

mod auth {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let (_backend, journal) = journal();
        let session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        let uid = session.user().uid.clone();
        session.sign_out().await.unwrap();

        let session = journal.sign_in("trader@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user().uid, uid);
        assert_eq!(session.user().email, "trader@example.com");
    }

    #[tokio::test]
    async fn wrong_password_surfaces_provider_message_verbatim() {
        let (_backend, journal) = journal();
        journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        let err = journal.sign_in("trader@example.com", "wrong").await.unwrap_err();
        match err {
            CoreError::Auth(msg) => assert_eq!(msg, "INVALID_LOGIN_CREDENTIALS"),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let (_backend, journal) = journal();
        journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        let err = journal.sign_up("trader@example.com", "other-pass").await.unwrap_err();
        assert!(matches!(err, CoreError::Auth(msg) if msg == "EMAIL_EXISTS"));
    }

    #[tokio::test]
    async fn fresh_session_starts_with_empty_snapshot_and_default_settings() {
        let (_backend, journal) = journal();
        let session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        assert!(session.trades().is_empty());
        assert_eq!(session.settings(), &UserSettings::default());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Trade writes & snapshot delivery
// ═══════════════════════════════════════════════════════════════════

mod trades {
    use super::*;

    #[tokio::test]
    async fn submitted_trade_arrives_via_snapshot_not_optimistically() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        let id = session
            .submit_trade(&valid_draft("xauusd", "Profit", "100"))
            .await
            .unwrap();

        // The write is confirmed only by the next snapshot.
        assert!(session.trades().is_empty());
        assert!(session.poll_updates() > 0);

        assert_eq!(session.trades().len(), 1);
        let trade = session.find_trade(&id).unwrap();
        assert_eq!(trade.asset, "XAUUSD");
        assert_eq!(trade.amount, 100.0);
        assert!(trade.created_at.is_some());
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_the_store() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        let mut draft = valid_draft("xauusd", "Profit", "100");
        draft.risk_confirmed = false;
        let err = session.submit_trade(&draft).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "risk_confirmed", .. }));

        // No write happened, so no snapshot follows.
        assert_eq!(session.poll_updates(), 0);
        assert!(session.trades().is_empty());
    }

    #[tokio::test]
    async fn snapshots_apply_in_arrival_order() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        session.submit_trade(&valid_draft("eurusd", "Profit", "30")).await.unwrap();
        session.submit_trade(&valid_draft("btcusd", "Loss", "10")).await.unwrap();

        // Two full-replacement snapshots queued; the later one wins.
        assert_eq!(session.poll_updates(), 2);
        assert_eq!(session.trades().len(), 2);
        assert_eq!(session.net_profit(), 20.0);
    }

    #[tokio::test]
    async fn next_update_awaits_the_trade_snapshot_and_drains_behind_it() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        session
            .save_settings(&UserSettings {
                currency: "EUR".to_string(),
                monthly_target: 500.0,
            })
            .await
            .unwrap();
        session.submit_trade(&valid_draft("xauusd", "Profit", "100")).await.unwrap();

        // Applies the awaited trade snapshot plus the settings snapshot
        // queued behind it, leaving nothing pending.
        assert!(session.next_update().await);
        assert_eq!(session.trades().len(), 1);
        assert_eq!(session.settings().currency, "EUR");
        assert_eq!(session.poll_updates(), 0);
    }

    #[tokio::test]
    async fn deleting_with_confirmation_removes_the_trade() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        let id = session.submit_trade(&valid_draft("xauusd", "Profit", "100")).await.unwrap();
        session.poll_updates();

        let deleted = session.delete_trade(&id, Confirmation::Confirmed).await.unwrap();
        assert!(deleted);
        session.poll_updates();
        assert!(session.trades().is_empty());
    }

    #[tokio::test]
    async fn declining_the_confirmation_is_a_silent_no_op() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        let id = session.submit_trade(&valid_draft("xauusd", "Profit", "100")).await.unwrap();
        session.poll_updates();

        let deleted = session.delete_trade(&id, Confirmation::Declined).await.unwrap();
        assert!(!deleted);
        assert_eq!(session.poll_updates(), 0);
        assert_eq!(session.trades().len(), 1);
    }

    // Deleting an unknown id errors and leaves the local list
    // untouched.
    #[tokio::test]
    async fn deleting_unknown_id_errors_and_preserves_state() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        session.submit_trade(&valid_draft("xauusd", "Profit", "100")).await.unwrap();
        session.poll_updates();

        let err = session
            .delete_trade("no-such-trade", Confirmation::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TradeNotFound(id) if id == "no-such-trade"));
        assert_eq!(session.poll_updates(), 0);
        assert_eq!(session.trades().len(), 1);
        assert_eq!(session.net_profit(), 100.0);
    }

    #[tokio::test]
    async fn pending_server_timestamp_counts_in_totals_but_not_calendar() {
        let (backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        backend.hold_timestamps(true);
        session.submit_trade(&valid_draft("xauusd", "Profit", "55")).await.unwrap();
        session.poll_updates();

        assert_eq!(session.net_profit(), 55.0);
        assert_eq!(session.win_rate(), 100.0);
        for month in 1..=12 {
            assert!(session.daily_pnl(2025, month).is_empty());
        }

        // Once the server timestamp resolves, the trade lands on the
        // calendar via a fresh snapshot.
        backend.resolve_timestamps();
        session.poll_updates();
        let trade = &session.trades()[0];
        assert!(trade.created_at.is_some());
        assert_eq!(session.net_profit(), 55.0);
    }

    #[tokio::test]
    async fn recent_trades_orders_newest_first() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        session.submit_trade(&valid_draft("eurusd", "Profit", "30")).await.unwrap();
        session.submit_trade(&valid_draft("btcusd", "Loss", "10")).await.unwrap();
        session.poll_updates();

        let recent: Vec<&Trade> = session.recent_trades();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].asset, "BTCUSD");
        assert_eq!(recent[1].asset, "EURUSD");
    }

    #[tokio::test]
    async fn search_matches_asset_and_note() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        let mut draft = valid_draft("xauusd", "Profit", "100");
        draft.note = "EMA 200 confluence".to_string();
        session.submit_trade(&draft).await.unwrap();
        session.submit_trade(&valid_draft("eurusd", "Loss", "20")).await.unwrap();
        session.poll_updates();

        assert_eq!(session.search_trades("xau").len(), 1);
        assert_eq!(session.search_trades("ema 200").len(), 1);
        assert_eq!(session.search_trades("usd").len(), 2);
        assert!(session.search_trades("gbpjpy").is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[tokio::test]
    async fn saved_settings_arrive_via_snapshot() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        let new_settings = UserSettings {
            currency: "EUR".to_string(),
            monthly_target: 1000.0,
        };
        session.save_settings(&new_settings).await.unwrap();

        // No optimistic mutation: defaults until the snapshot lands.
        assert_eq!(session.settings(), &UserSettings::default());
        session.poll_updates();
        assert_eq!(session.settings(), &new_settings);
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_before_the_store() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        let bad = UserSettings {
            currency: "EURO".to_string(),
            monthly_target: 100.0,
        };
        let err = session.save_settings(&bad).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "currency", .. }));
        assert_eq!(session.poll_updates(), 0);
    }

    #[tokio::test]
    async fn monthly_progress_tracks_target_from_settings() {
        let (_backend, journal) = journal();
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();

        session
            .save_settings(&UserSettings {
                currency: "USD".to_string(),
                monthly_target: 1000.0,
            })
            .await
            .unwrap();
        session.poll_updates();

        // Empty journal: 0 realized, 0% progress.
        let progress = session.current_monthly_progress();
        assert_eq!(progress.realized, 0.0);
        assert_eq!(progress.progress_pct, 0.0);
        assert_eq!(progress.target, 1000.0);

        session.submit_trade(&valid_draft("xauusd", "Profit", "250")).await.unwrap();
        session.poll_updates();
        let progress = session.current_monthly_progress();
        assert_eq!(progress.realized, 250.0);
        assert_eq!(progress.progress_pct, 25.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Subscription lifecycle & degraded store
// ═══════════════════════════════════════════════════════════════════

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn sign_out_releases_both_subscriptions() {
        let (backend, journal) = journal();
        let session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        assert_eq!(backend.trade_subscriber_count(), 1);
        assert_eq!(backend.settings_subscriber_count(), 1);

        session.sign_out().await.unwrap();
        assert_eq!(backend.trade_subscriber_count(), 0);
        assert_eq!(backend.settings_subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropping_the_session_also_releases_subscriptions() {
        let (backend, journal) = journal();
        let session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        assert_eq!(backend.trade_subscriber_count(), 1);

        drop(session);
        assert_eq!(backend.trade_subscriber_count(), 0);
        assert_eq!(backend.settings_subscriber_count(), 0);
    }

    /// A store whose every operation fails (degraded backend).
    struct FailingStore;

    #[async_trait]
    impl TradeStore for FailingStore {
        fn name(&self) -> &str {
            "FailingStore"
        }

        async fn subscribe_trades(&self, _uid: &str) -> Result<Subscription<Vec<Trade>>, CoreError> {
            Err(CoreError::Store("backend offline".to_string()))
        }

        async fn subscribe_settings(&self, _uid: &str) -> Result<Subscription<UserSettings>, CoreError> {
            Err(CoreError::Store("backend offline".to_string()))
        }

        async fn create_trade(&self, _uid: &str, _trade: NewTrade) -> Result<String, CoreError> {
            Err(CoreError::Store("backend offline".to_string()))
        }

        async fn delete_trade(&self, _uid: &str, _trade_id: &str) -> Result<(), CoreError> {
            Err(CoreError::Store("backend offline".to_string()))
        }

        async fn save_settings(&self, _uid: &str, _settings: &UserSettings) -> Result<(), CoreError> {
            Err(CoreError::Store("backend offline".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_subscriptions_fall_back_to_empty_state() {
        let auth = MemoryBackend::new();
        let journal = TradeJournal::new(Arc::new(auth), Arc::new(FailingStore));

        // Sign-up succeeds; the session opens degraded instead of failing.
        let mut session = journal.sign_up("trader@example.com", "hunter22").await.unwrap();
        assert!(session.trades().is_empty());
        assert_eq!(session.settings(), &UserSettings::default());
        assert_eq!(session.net_profit(), 0.0);

        // Writes surface the store error and leave local state intact.
        let err = session
            .submit_trade(&valid_draft("xauusd", "Profit", "100"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
        assert!(session.trades().is_empty());
    }
}
