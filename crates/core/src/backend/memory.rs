use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::settings::UserSettings;
use crate::models::trade::{NewTrade, Trade};

use super::subscription::{feed_channel, Subscription, SubscriptionGuard};
use super::traits::{AuthProvider, AuthUser, TradeStore};

/// In-memory implementation of both backend collaborators.
///
/// Used for tests and offline operation: same contract as the hosted
/// backend — full-snapshot subscriptions, store-assigned ids and
/// timestamps — with everything held in a single mutex-guarded map.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct UserData {
    trades: Vec<Trade>,
    settings: Option<UserSettings>,
}

struct Feed<T> {
    id: Uuid,
    uid: String,
    tx: UnboundedSender<T>,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    users: HashMap<String, UserData>,
    trade_feeds: Vec<Feed<Vec<Trade>>>,
    settings_feeds: Vec<Feed<UserSettings>>,
    next_trade_id: u64,
    /// When set, created trades get no timestamp until
    /// [`MemoryBackend::resolve_timestamps`] runs — simulates a pending
    /// server timestamp on a fresh write.
    hold_timestamps: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Create trades without a resolved timestamp until
    /// [`MemoryBackend::resolve_timestamps`] is called.
    pub fn hold_timestamps(&self, hold: bool) {
        self.inner.lock().unwrap().hold_timestamps = hold;
    }

    /// Assign the current time to every pending trade timestamp and
    /// push fresh snapshots to affected subscribers.
    pub fn resolve_timestamps(&self) {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let uids: Vec<String> = inner.users.keys().cloned().collect();
        for uid in uids {
            let mut changed = false;
            if let Some(data) = inner.users.get_mut(&uid) {
                for trade in &mut data.trades {
                    if trade.created_at.is_none() {
                        trade.created_at = Some(now);
                        changed = true;
                    }
                }
            }
            if changed {
                inner.broadcast_trades(&uid);
            }
        }
    }

    /// Number of live trade-snapshot subscribers (test observability).
    pub fn trade_subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().trade_feeds.len()
    }

    /// Number of live settings-snapshot subscribers (test observability).
    pub fn settings_subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().settings_feeds.len()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn broadcast_trades(&mut self, uid: &str) {
        let snapshot = self
            .users
            .get(uid)
            .map(|d| d.trades.clone())
            .unwrap_or_default();
        self.trade_feeds
            .retain(|feed| feed.uid != uid || feed.tx.send(snapshot.clone()).is_ok());
    }

    fn broadcast_settings(&mut self, uid: &str) {
        let snapshot = self
            .users
            .get(uid)
            .and_then(|d| d.settings.clone())
            .unwrap_or_default();
        self.settings_feeds
            .retain(|feed| feed.uid != uid || feed.tx.send(snapshot.clone()).is_ok());
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    fn name(&self) -> &str {
        "MemoryAuth"
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, CoreError> {
        let inner = self.inner.lock().unwrap();
        match inner.accounts.get(email) {
            Some(account) if account.password == password => Ok(account.user.clone()),
            // Same opaque message for unknown email and wrong password,
            // matching hosted-provider behavior.
            _ => Err(CoreError::Auth("INVALID_LOGIN_CREDENTIALS".to_string())),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, CoreError> {
        if !email.contains('@') {
            return Err(CoreError::Auth("INVALID_EMAIL".to_string()));
        }
        if password.len() < 6 {
            return Err(CoreError::Auth(
                "WEAK_PASSWORD : Password should be at least 6 characters".to_string(),
            ));
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.accounts.contains_key(email) {
            return Err(CoreError::Auth("EMAIL_EXISTS".to_string()));
        }
        let user = AuthUser {
            uid: Uuid::new_v4().to_string(),
            email: email.to_string(),
        };
        inner.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        inner.users.insert(user.uid.clone(), UserData::default());
        Ok(user)
    }

    async fn sign_out(&self, _user: &AuthUser) -> Result<(), CoreError> {
        Ok(())
    }
}

#[async_trait]
impl TradeStore for MemoryBackend {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    async fn subscribe_trades(&self, uid: &str) -> Result<Subscription<Vec<Trade>>, CoreError> {
        let (tx, rx) = feed_channel();
        let mut inner = self.inner.lock().unwrap();

        // Initial snapshot is delivered immediately, like the hosted
        // store's listener.
        let snapshot = inner
            .users
            .get(uid)
            .map(|d| d.trades.clone())
            .unwrap_or_default();
        let _ = tx.send(snapshot);

        let id = Uuid::new_v4();
        inner.trade_feeds.push(Feed {
            id,
            uid: uid.to_string(),
            tx,
        });

        let registry = Arc::clone(&self.inner);
        let guard = SubscriptionGuard::new(move || {
            registry
                .lock()
                .unwrap()
                .trade_feeds
                .retain(|feed| feed.id != id);
        });
        Ok(Subscription::new(rx, guard))
    }

    async fn subscribe_settings(&self, uid: &str) -> Result<Subscription<UserSettings>, CoreError> {
        let (tx, rx) = feed_channel();
        let mut inner = self.inner.lock().unwrap();

        let snapshot = inner
            .users
            .get(uid)
            .and_then(|d| d.settings.clone())
            .unwrap_or_default();
        let _ = tx.send(snapshot);

        let id = Uuid::new_v4();
        inner.settings_feeds.push(Feed {
            id,
            uid: uid.to_string(),
            tx,
        });

        let registry = Arc::clone(&self.inner);
        let guard = SubscriptionGuard::new(move || {
            registry
                .lock()
                .unwrap()
                .settings_feeds
                .retain(|feed| feed.id != id);
        });
        Ok(Subscription::new(rx, guard))
    }

    async fn create_trade(&self, uid: &str, trade: NewTrade) -> Result<String, CoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_trade_id += 1;
        let id = format!("trade-{}", inner.next_trade_id);
        let created_at = if inner.hold_timestamps {
            None
        } else {
            Some(Utc::now())
        };

        let stored = Trade::from_new(id.clone(), created_at, trade);
        inner
            .users
            .entry(uid.to_string())
            .or_default()
            .trades
            .push(stored);
        inner.broadcast_trades(uid);
        Ok(id)
    }

    async fn delete_trade(&self, uid: &str, trade_id: &str) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().unwrap();
        let data = inner
            .users
            .get_mut(uid)
            .ok_or_else(|| CoreError::Store(format!("unknown user '{uid}'")))?;
        let idx = data
            .trades
            .iter()
            .position(|t| t.id == trade_id)
            .ok_or_else(|| CoreError::TradeNotFound(trade_id.to_string()))?;
        data.trades.remove(idx);
        inner.broadcast_trades(uid);
        Ok(())
    }

    async fn save_settings(&self, uid: &str, settings: &UserSettings) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .users
            .entry(uid.to_string())
            .or_default()
            .settings = Some(settings.clone());
        inner.broadcast_settings(uid);
        Ok(())
    }
}
