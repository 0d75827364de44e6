use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::settings::UserSettings;
use crate::models::trade::{NewTrade, Trade};

use super::subscription::Subscription;

/// Opaque identity handle returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider-assigned user id.
    pub uid: String,
    /// Email the account was registered with.
    pub email: String,
}

/// Trait abstraction for the external identity provider.
///
/// The core never implements credential handling itself — it consumes
/// whichever provider is injected (hosted backend, in-memory fake).
/// Provider errors carry the provider's own message, surfaced verbatim.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, CoreError>;

    /// Create a new account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, CoreError>;

    /// End the authenticated session.
    async fn sign_out(&self, user: &AuthUser) -> Result<(), CoreError>;
}

/// Trait abstraction for the external document store.
///
/// Reads are live subscriptions delivering full-collection snapshots;
/// writes are fire-and-forget from the core's perspective — the core
/// never applies them optimistically, it waits for the next snapshot.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Human-readable name of this store (for logs/errors).
    fn name(&self) -> &str;

    /// Subscribe to all trades for a user. Every insert/delete is
    /// reflected as a complete replacement list; the current state is
    /// delivered as the first snapshot.
    async fn subscribe_trades(&self, uid: &str) -> Result<Subscription<Vec<Trade>>, CoreError>;

    /// Subscribe to the user's settings document. Absence of the
    /// document is reported as the defaults.
    async fn subscribe_settings(&self, uid: &str) -> Result<Subscription<UserSettings>, CoreError>;

    /// Persist a validated trade. The store assigns the id and the
    /// server-side creation timestamp; the assigned id is returned.
    async fn create_trade(&self, uid: &str, trade: NewTrade) -> Result<String, CoreError>;

    /// Remove a trade by id. Unknown or unauthorized ids fail with a
    /// store error; the caller's local state is never touched.
    async fn delete_trade(&self, uid: &str, trade_id: &str) -> Result<(), CoreError>;

    /// Overwrite the user's settings document wholesale.
    async fn save_settings(&self, uid: &str, settings: &UserSettings) -> Result<(), CoreError>;
}
