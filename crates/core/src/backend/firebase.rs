use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::CoreError;
use crate::models::settings::UserSettings;
use crate::models::trade::{Mood, NewTrade, Outcome, Setup, Side, Trade};

use super::subscription::{feed_channel, Subscription, SubscriptionGuard};
use super::traits::{AuthProvider, AuthUser, TradeStore};

const AUTH_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";

/// Connection settings for the hosted Firebase backend.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Web API key of the Firebase project.
    pub api_key: String,
    /// Firebase/GCP project id (e.g. "trade-journal-504bc").
    pub project_id: String,
    /// How often the snapshot listener re-reads the store.
    pub poll_interval: Duration,
}

impl FirebaseConfig {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Hosted backend over the Firebase REST surface.
///
/// - **Identity**: Identity Toolkit (`signInWithPassword`, `signUp`).
/// - **Documents**: Firestore REST, trades under `users/{uid}/trades`,
///   settings at `users/{uid}/settings/user_config`.
/// - **Subscriptions**: a polling listener task that re-reads the
///   collection and delivers a snapshot whenever it changed. Firestore's
///   streaming listen channel is gRPC-only; polling keeps the same
///   full-replacement contract.
///
/// The trade's `created_at` maps from the document's server-assigned
/// `createTime`, so the timestamp is never client-adjustable.
#[derive(Clone)]
pub struct FirebaseBackend {
    config: FirebaseConfig,
    client: Client,
    /// Bearer token for Firestore calls, set on sign-in/up and cleared
    /// on sign-out.
    token: Arc<Mutex<Option<String>>>,
}

// ── Identity Toolkit response types ──────────────────────────────────

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: String,
    #[serde(rename = "idToken")]
    id_token: String,
}

impl FirebaseBackend {
    pub fn new(config: FirebaseConfig) -> Result<Self, CoreError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            config,
            client,
            token: Arc::new(Mutex::new(None)),
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{FIRESTORE_BASE}/projects/{}/databases/(default)/documents",
            self.config.project_id
        )
    }

    fn trades_url(&self, uid: &str) -> String {
        format!("{}/users/{uid}/trades", self.documents_url())
    }

    fn settings_url(&self, uid: &str) -> String {
        format!("{}/users/{uid}/settings/user_config", self.documents_url())
    }

    fn bearer(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    async fn credential_request(&self, endpoint: &str, email: &str, password: &str) -> Result<AuthUser, CoreError> {
        let url = format!("{AUTH_BASE}/accounts:{endpoint}?key={}", self.config.api_key);
        let resp = self
            .client
            .post(&url)
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            // The provider's message is surfaced verbatim (e.g.
            // "INVALID_LOGIN_CREDENTIALS", "EMAIL_EXISTS").
            return Err(CoreError::Auth(error_message(resp).await));
        }

        let auth: AuthResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Auth(format!("malformed identity response: {e}")))?;

        *self.token.lock().unwrap() = Some(auth.id_token);
        Ok(AuthUser {
            uid: auth.local_id,
            email: auth.email,
        })
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.bearer() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Read the full trade collection for a user, oldest first.
    ///
    /// Firestore caps list responses at one page; the loop follows
    /// `nextPageToken` until the collection is exhausted, so the
    /// snapshot is never a truncated prefix of the journal.
    async fn list_trades(&self, uid: &str) -> Result<Vec<Trade>, CoreError> {
        let mut trades = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!("{}?pageSize=300", self.trades_url(uid));
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }
            let resp = self.authed(self.client.get(&url)).send().await?;
            if !resp.status().is_success() {
                return Err(CoreError::Store(error_message(resp).await));
            }
            let body: Value = resp.json().await.map_err(CoreError::from)?;

            if let Some(documents) = body["documents"].as_array() {
                for doc in documents {
                    trades.push(doc_to_trade(doc)?);
                }
            }
            match next_page_token(&body) {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }
        // The store delivers insertion order; createTime is the closest
        // stable proxy over REST.
        trades.sort_by_key(|t| t.created_at.map(|ts| ts.timestamp_micros()).unwrap_or(0));
        Ok(trades)
    }

    async fn read_settings(&self, uid: &str) -> Result<UserSettings, CoreError> {
        let resp = self
            .authed(self.client.get(self.settings_url(uid)))
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            // No settings document yet: defaults apply.
            return Ok(UserSettings::default());
        }
        if !resp.status().is_success() {
            return Err(CoreError::Store(error_message(resp).await));
        }
        let body: Value = resp.json().await.map_err(CoreError::from)?;
        doc_to_settings(&body)
    }
}

#[async_trait]
impl AuthProvider for FirebaseBackend {
    fn name(&self) -> &str {
        "FirebaseAuth"
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, CoreError> {
        self.credential_request("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, CoreError> {
        self.credential_request("signUp", email, password).await
    }

    async fn sign_out(&self, _user: &AuthUser) -> Result<(), CoreError> {
        // REST identity sessions are stateless; discarding the token ends
        // the session.
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

#[async_trait]
impl TradeStore for FirebaseBackend {
    fn name(&self) -> &str {
        "Firestore"
    }

    async fn subscribe_trades(&self, uid: &str) -> Result<Subscription<Vec<Trade>>, CoreError> {
        let initial = self.list_trades(uid).await?;
        let (tx, rx) = feed_channel();
        let _ = tx.send(initial.clone());

        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = SubscriptionGuard::new({
            let cancelled = Arc::clone(&cancelled);
            move || cancelled.store(true, Ordering::Relaxed)
        });

        let backend = self.clone();
        let uid = uid.to_string();
        let interval = self.config.poll_interval;
        tokio::spawn(async move {
            let mut last = initial;
            loop {
                tokio::time::sleep(interval).await;
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                match backend.list_trades(&uid).await {
                    Ok(snapshot) => {
                        if snapshot != last {
                            last = snapshot.clone();
                            if tx.send(snapshot).is_err() {
                                break;
                            }
                        }
                    }
                    // A failed poll is logged and retried on the next
                    // tick; the subscriber keeps its last snapshot.
                    Err(e) => tracing::warn!(error = %e, "trade snapshot poll failed"),
                }
            }
        });

        Ok(Subscription::new(rx, guard))
    }

    async fn subscribe_settings(&self, uid: &str) -> Result<Subscription<UserSettings>, CoreError> {
        let initial = self.read_settings(uid).await?;
        let (tx, rx) = feed_channel();
        let _ = tx.send(initial.clone());

        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = SubscriptionGuard::new({
            let cancelled = Arc::clone(&cancelled);
            move || cancelled.store(true, Ordering::Relaxed)
        });

        let backend = self.clone();
        let uid = uid.to_string();
        let interval = self.config.poll_interval;
        tokio::spawn(async move {
            let mut last = initial;
            loop {
                tokio::time::sleep(interval).await;
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                match backend.read_settings(&uid).await {
                    Ok(snapshot) => {
                        if snapshot != last {
                            last = snapshot.clone();
                            if tx.send(snapshot).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "settings snapshot poll failed"),
                }
            }
        });

        Ok(Subscription::new(rx, guard))
    }

    async fn create_trade(&self, uid: &str, trade: NewTrade) -> Result<String, CoreError> {
        let resp = self
            .authed(self.client.post(self.trades_url(uid)))
            .json(&json!({ "fields": trade_fields(&trade) }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::Store(error_message(resp).await));
        }
        let body: Value = resp.json().await.map_err(CoreError::from)?;
        let name = body["name"]
            .as_str()
            .ok_or_else(|| CoreError::Store("create response missing document name".to_string()))?;
        Ok(document_id(name).to_string())
    }

    async fn delete_trade(&self, uid: &str, trade_id: &str) -> Result<(), CoreError> {
        let url = format!("{}/{trade_id}", self.trades_url(uid));

        // Firestore deletes are silently idempotent; probe first so an
        // unknown id surfaces as an error, as the contract requires.
        let probe = self.authed(self.client.get(&url)).send().await?;
        if probe.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::TradeNotFound(trade_id.to_string()));
        }
        if !probe.status().is_success() {
            return Err(CoreError::Store(error_message(probe).await));
        }

        let resp = self.authed(self.client.delete(&url)).send().await?;
        if !resp.status().is_success() {
            return Err(CoreError::Store(error_message(resp).await));
        }
        Ok(())
    }

    async fn save_settings(&self, uid: &str, settings: &UserSettings) -> Result<(), CoreError> {
        let resp = self
            .authed(self.client.patch(self.settings_url(uid)))
            .json(&json!({
                "fields": {
                    "currency": { "stringValue": settings.currency },
                    "monthlyTarget": { "doubleValue": settings.monthly_target },
                }
            }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::Store(error_message(resp).await));
        }
        Ok(())
    }
}

// ── Firestore document mapping ───────────────────────────────────────

fn trade_fields(new: &NewTrade) -> Value {
    json!({
        "asset": { "stringValue": new.asset },
        "setup": { "stringValue": new.setup.to_string() },
        "type": { "stringValue": new.side.to_string() },
        "outcome": { "stringValue": new.outcome.to_string() },
        "mood": { "stringValue": new.mood.to_string() },
        "amount": { "doubleValue": new.amount },
        "rr": { "doubleValue": new.risk_reward },
        "strategy": { "stringValue": new.note },
    })
}

fn doc_to_trade(doc: &Value) -> Result<Trade, CoreError> {
    let name = doc["name"]
        .as_str()
        .ok_or_else(|| CoreError::Store("document missing name".to_string()))?;
    let id = document_id(name).to_string();
    let fields = &doc["fields"];

    let asset = string_field(fields, "asset")
        .ok_or_else(|| malformed(&id, "asset"))?
        .to_string();
    let setup = string_field(fields, "setup")
        .and_then(Setup::parse)
        .ok_or_else(|| malformed(&id, "setup"))?;
    let side = string_field(fields, "type")
        .and_then(Side::parse)
        .ok_or_else(|| malformed(&id, "type"))?;
    let outcome = string_field(fields, "outcome")
        .and_then(Outcome::parse)
        .ok_or_else(|| malformed(&id, "outcome"))?;
    let mood = string_field(fields, "mood")
        .and_then(Mood::parse)
        .ok_or_else(|| malformed(&id, "mood"))?;
    let amount = number_field(fields, "amount").ok_or_else(|| malformed(&id, "amount"))?;
    let risk_reward = number_field(fields, "rr").ok_or_else(|| malformed(&id, "rr"))?;
    let note = string_field(fields, "strategy")
        .unwrap_or(crate::models::trade::NOTE_PLACEHOLDER)
        .to_string();

    // Server-assigned creation time; absent only on a not-yet-committed
    // write, which the REST read surface never returns half-done.
    let created_at: Option<DateTime<Utc>> = doc["createTime"]
        .as_str()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));

    Ok(Trade {
        id,
        asset,
        setup,
        side,
        outcome,
        mood,
        amount,
        risk_reward,
        note,
        created_at,
    })
}

fn doc_to_settings(doc: &Value) -> Result<UserSettings, CoreError> {
    let fields = &doc["fields"];
    let defaults = UserSettings::default();
    Ok(UserSettings {
        currency: string_field(fields, "currency")
            .map(str::to_string)
            .unwrap_or(defaults.currency),
        monthly_target: number_field(fields, "monthlyTarget").unwrap_or(defaults.monthly_target),
    })
}

fn string_field<'a>(fields: &'a Value, name: &str) -> Option<&'a str> {
    fields[name]["stringValue"].as_str()
}

/// Firestore encodes numbers as `doubleValue` or (for whole numbers
/// written by some SDKs) a stringified `integerValue`.
fn number_field(fields: &Value, name: &str) -> Option<f64> {
    let value = &fields[name];
    if let Some(n) = value["doubleValue"].as_f64() {
        return Some(n);
    }
    value["integerValue"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value["integerValue"].as_i64().map(|n| n as f64))
}

/// Continuation token of a Firestore list response, if the collection
/// has more pages. Firestore sometimes sends an empty-string token on
/// the final page; that also means done.
fn next_page_token(body: &Value) -> Option<&str> {
    body["nextPageToken"].as_str().filter(|token| !token.is_empty())
}

/// Last path segment of a full document resource name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn malformed(id: &str, field: &str) -> CoreError {
    CoreError::Store(format!("trade document '{id}' has a malformed '{field}' field"))
}

async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<Value>().await {
        Ok(body) => body["error"]["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string()),
        Err(_) => status.to_string(),
    }
}
