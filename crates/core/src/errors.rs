use thiserror::Error;

/// Unified error type for the entire trade-journal-core library.
/// Every public fallible function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    // ── Identity Provider ───────────────────────────────────────────
    /// Credential rejected by the identity provider. The provider's
    /// message is surfaced verbatim; no retry is attempted.
    #[error("Authentication failed: {0}")]
    Auth(String),

    // ── Document Store ──────────────────────────────────────────────
    /// Transport or permission failure on a store read/write.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    // ── Wire / Transport ────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl CoreError {
    /// Shorthand for a validation failure naming the offending field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Sanitize error message: strip query parameters from URLs to prevent
        // API key leakage. reqwest errors often contain full URLs with secrets.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
