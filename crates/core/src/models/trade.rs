use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Placeholder note stored when the entry form leaves the field empty.
pub const NOTE_PLACEHOLDER: &str = "No notes";

/// Trade setup classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Setup {
    Breakout,
    Retest,
    Pullback,
    Scalping,
    /// Stored on the wire as "Trend Follow".
    #[serde(rename = "Trend Follow")]
    TrendFollow,
}

impl Setup {
    /// All enumerated values, in form-display order.
    pub const ALL: [Setup; 5] = [
        Setup::Breakout,
        Setup::Retest,
        Setup::Pullback,
        Setup::Scalping,
        Setup::TrendFollow,
    ];

    /// Parse the wire/form label, e.g. "Trend Follow".
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Breakout" => Some(Setup::Breakout),
            "Retest" => Some(Setup::Retest),
            "Pullback" => Some(Setup::Pullback),
            "Scalping" => Some(Setup::Scalping),
            "Trend Follow" => Some(Setup::TrendFollow),
            _ => None,
        }
    }
}

impl std::fmt::Display for Setup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Setup::Breakout => write!(f, "Breakout"),
            Setup::Retest => write!(f, "Retest"),
            Setup::Pullback => write!(f, "Pullback"),
            Setup::Scalping => write!(f, "Scalping"),
            Setup::TrendFollow => write!(f, "Trend Follow"),
        }
    }
}

/// Direction of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Long" => Some(Side::Long),
            "Short" => Some(Side::Short),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "Long"),
            Side::Short => write!(f, "Short"),
        }
    }
}

/// How the trade closed. The sign of the P/L is carried here, never by
/// the stored amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Profit,
    Loss,
    /// Stored on the wire as "BE".
    #[serde(rename = "BE")]
    BreakEven,
}

impl Outcome {
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Profit" => Some(Outcome::Profit),
            "Loss" => Some(Outcome::Loss),
            "BE" => Some(Outcome::BreakEven),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Profit => write!(f, "Profit"),
            Outcome::Loss => write!(f, "Loss"),
            Outcome::BreakEven => write!(f, "BE"),
        }
    }
}

/// Emotional state logged alongside the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Calm,
    Patient,
    Greedy,
    Fear,
    #[serde(rename = "FOMO")]
    Fomo,
}

impl Mood {
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Calm" => Some(Mood::Calm),
            "Patient" => Some(Mood::Patient),
            "Greedy" => Some(Mood::Greedy),
            "Fear" => Some(Mood::Fear),
            "FOMO" => Some(Mood::Fomo),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mood::Calm => write!(f, "Calm"),
            Mood::Patient => write!(f, "Patient"),
            Mood::Greedy => write!(f, "Greedy"),
            Mood::Fear => write!(f, "Fear"),
            Mood::Fomo => write!(f, "FOMO"),
        }
    }
}

/// One logged trading outcome event.
///
/// Immutable once created and deleted as a whole — there is no partial
/// update path. The store assigns `id` and `created_at`; `created_at` is
/// `None` while the server timestamp is still pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Store-assigned opaque identifier
    pub id: String,

    /// Instrument label, upper-cased at construction (e.g. "XAUUSD")
    pub asset: String,

    /// Setup classification
    pub setup: Setup,

    /// Long or Short
    #[serde(rename = "type")]
    pub side: Side,

    /// Profit, Loss, or break-even
    pub outcome: Outcome,

    /// Emotional state when the trade was taken
    pub mood: Mood,

    /// Magnitude of the profit/loss (always >= 0; sign lives in `outcome`)
    pub amount: f64,

    /// Achieved reward multiple
    #[serde(rename = "rr")]
    pub risk_reward: f64,

    /// Free-text note; defaults to [`NOTE_PLACEHOLDER`]
    #[serde(rename = "strategy", default = "default_note")]
    pub note: String,

    /// Server-assigned creation timestamp; `None` while the write is pending
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_note() -> String {
    NOTE_PLACEHOLDER.to_string()
}

impl Trade {
    /// Assemble a stored trade from a validated entry plus the
    /// store-assigned id and timestamp.
    pub fn from_new(id: impl Into<String>, created_at: Option<DateTime<Utc>>, new: NewTrade) -> Self {
        Self {
            id: id.into(),
            asset: new.asset,
            setup: new.setup,
            side: new.side,
            outcome: new.outcome,
            mood: new.mood,
            amount: new.amount,
            risk_reward: new.risk_reward,
            note: new.note,
            created_at,
        }
    }

    /// Signed profit/loss of this trade.
    ///
    /// This is the single source of truth for the sign rule — every
    /// consumer (growth curve, calendar buckets, stats cards) must go
    /// through it rather than re-deriving the sign locally.
    pub fn signed_pnl(&self) -> f64 {
        match self.outcome {
            Outcome::Profit => self.amount,
            Outcome::Loss => -self.amount,
            Outcome::BreakEven => 0.0,
        }
    }
}

/// A validated trade entry, ready to hand to the store.
/// Everything except the store-assigned `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrade {
    pub asset: String,
    pub setup: Setup,
    #[serde(rename = "type")]
    pub side: Side,
    pub outcome: Outcome,
    pub mood: Mood,
    pub amount: f64,
    #[serde(rename = "rr")]
    pub risk_reward: f64,
    #[serde(rename = "strategy")]
    pub note: String,
}

/// Raw trade-entry form state, exactly as submitted by the user.
///
/// Numeric fields arrive as strings; enums arrive as their form labels.
/// [`TradeDraft::validate`] is the construction-time gate from which the
/// only way out is a well-formed [`NewTrade`].
#[derive(Debug, Clone, Default)]
pub struct TradeDraft {
    pub asset: String,
    pub setup: String,
    pub side: String,
    pub outcome: String,
    pub mood: String,
    pub amount: String,
    pub risk_reward: String,
    pub note: String,

    /// "Setup matches strategy" discipline acknowledgement.
    /// Gates submission only; never persisted with the trade.
    pub setup_confirmed: bool,
    /// "Risk sized correctly" discipline acknowledgement.
    pub risk_confirmed: bool,
}

impl TradeDraft {
    /// Validate the draft and produce a [`NewTrade`], or a
    /// `CoreError::Validation` naming the first offending field.
    ///
    /// Rules:
    /// - both discipline acknowledgements must be affirmed
    /// - `asset` non-empty (upper-cased on the way out)
    /// - `amount` a non-negative finite number
    /// - `risk_reward` a finite number
    /// - `setup`, `side`, `outcome`, `mood` one of their enumerated values
    /// - empty `note` becomes [`NOTE_PLACEHOLDER`]
    pub fn validate(&self) -> Result<NewTrade, CoreError> {
        if !self.setup_confirmed {
            return Err(CoreError::validation(
                "setup_confirmed",
                "discipline checklist: confirm the setup matches your strategy",
            ));
        }
        if !self.risk_confirmed {
            return Err(CoreError::validation(
                "risk_confirmed",
                "discipline checklist: confirm the risk is sized correctly",
            ));
        }

        let asset = self.asset.trim();
        if asset.is_empty() {
            return Err(CoreError::validation("asset", "asset must not be empty"));
        }

        let setup = Setup::parse(self.setup.trim())
            .ok_or_else(|| CoreError::validation("setup", format!("unknown setup '{}'", self.setup)))?;
        let side = Side::parse(self.side.trim())
            .ok_or_else(|| CoreError::validation("side", format!("unknown side '{}'", self.side)))?;
        let outcome = Outcome::parse(self.outcome.trim())
            .ok_or_else(|| CoreError::validation("outcome", format!("unknown outcome '{}'", self.outcome)))?;
        let mood = Mood::parse(self.mood.trim())
            .ok_or_else(|| CoreError::validation("mood", format!("unknown mood '{}'", self.mood)))?;

        let amount: f64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| CoreError::validation("amount", format!("'{}' is not a number", self.amount)))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(CoreError::validation(
                "amount",
                "amount must be a non-negative finite number",
            ));
        }

        let risk_reward: f64 = self.risk_reward.trim().parse().map_err(|_| {
            CoreError::validation("risk_reward", format!("'{}' is not a number", self.risk_reward))
        })?;
        if !risk_reward.is_finite() {
            return Err(CoreError::validation(
                "risk_reward",
                "risk/reward must be a finite number",
            ));
        }

        let note = self.note.trim();
        let note = if note.is_empty() {
            NOTE_PLACEHOLDER.to_string()
        } else {
            note.to_string()
        };

        Ok(NewTrade {
            asset: asset.to_uppercase(),
            setup,
            side,
            outcome,
            mood,
            amount,
            risk_reward,
            note,
        })
    }
}
