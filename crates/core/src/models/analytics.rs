use serde::{Deserialize, Serialize};

/// Tally of trade outcomes, for the win/loss ratio visualization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeDistribution {
    pub profits: usize,
    pub losses: usize,
    pub break_evens: usize,
}

impl OutcomeDistribution {
    pub fn total(&self) -> usize {
        self.profits + self.losses + self.break_evens
    }
}

/// Aggregate performance figures for the stats cards.
///
/// All signed values are derived through `Trade::signed_pnl`, so every
/// consumer agrees bit-for-bit on the sign rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub break_evens: usize,

    /// Sum of signed P/L over all trades.
    pub net_profit: f64,
    /// Sum of profit-only amounts (>= 0).
    pub gross_profit: f64,
    /// Sum of loss-only amounts (>= 0).
    pub gross_loss: f64,

    /// wins / total * 100; 0 when there are no trades.
    pub win_rate: f64,
    /// gross_profit / gross_loss, with the saturating no-loss fallback.
    pub profit_factor: f64,
}

/// Monthly target progress for the dashboard bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProgress {
    pub year: i32,
    pub month: u32,

    /// Net P/L realized in the month (timestamped trades only).
    pub realized: f64,
    /// The user's configured monthly target.
    pub target: f64,
    /// realized / target * 100, clamped to [0, 100]; 0 when target is 0.
    pub progress_pct: f64,
}
