use std::collections::BTreeMap;

use chrono::Datelike;

use crate::models::analytics::{MonthlyProgress, OutcomeDistribution, PerformanceSummary};
use crate::models::trade::{Outcome, Trade};

/// Computes all derived performance analytics over a trade snapshot.
///
/// Pure business logic — no I/O, no state, fully re-derived from the
/// current snapshot on every call. Deterministic for a given input
/// ordering. Signed P/L always comes from `Trade::signed_pnl`, never
/// re-derived locally.
///
/// Trades without a resolved timestamp (pending server write) are
/// included in aggregate totals but excluded from calendar bucketing;
/// that asymmetry is deliberate.
pub struct MetricsService;

impl MetricsService {
    pub fn new() -> Self {
        Self
    }

    // ── Aggregate totals ────────────────────────────────────────────

    /// Sum of signed P/L over all trades. Empty list → 0.
    pub fn net_profit(&self, trades: &[Trade]) -> f64 {
        trades.iter().map(Trade::signed_pnl).sum()
    }

    /// Sum of profit-only amounts (always >= 0).
    pub fn gross_profit(&self, trades: &[Trade]) -> f64 {
        trades
            .iter()
            .filter(|t| t.outcome == Outcome::Profit)
            .map(|t| t.amount)
            .sum()
    }

    /// Sum of loss-only amounts (always >= 0).
    pub fn gross_loss(&self, trades: &[Trade]) -> f64 {
        trades
            .iter()
            .filter(|t| t.outcome == Outcome::Loss)
            .map(|t| t.amount)
            .sum()
    }

    /// Winning trades as a percentage of all trades; 0 when empty.
    pub fn win_rate(&self, trades: &[Trade]) -> f64 {
        if trades.is_empty() {
            return 0.0;
        }
        let wins = trades.iter().filter(|t| t.outcome == Outcome::Profit).count();
        wins as f64 / trades.len() as f64 * 100.0
    }

    /// Gross profit over gross loss.
    ///
    /// When there are no losses this saturates to the gross profit
    /// itself (not infinity), and to 0 when there are no profits either.
    /// The fallback is a display convenience, not a true ratio — tests
    /// pin it as a named edge case.
    pub fn profit_factor(&self, trades: &[Trade]) -> f64 {
        let gross_profit = self.gross_profit(trades);
        let gross_loss = self.gross_loss(trades);
        if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            gross_profit
        } else {
            0.0
        }
    }

    /// Outcome tally for the win/loss ratio chart.
    pub fn outcome_distribution(&self, trades: &[Trade]) -> OutcomeDistribution {
        let mut dist = OutcomeDistribution::default();
        for trade in trades {
            match trade.outcome {
                Outcome::Profit => dist.profits += 1,
                Outcome::Loss => dist.losses += 1,
                Outcome::BreakEven => dist.break_evens += 1,
            }
        }
        dist
    }

    /// One-pass bundle of the stats-card figures.
    pub fn performance_summary(&self, trades: &[Trade]) -> PerformanceSummary {
        let dist = self.outcome_distribution(trades);
        let gross_profit = self.gross_profit(trades);
        let gross_loss = self.gross_loss(trades);
        PerformanceSummary {
            total_trades: trades.len(),
            wins: dist.profits,
            losses: dist.losses,
            break_evens: dist.break_evens,
            net_profit: self.net_profit(trades),
            gross_profit,
            gross_loss,
            win_rate: self.win_rate(trades),
            profit_factor: self.profit_factor(trades),
        }
    }

    // ── Growth curve ────────────────────────────────────────────────

    /// Cumulative balance over trades sorted ascending by timestamp,
    /// prefixed with a leading 0 for the starting balance.
    ///
    /// Length is always `trades.len() + 1`. The sort is stable, so
    /// equal timestamps keep collection order; unresolved timestamps
    /// sort as the epoch, i.e. ahead of everything timestamped.
    pub fn balance_curve(&self, trades: &[Trade]) -> Vec<f64> {
        let mut ordered: Vec<&Trade> = trades.iter().collect();
        ordered.sort_by_key(|t| t.created_at.map(|ts| ts.timestamp_micros()).unwrap_or(0));

        let mut curve = Vec::with_capacity(trades.len() + 1);
        let mut balance = 0.0;
        curve.push(balance);
        for trade in ordered {
            balance += trade.signed_pnl();
            curve.push(balance);
        }
        curve
    }

    // ── Calendar bucketing ──────────────────────────────────────────

    /// Signed P/L totals per day-of-month for trades whose timestamp
    /// falls in the given year/month. Days with no trades are absent.
    /// Trades with a pending timestamp are excluded.
    pub fn daily_pnl(&self, trades: &[Trade], year: i32, month: u32) -> BTreeMap<u32, f64> {
        let mut buckets = BTreeMap::new();
        for trade in trades {
            let Some(ts) = trade.created_at else { continue };
            let date = ts.date_naive();
            if date.year() == year && date.month() == month {
                *buckets.entry(date.day()).or_insert(0.0) += trade.signed_pnl();
            }
        }
        buckets
    }

    /// Net P/L for the month: the sum of that month's daily buckets,
    /// so it reconciles with `daily_pnl` by construction.
    pub fn monthly_pnl(&self, trades: &[Trade], year: i32, month: u32) -> f64 {
        self.daily_pnl(trades, year, month).values().sum()
    }

    /// Progress toward a monthly net-profit target, as a percentage
    /// clamped to [0, 100]. A target of 0 (or negative input) yields 0.
    pub fn target_progress(&self, realized: f64, target: f64) -> f64 {
        if target > 0.0 {
            (realized / target * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Monthly realized P/L measured against the configured target.
    pub fn monthly_progress(
        &self,
        trades: &[Trade],
        year: i32,
        month: u32,
        target: f64,
    ) -> MonthlyProgress {
        let realized = self.monthly_pnl(trades, year, month);
        MonthlyProgress {
            year,
            month,
            realized,
            target,
            progress_pct: self.target_progress(realized, target),
        }
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new()
    }
}
