use crate::models::trade::{Outcome, Trade};

/// List-side helpers over the trade snapshot: ordering, lookup, search.
///
/// Pure and stateless, like the metrics calculator — the snapshot itself
/// is owned by the session and replaced wholesale on every delivery.
pub struct JournalService;

impl JournalService {
    pub fn new() -> Self {
        Self
    }

    /// Trades ordered newest first for the journal table.
    /// Pending-timestamp trades sort first — they are the newest writes.
    pub fn recent_first<'a>(&self, trades: &'a [Trade]) -> Vec<&'a Trade> {
        let mut ordered: Vec<&Trade> = trades.iter().collect();
        ordered.sort_by_key(|t| {
            std::cmp::Reverse(t.created_at.map(|ts| ts.timestamp_micros()).unwrap_or(i64::MAX))
        });
        ordered
    }

    /// Look up a trade by its store-assigned id.
    pub fn find<'a>(&self, trades: &'a [Trade], trade_id: &str) -> Option<&'a Trade> {
        trades.iter().find(|t| t.id == trade_id)
    }

    /// Trades with a given outcome.
    pub fn with_outcome<'a>(&self, trades: &'a [Trade], outcome: Outcome) -> Vec<&'a Trade> {
        trades.iter().filter(|t| t.outcome == outcome).collect()
    }

    /// Case-insensitive search across asset and note.
    pub fn search<'a>(&self, trades: &'a [Trade], query: &str) -> Vec<&'a Trade> {
        let q = query.to_lowercase();
        trades
            .iter()
            .filter(|t| {
                t.asset.to_lowercase().contains(&q) || t.note.to_lowercase().contains(&q)
            })
            .collect()
    }
}

impl Default for JournalService {
    fn default() -> Self {
        Self::new()
    }
}
