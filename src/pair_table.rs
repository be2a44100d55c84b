//! Holds mutable per-pair state; provides ranked snapshots (spec.md §4.4, §5).
//!
//! Concurrency model: an outer `parking_lot::RwLock` guards only the map's
//! shape (insert-on-first-observation); each entry is individually guarded
//! by its own `parking_lot::Mutex`. Writers on distinct pair names take the
//! outer lock only as a read lock, then serialize solely on their own
//! entry's mutex — they never block each other in the hot path.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Which venue side a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

/// Common behavior every per-pair state record must provide so that
/// [`PairTable`] can rank and lazily create entries without knowing the
/// concrete record shape.
pub trait SpreadState: Default + Clone + Send + Sync + 'static {
    fn pair_name(&self) -> &str;
    fn set_pair_name(&mut self, name: String);
    fn spread_pct(&self) -> f64;
}

/// Ticker-mode per-pair state (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct TickerPairState {
    pub pair_name: String,
    pub price_a: f64,
    pub price_b: f64,
    pub spread: f64,
    pub spread_pct: f64,
    pub elapsed_time_a_ms: f64,
    pub elapsed_time_b_ms: f64,
}

impl SpreadState for TickerPairState {
    fn pair_name(&self) -> &str {
        &self.pair_name
    }
    fn set_pair_name(&mut self, name: String) {
        self.pair_name = name;
    }
    fn spread_pct(&self) -> f64 {
        self.spread_pct
    }
}

/// Orderbook-mode per-pair state (spec.md §3). Only the `_pct` spread
/// variants are kept: the source carried vestigial unscaled
/// `buy_a_sell_b_spread` / `buy_b_sell_a_spread` fields that no documented
/// consumer ever read (see DESIGN.md).
#[derive(Debug, Clone, Default)]
pub struct OrderBookPairState {
    pub pair_name: String,
    pub bid_price_a: f64,
    pub bid_volume_a: f64,
    pub ask_price_a: f64,
    pub ask_volume_a: f64,
    pub bid_price_b: f64,
    pub bid_volume_b: f64,
    pub ask_price_b: f64,
    pub ask_volume_b: f64,
    pub buy_a_sell_b_spread_pct: f64,
    pub buy_b_sell_a_spread_pct: f64,
    pub spread_pct: f64,
    pub elapsed_time_a_ms: f64,
    pub elapsed_time_b_ms: f64,
}

impl SpreadState for OrderBookPairState {
    fn pair_name(&self) -> &str {
        &self.pair_name
    }
    fn set_pair_name(&mut self, name: String) {
        self.pair_name = name;
    }
    fn spread_pct(&self) -> f64 {
        self.spread_pct
    }
}

pub struct PairTable<S: SpreadState> {
    entries: RwLock<HashMap<String, Arc<Mutex<S>>>>,
}

impl<S: SpreadState> Default for PairTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SpreadState> PairTable<S> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Creates the default state if missing, then applies `patch` in place.
    /// A pair is never removed once created.
    pub fn upsert(&self, pair_name: &str, patch: impl FnOnce(&mut S)) {
        if let Some(entry) = self.entries.read().get(pair_name) {
            patch(&mut entry.lock());
            return;
        }

        let entry = {
            let mut map = self.entries.write();
            map.entry(pair_name.to_string())
                .or_insert_with(|| {
                    let mut state = S::default();
                    state.set_pair_name(pair_name.to_string());
                    Arc::new(Mutex::new(state))
                })
                .clone()
        };
        patch(&mut entry.lock());
    }

    /// Returns up to `n` states sorted by `spread_pct` descending, ties
    /// broken by `pair_name` ascending. Values are copies.
    pub fn snapshot_top(&self, n: usize) -> Vec<S> {
        let mut items: Vec<S> = self.entries.read().values().map(|e| e.lock().clone()).collect();
        items.sort_by(|a, b| {
            b.spread_pct()
                .partial_cmp(&a.spread_pct())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.pair_name().cmp(b.pair_name()))
        });
        items.truncate(n);
        items
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_creates_default_then_mutates() {
        let table: PairTable<TickerPairState> = PairTable::new();
        table.upsert("BTC-BTC", |s| s.price_a = 100.0);
        table.upsert("BTC-BTC", |s| s.price_b = 101.0);
        let top = table.snapshot_top(10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].price_a, 100.0);
        assert_eq!(top[0].price_b, 101.0);
    }

    #[test]
    fn snapshot_top_ranks_by_spread_pct_then_name() {
        let table: PairTable<TickerPairState> = PairTable::new();
        table.upsert("Z", |s| s.spread_pct = 0.5);
        table.upsert("A", |s| s.spread_pct = 0.5);
        table.upsert("M", |s| s.spread_pct = 0.9);
        let top = table.snapshot_top(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].pair_name, "M");
        assert_eq!(top[1].pair_name, "A");
    }

    #[test]
    fn snapshot_top_empty_when_no_updates() {
        let table: PairTable<TickerPairState> = PairTable::new();
        assert!(table.snapshot_top(5).is_empty());
    }

    #[test]
    fn never_deletes_a_pair_once_created() {
        let table: PairTable<TickerPairState> = PairTable::new();
        table.upsert("X", |s| s.price_a = 1.0);
        table.upsert("X", |_| {});
        assert_eq!(table.len(), 1);
    }
}
