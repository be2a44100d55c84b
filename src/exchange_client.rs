//! The `ExchangeClient` capability consumed from the external venue library
//! (spec.md §6). The venue adapter itself — WebSocket framing, REST
//! market-metadata fetch, rate-limit handling — is out of scope; this crate
//! only defines the seam and a deterministic test double for it.

use std::collections::HashMap;

use async_trait::async_trait;

/// Metadata for one tradable instrument on a venue, as returned by
/// `load_markets`.
#[derive(Debug, Clone)]
pub struct InstrumentMeta {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub r#type: String,
    /// Boolean attributes keyed by subtype name, e.g. `linear`, `inverse`.
    pub flags: HashMap<String, bool>,
}

/// A last-trade ticker update for one symbol.
#[derive(Debug, Clone, Copy)]
pub struct TickerUpdate {
    pub last: f64,
    pub timestamp_ms: i64,
}

/// A top-of-book (or deeper) order book snapshot for one symbol.
#[derive(Debug, Clone)]
pub struct OrderBookUpdate {
    pub symbol: String,
    /// `(price, volume)`, best first.
    pub bids: Vec<(f64, f64)>,
    /// `(price, volume)`, best first.
    pub asks: Vec<(f64, f64)>,
    pub timestamp_ms: i64,
}

/// Capability consumed from the external venue library. Concrete venue
/// adapters (Binance, OKX, Bybit, ...) satisfy this; this crate never
/// implements one itself.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Venue identifier, case-folded to lower for table lookup.
    fn name(&self) -> &str;

    async fn load_markets(&self) -> anyhow::Result<HashMap<String, InstrumentMeta>>;

    /// Venue wall-clock time in milliseconds.
    async fn fetch_time(&self) -> anyhow::Result<i64>;

    /// Awaits the next batch of ticker updates for the given symbols.
    async fn watch_tickers(
        &self,
        symbols: &[String],
    ) -> anyhow::Result<HashMap<String, TickerUpdate>>;

    /// Awaits the next order book update across the given symbols.
    async fn watch_order_book_for_symbols(
        &self,
        symbols: &[String],
        limit: Option<u32>,
    ) -> anyhow::Result<OrderBookUpdate>;

    async fn close(&self) -> anyhow::Result<()>;
}
