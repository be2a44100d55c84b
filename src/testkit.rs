//! Deterministic, network-free `ExchangeClient` double. This is the harness
//! the end-to-end scenarios in spec.md §8 run against, and also what
//! `main.rs` wires up in the absence of a real venue adapter (out of scope
//! per spec.md §1 — any concrete adapter satisfies the same trait).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::exchange_client::{ExchangeClient, InstrumentMeta, OrderBookUpdate, TickerUpdate};

/// One scripted step of `watch_tickers`: either a batch to deliver, or a
/// simulated transient error.
pub enum ScriptedTickers {
    Batch(HashMap<String, TickerUpdate>),
    Error,
}

/// One scripted step of `watch_order_book_for_symbols`.
pub enum ScriptedOrderBook {
    Update(OrderBookUpdate),
    Error,
}

pub struct FakeExchangeClient {
    venue: String,
    markets: HashMap<String, InstrumentMeta>,
    server_time_offset_ms: AtomicI64,
    ticker_script: Mutex<VecDeque<ScriptedTickers>>,
    orderbook_script: Mutex<VecDeque<ScriptedOrderBook>>,
    last_ticker_batch: Mutex<Option<HashMap<String, TickerUpdate>>>,
    repeat_last: bool,
    close_calls: AtomicU32,
}

impl FakeExchangeClient {
    pub fn new(venue: &str, markets: HashMap<String, InstrumentMeta>) -> Self {
        Self {
            venue: venue.to_string(),
            markets,
            server_time_offset_ms: AtomicI64::new(0),
            ticker_script: Mutex::new(VecDeque::new()),
            orderbook_script: Mutex::new(VecDeque::new()),
            last_ticker_batch: Mutex::new(None),
            repeat_last: false,
            close_calls: AtomicU32::new(0),
        }
    }

    /// When the scripted queue runs dry, keep re-delivering the last batch
    /// (with a fresh timestamp) instead of idling forever. Used by `main.rs`
    /// so the demo binary has something to show continuously.
    pub fn repeating(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    pub fn with_server_time_offset_ms(self, offset_ms: i64) -> Self {
        self.server_time_offset_ms.store(offset_ms, Ordering::SeqCst);
        self
    }

    pub fn push_ticker_batch(&self, batch: HashMap<String, TickerUpdate>) {
        self.ticker_script.lock().push_back(ScriptedTickers::Batch(batch));
    }

    pub fn push_ticker_error(&self) {
        self.ticker_script.lock().push_back(ScriptedTickers::Error);
    }

    pub fn push_order_book(&self, update: OrderBookUpdate) {
        self.orderbook_script.lock().push_back(ScriptedOrderBook::Update(update));
    }

    pub fn push_order_book_error(&self) {
        self.orderbook_script.lock().push_back(ScriptedOrderBook::Error);
    }

    pub fn close_call_count(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl ExchangeClient for FakeExchangeClient {
    fn name(&self) -> &str {
        &self.venue
    }

    async fn load_markets(&self) -> anyhow::Result<HashMap<String, InstrumentMeta>> {
        Ok(self.markets.clone())
    }

    async fn fetch_time(&self) -> anyhow::Result<i64> {
        Ok(Self::now_ms() + self.server_time_offset_ms.load(Ordering::SeqCst))
    }

    async fn watch_tickers(&self, _symbols: &[String]) -> anyhow::Result<HashMap<String, TickerUpdate>> {
        loop {
            let next = self.ticker_script.lock().pop_front();
            match next {
                Some(ScriptedTickers::Batch(batch)) => {
                    *self.last_ticker_batch.lock() = Some(batch.clone());
                    return Ok(batch);
                }
                Some(ScriptedTickers::Error) => {
                    return Err(anyhow::anyhow!("simulated transient ticker stream error"));
                }
                None => {
                    if self.repeat_last {
                        if let Some(batch) = self.last_ticker_batch.lock().clone() {
                            let refreshed: HashMap<String, TickerUpdate> = batch
                                .into_iter()
                                .map(|(symbol, tick)| {
                                    (symbol, TickerUpdate { last: tick.last, timestamp_ms: Self::now_ms() })
                                })
                                .collect();
                            tokio::time::sleep(Duration::from_millis(250)).await;
                            return Ok(refreshed);
                        }
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }

    async fn watch_order_book_for_symbols(
        &self,
        _symbols: &[String],
        _limit: Option<u32>,
    ) -> anyhow::Result<OrderBookUpdate> {
        loop {
            let next = self.orderbook_script.lock().pop_front();
            match next {
                Some(ScriptedOrderBook::Update(update)) => return Ok(update),
                Some(ScriptedOrderBook::Error) => {
                    return Err(anyhow::anyhow!("simulated transient order book stream error"));
                }
                None => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
