//! Launches batched subscription tasks per venue; restarts on transient
//! error; cancels cleanly (spec.md §4.5, §5).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock_sync::{self, ClockTable};
use crate::exchange_client::ExchangeClient;
use crate::pair_table::{OrderBookPairState, PairTable, Side, TickerPairState};
use crate::spread_engine;

/// Symbols are partitioned into batches of at most this many per
/// subscription task, chosen to stay within typical venue per-subscription
/// limits.
pub const BATCH_SIZE: usize = 50;

fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

fn batches(symbols: &[String]) -> Vec<Vec<String>> {
    symbols.chunks(BATCH_SIZE).map(|c| c.to_vec()).collect()
}

/// Number of batches `⌈n/BATCH_SIZE⌉` a side with `n` symbols splits into.
pub fn batch_count(n: usize) -> usize {
    batches(&vec![String::new(); n]).len()
}

/// Owns every spawned task's [`JoinHandle`] and guarantees joined shutdown.
pub struct StreamSupervisor {
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    handles: SyncMutex<Vec<JoinHandle<()>>>,
}

impl Default for StreamSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSupervisor {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            handles: SyncMutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn mark_running(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn push(&self, handle: JoinHandle<()>) {
        self.handles.lock().push(handle);
    }

    pub fn spawn_clock_sync(&self, venue: String, client: Arc<dyn ExchangeClient>, table: Arc<ClockTable>) {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            clock_sync::run(venue, client, table, cancel).await;
        });
        self.push(handle);
    }

    /// Spawns one long-running ticker worker per batch of `symbols`.
    pub fn spawn_ticker_workers(
        &self,
        client: Arc<dyn ExchangeClient>,
        side: Side,
        symbols: Vec<String>,
        side_symbol_map: Arc<HashMap<String, Vec<String>>>,
        table: Arc<PairTable<TickerPairState>>,
        clocks: Arc<ClockTable>,
    ) {
        for batch in batches(&symbols) {
            let client = client.clone();
            let side_symbol_map = side_symbol_map.clone();
            let table = table.clone();
            let clocks = clocks.clone();
            let cancel = self.cancel.clone();
            let venue = client.name().to_lowercase();

            let handle = tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let update = tokio::select! {
                        _ = cancel.cancelled() => return,
                        result = client.watch_tickers(&batch) => result,
                    };
                    match update {
                        Ok(updates) => {
                            let time_diff = clocks.get(&venue).time_diff_ms;
                            spread_engine::on_ticker_update(&table, &side_symbol_map, side, updates, time_diff, now_ms());
                        }
                        Err(error) => {
                            warn!(venue = %venue, ?side, %error, "ticker stream error, backing off 5s");
                            tokio::select! {
                                _ = cancel.cancelled() => return,
                                _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                            }
                        }
                    }
                }
            });
            self.push(handle);
        }
    }

    /// Spawns one long-running order-book worker per batch of `symbols`.
    pub fn spawn_orderbook_workers(
        &self,
        client: Arc<dyn ExchangeClient>,
        side: Side,
        symbols: Vec<String>,
        side_symbol_map: Arc<HashMap<String, Vec<String>>>,
        table: Arc<PairTable<OrderBookPairState>>,
        clocks: Arc<ClockTable>,
    ) {
        for batch in batches(&symbols) {
            let client = client.clone();
            let side_symbol_map = side_symbol_map.clone();
            let table = table.clone();
            let clocks = clocks.clone();
            let cancel = self.cancel.clone();
            let venue = client.name().to_lowercase();
            let limit = spread_engine::depth_for_venue(&venue);

            let handle = tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let update = tokio::select! {
                        _ = cancel.cancelled() => return,
                        result = client.watch_order_book_for_symbols(&batch, limit) => result,
                    };
                    match update {
                        Ok(update) => {
                            let time_diff = clocks.get(&venue).time_diff_ms;
                            spread_engine::on_orderbook_update(&table, &side_symbol_map, side, update, time_diff, now_ms());
                        }
                        Err(error) => {
                            warn!(venue = %venue, ?side, %error, "order book stream error, backing off 5s");
                            tokio::select! {
                                _ = cancel.cancelled() => return,
                                _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                            }
                        }
                    }
                }
            });
            self.push(handle);
        }
    }

    /// Signals `running=false`, cancels every worker, awaits their
    /// termination ignoring join errors, then closes both clients exactly
    /// once. Safe to call from any state, idempotent if called twice.
    pub async fn stop(&self, clients: [Arc<dyn ExchangeClient>; 2]) {
        self.running.store(false, Ordering::SeqCst);
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        for client in clients {
            if let Err(error) = client.close().await {
                debug!(venue = %client.name(), %error, "close() returned an error during shutdown");
            }
        }
    }
}
