//! Lifecycle facade tying every component together (spec.md §4.8).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::clock_sync::ClockTable;
use crate::config::{Config, MonitorPanel};
use crate::error::AggregatorError;
use crate::exchange_client::ExchangeClient;
use crate::market_ref::MarketRef;
use crate::pair_table::{OrderBookPairState, PairTable, Side, TickerPairState};
use crate::stream_supervisor::StreamSupervisor;
use crate::symbol_resolver::{self, SymbolMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    New,
    Loaded,
    Running,
    Stopped,
}

/// The two table shapes `AggregatorFacade` can drive, selected once at
/// construction from `Config::monitor_panel`.
enum Tables {
    Ticker(Arc<PairTable<TickerPairState>>),
    OrderBook(Arc<PairTable<OrderBookPairState>>),
}

/// A `top(n)` result, shaped by whichever mode the facade was built in.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Ticker(Vec<TickerPairState>),
    OrderBook(Vec<OrderBookPairState>),
}

/// Owns both venue clients, the discovered symbol map, the pair table, the
/// clock table, and the supervisor. `new` takes a [`Config`] value rather
/// than raw strings so tests can construct it hermetically (spec.md §9).
pub struct AggregatorFacade {
    market_a: MarketRef,
    market_b: MarketRef,
    client_a: Arc<dyn ExchangeClient>,
    client_b: Arc<dyn ExchangeClient>,
    selector: crate::symbol_resolver::SymbolSelector,
    state: Mutex<State>,
    symbol_map: RwLock<Option<SymbolMap>>,
    clocks: Arc<ClockTable>,
    tables: Tables,
    supervisor: StreamSupervisor,
}

impl AggregatorFacade {
    /// Parses both market descriptors eagerly: a malformed spec is a
    /// construction-time configuration error, not a `load_markets` one.
    pub fn new(
        config: &Config,
        client_a: Arc<dyn ExchangeClient>,
        client_b: Arc<dyn ExchangeClient>,
    ) -> Result<Self, AggregatorError> {
        let market_a: MarketRef = config.market_a.parse()?;
        let market_b: MarketRef = config.market_b.parse()?;
        let tables = match config.monitor_panel {
            MonitorPanel::Ticker => Tables::Ticker(Arc::new(PairTable::new())),
            MonitorPanel::Orderbook => Tables::OrderBook(Arc::new(PairTable::new())),
        };

        Ok(Self {
            market_a,
            market_b,
            client_a,
            client_b,
            selector: config.selector(),
            state: Mutex::new(State::New),
            symbol_map: RwLock::new(None),
            clocks: Arc::new(ClockTable::new()),
            tables,
            supervisor: StreamSupervisor::new(),
        })
    }

    /// Loads both venues' metadata and resolves the common pair set. A
    /// filter producing zero common pairs is fatal (spec.md §7).
    pub async fn load_markets(&self) -> Result<(), AggregatorError> {
        let markets_a = self
            .client_a
            .load_markets()
            .await
            .map_err(|source| AggregatorError::ExchangeLoadFailed {
                venue: self.client_a.name().to_string(),
                source,
            })?;
        let markets_b = self
            .client_b
            .load_markets()
            .await
            .map_err(|source| AggregatorError::ExchangeLoadFailed {
                venue: self.client_b.name().to_string(),
                source,
            })?;

        let (symbol_map, _pairs) =
            symbol_resolver::resolve(&self.market_a, &self.market_b, &markets_a, &markets_b, &self.selector)?;

        *self.symbol_map.write() = Some(symbol_map);
        *self.state.lock() = State::Loaded;
        Ok(())
    }

    /// Spawns two `ClockSync` tasks and `2 + ⌈A/50⌉ + ⌈B/50⌉` stream
    /// workers total. A no-op if called before `load_markets` or while
    /// already running, per spec.md §4.8's "must never spawn duplicate
    /// workers" requirement.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if *state != State::Loaded {
            warn!(?state, "start() ignored: not in the Loaded state");
            return;
        }
        *state = State::Running;
        drop(state);

        let symbol_map = self
            .symbol_map
            .read()
            .clone()
            .expect("State::Loaded implies symbol_map is set");

        self.supervisor.mark_running();
        self.supervisor
            .spawn_clock_sync(self.client_a.name().to_lowercase(), self.client_a.clone(), self.clocks.clone());
        self.supervisor
            .spawn_clock_sync(self.client_b.name().to_lowercase(), self.client_b.clone(), self.clocks.clone());

        let symbols_a: Vec<String> = symbol_map.a.keys().cloned().collect();
        let symbols_b: Vec<String> = symbol_map.b.keys().cloned().collect();
        let side_map_a: Arc<HashMap<String, Vec<String>>> = Arc::new(symbol_map.a);
        let side_map_b: Arc<HashMap<String, Vec<String>>> = Arc::new(symbol_map.b);

        match &self.tables {
            Tables::Ticker(table) => {
                self.supervisor.spawn_ticker_workers(
                    self.client_a.clone(),
                    Side::A,
                    symbols_a,
                    side_map_a,
                    table.clone(),
                    self.clocks.clone(),
                );
                self.supervisor.spawn_ticker_workers(
                    self.client_b.clone(),
                    Side::B,
                    symbols_b,
                    side_map_b,
                    table.clone(),
                    self.clocks.clone(),
                );
            }
            Tables::OrderBook(table) => {
                self.supervisor.spawn_orderbook_workers(
                    self.client_a.clone(),
                    Side::A,
                    symbols_a,
                    side_map_a,
                    table.clone(),
                    self.clocks.clone(),
                );
                self.supervisor.spawn_orderbook_workers(
                    self.client_b.clone(),
                    Side::B,
                    symbols_b,
                    side_map_b,
                    table.clone(),
                    self.clocks.clone(),
                );
            }
        }
    }

    /// Safe to call from any state. Cancels every worker, awaits their
    /// termination, then closes both clients exactly once.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            if *state == State::Stopped {
                return;
            }
            *state = State::Stopped;
        }
        self.supervisor.stop([self.client_a.clone(), self.client_b.clone()]).await;
    }

    /// May be called in any state; returns an empty snapshot before the
    /// first update lands.
    pub fn top(&self, n: usize) -> Snapshot {
        match &self.tables {
            Tables::Ticker(table) => Snapshot::Ticker(table.snapshot_top(n)),
            Tables::OrderBook(table) => Snapshot::OrderBook(table.snapshot_top(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange_client::{InstrumentMeta, TickerUpdate};
    use crate::testkit::FakeExchangeClient;

    fn meta(symbol: &str, base: &str, quote: &str) -> InstrumentMeta {
        InstrumentMeta {
            symbol: symbol.to_string(),
            base: base.to_string(),
            quote: quote.to_string(),
            r#type: "spot".to_string(),
            flags: HashMap::new(),
        }
    }

    fn cfg() -> Config {
        Config {
            monitor_panel: MonitorPanel::Ticker,
            market_a: "a.spot".into(),
            market_b: "b.spot".into(),
            quote_currency: "USDT".into(),
            symbols: None,
            topn: 20,
            log_level: "info".into(),
        }
    }

    #[test]
    fn top_before_load_markets_is_empty() {
        let client_a = Arc::new(FakeExchangeClient::new("a", HashMap::new()));
        let client_b = Arc::new(FakeExchangeClient::new("b", HashMap::new()));
        let facade = AggregatorFacade::new(&cfg(), client_a, client_b).unwrap();
        match facade.top(10) {
            Snapshot::Ticker(items) => assert!(items.is_empty()),
            _ => panic!("expected ticker snapshot"),
        }
    }

    #[test]
    fn bad_market_spec_is_rejected_at_construction() {
        let mut config = cfg();
        config.market_a = "not-a-valid-spec".into();
        let client_a = Arc::new(FakeExchangeClient::new("a", HashMap::new()));
        let client_b = Arc::new(FakeExchangeClient::new("b", HashMap::new()));
        let err = AggregatorFacade::new(&config, client_a, client_b).unwrap_err();
        assert!(matches!(err, AggregatorError::BadMarketSpec { .. }));
    }

    #[tokio::test]
    async fn load_markets_with_no_common_pairs_errors() {
        let markets_a = [("BTC/USDT".to_string(), meta("BTC/USDT", "BTC", "USDT"))].into_iter().collect();
        let markets_b = [("ETH/USDT".to_string(), meta("ETH/USDT", "ETH", "USDT"))].into_iter().collect();
        let client_a = Arc::new(FakeExchangeClient::new("a", markets_a));
        let client_b = Arc::new(FakeExchangeClient::new("b", markets_b));
        let facade = AggregatorFacade::new(&cfg(), client_a, client_b).unwrap();
        let err = facade.load_markets().await.unwrap_err();
        assert!(matches!(err, AggregatorError::NoCommonPairs { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn end_to_end_ticker_convergence_from_scratch() {
        let markets_a = [("BTC/USDT".to_string(), meta("BTC/USDT", "BTC", "USDT"))].into_iter().collect();
        let markets_b = [("BTC/USDT".to_string(), meta("BTC/USDT", "BTC", "USDT"))].into_iter().collect();
        let client_a = Arc::new(FakeExchangeClient::new("a", markets_a));
        let client_b = Arc::new(FakeExchangeClient::new("b", markets_b));

        client_a.push_ticker_batch(
            [("BTC/USDT".to_string(), TickerUpdate { last: 100.0, timestamp_ms: 0 })].into_iter().collect(),
        );
        client_b.push_ticker_batch(
            [("BTC/USDT".to_string(), TickerUpdate { last: 100.0, timestamp_ms: 0 })].into_iter().collect(),
        );

        let facade = AggregatorFacade::new(&cfg(), client_a, client_b).unwrap();

        facade.load_markets().await.unwrap();
        facade.start();

        let mut last = Snapshot::Ticker(vec![]);
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            last = facade.top(1);
            if let Snapshot::Ticker(items) = &last {
                if !items.is_empty() && items[0].price_a != 0.0 && items[0].price_b != 0.0 {
                    break;
                }
            }
        }
        match last {
            Snapshot::Ticker(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].price_a, 100.0);
                assert_eq!(items[0].price_b, 100.0);
                assert_eq!(items[0].spread_pct, 0.0);
            }
            _ => panic!("expected ticker snapshot"),
        }

        facade.stop().await;
    }
}
