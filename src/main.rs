//! Spreadwatch CLI binary. Wires up the aggregator, an `ExchangeClient` for
//! each configured venue, and prints a refreshing plain-text table of the
//! most divergent pairs until interrupted.
//!
//! A real venue adapter (Binance/OKX/Bybit WebSocket + REST) is out of
//! scope for this crate (spec.md §1) — any type implementing
//! `ExchangeClient` plugs into the same aggregator, so this binary wires up
//! `testkit::FakeExchangeClient` in a continuously-repeating demo mode
//! purely so it is runnable end-to-end.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use spreadwatch::aggregator::Snapshot;
use spreadwatch::config::Config;
use spreadwatch::exchange_client::{ExchangeClient, InstrumentMeta, TickerUpdate};
use spreadwatch::testkit::FakeExchangeClient;
use spreadwatch::AggregatorFacade;

fn init_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(true).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Builds a demo `ExchangeClient` seeded with one `BASE/USDT` instrument per
/// configured venue and a single looping ticker batch, so the binary has
/// something to display without a live network connection.
fn demo_client(venue: &str) -> Arc<dyn ExchangeClient> {
    let symbol = "BTC/USDT".to_string();
    let mut markets = std::collections::HashMap::new();
    markets.insert(
        symbol.clone(),
        InstrumentMeta {
            symbol: symbol.clone(),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            r#type: "spot".to_string(),
            flags: std::collections::HashMap::new(),
        },
    );
    let client = FakeExchangeClient::new(venue, markets).repeating();
    client.push_ticker_batch([(symbol, TickerUpdate { last: 100.0, timestamp_ms: 0 })].into_iter().collect());
    Arc::new(client)
}

fn render_table(snapshot: &Snapshot) {
    match snapshot {
        Snapshot::Ticker(rows) => {
            println!("{:<32} {:>12} {:>12} {:>10}", "pair", "price_a", "price_b", "spread_pct");
            for row in rows {
                println!("{:<32} {:>12.4} {:>12.4} {:>9.4}%", row.pair_name, row.price_a, row.price_b, row.spread_pct * 100.0);
            }
        }
        Snapshot::OrderBook(rows) => {
            println!("{:<32} {:>10} {:>10} {:>10} {:>10} {:>10}", "pair", "bid_a", "ask_a", "bid_b", "ask_b", "spread_pct");
            for row in rows {
                println!(
                    "{:<32} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>9.4}%",
                    row.pair_name, row.bid_price_a, row.ask_price_a, row.bid_price_b, row.ask_price_b, row.spread_pct * 100.0
                );
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_logging(&config.log_level);

    info!(market_a = %config.market_a, market_b = %config.market_b, panel = ?config.monitor_panel, "starting spreadwatch");

    let client_a = demo_client("binance");
    let client_b = demo_client("okx");

    let facade = match AggregatorFacade::new(&config, client_a, client_b) {
        Ok(facade) => facade,
        Err(error) => {
            error!(%error, "invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(error) = facade.load_markets().await {
        error!(%error, "failed to load markets");
        std::process::exit(1);
    }

    facade.start();

    let topn = config.topn;
    let monitor_panel = config.monitor_panel;
    let print_loop = async {
        let mut ticks = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticks.tick().await;
            let snapshot = facade.top(topn);
            println!("\n--- top {} ({:?}) ---", topn, monitor_panel);
            render_table(&snapshot);
        }
    };

    tokio::select! {
        _ = print_loop => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    facade.stop().await;
    std::process::exit(0);
}
