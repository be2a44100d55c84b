//! CLI / environment configuration surface (spec.md §6).

use clap::{Parser, ValueEnum};

use crate::symbol_resolver::SymbolSelector;

/// Which side of the market-data feed drives spread computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum MonitorPanel {
    Ticker,
    Orderbook,
}

/// Mirrors spec.md §6's CLI flags one-to-one; every flag also reads from
/// its matching environment variable, the `route_quality_monitor` binary's
/// convention for flags that double as env vars in long-running deployments.
#[derive(Debug, Clone, Parser)]
#[command(name = "spreadwatch", about = "Dual-venue streaming spread aggregator")]
pub struct Config {
    #[arg(long, value_enum, env = "MONITOR_PANEL", default_value_t = MonitorPanel::Ticker)]
    pub monitor_panel: MonitorPanel,

    #[arg(long, env = "MARKET_A", default_value = "binance.spot")]
    pub market_a: String,

    #[arg(long, env = "MARKET_B", default_value = "okx.swap.linear")]
    pub market_b: String,

    #[arg(long, env = "QUOTE_CURRENCY", default_value = "USDT")]
    pub quote_currency: String,

    /// Comma-separated `BASE-QUOTE` list. Overrides `quote_currency` when set
    /// (spec.md §4.3 rule 3, §8 P2).
    #[arg(long, env = "SYMBOLS")]
    pub symbols: Option<String>,

    #[arg(long, env = "TOPN", default_value_t = 20)]
    pub topn: usize,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Builds the `SymbolResolver` filter for this configuration. `symbols`
    /// takes precedence over `quote_currency` whenever both are present.
    pub fn selector(&self) -> SymbolSelector {
        match &self.symbols {
            Some(raw) => {
                let set = raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                SymbolSelector::Symbols(set)
            }
            None => SymbolSelector::QuoteCurrency(self.quote_currency.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn symbols_override_takes_precedence() {
        let cfg = Config {
            monitor_panel: MonitorPanel::Ticker,
            market_a: "binance.spot".into(),
            market_b: "okx.spot".into(),
            quote_currency: "USDT".into(),
            symbols: Some("BTC-USD, ETH-USD".into()),
            topn: 20,
            log_level: "info".into(),
        };
        match cfg.selector() {
            SymbolSelector::Symbols(set) => {
                assert_eq!(set, HashSet::from(["BTC-USD".to_string(), "ETH-USD".to_string()]))
            }
            _ => panic!("expected Symbols selector"),
        }
    }

    #[test]
    fn falls_back_to_quote_currency() {
        let cfg = Config {
            monitor_panel: MonitorPanel::Ticker,
            market_a: "binance.spot".into(),
            market_b: "okx.spot".into(),
            quote_currency: "USDT".into(),
            symbols: None,
            topn: 20,
            log_level: "info".into(),
        };
        match cfg.selector() {
            SymbolSelector::QuoteCurrency(q) => assert_eq!(q, "USDT"),
            _ => panic!("expected QuoteCurrency selector"),
        }
    }
}
