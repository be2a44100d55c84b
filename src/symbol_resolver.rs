//! Filters venue metadata by type/subtype/quote and constructs the
//! cross-venue pair set (spec.md §4.3).

use std::collections::{HashMap, HashSet};

use crate::error::AggregatorError;
use crate::exchange_client::InstrumentMeta;
use crate::market_ref::MarketRef;

/// Either an explicit quote-currency filter, or an explicit
/// `BASE-QUOTE` allow-list. Mutually exclusive, per spec.md §4.3 rule 3.
#[derive(Debug, Clone)]
pub enum SymbolSelector {
    QuoteCurrency(String),
    Symbols(HashSet<String>),
}

/// A common `(base, quote)` pair with the venue-A and venue-B instrument
/// symbols that belong to it.
#[derive(Debug, Clone)]
pub struct Pair {
    pub base: String,
    pub quote: String,
    pub symbols_a: Vec<String>,
    pub symbols_b: Vec<String>,
}

impl Pair {
    /// Enumerates every pair instance name (`"{symbol_a}-{symbol_b}"`) in
    /// this pair's Cartesian product.
    pub fn pair_instance_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.symbols_a.len() * self.symbols_b.len());
        for symbol_a in &self.symbols_a {
            for symbol_b in &self.symbols_b {
                names.push(format!("{symbol_a}-{symbol_b}"));
            }
        }
        names
    }
}

/// Routes inbound symbol updates to affected pair instances. Immutable once
/// built; requires no synchronization after `load_markets`.
#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    pub a: HashMap<String, Vec<String>>,
    pub b: HashMap<String, Vec<String>>,
}

fn matches_quote(meta: &InstrumentMeta, selector: &SymbolSelector) -> bool {
    match selector {
        SymbolSelector::QuoteCurrency(quote) => &meta.quote == quote,
        SymbolSelector::Symbols(symbols) => symbols.contains(&format!("{}-{}", meta.base, meta.quote)),
    }
}

fn filter_instruments(
    markets: &HashMap<String, InstrumentMeta>,
    market_ref: &MarketRef,
    selector: &SymbolSelector,
) -> HashMap<(String, String), Vec<String>> {
    let mut grouped: HashMap<(String, String), Vec<String>> = HashMap::new();
    for meta in markets.values() {
        if meta.r#type != market_ref.r#type {
            continue;
        }
        if let Some(subtype) = &market_ref.subtype {
            if !*meta.flags.get(subtype).unwrap_or(&false) {
                continue;
            }
        }
        if !matches_quote(meta, selector) {
            continue;
        }
        grouped
            .entry((meta.base.clone(), meta.quote.clone()))
            .or_default()
            .push(meta.symbol.clone());
    }
    grouped
}

/// Filters both venues' metadata, intersects on `(base, quote)`, and builds
/// the [`SymbolMap`] from the Cartesian product of each side.
pub fn resolve(
    market_a: &MarketRef,
    market_b: &MarketRef,
    markets_a: &HashMap<String, InstrumentMeta>,
    markets_b: &HashMap<String, InstrumentMeta>,
    selector: &SymbolSelector,
) -> Result<(SymbolMap, Vec<Pair>), AggregatorError> {
    let grouped_a = filter_instruments(markets_a, market_a, selector);
    let grouped_b = filter_instruments(markets_b, market_b, selector);

    let common_keys: HashSet<(String, String)> = grouped_a
        .keys()
        .cloned()
        .collect::<HashSet<_>>()
        .intersection(&grouped_b.keys().cloned().collect::<HashSet<_>>())
        .cloned()
        .collect();

    let pairs: Vec<Pair> = common_keys
        .into_iter()
        .map(|(base, quote)| Pair {
            symbols_a: grouped_a[&(base.clone(), quote.clone())].clone(),
            symbols_b: grouped_b[&(base.clone(), quote.clone())].clone(),
            base,
            quote,
        })
        .collect();

    if pairs.is_empty() {
        return Err(AggregatorError::NoCommonPairs {
            market_a: format!("{}.{}", market_a.exchange, market_a.r#type),
            market_b: format!("{}.{}", market_b.exchange, market_b.r#type),
        });
    }

    let mut symbol_map = SymbolMap::default();
    for pair in &pairs {
        for symbol_a in &pair.symbols_a {
            for symbol_b in &pair.symbols_b {
                let pair_name = format!("{symbol_a}-{symbol_b}");
                symbol_map.a.entry(symbol_a.clone()).or_default().push(pair_name.clone());
                symbol_map.b.entry(symbol_b.clone()).or_default().push(pair_name);
            }
        }
    }

    Ok((symbol_map, pairs))
}
