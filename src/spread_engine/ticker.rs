use std::collections::HashMap;

use tracing::warn;

use crate::exchange_client::TickerUpdate;
use crate::pair_table::{PairTable, Side, TickerPairState};

/// Applies a delivered `{symbol -> ticker}` batch for one side to the
/// affected pairs (spec.md §4.6).
pub fn on_ticker_update(
    table: &PairTable<TickerPairState>,
    side_symbol_map: &HashMap<String, Vec<String>>,
    side: Side,
    updates: HashMap<String, TickerUpdate>,
    time_diff_ms: f64,
    now_ms: f64,
) {
    for (symbol, ticker) in updates {
        let Some(pair_names) = side_symbol_map.get(&symbol) else {
            continue;
        };

        if !ticker.last.is_finite() {
            warn!(symbol = %symbol, "non-numeric ticker price, skipping");
            continue;
        }

        let elapsed = now_ms - (ticker.timestamp_ms as f64 + time_diff_ms);

        for pair_name in pair_names {
            table.upsert(pair_name, |state| {
                match side {
                    Side::A => {
                        state.price_a = ticker.last;
                        state.elapsed_time_a_ms = elapsed;
                    }
                    Side::B => {
                        state.price_b = ticker.last;
                        state.elapsed_time_b_ms = elapsed;
                    }
                }
                recompute_spread(state);
            });
        }
    }
}

fn recompute_spread(state: &mut TickerPairState) {
    if state.price_a == 0.0 || state.price_b == 0.0 {
        return;
    }
    let min_price = state.price_a.min(state.price_b);
    if min_price == 0.0 || !min_price.is_finite() {
        return;
    }
    let spread = (state.price_a - state.price_b).abs();
    state.spread = spread;
    state.spread_pct = spread / min_price;
}
