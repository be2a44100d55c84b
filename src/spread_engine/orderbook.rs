use std::collections::HashMap;

use crate::exchange_client::OrderBookUpdate;
use crate::pair_table::{OrderBookPairState, PairTable, Side};

/// Applies a delivered order book update for one side to the affected
/// pairs (spec.md §4.7).
pub fn on_orderbook_update(
    table: &PairTable<OrderBookPairState>,
    side_symbol_map: &HashMap<String, Vec<String>>,
    side: Side,
    update: OrderBookUpdate,
    time_diff_ms: f64,
    now_ms: f64,
) {
    let Some(pair_names) = side_symbol_map.get(&update.symbol) else {
        return;
    };

    let best_bid = update.bids.first().copied();
    let best_ask = update.asks.first().copied();
    let elapsed = now_ms - (update.timestamp_ms as f64 + time_diff_ms);

    for pair_name in pair_names {
        table.upsert(pair_name, |state| {
            if let Some((price, volume)) = best_bid {
                match side {
                    Side::A => {
                        state.bid_price_a = price;
                        state.bid_volume_a = volume;
                    }
                    Side::B => {
                        state.bid_price_b = price;
                        state.bid_volume_b = volume;
                    }
                }
            }
            if let Some((price, volume)) = best_ask {
                match side {
                    Side::A => {
                        state.ask_price_a = price;
                        state.ask_volume_a = volume;
                    }
                    Side::B => {
                        state.ask_price_b = price;
                        state.ask_volume_b = volume;
                    }
                }
            }
            match side {
                Side::A => state.elapsed_time_a_ms = elapsed,
                Side::B => state.elapsed_time_b_ms = elapsed,
            }
            recompute_spread(state);
        });
    }
}

fn recompute_spread(state: &mut OrderBookPairState) {
    if state.ask_price_a == 0.0
        || state.bid_price_a == 0.0
        || state.ask_price_b == 0.0
        || state.bid_price_b == 0.0
    {
        return;
    }

    let buy_b_sell_a_pct = (state.bid_price_a - state.ask_price_b) / state.ask_price_b;
    let buy_a_sell_b_pct = (state.bid_price_b - state.ask_price_a) / state.ask_price_a;

    state.buy_b_sell_a_spread_pct = buy_b_sell_a_pct;
    state.buy_a_sell_b_spread_pct = buy_a_sell_b_pct;
    state.spread_pct = buy_b_sell_a_pct.max(buy_a_sell_b_pct);
}
