//! Periodically estimates per-venue clock offset to local wall time
//! (spec.md §4.2).
//!
//! `time_diff_ms` is the signed local-minus-remote offset: treating it this
//! way lets the engine compute tick freshness as
//! `now_ms - (tick_server_ts + time_diff)`, approximating the latency from
//! the venue's event time to the observer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::exchange_client::ExchangeClient;

const SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// Latency and clock-offset estimate for one venue. Defaults to 0 when
/// unknown (no successful sync yet).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VenueClock {
    pub latency_ms: f64,
    pub time_diff_ms: f64,
}

/// Shared, lock-guarded table of the latest [`VenueClock`] per venue name
/// (case-folded to lower). Read by stream workers on every update, written
/// only by [`run`].
#[derive(Debug, Default)]
pub struct ClockTable {
    clocks: RwLock<HashMap<String, VenueClock>>,
}

impl ClockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, venue: &str) -> VenueClock {
        self.clocks.read().get(venue).copied().unwrap_or_default()
    }

    fn set(&self, venue: &str, clock: VenueClock) {
        self.clocks.write().insert(venue.to_string(), clock);
    }
}

fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Runs the clock-sync loop for one venue until `cancel` fires. Cancellation
/// is observed promptly between sleeps (and cannot land mid-fetch, since
/// `fetch_time` is awaited to completion either way).
pub async fn run(venue: String, client: Arc<dyn ExchangeClient>, table: Arc<ClockTable>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let t0 = now_ms();
        match client.fetch_time().await {
            Ok(server_ms) => {
                let t1 = now_ms();
                let rtt = t1 - t0;
                let latency = rtt / 2.0;
                let time_diff = t1 - (server_ms as f64 + latency);
                table.set(&venue, VenueClock { latency_ms: latency, time_diff_ms: time_diff });
                debug!(venue = %venue, latency_ms = latency, time_diff_ms = time_diff, "clock sync updated");
            }
            Err(error) => {
                warn!(venue = %venue, %error, "fetch_time failed, retaining previous offset");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(SYNC_INTERVAL) => {}
        }
    }
}
