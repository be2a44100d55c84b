//! Typed configuration errors surfaced to callers of [`crate::aggregator`].
//!
//! Per-worker failures (transient stream errors, clock-sync fetch failures,
//! compute errors) are never modeled as `AggregatorError` — they are logged
//! and absorbed where they occur, since the monitor's value is continuity
//! of the best-available view, not strict error propagation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error(
        "bad market spec {spec:?}: expected <exchange>.<type> or <exchange>.<type>.<subtype>"
    )]
    BadMarketSpec { spec: String },

    #[error("no common (base, quote) pairs between {market_a} and {market_b} for the given filter")]
    NoCommonPairs { market_a: String, market_b: String },

    #[error("failed to load markets from {venue}: {source}")]
    ExchangeLoadFailed {
        venue: String,
        #[source]
        source: anyhow::Error,
    },
}
