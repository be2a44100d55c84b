//! Dual-venue streaming spread aggregator: symbol discovery, clock-skew
//! correction, and ranked top-N divergence tracking across two crypto
//! venues. See each module for its slice of the design.

pub mod aggregator;
pub mod clock_sync;
pub mod config;
pub mod error;
pub mod exchange_client;
pub mod market_ref;
pub mod pair_table;
pub mod spread_engine;
pub mod stream_supervisor;
pub mod symbol_resolver;
pub mod testkit;

pub use aggregator::{AggregatorFacade, Snapshot};
pub use config::Config;
pub use error::AggregatorError;
