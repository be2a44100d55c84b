//! Parses `exchange.type[.subtype]` descriptors (spec.md §4.1).

use std::str::FromStr;

use crate::error::AggregatorError;

/// A parsed venue market descriptor, e.g. `binance.spot` or `okx.swap.linear`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRef {
    pub exchange: String,
    pub r#type: String,
    pub subtype: Option<String>,
}

impl FromStr for MarketRef {
    type Err = AggregatorError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = spec.split('.').collect();
        match parts.as_slice() {
            [exchange, ty] => Ok(MarketRef {
                exchange: exchange.to_string(),
                r#type: ty.to_string(),
                subtype: None,
            }),
            [exchange, ty, subtype] => Ok(MarketRef {
                exchange: exchange.to_string(),
                r#type: ty.to_string(),
                subtype: Some(subtype.to_string()),
            }),
            _ => Err(AggregatorError::BadMarketSpec {
                spec: spec.to_string(),
            }),
        }
    }
}
