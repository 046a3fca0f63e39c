//! Currency conversion abstractions

use crate::core::config::TrackedConversion;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

/// A real-time exchange rate: one unit of `from_currency` costs `rate`
/// units of `to_currency`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeObservation {
    pub observed_at: DateTime<FixedOffset>,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
}

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn latest_rate(&self, conversion: &TrackedConversion) -> Result<ExchangeObservation>;
}
