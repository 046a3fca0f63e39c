//! Stock price abstractions and core types

use crate::core::config::TrackedStock;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Closing price of a stock on its most recent trading day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockObservation {
    pub date: NaiveDate,
    pub stock_code: String,
    pub stock_name: String,
    pub close_price: Decimal,
}

#[async_trait]
pub trait StockPriceProvider: Send + Sync {
    async fn latest_close(&self, stock: &TrackedStock) -> Result<StockObservation>;
}
