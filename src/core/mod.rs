//! Core business logic abstractions

pub mod batch;
pub mod config;
pub mod currency;
pub mod export;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use currency::{ExchangeObservation, ExchangeRateProvider};
pub use quote::{StockObservation, StockPriceProvider};
