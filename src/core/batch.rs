//! Runs a provider over every configured entry and keeps the per-entry outcome.
use crate::core::config::{Entries, TrackedConversion, TrackedStock};
use crate::core::currency::{ExchangeObservation, ExchangeRateProvider};
use crate::core::quote::{StockObservation, StockPriceProvider};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// The result of fetching a single configured entry.
#[derive(Debug)]
pub struct EntryOutcome<T> {
    pub key: String,
    pub label: String,
    pub result: Result<T>,
}

/// One outcome per configured entry, in configuration order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub outcomes: Vec<EntryOutcome<T>>,
}

impl<T> BatchReport<T> {
    /// Successful observations only. Failed entries have no row.
    pub fn rows(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&EntryOutcome<T>, &anyhow::Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }

    pub fn succeeded(&self) -> usize {
        self.rows().count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

async fn fetch_all<'a, E, T, F, Fut>(
    kind: &str,
    entries: &'a Entries<E>,
    concurrency: usize,
    on_progress: &(dyn Fn() + Sync),
    fetch: F,
) -> BatchReport<T>
where
    E: Display + 'a,
    F: Fn(&'a E) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcomes: Vec<EntryOutcome<T>> = stream::iter(entries.iter())
        .map(|(key, entry)| {
            let fut = fetch(entry);
            async move {
                let result = fut.await;
                let label = entry.to_string();
                match &result {
                    Ok(_) => debug!(kind, key, %label, "Fetched entry"),
                    Err(e) => warn!(kind, key, %label, error = %e, "Skipping entry"),
                }
                on_progress();
                EntryOutcome {
                    key: key.to_string(),
                    label,
                    result,
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    BatchReport { outcomes }
}

/// Fetches the latest close of every tracked stock.
pub async fn fetch_stocks(
    stocks: &Entries<TrackedStock>,
    provider: &dyn StockPriceProvider,
    concurrency: usize,
    on_progress: &(dyn Fn() + Sync),
) -> BatchReport<StockObservation> {
    fetch_all("stock", stocks, concurrency, on_progress, |stock| {
        provider.latest_close(stock)
    })
    .await
}

/// Fetches the current rate of every tracked conversion.
pub async fn fetch_conversions(
    conversions: &Entries<TrackedConversion>,
    provider: &dyn ExchangeRateProvider,
    concurrency: usize,
    on_progress: &(dyn Fn() + Sync),
) -> BatchReport<ExchangeObservation> {
    fetch_all(
        "conversion",
        conversions,
        concurrency,
        on_progress,
        |conversion| provider.latest_rate(conversion),
    )
    .await
}
