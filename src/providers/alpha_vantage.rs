use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::config::{ApiKey, TrackedConversion, TrackedStock};
use crate::core::currency::{ExchangeObservation, ExchangeRateProvider};
use crate::core::quote::{StockObservation, StockPriceProvider};

const LAST_REFRESHED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Converts a provider UTC timestamp to the reporting offset.
pub fn to_reporting_time(utc: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&utc).with_timezone(&offset)
}

/// Builds a fixed offset from whole hours east of UTC.
pub fn offset_from_hours(hours: i32) -> Result<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| anyhow!("Invalid UTC offset: {} hours", hours))
}

pub struct AlphaVantageProvider {
    base_url: String,
    api_key: ApiKey,
    offset: FixedOffset,
    client: reqwest::Client,
}

impl AlphaVantageProvider {
    pub fn new(base_url: &str, api_key: ApiKey, offset: FixedOffset) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tickerfeed/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(AlphaVantageProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            offset,
            client,
        })
    }

    async fn query<T: DeserializeOwned>(&self, params: &[(&str, &str)], subject: &str) -> Result<T> {
        let mut all_params = params.to_vec();
        all_params.push(("apikey", self.api_key.expose()));
        let url = Url::parse_with_params(&format!("{}/query", self.base_url), &all_params)
            .with_context(|| format!("Invalid provider URL: {}", self.base_url))?;

        // The full URL carries the key, so only the parameters are logged
        debug!(?params, "Requesting {} from {}", subject, self.base_url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for {}", e.without_url(), subject))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for {}", response.status(), subject));
        }

        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response for {}: {}", subject, e.without_url()))?;

        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", subject, e))
    }
}

/// Messages the provider returns in place of data, e.g. when rate limited.
#[derive(Debug, Default, Deserialize)]
struct ProviderNotice {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

impl ProviderNotice {
    fn describe(&self) -> &str {
        self.error_message
            .as_deref()
            .or(self.note.as_deref())
            .or(self.information.as_deref())
            .unwrap_or("no error message")
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    #[serde(rename = "Realtime Currency Exchange Rate")]
    rate: Option<RealtimeRate>,
    #[serde(flatten)]
    notice: ProviderNotice,
}

#[derive(Debug, Deserialize)]
struct RealtimeRate {
    #[serde(rename = "5. Exchange Rate")]
    exchange_rate: String,
    #[serde(rename = "6. Last Refreshed")]
    last_refreshed: String,
    #[serde(rename = "7. Time Zone")]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<HashMap<String, DailyBar>>,
    #[serde(flatten)]
    notice: ProviderNotice,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: Option<String>,
}

fn parse_decimal(value: &str, what: &str, subject: &str) -> Result<Decimal> {
    value
        .trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid {what} '{value}' for {subject}"))
}

/// Picks the most recent trading day of a daily series that has a usable close.
fn latest_close(series: &HashMap<String, DailyBar>) -> Option<(NaiveDate, Decimal)> {
    series
        .iter()
        .filter_map(|(day, bar)| {
            let date = match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
                Ok(date) => date,
                Err(e) => {
                    debug!("Ignoring series key '{}': {}", day, e);
                    return None;
                }
            };
            let Some(close) = bar.close.as_deref() else {
                debug!("Ignoring bar {} without a close", day);
                return None;
            };
            match close.trim().parse::<Decimal>() {
                Ok(price) => Some((date, price)),
                Err(e) => {
                    debug!("Ignoring bar {} with close '{}': {}", day, close, e);
                    None
                }
            }
        })
        .max_by_key(|(date, _)| *date)
}

#[async_trait]
impl StockPriceProvider for AlphaVantageProvider {
    #[instrument(
        name = "AlphaVantageDailyFetch",
        skip(self),
        fields(symbol = %stock.code)
    )]
    async fn latest_close(&self, stock: &TrackedStock) -> Result<StockObservation> {
        let symbol = stock.code.as_str();
        let data: DailySeriesResponse = self
            .query(
                &[
                    ("function", "TIME_SERIES_DAILY"),
                    ("symbol", symbol),
                    ("outputsize", "compact"),
                ],
                symbol,
            )
            .await?;

        let series = data.series.ok_or_else(|| {
            anyhow!(
                "No daily time series found for {}: {}",
                symbol,
                data.notice.describe()
            )
        })?;

        let (date, close_price) = latest_close(&series)
            .ok_or_else(|| anyhow!("Daily time series for {} has no closing price", symbol))?;

        debug!(%date, %close_price, "Selected latest close");

        Ok(StockObservation {
            date,
            stock_code: stock.code.clone(),
            stock_name: stock.name.clone(),
            close_price,
        })
    }
}

#[async_trait]
impl ExchangeRateProvider for AlphaVantageProvider {
    #[instrument(
        name = "AlphaVantageRateFetch",
        skip(self),
        fields(pair = %conversion)
    )]
    async fn latest_rate(&self, conversion: &TrackedConversion) -> Result<ExchangeObservation> {
        let pair = conversion.to_string();
        let data: ExchangeRateResponse = self
            .query(
                &[
                    ("function", "CURRENCY_EXCHANGE_RATE"),
                    ("from_currency", conversion.from_currency.as_str()),
                    ("to_currency", conversion.to_currency.as_str()),
                ],
                &pair,
            )
            .await?;

        let payload = data.rate.ok_or_else(|| {
            anyhow!(
                "No exchange rate found for {}: {}",
                pair,
                data.notice.describe()
            )
        })?;

        let rate = parse_decimal(&payload.exchange_rate, "exchange rate", &pair)?;
        let refreshed =
            NaiveDateTime::parse_from_str(payload.last_refreshed.trim(), LAST_REFRESHED_FORMAT)
                .with_context(|| {
                    format!(
                        "Invalid refresh time '{}' for {}",
                        payload.last_refreshed, pair
                    )
                })?;
        if let Some(tz) = payload.time_zone.as_deref()
            && !tz.eq_ignore_ascii_case("UTC")
        {
            debug!("Provider reported time zone {} for {}, treating as UTC", tz, pair);
        }

        Ok(ExchangeObservation {
            observed_at: to_reporting_time(refreshed, self.offset),
            from_currency: conversion.from_currency.clone(),
            to_currency: conversion.to_currency.clone(),
            rate,
        })
    }
}
