//! CSV export of observations for BI tools.
use crate::core::currency::ExchangeObservation;
use crate::core::quote::StockObservation;
use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const STOCK_FILE: &str = "stock_data.csv";
pub const CURRENCY_FILE: &str = "currency_exchange_rates.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row type with a fixed column layout.
pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn record(&self) -> Vec<String>;
}

impl Tabular for StockObservation {
    fn headers() -> &'static [&'static str] {
        &["date", "stock_code", "stock_name", "stock_value"]
    }

    fn record(&self) -> Vec<String> {
        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.stock_code.clone(),
            self.stock_name.clone(),
            self.close_price.to_string(),
        ]
    }
}

impl Tabular for ExchangeObservation {
    // "data" is the established column name downstream dashboards read.
    fn headers() -> &'static [&'static str] {
        &["data", "from_currency", "to_currency", "exchange_rate"]
    }

    fn record(&self) -> Vec<String> {
        vec![
            self.observed_at.format(TIMESTAMP_FORMAT).to_string(),
            self.from_currency.clone(),
            self.to_currency.clone(),
            self.rate.to_string(),
        ]
    }
}

fn write_rows<'a, W, T, I>(wtr: &mut csv::Writer<W>, rows: I) -> Result<()>
where
    W: std::io::Write,
    T: Tabular + 'a,
    I: IntoIterator<Item = &'a T>,
{
    wtr.write_record(T::headers())?;
    for row in rows {
        wtr.write_record(row.record())?;
    }
    Ok(())
}

/// Renders rows as CSV text, header first. The header row is present even
/// when there are no rows.
pub fn to_csv_string<'a, T, I>(rows: I) -> Result<String>
where
    T: Tabular + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut wtr = csv::Writer::from_writer(vec![]);
    write_rows(&mut wtr, rows)?;
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

fn stage_and_replace(files: &[(&Path, String)], staged: &mut Vec<PathBuf>) -> Result<()> {
    for (path, content) in files {
        if path.is_dir() {
            bail!("Failed to create CSV file: {} is a directory", path.display());
        }
        let tmp = staging_path(path);
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        staged.push(tmp);
    }

    for ((path, _), tmp) in files.iter().zip(staged.iter()) {
        fs::rename(tmp, path)
            .with_context(|| format!("Failed to replace CSV file: {}", path.display()))?;
        debug!("Wrote {}", path.display());
    }
    Ok(())
}

/// Writes every `(path, content)` pair, replacing existing files.
///
/// Contents are first staged next to their targets and only moved into
/// place once all of them are on disk, so a failed write leaves every
/// target untouched.
pub fn write_files(files: &[(&Path, String)]) -> Result<()> {
    let mut staged = Vec::with_capacity(files.len());
    let result = stage_and_replace(files, &mut staged);
    if result.is_err() {
        for tmp in &staged {
            // Already renamed or never written
            let _ = fs::remove_file(tmp);
        }
    }
    result
}
