use super::ui;
use crate::core::batch::{self, BatchReport};
use crate::core::config::FollowList;
use crate::core::export::{self, CURRENCY_FILE, STOCK_FILE};
use crate::core::{ExchangeRateProvider, StockPriceProvider};
use anyhow::Result;
use comfy_table::Cell;
use std::path::{Path, PathBuf};
use tracing::info;

/// Locations of the files written by a run.
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub stocks: PathBuf,
    pub currencies: PathBuf,
}

impl ExportPaths {
    pub fn in_dir(dir: &Path) -> Self {
        ExportPaths {
            stocks: dir.join(STOCK_FILE),
            currencies: dir.join(CURRENCY_FILE),
        }
    }
}

pub async fn run(
    follow_list: &FollowList,
    stock_provider: &dyn StockPriceProvider,
    rate_provider: &dyn ExchangeRateProvider,
    output_dir: &Path,
    concurrency: usize,
) -> Result<ExportPaths> {
    let total = follow_list.stocks.len() + follow_list.conversions.len();
    info!(
        stocks = follow_list.stocks.len(),
        conversions = follow_list.conversions.len(),
        concurrency,
        "Fetching quotes"
    );

    let pb = ui::new_progress_bar(total as u64, true);
    let tick = || pb.inc(1);

    pb.set_message("Fetching stock prices...");
    let stocks =
        batch::fetch_stocks(&follow_list.stocks, stock_provider, concurrency, &tick).await;

    pb.set_message("Fetching exchange rates...");
    let conversions =
        batch::fetch_conversions(&follow_list.conversions, rate_provider, concurrency, &tick)
            .await;
    pb.finish_and_clear();

    let paths = ExportPaths::in_dir(output_dir);
    // Both tables are rendered before either file is touched
    let stock_csv = export::to_csv_string(stocks.rows())?;
    let rate_csv = export::to_csv_string(conversions.rows())?;
    export::write_files(&[
        (paths.stocks.as_path(), stock_csv),
        (paths.currencies.as_path(), rate_csv),
    ])?;
    info!(
        stock_rows = stocks.succeeded(),
        rate_rows = conversions.succeeded(),
        "Export finished"
    );

    println!("{}", display_summary(&stocks, &conversions, &paths));
    Ok(paths)
}

fn display_summary<S, C>(
    stocks: &BatchReport<S>,
    conversions: &BatchReport<C>,
    paths: &ExportPaths,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Dataset"),
        ui::header_cell("Exported"),
        ui::header_cell("Skipped"),
        ui::header_cell("File"),
    ]);
    table.add_row(vec![
        Cell::new("Stocks"),
        ui::count_cell(stocks.succeeded(), false),
        ui::count_cell(stocks.failed(), true),
        Cell::new(paths.stocks.display()),
    ]);
    table.add_row(vec![
        Cell::new("Exchange rates"),
        ui::count_cell(conversions.succeeded(), false),
        ui::count_cell(conversions.failed(), true),
        Cell::new(paths.currencies.display()),
    ]);

    let mut output = format!(
        "{}\n\n{}",
        ui::style_text("Export", ui::StyleType::Title),
        table
    );

    let failures: Vec<_> = stocks
        .failures()
        .map(|(o, e)| (&o.key, &o.label, e))
        .chain(conversions.failures().map(|(o, e)| (&o.key, &o.label, e)))
        .collect();

    if failures.is_empty() {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text("All entries exported.", ui::StyleType::Subtle)
        ));
        return output;
    }

    let mut skipped = ui::new_styled_table();
    skipped.set_header(vec![
        ui::header_cell("Key"),
        ui::header_cell("Entry"),
        ui::header_cell("Error"),
    ]);
    for (key, label, err) in failures {
        skipped.add_row(vec![
            Cell::new(key),
            Cell::new(label),
            ui::error_cell(&err.to_string()),
        ]);
    }
    output.push_str(&format!(
        "\n\n{}\n\n{}",
        ui::style_text("Skipped entries", ui::StyleType::TotalLabel),
        skipped
    ));
    output
}
