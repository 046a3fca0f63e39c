pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::{ApiKey, FollowList};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Fetch,
    Setup,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub output_dir: PathBuf,
    pub api_key: Option<String>,
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            config_path: PathBuf::from(crate::core::config::DEFAULT_FOLLOW_LIST),
            output_dir: PathBuf::from("."),
            api_key: None,
            concurrency: 1,
        }
    }
}

pub async fn run_command(command: AppCommand, options: &RunOptions) -> Result<()> {
    match command {
        AppCommand::Setup => cli::setup::setup_at_path(&options.config_path),
        AppCommand::Fetch => fetch(options).await.map(|_| ()),
    }
}

async fn fetch(options: &RunOptions) -> Result<cli::fetch::ExportPaths> {
    info!("tickerfeed starting...");

    let follow_list = FollowList::load_from_path(&options.config_path)?;
    debug!("Loaded follow list: {follow_list:#?}");

    let api_key = options
        .api_key
        .as_deref()
        .context("API key not set; pass --api-key or set API_KEY")
        .and_then(|key| ApiKey::new(key))?;
    let offset = providers::alpha_vantage::offset_from_hours(follow_list.report_utc_offset_hours)?;
    let provider = providers::AlphaVantageProvider::new(
        follow_list.providers.alpha_vantage_url(),
        api_key,
        offset,
    )?;

    cli::fetch::run(
        &follow_list,
        &provider,
        &provider,
        &options.output_dir,
        options.concurrency,
    )
    .await
}
