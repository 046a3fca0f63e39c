use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tickerfeed::core::config::DEFAULT_FOLLOW_LIST;
use tickerfeed::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the follow list
    #[arg(short, long, global = true, default_value = DEFAULT_FOLLOW_LIST)]
    config_path: PathBuf,

    /// Directory the CSV files are written to
    #[arg(short, long, global = true, default_value = ".")]
    output_dir: PathBuf,

    /// Alpha Vantage API key
    #[arg(long, global = true, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Number of requests in flight at once
    #[arg(short = 'j', long, global = true, default_value_t = 1)]
    concurrency: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an example follow list
    Setup,
    /// Fetch quotes and export them as CSV
    Fetch,
}

impl From<Commands> for tickerfeed::AppCommand {
    fn from(cmd: Commands) -> tickerfeed::AppCommand {
        match cmd {
            Commands::Setup => tickerfeed::AppCommand::Setup,
            Commands::Fetch => tickerfeed::AppCommand::Fetch,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the key may come from the environment or a flag
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let options = tickerfeed::RunOptions {
        config_path: cli.config_path,
        output_dir: cli.output_dir,
        api_key: cli.api_key,
        concurrency: cli.concurrency,
    };

    let result = tickerfeed::run_command(command.into(), &options).await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
