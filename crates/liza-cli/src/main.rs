use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod explore;
mod local;
mod research;

use local::{HistoryCommands, PrefsCommands};

#[derive(Debug, Parser)]
#[command(name = "liza")]
#[command(about = "Long-tail keyword research from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze a keyword and stream its long-tail candidates
    Research {
        keyword: String,
        /// Upper bound on long-tail candidates (defaults to `LIZA_MAX_LONG_TAILS`)
        #[arg(long)]
        max_long_tails: Option<u32>,
        /// Print the final result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show autocomplete suggestions for a partial query
    Suggest { query: String },
    /// Show trending keywords and videos for a region
    Trending {
        /// Region code (defaults to the saved preference)
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Manage the local search history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Manage saved preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = liza_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(env = %config.env, api_url = %config.api_url, "configuration loaded");

    match cli.command {
        Some(Commands::Research {
            keyword,
            max_long_tails,
            json,
        }) => research::run_research(&config, &keyword, max_long_tails, json).await?,
        Some(Commands::Suggest { query }) => explore::run_suggest(&config, &query).await?,
        Some(Commands::Trending { region, json }) => {
            explore::run_trending(&config, region.as_deref(), json).await?;
        }
        Some(Commands::History { command }) => local::run_history(&config, &command)?,
        Some(Commands::Prefs { command }) => local::run_prefs(&config, &command)?,
        None => println!("liza: run with --help to list commands"),
    }

    Ok(())
}
