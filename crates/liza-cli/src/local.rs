//! `history` and `prefs` commands, backed by the local file store.

use clap::Subcommand;
use liza_core::preferences::{NICHE_OPTIONS, REGION_OPTIONS};
use liza_core::{AppConfig, FileStore, SearchHistory, UserPreferences};

/// Sub-commands available under `history`.
#[derive(Debug, Subcommand)]
pub enum HistoryCommands {
    /// List recent searches, newest first
    List {
        /// Maximum number of entries to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete all saved searches
    Clear,
}

/// Sub-commands available under `prefs`.
#[derive(Debug, Subcommand)]
pub enum PrefsCommands {
    /// Show the saved preferences and available options
    Show,
    /// Set the preferred region (e.g. GB)
    Region { code: String },
    /// Toggle a niche tag (e.g. gaming)
    Niche { id: String },
    /// Forget saved preferences and return to auto-detected defaults
    Reset,
}

pub(crate) fn open_store(config: &AppConfig) -> anyhow::Result<FileStore> {
    FileStore::open(config.data_dir.clone()).map_err(|e| {
        anyhow::anyhow!(
            "failed to open data directory {}: {e}",
            config.data_dir.display()
        )
    })
}

/// The process locale as a BCP 47 tag, e.g. `en_US.UTF-8` becomes `en-US`.
pub(crate) fn system_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .map(|raw| normalize_locale(&raw))
        .unwrap_or_default()
}

fn normalize_locale(raw: &str) -> String {
    let base = raw.split(['.', '@']).next().unwrap_or_default();
    base.replace('_', "-")
}

/// # Errors
///
/// Returns an error if the store cannot be opened, read or written.
pub(crate) fn run_history(config: &AppConfig, command: &HistoryCommands) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let history = SearchHistory::new(&store);

    match command {
        HistoryCommands::List { limit } => {
            let items = history.list()?;
            if items.is_empty() {
                println!("no searches yet");
            }
            for item in items.iter().take(limit.unwrap_or(usize::MAX)) {
                println!(
                    "{}  {}",
                    item.searched_at.format("%Y-%m-%d %H:%M"),
                    item.keyword
                );
            }
        }
        HistoryCommands::Clear => {
            history.clear()?;
            println!("search history cleared");
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the store cannot be used or an unknown region or niche
/// is given.
pub(crate) fn run_prefs(config: &AppConfig, command: &PrefsCommands) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let load = || UserPreferences::load(&store, &system_locale());

    match command {
        PrefsCommands::Show => print_prefs(&load()?),
        PrefsCommands::Region { code } => {
            let mut prefs = load()?;
            prefs.set_region(code)?;
            prefs.auto_detect = false;
            prefs.save(&store)?;
            println!("region set to {}", prefs.region);
        }
        PrefsCommands::Niche { id } => {
            let mut prefs = load()?;
            let selected = prefs.toggle_niche(id)?;
            prefs.save(&store)?;
            println!("{id} {}", if selected { "selected" } else { "removed" });
        }
        PrefsCommands::Reset => {
            let prefs = UserPreferences::reset(&store)?;
            println!(
                "preferences reset (region {}, auto-detect {})",
                prefs.region, prefs.auto_detect
            );
        }
    }
    Ok(())
}

fn print_prefs(prefs: &UserPreferences) {
    let region_label = REGION_OPTIONS
        .iter()
        .find(|(code, _)| *code == prefs.region)
        .map_or("unknown", |(_, label)| *label);
    println!("region: {} ({region_label})", prefs.region);
    println!("auto-detect: {}", prefs.auto_detect);
    println!(
        "niches: {}",
        if prefs.niches.is_empty() {
            "none".to_string()
        } else {
            prefs.niches.join(", ")
        }
    );
    println!("\navailable regions:");
    for (code, label) in REGION_OPTIONS {
        println!("  {code}  {label}");
    }
    println!("\navailable niches:");
    for (id, label) in NICHE_OPTIONS {
        let mark = if prefs.niches.iter().any(|n| n == id) { "*" } else { " " };
        println!(" {mark}{id:<14} {label}");
    }
}
