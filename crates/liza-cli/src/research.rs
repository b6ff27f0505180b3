//! `research` command: one-shot analysis followed by the streamed long-tail
//! candidates, printed once the stream finishes.
//!
//! Ctrl-C cancels the analysis or the subscription; whatever arrived so far is
//! still printed.

use std::sync::Arc;

use async_trait::async_trait;
use liza_core::{AppConfig, FileStore, KeyValueStore};
use liza_research::retry::retry_with_backoff;
use liza_research::{
    format_volume, AnalysisResult, GraphqlClient, KeywordAnalyzer, LongTailCandidate,
    ResearchError, SearchSession, SessionSnapshot, SubscriptionChannel,
};

/// Wraps the query client with the configured retry policy.
struct RetryingAnalyzer {
    client: GraphqlClient,
    max_retries: u32,
    backoff_base_ms: u64,
}

#[async_trait]
impl KeywordAnalyzer for RetryingAnalyzer {
    async fn analyze(
        &self,
        keyword: &str,
        max_long_tails: u32,
    ) -> Result<AnalysisResult, ResearchError> {
        let client = &self.client;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, move || {
            client.analyze(keyword, max_long_tails)
        })
        .await
    }
}

/// Run a full research pass for `keyword`.
///
/// # Errors
///
/// Returns an error if the client or local store cannot be set up, or if the
/// analysis itself fails. A failed long-tail stream is reported but does not
/// fail the command.
pub(crate) async fn run_research(
    config: &AppConfig,
    keyword: &str,
    max_long_tails: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let client = GraphqlClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build GraphQL client: {e}"))?;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.data_dir.clone())?);

    let analyzer = Arc::new(RetryingAnalyzer {
        client,
        max_retries: config.max_retries,
        backoff_base_ms: config.retry_backoff_base_ms,
    });
    let channel = Arc::new(SubscriptionChannel::from_config(config));
    let session = SearchSession::new(analyzer, channel)
        .with_max_long_tails(max_long_tails.unwrap_or(config.max_long_tails))
        .with_history(store);

    let analysis = session.spawn_search(keyword);
    tokio::select! {
        joined = analysis => joined?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("cancelled");
            session.cancel();
        }
    }
    let snapshot = wait_with_progress(&session, json).await;

    if let Some(err) = &snapshot.error {
        anyhow::bail!("analysis of '{keyword}' failed: {err}");
    }

    if json {
        print_json(&snapshot)?;
    } else {
        print_report(&snapshot);
    }

    if let Some(err) = &snapshot.stream_error {
        tracing::warn!(error = %err, "long-tail stream ended early; showing partial results");
    }

    Ok(())
}

/// Waits for the session to go idle, reporting progress on stderr.
async fn wait_with_progress(session: &SearchSession, quiet: bool) -> SessionSnapshot {
    let mut changes = session.changes();
    let mut last_reported = (0, 0);
    loop {
        let snapshot = session.snapshot();
        let progress = (
            snapshot.aggregate.analyzed_count(),
            snapshot.aggregate.total_count(),
        );
        if !quiet && progress.1 > 0 && progress != last_reported {
            let latest = snapshot
                .aggregate
                .latest()
                .map(|c| format!("  latest: {} ({})", c.keyword, c.grade))
                .unwrap_or_default();
            eprintln!(
                "  analyzed {}/{} long-tail keywords{latest}",
                progress.0, progress.1
            );
            last_reported = progress;
        }
        if !snapshot.is_loading() {
            return snapshot;
        }

        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    return session.snapshot();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("cancelled");
                session.cancel();
            }
        }
    }
}

fn print_report(snapshot: &SessionSnapshot) {
    let Some(result) = &snapshot.result else {
        return;
    };

    println!(
        "{}  grade {}  opportunity {:.0}  difficulty {:.0}  volume {}",
        result.keyword,
        result.scores.grade,
        result.scores.opportunity,
        result.scores.difficulty,
        format_volume(result.search_demand.volume),
    );
    println!(
        "competition {}  videos {}  trend {}",
        result.content_supply.competition_level,
        result.content_supply.video_count,
        result.search_demand.trend_type,
    );

    let (high, other) = snapshot.aggregate.partition();
    print_group("Gold keywords (A/B)", &high);
    print_group("Other long tails", &other);

    if snapshot.aggregate.candidates().is_empty() {
        println!("\nno long-tail keywords found");
    }
}

fn print_group(title: &str, candidates: &[&LongTailCandidate]) {
    if candidates.is_empty() {
        return;
    }
    println!("\n{title}");
    for c in candidates {
        println!(
            "  {:<44} {}  opp {:>3.0}  diff {:>3.0}  vol {:>6}",
            c.keyword,
            c.grade,
            c.opportunity,
            c.difficulty,
            format_volume(c.search_volume),
        );
    }
}

fn print_json(snapshot: &SessionSnapshot) -> anyhow::Result<()> {
    let value = serde_json::json!({
        "result": snapshot.result,
        "analyzedCount": snapshot.aggregate.analyzed_count(),
        "totalCount": snapshot.aggregate.total_count(),
        "longTails": snapshot.aggregate.candidates(),
        "streamError": snapshot.stream_error.as_ref().map(ToString::to_string),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
