//! `suggest` and `trending` commands.

use std::sync::Arc;

use liza_core::{AppConfig, UserPreferences};
use liza_research::{format_volume, Autocompleter, GraphqlClient};

use crate::local::{open_store, system_locale};

/// Number of trending keywords shown in the table view.
const TRENDING_KEYWORDS_SHOWN: usize = 12;

/// Print merged autocomplete suggestions for `query`.
///
/// # Errors
///
/// Returns an error only if the client cannot be built; suggestion failures
/// print an empty list.
pub(crate) async fn run_suggest(config: &AppConfig, query: &str) -> anyhow::Result<()> {
    let client = GraphqlClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build GraphQL client: {e}"))?;
    let completer = Autocompleter::from_config(Arc::new(client), config);

    let suggestions = completer.suggest(query).await;
    if suggestions.is_empty() {
        println!("no suggestions");
    }
    for s in suggestions {
        println!("{s}");
    }
    Ok(())
}

/// Print trending keywords and videos for `region`, or the saved region.
///
/// # Errors
///
/// Returns an error if the preferences cannot be read or either query fails.
pub(crate) async fn run_trending(
    config: &AppConfig,
    region: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let region = match region {
        Some(r) => r.to_uppercase(),
        None => {
            let store = open_store(config)?;
            UserPreferences::load(&store, &system_locale())?.region
        }
    };

    let client = GraphqlClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build GraphQL client: {e}"))?;
    let (keywords, videos) = tokio::try_join!(
        client.trending_keywords(&region),
        client.trending_videos(&region)
    )?;

    if json {
        let value = serde_json::json!({
            "region": region,
            "keywords": keywords,
            "videos": videos,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Trending keywords ({region})");
    if keywords.is_empty() {
        println!("  none");
    }
    for kw in keywords.iter().take(TRENDING_KEYWORDS_SHOWN) {
        let trending = if kw.trending_video_count > 0 {
            format!("  trending in {} videos", kw.trending_video_count)
        } else {
            String::new()
        };
        println!(
            "  {:<36} {}  opp {:>3.0}  vol {:>6}{trending}",
            kw.keyword,
            kw.grade,
            kw.opportunity,
            format_volume(kw.search_volume),
        );
    }

    println!("\nTrending videos ({region})");
    if videos.is_empty() {
        println!("  none");
    }
    for v in &videos {
        println!(
            "  {}  [{}]  views {}  likes {}",
            v.title,
            v.channel_title,
            format_volume(v.view_count),
            format_volume(v.like_count),
        );
        println!("    {}", v.watch_url());
    }

    Ok(())
}
