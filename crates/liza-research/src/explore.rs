//! Regional trending keywords and videos.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::GraphqlClient;
use crate::error::ResearchError;
use crate::queries::{TRENDING_KEYWORDS_QUERY, TRENDING_VIDEOS_QUERY};
use crate::types::Grade;

/// At most this many trending videos are returned.
pub const MAX_TRENDING_VIDEOS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingKeyword {
    pub keyword: String,
    pub grade: Grade,
    pub search_volume: u64,
    pub opportunity: f64,
    pub difficulty: f64,
    #[serde(default)]
    pub trending_video_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingVideo {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    #[serde(default)]
    pub thumbnail_medium: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
}

impl TrendingVideo {
    #[must_use]
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

impl GraphqlClient {
    /// Trending keywords for `region` (ISO 3166 alpha-2). A response without
    /// the field yields an empty list.
    ///
    /// # Errors
    ///
    /// See [`GraphqlClient::execute`].
    pub async fn trending_keywords(&self, region: &str) -> Result<Vec<TrendingKeyword>, ResearchError> {
        tracing::debug!(region, "fetching trending keywords");
        match self
            .execute("trendingKeywords", TRENDING_KEYWORDS_QUERY, json!({ "regionCode": region }))
            .await
        {
            Err(ResearchError::MissingData(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    /// Trending videos for `region`, at most [`MAX_TRENDING_VIDEOS`].
    ///
    /// # Errors
    ///
    /// See [`GraphqlClient::execute`].
    pub async fn trending_videos(&self, region: &str) -> Result<Vec<TrendingVideo>, ResearchError> {
        tracing::debug!(region, "fetching trending videos");
        let mut videos: Vec<TrendingVideo> = match self
            .execute("trendingVideos", TRENDING_VIDEOS_QUERY, json!({ "regionCode": region }))
            .await
        {
            Err(ResearchError::MissingData(_)) => Vec::new(),
            other => other?,
        };
        videos.truncate(MAX_TRENDING_VIDEOS);
        Ok(videos)
    }
}
