//! Analysis API response types.
//!
//! Field names follow the GraphQL schema (camelCase on the wire). Server-side
//! classifications whose value sets are not fixed by the schema (trend type,
//! competition level, content activity) are kept as strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl GraphqlError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }

    /// Reads one entry of an `error` frame payload. Entries that are not
    /// error objects keep an empty message.
    pub(crate) fn from_payload_entry(entry: serde_json::Value) -> Self {
        match entry {
            serde_json::Value::String(message) => Self::new(message),
            other => serde_json::from_value(other).unwrap_or_else(|_| Self::new(String::new())),
        }
    }
}

/// Top-level GraphQL response: `{ "data": ..., "errors": [...] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphqlError>>,
}

/// Letter grade summarising a keyword's opportunity/difficulty balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
    /// Any grade string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl Grade {
    /// A and B grades are presented as the high-value subset.
    #[must_use]
    pub fn is_high(self) -> bool {
        matches!(self, Grade::A | Grade::B)
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::Unknown => "?",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// analyzeKeyword
// ---------------------------------------------------------------------------

/// Full analysis of a single keyword returned by `analyzeKeyword`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub keyword: String,
    pub analyzed_at: DateTime<Utc>,
    pub search_demand: SearchDemand,
    pub content_supply: ContentSupply,
    pub scores: Scores,
    pub recommendations: Recommendations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDemand {
    pub volume: u64,
    pub trend_type: String,
    pub momentum: f64,
    #[serde(default)]
    pub seasonal_peak: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSupply {
    pub video_count: u64,
    pub total_search_results: u64,
    pub content_gap_score: f64,
    pub competition_level: String,
    pub avg_competitor_views: f64,
    pub videos_uploaded_today: u64,
    pub videos_last3_days: u64,
    pub videos_this_week: u64,
    pub videos_this_month: u64,
    pub videos_this_year: u64,
    pub is_dormant_opportunity: bool,
    pub content_activity_level: String,
}

/// Derived scores; `opportunity` and `difficulty` are 0–100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub opportunity: f64,
    pub difficulty: f64,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    #[serde(default)]
    pub title_patterns: Vec<String>,
    #[serde(default)]
    pub must_have_tags: Vec<String>,
    pub optimal_length_seconds: u32,
    #[serde(default)]
    pub top_questions: Vec<String>,
    #[serde(default)]
    pub related_keywords: Vec<String>,
}

// ---------------------------------------------------------------------------
// getAutocompleteSuggestions
// ---------------------------------------------------------------------------

/// Suggestions from the two independent suggestion sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionSet {
    #[serde(default)]
    pub youtube: Vec<String>,
    #[serde(default)]
    pub google: Vec<String>,
}

impl SuggestionSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.youtube.is_empty() && self.google.is_empty()
    }

    /// YouTube suggestions first, then Google, exact duplicates removed,
    /// first occurrence kept, at most `limit` entries.
    #[must_use]
    pub fn merged(&self, limit: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(limit);
        for s in self.youtube.iter().chain(self.google.iter()) {
            if out.len() == limit {
                break;
            }
            if !out.contains(s) {
                out.push(s.clone());
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// onLongTailAnalyzed
// ---------------------------------------------------------------------------

/// A related keyword discovered for a parent keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTailCandidate {
    pub keyword: String,
    pub grade: Grade,
    pub opportunity: f64,
    pub difficulty: f64,
    pub search_volume: u64,
    pub source: String,
}

/// One `next` payload of the long-tail subscription.
///
/// The single-candidate fields describe the keyword analysed most recently and
/// are absent on pure progress/completion messages. `all_results` is the
/// server's de-duplicated snapshot of everything found so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialUpdateEnvelope {
    pub parent_keyword: String,
    #[serde(default)]
    pub long_tail_keyword: Option<String>,
    #[serde(default)]
    pub opportunity: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub search_volume: Option<u64>,
    #[serde(default)]
    pub competition_level: Option<String>,
    #[serde(default)]
    pub video_count: Option<u64>,
    #[serde(default)]
    pub avg_competitor_views: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub is_complete: bool,
    pub analyzed_count: u32,
    pub total_count: u32,
    #[serde(default)]
    pub all_results: Option<Vec<LongTailCandidate>>,
}

impl PartialUpdateEnvelope {
    /// The latest single candidate, when this envelope carries one.
    #[must_use]
    pub fn latest(&self) -> Option<LongTailCandidate> {
        let keyword = self.long_tail_keyword.clone()?;
        Some(LongTailCandidate {
            keyword,
            grade: self.grade.unwrap_or(Grade::Unknown),
            opportunity: self.opportunity.unwrap_or_default(),
            difficulty: self.difficulty.unwrap_or_default(),
            search_volume: self.search_volume.unwrap_or_default(),
            source: self.source.clone().unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Selection set
// ---------------------------------------------------------------------------

/// A keyword the user put in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionItem {
    pub keyword: String,
    pub grade: Grade,
    pub opportunity: f64,
    pub search_volume: u64,
}

impl From<&LongTailCandidate> for SelectionItem {
    fn from(c: &LongTailCandidate) -> Self {
        Self {
            keyword: c.keyword.clone(),
            grade: c.grade,
            opportunity: c.opportunity,
            search_volume: c.search_volume,
        }
    }
}

impl From<&AnalysisResult> for SelectionItem {
    fn from(r: &AnalysisResult) -> Self {
        Self {
            keyword: r.keyword.clone(),
            grade: r.scores.grade,
            opportunity: r.scores.opportunity,
            search_volume: r.search_demand.volume,
        }
    }
}
