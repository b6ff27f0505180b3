//! HTTP client for the analysis GraphQL API.
//!
//! Wraps `reqwest` with GraphQL envelope handling: a non-empty `errors` array
//! becomes [`ResearchError::Query`], a missing field becomes
//! [`ResearchError::MissingData`]. The client never retries; callers that want
//! retries wrap calls in [`crate::retry::retry_with_backoff`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::ResearchError;
use crate::queries::{ANALYZE_KEYWORD_QUERY, AUTOCOMPLETE_QUERY};
use crate::types::{AnalysisResult, GraphqlResponse, SuggestionSet};

/// Runs the one-shot keyword analysis.
#[async_trait]
pub trait KeywordAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        keyword: &str,
        max_long_tails: u32,
    ) -> Result<AnalysisResult, ResearchError>;
}

/// Fetches raw autocomplete suggestions for a partial query.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggestions(&self, query: &str) -> Result<SuggestionSet, ResearchError>;
}

/// Client for the analysis GraphQL endpoint.
///
/// Use [`GraphqlClient::new`] with an explicit endpoint (a wiremock server in
/// tests) or [`GraphqlClient::from_config`] in the binary.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    client: Client,
    endpoint: Url,
}

impl GraphqlClient {
    /// # Errors
    ///
    /// Returns [`ResearchError::Transport`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ResearchError::InvalidEndpoint`] if
    /// `endpoint` is not an absolute URL.
    pub fn new(endpoint: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ResearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let endpoint = Url::parse(endpoint).map_err(|e| ResearchError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, endpoint })
    }

    /// # Errors
    ///
    /// See [`GraphqlClient::new`].
    pub fn from_config(config: &liza_core::AppConfig) -> Result<Self, ResearchError> {
        Self::new(
            &config.api_url,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Executes `query` and decodes `data.<field>` into `T`.
    ///
    /// # Errors
    ///
    /// - [`ResearchError::Transport`] on network failure or non-2xx status.
    /// - [`ResearchError::Query`] when the response carries GraphQL errors.
    /// - [`ResearchError::MissingData`] when `data.<field>` is absent or null.
    /// - [`ResearchError::Deserialize`] when the body or field has the wrong shape.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        field: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ResearchError> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        let envelope: GraphqlResponse =
            serde_json::from_str(&text).map_err(|e| ResearchError::Deserialize {
                context: format!("{field} response"),
                source: e,
            })?;

        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            if errors.len() > 1 {
                tracing::debug!(
                    field,
                    count = errors.len(),
                    "GraphQL response carried multiple errors; surfacing the first"
                );
            }
            return Err(ResearchError::from_graphql_errors(errors));
        }

        let value = envelope
            .data
            .and_then(|mut d| d.get_mut(field).map(serde_json::Value::take))
            .filter(|v| !v.is_null())
            .ok_or_else(|| ResearchError::MissingData(field.to_string()))?;

        serde_json::from_value(value).map_err(|e| ResearchError::Deserialize {
            context: field.to_string(),
            source: e,
        })
    }

    /// Fetches the full analysis for `keyword`. `max_long_tails` bounds how
    /// many long-tail candidates the backend will later stream.
    ///
    /// # Errors
    ///
    /// See [`GraphqlClient::execute`].
    pub async fn analyze(
        &self,
        keyword: &str,
        max_long_tails: u32,
    ) -> Result<AnalysisResult, ResearchError> {
        tracing::debug!(keyword, max_long_tails, "analyzing keyword");
        self.execute(
            "analyzeKeyword",
            ANALYZE_KEYWORD_QUERY,
            json!({ "keyword": keyword, "maxLongTails": max_long_tails }),
        )
        .await
    }

    /// Fetches autocomplete suggestions, propagating every failure.
    ///
    /// # Errors
    ///
    /// See [`GraphqlClient::execute`].
    pub async fn try_autocomplete(&self, query: &str) -> Result<SuggestionSet, ResearchError> {
        self.execute(
            "getAutocompleteSuggestions",
            AUTOCOMPLETE_QUERY,
            json!({ "query": query }),
        )
        .await
    }

    /// Fetches autocomplete suggestions. Losing suggestions is never fatal:
    /// any failure is logged and yields an empty set.
    pub async fn autocomplete(&self, query: &str) -> SuggestionSet {
        match self.try_autocomplete(query).await {
            Ok(set) => set,
            Err(ResearchError::MissingData(_)) => SuggestionSet::default(),
            Err(e) => {
                tracing::warn!(query, error = %e, "autocomplete failed; returning no suggestions");
                SuggestionSet::default()
            }
        }
    }
}

#[async_trait]
impl KeywordAnalyzer for GraphqlClient {
    async fn analyze(
        &self,
        keyword: &str,
        max_long_tails: u32,
    ) -> Result<AnalysisResult, ResearchError> {
        GraphqlClient::analyze(self, keyword, max_long_tails).await
    }
}

#[async_trait]
impl SuggestionSource for GraphqlClient {
    async fn suggestions(&self, query: &str) -> Result<SuggestionSet, ResearchError> {
        Ok(self.autocomplete(query).await)
    }
}
