//! Debounced autocomplete over a [`SuggestionSource`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::client::SuggestionSource;

pub const DEFAULT_MIN_CHARS: usize = 2;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_LIMIT: usize = 8;

/// Turns keystrokes into merged suggestion lists.
///
/// Input shorter than `min_chars` never reaches the source. Each call to
/// [`Autocompleter::suggest_debounced`] supersedes every earlier one; a
/// superseded call returns `None` without (or after, discarding) its fetch.
pub struct Autocompleter {
    source: Arc<dyn SuggestionSource>,
    min_chars: usize,
    debounce: Duration,
    limit: usize,
    latest: AtomicU64,
}

impl Autocompleter {
    #[must_use]
    pub fn new(source: Arc<dyn SuggestionSource>) -> Self {
        Self {
            source,
            min_chars: DEFAULT_MIN_CHARS,
            debounce: DEFAULT_DEBOUNCE,
            limit: DEFAULT_LIMIT,
            latest: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn from_config(source: Arc<dyn SuggestionSource>, config: &liza_core::AppConfig) -> Self {
        Self::new(source)
            .with_min_chars(config.autocomplete_min_chars)
            .with_debounce(config.autocomplete_debounce())
            .with_limit(config.autocomplete_limit)
    }

    #[must_use]
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn long_enough(&self, input: &str) -> bool {
        input.chars().count() >= self.min_chars
    }

    /// Fetches and merges suggestions immediately, without debouncing.
    pub async fn suggest(&self, input: &str) -> Vec<String> {
        if !self.long_enough(input) {
            return Vec::new();
        }
        match self.source.suggestions(input).await {
            Ok(set) => set.merged(self.limit),
            Err(e) => {
                tracing::warn!(input, error = %e, "suggestion source failed");
                Vec::new()
            }
        }
    }

    /// Waits out the debounce delay, then fetches. Returns `None` if a newer
    /// call arrived during the wait or while the fetch was in flight.
    pub async fn suggest_debounced(&self, input: &str) -> Option<Vec<String>> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.debounce).await;
        if self.latest.load(Ordering::SeqCst) != ticket {
            return None;
        }
        let suggestions = self.suggest(input).await;
        (self.latest.load(Ordering::SeqCst) == ticket).then_some(suggestions)
    }
}
