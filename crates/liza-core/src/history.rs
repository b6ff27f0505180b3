//! Recent-search history, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{get_json, set_json, KeyValueStore};
use crate::StoreError;

pub const HISTORY_KEY: &str = "liza-search-history";

pub const MAX_HISTORY_ITEMS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryItem {
    pub keyword: String,
    pub searched_at: DateTime<Utc>,
}

/// Search history persisted under [`HISTORY_KEY`].
pub struct SearchHistory<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> SearchHistory<'a> {
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Returns the stored entries, newest first.
    ///
    /// A corrupt stored list is logged and reported as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when the store itself cannot be read.
    pub fn list(&self) -> Result<Vec<SearchHistoryItem>, StoreError> {
        match get_json::<Vec<SearchHistoryItem>>(self.store, HISTORY_KEY) {
            Ok(items) => Ok(items.unwrap_or_default()),
            Err(StoreError::Json { source, .. }) => {
                tracing::warn!(error = %source, "discarding corrupt search history");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Records `keyword` as searched now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or written.
    pub fn record(&self, keyword: &str) -> Result<(), StoreError> {
        self.record_at(keyword, Utc::now())
    }

    /// Records `keyword` at `at`. Any earlier entry for the same keyword,
    /// compared case-insensitively, is dropped; the list is capped at
    /// [`MAX_HISTORY_ITEMS`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or written.
    pub fn record_at(&self, keyword: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let needle = keyword.to_lowercase();
        let mut items: Vec<SearchHistoryItem> = self
            .list()?
            .into_iter()
            .filter(|h| h.keyword.to_lowercase() != needle)
            .collect();
        items.insert(
            0,
            SearchHistoryItem {
                keyword: keyword.to_string(),
                searched_at: at,
            },
        );
        items.truncate(MAX_HISTORY_ITEMS);
        set_json(self.store, HISTORY_KEY, &items)
    }

    /// Removes all history.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(HISTORY_KEY)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::MemoryStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_store_lists_nothing() {
        let store = MemoryStore::new();
        assert!(SearchHistory::new(&store).list().unwrap().is_empty());
    }

    #[test]
    fn newest_entry_comes_first() {
        let store = MemoryStore::new();
        let history = SearchHistory::new(&store);
        history.record_at("youtube seo", t0()).unwrap();
        history
            .record_at("podcast tips", t0() + Duration::minutes(1))
            .unwrap();

        let items = history.list().unwrap();
        let keywords: Vec<&str> = items.iter().map(|h| h.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["podcast tips", "youtube seo"]);
    }

    #[test]
    fn duplicate_is_case_insensitive_and_moves_to_front() {
        let store = MemoryStore::new();
        let history = SearchHistory::new(&store);
        history.record_at("YouTube SEO", t0()).unwrap();
        history
            .record_at("podcast tips", t0() + Duration::minutes(1))
            .unwrap();
        history
            .record_at("youtube seo", t0() + Duration::minutes(2))
            .unwrap();

        let items = history.list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].keyword, "youtube seo");
        assert_eq!(items[0].searched_at, t0() + Duration::minutes(2));
    }

    #[test]
    fn history_is_capped() {
        let store = MemoryStore::new();
        let history = SearchHistory::new(&store);
        for i in 0..(MAX_HISTORY_ITEMS + 5) {
            let at = t0() + Duration::seconds(i64::try_from(i).unwrap());
            history.record_at(&format!("keyword {i}"), at).unwrap();
        }
        let items = history.list().unwrap();
        assert_eq!(items.len(), MAX_HISTORY_ITEMS);
        assert_eq!(items[0].keyword, format!("keyword {}", MAX_HISTORY_ITEMS + 4));
    }

    #[test]
    fn timestamps_are_stored_as_rfc3339() {
        let store = MemoryStore::new();
        SearchHistory::new(&store).record_at("seo", t0()).unwrap();
        let raw = store.get(HISTORY_KEY).unwrap().unwrap();
        assert!(raw.contains("\"searchedAt\":\"2025-03-01T12:00:00Z\""), "raw: {raw}");
    }

    #[test]
    fn clear_removes_everything() {
        let store = MemoryStore::new();
        let history = SearchHistory::new(&store);
        history.record_at("seo", t0()).unwrap();
        history.clear().unwrap();
        assert!(history.list().unwrap().is_empty());
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_history_reads_as_empty_and_is_overwritten() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "not a list").unwrap();
        let history = SearchHistory::new(&store);
        assert!(history.list().unwrap().is_empty());
        history.record_at("seo", t0()).unwrap();
        assert_eq!(history.list().unwrap().len(), 1);
    }
}
