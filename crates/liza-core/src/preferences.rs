//! User preferences: region, niche tags and the auto-detect flag.

use serde::{Deserialize, Serialize};

use crate::store::{get_json, set_json, KeyValueStore};
use crate::{PreferenceError, StoreError};

pub const PREFERENCES_KEY: &str = "liza-user-preferences";

pub const DEFAULT_REGION: &str = "US";

/// `(code, label)` for every supported region.
pub const REGION_OPTIONS: &[(&str, &str)] = &[
    ("US", "United States"),
    ("GB", "United Kingdom"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("IN", "India"),
    ("BR", "Brazil"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
];

/// `(id, label)` for every supported niche tag.
pub const NICHE_OPTIONS: &[(&str, &str)] = &[
    ("tech", "Technology"),
    ("gaming", "Gaming"),
    ("lifestyle", "Lifestyle"),
    ("finance", "Finance"),
    ("education", "Education"),
    ("entertainment", "Entertainment"),
    ("music", "Music"),
    ("travel", "Travel"),
    ("food", "Food & Cooking"),
    ("health", "Health & Fitness"),
    ("sports", "Sports"),
    ("business", "Business"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub niches: Vec<String>,
    pub region: String,
    pub auto_detect: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            niches: Vec::new(),
            region: DEFAULT_REGION.to_string(),
            auto_detect: true,
        }
    }
}

/// Maps a BCP 47 locale (e.g. `"pt-BR"`) to a supported region code.
///
/// Unmapped locales fall back to [`DEFAULT_REGION`].
#[must_use]
pub fn detect_region(locale: &str) -> &'static str {
    match locale {
        "en-US" => "US",
        "en-GB" => "GB",
        "de-DE" | "de" => "DE",
        "fr-FR" | "fr" => "FR",
        "hi-IN" => "IN",
        "pt-BR" => "BR",
        "ja-JP" | "ja" => "JP",
        "ko-KR" | "ko" => "KR",
        _ => DEFAULT_REGION,
    }
}

impl UserPreferences {
    /// Loads saved preferences, or builds defaults with the region detected
    /// from `locale` when nothing has been saved yet.
    ///
    /// A corrupt saved record is logged and treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when the store itself cannot be read.
    pub fn load(store: &dyn KeyValueStore, locale: &str) -> Result<Self, StoreError> {
        match get_json::<Self>(store, PREFERENCES_KEY) {
            Ok(Some(saved)) => Ok(saved),
            Ok(None) => Ok(Self::detected(locale)),
            Err(StoreError::Json { source, .. }) => {
                tracing::warn!(error = %source, "discarding corrupt saved preferences");
                Ok(Self::detected(locale))
            }
            Err(e) => Err(e),
        }
    }

    fn detected(locale: &str) -> Self {
        Self {
            region: detect_region(locale).to_string(),
            ..Self::default()
        }
    }

    /// Persists these preferences.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        set_json(store, PREFERENCES_KEY, self)
    }

    /// Forgets the saved record and returns the defaults: no niches, region
    /// [`DEFAULT_REGION`], auto-detect on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the saved record cannot be removed.
    pub fn reset(store: &dyn KeyValueStore) -> Result<Self, StoreError> {
        store.remove(PREFERENCES_KEY)?;
        Ok(Self::default())
    }

    /// Selects `region`, which must be one of [`REGION_OPTIONS`].
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError::UnknownRegion`] for an unsupported code.
    pub fn set_region(&mut self, region: &str) -> Result<(), PreferenceError> {
        let code = region.to_uppercase();
        if !REGION_OPTIONS.iter().any(|(c, _)| *c == code) {
            return Err(PreferenceError::UnknownRegion(region.to_string()));
        }
        self.region = code;
        Ok(())
    }

    /// Adds `niche` if absent, removes it if present. Returns `true` when the
    /// niche is selected after the call.
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError::UnknownNiche`] for an unsupported niche id.
    pub fn toggle_niche(&mut self, niche: &str) -> Result<bool, PreferenceError> {
        if !NICHE_OPTIONS.iter().any(|(id, _)| *id == niche) {
            return Err(PreferenceError::UnknownNiche(niche.to_string()));
        }
        if let Some(pos) = self.niches.iter().position(|n| n == niche) {
            self.niches.remove(pos);
            Ok(false)
        } else {
            self.niches.push(niche.to_string());
            Ok(true)
        }
    }
}
