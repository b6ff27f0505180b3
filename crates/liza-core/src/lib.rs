pub mod app_config;
pub mod config;
pub mod error;
pub mod history;
pub mod preferences;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, PreferenceError, StoreError};
pub use history::{SearchHistory, SearchHistoryItem, MAX_HISTORY_ITEMS};
pub use preferences::{detect_region, UserPreferences, NICHE_OPTIONS, REGION_OPTIONS};
pub use store::{FileStore, KeyValueStore, MemoryStore};
