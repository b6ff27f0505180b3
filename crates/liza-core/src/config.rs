use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_API_URL: &str = "http://localhost:5002/graphql";
const DEFAULT_WS_URL: &str = "ws://localhost:5002/graphql";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("LIZA_ENV", "development"));

    // Production has no sensible localhost fallback for the backend.
    let (api_url, ws_url) = if env == Environment::Production {
        (require("LIZA_API_URL")?, require("LIZA_WS_URL")?)
    } else {
        (
            or_default("LIZA_API_URL", DEFAULT_API_URL),
            or_default("LIZA_WS_URL", DEFAULT_WS_URL),
        )
    };
    check_scheme("LIZA_API_URL", &api_url, &["http://", "https://"])?;
    check_scheme("LIZA_WS_URL", &ws_url, &["ws://", "wss://"])?;

    let log_level = or_default("LIZA_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("LIZA_DATA_DIR", "./.liza"));
    let request_timeout_secs = parse_u64("LIZA_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("LIZA_USER_AGENT", "liza/0.1 (keyword-research)");
    let max_long_tails = parse_u32("LIZA_MAX_LONG_TAILS", "15")?;
    let ack_timeout_secs = parse_u64("LIZA_ACK_TIMEOUT_SECS", "10")?;
    let autocomplete_min_chars = parse_usize("LIZA_AUTOCOMPLETE_MIN_CHARS", "2")?;
    let autocomplete_debounce_ms = parse_u64("LIZA_AUTOCOMPLETE_DEBOUNCE_MS", "300")?;
    let autocomplete_limit = parse_usize("LIZA_AUTOCOMPLETE_LIMIT", "8")?;
    if autocomplete_limit == 0 {
        return Err(invalid(
            "LIZA_AUTOCOMPLETE_LIMIT",
            "must be greater than zero".to_string(),
        ));
    }
    let max_retries = parse_u32("LIZA_MAX_RETRIES", "0")?;
    let retry_backoff_base_ms = parse_u64("LIZA_RETRY_BACKOFF_BASE_MS", "500")?;

    Ok(AppConfig {
        env,
        api_url,
        ws_url,
        log_level,
        data_dir,
        request_timeout_secs,
        user_agent,
        max_long_tails,
        ack_timeout_secs,
        autocomplete_min_chars,
        autocomplete_debounce_ms,
        autocomplete_limit,
        max_retries,
        retry_backoff_base_ms,
    })
}

fn check_scheme(var: &str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    if schemes.iter().any(|s| value.starts_with(s)) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected one of {schemes:?}, got {value:?}"),
        })
    }
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
