//! Exponential back-off with jitter for one-shot queries.
//!
//! The query client never retries on its own. Callers that want retries wrap
//! a call in [`retry_with_backoff`]; only transient transport failures are
//! retried.

use std::fmt::Display;
use std::future::Future;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::ResearchError;

/// Returns `true` for errors worth retrying after a back-off delay.
///
/// Timeouts, connect failures and 5xx responses are retriable. GraphQL
/// errors, missing data and decode failures are not: the same request would
/// fail the same way.
#[must_use]
pub fn is_retriable(err: &ResearchError) -> bool {
    match err {
        ResearchError::Transport(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ResearchError::Query { .. }
        | ResearchError::MissingData(_)
        | ResearchError::Deserialize { .. }
        | ResearchError::InvalidEndpoint { .. } => false,
    }
}

/// Doubling delay schedule starting at `base`, capped at [`Backoff::MAX_DELAY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
}

impl Backoff {
    pub const MAX_DELAY: Duration = Duration::from_secs(30);

    /// Multiplier range applied to every nominal delay.
    pub const JITTER: RangeInclusive<f64> = 0.75..=1.25;

    #[must_use]
    pub fn from_millis(base_ms: u64) -> Self {
        Self {
            base: Duration::from_millis(base_ms),
        }
    }

    /// Delay before the 1-based `retry`, without jitter.
    #[must_use]
    pub fn nominal(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(10);
        self.base.saturating_mul(factor).min(Self::MAX_DELAY)
    }

    /// [`Backoff::nominal`] scaled by `factor`, clamped into [`Backoff::JITTER`].
    #[must_use]
    pub fn jittered(&self, retry: u32, factor: f64) -> Duration {
        let factor = factor.clamp(*Self::JITTER.start(), *Self::JITTER.end());
        self.nominal(retry).mul_f64(factor)
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// retriable errors, sleeping `backoff_base_ms * 2^(n-1)` ±25 % before
/// retry `n`.
///
/// # Errors
///
/// Returns the first non-retriable error, or the last error once
/// `max_retries` is exhausted.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    operation: F,
) -> Result<T, ResearchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ResearchError>>,
{
    retry_when(
        Backoff::from_millis(backoff_base_ms),
        max_retries,
        is_retriable,
        operation,
    )
    .await
}

async fn retry_when<T, E, F, Fut>(
    backoff: Backoff,
    max_retries: u32,
    retriable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut retry = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if retry >= max_retries || !retriable(&err) {
            return Err(err);
        }
        retry += 1;

        let delay = backoff.jittered(retry, rand::random_range(Backoff::JITTER));
        tracing::warn!(
            retry,
            max_retries,
            ?delay,
            error = %err,
            "transient query error; backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
