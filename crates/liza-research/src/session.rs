//! Search session controller.
//!
//! A [`SearchSession`] runs the analyze-then-subscribe pipeline for one
//! keyword at a time. Every `search` call bumps a generation counter under the
//! session mutex and cancels the previous subscription before anything else
//! happens; every late callback re-checks its generation under the same mutex
//! before it touches state. A superseded search therefore can never write into
//! the state of the search that replaced it, including frames already in
//! flight when the cancel was issued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use liza_core::{KeyValueStore, SearchHistory};
use tokio::sync::watch;

use crate::aggregator::LongTailAggregate;
use crate::client::KeywordAnalyzer;
use crate::error::{ResearchError, SubscriptionError};
use crate::subscription::{LongTailObserver, LongTailSubscriber, SubscriptionHandle};
use crate::types::{AnalysisResult, PartialUpdateEnvelope};

/// Default upper bound on long-tail candidates requested per search.
pub const DEFAULT_MAX_LONG_TAILS: u32 = 15;

#[derive(Debug, Default)]
struct SessionState {
    generation: u64,
    keyword: Option<String>,
    result: Option<AnalysisResult>,
    aggregate: LongTailAggregate,
    analyzing: bool,
    long_tail_loading: bool,
    error: Option<Arc<ResearchError>>,
    stream_error: Option<Arc<SubscriptionError>>,
    handle: Option<SubscriptionHandle>,
}

impl SessionState {
    fn begin(&mut self, keyword: &str) -> u64 {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
        self.generation += 1;
        self.keyword = Some(keyword.to_string());
        self.result = None;
        self.aggregate.reset();
        self.analyzing = true;
        self.long_tail_loading = false;
        self.error = None;
        self.stream_error = None;
        self.generation
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<SessionState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    /// Runs `f` only if `generation` is still current. The check and the
    /// mutation happen under one lock.
    fn with_current(&self, generation: u64, f: impl FnOnce(&mut SessionState)) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            tracing::trace!(
                generation,
                current = state.generation,
                "dropping callback from superseded search"
            );
            return false;
        }
        f(&mut state);
        drop(state);
        self.notify();
        true
    }
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub keyword: Option<String>,
    pub result: Option<AnalysisResult>,
    pub aggregate: LongTailAggregate,
    pub analyzing: bool,
    pub long_tail_loading: bool,
    /// Set when `analyze` failed; no subscription was opened.
    pub error: Option<Arc<ResearchError>>,
    /// Set when the long-tail stream failed. Candidates already aggregated
    /// are kept.
    pub stream_error: Option<Arc<SubscriptionError>>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.analyzing || self.long_tail_loading
    }
}

struct SessionObserver {
    generation: u64,
    shared: Arc<Shared>,
}

impl LongTailObserver for SessionObserver {
    fn on_update(&self, update: PartialUpdateEnvelope) {
        self.shared
            .with_current(self.generation, |s| s.aggregate.apply(&update));
    }

    fn on_complete(&self) {
        let applied = self.shared.with_current(self.generation, |s| {
            s.long_tail_loading = false;
        });
        if applied {
            tracing::info!(generation = self.generation, "long-tail analysis complete");
        }
    }

    fn on_error(&self, error: SubscriptionError) {
        tracing::warn!(generation = self.generation, error = %error, "long-tail stream failed");
        self.shared.with_current(self.generation, |s| {
            s.long_tail_loading = false;
            s.stream_error = Some(Arc::new(error));
        });
    }
}

/// Drives analyze + long-tail subscription for one keyword at a time.
///
/// Cloning shares the same session.
#[derive(Clone)]
pub struct SearchSession {
    analyzer: Arc<dyn KeywordAnalyzer>,
    subscriber: Arc<dyn LongTailSubscriber>,
    max_long_tails: u32,
    history: Option<Arc<dyn KeyValueStore>>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("max_long_tails", &self.max_long_tails)
            .field("history", &self.history.is_some())
            .field("state", &self.shared.state)
            .finish_non_exhaustive()
    }
}

impl SearchSession {
    #[must_use]
    pub fn new(analyzer: Arc<dyn KeywordAnalyzer>, subscriber: Arc<dyn LongTailSubscriber>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            analyzer,
            subscriber,
            max_long_tails: DEFAULT_MAX_LONG_TAILS,
            history: None,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::default()),
                revision,
            }),
        }
    }

    #[must_use]
    pub fn with_max_long_tails(mut self, max_long_tails: u32) -> Self {
        self.max_long_tails = max_long_tails;
        self
    }

    /// Records every successful search in the search history kept in `store`.
    #[must_use]
    pub fn with_history(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Starts a new search, replacing whatever ran before.
    ///
    /// Returns once the analysis has finished and, on success, the long-tail
    /// subscription has been opened. Progress and failures are visible
    /// through [`SearchSession::snapshot`]. Blank keywords are ignored.
    pub async fn search(&self, keyword: &str) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            tracing::debug!("ignoring blank search");
            return;
        }

        let generation = self.shared.lock().begin(keyword);
        self.shared.notify();
        tracing::info!(keyword, generation, "search started");

        let outcome = self.analyzer.analyze(keyword, self.max_long_tails).await;

        let analyzed = {
            let mut state = self.shared.lock();
            if state.generation != generation {
                tracing::debug!(keyword, generation, "analysis superseded; discarding");
                return;
            }
            state.analyzing = false;
            match outcome {
                Ok(result) => {
                    state.result = Some(result);
                    state.long_tail_loading = true;
                    true
                }
                Err(e) => {
                    tracing::warn!(keyword, error = %e, "analysis failed");
                    state.error = Some(Arc::new(e));
                    false
                }
            }
        };
        self.shared.notify();
        if !analyzed {
            return;
        }

        let observer = Arc::new(SessionObserver {
            generation,
            shared: Arc::clone(&self.shared),
        });
        let handle = self.subscriber.subscribe(keyword, observer);
        {
            let mut state = self.shared.lock();
            if state.generation != generation {
                handle.cancel();
                return;
            }
            state.handle = Some(handle);
        }

        self.record_history(keyword);
    }

    /// Runs [`SearchSession::search`] on a background task.
    pub fn spawn_search(&self, keyword: &str) -> tokio::task::JoinHandle<()> {
        let session = self.clone();
        let keyword = keyword.to_string();
        tokio::spawn(async move { session.search(&keyword).await })
    }

    /// Cancels the running search, if any. Results gathered so far are kept.
    pub fn cancel(&self) {
        {
            let mut state = self.shared.lock();
            if let Some(handle) = state.handle.take() {
                handle.cancel();
            }
            // An in-flight analysis becomes stale.
            state.generation += 1;
            state.analyzing = false;
            state.long_tail_loading = false;
        }
        self.shared.notify();
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.lock();
        SessionSnapshot {
            generation: state.generation,
            keyword: state.keyword.clone(),
            result: state.result.clone(),
            aggregate: state.aggregate.clone(),
            analyzing: state.analyzing,
            long_tail_loading: state.long_tail_loading,
            error: state.error.clone(),
            stream_error: state.stream_error.clone(),
        }
    }

    /// Receiver whose value changes after every state mutation.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Waits until neither the analysis nor the long-tail stream is running.
    pub async fn wait_idle(&self) -> SessionSnapshot {
        let mut changes = self.changes();
        loop {
            let snapshot = self.snapshot();
            if !snapshot.is_loading() {
                return snapshot;
            }
            if changes.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    fn record_history(&self, keyword: &str) {
        let Some(store) = &self.history else {
            return;
        };
        if let Err(e) = SearchHistory::new(store.as_ref()).record(keyword) {
            tracing::warn!(keyword, error = %e, "failed to record search history");
        }
    }
}
