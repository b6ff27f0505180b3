//! Folds long-tail envelopes into the current candidate set.

use crate::types::{LongTailCandidate, PartialUpdateEnvelope};

/// Working set for one parent keyword.
///
/// Every envelope's `allResults` snapshot replaces the candidate list
/// wholesale; the backend de-duplicates, so no merging happens here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTailAggregate {
    analyzed_count: u32,
    total_count: u32,
    candidates: Vec<LongTailCandidate>,
    latest: Option<LongTailCandidate>,
    finished: bool,
}

impl LongTailAggregate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one envelope.
    ///
    /// An envelope without `allResults` updates the counters only and keeps
    /// the previous snapshot.
    pub fn apply(&mut self, envelope: &PartialUpdateEnvelope) {
        if envelope.analyzed_count < self.analyzed_count {
            tracing::warn!(
                parent_keyword = %envelope.parent_keyword,
                previous = self.analyzed_count,
                received = envelope.analyzed_count,
                "analyzed count went backwards"
            );
        }
        if let Some(all) = &envelope.all_results {
            self.candidates.clone_from(all);
        }
        if let Some(latest) = envelope.latest() {
            self.latest = Some(latest);
        }
        self.analyzed_count = envelope.analyzed_count;
        self.total_count = envelope.total_count;
        if envelope.is_complete {
            self.finished = true;
        }
    }

    #[must_use]
    pub fn analyzed_count(&self) -> u32 {
        self.analyzed_count
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    /// Candidates in backend order. No sort order is implied.
    #[must_use]
    pub fn candidates(&self) -> &[LongTailCandidate] {
        &self.candidates
    }

    /// Splits the candidates into grade A/B and everything else.
    #[must_use]
    pub fn partition(&self) -> (Vec<&LongTailCandidate>, Vec<&LongTailCandidate>) {
        self.candidates.iter().partition(|c| c.grade.is_high())
    }

    #[must_use]
    pub fn high_grade(&self) -> Vec<&LongTailCandidate> {
        self.partition().0
    }

    #[must_use]
    pub fn other(&self) -> Vec<&LongTailCandidate> {
        self.partition().1
    }

    /// The keyword analysed most recently, if any envelope named one.
    #[must_use]
    pub fn latest(&self) -> Option<&LongTailCandidate> {
        self.latest.as_ref()
    }

    /// `true` once an envelope with `isComplete` has been applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
