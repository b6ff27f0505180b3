//! Keyword research client: one-shot analysis queries, the streamed long-tail
//! subscription, and the session state that ties them together.

pub mod aggregator;
pub mod cart;
pub mod client;
pub mod error;
pub mod explore;
pub mod format;
pub mod protocol;
pub mod queries;
pub mod retry;
pub mod session;
pub mod subscription;
pub mod suggest;
pub mod types;

pub use aggregator::LongTailAggregate;
pub use cart::{CartEvent, SelectionSet};
pub use client::{GraphqlClient, KeywordAnalyzer, SuggestionSource};
pub use error::{ResearchError, SubscriptionError};
pub use explore::{TrendingKeyword, TrendingVideo};
pub use format::format_volume;
pub use protocol::{ChannelState, Frame};
pub use session::{SearchSession, SessionSnapshot};
pub use subscription::{LongTailObserver, LongTailSubscriber, SubscriptionChannel, SubscriptionHandle};
pub use suggest::Autocompleter;
pub use types::{
    AnalysisResult, GraphqlError, Grade, LongTailCandidate, PartialUpdateEnvelope, SelectionItem,
    SuggestionSet,
};
