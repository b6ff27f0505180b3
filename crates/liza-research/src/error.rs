use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::types::GraphqlError;

/// Errors returned by the one-shot GraphQL query client.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Network, TLS or non-2xx HTTP failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a well-formed GraphQL `errors` list.
    ///
    /// Only the first message is surfaced through `Display`; the full list is
    /// kept in `errors`.
    #[error("query error: {message}")]
    Query {
        message: String,
        errors: Vec<GraphqlError>,
    },

    /// The response carried neither errors nor the requested field.
    #[error("response contained no data for {0}")]
    MissingData(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl ResearchError {
    /// Builds a [`ResearchError::Query`] from a non-empty GraphQL error list.
    pub(crate) fn from_graphql_errors(errors: Vec<GraphqlError>) -> Self {
        let message = errors
            .first()
            .map_or_else(|| "unknown error".to_string(), |e| e.message.clone());
        Self::Query { message, errors }
    }
}

/// Errors that terminate a long-tail subscription channel.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The websocket could not be opened or failed mid-stream.
    #[error("websocket transport error: {0}")]
    Transport(Box<tungstenite::Error>),

    /// The server sent an `error` frame.
    #[error("subscription error: {message}")]
    Server {
        message: String,
        errors: Vec<GraphqlError>,
    },

    /// The transport closed before `connection_ack`; the subscription never
    /// became active.
    #[error("websocket connection closed before acknowledgement")]
    PrematureClose,

    /// The server never acknowledged the connection.
    #[error("no connection_ack within {0:?}")]
    AckTimeout(Duration),

    /// The transport closed after the subscription started but before the
    /// stream signalled completion.
    #[error("websocket connection closed before the subscription completed")]
    ClosedBeforeComplete,

    #[error("invalid subscription endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl From<tungstenite::Error> for SubscriptionError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl SubscriptionError {
    pub(crate) const GENERIC_SERVER_MESSAGE: &'static str = "Subscription error";

    pub(crate) fn from_error_frame(payload: serde_json::Value) -> Self {
        let entries = match payload {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Null => Vec::new(),
            other => vec![other],
        };
        let errors: Vec<GraphqlError> = entries
            .into_iter()
            .map(GraphqlError::from_payload_entry)
            .collect();
        let message = errors
            .first()
            .map(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| Self::GENERIC_SERVER_MESSAGE.to_string());
        Self::Server { message, errors }
    }

    /// `true` when the subscription never reached the streaming phase.
    #[must_use]
    pub fn never_started(&self) -> bool {
        matches!(
            self,
            Self::PrematureClose | Self::AckTimeout(_) | Self::InvalidEndpoint { .. }
        )
    }
}
