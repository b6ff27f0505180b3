//! `graphql-transport-ws` frames and the sans-IO state machine for the
//! long-tail subscription.
//!
//! [`Protocol`] consumes transport events (open, text frame, close, failure,
//! ack timeout, cancel) and returns the [`Action`]s the driver must perform.
//! It never touches a socket, so every transition is unit-testable.
//!
//! ```text
//! Connecting --open--> AwaitingAck --connection_ack--> Subscribed
//! Subscribed --next--> Subscribed (emit update)
//! Subscribed --complete | isComplete--> Completed
//! any --error frame | transport failure | premature close--> Errored
//! any --cancel--> Cancelled
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::SubscriptionError;
use crate::queries::{LONG_TAIL_FIELD, LONG_TAIL_SUBSCRIPTION};
use crate::types::{GraphqlError, PartialUpdateEnvelope};

/// Websocket sub-protocol name sent in `Sec-WebSocket-Protocol`.
pub const GRAPHQL_TRANSPORT_WS: &str = "graphql-transport-ws";

/// Every channel carries exactly one subscription, so a fixed id suffices.
/// Concurrent subscriptions on one connection would need per-call ids.
pub const SUBSCRIPTION_ID: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribePayload {
    pub query: String,
    pub variables: serde_json::Value,
}

/// Result payload of a `next` frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphqlError>>,
}

/// A single `graphql-transport-ws` message, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    ConnectionAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Subscribe {
        id: String,
        payload: SubscribePayload,
    },
    Next {
        id: String,
        payload: ExecutionResult,
    },
    Error {
        #[serde(default)]
        id: Option<String>,
        /// Usually a list of GraphQL errors; servers also send a bare object
        /// or nothing at all.
        #[serde(default)]
        payload: serde_json::Value,
    },
    Complete {
        #[serde(default)]
        id: Option<String>,
    },
}

impl Frame {
    /// The subscribe frame for `parent_keyword`.
    #[must_use]
    pub fn subscribe(parent_keyword: &str) -> Self {
        Frame::Subscribe {
            id: SUBSCRIPTION_ID.to_string(),
            payload: SubscribePayload {
                query: LONG_TAIL_SUBSCRIPTION.to_string(),
                variables: json!({ "parentKeyword": parent_keyword }),
            },
        }
    }

    #[must_use]
    pub fn complete() -> Self {
        Frame::Complete {
            id: Some(SUBSCRIPTION_ID.to_string()),
        }
    }

    /// Serialises the frame as the JSON text message sent on the wire.
    #[must_use]
    pub fn to_text(&self) -> String {
        // Frame contains only strings and JSON values; serialisation cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    AwaitingAck,
    Subscribed,
    Completed,
    Errored,
    Cancelled,
}

impl ChannelState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ChannelState::Completed | ChannelState::Errored | ChannelState::Cancelled
        )
    }

    /// `true` while the websocket is open from the protocol's point of view.
    #[must_use]
    pub fn transport_open(self) -> bool {
        matches!(self, ChannelState::AwaitingAck | ChannelState::Subscribed)
    }
}

/// What the channel reports to its observer.
#[derive(Debug)]
pub enum ChannelEvent {
    Update(PartialUpdateEnvelope),
    Completed,
    Failed(SubscriptionError),
}

/// Work for the driver, in order.
#[derive(Debug)]
pub enum Action {
    Send(Frame),
    Emit(ChannelEvent),
    Close,
}

#[derive(Debug)]
pub struct Protocol {
    parent_keyword: String,
    state: ChannelState,
}

impl Protocol {
    #[must_use]
    pub fn new(parent_keyword: &str) -> Self {
        Self {
            parent_keyword: parent_keyword.to_string(),
            state: ChannelState::Connecting,
        }
    }

    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.state
    }

    #[must_use]
    pub fn parent_keyword(&self) -> &str {
        &self.parent_keyword
    }

    /// Transport opened: send `connection_init`.
    pub fn on_open(&mut self) -> Vec<Action> {
        if self.state != ChannelState::Connecting {
            return Vec::new();
        }
        self.state = ChannelState::AwaitingAck;
        vec![Action::Send(Frame::ConnectionInit { payload: None })]
    }

    /// A text message arrived. Unparseable messages are logged and ignored.
    pub fn on_text(&mut self, text: &str) -> Vec<Action> {
        match serde_json::from_str::<Frame>(text) {
            Ok(frame) => self.on_frame(frame),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unrecognised subscription frame");
                Vec::new()
            }
        }
    }

    pub fn on_frame(&mut self, frame: Frame) -> Vec<Action> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        match (self.state, frame) {
            (_, Frame::Ping { .. }) => vec![Action::Send(Frame::Pong { payload: None })],
            (ChannelState::AwaitingAck, Frame::ConnectionAck { .. }) => {
                self.state = ChannelState::Subscribed;
                tracing::debug!(parent_keyword = %self.parent_keyword, "connection acknowledged; subscribing");
                vec![Action::Send(Frame::subscribe(&self.parent_keyword))]
            }
            (ChannelState::Subscribed, Frame::Next { id, payload }) if id == SUBSCRIPTION_ID => {
                self.on_next(payload)
            }
            (ChannelState::AwaitingAck | ChannelState::Subscribed, Frame::Error { id, payload })
                if id.as_deref().map_or(true, |i| i == SUBSCRIPTION_ID) =>
            {
                self.fail(SubscriptionError::from_error_frame(payload))
            }
            (ChannelState::Subscribed, Frame::Complete { id })
                if id.as_deref().map_or(true, |i| i == SUBSCRIPTION_ID) =>
            {
                self.state = ChannelState::Completed;
                vec![Action::Emit(ChannelEvent::Completed), Action::Close]
            }
            (state, frame) => {
                tracing::debug!(?state, ?frame, "ignoring out-of-sequence subscription frame");
                Vec::new()
            }
        }
    }

    fn on_next(&mut self, payload: ExecutionResult) -> Vec<Action> {
        let Some(value) = payload
            .data
            .and_then(|mut d| d.get_mut(LONG_TAIL_FIELD).map(serde_json::Value::take))
            .filter(|v| !v.is_null())
        else {
            if let Some(errors) = payload.errors.filter(|e| !e.is_empty()) {
                tracing::warn!(
                    message = %errors[0].message,
                    "next frame carried errors without data"
                );
            }
            return Vec::new();
        };

        let update: PartialUpdateEnvelope = match serde_json::from_value(value) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed long-tail update");
                return Vec::new();
            }
        };

        if update.is_complete {
            self.state = ChannelState::Completed;
            vec![
                Action::Emit(ChannelEvent::Update(update)),
                Action::Emit(ChannelEvent::Completed),
                Action::Send(Frame::complete()),
                Action::Close,
            ]
        } else {
            vec![Action::Emit(ChannelEvent::Update(update))]
        }
    }

    /// The transport closed (close frame or end of stream).
    pub fn on_close(&mut self) -> Vec<Action> {
        match self.state {
            ChannelState::Connecting | ChannelState::AwaitingAck => {
                self.fail(SubscriptionError::PrematureClose)
            }
            ChannelState::Subscribed => self.fail(SubscriptionError::ClosedBeforeComplete),
            _ => Vec::new(),
        }
    }

    /// The transport failed (connect error, I/O error, protocol violation).
    pub fn on_failure(&mut self, error: SubscriptionError) -> Vec<Action> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        self.fail(error)
    }

    /// No `connection_ack` arrived in time.
    pub fn on_ack_timeout(&mut self, waited: std::time::Duration) -> Vec<Action> {
        if self.state != ChannelState::AwaitingAck {
            return Vec::new();
        }
        self.fail(SubscriptionError::AckTimeout(waited))
    }

    /// Local cancellation. Sends `complete` only if the transport is open.
    pub fn cancel(&mut self) -> Vec<Action> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        let was_open = self.state.transport_open();
        self.state = ChannelState::Cancelled;
        if was_open {
            vec![Action::Send(Frame::complete()), Action::Close]
        } else {
            vec![Action::Close]
        }
    }

    fn fail(&mut self, error: SubscriptionError) -> Vec<Action> {
        let was_open = self.state.transport_open();
        self.state = ChannelState::Errored;
        let mut actions = vec![Action::Emit(ChannelEvent::Failed(error))];
        if was_open {
            actions.push(Action::Close);
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribed() -> Protocol {
        let mut p = Protocol::new("youtube seo");
        p.on_open();
        p.on_text(r#"{"type":"connection_ack"}"#);
        assert_eq!(p.state(), ChannelState::Subscribed);
        p
    }

    fn next_text(analyzed: u32, total: u32, complete: bool) -> String {
        json!({
            "id": "1",
            "type": "next",
            "payload": { "data": { "onLongTailAnalyzed": {
                "parentKeyword": "youtube seo",
                "isComplete": complete,
                "analyzedCount": analyzed,
                "totalCount": total,
                "allResults": []
            }}}
        })
        .to_string()
    }

    #[test]
    fn open_sends_connection_init() {
        let mut p = Protocol::new("seo");
        let actions = p.on_open();
        assert_eq!(p.state(), ChannelState::AwaitingAck);
        assert!(matches!(
            actions.as_slice(),
            [Action::Send(Frame::ConnectionInit { payload: None })]
        ));
        assert_eq!(
            Frame::ConnectionInit { payload: None }.to_text(),
            r#"{"type":"connection_init"}"#
        );
    }

    #[test]
    fn ack_sends_subscribe_with_parent_keyword() {
        let mut p = Protocol::new("youtube seo");
        p.on_open();
        let actions = p.on_text(r#"{"type":"connection_ack"}"#);
        let [Action::Send(Frame::Subscribe { id, payload })] = actions.as_slice() else {
            panic!("expected a single subscribe frame, got {actions:?}");
        };
        assert_eq!(id, "1");
        assert_eq!(payload.variables["parentKeyword"], "youtube seo");
        assert!(payload.query.contains("onLongTailAnalyzed"));
    }

    #[test]
    fn next_before_ack_is_ignored() {
        let mut p = Protocol::new("youtube seo");
        p.on_open();
        assert!(p.on_text(&next_text(1, 15, false)).is_empty());
        assert_eq!(p.state(), ChannelState::AwaitingAck);
    }

    #[test]
    fn next_emits_update() {
        let mut p = subscribed();
        let actions = p.on_text(&next_text(3, 15, false));
        let [Action::Emit(ChannelEvent::Update(u))] = actions.as_slice() else {
            panic!("expected one update, got {actions:?}");
        };
        assert_eq!(u.analyzed_count, 3);
        assert_eq!(p.state(), ChannelState::Subscribed);
    }

    #[test]
    fn complete_flag_emits_update_then_completion_and_closes() {
        let mut p = subscribed();
        let actions = p.on_text(&next_text(15, 15, true));
        assert!(matches!(
            actions.as_slice(),
            [
                Action::Emit(ChannelEvent::Update(_)),
                Action::Emit(ChannelEvent::Completed),
                Action::Send(Frame::Complete { .. }),
                Action::Close
            ]
        ));
        assert_eq!(p.state(), ChannelState::Completed);
    }

    #[test]
    fn nothing_is_emitted_after_completion() {
        let mut p = subscribed();
        p.on_text(&next_text(15, 15, true));
        assert!(p.on_text(&next_text(15, 15, true)).is_empty());
        assert!(p.on_text(r#"{"type":"complete","id":"1"}"#).is_empty());
        assert!(p.on_close().is_empty());
    }

    #[test]
    fn server_complete_frame_completes() {
        let mut p = subscribed();
        let actions = p.on_text(r#"{"type":"complete","id":"1"}"#);
        assert!(matches!(
            actions.as_slice(),
            [Action::Emit(ChannelEvent::Completed), Action::Close]
        ));
    }

    #[test]
    fn error_frame_surfaces_first_message() {
        let mut p = subscribed();
        let actions = p.on_text(
            r#"{"type":"error","id":"1","payload":[{"message":"quota exceeded"},{"message":"other"}]}"#,
        );
        let [Action::Emit(ChannelEvent::Failed(SubscriptionError::Server { message, errors })), Action::Close] =
            actions.as_slice()
        else {
            panic!("expected failure, got {actions:?}");
        };
        assert_eq!(message, "quota exceeded");
        assert_eq!(errors.len(), 2);
        assert_eq!(p.state(), ChannelState::Errored);
    }

    #[test]
    fn error_frame_without_messages_uses_generic_message() {
        let mut p = subscribed();
        let actions = p.on_text(r#"{"type":"error","id":"1","payload":[]}"#);
        let [Action::Emit(ChannelEvent::Failed(err)), Action::Close] = actions.as_slice() else {
            panic!("expected failure, got {actions:?}");
        };
        assert_eq!(err.to_string(), "subscription error: Subscription error");
    }

    #[test]
    fn error_entry_without_message_still_fails_the_channel() {
        let mut p = subscribed();
        let actions = p.on_text(
            r#"{"type":"error","id":"1","payload":[{"extensions":{"code":"RATE_LIMITED"}}]}"#,
        );
        let [Action::Emit(ChannelEvent::Failed(SubscriptionError::Server { message, errors })), Action::Close] =
            actions.as_slice()
        else {
            panic!("expected failure, got {actions:?}");
        };
        assert_eq!(message, "Subscription error");
        assert_eq!(errors.len(), 1);
        assert_eq!(p.state(), ChannelState::Errored);
    }

    #[test]
    fn error_payload_as_single_object_is_accepted() {
        let mut p = subscribed();
        let actions = p.on_text(r#"{"type":"error","id":"1","payload":{"message":"boom"}}"#);
        let [Action::Emit(ChannelEvent::Failed(SubscriptionError::Server { message, .. })), Action::Close] =
            actions.as_slice()
        else {
            panic!("expected failure, got {actions:?}");
        };
        assert_eq!(message, "boom");
        assert_eq!(p.state(), ChannelState::Errored);
    }

    #[test]
    fn error_frame_with_no_payload_uses_generic_message() {
        let mut p = subscribed();
        let actions = p.on_text(r#"{"type":"error","id":"1"}"#);
        assert!(matches!(
            actions.as_slice(),
            [Action::Emit(ChannelEvent::Failed(SubscriptionError::Server { message, .. })), Action::Close]
                if message == "Subscription error"
        ));
    }

    #[test]
    fn close_before_ack_is_premature() {
        let mut p = Protocol::new("seo");
        p.on_open();
        let actions = p.on_close();
        assert!(matches!(
            actions.as_slice(),
            [Action::Emit(ChannelEvent::Failed(SubscriptionError::PrematureClose)), Action::Close]
        ));
    }

    #[test]
    fn close_after_ack_is_closed_before_complete() {
        let mut p = subscribed();
        let actions = p.on_close();
        assert!(matches!(
            actions.as_slice(),
            [
                Action::Emit(ChannelEvent::Failed(SubscriptionError::ClosedBeforeComplete)),
                Action::Close
            ]
        ));
    }

    #[test]
    fn cancel_when_open_sends_complete() {
        let mut p = subscribed();
        let actions = p.cancel();
        assert!(matches!(
            actions.as_slice(),
            [Action::Send(Frame::Complete { id: Some(_) }), Action::Close]
        ));
        assert_eq!(p.state(), ChannelState::Cancelled);
        assert!(p.cancel().is_empty(), "cancel is idempotent");
    }

    #[test]
    fn cancel_while_connecting_sends_nothing() {
        let mut p = Protocol::new("seo");
        assert!(matches!(p.cancel().as_slice(), [Action::Close]));
        assert!(p.on_open().is_empty());
    }

    #[test]
    fn cancel_after_completion_is_noop() {
        let mut p = subscribed();
        p.on_text(r#"{"type":"complete","id":"1"}"#);
        assert!(p.cancel().is_empty());
        assert_eq!(p.state(), ChannelState::Completed);
    }

    #[test]
    fn ping_is_answered_with_pong() {
        let mut p = subscribed();
        let actions = p.on_text(r#"{"type":"ping"}"#);
        assert!(matches!(
            actions.as_slice(),
            [Action::Send(Frame::Pong { payload: None })]
        ));
    }

    #[test]
    fn ack_timeout_only_applies_while_awaiting_ack() {
        let mut p = subscribed();
        assert!(p.on_ack_timeout(std::time::Duration::from_secs(10)).is_empty());

        let mut q = Protocol::new("seo");
        q.on_open();
        let actions = q.on_ack_timeout(std::time::Duration::from_secs(10));
        assert!(matches!(
            actions.as_slice(),
            [Action::Emit(ChannelEvent::Failed(SubscriptionError::AckTimeout(_))), Action::Close]
        ));
    }

    #[test]
    fn malformed_frames_are_ignored() {
        let mut p = subscribed();
        assert!(p.on_text("not json").is_empty());
        assert!(p.on_text(r#"{"type":"mystery"}"#).is_empty());
        let bad_payload = json!({
            "id": "1", "type": "next",
            "payload": { "data": { "onLongTailAnalyzed": { "parentKeyword": "seo" } } }
        });
        assert!(p.on_text(&bad_payload.to_string()).is_empty());
        assert_eq!(p.state(), ChannelState::Subscribed);
    }

    #[test]
    fn frames_for_other_ids_are_ignored() {
        let mut p = subscribed();
        let other = next_text(1, 15, false).replace(r#""id":"1""#, r#""id":"2""#);
        assert!(p.on_text(&other).is_empty());
    }
}
