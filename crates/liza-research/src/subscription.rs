//! Websocket driver for the long-tail subscription.
//!
//! [`SubscriptionChannel::subscribe`] spawns one task per subscription. The
//! task feeds transport events into [`Protocol`] and carries out the returned
//! actions. Observer callbacks are gated on the [`SubscriptionHandle`]: once
//! `cancel` returns, no further callback starts, and completion or failure is
//! reported at most once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::SubscriptionError;
use crate::protocol::{Action, ChannelEvent, ChannelState, Protocol, GRAPHQL_TRANSPORT_WS};
use crate::types::PartialUpdateEnvelope;

/// Receives the output of one subscription.
///
/// Callbacks run on the channel's task and must not block.
pub trait LongTailObserver: Send + Sync {
    fn on_update(&self, update: PartialUpdateEnvelope);
    fn on_complete(&self);
    fn on_error(&self, error: SubscriptionError);
}

/// Opens long-tail subscriptions. Implemented by [`SubscriptionChannel`];
/// the session controller depends only on this trait.
pub trait LongTailSubscriber: Send + Sync {
    fn subscribe(
        &self,
        parent_keyword: &str,
        observer: Arc<dyn LongTailObserver>,
    ) -> SubscriptionHandle;
}

#[derive(Debug)]
struct HandleInner {
    active: AtomicBool,
    cancel_tx: watch::Sender<bool>,
}

/// Cancellation handle for one subscription.
///
/// Cloning shares the same subscription. `cancel` is idempotent and safe to
/// call after natural completion.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

impl SubscriptionHandle {
    /// Creates a handle that is not bound to any transport, together with the
    /// receiver that flips to `true` on cancellation. Used by
    /// [`LongTailSubscriber`] implementations.
    #[must_use]
    pub fn detached() -> (Self, watch::Receiver<bool>) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = Self {
            inner: Arc::new(HandleInner {
                active: AtomicBool::new(true),
                cancel_tx,
            }),
        };
        (handle, cancel_rx)
    }

    /// Stops delivery immediately and asks the driver to send `complete` and
    /// close the transport if it is still open.
    pub fn cancel(&self) {
        if self.inner.active.swap(false, Ordering::SeqCst) {
            tracing::debug!("subscription cancelled");
        }
        self.inner.cancel_tx.send_replace(true);
    }

    /// `false` once cancelled, completed, or failed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel_tx.borrow()
    }

    /// Delivers `event` unless the handle has gone inactive. Terminal events
    /// deactivate the handle, so at most one of them is ever delivered.
    pub fn dispatch(&self, observer: &dyn LongTailObserver, event: ChannelEvent) {
        match event {
            ChannelEvent::Update(update) => {
                if self.is_active() {
                    observer.on_update(update);
                } else {
                    tracing::trace!("dropping update for inactive subscription");
                }
            }
            ChannelEvent::Completed => {
                if self.inner.active.swap(false, Ordering::SeqCst) {
                    observer.on_complete();
                }
            }
            ChannelEvent::Failed(error) => {
                if self.inner.active.swap(false, Ordering::SeqCst) {
                    observer.on_error(error);
                } else {
                    tracing::debug!(error = %error, "suppressing error for inactive subscription");
                }
            }
        }
    }

    fn deactivate(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
    }
}

/// Opens `graphql-transport-ws` connections to the analysis API.
#[derive(Debug, Clone)]
pub struct SubscriptionChannel {
    ws_url: String,
    ack_timeout: Duration,
}

impl SubscriptionChannel {
    pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(ws_url: &str) -> Self {
        Self {
            ws_url: ws_url.to_string(),
            ack_timeout: Self::DEFAULT_ACK_TIMEOUT,
        }
    }

    #[must_use]
    pub fn from_config(config: &liza_core::AppConfig) -> Self {
        Self::new(&config.ws_url).with_ack_timeout(config.ack_timeout())
    }

    #[must_use]
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    async fn connect(
        &self,
    ) -> Result<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        SubscriptionError,
    > {
        let mut request = self.ws_url.as_str().into_client_request().map_err(|e| {
            SubscriptionError::InvalidEndpoint {
                url: self.ws_url.clone(),
                reason: e.to_string(),
            }
        })?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(GRAPHQL_TRANSPORT_WS),
        );
        let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }
}

impl LongTailSubscriber for SubscriptionChannel {
    /// Spawns the channel task. Must be called from within a Tokio runtime.
    fn subscribe(
        &self,
        parent_keyword: &str,
        observer: Arc<dyn LongTailObserver>,
    ) -> SubscriptionHandle {
        let (handle, mut cancel_rx) = SubscriptionHandle::detached();
        let channel = self.clone();
        let task_handle = handle.clone();
        let mut protocol = Protocol::new(parent_keyword);

        tokio::spawn(async move {
            tracing::debug!(parent_keyword = %protocol.parent_keyword(), url = %channel.ws_url, "opening subscription");
            let connected = tokio::select! {
                result = channel.connect() => Some(result),
                () = async {
                    let _ = cancel_rx.wait_for(|c| *c).await;
                } => None,
            };
            match connected {
                None => {
                    protocol.cancel();
                }
                Some(Err(e)) => {
                    for action in protocol.on_failure(e) {
                        if let Action::Emit(event) = action {
                            task_handle.dispatch(observer.as_ref(), event);
                        }
                    }
                }
                Some(Ok(ws)) => {
                    drive(
                        ws,
                        &mut protocol,
                        observer.as_ref(),
                        &task_handle,
                        cancel_rx,
                        channel.ack_timeout,
                    )
                    .await;
                }
            }
            task_handle.deactivate();
            tracing::debug!(state = ?protocol.state(), "subscription task finished");
        });

        handle
    }
}

/// Runs the protocol over an open websocket until a terminal state.
pub(crate) async fn drive<S>(
    mut ws: S,
    protocol: &mut Protocol,
    observer: &dyn LongTailObserver,
    handle: &SubscriptionHandle,
    mut cancel_rx: watch::Receiver<bool>,
    ack_timeout: Duration,
) where
    S: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin,
{
    let ack_deadline = tokio::time::sleep(ack_timeout);
    tokio::pin!(ack_deadline);
    let mut cancel_open = true;

    // Cancelled while the connection was being established.
    let mut actions = if *cancel_rx.borrow_and_update() {
        protocol.cancel()
    } else {
        protocol.on_open()
    };
    loop {
        if !perform(&mut ws, protocol, observer, handle, actions).await {
            break;
        }
        if protocol.state().is_terminal() {
            break;
        }

        actions = tokio::select! {
            biased;
            changed = cancel_rx.changed(), if cancel_open => {
                match changed {
                    Ok(()) if *cancel_rx.borrow() => protocol.cancel(),
                    Ok(()) => Vec::new(),
                    // Sender dropped; stop polling it.
                    Err(_) => {
                        cancel_open = false;
                        Vec::new()
                    }
                }
            }
            () = &mut ack_deadline, if protocol.state() == ChannelState::AwaitingAck => {
                protocol.on_ack_timeout(ack_timeout)
            }
            message = ws.next() => match message {
                Some(Ok(Message::Text(text))) => protocol.on_text(&text),
                Some(Ok(Message::Close(_))) | None => protocol.on_close(),
                Some(Ok(_)) => Vec::new(),
                Some(Err(e)) if is_disconnect(&e) => protocol.on_close(),
                Some(Err(e)) => protocol.on_failure(e.into()),
            },
        };
    }
}

/// Executes `actions` in order. Returns `false` once the transport is closed.
async fn perform<S>(
    ws: &mut S,
    protocol: &mut Protocol,
    observer: &dyn LongTailObserver,
    handle: &SubscriptionHandle,
    actions: Vec<Action>,
) -> bool
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    for action in actions {
        match action {
            Action::Emit(event) => handle.dispatch(observer, event),
            Action::Send(frame) => {
                if let Err(e) = ws.send(Message::Text(frame.to_text())).await {
                    if protocol.state().is_terminal() {
                        tracing::debug!(error = %e, "send failed while shutting down");
                        continue;
                    }
                    for follow_up in protocol.on_failure(e.into()) {
                        if let Action::Emit(event) = follow_up {
                            handle.dispatch(observer, event);
                        }
                    }
                    return false;
                }
            }
            Action::Close => {
                if let Err(e) = SinkExt::close(ws).await {
                    tracing::debug!(error = %e, "websocket close failed");
                }
                return false;
            }
        }
    }
    true
}

fn is_disconnect(err: &tungstenite::Error) -> bool {
    use tungstenite::error::ProtocolError;
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}
