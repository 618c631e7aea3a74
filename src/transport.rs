//! The single WebSocket connection to the chat backend.
//!
//! The socket itself lives on a spawned task: the read half is turned into
//! [`ChannelEvent`]s pushed onto the owner's event queue, and the write half
//! is fed from an unbounded queue behind [`WsSink`]. The owner only ever
//! touches the [`TransportChannel`], which tracks [`ConnectionState`] from the
//! events it is shown and refuses to transmit unless the connection is open.

use futures_util::{SinkExt, StreamExt};
use strum::Display;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::protocol::OutboundFrame;

/// Fixed path of the chat endpoint on the backend host.
pub const ENDPOINT_PATH: &str = "/ws";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid chat endpoint for host {host:?}: {reason}")]
    InvalidEndpoint { host: String, reason: String },
    #[error("connection writer has shut down")]
    WriterClosed,
}

/// Lifecycle of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionState {
    /// State after observing `event`. Events that do not name a valid
    /// transition leave the state unchanged; nothing ever returns to
    /// `Connecting`.
    pub fn on_event(self, event: &ChannelEvent) -> Self {
        use ConnectionState::*;
        match (self, event) {
            (Connecting, ChannelEvent::Open) => Open,
            (Connecting | Open, ChannelEvent::Errored(_)) => Errored,
            (Connecting | Open | Errored, ChannelEvent::Closed) => Closed,
            (state, _) => state,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }
}

/// Something the connection reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Open,
    Closed,
    /// Transport failure. Always followed by `Closed`.
    Errored(String),
    /// A raw text payload, not yet decoded.
    Message(String),
}

/// Build `{ws|wss}://<host>/ws`, picking the secure scheme when the host
/// page itself is served securely.
pub fn endpoint_url(host: &str, secure: bool) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidEndpoint {
        host: host.to_string(),
        reason,
    };

    if host.is_empty() {
        return Err(invalid("host is empty".into()));
    }

    let scheme = if secure { "wss" } else { "ws" };
    let url = Url::parse(&format!("{scheme}://{host}{ENDPOINT_PATH}"))
        .map_err(|e| invalid(e.to_string()))?;

    if url.path() != ENDPOINT_PATH || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("host must not carry a path, query or fragment".into()));
    }
    Ok(url)
}

/// Where encoded frames go once the channel decides to send them.
pub trait FrameSink {
    fn transmit(&mut self, payload: String) -> Result<(), TransportError>;
}

/// Write half of a live WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl FrameSink for WsSink {
    fn transmit(&mut self, payload: String) -> Result<(), TransportError> {
        self.tx
            .send(Message::Text(payload.into()))
            .map_err(|_| TransportError::WriterClosed)
    }
}

/// Keeps every payload it is handed. Lets a session run without a socket.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub sent: Vec<String>,
}

impl FrameSink for RecordingSink {
    fn transmit(&mut self, payload: String) -> Result<(), TransportError> {
        self.sent.push(payload);
        Ok(())
    }
}

/// The owner's handle on the connection.
#[derive(Debug)]
pub struct TransportChannel<S> {
    state: ConnectionState,
    sink: S,
}

impl<S: FrameSink> TransportChannel<S> {
    pub fn new(sink: S) -> Self {
        Self {
            state: ConnectionState::Connecting,
            sink,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Advance the lifecycle from an event and return the new state.
    pub fn observe(&mut self, event: &ChannelEvent) -> ConnectionState {
        let next = self.state.on_event(event);
        if next != self.state {
            debug!(from = %self.state, to = %next, "connection state changed");
        } else if !matches!(event, ChannelEvent::Message(_)) {
            debug!(state = %self.state, ?event, "ignoring lifecycle event");
        }
        self.state = next;
        next
    }

    /// Serialize and transmit `frame`. A silent no-op unless the channel is
    /// open; nothing is queued. Returns whether the frame was handed off.
    pub fn send(&mut self, frame: &OutboundFrame) -> bool {
        if !self.is_open() {
            debug!(state = %self.state, "channel not open, frame dropped");
            return false;
        }

        let payload = match frame.encode() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to encode outbound frame");
                return false;
            }
        };

        match self.sink.transmit(payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to transmit outbound frame");
                false
            }
        }
    }
}

/// Start connecting to `url`. Returns immediately with a channel in
/// `Connecting`; lifecycle events and messages arrive on `events`.
pub fn connect<E>(url: Url, events: mpsc::UnboundedSender<E>) -> TransportChannel<WsSink>
where
    E: From<ChannelEvent> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_connection(url, rx, events));
    TransportChannel::new(WsSink { tx })
}

async fn run_connection<E>(
    url: Url,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<E>,
) where
    E: From<ChannelEvent> + Send + 'static,
{
    let emit = |event: ChannelEvent| {
        let _ = events.send(E::from(event));
    };

    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            warn!(%url, error = %e, "chat connection failed");
            emit(ChannelEvent::Errored(e.to_string()));
            emit(ChannelEvent::Closed);
            return;
        }
    };

    info!(%url, "chat connection open");
    let (mut write, mut read) = ws.split();
    emit(ChannelEvent::Open);

    // Set once the peer has asked to close. The read half keeps being polled
    // so the queued close reply is flushed before the stream ends.
    let mut closing = false;

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    emit(ChannelEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => emit(ChannelEvent::Message(text)),
                    Err(_) => debug!(len = data.len(), "ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!(%url, ?frame, "peer started close handshake");
                    closing = true;
                }
                None => {
                    info!(%url, "chat connection closed");
                    emit(ChannelEvent::Closed);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) if closing => {
                    debug!(%url, error = %e, "error after close handshake");
                    emit(ChannelEvent::Closed);
                    break;
                }
                Some(Err(e)) => {
                    warn!(%url, error = %e, "chat connection dropped");
                    emit(ChannelEvent::Errored(e.to_string()));
                    emit(ChannelEvent::Closed);
                    break;
                }
            },
            outgoing_msg = outgoing.recv() => match outgoing_msg {
                Some(_) if closing => debug!("connection closing, frame not written"),
                Some(msg) => {
                    if let Err(e) = write.send(msg).await {
                        warn!(%url, error = %e, "failed to write to chat connection");
                        emit(ChannelEvent::Errored(e.to_string()));
                        emit(ChannelEvent::Closed);
                        break;
                    }
                }
                // The owner is gone; close politely.
                None => {
                    let _ = write.close().await;
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_channel() -> TransportChannel<RecordingSink> {
        let mut channel = TransportChannel::new(RecordingSink::default());
        channel.observe(&ChannelEvent::Open);
        channel
    }

    #[test]
    fn test_endpoint_url_scheme_follows_security() {
        assert_eq!(
            endpoint_url("example.com", false).unwrap().as_str(),
            "ws://example.com/ws"
        );
        assert_eq!(
            endpoint_url("example.com:8443", true).unwrap().as_str(),
            "wss://example.com:8443/ws"
        );
    }

    #[test]
    fn test_endpoint_url_rejects_bad_hosts() {
        assert!(endpoint_url("", false).is_err());
        assert!(endpoint_url("example.com/chat", false).is_err());
        assert!(endpoint_url("example.com?x=1", false).is_err());
    }

    #[test]
    fn test_state_transitions() {
        use ConnectionState::*;
        assert_eq!(Connecting.on_event(&ChannelEvent::Open), Open);
        assert_eq!(Open.on_event(&ChannelEvent::Closed), Closed);
        assert_eq!(Open.on_event(&ChannelEvent::Errored("x".into())), Errored);
        assert_eq!(Connecting.on_event(&ChannelEvent::Errored("x".into())), Errored);
        assert_eq!(Errored.on_event(&ChannelEvent::Closed), Closed);
    }

    #[test]
    fn test_terminal_states_never_reopen() {
        use ConnectionState::*;
        assert_eq!(Closed.on_event(&ChannelEvent::Open), Closed);
        assert_eq!(Errored.on_event(&ChannelEvent::Open), Errored);
        assert_eq!(Closed.on_event(&ChannelEvent::Errored("late".into())), Closed);
        assert_eq!(Open.on_event(&ChannelEvent::Open), Open);
        assert!(Closed.is_terminal());
        assert!(Errored.is_terminal());
        assert!(!Open.is_terminal());
    }

    #[test]
    fn test_messages_do_not_change_state() {
        let mut channel = open_channel();
        channel.observe(&ChannelEvent::Message("{}".into()));
        assert_eq!(channel.state(), ConnectionState::Open);
    }

    #[test]
    fn test_send_requires_open_channel() {
        let mut channel = TransportChannel::new(RecordingSink::default());
        assert!(!channel.send(&OutboundFrame::new("hello")));
        assert!(channel.sink().sent.is_empty());

        channel.observe(&ChannelEvent::Open);
        assert!(channel.send(&OutboundFrame::new("hello")));
        assert_eq!(channel.sink().sent, vec![r#"{"text":"hello"}"#.to_string()]);

        channel.observe(&ChannelEvent::Closed);
        assert!(!channel.send(&OutboundFrame::new("again")));
        assert_eq!(channel.sink().sent.len(), 1);
    }

    #[test]
    fn test_ws_sink_reports_closed_writer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sink = WsSink { tx };
        drop(rx);
        assert!(matches!(
            sink.transmit("x".into()),
            Err(TransportError::WriterClosed)
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_reports_error_then_close() {
        // Grab a free port, then release it so the handshake is refused.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = endpoint_url(&addr.to_string(), false).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel::<ChannelEvent>();
        let channel = connect(url, tx);
        assert_eq!(channel.state(), ConnectionState::Connecting);

        assert!(matches!(rx.recv().await, Some(ChannelEvent::Errored(_))));
        assert_eq!(rx.recv().await, Some(ChannelEvent::Closed));
    }

    #[tokio::test]
    async fn test_server_close_is_acknowledged() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
            // The client's reply completes the handshake.
            tokio::time::timeout(std::time::Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for close reply")
        });

        let url = endpoint_url(&addr.to_string(), false).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel::<ChannelEvent>();
        let _channel = connect(url, tx);

        assert_eq!(rx.recv().await, Some(ChannelEvent::Open));
        assert_eq!(rx.recv().await, Some(ChannelEvent::Closed));

        let reply = server.await.unwrap();
        assert!(matches!(reply, Some(Ok(Message::Close(_)))));
    }
}
