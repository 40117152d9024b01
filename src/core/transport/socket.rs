//! Persistent Socket.IO channel.
//!
//! The server speaks Socket.IO over a WebSocket: the client emits
//! `chat_message` and receives `chat_response`, `chat_done` and `chat_error`
//! events. A single background task owns the socket; the [`SocketChannel`]
//! handle only queues outbound text and reads shared flags, so `send` never
//! blocks the caller.

use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::COOKIE, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::socket_io::{self, OpenInfo, Packet};
use super::{
    EventSender, ExchangeId, FailureKind, PersistentChannel, TransportEvent, TransportFailure,
};
use crate::api::{ChatRequest, ServerEvent, CHAT_MESSAGE_EVENT};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type BoxError = Box<dyn Error + Send + Sync>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

struct SocketShared {
    url: String,
    cookie: Option<String>,
    connected: AtomicBool,
    connecting: AtomicBool,
    /// Exchange whose replies the socket is currently carrying.
    exchange: AtomicU64,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl SocketShared {
    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<String>>> {
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_exchange(&self) -> ExchangeId {
        ExchangeId(self.exchange.load(Ordering::SeqCst))
    }

    fn mark_down(&self) {
        self.outbound().take();
        self.connected.store(false, Ordering::SeqCst);
    }
}

pub struct SocketChannel {
    shared: Arc<SocketShared>,
    events: EventSender,
    shutdown: CancellationToken,
}

impl SocketChannel {
    /// Create the handle without connecting. `url` is the Socket.IO endpoint
    /// (e.g. `ws://host/ws/socket.io`); `cookie` is sent on the handshake so
    /// the server can tie the socket to the logged-in session.
    pub fn new(url: impl Into<String>, cookie: Option<String>, events: EventSender) -> Self {
        Self {
            shared: Arc::new(SocketShared {
                url: url.into(),
                cookie,
                connected: AtomicBool::new(false),
                connecting: AtomicBool::new(false),
                exchange: AtomicU64::new(0),
                outbound: Mutex::new(None),
            }),
            events,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Start connecting in the background. Must be called inside a Tokio runtime.
    pub fn connect(&self) {
        if self.shutdown.is_cancelled()
            || self.shared.connected.load(Ordering::SeqCst)
            || self.shared.connecting.swap(true, Ordering::SeqCst)
        {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            run_connection(shared, events, shutdown).await;
        });
    }
}

impl PersistentChannel for SocketChannel {
    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn send(
        &mut self,
        exchange: ExchangeId,
        request: &ChatRequest,
    ) -> Result<(), TransportFailure> {
        let text = socket_io::encode_event(CHAT_MESSAGE_EVENT, request)
            .map_err(|err| TransportFailure::new(FailureKind::Protocol, err.to_string()))?;

        let guard = self.shared.outbound();
        let Some(outbound) = guard.as_ref() else {
            return Err(TransportFailure::disconnected("persistent channel is not connected"));
        };
        self.shared.exchange.store(exchange.0, Ordering::SeqCst);
        outbound
            .send(text)
            .map_err(|_| TransportFailure::disconnected("persistent channel is closing"))
    }

    fn reconnect(&mut self) {
        self.connect();
    }

    fn close(&mut self) {
        self.shutdown.cancel();
        self.shared.mark_down();
    }
}

/// How the connection task ended.
enum Ending {
    Closed,
    Lost(String),
    /// The server sent something undecodable. The rest of the exchange can
    /// no longer be told apart from the next one, so the socket is dropped.
    Malformed(String),
}

/// What one inbound text frame means for the channel.
#[derive(Debug, PartialEq)]
enum Inbound {
    Event(TransportEvent),
    Ping,
    Ignored,
    Closed,
    Malformed(String),
}

async fn run_connection(
    shared: Arc<SocketShared>,
    events: EventSender,
    shutdown: CancellationToken,
) {
    let (stream, open_info) = match open(&shared).await {
        Ok(opened) => opened,
        Err(err) => {
            warn!(url = %shared.url, "persistent channel unavailable: {err}");
            shared.connecting.store(false, Ordering::SeqCst);
            return;
        }
    };

    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    *shared.outbound() = Some(tx);
    shared.connected.store(true, Ordering::SeqCst);
    shared.connecting.store(false, Ordering::SeqCst);
    info!(url = %shared.url, sid = %open_info.sid, "persistent channel connected");

    let window = open_info.heartbeat_window();
    let heartbeat = tokio::time::sleep(window);
    tokio::pin!(heartbeat);

    let ending = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break Ending::Closed;
            }
            _ = &mut heartbeat => {
                break Ending::Lost("server stopped sending heartbeats".to_string());
            }
            outgoing = rx.recv() => match outgoing {
                Some(text) => {
                    if let Err(err) = write.send(Message::Text(text)).await {
                        break Ending::Lost(err.to_string());
                    }
                }
                None => break Ending::Closed,
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    heartbeat.as_mut().reset(tokio::time::Instant::now() + window);
                    match classify(&text) {
                        Inbound::Event(event) => {
                            let _ = events.send((event, shared.current_exchange()));
                        }
                        Inbound::Ping => {
                            if let Err(err) = write.send(Message::Text(socket_io::PONG.to_string())).await {
                                break Ending::Lost(err.to_string());
                            }
                        }
                        Inbound::Ignored => {}
                        Inbound::Closed => break Ending::Lost("server closed the session".to_string()),
                        Inbound::Malformed(reason) => break Ending::Malformed(reason),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    break Ending::Lost("connection closed by server".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => break Ending::Lost(err.to_string()),
            },
        }
    };

    shared.mark_down();
    let exchange = shared.current_exchange();
    match ending {
        Ending::Closed => debug!(url = %shared.url, "persistent channel closed"),
        Ending::Lost(reason) => {
            warn!(url = %shared.url, "persistent channel lost: {reason}");
            let _ = events.send((TransportEvent::Disconnected(reason), exchange));
        }
        Ending::Malformed(reason) => {
            warn!(url = %shared.url, "dropping persistent channel: {reason}");
            let _ = events.send((
                TransportEvent::Failed(TransportFailure::new(FailureKind::Protocol, reason)),
                exchange,
            ));
            let _ = events.send((
                TransportEvent::Disconnected("dropped after a malformed frame".to_string()),
                exchange,
            ));
        }
    }
}

async fn open(shared: &SocketShared) -> Result<(WsStream, OpenInfo), BoxError> {
    let mut request = socket_io::handshake_url(&shared.url).into_client_request()?;
    if let Some(cookie) = shared.cookie.as_deref() {
        request
            .headers_mut()
            .insert(COOKIE, HeaderValue::from_str(cookie)?);
    }
    let (mut stream, _response) = connect_async(request).await?;
    let info = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut stream))
        .await
        .map_err(|_| "Socket.IO handshake timed out")??;
    Ok((stream, info))
}

/// Read the Engine.IO open packet, then join the default namespace.
async fn handshake(stream: &mut WsStream) -> Result<OpenInfo, BoxError> {
    let info = match next_packet(stream).await? {
        Packet::Open(info) => info,
        other => return Err(format!("expected an open packet, got {other:?}").into()),
    };
    stream
        .send(Message::Text(socket_io::CONNECT.to_string()))
        .await?;
    loop {
        match next_packet(stream).await? {
            Packet::Connect => return Ok(info),
            Packet::ConnectError(message) => {
                return Err(format!("server refused the connection: {message}").into())
            }
            Packet::Ping => {
                stream
                    .send(Message::Text(socket_io::PONG.to_string()))
                    .await?
            }
            _ => {}
        }
    }
}

async fn next_packet(stream: &mut WsStream) -> Result<Packet, BoxError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(socket_io::decode(&text)?),
            Some(Ok(Message::Close(_))) | None => {
                return Err("connection closed during the handshake".into())
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(err.into()),
        }
    }
}

/// Map one inbound text frame.
///
/// Unknown event names are ignored; frames that do not decode drop the
/// channel and fail the exchange as a protocol error.
fn classify(text: &str) -> Inbound {
    match socket_io::decode(text) {
        Ok(Packet::Ping) => Inbound::Ping,
        Ok(Packet::Event { name, data }) => match ServerEvent::from_parts(&name, data) {
            Ok(Some(event)) => Inbound::Event(transport_event(event)),
            Ok(None) => {
                debug!(%name, "ignoring unhandled event");
                Inbound::Ignored
            }
            Err(err) => Inbound::Malformed(format!("malformed {name} payload: {err}")),
        },
        Ok(Packet::Close | Packet::Disconnect) => Inbound::Closed,
        Ok(_) => Inbound::Ignored,
        Err(err) => Inbound::Malformed(err.to_string()),
    }
}

fn transport_event(event: ServerEvent) -> TransportEvent {
    match event {
        ServerEvent::ChatResponse { content } => TransportEvent::Fragment(content),
        ServerEvent::ChatDone => TransportEvent::Completed,
        ServerEvent::ChatError { error } => {
            TransportEvent::Failed(TransportFailure::new(FailureKind::Server, error))
        }
    }
}
