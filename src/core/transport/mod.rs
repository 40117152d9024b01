//! Channel selection for chat exchanges.
//!
//! Two kinds of channel can carry an exchange: a [`PersistentChannel`] that
//! streams fragments back as events, and a [`OneShotChannel`] that returns the
//! whole reply at once. The [`TransportSelector`] picks one per message and
//! owns the persistent channel for the lifetime of the session.
//!
//! Every inbound event travels as `(TransportEvent, ExchangeId)` over a single
//! unbounded channel so the session sees them in arrival order and can drop
//! the ones that belong to a finished exchange.

pub mod http;
pub mod socket;
pub mod socket_io;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ApiError, ChatMessage, ChatRequest};
use crate::core::preferences::PreferenceContext;

pub use http::{run_one_shot, spawn_one_shot, HttpOneShot};
pub use socket::SocketChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ExchangeId(pub u64);

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    AwaitingResponse,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Streaming,
    OneShot,
}

impl ChannelMode {
    pub fn label(self) -> &'static str {
        match self {
            ChannelMode::Streaming => "streaming",
            ChannelMode::OneShot => "one-shot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Status(u16),
    Unauthorized,
    Protocol,
    Disconnected,
    /// The server reported an error on the persistent channel.
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Disconnected, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == FailureKind::Unauthorized
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportFailure {}

impl From<ApiError> for TransportFailure {
    fn from(err: ApiError) -> Self {
        let kind = match &err {
            ApiError::Network(_) => FailureKind::Network,
            ApiError::Unauthorized => FailureKind::Unauthorized,
            ApiError::Status { status, .. } => FailureKind::Status(status.as_u16()),
            ApiError::Decode(_) => FailureKind::Protocol,
        };
        Self::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A piece of a streamed reply.
    Fragment(String),
    /// The streamed reply is complete.
    Completed,
    /// A whole one-shot reply.
    Reply(String),
    Failed(TransportFailure),
    /// The persistent channel dropped; tagged with the last exchange it carried.
    Disconnected(String),
}

pub type EventSender = mpsc::UnboundedSender<(TransportEvent, ExchangeId)>;
pub type EventReceiver = mpsc::UnboundedReceiver<(TransportEvent, ExchangeId)>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Everything needed to issue one exchange, built fresh per send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub model: String,
    pub turns: Vec<ChatMessage>,
    pub preferences: PreferenceContext,
}

impl OutboundRequest {
    /// A request is only issued with a model and a non-empty latest user turn.
    pub fn is_valid(&self) -> bool {
        !self.model.trim().is_empty()
            && self
                .turns
                .iter()
                .rev()
                .find(|turn| turn.role == "user")
                .is_some_and(|turn| !turn.content.trim().is_empty())
    }

    pub fn to_chat_request(&self, stream: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        if let Some(system) = self.preferences.system_message() {
            messages.push(system);
        }
        messages.extend(self.turns.iter().cloned());
        ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
        }
    }
}

/// Long-lived bidirectional connection able to carry many exchanges.
pub trait PersistentChannel: Send {
    fn is_connected(&self) -> bool;

    /// Queue `request` for `exchange`; replies arrive later as events.
    fn send(&mut self, exchange: ExchangeId, request: &ChatRequest)
        -> Result<(), TransportFailure>;

    /// Start a connection attempt if none is live or pending. Never reports failure.
    fn reconnect(&mut self);

    fn close(&mut self);
}

/// Single request/response exchange.
#[async_trait]
pub trait OneShotChannel: Send + Sync {
    async fn exchange(&self, request: ChatRequest) -> Result<String, TransportFailure>;
}

/// One-shot exchange the host must run; its outcome comes back as a
/// [`TransportEvent::Reply`] or [`TransportEvent::Failed`].
#[derive(Debug, Clone, PartialEq)]
pub struct OneShotJob {
    pub exchange: ExchangeId,
    pub request: ChatRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Sent over the persistent channel.
    Streaming(ExchangeId),
    OneShot(OneShotJob),
}

impl Dispatch {
    pub fn exchange(&self) -> ExchangeId {
        match self {
            Dispatch::Streaming(id) => *id,
            Dispatch::OneShot(job) => job.exchange,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: ExchangeId,
    mode: ChannelMode,
}

pub struct TransportSelector {
    state: TransportState,
    channel: Option<Box<dyn PersistentChannel>>,
    last_exchange: u64,
    in_flight: Option<InFlight>,
}

impl TransportSelector {
    pub fn new(channel: Option<Box<dyn PersistentChannel>>) -> Self {
        Self {
            state: TransportState::Idle,
            channel,
            last_exchange: 0,
            in_flight: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TransportState::Idle
    }

    /// Mode the next dispatch would use right now.
    pub fn preferred_mode(&self) -> ChannelMode {
        if self.channel_connected() {
            ChannelMode::Streaming
        } else {
            ChannelMode::OneShot
        }
    }

    pub fn in_flight_mode(&self) -> Option<ChannelMode> {
        self.in_flight.map(|flight| flight.mode)
    }

    fn channel_connected(&self) -> bool {
        self.channel
            .as_ref()
            .is_some_and(|channel| channel.is_connected())
    }

    /// Start an exchange. The channel is chosen per call: connected
    /// persistent channel first, one-shot otherwise.
    pub fn dispatch(&mut self, request: &OutboundRequest) -> Dispatch {
        debug_assert!(
            self.state == TransportState::Idle,
            "dispatch while an exchange is in flight"
        );

        self.last_exchange += 1;
        let exchange = ExchangeId(self.last_exchange);
        self.state = TransportState::AwaitingResponse;

        if let Some(channel) = self.channel.as_mut() {
            if channel.is_connected() {
                match channel.send(exchange, &request.to_chat_request(true)) {
                    Ok(()) => {
                        debug!(%exchange, "dispatched over persistent channel");
                        self.in_flight = Some(InFlight {
                            id: exchange,
                            mode: ChannelMode::Streaming,
                        });
                        return Dispatch::Streaming(exchange);
                    }
                    Err(err) => {
                        warn!(%exchange, "persistent channel refused send, falling back: {err}");
                        channel.reconnect();
                    }
                }
            } else {
                channel.reconnect();
            }
        }

        debug!(%exchange, "dispatched as one-shot");
        self.in_flight = Some(InFlight {
            id: exchange,
            mode: ChannelMode::OneShot,
        });
        Dispatch::OneShot(OneShotJob {
            exchange,
            request: request.to_chat_request(false),
        })
    }

    /// True only for events of the exchange currently in flight.
    pub fn accepts(&self, exchange: ExchangeId) -> bool {
        self.in_flight.is_some_and(|flight| flight.id == exchange)
    }

    /// First content of a streamed reply arrived.
    pub fn mark_streaming(&mut self, exchange: ExchangeId) {
        if self.accepts(exchange) && self.state == TransportState::AwaitingResponse {
            self.state = TransportState::Streaming;
        }
    }

    /// End the in-flight exchange. Returns false for stale ids.
    pub fn finish(&mut self, exchange: ExchangeId) -> bool {
        if !self.accepts(exchange) {
            return false;
        }
        self.in_flight = None;
        self.state = TransportState::Idle;
        self.reconnect_if_down();
        true
    }

    /// The persistent channel reported a drop.
    pub fn on_channel_lost(&mut self) {
        self.reconnect_if_down();
    }

    fn reconnect_if_down(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            if !channel.is_connected() {
                channel.reconnect();
            }
        }
    }

    /// Shut the persistent channel down for good and forget any exchange.
    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.in_flight = None;
        self.state = TransportState::Idle;
    }
}

impl Drop for TransportSelector {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            channel.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::FakeChannel;

    fn request(model: &str, content: &str) -> OutboundRequest {
        OutboundRequest {
            model: model.into(),
            turns: vec![ChatMessage::new("user", content)],
            preferences: PreferenceContext::default(),
        }
    }

    #[test]
    fn disconnected_channel_falls_back_to_exactly_one_one_shot() {
        let fake = FakeChannel::disconnected();
        let monitor = fake.monitor();
        let mut selector = TransportSelector::new(Some(Box::new(fake)));

        let dispatch = selector.dispatch(&request("m1", "hi"));

        match dispatch {
            Dispatch::OneShot(job) => {
                assert_eq!(job.exchange, ExchangeId(1));
                assert_eq!(job.request.model, "m1");
                assert!(!job.request.stream);
                assert_eq!(job.request.messages, vec![ChatMessage::new("user", "hi")]);
            }
            other => panic!("expected one-shot, got {other:?}"),
        }
        assert_eq!(monitor.sent().len(), 0);
        assert_eq!(monitor.reconnects(), 1);
        assert_eq!(selector.state(), TransportState::AwaitingResponse);
        assert_eq!(selector.in_flight_mode(), Some(ChannelMode::OneShot));
    }

    #[test]
    fn connected_channel_streams() {
        let fake = FakeChannel::connected();
        let monitor = fake.monitor();
        let mut selector = TransportSelector::new(Some(Box::new(fake)));

        let dispatch = selector.dispatch(&request("m1", "hi"));

        assert_eq!(dispatch, Dispatch::Streaming(ExchangeId(1)));
        let sent = monitor.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ExchangeId(1));
        assert!(sent[0].1.stream);
    }

    #[test]
    fn refused_send_falls_back_to_one_shot() {
        let fake = FakeChannel::connected().refusing_sends();
        let monitor = fake.monitor();
        let mut selector = TransportSelector::new(Some(Box::new(fake)));

        let dispatch = selector.dispatch(&request("m1", "hi"));

        assert!(matches!(dispatch, Dispatch::OneShot(_)));
        assert_eq!(monitor.reconnects(), 1);
    }

    #[test]
    fn no_channel_means_one_shot() {
        let mut selector = TransportSelector::new(None);
        assert_eq!(selector.preferred_mode(), ChannelMode::OneShot);
        assert!(matches!(
            selector.dispatch(&request("m1", "hi")),
            Dispatch::OneShot(_)
        ));
    }

    #[test]
    fn fallback_is_re_evaluated_per_message() {
        let fake = FakeChannel::connected();
        let monitor = fake.monitor();
        let mut selector = TransportSelector::new(Some(Box::new(fake)));

        let first = selector.dispatch(&request("m1", "one"));
        assert!(matches!(first, Dispatch::Streaming(_)));
        assert!(selector.finish(first.exchange()));

        monitor.set_connected(false);
        let second = selector.dispatch(&request("m1", "two"));
        assert!(matches!(second, Dispatch::OneShot(_)));
        assert!(selector.finish(second.exchange()));

        monitor.set_connected(true);
        let third = selector.dispatch(&request("m1", "three"));
        assert!(matches!(third, Dispatch::Streaming(ExchangeId(3))));
    }

    #[test]
    fn stale_exchanges_are_rejected() {
        let mut selector = TransportSelector::new(None);
        let first = selector.dispatch(&request("m1", "one")).exchange();
        assert!(selector.finish(first));
        let second = selector.dispatch(&request("m1", "two")).exchange();

        assert!(!selector.accepts(first));
        assert!(!selector.finish(first));
        assert!(selector.accepts(second));
        assert_eq!(selector.state(), TransportState::AwaitingResponse);
    }

    #[test]
    fn streaming_state_follows_first_fragment() {
        let mut selector = TransportSelector::new(Some(Box::new(FakeChannel::connected())));
        let id = selector.dispatch(&request("m1", "hi")).exchange();
        selector.mark_streaming(ExchangeId(99));
        assert_eq!(selector.state(), TransportState::AwaitingResponse);
        selector.mark_streaming(id);
        assert_eq!(selector.state(), TransportState::Streaming);
        selector.finish(id);
        assert!(selector.is_idle());
    }

    #[test]
    fn finishing_with_channel_down_requests_reconnect() {
        let fake = FakeChannel::connected();
        let monitor = fake.monitor();
        let mut selector = TransportSelector::new(Some(Box::new(fake)));
        let id = selector.dispatch(&request("m1", "hi")).exchange();
        monitor.set_connected(false);
        selector.finish(id);
        assert_eq!(monitor.reconnects(), 1);
    }

    #[test]
    fn close_shuts_channel_and_resets_state() {
        let fake = FakeChannel::connected();
        let monitor = fake.monitor();
        let mut selector = TransportSelector::new(Some(Box::new(fake)));
        let id = selector.dispatch(&request("m1", "hi")).exchange();
        selector.close();
        assert!(monitor.closed());
        assert!(selector.is_idle());
        assert!(!selector.accepts(id));
    }

    #[test]
    fn system_message_is_prepended_from_preferences() {
        let mut outbound = request("m1", "hi");
        outbound.preferences.system_prompt = "Be brief.".into();
        let chat = outbound.to_chat_request(false);
        assert_eq!(chat.messages[0], ChatMessage::new("system", "Be brief."));
        assert_eq!(chat.messages[1], ChatMessage::new("user", "hi"));
    }

    #[test]
    fn requests_need_model_and_user_content() {
        assert!(request("m1", "hi").is_valid());
        assert!(!request("", "hi").is_valid());
        assert!(!request("m1", "  ").is_valid());
        let mut no_user = request("m1", "hi");
        no_user.turns = vec![ChatMessage::new("assistant", "hello")];
        assert!(!no_user.is_valid());
    }

    #[test]
    fn api_errors_map_to_failure_kinds() {
        let failure = TransportFailure::from(ApiError::Unauthorized);
        assert!(failure.is_unauthorized());
        let failure = TransportFailure::from(ApiError::Decode("bad json".into()));
        assert_eq!(failure.kind, FailureKind::Protocol);
    }
}
