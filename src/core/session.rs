//! The chat session: one transcript, one composer and one transport selector,
//! driven by discrete actions from a single owning task.
//!
//! [`ChatSession::apply`] performs every state transition synchronously and
//! returns at most one [`SessionCommand`] for the host to execute (running a
//! one-shot exchange, or handing control back to the login flow).

use tracing::{debug, info, warn};

use crate::api::ModelInfo;
use crate::core::aggregator::ResponseAggregator;
use crate::core::composer::{Composer, ComposerState};
use crate::core::preferences::PreferenceSource;
use crate::core::transcript::Transcript;
use crate::core::transport::{
    ChannelMode, Dispatch, ExchangeId, OneShotJob, OutboundRequest, PersistentChannel,
    TransportEvent, TransportSelector, TransportState,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    InsertText(String),
    InsertChar(char),
    Backspace,
    ClearInput,
    SelectModel(Option<String>),
    CycleModel { forward: bool },
    Submit,
    CatalogLoaded(Vec<ModelInfo>),
    CatalogFailed(String),
    /// An HTTP collaborator got a 401 for this session.
    AuthenticationLost(String),
    Transport {
        event: TransportEvent,
        exchange: ExchangeId,
    },
    Logout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    RunOneShot(OneShotJob),
    /// The server no longer recognises the session; the session has ended.
    AuthenticationLost,
    /// The user logged out; the session has ended.
    LoggedOut,
}

pub struct ChatSession {
    transcript: Transcript,
    composer: Composer,
    selector: TransportSelector,
    preferences: Box<dyn PreferenceSource>,
    catalog: Vec<ModelInfo>,
    requested_model: Option<String>,
    notice: Option<String>,
    ended: bool,
}

impl ChatSession {
    pub fn new(
        max_input_chars: usize,
        channel: Option<Box<dyn PersistentChannel>>,
        preferences: Box<dyn PreferenceSource>,
    ) -> Self {
        info!(
            streaming = channel.is_some(),
            max_input_chars, "chat session started"
        );
        Self {
            transcript: Transcript::new(),
            composer: Composer::new(max_input_chars),
            selector: TransportSelector::new(channel),
            preferences,
            catalog: Vec::new(),
            requested_model: None,
            notice: None,
            ended: false,
        }
    }

    /// Model to select once the catalog arrives, taking precedence over the
    /// preference model.
    pub fn with_requested_model(mut self, model: Option<String>) -> Self {
        self.requested_model = model.filter(|m| !m.trim().is_empty());
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn catalog(&self) -> &[ModelInfo] {
        &self.catalog
    }

    pub fn transport_state(&self) -> TransportState {
        self.selector.state()
    }

    /// Mode of the exchange in flight, or the one the next send would use.
    pub fn channel_mode(&self) -> ChannelMode {
        self.selector
            .in_flight_mode()
            .unwrap_or_else(|| self.selector.preferred_mode())
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// A request is out and nothing has come back yet.
    pub fn is_awaiting_first_content(&self) -> bool {
        self.selector.state() == TransportState::AwaitingResponse
    }

    pub fn apply(&mut self, action: SessionAction) -> Option<SessionCommand> {
        if self.ended {
            debug!("ignoring action on ended session");
            return None;
        }

        match action {
            SessionAction::InsertText(text) => {
                self.composer.insert_str(&text);
                None
            }
            SessionAction::InsertChar(ch) => {
                self.composer.insert_char(ch);
                None
            }
            SessionAction::Backspace => {
                self.composer.backspace();
                None
            }
            SessionAction::ClearInput => {
                self.composer.clear_input();
                None
            }
            SessionAction::SelectModel(model) => {
                if !self.composer.select_model(model.as_deref()) {
                    debug!(?model, "model selection refused");
                }
                None
            }
            SessionAction::CycleModel { forward } => {
                self.composer.cycle_model(forward);
                None
            }
            SessionAction::Submit => self.submit(),
            SessionAction::CatalogLoaded(models) => {
                self.load_catalog(models);
                None
            }
            SessionAction::CatalogFailed(reason) => {
                warn!("model catalog unavailable: {reason}");
                self.catalog.clear();
                self.composer.set_models(Vec::new());
                self.notice = Some(format!("Could not load models: {reason}"));
                None
            }
            SessionAction::AuthenticationLost(reason) => {
                warn!("session rejected by server: {reason}");
                self.terminate();
                Some(SessionCommand::AuthenticationLost)
            }
            SessionAction::Transport { event, exchange } => {
                self.handle_transport_event(event, exchange)
            }
            SessionAction::Logout => {
                info!("logging out");
                self.terminate();
                Some(SessionCommand::LoggedOut)
            }
        }
    }

    fn load_catalog(&mut self, models: Vec<ModelInfo>) {
        let names: Vec<String> = models.iter().map(|m| m.name.clone()).collect();
        self.catalog = models;
        self.composer.set_models(names);

        if self.catalog.is_empty() {
            self.notice = Some("No models available on the server".to_string());
            return;
        }
        self.notice = None;

        if self.composer.selected_model().is_some() {
            return;
        }
        let seed = self
            .requested_model
            .clone()
            .or_else(|| self.preferences.snapshot().model);
        if let Some(model) = seed {
            if !self.composer.select_model(Some(&model)) {
                self.notice = Some(format!("Model {model} is not offered by the server"));
            }
        }
    }

    fn submit(&mut self) -> Option<SessionCommand> {
        let submission = match self.composer.submit(self.selector.state()) {
            Ok(submission) => submission,
            Err(err) => {
                debug!("submit refused: {err}");
                self.notice = Some(err.to_string());
                return None;
            }
        };
        self.notice = None;
        self.transcript.push_user(submission.content);

        let request = OutboundRequest {
            model: submission.model,
            turns: self.transcript.history(),
            preferences: self.preferences.snapshot(),
        };
        if !request.is_valid() {
            warn!("refusing to dispatch an incomplete request");
            self.composer.on_transport_idle();
            return None;
        }

        match self.selector.dispatch(&request) {
            Dispatch::Streaming(_) => None,
            Dispatch::OneShot(job) => Some(SessionCommand::RunOneShot(job)),
        }
    }

    fn handle_transport_event(
        &mut self,
        event: TransportEvent,
        exchange: ExchangeId,
    ) -> Option<SessionCommand> {
        if !self.selector.accepts(exchange) {
            if matches!(event, TransportEvent::Disconnected(_)) {
                self.selector.on_channel_lost();
            } else {
                debug!(%exchange, "dropping event for a finished exchange");
            }
            return None;
        }

        match event {
            TransportEvent::Fragment(text) => {
                self.selector.mark_streaming(exchange);
                ResponseAggregator::new(&mut self.transcript).on_fragment(&text);
            }
            TransportEvent::Completed => {
                ResponseAggregator::new(&mut self.transcript).on_complete();
                self.finish(exchange);
            }
            TransportEvent::Reply(text) => {
                ResponseAggregator::new(&mut self.transcript).on_reply(&text);
                self.finish(exchange);
            }
            TransportEvent::Failed(failure) if failure.is_unauthorized() => {
                warn!("session rejected by server: {failure}");
                self.terminate();
                return Some(SessionCommand::AuthenticationLost);
            }
            TransportEvent::Failed(failure) => {
                ResponseAggregator::new(&mut self.transcript).on_error(&failure.message);
                self.finish(exchange);
            }
            TransportEvent::Disconnected(reason) => {
                if self.selector.in_flight_mode() == Some(ChannelMode::Streaming) {
                    ResponseAggregator::new(&mut self.transcript)
                        .on_error(&format!("Connection lost: {reason}"));
                    self.finish(exchange);
                }
                self.selector.on_channel_lost();
            }
        }
        None
    }

    fn finish(&mut self, exchange: ExchangeId) {
        if self.selector.finish(exchange) {
            self.composer.on_transport_idle();
        }
    }

    fn terminate(&mut self) {
        self.selector.close();
        self.transcript.clear();
        self.composer.clear_input();
        self.ended = true;
    }

    /// Whether the composer currently accepts a submit.
    pub fn can_send(&self) -> bool {
        self.composer.can_send() && self.selector.is_idle()
    }

    pub fn composer_state(&self) -> ComposerState {
        self.composer.state()
    }
}
