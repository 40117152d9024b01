//! Full-screen chat loop.
//!
//! One task owns the [`ChatSession`]. Terminal input, transport events and
//! the catalog load arrive over channels and are applied in arrival order;
//! commands returned by the session are executed here.

mod keybindings;
mod lifecycle;

pub use keybindings::{map_key, KeyLoopAction};

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::models::fetch_models;
use crate::api::BackendClient;
use crate::core::session::{ChatSession, SessionAction, SessionCommand};
use crate::core::transport::{spawn_one_shot, EventReceiver, EventSender, OneShotChannel};
use crate::ui::renderer::{ui, ViewState};

use self::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};

const MAX_FPS: u64 = 30;

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
    RequestRedraw,
}

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatExit {
    Quit,
    LoggedOut,
    /// The server rejected the session; the caller should log in again.
    AuthenticationLost,
}

/// Everything the loop needs, built by the caller for one session.
pub struct ChatHandles {
    pub session: ChatSession,
    pub client: BackendClient,
    pub one_shot: Arc<dyn OneShotChannel>,
    pub transport_tx: EventSender,
    pub transport_rx: EventReceiver,
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

fn spawn_catalog_loader(
    client: BackendClient,
    action_tx: mpsc::UnboundedSender<SessionAction>,
    event_tx: mpsc::UnboundedSender<UiEvent>,
) {
    tokio::spawn(async move {
        let _ = action_tx.send(load_catalog(&client).await);
        let _ = event_tx.send(UiEvent::RequestRedraw);
    });
}

async fn load_catalog(client: &BackendClient) -> SessionAction {
    match fetch_models(client).await {
        Ok(models) => {
            debug!(count = models.len(), "model catalog loaded");
            SessionAction::CatalogLoaded(models)
        }
        Err(err) if err.is_unauthorized() => SessionAction::AuthenticationLost(err.to_string()),
        Err(err) => SessionAction::CatalogFailed(err.to_string()),
    }
}

/// Outcome of feeding one terminal event to the loop.
#[derive(Debug, Default, PartialEq)]
struct EventOutcome {
    redraw: bool,
    exit: Option<ChatExit>,
}

fn handle_ui_event(
    session: &mut ChatSession,
    view: &mut ViewState,
    channels: &LoopChannels,
    ev: UiEvent,
) -> EventOutcome {
    let action = match ev {
        UiEvent::RequestRedraw => {
            return EventOutcome {
                redraw: true,
                exit: None,
            }
        }
        UiEvent::Crossterm(Event::Resize(..)) => {
            return EventOutcome {
                redraw: true,
                exit: None,
            }
        }
        UiEvent::Crossterm(Event::Paste(text)) => {
            KeyLoopAction::Session(SessionAction::InsertText(text))
        }
        UiEvent::Crossterm(Event::Key(key)) => match map_key(&key) {
            Some(action) => action,
            None => return EventOutcome::default(),
        },
        UiEvent::Crossterm(_) => return EventOutcome::default(),
    };

    let exit = match action {
        KeyLoopAction::Quit => Some(ChatExit::Quit),
        KeyLoopAction::ScrollUp(rows) => {
            view.scroll_up(rows);
            None
        }
        KeyLoopAction::ScrollDown(rows) => {
            view.scroll_down(rows);
            None
        }
        KeyLoopAction::ScrollToBottom => {
            view.follow_tail();
            None
        }
        KeyLoopAction::Session(action) => {
            if action == SessionAction::Submit {
                view.follow_tail();
                view.pulse_start = Instant::now();
            }
            let command = session.apply(action);
            execute_command(channels, command)
        }
    };
    EventOutcome { redraw: true, exit }
}

struct LoopChannels {
    one_shot: Arc<dyn OneShotChannel>,
    transport_tx: EventSender,
}

fn execute_command(channels: &LoopChannels, command: Option<SessionCommand>) -> Option<ChatExit> {
    match command? {
        SessionCommand::RunOneShot(job) => {
            spawn_one_shot(
                channels.one_shot.clone(),
                job,
                channels.transport_tx.clone(),
            );
            None
        }
        SessionCommand::AuthenticationLost => Some(ChatExit::AuthenticationLost),
        SessionCommand::LoggedOut => Some(ChatExit::LoggedOut),
    }
}

fn try_draw_frame(
    terminal: &mut ChatTerminal,
    session: &ChatSession,
    view: &ViewState,
    request_redraw: &mut bool,
    last_draw: &mut Instant,
    frame_duration: Duration,
) -> Result<(), Box<dyn Error>> {
    if *request_redraw && last_draw.elapsed() >= frame_duration {
        terminal.draw(|f| ui(f, session, view))?;
        *request_redraw = false;
        *last_draw = Instant::now();
    }
    Ok(())
}

pub async fn run_chat(handles: ChatHandles) -> Result<ChatExit, Box<dyn Error>> {
    let ChatHandles {
        mut session,
        client,
        one_shot,
        transport_tx,
        mut transport_rx,
    } = handles;
    let channels = LoopChannels {
        one_shot,
        transport_tx,
    };

    let mut terminal = setup_terminal()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<SessionAction>();
    let event_reader_handle = spawn_event_reader(event_tx.clone());
    spawn_catalog_loader(client, action_tx, event_tx);

    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut view = ViewState::default();
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;

    let result = 'main_loop: loop {
        if let Err(err) = try_draw_frame(
            &mut terminal,
            &session,
            &view,
            &mut request_redraw,
            &mut last_draw,
            frame_duration,
        ) {
            break 'main_loop Err(err);
        }

        let mut busy = false;

        while let Ok(ev) = event_rx.try_recv() {
            busy = true;
            let outcome = handle_ui_event(&mut session, &mut view, &channels, ev);
            request_redraw |= outcome.redraw;
            if let Some(exit) = outcome.exit {
                break 'main_loop Ok(exit);
            }
        }

        while let Ok(action) = action_rx.try_recv() {
            busy = true;
            request_redraw = true;
            let command = session.apply(action);
            if let Some(exit) = execute_command(&channels, command) {
                break 'main_loop Ok(exit);
            }
        }

        while let Ok((event, exchange)) = transport_rx.try_recv() {
            busy = true;
            request_redraw = true;
            let command = session.apply(SessionAction::Transport { event, exchange });
            if let Some(exit) = execute_command(&channels, command) {
                break 'main_loop Ok(exit);
            }
        }

        if session.is_awaiting_first_content() {
            request_redraw = true;
        }

        if !busy {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    };

    event_reader_handle.abort();
    restore_terminal(&mut terminal)?;
    if let Ok(exit) = &result {
        info!(?exit, "chat loop finished");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::preferences::StaticPreferences;
    use crate::core::transport::{event_channel, ExchangeId, TransportEvent};
    use crate::utils::test_utils::{models, FakeOneShot};
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channels() -> (LoopChannels, EventReceiver, Arc<FakeOneShot>) {
        let fake = Arc::new(FakeOneShot::replying("4"));
        let (tx, rx) = event_channel();
        (
            LoopChannels {
                one_shot: fake.clone(),
                transport_tx: tx,
            },
            rx,
            fake,
        )
    }

    fn ready_session() -> ChatSession {
        let mut session = ChatSession::new(2000, None, Box::new(StaticPreferences::default()));
        session.apply(SessionAction::CatalogLoaded(models(&["llama"])));
        session.apply(SessionAction::SelectModel(Some("llama".into())));
        session
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> UiEvent {
        UiEvent::Crossterm(Event::Key(KeyEvent::new(code, modifiers)))
    }

    #[tokio::test]
    async fn typed_message_runs_one_shot_and_reply_lands() {
        let (channels, mut rx, fake) = channels();
        let mut session = ready_session();
        let mut view = ViewState::default();

        for ev in [
            UiEvent::Crossterm(Event::Paste("2+2?".into())),
            key(KeyCode::Enter, KeyModifiers::NONE),
        ] {
            let outcome = handle_ui_event(&mut session, &mut view, &channels, ev);
            assert_eq!(outcome.exit, None);
        }
        assert!(session.is_awaiting_first_content());

        let (event, exchange) = rx.recv().await.unwrap();
        assert_eq!(exchange, ExchangeId(1));
        assert_eq!(event, TransportEvent::Reply("4".into()));
        session.apply(SessionAction::Transport { event, exchange });

        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "4");
        assert_eq!(fake.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unauthorized_catalog_hands_off_to_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "Non autorisé", "authenticated": false})),
            )
            .mount(&server)
            .await;
        let client = BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap();

        let (channels, _rx, _fake) = channels();
        let (action_tx, mut action_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        spawn_catalog_loader(client, action_tx, event_tx);

        let action = action_rx.recv().await.unwrap();
        assert!(matches!(action, SessionAction::AuthenticationLost(_)));
        assert!(matches!(event_rx.recv().await, Some(UiEvent::RequestRedraw)));

        let mut session = ChatSession::new(2000, None, Box::new(StaticPreferences::default()));
        let command = session.apply(action);
        assert_eq!(
            execute_command(&channels, command),
            Some(ChatExit::AuthenticationLost)
        );
        assert!(session.is_ended());
    }

    #[tokio::test]
    async fn unreachable_catalog_keeps_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let client = BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap();

        let action = load_catalog(&client).await;
        assert!(matches!(action, SessionAction::CatalogFailed(_)));
    }

    #[test]
    fn escape_quits_and_ctrl_l_logs_out() {
        let (channels, _rx, _fake) = channels();
        let mut session = ready_session();
        let mut view = ViewState::default();

        let outcome = handle_ui_event(
            &mut session,
            &mut view,
            &channels,
            key(KeyCode::Esc, KeyModifiers::NONE),
        );
        assert_eq!(outcome.exit, Some(ChatExit::Quit));

        let outcome = handle_ui_event(
            &mut session,
            &mut view,
            &channels,
            key(KeyCode::Char('l'), KeyModifiers::CONTROL),
        );
        assert_eq!(outcome.exit, Some(ChatExit::LoggedOut));
        assert!(session.is_ended());
    }

    #[test]
    fn scroll_keys_move_the_view_only() {
        let (channels, _rx, _fake) = channels();
        let mut session = ready_session();
        let mut view = ViewState::default();

        handle_ui_event(
            &mut session,
            &mut view,
            &channels,
            key(KeyCode::PageUp, KeyModifiers::NONE),
        );
        assert_eq!(view.scroll_back, 10);
        handle_ui_event(
            &mut session,
            &mut view,
            &channels,
            key(KeyCode::End, KeyModifiers::NONE),
        );
        assert_eq!(view.scroll_back, 0);
        assert!(session.composer().input().is_empty());
    }
}
