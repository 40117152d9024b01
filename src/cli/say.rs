//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::api::models::fetch_models;
use crate::core::session::{ChatSession, SessionAction, SessionCommand};
use crate::core::transport::{
    event_channel, run_one_shot, ChannelMode, EventReceiver, TransportState,
};

use super::context::ChatContext;

const SOCKET_WAIT: Duration = Duration::from_secs(2);

pub async fn run_say(ctx: &ChatContext, prompt: Vec<String>) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err("Usage: causerie say <prompt>".into());
    }

    ctx.ensure_session().await?;

    let (tx, rx) = event_channel();
    let mut session = ctx.build_session(tx.clone());
    let models = fetch_models(ctx.client()).await?;
    session.apply(SessionAction::CatalogLoaded(models));
    if session.composer().selected_model().is_none() {
        let first = session.catalog().first().map(|m| m.name.clone());
        session.apply(SessionAction::SelectModel(first));
    }
    let Some(model) = session.composer().selected_model().map(str::to_string) else {
        return Err(session
            .notice()
            .unwrap_or("No model available")
            .to_string()
            .into());
    };

    if ctx.streaming {
        let started = Instant::now();
        while session.channel_mode() != ChannelMode::Streaming && started.elapsed() < SOCKET_WAIT {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
    debug!(%model, mode = session.channel_mode().label(), "sending prompt");

    session.apply(SessionAction::InsertText(prompt));
    let one_shot = ctx.one_shot_channel();
    match session.apply(SessionAction::Submit) {
        Some(SessionCommand::RunOneShot(job)) => {
            run_one_shot(one_shot.as_ref(), job, &tx).await;
        }
        Some(_) => return Err("Session ended before the prompt was sent".into()),
        None if session.transport_state() == TransportState::Idle => {
            let reason = session.notice().unwrap_or("Prompt was not sent").to_string();
            return Err(reason.into());
        }
        None => {}
    }

    print_reply(&mut session, rx, &mut io::stdout()).await
}

/// Apply transport events until the exchange finishes, writing the reply as
/// it grows.
async fn print_reply(
    session: &mut ChatSession,
    mut rx: EventReceiver,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let mut printed = 0;

    while session.transport_state() != TransportState::Idle {
        let Some((event, exchange)) = rx.recv().await else {
            return Err("Transport closed before the reply finished".into());
        };
        match session.apply(SessionAction::Transport { event, exchange }) {
            Some(SessionCommand::AuthenticationLost) => {
                return Err("The server rejected the session; run 'causerie login'".into());
            }
            Some(_) => return Err("Session ended before the reply finished".into()),
            None => {}
        }

        // The open assistant turn only grows, so `printed` stays on a char boundary.
        if let Some(turn) = session.transcript().last().filter(|t| t.is_assistant()) {
            if let Some(delta) = turn.content.get(printed..).filter(|d| !d.is_empty()) {
                write!(out, "{delta}")?;
                out.flush()?;
                printed = turn.content.len();
            }
        }
    }

    match session.transcript().last() {
        Some(turn) if turn.is_failure() => {
            if printed > 0 {
                writeln!(out)?;
            }
            Err(format!("❌ {}", turn.content).into())
        }
        _ => {
            writeln!(out)?;
            Ok(())
        }
    }
}
