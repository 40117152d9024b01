//! Turns the session transcript into styled lines for the message pane.

use std::time::Duration;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::core::message::{TranscriptRole, Turn};
use crate::core::session::ChatSession;

fn header(turn: &Turn) -> Line<'static> {
    let (label, style) = match turn.role {
        TranscriptRole::User => (
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        TranscriptRole::Assistant => (
            "Assistant:",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        TranscriptRole::AppError => (
            "⚠ Error:",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };
    Line::from(vec![
        Span::styled(label, style),
        Span::raw(" "),
        Span::styled(turn.time_label(), Style::default().fg(Color::DarkGray)),
    ])
}

fn body_style(role: TranscriptRole) -> Style {
    match role {
        TranscriptRole::AppError => Style::default().fg(Color::Red),
        _ => Style::default(),
    }
}

/// Symbol for the loading indicator; cycles twice a second.
pub fn pulse_symbol(elapsed: Duration) -> &'static str {
    let phase = (elapsed.as_millis() % 500) as f32 / 500.0;
    let intensity = if phase < 0.5 { phase * 2.0 } else { 2.0 - phase * 2.0 };
    if intensity < 0.33 {
        "○"
    } else if intensity < 0.66 {
        "◐"
    } else {
        "●"
    }
}

pub fn build_lines(session: &ChatSession, elapsed: Duration) -> Vec<Line<'static>> {
    let transcript = session.transcript();
    let mut lines = Vec::new();

    for (index, turn) in transcript.turns().iter().enumerate() {
        lines.push(header(turn));
        let style = body_style(turn.role);
        let mut body: Vec<Line<'static>> = turn
            .content
            .split('\n')
            .map(|text| Line::from(Span::styled(text.to_string(), style)))
            .collect();
        if transcript.is_open(index) {
            if let Some(last) = body.last_mut() {
                last.push_span(Span::styled(
                    "▌",
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        lines.extend(body);
        lines.push(Line::default());
    }

    if session.is_awaiting_first_content() {
        lines.push(Line::from(vec![
            Span::styled(
                "Assistant:",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(
                format!("{} waiting for a reply", pulse_symbol(elapsed)),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    lines
}

/// Rows the lines occupy once wrapped at `width` columns.
pub fn wrapped_height(lines: &[Line<'_>], width: u16) -> usize {
    let width = usize::from(width.max(1));
    lines
        .iter()
        .map(|line| {
            let columns: usize = line
                .spans
                .iter()
                .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
                .sum();
            columns.div_ceil(width).max(1)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::preferences::StaticPreferences;
    use crate::core::session::SessionAction;
    use crate::core::transport::{ExchangeId, FailureKind, TransportEvent, TransportFailure};
    use crate::utils::test_utils::models;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn session() -> ChatSession {
        let mut session = ChatSession::new(2000, None, Box::new(StaticPreferences::default()));
        session.apply(SessionAction::CatalogLoaded(models(&["llama"])));
        session.apply(SessionAction::SelectModel(Some("llama".into())));
        session
    }

    #[test]
    fn loading_indicator_shows_until_first_content() {
        let mut session = session();
        session.apply(SessionAction::InsertText("2+2?".into()));
        session.apply(SessionAction::Submit);

        let lines = build_lines(&session, Duration::ZERO);
        assert!(text(&lines[0]).starts_with("You: "));
        assert_eq!(text(&lines[1]), "2+2?");
        assert!(text(lines.last().unwrap()).contains("waiting for a reply"));

        session.apply(SessionAction::Transport {
            event: TransportEvent::Reply("4".into()),
            exchange: ExchangeId(1),
        });
        let lines = build_lines(&session, Duration::ZERO);
        assert!(!lines.iter().any(|l| text(l).contains("waiting")));
        assert!(text(&lines[3]).starts_with("Assistant: "));
        assert_eq!(text(&lines[4]), "4");
    }

    #[test]
    fn failures_render_with_marker() {
        let mut session = session();
        session.apply(SessionAction::InsertText("hi".into()));
        session.apply(SessionAction::Submit);
        session.apply(SessionAction::Transport {
            event: TransportEvent::Failed(TransportFailure::new(
                FailureKind::Network,
                "Une erreur s'est produite",
            )),
            exchange: ExchangeId(1),
        });
        let lines = build_lines(&session, Duration::ZERO);
        assert!(text(&lines[3]).starts_with("⚠ Error: "));
        assert_eq!(text(&lines[4]), "Une erreur s'est produite");
    }

    #[test]
    fn wrapped_height_counts_wide_lines() {
        let lines = vec![
            Line::from("abcdefghij"),
            Line::default(),
            Line::from("日本語"),
        ];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 2);
        assert_eq!(wrapped_height(&lines, 80), 3);
    }

    #[test]
    fn pulse_cycles_through_symbols() {
        assert_eq!(pulse_symbol(Duration::from_millis(0)), "○");
        assert_eq!(pulse_symbol(Duration::from_millis(250)), "●");
    }
}
