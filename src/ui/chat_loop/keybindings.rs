//! Maps terminal keys to loop actions.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::session::SessionAction;

const PAGE_ROWS: u16 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum KeyLoopAction {
    Session(SessionAction),
    ScrollUp(u16),
    ScrollDown(u16),
    ScrollToBottom,
    Quit,
}

pub fn map_key(key: &KeyEvent) -> Option<KeyLoopAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    let action = match key.code {
        KeyCode::Char('c') if ctrl => KeyLoopAction::Quit,
        KeyCode::Esc => KeyLoopAction::Quit,
        KeyCode::Char('l') if ctrl => KeyLoopAction::Session(SessionAction::Logout),
        KeyCode::Char('j') if ctrl => KeyLoopAction::Session(SessionAction::InsertChar('\n')),
        KeyCode::Char('u') if ctrl => KeyLoopAction::Session(SessionAction::ClearInput),
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            KeyLoopAction::Session(SessionAction::InsertChar('\n'))
        }
        KeyCode::Enter => KeyLoopAction::Session(SessionAction::Submit),
        KeyCode::Tab => KeyLoopAction::Session(SessionAction::CycleModel { forward: true }),
        KeyCode::BackTab => KeyLoopAction::Session(SessionAction::CycleModel { forward: false }),
        KeyCode::Backspace => KeyLoopAction::Session(SessionAction::Backspace),
        KeyCode::Up => KeyLoopAction::ScrollUp(1),
        KeyCode::Down => KeyLoopAction::ScrollDown(1),
        KeyCode::PageUp => KeyLoopAction::ScrollUp(PAGE_ROWS),
        KeyCode::PageDown => KeyLoopAction::ScrollDown(PAGE_ROWS),
        KeyCode::End => KeyLoopAction::ScrollToBottom,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(ch) => KeyLoopAction::Session(SessionAction::InsertChar(ch)),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn enter_submits_and_ctrl_j_inserts_newline() {
        assert_eq!(
            map_key(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(KeyLoopAction::Session(SessionAction::Submit))
        );
        assert_eq!(
            map_key(&key(KeyCode::Char('j'), KeyModifiers::CONTROL)),
            Some(KeyLoopAction::Session(SessionAction::InsertChar('\n')))
        );
    }

    #[test]
    fn tab_cycles_models_both_ways() {
        assert_eq!(
            map_key(&key(KeyCode::Tab, KeyModifiers::NONE)),
            Some(KeyLoopAction::Session(SessionAction::CycleModel {
                forward: true
            }))
        );
        assert_eq!(
            map_key(&key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Some(KeyLoopAction::Session(SessionAction::CycleModel {
                forward: false
            }))
        );
    }

    #[test]
    fn quit_and_logout_keys() {
        assert_eq!(
            map_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyLoopAction::Quit)
        );
        assert_eq!(
            map_key(&key(KeyCode::Esc, KeyModifiers::NONE)),
            Some(KeyLoopAction::Quit)
        );
        assert_eq!(
            map_key(&key(KeyCode::Char('l'), KeyModifiers::CONTROL)),
            Some(KeyLoopAction::Session(SessionAction::Logout))
        );
    }

    #[test]
    fn plain_characters_are_typed_and_unbound_controls_ignored() {
        assert_eq!(
            map_key(&key(KeyCode::Char('L'), KeyModifiers::SHIFT)),
            Some(KeyLoopAction::Session(SessionAction::InsertChar('L')))
        );
        assert_eq!(map_key(&key(KeyCode::Char('x'), KeyModifiers::CONTROL)), None);
        assert_eq!(map_key(&key(KeyCode::F(5), KeyModifiers::NONE)), None);
    }

    #[test]
    fn key_releases_are_ignored() {
        let mut release = key(KeyCode::Enter, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_key(&release), None);
    }
}
