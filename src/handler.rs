use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::{AppEvent, EventSender};

pub fn handle_event(app: &mut App, event: AppEvent, events: &EventSender) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, events),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Reply { request, result } => app.receive_reply(request, result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent, events: &EventSender) {
    // Global keys
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        KeyCode::Enter => {
            app.submit(events);
        }

        // Draft editing
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.set_draft(String::new());
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.insert_char(c);
        }

        // Transcript scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::PageDown => app.scroll_down(app.half_page()),

        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BackendKind;
    use crate::config::Settings;
    use crate::transcript::{Message, Sender};
    use crossterm::event::{KeyEventKind, KeyEventState};
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn echo_app() -> App {
        App::new(&Settings {
            backend: BackendKind::Echo,
            ..Settings::default()
        })
    }

    #[tokio::test]
    async fn test_typing_and_enter_round_trip() {
        let mut app = echo_app();
        let (tx, mut rx) = mpsc::unbounded_channel();

        for c in "hello".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)), &tx);
        }
        assert_eq!(app.transcript.draft(), "hello");

        handle_event(&mut app, key(KeyCode::Enter), &tx);
        assert_eq!(app.transcript.last(), Some(&Message::user("hello")));
        assert_eq!(app.transcript.draft(), "");

        // Feed the reply back through the same handler the loop uses
        while let Some(event) = rx.recv().await {
            let is_reply = matches!(event, AppEvent::Reply { .. });
            handle_event(&mut app, event, &tx);
            if is_reply {
                break;
            }
        }
        assert_eq!(app.transcript.last().map(|m| m.sender), Some(Sender::System));
        assert_eq!(app.transcript.last().map(|m| m.text.as_str()), Some("hello"));
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut app = echo_app();
        handle_event(&mut app, key(KeyCode::Esc), &tx);
        assert!(app.should_quit);

        let mut app = echo_app();
        let ctrl_c = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        handle_event(&mut app, ctrl_c, &tx);
        assert!(app.should_quit);
        assert_eq!(app.transcript.draft(), "");
    }

    #[test]
    fn test_ctrl_u_clears_draft() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = echo_app();
        for c in "spent".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)), &tx);
        }

        let ctrl_u = AppEvent::Key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        handle_event(&mut app, ctrl_u, &tx);
        assert_eq!(app.transcript.draft(), "");
        assert_eq!(app.cursor, 0);
        assert!(app.transcript.messages().is_empty());
    }

    #[tokio::test]
    async fn test_tick_only_animates_while_waiting() {
        let mut app = echo_app();
        let (tx, _rx) = mpsc::unbounded_channel();

        handle_event(&mut app, AppEvent::Tick, &tx);
        assert_eq!(app.animation_frame, 0);

        handle_event(&mut app, key(KeyCode::Enter), &tx);
        handle_event(&mut app, AppEvent::Tick, &tx);
        assert_eq!(app.animation_frame, 1);
    }

    #[test]
    fn test_mouse_scroll_only_inside_chat() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = echo_app();
        app.chat_area = Some(Rect::new(0, 0, 40, 10));
        app.chat_height = 2;
        app.scroll = 5;

        let wheel = |column, kind| {
            AppEvent::Mouse(MouseEvent {
                kind,
                column,
                row: 1,
                modifiers: KeyModifiers::NONE,
            })
        };
        handle_event(&mut app, wheel(60, MouseEventKind::ScrollUp), &tx);
        assert_eq!(app.scroll, 5);
        handle_event(&mut app, wheel(5, MouseEventKind::ScrollUp), &tx);
        assert_eq!(app.scroll, 2);
    }
}
