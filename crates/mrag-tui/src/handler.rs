use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use mrag_core::Config;

use crate::app::{App, InputMode, Screen, TextInput};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key).await,
    }

    Ok(())
}

fn handle_paste(app: &mut App, text: &str) {
    if app.input_mode != InputMode::Editing {
        return;
    }
    match app.screen {
        Screen::Upload => app.path_input.insert_str(text.trim()),
        Screen::Workspace => app.query_input.insert_str(text),
        Screen::Landing => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Landing => handle_landing_normal(app, key),
        Screen::Upload => handle_upload_normal(app, key),
        Screen::Workspace => handle_workspace_normal(app, key),
    }
}

fn handle_landing_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char(' ') => app.start(),
        KeyCode::Char('t') => cycle_theme(app),
        _ => {}
    }
}

/// Keys shared by the upload and workspace screens in normal mode
fn handle_common_normal(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('h') => app.go_home(),
        KeyCode::Char('r') => app.session.retry_connection(),
        KeyCode::Char('x') => {
            app.dismiss_latest_notification();
        }
        KeyCode::Char('t') => cycle_theme(app),
        _ => return false,
    }
    true
}

fn handle_upload_normal(app: &mut App, key: KeyEvent) {
    if handle_common_normal(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('i') | KeyCode::Tab => {
            if !app.session.is_uploading() {
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Esc => {
            if !app.session.is_uploading() {
                app.cancel_upload();
            }
        }
        _ => {}
    }
}

fn handle_workspace_normal(app: &mut App, key: KeyEvent) {
    if handle_common_normal(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('i') | KeyCode::Tab => app.input_mode = InputMode::Editing,
        KeyCode::Char('u') => app.open_upload(),
        KeyCode::Char(']') => app.select_next_document(),
        KeyCode::Char('[') => app.select_prev_document(),
        KeyCode::Char('o') => {
            if let Some(url) = app.session.preview_url() {
                open_in_browser(&url);
            }
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::PageDown => app.scroll_chat_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_chat_up(app.chat_height.max(1)),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,
        _ => {}
    }
}

async fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Upload => handle_upload_editing(app, key).await,
        Screen::Workspace => handle_query_editing(app, key),
        Screen::Landing => app.input_mode = InputMode::Normal,
    }
}

/// Cursor movement and deletion common to both inputs.
/// Returns false when the key isn't an editing key.
fn edit_input(input: &mut TextInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => input.clear(),
        KeyCode::Char(c) => input.insert(c),
        _ => return false,
    }
    true
}

async fn handle_upload_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if !app.cancel_upload() {
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Enter => app.submit_upload().await,
        _ => {
            edit_input(&mut app.path_input, key);
        }
    }
}

fn handle_query_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            // Disabled while offline or waiting on an answer
            if app.query_input_enabled() {
                app.submit_query();
            }
        }
        _ => {
            edit_input(&mut app.query_input, key);
        }
    }
}

fn cycle_theme(app: &mut App) {
    let name = app.cycle_theme();
    if let Err(e) = Config::save_theme(name.as_str()) {
        tracing::warn!(error = %e, "could not persist theme");
        app.session.notify_error(format!("Could not save theme: {}", e));
    }
}

fn open_in_browser(url: &str) {
    use std::process::{Command, Stdio};

    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };

    if let Err(e) = command
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        tracing::warn!(error = %e, url, "could not open preview");
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEventKind, KeyEventState};

    use super::*;
    use crate::app::tests::{pump_until, test_app, write_pdf};

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_editing() {
        let (mut app, _events) = test_app();
        app.start();
        assert_eq!(app.input_mode, InputMode::Editing);
        let ctrl_c = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        handle_event(&mut app, ctrl_c).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_q_types_into_path_instead_of_quitting() {
        let (mut app, _events) = test_app();
        app.start();
        type_text(&mut app, "q.pdf").await;
        assert!(!app.should_quit);
        assert_eq!(app.path_input.value, "q.pdf");
    }

    #[tokio::test]
    async fn test_enter_on_landing_starts() {
        let (mut app, _events) = test_app();
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.screen, Screen::Upload);
    }

    #[tokio::test]
    async fn test_upload_then_ask_through_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(&dir, "notes.pdf");
        let (mut app, mut events) = test_app();
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        handle_event(&mut app, AppEvent::Paste(path.display().to_string())).await.unwrap();
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        pump_until(&mut app, &mut events, |app| app.screen == Screen::Workspace).await;

        handle_event(&mut app, key(KeyCode::Char('i'))).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Editing);
        type_text(&mut app, "why?").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(app.session.is_querying());

        // Input is disabled while the answer is pending
        type_text(&mut app, "again").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.query_input.value, "again");

        pump_until(&mut app, &mut events, |app| !app.session.is_querying()).await;
        assert_eq!(app.session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_escape_leaves_editing() {
        let (mut app, _events) = test_app();
        app.screen = Screen::Workspace;
        app.input_mode = InputMode::Editing;
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_x_dismisses_newest_toast() {
        let (mut app, _events) = test_app();
        app.screen = Screen::Workspace;
        app.session.notify_info("hello");
        handle_event(&mut app, key(KeyCode::Char('x'))).await.unwrap();
        assert!(app.session.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_tick_only_animates_while_querying() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(&dir, "notes.pdf");
        let (mut app, mut events) = test_app();

        handle_event(&mut app, AppEvent::Tick).await.unwrap();
        assert_eq!(app.animation_frame, 0);

        app.start();
        app.path_input.insert_str(&path.display().to_string());
        app.submit_upload().await;
        pump_until(&mut app, &mut events, |app| app.screen == Screen::Workspace).await;

        app.query_input.insert_str("what?");
        app.submit_query();
        assert!(app.session.is_querying());

        handle_event(&mut app, AppEvent::Tick).await.unwrap();
        assert_eq!(app.animation_frame, 1);
        handle_event(&mut app, AppEvent::Tick).await.unwrap();
        handle_event(&mut app, AppEvent::Tick).await.unwrap();
        assert_eq!(app.animation_frame, 0);

        pump_until(&mut app, &mut events, |app| !app.session.is_querying()).await;
        handle_event(&mut app, AppEvent::Tick).await.unwrap();
        assert_eq!(app.animation_frame, 0);
    }
}
