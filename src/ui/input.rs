//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes. Overlay states
//! are handled first; panel keys only apply in the normal state.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{can_add_password_char, can_add_username_char, App, AppState, LoginFocus, Panel};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Login overlay
    if matches!(app.state, AppState::LoggingIn) {
        return handle_login_input(app, key).await;
    }

    // Help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => return Ok(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,

        KeyCode::Tab => app.panel = app.panel.other(),
        KeyCode::Char('1') => app.panel = Panel::Image,
        KeyCode::Char('2') => app.panel = Panel::Stopwatch,

        KeyCode::Char('d') => app.start_download(),
        KeyCode::Char('l') => app.logout(),

        KeyCode::Char(' ') => app.stopwatch.toggle(),
        KeyCode::Char('r') => app.stopwatch.reset(),

        _ => {}
    }

    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        // The login screen can be skipped; downloads then go out
        // unauthenticated.
        KeyCode::Esc => {
            app.state = AppState::Normal;
        }

        KeyCode::Tab | KeyCode::Down => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }

        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            // Blocks the UI for the duration of the call (bounded by the
            // client timeouts), mirroring a synchronous login action.
            LoginFocus::Password | LoginFocus::Button => app.submit_login().await,
        },

        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },

        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },

        _ => {}
    }

    Ok(false)
}
