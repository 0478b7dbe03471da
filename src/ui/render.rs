//! Frame rendering for the TUI.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, AppState, LoginFocus, Panel};
use crate::texture::FitOutcome;
use crate::utils::format_bytes;

use super::preview::ImagePreview;
use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Length(1), // Panel tabs
            Constraint::Min(8),    // Active panel
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    match app.panel {
        Panel::Image => render_image_panel(frame, app, chunks[2]),
        Panel::Stopwatch => render_stopwatch_panel(frame, app, chunks[2]),
    }
    render_status_bar(frame, app, chunks[3]);

    // Overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }
    if matches!(app.state, AppState::LoggingIn) {
        render_login_overlay(frame, app);
    }
    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let title = "  DiMediaNet";
    let help_hint = "[?] Help ";
    let padding = (area.width as usize).saturating_sub(title.len() + help_hint.len());

    let line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let tabs = [
        ("[1] Image", app.panel == Panel::Image),
        ("[2] Stopwatch", app.panel == Panel::Stopwatch),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, selected)) in tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(*label, styles::tab_style(*selected)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_image_panel(frame: &mut Frame, app: &App, area: Rect) {
    let title = match (&app.image, app.download_in_flight()) {
        (_, true) => " Remote Image (downloading...) ",
        (Some(_), false) => " Remote Image ",
        (None, false) => " Remote Image (none loaded) ",
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match app.image {
        Some(ref fitted) => {
            frame.render_widget(ImagePreview::new(&fitted.image), inner);
        }
        None => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No image downloaded yet",
                    styles::muted_style(),
                )),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Press ", styles::muted_style()),
                    Span::styled("[d]", styles::help_key_style()),
                    Span::styled(" to download", styles::muted_style()),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    format!(
                        "{}?container={}",
                        app.config.image_url, app.config.container
                    ),
                    styles::muted_style(),
                )),
            ];
            frame.render_widget(
                Paragraph::new(lines).alignment(Alignment::Center),
                inner,
            );
        }
    }
}

fn render_stopwatch_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .title(" Stopwatch ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let watch = &app.stopwatch;
    let elapsed = format!(
        "{}:{}.{}",
        watch.minutes_text(),
        watch.seconds_text(),
        watch.tenths_text()
    );

    let button = if watch.is_running() {
        Span::styled(format!("[ ⏸ {} ]", watch.label()), styles::highlight_style())
    } else {
        Span::styled(format!("[ ▶ {} ]", watch.label()), styles::success_style())
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(elapsed, styles::title_style())),
        Line::from(""),
        Line::from(button),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Space] ", styles::help_key_style()),
            Span::styled(watch.label(), styles::help_desc_style()),
            Span::raw("   "),
            Span::styled("[r] ", styles::help_key_style()),
            Span::styled("Reset", styles::help_desc_style()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];

    match app.session.username() {
        Some(username) => {
            spans.push(Span::styled("● ", styles::success_style()));
            spans.push(Span::raw(username.to_string()));
            if let Some(at) = app.session.established_at() {
                spans.push(Span::styled(
                    format!(" (since {})", at.format("%H:%M")),
                    styles::muted_style(),
                ));
            }
        }
        None => {
            spans.push(Span::styled("○ not logged in", styles::muted_style()));
            if let Some(last) = app.last_login.as_ref().filter(|l| !l.success) {
                let detail = match last.status_code {
                    Some(code) => format!(" (last attempt: HTTP {})", code),
                    None => " (last attempt: no response)".to_string(),
                };
                spans.push(Span::styled(detail, styles::error_style()));
            }
        }
    }

    if let Some(ref fitted) = app.image {
        let (width, height) = fitted.dimensions();
        let note = match fitted.outcome {
            FitOutcome::Scaled { from } => format!(", scaled from {}x{}", from.0, from.1),
            FitOutcome::GaveUp => ", over display limit".to_string(),
            FitOutcome::Unchanged => String::new(),
        };
        let size = app
            .last_download_size
            .map(format_bytes)
            .unwrap_or_default();
        spans.push(Span::styled(
            format!("  |  {} {}x{}{}", size, width, height, note),
            styles::muted_style(),
        ));
    }

    if let Some(ref message) = app.status_message {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(message.clone(), styles::highlight_style()));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(styles::status_bar_style()),
        area,
    );
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(46, height, frame.area());

    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            "        ▄▄ DiMediaNet Login ▄▄",
            styles::title_style(),
        )),
        Line::from(""),
    ];

    let username_focused = app.login_focus == LoginFocus::Username;
    let username_style = if username_focused {
        styles::selected_style()
    } else {
        Style::default()
    };
    let cursor = if username_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Username: [", styles::muted_style()),
        Span::styled(
            format!("{:<16}{}", app.login_username, cursor),
            username_style,
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let password_style = if password_focused {
        styles::selected_style()
    } else {
        Style::default()
    };
    let masked: String = "*".repeat(app.login_password.chars().count().min(16));
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{:<16}{}", masked, cursor), password_style),
        Span::styled("]", styles::muted_style()),
    ]));

    lines.push(Line::from(""));
    let button_focused = app.login_focus == LoginFocus::Button;
    let button_style = if button_focused {
        styles::selected_style()
    } else {
        Style::default()
    };
    let button = if button_focused {
        " ▶ Login ◀ "
    } else {
        "   Login   "
    };
    lines.push(Line::from(vec![
        Span::raw("            ["),
        Span::styled(button, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "    [Tab] next field  [Esc] skip login",
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(44, 13, frame.area());
    frame.render_widget(Clear, area);

    let entry = |key: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", key), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let lines = vec![
        Line::from(Span::styled("  Keys", styles::title_style())),
        Line::from(""),
        entry("1/2/Tab", "Switch panel"),
        entry("d", "Download image"),
        entry("Space", "Play/pause stopwatch"),
        entry("r", "Reset stopwatch"),
        entry("l", "Log in again"),
        entry("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
