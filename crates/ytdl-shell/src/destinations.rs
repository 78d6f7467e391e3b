use crate::app::App;
use crate::theme::ShellTheme;
use ratatui::{
    style::Style,
    text::{Line, Span},
};
use tracing::debug;
use ytdl_core::{Destination, Subscriptions};

/// Gives every destination its one chance to subscribe to backend events.
/// Runs once per shell lifetime, before the first event is delivered.
pub fn register_all(subscriptions: &mut Subscriptions<App>) {
    for destination in Destination::ALL {
        if !register(destination, subscriptions) {
            debug!(destination = destination.title(), "destination_already_registered");
        }
    }
}

pub fn register(destination: Destination, subscriptions: &mut Subscriptions<App>) -> bool {
    match destination {
        Destination::Home => {
            subscriptions.subscribe_all("home.feed", |event, app: &mut App| app.record_feed(event))
        }
        Destination::Settings => {
            subscriptions.subscribe_all("settings.last_event", |_, app: &mut App| {
                app.note_backend_event()
            })
        }
    }
}

pub fn lines(destination: Destination, app: &App, theme: ShellTheme) -> Vec<Line<'static>> {
    match destination {
        Destination::Home => home_lines(app, theme),
        Destination::Settings => settings_lines(app, theme),
    }
}

fn field_line(label: &str, value: String, theme: ShellTheme) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(theme.muted)),
        Span::styled(value, Style::default().fg(theme.text)),
    ])
}

fn home_lines(app: &App, theme: ShellTheme) -> Vec<Line<'static>> {
    let downloading = app.store().status().downloading;
    let (activity, activity_color) = if downloading {
        ("downloading, navigation locked", theme.warn)
    } else {
        ("idle", theme.ok)
    };
    let free_space = match app.free_disk_space() {
        "" => "not reported yet".to_string(),
        value => value.to_string(),
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Activity: ", Style::default().fg(theme.muted)),
            Span::styled(activity, Style::default().fg(activity_color)),
        ]),
        field_line("Free space", free_space, theme),
        Line::from(""),
        Line::from(Span::styled("Recent events", theme.heading())),
    ];

    let mut feed = app.feed().peekable();
    if feed.peek().is_none() {
        lines.push(Line::from(Span::styled(
            "Waiting for backend events.",
            Style::default().fg(theme.muted),
        )));
    }
    for entry in feed.rev() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", entry.at.format("%H:%M:%S")),
                Style::default().fg(theme.muted),
            ),
            Span::styled(format!("{} ", entry.name), Style::default().fg(theme.accent)),
            Span::styled(entry.text.clone(), Style::default().fg(theme.text)),
        ]));
    }
    lines
}

fn settings_lines(app: &App, theme: ShellTheme) -> Vec<Line<'static>> {
    let endpoint = app.endpoint();
    let last_event = app
        .last_backend_event()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "none yet".to_string());
    let mut lines = vec![
        field_line(
            "Server address",
            app.store().settings().server_address.clone(),
            theme,
        ),
        field_line("Endpoint", endpoint.websocket_url(), theme),
        field_line("Last event", last_event, theme),
        field_line("Activity event", app.activity_event().to_string(), theme),
        field_line(
            "Preferences",
            app.preferences_path().display().to_string(),
            theme,
        ),
        Line::from(""),
    ];

    let editor = app.editor();
    if editor.active {
        lines.push(Line::from(vec![
            Span::styled("New address: ", Style::default().fg(theme.accent)),
            Span::styled(format!("{}_", editor.buffer), theme.cursor()),
        ]));
        lines.push(Line::from(Span::styled(
            "Enter save, Esc cancel",
            Style::default().fg(theme.muted),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Press e to edit the server address",
            Style::default().fg(theme.muted),
        )));
    }
    if let Some(note) = editor.note.as_deref() {
        lines.push(Line::from(Span::styled(
            note.to_string(),
            Style::default().fg(theme.warn),
        )));
    }
    lines
}
