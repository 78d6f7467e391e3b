use crate::app::{App, Drawer};
use crate::destinations;
use crate::theme::{icons, ShellTheme};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use ytdl_core::Destination;

pub const HEADER_HEIGHT: u16 = 3;
pub const PANEL_OPEN_WIDTH: u16 = 24;
pub const PANEL_COLLAPSED_WIDTH: u16 = 6;
pub const APP_TITLE: &str = "yt-dlp WebUI";
const NOTIFICATION_COUNT: usize = 0;

pub fn render(frame: &mut Frame, app: &App, theme: ShellTheme) {
    let area = frame.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(HEADER_HEIGHT), Constraint::Min(0)])
        .split(area);
    render_header(frame, rows[0], app, theme);

    let panel_width = match app.drawer() {
        Drawer::Open => PANEL_OPEN_WIDTH,
        Drawer::Collapsed => PANEL_COLLAPSED_WIDTH,
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(panel_width), Constraint::Min(0)])
        .split(rows[1]);
    frame.render_widget(render_side_panel(app, theme), columns[0]);
    frame.render_widget(render_content(app, theme), columns[1]);

    if app.help_open() {
        render_help_overlay(frame, theme);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, theme: ShellTheme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bar));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut left = Vec::new();
    if !app.drawer().is_open() {
        left.push(Span::styled(
            format!("{} ", icons::MENU),
            Style::default().fg(theme.title),
        ));
    }
    left.push(Span::styled(
        APP_TITLE,
        Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(Line::from(left)), inner);

    let mut right = Vec::new();
    let free_space = app.free_disk_space();
    if !free_space.is_empty() {
        right.push(Span::styled(
            format!("{} {free_space}  ", icons::STORAGE),
            Style::default().fg(theme.text),
        ));
    }
    right.push(Span::styled(
        format!("{} {}  ", icons::SERVER, app.endpoint()),
        Style::default().fg(theme.text),
    ));
    right.push(Span::styled(
        format!("{} {NOTIFICATION_COUNT}", icons::BELL),
        Style::default().fg(theme.muted),
    ));
    frame.render_widget(
        Paragraph::new(Line::from(right)).alignment(Alignment::Right),
        inner,
    );
}

fn destination_icon(destination: Destination) -> &'static str {
    match destination {
        Destination::Home => icons::HOME,
        Destination::Settings => icons::SETTINGS,
    }
}

fn render_side_panel(app: &App, theme: ShellTheme) -> Paragraph<'static> {
    let open = app.drawer().is_open();
    let mut lines = Vec::new();
    if open {
        lines.push(Line::from(Span::styled(
            format!("{} m", icons::COLLAPSE),
            Style::default().fg(theme.muted),
        )));
    } else {
        lines.push(Line::from(""));
    }

    for (idx, affordance) in app.affordances().iter().enumerate() {
        let destination = affordance.destination;
        let mut style = if !affordance.enabled {
            Style::default().fg(theme.disabled)
        } else if destination == app.current_destination() {
            theme.heading()
        } else {
            Style::default().fg(theme.text)
        };
        if idx == app.nav_cursor() {
            style = style.patch(theme.cursor());
        }
        let marker = if idx == app.nav_cursor() {
            icons::CURSOR
        } else {
            " "
        };
        let label = if open {
            format!("{marker} {} {}", destination_icon(destination), destination.title())
        } else {
            format!("{marker} {}", destination_icon(destination))
        };
        lines.push(Line::from(Span::styled(label, style)));
    }

    Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border))
            .style(Style::default().bg(theme.surface)),
    )
}

fn render_content(app: &App, theme: ShellTheme) -> Paragraph<'static> {
    let destination = app.current_destination();
    Paragraph::new(Text::from(destinations::lines(destination, app, theme)))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .style(Style::default().bg(theme.surface))
                .title(Span::styled(
                    destination.title(),
                    Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
                )),
        )
}

fn render_help_overlay(frame: &mut Frame, theme: ShellTheme) {
    let area = centered_rect(60, 60, frame.size());
    let lines = vec![
        Line::from(Span::styled("Keys", theme.heading())),
        Line::from("m          open or collapse the side panel"),
        Line::from("j/k, ↑/↓   move the panel cursor"),
        Line::from("Enter      open the selected destination"),
        Line::from("1 / 2      jump to Home / Settings"),
        Line::from("e          edit the server address (Settings)"),
        Line::from("?, Esc     close this help"),
        Line::from("q          quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Navigation is locked while a download runs.",
            Style::default().fg(theme.muted),
        )),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent))
                .style(Style::default().bg(theme.surface).fg(theme.text))
                .title("Help"),
        ),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let margin_y = 100u16.saturating_sub(percent_y) / 2;
    let margin_x = 100u16.saturating_sub(percent_x) / 2;
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(margin_y),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(margin_y),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(margin_x),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(margin_x),
        ])
        .split(vertical[1])[1]
}
