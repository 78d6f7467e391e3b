mod app;
mod config;
mod destinations;
mod gateway;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::{apply_gateway_event, shell_subscriptions, App};
use clap::Parser;
use config::{load_config, Args};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use gateway::Gateway;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    path::Path,
    sync::Mutex,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use ytdl_core::Subscriptions;

type ShellTerminal = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let config = load_config(&args);
    let mut app = App::new(&config);
    let mut subscriptions = shell_subscriptions(&config.activity_event);
    let gateway = Gateway::connect(config.endpoint());
    info!(
        endpoint = %gateway.endpoint(),
        route = app.current_destination().route(),
        "shell_start"
    );

    let mut terminal = setup_terminal()?;
    let outcome = run_shell(&mut terminal, &mut app, &mut subscriptions, gateway).await;
    restore_terminal(&mut terminal)?;
    outcome
}

async fn run_shell(
    terminal: &mut ShellTerminal,
    app: &mut App,
    subscriptions: &mut Subscriptions<App>,
    mut gateway: Gateway,
) -> Result<()> {
    let theme = theme::shell_theme();
    let mut events = EventStream::new();

    loop {
        terminal.draw(|frame| ui::render(frame, app, theme))?;
        tokio::select! {
            Some(event) = gateway.recv() => {
                apply_gateway_event(app, subscriptions, event);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err).context("terminal input"),
                    None => break,
                }
            }
        }

        if let Some(endpoint) = app.take_pending_endpoint() {
            gateway = gateway.retarget(endpoint);
        }
        if app.should_quit() {
            break;
        }
    }

    gateway.shutdown();
    info!("shell_exit");
    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<ShellTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut ShellTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
