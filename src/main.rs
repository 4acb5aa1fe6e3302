// src/main.rs

use color_eyre::eyre::{Result, eyre};
use crossterm::{
    ExecutableCommand,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::{Stdout, stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

mod app;
mod config;
mod core;
mod logging;
mod ui;

use app::{App, AppState};
use config::ScanOptions;
use crate::core::events::{EventSink, LogLevel, SessionEvent};
use crate::core::scanner::{Collaborators, ScanController, ScanRequest};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let log_path = logging::initialize_logging()?;

    let options = ScanOptions::from_env();
    options.validate().map_err(|e| eyre!(e))?;
    info!(?options, log = %log_path.display(), "Starting up.");

    let (events, mut rx) = EventSink::channel(options.event_capacity);
    let deps = Collaborators::system(&options).map_err(|e| eyre!(e))?;
    let controller = ScanController::new(deps, options.clone(), events);

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new(options.depth);
    let result = run_app(&mut terminal, &mut app, &controller, &mut rx).await;
    shutdown(&controller, &mut rx).await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    if let Err(e) = &result {
        error!(error = %e, "Exited with an error.");
    }
    result
}

/// Stops a running scan and gives it a moment to wind down before the
/// process exits. A session stuck in nmap is abandoned after the grace period.
async fn shutdown(controller: &ScanController, rx: &mut mpsc::Receiver<SessionEvent>) {
    if !controller.is_active() {
        return;
    }
    controller.stop_scan();
    // Keep the channel drained so the session is not stuck on a full queue.
    let drain = async {
        while rx.recv().await.is_some() {}
        std::future::pending::<()>().await
    };
    tokio::select! {
        finished = tokio::time::timeout(SHUTDOWN_GRACE, controller.wait()) => match finished {
            Ok(Some(Ok(outcome))) => info!(state = %outcome.state, "Scan stopped on exit."),
            Ok(Some(Err(e))) => warn!(error = %e, "Scan ended with an error on exit."),
            Ok(None) => {}
            Err(_) => warn!("Scan did not stop within the grace period; abandoning it."),
        },
        _ = drain => {}
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    controller: &ScanController,
    rx: &mut mpsc::Receiver<SessionEvent>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(app, controller)?;
        }

        while let Ok(stamped) = rx.try_recv() {
            app.apply_event(stamped);
        }
        app.on_tick();
    }
    Ok(())
}

fn handle_events(app: &mut App, controller: &ScanController) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            match app.state {
                AppState::Disclaimer => match key.code {
                    KeyCode::Enter => app.acknowledge_disclaimer(),
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => app.quit(),
                    _ => {}
                },
                AppState::Idle => handle_idle_input(app, key.code, controller),
                AppState::Scanning | AppState::Finished => handle_session_input(app, key.code, controller),
            }
        }
    }
    Ok(())
}

/// While typing every printable key goes to the input; `Esc` quits.
fn handle_idle_input(app: &mut App, key_code: KeyCode, controller: &ScanController) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            if app.input.trim().is_empty() {
                return;
            }
            match controller.start_scan(&app.input, ScanRequest { depth: app.depth }) {
                Ok(session_id) => app.begin_scan(session_id),
                Err(e) => app.note(LogLevel::Error, format!("Could not start scan: {}", e)),
            }
        }
        _ => {}
    }
}

fn handle_session_input(app: &mut App, key_code: KeyCode, controller: &ScanController) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
        KeyCode::Char('s') | KeyCode::Char('S') if app.state == AppState::Scanning => {
            if controller.stop_scan() {
                app.stop_requested = true;
                app.note(LogLevel::Warning, "Stop requested; finishing in-flight work...");
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') if app.state == AppState::Finished => app.reset(),
        KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_logs(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Left => app.scroll_logs_left(),
        KeyCode::Right => app.scroll_logs_right(),
        _ => {}
    }
}
