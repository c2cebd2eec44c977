//! Core TUI application state and event loop.
//!
//! The event loop is synchronous. Backend calls run as tasks on the tokio
//! runtime handle; the UI re-reads the session snapshot every tick.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use botdemo_client::RawFile;
use botdemo_core::{DemoSession, SessionSnapshot};
use botdemo_shared::{DemoError, DemoStep};
use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::screens::{Action, ChatScreen, IntakeScreen, ScreenId};
use crate::widgets::status_bar;

/// Application state.
pub(crate) struct App {
    session: DemoSession,
    runtime: Handle,
    /// Session state as of the last tick.
    snapshot: SessionSnapshot,
    intake: IntakeScreen,
    chat: ChatScreen,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Status message shown in bottom bar.
    pub status: String,
    /// Whether help overlay is visible.
    pub show_help: bool,
}

impl App {
    pub(crate) fn new(session: DemoSession, runtime: Handle) -> Self {
        let snapshot = session.snapshot();
        Self {
            session,
            runtime,
            snapshot,
            intake: IntakeScreen::new(),
            chat: ChatScreen::new(),
            should_quit: false,
            status: "Answer a few questions, then press s · ? for help".to_string(),
            show_help: false,
        }
    }

    fn screen(&self) -> ScreenId {
        ScreenId::from(self.snapshot.step)
    }

    fn is_editing(&self) -> bool {
        match self.screen() {
            ScreenId::Intake => self.intake.is_editing(),
            ScreenId::Chat => self.chat.is_editing(),
        }
    }

    fn refresh(&mut self) {
        self.snapshot = self.session.snapshot();
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Status(message) => self.status = message,
            Action::Answer(id, answer) => self.session.update_intake(id, answer),
            Action::ClearAnswer(id) => self.session.clear_intake(&id),
            Action::StartChat => match self.session.start_chat() {
                Ok(()) => self.status = "Chat started".to_string(),
                Err(DemoError::IntakeIncomplete(missing)) => {
                    let questions: Vec<&str> = missing
                        .iter()
                        .filter_map(|id| self.session.config().question(id))
                        .map(|q| q.question.as_str())
                        .collect();
                    self.status = format!("Still needed: {}", questions.join(" · "));
                }
                Err(e) => self.status = e.to_string(),
            },
            Action::Send(text) => self.send(text),
            Action::Upload(paths) => self.upload(paths),
            Action::RemoveFile(id) => {
                if self.session.remove_file(id) {
                    self.status = "Document removed".to_string();
                }
            }
            Action::Reset => {
                self.session.reset();
                self.intake.reset();
                self.chat.reset();
                self.status = "Demo reset".to_string();
            }
        }
        self.refresh();
    }

    fn send(&mut self, text: String) {
        if self.session.is_loading() {
            self.status = DemoError::Busy.to_string();
            return;
        }
        let session = self.session.clone();
        self.runtime.spawn(async move {
            if let Err(e) = session.send_message(&text).await {
                warn!(error = %e, "message not sent");
            }
        });
    }

    fn upload(&mut self, paths: Vec<PathBuf>) {
        let bot = Arc::clone(self.session.config());
        let (accepted, rejected): (Vec<PathBuf>, Vec<PathBuf>) = paths.into_iter().partition(|p| {
            bot.file_categories.is_empty()
                || p.file_name()
                    .is_some_and(|n| bot.accepts(&n.to_string_lossy()))
        });

        self.status = if rejected.is_empty() {
            format!("Uploading {} document(s)...", accepted.len())
        } else {
            format!(
                "Skipped {} file(s): accepted types are {}",
                rejected.len(),
                bot.accepted_types().join(" ")
            )
        };
        if accepted.is_empty() {
            return;
        }

        let session = self.session.clone();
        self.runtime.spawn(async move {
            let mut raw_files = Vec::with_capacity(accepted.len());
            for path in &accepted {
                match RawFile::from_path(path).await {
                    Ok(raw) => raw_files.push(raw),
                    Err(e) => warn!(error = %e, "cannot read document"),
                }
            }
            let ids = session.upload_files(raw_files).await;
            info!(count = ids.len(), "uploads settled");
        });
    }
}

/// Set up the terminal, run the event loop, restore the terminal.
pub(crate) fn run(session: DemoSession, runtime: Handle) -> Result<()> {
    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, App::new(session, runtime));

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        app.refresh();
        terminal.draw(|f| draw(f, &app))?;

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key.code, key.modifiers);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    // Global keybindings (always active)
    match code {
        KeyCode::Char('q') | KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('q') if !app.is_editing() => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?') if !app.is_editing() => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return;
        }
        _ => {}
    }

    // If help is showing, consume any key to dismiss
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Delegate to current screen
    let bot = Arc::clone(app.session.config());
    let action = match app.screen() {
        ScreenId::Intake => {
            app.intake
                .handle_key(code, modifiers, &bot, &app.snapshot.intake_responses)
        }
        ScreenId::Chat => app.chat.handle_key(code, modifiers, &bot, &app.snapshot),
    };
    app.apply(action);
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Step bar
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Step bar
    let bot = app.session.config();
    let titles: Vec<Line> = ScreenId::ALL
        .iter()
        .map(|s| Line::from(format!("{s}")))
        .collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} {} demo ", bot.icon, bot.display_name())),
        )
        .select(app.snapshot.step.number() - 1)
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .divider(" → ");
    f.render_widget(tabs, chunks[0]);

    // Content area, drawn by the current screen
    match app.screen() {
        ScreenId::Intake => app.intake.draw(f, chunks[1], bot, &app.snapshot),
        ScreenId::Chat => app.chat.draw(f, chunks[1], bot, &app.snapshot),
    }

    // Status bar
    let status = if app.snapshot.is_loading {
        format!("{} is thinking... · {}", bot.display_name(), app.status)
    } else {
        app.status.clone()
    };
    f.render_widget(status_bar(&status), chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f, app.snapshot.step);
    }
}

fn draw_help_overlay(f: &mut Frame, step: DemoStep) {
    let area = centered_rect(60, 60, f.area());
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut help_text = vec![
        Line::from("Keybindings").style(bold),
        Line::from(""),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
        Line::from(""),
    ];
    match step {
        DemoStep::Intake => help_text.extend([
            Line::from("Questions:").style(bold),
            Line::from("  ↑/↓          Move between questions"),
            Line::from("  Enter        Edit a text answer"),
            Line::from("  ←/→          Choose an option"),
            Line::from("  Space        Toggle a multi-select option"),
            Line::from("  Backspace    Clear the answer"),
            Line::from("  a            Show/hide advanced questions"),
            Line::from("  s            Start chatting"),
        ]),
        DemoStep::Chat => help_text.extend([
            Line::from("Chat:").style(bold),
            Line::from("  Enter        Send message"),
            Line::from("  /upload p…   Share documents"),
            Line::from("  /reset       Start over"),
            Line::from("  Esc          Focus documents"),
            Line::from(""),
            Line::from("Documents:").style(bold),
            Line::from("  ↑/↓          Select document"),
            Line::from("  d            Remove document"),
            Line::from("  1-9          Ask a suggested question"),
            Line::from("  r            Reset the demo"),
            Line::from("  i            Back to typing"),
        ]),
    }

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (any key closes) ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
