//! Terminal user interface
//!
//! Owns the render loop and input handling for the four screens. All
//! state changes flow through `Session::apply`; this module translates
//! key presses into session events, executes the effects the reducer
//! returns, and pipes asynchronous completions (camera, analysis, chat)
//! back into the same event channel. One event is applied per loop turn,
//! so no two completions ever interleave mid-update.

mod dashboard;
mod login;
mod results;
mod scanner;

use crate::analysis::GeminiClient;
use crate::capture::{self, CameraEvent, CameraHandle};
use crate::chat::{ChatSession, ChatStreamEvent};
use crate::history::{self, HistoryEntry};
use crate::session::{Effect, Screen, Session, SessionEvent};
use anyhow::Context as _;
use chrono::Local;
use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Notice shown when an analysis attempt fails
const ANALYSIS_FAILURE_NOTICE: &str =
    "Analysis failed. Please ensure you have a valid Internet connection and try again.";

/// Everything that can wake the event loop
enum AppEvent {
    Session(SessionEvent),
    Camera(CameraEvent),
    /// A chat reply stream finished with the full concatenated text
    ChatFinished { reply: String },
}

/// Login form input state (UI-local; the session only sees submissions)
#[derive(Default)]
struct LoginForm {
    email: String,
    password: String,
    focus_password: bool,
}

/// Run the application until the user quits
pub(crate) async fn run(
    gemini: GeminiClient,
    history: Vec<HistoryEntry>,
) -> anyhow::Result<()> {
    let mut terminal = setup_terminal().context("Failed to initialize terminal")?;
    let (app, events_rx) = App::new(gemini, history);
    let result = app.run(&mut terminal, events_rx).await;
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;
    result
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

struct App {
    session: Session,
    gemini: GeminiClient,
    /// Chat session for the current diagnosis, if one is open
    chat: Option<ChatSession>,
    /// Camera handle while the Scanner screen is active
    camera: Option<CameraHandle>,
    /// Resolution reported by the camera once its stream is open
    camera_info: Option<(u32, u32)>,
    login_form: LoginForm,
    /// Cursor position in the dashboard concern grid
    concern_cursor: usize,
    chat_input: String,
    chat_focused: bool,
    /// Animation counter, bumped by the redraw ticker
    tick: usize,
    should_quit: bool,
    events_tx: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    fn new(
        gemini: GeminiClient,
        history: Vec<HistoryEntry>,
    ) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let app = Self {
            session: Session::new(history),
            gemini,
            chat: None,
            camera: None,
            camera_info: None,
            login_form: LoginForm::default(),
            concern_cursor: 0,
            chat_input: String::new(),
            chat_focused: false,
            tick: 0,
            should_quit: false,
            events_tx,
        };
        (app, events_rx)
    }

    async fn run(
        mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        mut events_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> anyhow::Result<()> {
        let mut input = EventStream::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(200));

        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                maybe_event = input.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_input(event),
                        Some(Err(e)) => return Err(e.into()),
                        None => break,
                    }
                }
                Some(app_event) = events_rx.recv() => {
                    self.handle_app_event(app_event);
                }
                _ = ticker.tick() => {
                    self.tick = self.tick.wrapping_add(1);
                }
            }
        }

        // Leaving for any reason releases the camera
        if let Some(mut handle) = self.camera.take() {
            handle.stop();
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame<'_>) {
        match self.session.screen {
            Screen::Login => login::render(frame, self),
            Screen::Dashboard => dashboard::render(frame, self),
            Screen::Scanner => scanner::render(frame, self),
            Screen::Results => results::render(frame, self),
        }
    }

    /// Apply a session event and execute the resulting effects
    fn dispatch(&mut self, event: SessionEvent) {
        for effect in self.session.apply(event) {
            self.run_effect(effect);
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Session(session_event) => self.dispatch(session_event),
            AppEvent::Camera(CameraEvent::Ready { width, height }) => {
                self.camera_info = Some((width, height));
            }
            AppEvent::Camera(CameraEvent::Frame(image)) => {
                self.dispatch(SessionEvent::ImageCaptured { image });
            }
            AppEvent::Camera(CameraEvent::Error(message)) => {
                self.dispatch(SessionEvent::CameraFailed { message });
            }
            AppEvent::ChatFinished { reply } => {
                if let Some(chat) = self.chat.as_mut() {
                    chat.record_reply(reply);
                }
                self.dispatch(SessionEvent::ChatCompleted);
            }
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::StartCamera => {
                let (handle, mut camera_rx) = capture::start_camera();
                self.camera = Some(handle);
                self.camera_info = None;
                let events_tx = self.events_tx.clone();
                tokio::spawn(async move {
                    while let Some(event) = camera_rx.recv().await {
                        if events_tx.send(AppEvent::Camera(event)).is_err() {
                            break;
                        }
                    }
                });
            }

            Effect::StopCamera => {
                if let Some(mut handle) = self.camera.take() {
                    handle.stop();
                }
                self.camera_info = None;
            }

            Effect::Analyze { image, concerns } => {
                info!(concerns = ?concerns, "Starting analysis");
                let client = self.gemini.clone();
                let events_tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let event = match client.analyze(&image, &concerns).await {
                        Ok(diagnosis) => SessionEvent::AnalysisSucceeded {
                            diagnosis,
                            completed_at: Local::now(),
                        },
                        Err(e) => {
                            error!("Analysis failed: {}", e);
                            SessionEvent::AnalysisFailed {
                                message: ANALYSIS_FAILURE_NOTICE.to_string(),
                            }
                        }
                    };
                    let _ = events_tx.send(AppEvent::Session(event));
                });
            }

            Effect::SaveHistory(entries) => {
                tokio::task::spawn_blocking(move || history::save_history(&entries));
            }

            Effect::OpenChat(diagnosis) => {
                self.chat_input.clear();
                self.chat_focused = false;
                match ChatSession::open(self.gemini.endpoint(), &diagnosis) {
                    Ok(chat) => self.chat = Some(chat),
                    Err(e) => {
                        error!("Failed to open chat session: {}", e);
                        self.chat = None;
                    }
                }
            }

            Effect::SendChat(text) => {
                let Some(chat) = self.chat.as_mut() else {
                    return;
                };
                let mut stream_rx = chat.send(text);
                let events_tx = self.events_tx.clone();
                tokio::spawn(async move {
                    while let Some(event) = stream_rx.recv().await {
                        let mapped = match event {
                            ChatStreamEvent::Fragment(text) => {
                                AppEvent::Session(SessionEvent::ChatFragment { text })
                            }
                            ChatStreamEvent::Completed { reply } => {
                                AppEvent::ChatFinished { reply }
                            }
                            ChatStreamEvent::Failed(message) => {
                                error!("Chat stream failed: {}", message);
                                AppEvent::Session(SessionEvent::ChatFailed)
                            }
                        };
                        if events_tx.send(mapped).is_err() {
                            break;
                        }
                    }
                });
            }
        }
    }

    fn handle_input(&mut self, event: Event) {
        let Event::Key(key) = event else { return };
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('l') => {
                    if self.session.screen != Screen::Login {
                        self.dispatch(SessionEvent::LogoutRequested);
                    }
                    return;
                }
                _ => {}
            }
        }

        match self.session.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::Scanner => self.handle_scanner_key(key),
            Screen::Results => self.handle_results_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                self.login_form.focus_password = !self.login_form.focus_password;
            }
            KeyCode::Backspace => {
                let field = if self.login_form.focus_password {
                    &mut self.login_form.password
                } else {
                    &mut self.login_form.email
                };
                field.pop();
            }
            KeyCode::Char(c) => {
                let field = if self.login_form.focus_password {
                    &mut self.login_form.password
                } else {
                    &mut self.login_form.email
                };
                field.push(c);
            }
            KeyCode::Enter => {
                let email = self.login_form.email.clone();
                let password = self.login_form.password.clone();
                self.login_form.password.clear();
                self.dispatch(SessionEvent::LoginSubmitted { email, password });
            }
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        let concern_count = crate::concerns::SKIN_CONCERNS.len();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Left => {
                self.concern_cursor = self.concern_cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.concern_cursor = (self.concern_cursor + 1).min(concern_count - 1);
            }
            KeyCode::Up => {
                self.concern_cursor = self.concern_cursor.saturating_sub(dashboard::GRID_COLUMNS);
            }
            KeyCode::Down => {
                self.concern_cursor =
                    (self.concern_cursor + dashboard::GRID_COLUMNS).min(concern_count - 1);
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let id = crate::concerns::SKIN_CONCERNS[self.concern_cursor].id.to_string();
                self.dispatch(SessionEvent::ConcernToggled { id });
            }
            KeyCode::Char('s') => self.dispatch(SessionEvent::ScanRequested),
            KeyCode::Char(c @ '1'..='5') => {
                let index = c as usize - '1' as usize;
                self.dispatch(SessionEvent::HistorySelected { index });
            }
            _ => {}
        }
    }

    fn handle_scanner_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.dispatch(SessionEvent::ScanCancelled),
            KeyCode::Char(' ') | KeyCode::Enter => {
                if self.session.camera_error.is_none() {
                    if let Some(camera) = &self.camera {
                        camera.request_capture();
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        if self.chat_focused {
            match key.code {
                KeyCode::Esc | KeyCode::Tab => self.chat_focused = false,
                KeyCode::Backspace => {
                    self.chat_input.pop();
                }
                KeyCode::Enter => {
                    let submittable = self
                        .session
                        .transcript
                        .as_ref()
                        .is_some_and(|t| t.can_submit(&self.chat_input));
                    if submittable {
                        let text = std::mem::take(&mut self.chat_input);
                        self.dispatch(SessionEvent::ChatSubmitted { text });
                    }
                }
                KeyCode::Char(c) => self.chat_input.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.dispatch(SessionEvent::ResultsDismissed),
            KeyCode::Char('a') => self.dispatch(SessionEvent::AnnotationsToggled),
            KeyCode::Tab | KeyCode::Char('c') => {
                // The consult opens once a diagnosis is on screen
                if self.session.transcript.is_some() && !self.session.analyzing {
                    self.chat_focused = true;
                }
            }
            KeyCode::Char(c @ '1'..='5') => {
                let index = c as usize - '1' as usize;
                self.dispatch(SessionEvent::HistorySelected { index });
            }
            _ => {}
        }
    }
}
