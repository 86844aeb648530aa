use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::ListState;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::router::ResultOption;
use crate::session::Session;
use crate::storage;
use crate::toggl::token_looks_valid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Login,
    Launcher,
}

pub struct App {
    pub should_quit: bool,
    pub needs_query: bool,
    pub mode: Mode,
    pub status: Option<String>,
    pub input: String,
    pub results: Vec<ResultOption>,
    pub result_state: ListState,
    session: Session,
    config_path: Option<PathBuf>,
    toast: Option<Toast>,
}

impl App {
    pub fn new(session: Session, config_path: Option<PathBuf>) -> Self {
        let mode = if session.is_configured() {
            Mode::Launcher
        } else {
            Mode::Login
        };
        let mut result_state = ListState::default();
        result_state.select(Some(0));

        App {
            should_quit: false,
            needs_query: mode == Mode::Launcher,
            mode,
            status: None,
            input: String::new(),
            results: Vec::new(),
            result_state,
            session,
            config_path,
            toast: None,
        }
    }

    pub fn keyword(&self) -> &str {
        self.session.keyword()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Local>> {
        self.session.cache().refreshed_at()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.mode {
            Mode::Login => self.handle_login_input(key),
            Mode::Launcher => self.handle_launcher_input(key),
        }
    }

    /// Re-routes the current input. Runs between key events so that a slow
    /// Toggl call never interleaves with input handling.
    pub fn run_query(&mut self) {
        self.needs_query = false;
        self.results = self.session.query(&self.input);
        self.result_state.select(Some(0));
    }

    fn handle_login_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let token = self.input.trim().to_string();
                if !token_looks_valid(Some(token.as_str())) {
                    self.status = Some("That does not look like a Toggl API token.".to_string());
                    return;
                }
                if let Err(err) = storage::write_token(self.config_path.as_deref(), &token) {
                    self.status = Some(format!("Failed to save token: {err}"));
                    return;
                }
                self.session.set_credential(Some(token.as_str()));
                self.input.clear();
                self.status = None;
                self.mode = Mode::Launcher;
                self.needs_query = true;
                info!("token saved from login prompt");
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    self.input.push(ch);
                }
            }
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_launcher_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.activate_selected(),
            KeyCode::Up => self.select_previous(),
            KeyCode::Down => self.select_next(),
            KeyCode::Backspace => {
                if self.input.pop().is_some() {
                    self.needs_query = true;
                }
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    self.input.push(ch);
                    self.needs_query = true;
                }
            }
            KeyCode::Esc => {
                if self.input.is_empty() {
                    self.should_quit = true;
                } else {
                    self.input.clear();
                    self.needs_query = true;
                }
            }
            _ => {}
        }
    }

    pub fn selected(&self) -> Option<&ResultOption> {
        self.result_state
            .selected()
            .and_then(|index| self.results.get(index))
    }

    fn activate_selected(&mut self) {
        let Some(action) = self.selected().and_then(|option| option.action.clone()) else {
            return;
        };
        match self.session.enter(&action) {
            Ok(confirmation) => {
                self.set_toast(confirmation.message, false);
                self.input.clear();
                self.needs_query = true;
            }
            Err(err) => self.set_toast(err.to_string(), true),
        }
    }

    fn select_previous(&mut self) {
        if self.results.is_empty() {
            return;
        }
        let selected = self.result_state.selected().unwrap_or(0);
        let new_index = if selected == 0 {
            self.results.len() - 1
        } else {
            selected - 1
        };
        self.result_state.select(Some(new_index));
    }

    fn select_next(&mut self) {
        if self.results.is_empty() {
            return;
        }
        let selected = self.result_state.selected().unwrap_or(0);
        let new_index = if selected + 1 >= self.results.len() {
            0
        } else {
            selected + 1
        };
        self.result_state.select(Some(new_index));
    }

    pub fn active_toast(&mut self) -> Option<ToastView> {
        let toast = self.toast.as_ref()?;
        if toast.created_at.elapsed() > Duration::from_secs(3) {
            self.toast = None;
            return None;
        }
        Some(ToastView {
            message: toast.message.clone(),
            is_error: toast.is_error,
        })
    }

    fn set_toast(&mut self, message: impl Into<String>, is_error: bool) {
        self.toast = Some(Toast {
            message: message.into(),
            created_at: Instant::now(),
            is_error,
        });
    }
}

struct Toast {
    message: String,
    created_at: Instant,
    is_error: bool,
}

pub struct ToastView {
    pub message: String,
    pub is_error: bool,
}
