use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

use crate::router::{BoundAction, ResultOption};
use crate::session::Session;

pub const ICON: &str = "images/icon.png";

/// One line of JSON from the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    KeywordQuery {
        #[serde(default)]
        argument: Option<String>,
    },
    ItemEnter {
        data: BoundAction,
    },
    PreferencesLoaded {
        #[serde(default)]
        api_token: Option<String>,
        #[serde(default)]
        keyword: Option<String>,
    },
    PreferencesFieldChanged {
        id: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OnEnter {
    HideWindow,
    /// The launcher echoes `data` back in the next `item_enter` event.
    Custom { data: BoundAction },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderItem {
    pub icon: String,
    pub title: String,
    pub description: Option<String>,
    pub on_enter: Option<OnEnter>,
}

impl From<ResultOption> for RenderItem {
    fn from(option: ResultOption) -> Self {
        Self {
            icon: ICON.to_string(),
            title: option.title,
            description: option.description,
            on_enter: option.action.map(|data| OnEnter::Custom { data }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostResponse {
    Render { items: Vec<RenderItem> },
    Ack,
}

impl HostResponse {
    pub fn render(options: Vec<ResultOption>) -> Self {
        HostResponse::Render {
            items: options.into_iter().map(RenderItem::from).collect(),
        }
    }

    fn confirmation(message: String) -> Self {
        HostResponse::Render {
            items: vec![RenderItem {
                icon: ICON.to_string(),
                title: message,
                description: Some("Press Enter to close".to_string()),
                on_enter: Some(OnEnter::HideWindow),
            }],
        }
    }
}

pub fn handle_event(session: &mut Session, event: HostEvent) -> HostResponse {
    match event {
        HostEvent::KeywordQuery { argument } => {
            HostResponse::render(session.query(argument.as_deref().unwrap_or_default()))
        }
        HostEvent::ItemEnter { data } => match session.enter(&data) {
            Ok(confirmation) => HostResponse::confirmation(confirmation.message),
            Err(err) => HostResponse::render(vec![ResultOption::from_error(
                &err,
                session.keyword(),
            )]),
        },
        HostEvent::PreferencesLoaded { api_token, keyword } => {
            if let Some(keyword) = keyword {
                session.set_keyword(keyword);
            }
            session.set_credential(api_token.as_deref());
            HostResponse::Ack
        }
        HostEvent::PreferencesFieldChanged { id, value } => {
            match id.as_str() {
                "api_token" => session.set_credential(Some(value.as_str())),
                "keyword" => session.set_keyword(value),
                other => debug!(field = other, "ignoring preference change"),
            }
            HostResponse::Ack
        }
    }
}

pub fn handle_line(session: &mut Session, line: &str) -> HostResponse {
    match serde_json::from_str::<HostEvent>(line) {
        Ok(event) => handle_event(session, event),
        Err(err) => {
            warn!(error = %err, "malformed host event");
            HostResponse::render(vec![ResultOption::info(
                "Unreadable launcher event",
                err.to_string(),
            )])
        }
    }
}

/// Serves JSON Lines events until the reader is exhausted. Blank lines are
/// skipped; every other line gets exactly one response line, including lines
/// that are not valid UTF-8.
pub fn run<R: BufRead, W: Write>(
    session: &mut Session,
    mut reader: R,
    mut writer: W,
) -> Result<(), io::Error> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = handle_line(session, line);
        let json = serde_json::to_string(&response).map_err(io::Error::other)?;
        writeln!(writer, "{json}")?;
        writer.flush()?;
    }
}
