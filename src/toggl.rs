use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{SecondsFormat, Utc};
use reqwest::Method;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{
    MePayload, NO_DESCRIPTION, NewTimeEntry, Project, ProjectPayload, TimeEntry, TimeEntryPayload,
};

pub const DEFAULT_BASE_URL: &str = "https://api.track.toggl.com/api/v9/";
pub const CLIENT_TAG: &str = "togglaunch";
const ENTRY_TAG: &str = "by:togglaunch";
const MIN_TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, Error)]
pub enum TogglError {
    #[error("Toggl rejected the API token{}", detail(.0))]
    Unauthorized(String),
    #[error("Toggl requires a paid plan for this request{}", detail(.0))]
    PaymentRequired(String),
    #[error("Toggl rate limit reached, try again shortly{}", detail(.0))]
    RateLimited(String),
    #[error("{0}")]
    ServerError(String),
    #[error("Toggl API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected response from Toggl: {0}")]
    Decode(String),
    #[error("time entry has no id")]
    MissingEntryId,
}

fn detail(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrentEntryLookup {
    /// `GET me/time_entries/current`
    #[default]
    Dedicated,
    /// List recent entries and pick the first one without a stop time.
    List,
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub related_data: bool,
    pub current_entry_lookup: CurrentEntryLookup,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            related_data: true,
            current_entry_lookup: CurrentEntryLookup::Dedicated,
        }
    }
}

/// Raw account state as returned by Toggl, before enrichment and dedup.
#[derive(Debug, Clone, Default)]
pub struct AccountData {
    pub workspace_id: u64,
    pub projects: Vec<Project>,
    pub time_entries: Vec<TimeEntry>,
}

pub trait TimeTrackingApi {
    fn fetch_account_snapshot(&self) -> Result<AccountData, TogglError>;

    fn fetch_current_entry(&self) -> Result<Option<TimeEntry>, TogglError>;

    fn start_entry(
        &self,
        workspace_id: u64,
        description: &str,
        project_id: Option<u64>,
    ) -> Result<TimeEntry, TogglError>;

    fn stop_entry(&self, entry: &TimeEntry) -> Result<TimeEntry, TogglError>;

    /// Starts a fresh entry with the same description and project. The
    /// original id is not reused.
    fn restart_entry(&self, entry: &TimeEntry) -> Result<TimeEntry, TogglError> {
        self.start_entry(entry.workspace_id, &entry.description, entry.project_id)
    }
}

pub fn token_looks_valid(token: Option<&str>) -> bool {
    token.is_some_and(|token| token.len() >= MIN_TOKEN_LEN)
}

pub struct TogglClient {
    client: Client,
    base_url: Url,
    credentials: String,
    settings: ClientSettings,
}

impl TogglClient {
    pub fn new(token: &str, settings: ClientSettings) -> Result<Self, TogglError> {
        let client = Client::builder()
            .user_agent(CLIENT_TAG)
            .build()
            .map_err(|err| TogglError::Network(err.to_string()))?;
        Self::with_client(client, token, settings)
    }

    fn with_client(
        client: Client,
        token: &str,
        settings: ClientSettings,
    ) -> Result<Self, TogglError> {
        let base_url = parse_base_url(&settings.base_url)?;
        let credentials = STANDARD.encode(format!("{}:api_token", token));
        Ok(Self {
            client,
            base_url,
            credentials,
            settings,
        })
    }

    fn url(&self, path: &str) -> Result<Url, TogglError> {
        self.base_url
            .join(path)
            .map_err(|err| TogglError::Network(err.to_string()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = method.as_str(), path = url.path(), "toggl request");
        self.client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Basic {}", self.credentials))
    }

    fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, TogglError> {
        self.send(self.request(Method::GET, url))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TogglError> {
        let response = request
            .send()
            .map_err(|err| TogglError::Network(err.to_string()))?;
        let response = check_status(response)?;
        response
            .json::<T>()
            .map_err(|err| TogglError::Decode(err.to_string()))
    }

    fn fetch_recent_entries(&self) -> Result<Vec<TimeEntry>, TogglError> {
        let payload: Option<Vec<TimeEntryPayload>> = self.fetch(self.url("me/time_entries")?)?;
        Ok(payload
            .unwrap_or_default()
            .into_iter()
            .map(TimeEntry::from)
            .collect())
    }

    fn fetch_projects(&self, workspace_id: u64) -> Result<Vec<Project>, TogglError> {
        let url = self.url(&format!("workspaces/{}/projects", workspace_id))?;
        let payload: Option<Vec<ProjectPayload>> = self.fetch(url)?;
        Ok(payload
            .unwrap_or_default()
            .into_iter()
            .map(Project::from)
            .collect())
    }
}

impl TimeTrackingApi for TogglClient {
    fn fetch_account_snapshot(&self) -> Result<AccountData, TogglError> {
        if self.settings.related_data {
            let url = Url::parse_with_params(
                self.url("me")?.as_str(),
                &[("with_related_data", "true")],
            )
            .map_err(|err| TogglError::Network(err.to_string()))?;
            let me: MePayload = self.fetch(url)?;
            return Ok(AccountData {
                workspace_id: me.default_workspace_id,
                projects: me
                    .projects
                    .unwrap_or_default()
                    .into_iter()
                    .map(Project::from)
                    .collect(),
                time_entries: me
                    .time_entries
                    .unwrap_or_default()
                    .into_iter()
                    .map(TimeEntry::from)
                    .collect(),
            });
        }

        let me: MePayload = self.fetch(self.url("me")?)?;
        let projects = self.fetch_projects(me.default_workspace_id)?;
        let time_entries = self.fetch_recent_entries()?;
        Ok(AccountData {
            workspace_id: me.default_workspace_id,
            projects,
            time_entries,
        })
    }

    fn fetch_current_entry(&self) -> Result<Option<TimeEntry>, TogglError> {
        match self.settings.current_entry_lookup {
            CurrentEntryLookup::Dedicated => {
                let payload: Option<TimeEntryPayload> =
                    self.fetch(self.url("me/time_entries/current")?)?;
                Ok(payload.map(TimeEntry::from))
            }
            CurrentEntryLookup::List => Ok(self
                .fetch_recent_entries()?
                .into_iter()
                .find(|entry| entry.is_running)),
        }
    }

    fn start_entry(
        &self,
        workspace_id: u64,
        description: &str,
        project_id: Option<u64>,
    ) -> Result<TimeEntry, TogglError> {
        let url = self.url(&format!("workspaces/{}/time_entries", workspace_id))?;
        let body = new_entry_body(workspace_id, description, project_id);
        let payload: TimeEntryPayload = self.send(self.request(Method::POST, url).json(&body))?;
        Ok(TimeEntry::from(payload))
    }

    fn stop_entry(&self, entry: &TimeEntry) -> Result<TimeEntry, TogglError> {
        let id = entry.id.ok_or(TogglError::MissingEntryId)?;
        let url = self.url(&format!(
            "workspaces/{}/time_entries/{}/stop",
            entry.workspace_id, id
        ))?;
        let payload: TimeEntryPayload = self.send(self.request(Method::PATCH, url))?;
        Ok(TimeEntry::from(payload))
    }
}

fn new_entry_body(
    workspace_id: u64,
    description: &str,
    project_id: Option<u64>,
) -> NewTimeEntry<'_> {
    let description = if description == NO_DESCRIPTION {
        ""
    } else {
        description
    };
    NewTimeEntry {
        workspace_id,
        project_id,
        description,
        created_with: CLIENT_TAG,
        start: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        duration: -1,
        tags: vec![ENTRY_TAG],
    }
}

fn parse_base_url(base: &str) -> Result<Url, TogglError> {
    let mut base = base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(|err| TogglError::Network(format!("Invalid base URL {base}: {err}")))
}

fn check_status(response: Response) -> Result<Response, TogglError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default().trim().to_string();
    match status.as_u16() {
        401 | 403 => Err(TogglError::Unauthorized(body)),
        402 => Err(TogglError::PaymentRequired(body)),
        429 => Err(TogglError::RateLimited(body)),
        _ if status.is_server_error() => Err(TogglError::ServerError(format!(
            "Toggl API error: {} {}",
            status, body
        ))),
        code => Err(TogglError::Api { status: code, body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::thread;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";
    const API_PREFIX: &str = "/api/v9/";

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        /// Request target below the API prefix, query string included.
        target: String,
        authorization: Option<String>,
        body: String,
    }

    /// Loopback HTTP server answering canned `(target, status, body)` routes
    /// and recording every request it sees.
    struct StubServer {
        base_url: String,
        requests: Arc<Mutex<Vec<Recorded>>>,
    }

    impl StubServer {
        fn start(routes: Vec<(&'static str, u16, &'static str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let address = listener.local_addr().unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let recorded = Arc::clone(&requests);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    let mut reader = BufReader::new(stream);
                    let Some(request) = read_request(&mut reader) else {
                        continue;
                    };
                    let (status, body) = routes
                        .iter()
                        .find(|(target, _, _)| request.target == *target)
                        .map(|(_, status, body)| (*status, *body))
                        .unwrap_or((404, "no such route"));
                    recorded.lock().unwrap().push(request);
                    let response = format!(
                        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = reader.into_inner().write_all(response.as_bytes());
                }
            });
            Self {
                base_url: format!("http://{address}/api/v9"),
                requests,
            }
        }

        fn client(&self, related_data: bool, lookup: CurrentEntryLookup) -> TogglClient {
            let settings = ClientSettings {
                base_url: self.base_url.clone(),
                related_data,
                current_entry_lookup: lookup,
            };
            let http = Client::builder().no_proxy().build().unwrap();
            TogglClient::with_client(http, TOKEN, settings).unwrap()
        }

        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn read_request(reader: &mut BufReader<TcpStream>) -> Option<Recorded> {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let mut parts = line.split_whitespace();
        let method = parts.next()?.to_string();
        let target = parts.next()?.strip_prefix(API_PREFIX)?.to_string();

        let mut authorization = None;
        let mut length = 0;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).ok()?;
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            let (name, value) = header.split_once(':')?;
            match name.to_ascii_lowercase().as_str() {
                "authorization" => authorization = Some(value.trim().to_string()),
                "content-length" => length = value.trim().parse().ok()?,
                _ => {}
            }
        }
        let mut body = vec![0; length];
        reader.read_exact(&mut body).ok()?;
        Some(Recorded {
            method,
            target,
            authorization,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    const ME_RELATED: &str = r#"{
        "default_workspace_id": 42,
        "projects": [{"id": 7, "name": "Client A", "active": true}],
        "time_entries": [
            {"id": 1, "workspace_id": 42, "description": "Review", "project_id": 7,
             "start": "2026-01-05T09:00:00Z", "stop": "2026-01-05T10:00:00Z", "duration": 3600},
            {"id": 2, "workspace_id": 42, "description": null, "duration": -1767603600}
        ]
    }"#;

    #[test]
    fn token_shape_check() {
        assert!(!token_looks_valid(None));
        assert!(!token_looks_valid(Some("")));
        assert!(!token_looks_valid(Some(&"a".repeat(31))));
        assert!(token_looks_valid(Some(&"a".repeat(32))));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("https://example.test/api/v9").unwrap();
        assert_eq!(
            url.join("me").unwrap().as_str(),
            "https://example.test/api/v9/me"
        );
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn new_entry_body_marks_running() {
        let body = new_entry_body(42, "Foo", Some(7));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["workspace_id"], 42);
        assert_eq!(json["project_id"], 7);
        assert_eq!(json["description"], "Foo");
        assert_eq!(json["created_with"], CLIENT_TAG);
        assert_eq!(json["duration"], -1);
        assert_eq!(json["tags"][0], ENTRY_TAG);
        assert!(json["start"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn new_entry_body_without_project_sends_null() {
        let body = new_entry_body(42, NO_DESCRIPTION, None);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["project_id"].is_null());
        assert_eq!(json["description"], "");
    }

    #[test]
    fn client_builds_basic_credentials() {
        let client = TogglClient::new("token123", ClientSettings::default()).unwrap();
        assert_eq!(client.credentials, STANDARD.encode("token123:api_token"));
        assert_eq!(
            client.url("me/time_entries/current").unwrap().as_str(),
            "https://api.track.toggl.com/api/v9/me/time_entries/current"
        );
    }

    #[test]
    fn snapshot_with_related_data_is_one_call() {
        let server = StubServer::start(vec![("me?with_related_data=true", 200, ME_RELATED)]);
        let account = server
            .client(true, CurrentEntryLookup::Dedicated)
            .fetch_account_snapshot()
            .unwrap();

        assert_eq!(account.workspace_id, 42);
        assert_eq!(account.projects[0].name, "Client A");
        assert_eq!(account.time_entries.len(), 2);
        assert!(!account.time_entries[0].is_running);
        assert!(account.time_entries[1].is_running);
        assert_eq!(account.time_entries[1].description, NO_DESCRIPTION);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(
            requests[0].authorization.as_deref(),
            Some(format!("Basic {}", STANDARD.encode(format!("{TOKEN}:api_token"))).as_str())
        );
    }

    #[test]
    fn snapshot_without_related_data_makes_three_calls() {
        let server = StubServer::start(vec![
            ("me", 200, r#"{"default_workspace_id": 42}"#),
            (
                "workspaces/42/projects",
                200,
                r#"[{"id": 7, "name": "Client A", "active": false}]"#,
            ),
            (
                "me/time_entries",
                200,
                r#"[{"id": 1, "workspace_id": 42, "description": "Review", "stop": "2026-01-05T10:00:00Z", "duration": 60}]"#,
            ),
        ]);
        let account = server
            .client(false, CurrentEntryLookup::Dedicated)
            .fetch_account_snapshot()
            .unwrap();

        assert_eq!(account.workspace_id, 42);
        assert!(!account.projects[0].is_active);
        assert_eq!(account.time_entries[0].description, "Review");
        let targets = server
            .requests()
            .into_iter()
            .map(|request| request.target)
            .collect::<Vec<_>>();
        assert_eq!(targets, vec!["me", "workspaces/42/projects", "me/time_entries"]);
    }

    #[test]
    fn dedicated_lookup_reads_null_as_no_entry() {
        let server = StubServer::start(vec![("me/time_entries/current", 200, "null")]);
        let current = server
            .client(true, CurrentEntryLookup::Dedicated)
            .fetch_current_entry()
            .unwrap();
        assert!(current.is_none());
        assert_eq!(server.requests()[0].target, "me/time_entries/current");
    }

    #[test]
    fn list_lookup_picks_the_entry_without_stop() {
        let server = StubServer::start(vec![(
            "me/time_entries",
            200,
            r#"[
                {"id": 5, "workspace_id": 42, "description": "Old", "stop": "2026-01-05T10:00:00Z", "duration": 60},
                {"id": 6, "workspace_id": 42, "description": "Live", "duration": -1767603600}
            ]"#,
        )]);
        let current = server
            .client(true, CurrentEntryLookup::List)
            .fetch_current_entry()
            .unwrap()
            .unwrap();
        assert_eq!(current.id, Some(6));
        assert_eq!(current.description, "Live");
    }

    #[test]
    fn start_posts_running_entry_body() {
        let server = StubServer::start(vec![(
            "workspaces/42/time_entries",
            200,
            r#"{"id": 900, "workspace_id": 42, "description": "Planning", "project_id": 7, "duration": -1767603600}"#,
        )]);
        let created = server
            .client(true, CurrentEntryLookup::Dedicated)
            .start_entry(42, "Planning", Some(7))
            .unwrap();
        assert_eq!(created.id, Some(900));
        assert!(created.is_running);

        let request = &server.requests()[0];
        assert_eq!(request.method, "POST");
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["workspace_id"], 42);
        assert_eq!(body["project_id"], 7);
        assert_eq!(body["description"], "Planning");
        assert_eq!(body["created_with"], CLIENT_TAG);
        assert_eq!(body["duration"], -1);
        assert_eq!(body["tags"], serde_json::json!([ENTRY_TAG]));
    }

    #[test]
    fn stop_patches_workspace_scoped_url() {
        let server = StubServer::start(vec![(
            "workspaces/42/time_entries/900/stop",
            200,
            r#"{"id": 900, "workspace_id": 42, "description": "Planning", "stop": "2026-01-05T10:00:00Z", "duration": 120}"#,
        )]);
        let client = server.client(true, CurrentEntryLookup::Dedicated);
        let entry = TimeEntry {
            id: Some(900),
            workspace_id: 42,
            description: "Planning".to_string(),
            is_running: true,
            project_id: None,
            project: None,
            start: None,
            duration: -1_767_603_600,
        };
        let stopped = client.stop_entry(&entry).unwrap();
        assert!(!stopped.is_running);
        assert_eq!(server.requests()[0].method, "PATCH");

        let without_id = TimeEntry { id: None, ..entry };
        assert!(matches!(
            client.stop_entry(&without_id),
            Err(TogglError::MissingEntryId)
        ));
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn error_statuses_map_to_variants_with_body() {
        let server = StubServer::start(vec![
            ("workspaces/1/time_entries", 401, "Incorrect username and/or password"),
            ("workspaces/2/time_entries", 403, "forbidden"),
            ("workspaces/3/time_entries", 402, "upgrade needed"),
            ("workspaces/4/time_entries", 429, "slow down"),
            ("workspaces/5/time_entries", 503, "maintenance"),
            ("workspaces/6/time_entries", 400, " workspace is read only \n"),
            ("workspaces/7/time_entries", 200, "not json"),
        ]);
        let client = server.client(true, CurrentEntryLookup::Dedicated);
        let start = |workspace_id| client.start_entry(workspace_id, "Foo", None).unwrap_err();

        assert!(matches!(start(1), TogglError::Unauthorized(body) if body.contains("password")));
        assert!(matches!(start(2), TogglError::Unauthorized(body) if body == "forbidden"));
        assert!(matches!(start(3), TogglError::PaymentRequired(body) if body == "upgrade needed"));
        assert!(matches!(start(4), TogglError::RateLimited(body) if body == "slow down"));
        let server_error = start(5);
        assert!(matches!(server_error, TogglError::ServerError(_)));
        assert!(server_error.to_string().contains("503"));
        assert!(server_error.to_string().contains("maintenance"));
        assert!(matches!(
            start(6),
            TogglError::Api { status: 400, body } if body == "workspace is read only"
        ));
        assert!(matches!(start(7), TogglError::Decode(_)));
        assert_eq!(
            TogglError::RateLimited("slow down".to_string()).to_string(),
            "Toggl rate limit reached, try again shortly (slow down)"
        );
        assert_eq!(
            TogglError::Unauthorized(String::new()).to_string(),
            "Toggl rejected the API token"
        );
    }

    #[test]
    fn unreachable_server_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let settings = ClientSettings {
            base_url: format!("http://{address}/api/v9"),
            ..ClientSettings::default()
        };
        let http = Client::builder().no_proxy().build().unwrap();
        let client = TogglClient::with_client(http, TOKEN, settings).unwrap();
        assert!(matches!(
            client.fetch_current_entry(),
            Err(TogglError::Network(_))
        ));
    }
}
