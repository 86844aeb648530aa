//! In-memory Toggl stand-in for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::models::{Project, TimeEntry};
use crate::toggl::{AccountData, TimeTrackingApi, TogglError};

pub const WORKSPACE_ID: u64 = 10;

pub fn project(id: u64, name: &str) -> Project {
    Project {
        id,
        name: name.to_string(),
        is_active: true,
    }
}

pub fn entry(id: u64, description: &str, project_id: Option<u64>) -> TimeEntry {
    TimeEntry {
        id: Some(id),
        workspace_id: WORKSPACE_ID,
        description: description.to_string(),
        is_running: false,
        project_id,
        project: None,
        start: None,
        duration: 60,
    }
}

pub fn running(id: u64, description: &str, started_at: i64) -> TimeEntry {
    TimeEntry {
        is_running: true,
        duration: -started_at,
        ..entry(id, description, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub workspace_id: u64,
    pub description: String,
    pub project_id: Option<u64>,
}

struct FakeState {
    projects: Vec<Project>,
    entries: Vec<TimeEntry>,
    fail_reads: bool,
    fail_writes: bool,
    snapshot_calls: usize,
    next_id: u64,
    started: Vec<Started>,
    stopped: Vec<(u64, u64)>,
}

pub struct FakeApi {
    state: RefCell<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        let mut archived = project(9, "Old Client");
        archived.is_active = false;
        Self {
            state: RefCell::new(FakeState {
                projects: vec![project(7, "Client A"), project(8, "Client B"), archived],
                entries: vec![
                    entry(1, "Team Meeting", Some(7)),
                    entry(2, "Standup", None),
                    entry(3, "Team Meeting", Some(7)),
                    entry(4, "Code review", Some(8)),
                ],
                fail_reads: false,
                fail_writes: false,
                snapshot_calls: 0,
                next_id: 100,
                started: Vec::new(),
                stopped: Vec::new(),
            }),
        }
    }

    pub fn push_entry(&self, entry: TimeEntry) {
        self.state.borrow_mut().entries.insert(0, entry);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn snapshot_calls(&self) -> usize {
        self.state.borrow().snapshot_calls
    }

    pub fn started(&self) -> Vec<Started> {
        self.state.borrow().started.clone()
    }

    pub fn stopped(&self) -> Vec<(u64, u64)> {
        self.state.borrow().stopped.clone()
    }
}

impl TimeTrackingApi for FakeApi {
    fn fetch_account_snapshot(&self) -> Result<AccountData, TogglError> {
        let mut state = self.state.borrow_mut();
        state.snapshot_calls += 1;
        if state.fail_reads {
            return Err(TogglError::ServerError("Toggl API error: 503".to_string()));
        }
        Ok(AccountData {
            workspace_id: WORKSPACE_ID,
            projects: state.projects.clone(),
            time_entries: state.entries.clone(),
        })
    }

    fn fetch_current_entry(&self) -> Result<Option<TimeEntry>, TogglError> {
        let state = self.state.borrow();
        if state.fail_reads {
            return Err(TogglError::Network("connection refused".to_string()));
        }
        Ok(state.entries.iter().find(|entry| entry.is_running).cloned())
    }

    fn start_entry(
        &self,
        workspace_id: u64,
        description: &str,
        project_id: Option<u64>,
    ) -> Result<TimeEntry, TogglError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(TogglError::Api {
                status: 400,
                body: "workspace is read only".to_string(),
            });
        }
        for entry in state.entries.iter_mut() {
            entry.is_running = false;
        }
        let id = state.next_id;
        state.next_id += 1;
        let created = TimeEntry {
            workspace_id,
            ..running(id, description, 1_770_000_000)
        };
        let created = TimeEntry {
            project_id,
            ..created
        };
        state.entries.insert(0, created.clone());
        state.started.push(Started {
            workspace_id,
            description: description.to_string(),
            project_id,
        });
        Ok(created)
    }

    fn stop_entry(&self, entry: &TimeEntry) -> Result<TimeEntry, TogglError> {
        let id = entry.id.ok_or(TogglError::MissingEntryId)?;
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(TogglError::Api {
                status: 409,
                body: "entry already stopped".to_string(),
            });
        }
        let stored = state
            .entries
            .iter_mut()
            .find(|stored| stored.id == Some(id) && stored.workspace_id == entry.workspace_id)
            .ok_or(TogglError::Api {
                status: 404,
                body: "time entry not found".to_string(),
            })?;
        stored.is_running = false;
        stored.duration = 60;
        let stopped = stored.clone();
        state.stopped.push((entry.workspace_id, id));
        Ok(stopped)
    }
}

/// Lets a test keep a handle on the fake after boxing it into a session.
impl<T: TimeTrackingApi + ?Sized> TimeTrackingApi for Rc<T> {
    fn fetch_account_snapshot(&self) -> Result<AccountData, TogglError> {
        (**self).fetch_account_snapshot()
    }

    fn fetch_current_entry(&self) -> Result<Option<TimeEntry>, TogglError> {
        (**self).fetch_current_entry()
    }

    fn start_entry(
        &self,
        workspace_id: u64,
        description: &str,
        project_id: Option<u64>,
    ) -> Result<TimeEntry, TogglError> {
        (**self).start_entry(workspace_id, description, project_id)
    }

    fn stop_entry(&self, entry: &TimeEntry) -> Result<TimeEntry, TogglError> {
        (**self).stop_entry(entry)
    }
}
