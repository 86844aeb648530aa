use chrono::{DateTime, Local};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::models::{Project, TimeEntry};
use crate::toggl::{AccountData, TimeTrackingApi, TogglError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub workspace_id: u64,
    pub projects: Vec<Project>,
    /// Stopped entries, most recent first, one per display description.
    pub recent_entries: Vec<TimeEntry>,
}

impl Snapshot {
    pub fn from_account(account: AccountData) -> Self {
        let enriched = account
            .time_entries
            .iter()
            .filter(|entry| !entry.is_running)
            .map(|entry| entry.with_project(&account.projects))
            .collect::<Vec<_>>();
        Self {
            workspace_id: account.workspace_id,
            recent_entries: dedup_by_display(enriched),
            projects: account.projects,
        }
    }

    /// The same snapshot with `entry` recorded as the most recent stopped
    /// entry.
    pub fn with_stopped(&self, entry: &TimeEntry) -> Snapshot {
        let stopped = TimeEntry {
            is_running: false,
            ..entry.with_project(&self.projects)
        };
        let entries = std::iter::once(stopped)
            .chain(self.recent_entries.iter().cloned())
            .collect();
        Snapshot {
            workspace_id: self.workspace_id,
            projects: self.projects.clone(),
            recent_entries: dedup_by_display(entries),
        }
    }

    pub fn project(&self, id: u64) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn contains_recent(&self, display: &str) -> bool {
        self.recent_entries
            .iter()
            .any(|entry| entry.display_description() == display)
    }
}

pub fn dedup_by_display(entries: Vec<TimeEntry>) -> Vec<TimeEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.display_description()))
        .collect()
}

#[derive(Debug, Default)]
pub struct LocalCache {
    snapshot: Option<Snapshot>,
    refreshed_at: Option<DateTime<Local>>,
}

impl LocalCache {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Local>> {
        self.refreshed_at
    }

    /// Replaces the whole snapshot. On failure the previous one is kept.
    pub fn refresh(&mut self, api: &dyn TimeTrackingApi) -> Result<&Snapshot, TogglError> {
        let account = api.fetch_account_snapshot().inspect_err(|err| {
            warn!(error = %err, "cache refresh failed");
        })?;
        let snapshot = Snapshot::from_account(account);
        info!(
            workspace_id = snapshot.workspace_id,
            projects = snapshot.projects.len(),
            recent_entries = snapshot.recent_entries.len(),
            "cache refreshed"
        );
        self.replace(snapshot);
        Ok(self.snapshot.get_or_insert_with(Snapshot::default))
    }

    /// Returns the loaded snapshot, fetching it first when none is loaded.
    pub fn ensure(&mut self, api: &dyn TimeTrackingApi) -> Result<&Snapshot, TogglError> {
        if self.snapshot.is_none() {
            self.refresh(api)?;
        }
        Ok(self.snapshot.get_or_insert_with(Snapshot::default))
    }

    pub fn replace(&mut self, snapshot: Snapshot) {
        self.snapshot = Some(snapshot);
        self.refreshed_at = Some(Local::now());
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
        self.refreshed_at = None;
    }
}
