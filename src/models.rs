use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_DESCRIPTION: &str = "<no description>";

/// `GET me`, optionally with `with_related_data=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct MePayload {
    pub default_workspace_id: u64,
    #[serde(default)]
    pub projects: Option<Vec<ProjectPayload>>,
    #[serde(default)]
    pub time_entries: Option<Vec<TimeEntryPayload>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectPayload {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeEntryPayload {
    #[serde(default)]
    pub id: Option<u64>,
    pub workspace_id: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stop: Option<String>,
    #[serde(default)]
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTimeEntry<'a> {
    pub workspace_id: u64,
    pub project_id: Option<u64>,
    pub description: &'a str,
    pub created_with: &'a str,
    pub start: String,
    pub duration: i64,
    pub tags: Vec<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub is_active: bool,
}

impl From<ProjectPayload> for Project {
    fn from(payload: ProjectPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            is_active: payload.active.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeEntry {
    pub id: Option<u64>,
    pub workspace_id: u64,
    pub description: String,
    pub is_running: bool,
    pub project_id: Option<u64>,
    /// Resolved from `project_id` against the project list of the last
    /// enrichment pass. Never sent back to Toggl.
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: i64,
}

impl From<TimeEntryPayload> for TimeEntry {
    fn from(payload: TimeEntryPayload) -> Self {
        Self {
            id: payload.id,
            workspace_id: payload.workspace_id,
            description: normalize_description(payload.description.as_deref()),
            is_running: payload.stop.is_none(),
            project_id: payload.project_id,
            project: None,
            start: payload.start,
            duration: payload.duration,
        }
    }
}

impl TimeEntry {
    pub fn with_project(&self, projects: &[Project]) -> TimeEntry {
        let project = self
            .project_id
            .and_then(|id| projects.iter().find(|project| project.id == id))
            .cloned();
        TimeEntry {
            project,
            ..self.clone()
        }
    }

    pub fn display_description(&self) -> String {
        match &self.project {
            Some(project) => format!("{}: {}", project.name, self.description),
            None => self.description.clone(),
        }
    }
}

pub fn normalize_description(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_DESCRIPTION.to_string(),
    }
}
