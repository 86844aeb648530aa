use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::LocalCache;
use crate::duration::format_elapsed;
use crate::error::LaunchError;
use crate::models::{TimeEntry, normalize_description};
use crate::toggl::TimeTrackingApi;

pub const PROJECT_MARKER: &str = "p:";
/// Restart suggestions shown after the leading "start new" option.
pub const MAX_SUGGESTIONS: usize = 9;

/// What selecting a result does. Serialized into the host's custom action
/// payload and echoed back on item enter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BoundAction {
    Stop {
        entry: TimeEntry,
    },
    NewEntry {
        description: String,
    },
    RestartEntry {
        entry: TimeEntry,
    },
    StartInProject {
        project_id: Option<u64>,
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultOption {
    pub title: String,
    pub description: Option<String>,
    pub action: Option<BoundAction>,
}

impl ResultOption {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            action: None,
        }
    }

    fn actionable(title: String, description: Option<String>, action: BoundAction) -> Self {
        Self {
            title,
            description,
            action: Some(action),
        }
    }

    pub fn from_error(err: &LaunchError, keyword: &str) -> Self {
        match err {
            LaunchError::NotConfigured => Self::info(
                err.title(),
                format!("Add your API token in the preferences, then type '{keyword}'"),
            ),
            _ => Self::info(err.title(), err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub keyword: &'a str,
    /// Unix seconds, used for the running timer's elapsed time.
    pub now: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode<'a> {
    CurrentEntry,
    ProjectSelection(&'a str),
    Search(&'a str),
}

pub fn parse_query(query: &str) -> QueryMode<'_> {
    let query = query.trim();
    if query.is_empty() {
        return QueryMode::CurrentEntry;
    }
    match query.get(..PROJECT_MARKER.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(PROJECT_MARKER) => {
            QueryMode::ProjectSelection(query[PROJECT_MARKER.len()..].trim())
        }
        _ => QueryMode::Search(query),
    }
}

/// Turns the query box text into result options. Never fails: any error is
/// rendered as a single informational option.
pub fn route_query(
    query: &str,
    api: Option<&dyn TimeTrackingApi>,
    cache: &mut LocalCache,
    ctx: &RouteContext<'_>,
) -> Vec<ResultOption> {
    match try_route(query, api, cache, ctx) {
        Ok(options) => options,
        Err(err) => {
            debug!(error = %err, "query routed to error option");
            vec![ResultOption::from_error(&err, ctx.keyword)]
        }
    }
}

fn try_route(
    query: &str,
    api: Option<&dyn TimeTrackingApi>,
    cache: &mut LocalCache,
    ctx: &RouteContext<'_>,
) -> Result<Vec<ResultOption>, LaunchError> {
    let api = api.ok_or(LaunchError::NotConfigured)?;
    let mode = parse_query(query);
    debug!(?mode, "routing query");
    match mode {
        QueryMode::CurrentEntry => current_entry_options(api, cache, ctx),
        QueryMode::ProjectSelection(description) => project_options(api, cache, description),
        QueryMode::Search(text) => search_options(api, cache, text),
    }
}

fn current_entry_options(
    api: &dyn TimeTrackingApi,
    cache: &LocalCache,
    ctx: &RouteContext<'_>,
) -> Result<Vec<ResultOption>, LaunchError> {
    let current = api
        .fetch_current_entry()
        .map_err(LaunchError::RemoteUnavailable)?;

    let Some(entry) = current else {
        return Ok(vec![ResultOption::info(
            "No timer running",
            format!("Type '{} <description>' to start one", ctx.keyword),
        )]);
    };

    let entry = match cache.snapshot() {
        Some(snapshot) => entry.with_project(&snapshot.projects),
        None => entry,
    };
    let title = format!(
        "{} ({})",
        entry.display_description(),
        format_elapsed(entry.duration, ctx.now)
    );
    let hint = match entry.start {
        Some(start) => format!(
            "Running since {}, select to stop",
            start.with_timezone(&Local).format("%H:%M")
        ),
        None => "Select to stop this timer".to_string(),
    };
    Ok(vec![ResultOption::actionable(
        title,
        Some(hint),
        BoundAction::Stop { entry },
    )])
}

fn project_options(
    api: &dyn TimeTrackingApi,
    cache: &mut LocalCache,
    description: &str,
) -> Result<Vec<ResultOption>, LaunchError> {
    let snapshot = cache.ensure(api).map_err(LaunchError::RemoteUnavailable)?;
    let description = normalize_description(Some(description));

    let mut projects = snapshot.projects.iter().collect::<Vec<_>>();
    projects.sort_by_key(|project| !project.is_active);

    let mut options = Vec::with_capacity(projects.len() + 1);
    options.push(ResultOption::actionable(
        format!("Start '{}' without project", description),
        Some("No project".to_string()),
        BoundAction::StartInProject {
            project_id: None,
            description: description.clone(),
        },
    ));
    options.extend(projects.into_iter().map(|project| {
        ResultOption::actionable(
            format!("Start '{}' in {}", description, project.name),
            (!project.is_active).then(|| "Archived project".to_string()),
            BoundAction::StartInProject {
                project_id: Some(project.id),
                description: description.clone(),
            },
        )
    }));
    Ok(options)
}

fn search_options(
    api: &dyn TimeTrackingApi,
    cache: &mut LocalCache,
    text: &str,
) -> Result<Vec<ResultOption>, LaunchError> {
    let snapshot = cache.ensure(api).map_err(LaunchError::RemoteUnavailable)?;

    let mut options = vec![ResultOption::actionable(
        format!("Start new entry '{}'", text),
        Some(format!("Type '{} <description>' to pick a project", PROJECT_MARKER)),
        BoundAction::NewEntry {
            description: text.to_string(),
        },
    )];
    options.extend(
        matching_entries(&snapshot.recent_entries, text)
            .take(MAX_SUGGESTIONS)
            .map(|entry| {
                ResultOption::actionable(
                    entry.display_description(),
                    Some("Restart this entry".to_string()),
                    BoundAction::RestartEntry {
                        entry: entry.clone(),
                    },
                )
            }),
    );
    Ok(options)
}

/// Stopped entries whose display description contains `filter`, ignoring
/// case. The running entry is offered by the empty query instead.
pub fn matching_entries<'a>(
    entries: &'a [TimeEntry],
    filter: &str,
) -> impl Iterator<Item = &'a TimeEntry> {
    let needle = filter.to_lowercase();
    entries.iter().filter(move |entry| {
        !entry.is_running && entry.display_description().to_lowercase().contains(&needle)
    })
}
