use tracing::{info, warn};

use crate::cache::LocalCache;
use crate::error::LaunchError;
use crate::router::BoundAction;
use crate::toggl::TimeTrackingApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub message: String,
    /// Set when the started description is not among the cached recent
    /// entries yet.
    pub refresh_cache: bool,
}

/// Performs the remote mutation bound to a selected option.
pub fn dispatch(
    action: &BoundAction,
    api: &dyn TimeTrackingApi,
    cache: &mut LocalCache,
) -> Result<Confirmation, LaunchError> {
    match action {
        BoundAction::Stop { entry } => {
            if entry.id.is_none() {
                return Err(LaunchError::LookupMiss(format!(
                    "Time entry '{}'",
                    entry.description
                )));
            }
            let stopped = api
                .stop_entry(entry)
                .map_err(LaunchError::RemoteMutationFailed)?;
            info!(workspace_id = entry.workspace_id, id = ?entry.id, "stopped time entry");
            let next = cache.snapshot().map(|snapshot| snapshot.with_stopped(&stopped));
            if let Some(next) = next {
                cache.replace(next);
            }
            Ok(Confirmation {
                message: format!("Stopped '{}'", entry.description),
                refresh_cache: false,
            })
        }
        BoundAction::NewEntry { description } => {
            let snapshot = cache.ensure(api).map_err(LaunchError::RemoteUnavailable)?;
            let workspace_id = snapshot.workspace_id;
            let known = snapshot.contains_recent(description);
            let created = api
                .start_entry(workspace_id, description, None)
                .map_err(LaunchError::RemoteMutationFailed)?;
            info!(workspace_id, id = ?created.id, "started new time entry");
            Ok(Confirmation {
                message: format!("Started '{}'", description),
                refresh_cache: !known,
            })
        }
        BoundAction::RestartEntry { entry } => {
            if let (Some(project_id), Some(snapshot)) = (entry.project_id, cache.snapshot()) {
                if snapshot.project(project_id).is_none() {
                    return Err(LaunchError::LookupMiss(format!("Project {}", project_id)));
                }
            }
            let created = api
                .restart_entry(entry)
                .map_err(LaunchError::RemoteMutationFailed)?;
            info!(
                previous_id = ?entry.id,
                id = ?created.id,
                "restarted time entry"
            );
            Ok(Confirmation {
                message: format!("Restarted '{}'", entry.description),
                refresh_cache: false,
            })
        }
        BoundAction::StartInProject {
            project_id,
            description,
        } => {
            let snapshot = cache.ensure(api).map_err(LaunchError::RemoteUnavailable)?;
            let workspace_id = snapshot.workspace_id;
            let project_name = match project_id {
                Some(id) => Some(
                    snapshot
                        .project(*id)
                        .map(|project| project.name.clone())
                        .ok_or_else(|| LaunchError::LookupMiss(format!("Project {}", id)))?,
                ),
                None => None,
            };
            let display = match &project_name {
                Some(name) => format!("{}: {}", name, description),
                None => description.clone(),
            };
            let known = snapshot.contains_recent(&display);
            let created = api
                .start_entry(workspace_id, description, *project_id)
                .map_err(LaunchError::RemoteMutationFailed)?;
            info!(workspace_id, project_id = ?project_id, id = ?created.id, "started time entry in project");
            let message = match project_name {
                Some(name) => format!("Started '{}' in {}", description, name),
                None => format!("Started '{}' without project", description),
            };
            Ok(Confirmation {
                message,
                refresh_cache: !known,
            })
        }
    }
}

/// Dispatches and applies the cache policy. A failed refresh after a
/// successful mutation is logged; the mutation still counts as done.
pub fn execute(
    action: &BoundAction,
    api: &dyn TimeTrackingApi,
    cache: &mut LocalCache,
) -> Result<Confirmation, LaunchError> {
    let confirmation = dispatch(action, api, cache).inspect_err(|err| {
        warn!(error = %err, "action failed");
    })?;
    if confirmation.refresh_cache {
        if let Err(err) = cache.refresh(api) {
            warn!(error = %err, "cache refresh after mutation failed");
        }
    }
    Ok(confirmation)
}
