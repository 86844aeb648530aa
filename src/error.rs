use thiserror::Error;

use crate::toggl::TogglError;

#[derive(Debug, Clone, Error)]
pub enum LaunchError {
    #[error("Toggl API token is not set")]
    NotConfigured,
    #[error("Could not get data from Toggl: {0}")]
    RemoteUnavailable(#[source] TogglError),
    #[error("Could not update Toggl: {0}")]
    RemoteMutationFailed(#[source] TogglError),
    #[error("{0} is no longer available, search again")]
    LookupMiss(String),
}

impl LaunchError {
    pub fn title(&self) -> &'static str {
        match self {
            LaunchError::NotConfigured => "Toggl API token not set",
            LaunchError::RemoteUnavailable(_) => "Toggl is unavailable",
            LaunchError::RemoteMutationFailed(_) => "Toggl did not accept the change",
            LaunchError::LookupMiss(_) => "Selection is out of date",
        }
    }
}
