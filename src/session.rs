use chrono::Utc;
use tracing::{error, info, warn};

use crate::cache::LocalCache;
use crate::dispatch::{self, Confirmation};
use crate::error::LaunchError;
use crate::router::{self, BoundAction, ResultOption, RouteContext};
use crate::storage::{self, Preferences};
use crate::toggl::{ClientSettings, TimeTrackingApi, TogglClient, token_looks_valid};

/// Owns everything that lives between two host events: the client built
/// from the current credential, the cached account snapshot and the
/// trigger keyword.
pub struct Session {
    settings: ClientSettings,
    keyword: String,
    api: Option<Box<dyn TimeTrackingApi>>,
    cache: LocalCache,
}

impl Session {
    pub fn new(settings: ClientSettings, keyword: impl Into<String>) -> Self {
        Self {
            settings,
            keyword: keyword.into(),
            api: None,
            cache: LocalCache::default(),
        }
    }

    pub fn from_preferences(preferences: &Preferences) -> Self {
        let mut session = Self::new(preferences.client_settings(), preferences.keyword.clone());
        session.set_credential(preferences.api_token.as_deref());
        session
    }

    /// Swaps the credential and repopulates the cache before returning. A
    /// token that fails the shape check leaves the session unconfigured.
    pub fn set_credential(&mut self, token: Option<&str>) {
        self.api = None;
        self.cache.clear();

        let Some(token) = token.map(str::trim).filter(|token| token_looks_valid(Some(*token)))
        else {
            info!("no usable API token, session not configured");
            return;
        };

        match TogglClient::new(token, self.settings.clone()) {
            Ok(client) => {
                info!(token = %storage::fingerprint(token), "API token set");
                self.connect(Box::new(client));
            }
            Err(err) => error!(error = %err, "could not build Toggl client"),
        }
    }

    fn connect(&mut self, api: Box<dyn TimeTrackingApi>) {
        self.cache.clear();
        if let Err(err) = self.cache.refresh(api.as_ref()) {
            warn!(error = %err, "initial cache population failed, will retry on next query");
        }
        self.api = Some(api);
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn query(&mut self, text: &str) -> Vec<ResultOption> {
        self.query_at(text, Utc::now().timestamp())
    }

    pub fn query_at(&mut self, text: &str, now: i64) -> Vec<ResultOption> {
        let ctx = RouteContext {
            keyword: &self.keyword,
            now,
        };
        router::route_query(text, self.api.as_deref(), &mut self.cache, &ctx)
    }

    pub fn enter(&mut self, action: &BoundAction) -> Result<Confirmation, LaunchError> {
        let api = self.api.as_deref().ok_or(LaunchError::NotConfigured)?;
        dispatch::execute(action, api, &mut self.cache)
    }

    #[cfg(test)]
    pub fn with_api(api: Box<dyn TimeTrackingApi>, keyword: &str) -> Self {
        let mut session = Self::new(ClientSettings::default(), keyword);
        session.connect(api);
        session
    }
}
