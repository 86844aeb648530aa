use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::toggl::{ClientSettings, CurrentEntryLookup, DEFAULT_BASE_URL};

pub const TOKEN_ENV: &str = "TOGGL_API_TOKEN";
pub const DEFAULT_KEYWORD: &str = "tg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default = "default_keyword")]
    pub keyword: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_related_data")]
    pub related_data: bool,
    #[serde(default)]
    pub current_entry_lookup: CurrentEntryLookup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            api_token: None,
            keyword: default_keyword(),
            base_url: default_base_url(),
            related_data: default_related_data(),
            current_entry_lookup: CurrentEntryLookup::default(),
            log_file: None,
        }
    }
}

impl Preferences {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            related_data: self.related_data,
            current_entry_lookup: self.current_entry_lookup,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".togglaunch.json");
    Some(path)
}

/// Reads preferences from `path` (or the default location), falling back to
/// defaults. `TOGGL_API_TOKEN` overrides the stored token.
pub fn read_preferences(path: Option<&Path>) -> Preferences {
    let path = path.map(Path::to_path_buf).or_else(config_path);
    let preferences = path
        .as_deref()
        .and_then(read_preferences_file)
        .unwrap_or_default();
    apply_env_token(preferences, env::var(TOKEN_ENV).ok())
}

pub fn write_token(path: Option<&Path>, token: &str) -> Result<(), io::Error> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(config_path)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Home directory not found"))?;
    let mut preferences = read_preferences_file(&path).unwrap_or_default();
    preferences.api_token = Some(token.trim().to_string());
    write_preferences_file(&path, &preferences)
}

fn read_preferences_file(path: &Path) -> Option<Preferences> {
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn write_preferences_file(path: &Path, preferences: &Preferences) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(preferences).map_err(io::Error::other)?;
    fs::write(path, json)
}

fn apply_env_token(mut preferences: Preferences, value: Option<String>) -> Preferences {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            preferences.api_token = Some(value.trim().to_string());
        }
    }
    preferences
}

/// Short SHA-256 prefix that identifies a token in logs without exposing it.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    result
        .iter()
        .take(6)
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn default_keyword() -> String {
    DEFAULT_KEYWORD.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_related_data() -> bool {
    true
}
