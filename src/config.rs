//! Runtime configuration
//!
//! Read once from the environment at startup; feature flags are handed to
//! the components that need them at construction.

use crate::client::RemoteConfig;
use crate::locale::Language;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt4o";
pub const DEFAULT_QUESTIONS_ALLOWED: u32 = 4;

/// Optional behaviors of the chat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Count questions against a parent-granted allowance
    pub widget_restrict: bool,
    /// Ask the user to pick a profile before the first question
    pub survey: bool,
    /// Require a login before chatting
    pub login: bool,
    /// Authenticate against the built-in mock users
    pub mock_auth: bool,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_url: String,
    pub api_key: String,
    /// Origin serving `/api/config`, consulted before the env values
    pub config_url: Option<String>,
    pub model: String,
    pub language: Language,
    pub state_path: PathBuf,
    pub flags: FeatureFlags,
    pub questions_allowed: u32,
    pub parent_origin: String,
}

fn flag(value: Option<String>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let state_path = var("GENESIS_STATE_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.genesis-chat/state.db"))
            },
            PathBuf::from,
        );

        Self {
            api_url: var("GENESIS_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            api_key: var("GENESIS_API_KEY").unwrap_or_default(),
            config_url: var("GENESIS_CONFIG_URL").filter(|u| !u.is_empty()),
            model: var("GENESIS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language: Language::from_stored(var("GENESIS_LANGUAGE").as_deref()),
            state_path,
            flags: FeatureFlags {
                widget_restrict: flag(var("GENESIS_WIDGET_RESTRICT")),
                survey: flag(var("GENESIS_SURVEY")),
                login: flag(var("GENESIS_LOGIN")),
                mock_auth: flag(var("GENESIS_MOCK_AUTH")),
            },
            questions_allowed: var("GENESIS_QUESTIONS_ALLOWED")
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_QUESTIONS_ALLOWED),
            parent_origin: var("GENESIS_PARENT_ORIGIN").unwrap_or_default(),
        }
    }

    /// Let values served by `/api/config` take precedence.
    pub fn apply_remote(&mut self, remote: RemoteConfig) {
        if !remote.api_url.is_empty() {
            self.api_url = remote.api_url.trim_end_matches('/').to_string();
        }
        if !remote.api_key.is_empty() {
            self.api_key = remote.api_key;
        }
    }
}
