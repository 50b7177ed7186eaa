//! Configuration management for the identity stack.

use crate::{CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Default backend API URL (can be overridden at compile time via OPSBOARD_API_URL).
pub const DEFAULT_API_URL: &str = match option_env!("OPSBOARD_API_URL") {
    Some(url) => url,
    None => "https://opsboard.supabase.co",
};

/// Default publishable API key (can be overridden at compile time via OPSBOARD_PUBLISHABLE_KEY).
pub const DEFAULT_PUBLISHABLE_KEY: &str = match option_env!("OPSBOARD_PUBLISHABLE_KEY") {
    Some(key) => key,
    None => "public-anon-key",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default sign-up confirmation redirect path, appended to the app URL.
const CONFIRM_CALLBACK_PATH: &str = "/auth/callback";

/// Main configuration for the identity stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Backend project URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Publishable API key (public, safe to expose).
    #[serde(default = "default_publishable_key")]
    pub publishable_key: String,
    /// Web app origin used to build the sign-up confirmation redirect.
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_publishable_key() -> String {
    DEFAULT_PUBLISHABLE_KEY.to_string()
}

fn default_app_url() -> String {
    "https://app.opsboard.dev".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            publishable_key: DEFAULT_PUBLISHABLE_KEY.to_string(),
            app_url: default_app_url(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading configuration file");
            Self::load_from_file(&config_path)?
        } else {
            debug!("No configuration file, using defaults");
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        info!(path = %paths.config_file().display(), "Configuration saved");
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("OPSBOARD_LOG_LEVEL") {
            debug!(%log_level, "Log level overridden from environment");
            self.log_level = log_level;
        }
    }

    /// Get the backend API URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(crate::CoreError::from)
    }

    /// The redirect target sent with sign-up requests for email confirmation.
    pub fn confirm_redirect_url(&self) -> String {
        format!(
            "{}{}",
            self.app_url.trim_end_matches('/'),
            CONFIRM_CALLBACK_PATH
        )
    }
}
