//! Client configuration.
//!
//! Configuration for talking to a Mattermost server that hosts the Bugsnag
//! plugin:
//! - Server base URL and access token
//! - Plugin id, which scopes the plugin API paths
//! - Request timeout and platform user page size

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SyncError};

/// Plugin id the Bugsnag plugin registers with Mattermost.
pub const DEFAULT_PLUGIN_ID: &str = "com.mattermost.bugsnag";

/// Largest page the Mattermost users endpoint accepts.
pub const MAX_USERS_PER_PAGE: u32 = 200;

/// Configuration for an admin client.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdminConfig {
    /// Mattermost server base URL.
    pub server_url: String,
    /// Plugin id used to build `/plugins/{id}/api/v1/...` paths.
    pub plugin_id: String,
    /// Personal access token sent as a bearer token.
    pub access_token: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Page size for the platform user catalog.
    pub users_per_page: u32,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8065".to_string(),
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            access_token: None,
            request_timeout_secs: 15,
            users_per_page: MAX_USERS_PER_PAGE,
        }
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("server_url", &self.server_url)
            .field("plugin_id", &self.plugin_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("users_per_page", &self.users_per_page)
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SyncError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SyncError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        if self.plugin_id.trim().is_empty() {
            return Err(SyncError::Config("plugin_id cannot be empty".to_string()));
        }

        if self.plugin_id.contains('/') {
            return Err(SyncError::Config(
                "plugin_id cannot contain '/'".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(SyncError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.users_per_page == 0 || self.users_per_page > MAX_USERS_PER_PAGE {
            return Err(SyncError::Config(format!(
                "users_per_page must be between 1 and {MAX_USERS_PER_PAGE}"
            )));
        }

        Ok(())
    }

    /// Parses and checks the server URL.
    ///
    /// # Errors
    ///
    /// Returns an error unless the URL is an absolute `http`/`https` URL.
    pub fn base_url(&self) -> Result<Url> {
        if self.server_url.trim().is_empty() {
            return Err(SyncError::Config("server_url cannot be empty".to_string()));
        }

        let url = Url::parse(self.server_url.trim())
            .map_err(|e| SyncError::Config(format!("invalid server_url: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::Config(
                "server_url must start with http:// or https://".to_string(),
            ));
        }

        Ok(url)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API paths for this configuration.
    #[must_use]
    pub fn paths(&self) -> ApiPaths {
        ApiPaths::new(&self.plugin_id).with_users_per_page(self.users_per_page)
    }
}

/// Builds the request paths of the plugin API and the platform catalogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPaths {
    plugin_prefix: String,
    users_per_page: u32,
}

impl ApiPaths {
    /// Paths for the plugin registered as `plugin_id`.
    #[must_use]
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_prefix: format!("/plugins/{}/api/v1", plugin_id.trim()),
            users_per_page: MAX_USERS_PER_PAGE,
        }
    }

    /// Sets the page size for the users catalog.
    #[must_use]
    pub const fn with_users_per_page(mut self, per_page: u32) -> Self {
        self.users_per_page = per_page;
        self
    }

    fn plugin(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.plugin_prefix)
    }

    /// `POST` connection test.
    #[must_use]
    pub fn test(&self) -> String {
        self.plugin("test")
    }

    /// `GET` provider projects.
    #[must_use]
    pub fn projects(&self) -> String {
        self.plugin("projects")
    }

    /// `GET` provider organizations.
    #[must_use]
    pub fn organizations(&self) -> String {
        self.plugin("organizations")
    }

    /// `GET` provider collaborators.
    #[must_use]
    pub fn collaborators(&self) -> String {
        self.plugin("collaborators")
    }

    /// `GET`/`POST` project→channel rules.
    #[must_use]
    pub fn channel_rules(&self) -> String {
        self.plugin("channel-rules")
    }

    /// `GET`/`POST` user mappings.
    #[must_use]
    pub fn user_mappings(&self) -> String {
        self.plugin("user-mappings")
    }

    /// `GET` platform channels.
    #[must_use]
    pub fn channels(&self) -> String {
        "/api/v4/channels".to_string()
    }

    /// `GET` platform users, first page.
    #[must_use]
    pub fn users(&self) -> String {
        format!("/api/v4/users?per_page={}", self.users_per_page)
    }
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self::new(DEFAULT_PLUGIN_ID)
    }
}
