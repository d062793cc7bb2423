//! Core configuration.
//!
//! # Responsibility
//! - Hold the settings collaborators need (API base URL, optional fixed
//!   client id) as an explicit value passed in at construction time.
//!
//! # Invariants
//! - `api_base_url` never ends with a trailing slash; endpoint builders
//!   append their own.

use std::env;

/// Base URL used when neither code nor environment supplies one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "ENSO_API_URL";

/// Settings shared by HTTP repositories and sync transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    api_base_url: String,
    client_id: Option<String>,
}

impl CoreConfig {
    /// Builds a config for the given base URL, trimming trailing slashes.
    pub fn new(api_base_url: &str) -> Self {
        let trimmed = api_base_url.trim().trim_end_matches('/');
        let api_base_url = if trimmed.is_empty() {
            DEFAULT_API_URL.to_string()
        } else {
            trimmed.to_string()
        };
        Self {
            api_base_url,
            client_id: None,
        }
    }

    /// Reads the base URL from [`API_URL_ENV`], falling back to the default.
    pub fn from_env() -> Self {
        match env::var(API_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::new(&value),
            _ => Self::default(),
        }
    }

    /// Pins the sync client id instead of minting one on first use.
    pub fn with_client_id(mut self, client_id: &str) -> Self {
        let trimmed = client_id.trim();
        self.client_id = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
