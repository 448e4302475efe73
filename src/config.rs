//! Client configuration
//!
//! Read once at startup from the environment (and an optional `.env` file),
//! then handed to [`crate::api::ApiClient`] explicitly.

use crate::{Error, Result};

pub const BACKEND_URL_VAR: &str = "BACKEND_URL";
pub const API_KEY_VAR: &str = "API_KEY";

#[derive(Clone)]
pub struct Config {
    pub backend_base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("backend_base_url", &self.backend_base_url)
            .field("has_api_key", &!self.api_key.is_empty())
            .finish()
    }
}

impl Config {
    pub fn new(backend_base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let backend_base_url = normalize_base_url(&backend_base_url.into())?;
        Ok(Self {
            backend_base_url,
            api_key: api_key.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_env_with(None, None)
    }

    /// Like [`Config::from_env`], but explicit values win over the environment.
    pub fn from_env_with(backend_url: Option<String>, api_key: Option<String>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        Self::from_lookup(|key| match key {
            BACKEND_URL_VAR => backend_url.clone().or_else(|| std::env::var(key).ok()),
            API_KEY_VAR => api_key.clone().or_else(|| std::env::var(key).ok()),
            _ => std::env::var(key).ok(),
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_base_url = lookup(BACKEND_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} not set", BACKEND_URL_VAR)))?;
        let api_key = lookup(API_KEY_VAR).unwrap_or_default();

        let config = Self::new(backend_base_url, api_key)?;
        tracing::info!(
            base_url = %config.backend_base_url,
            has_api_key = !config.api_key.is_empty(),
            key_length = config.api_key.len(),
            "API configuration loaded"
        );
        Ok(config)
    }

    /// Value of the `Authorization` header. Empty keys still produce `Bearer `.
    pub fn bearer_token(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "{} must start with http:// or https://, got '{}'",
            BACKEND_URL_VAR, raw
        )));
    }
    Ok(url.to_string())
}
