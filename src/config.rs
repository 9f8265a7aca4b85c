//! Configuration module for registry access and output settings

use crate::error::{Result, SizerError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const MAX_TIMEOUT_SECS: u64 = 86400;
pub const DEFAULT_MAX_DEPTH: usize = 8;
pub const TAG_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthConfig {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    /// Username and password, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match (&self.username, &self.password) {
            (Some(_), None) => Err(SizerError::Validation(
                "Password is required when username is provided".to_string(),
            )),
            (None, Some(_)) => Err(SizerError::Validation(
                "Username is required when password is provided".to_string(),
            )),
            (Some(username), Some(_)) if username.is_empty() => Err(SizerError::Validation(
                "Username cannot be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub skip_tls: bool,
    pub plain_http: bool,
    pub timeout: u64,
    pub tag_page_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            skip_tls: false,
            plain_http: false,
            timeout: DEFAULT_TIMEOUT_SECS,
            tag_page_size: TAG_PAGE_SIZE,
        }
    }
}

impl RegistryConfig {
    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn with_plain_http(mut self, plain_http: bool) -> Self {
        self.plain_http = plain_http;
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tag_page_size(mut self, tag_page_size: usize) -> Self {
        self.tag_page_size = tag_page_size;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout == 0 {
            return Err(SizerError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.timeout > MAX_TIMEOUT_SECS {
            return Err(SizerError::Validation(
                "Timeout cannot exceed 24 hours (86400 seconds)".to_string(),
            ));
        }

        if self.tag_page_size == 0 {
            return Err(SizerError::Validation(
                "Tag page size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Format of the blob report written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = SizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(SizerError::Validation(format!(
                "Output format must be one of: text, json (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub auth: AuthConfig,
    pub output: OutputFormat,
    pub max_depth: usize,
    pub images: Vec<String>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() {
            return Err(SizerError::Validation(
                "At least one image name is required".to_string(),
            ));
        }

        if self.max_depth == 0 {
            return Err(SizerError::Validation(
                "Max depth must be at least 1".to_string(),
            ));
        }

        self.registry.validate()?;
        self.auth.validate()
    }

    pub fn has_auth(&self) -> bool {
        self.auth.credentials().is_some()
    }
}
