//! Authentication for Docker registry access
//!
//! Registries answer an unauthenticated request with `401` and a
//! `WWW-Authenticate` challenge. A `Bearer` challenge names a token realm; the
//! token is fetched there (anonymously or with basic credentials) and used for
//! the retried request. A `Basic` challenge is answered with the configured
//! credentials directly.

use crate::config::AuthConfig;
use crate::error::{Result, SizerError};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChallenge {
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    Basic,
}

impl AuthChallenge {
    /// Parse a `WWW-Authenticate` header value. Unknown schemes yield `None`.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));

        if scheme.eq_ignore_ascii_case("basic") {
            return Some(AuthChallenge::Basic);
        }
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut params = parse_params(params);
        let realm = params.remove("realm")?;
        Some(AuthChallenge::Bearer {
            realm,
            service: params.remove("service"),
            scope: params.remove("scope"),
        })
    }
}

/// Split `key="value",key2="value2"` pairs. Commas inside quotes (as in
/// `scope="repository:foo:pull,push"`) do not end a value.
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let Some(eq_pos) = rest.find('=') else { break };
        let key = rest[..eq_pos].trim().trim_start_matches(',').trim().to_ascii_lowercase();
        let after = rest[eq_pos + 1..].trim_start();

        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            match after.find(',') {
                Some(end) => (after[..end].trim(), &after[end..]),
                None => (after.trim(), ""),
            }
        };

        params.insert(key, value.to_string());
        rest = remaining.trim_start().trim_start_matches(',').trim_start();
    }

    params
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Auth {
    client: Client,
    config: AuthConfig,
}

impl Auth {
    pub fn new(client: Client, config: AuthConfig) -> Self {
        Self { client, config }
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.config.credentials()
    }

    /// Obtain a bearer token from `realm`. `default_scope` is used when the
    /// challenge carries no scope.
    pub async fn fetch_token(
        &self,
        realm: &str,
        service: Option<&str>,
        scope: Option<&str>,
        default_scope: &str,
    ) -> Result<String> {
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(2);
        if let Some(service) = service {
            query.push(("service", service));
        }
        query.push(("scope", scope.unwrap_or(default_scope)));

        let url = Url::parse_with_params(realm, &query)?;
        debug!(%url, authenticated = self.credentials().is_some(), "requesting bearer token");

        let mut request = self.client.get(url);
        if let Some((username, password)) = self.credentials() {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(SizerError::Authentication(format!(
                "Token request failed with status {}: {}",
                status, error_text
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        token_response
            .token
            .or(token_response.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SizerError::Authentication("Token response missing token field".to_string())
            })
    }
}
