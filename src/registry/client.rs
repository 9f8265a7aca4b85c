//! HTTP client for the Docker Registry v2 / OCI Distribution API
//!
//! Implements [`ManifestSource`] with two endpoints:
//! - tag listing (`GET /v2/{name}/tags/list`), following `Link` pagination
//! - manifest download (`GET /v2/{name}/manifests/{reference}`) with Accept
//!   headers for Docker v2, OCI image, and both index formats

use crate::common::ManifestSource;
use crate::config::{AuthConfig, RegistryConfig};
use crate::error::{Result, SizerError};
use crate::image::digest::DigestUtils;
use crate::image::manifest::{ACCEPTED_MANIFEST_TYPES, FetchedManifest, normalize_content_type};
use crate::image::reference::{Identifier, ImageReference};
use crate::registry::auth::{Auth, AuthChallenge};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LINK, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("image-blob-sizer/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct TagListResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

enum Credential<'a> {
    Anonymous,
    Bearer(String),
    Basic(&'a str, &'a str),
}

pub struct RegistryClientBuilder {
    registry_config: RegistryConfig,
    auth_config: AuthConfig,
}

impl RegistryClientBuilder {
    pub fn new() -> Self {
        Self {
            registry_config: RegistryConfig::default(),
            auth_config: AuthConfig::default(),
        }
    }

    pub fn with_registry_config(mut self, registry_config: RegistryConfig) -> Self {
        self.registry_config = registry_config;
        self
    }

    pub fn with_auth(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        self.registry_config.validate()?;
        self.auth_config.validate()?;

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.registry_config.timeout_duration());
        if self.registry_config.skip_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let client = builder.build()?;

        Ok(RegistryClient {
            auth: Auth::new(client.clone(), self.auth_config),
            client,
            config: self.registry_config,
            tokens: RwLock::new(HashMap::new()),
        })
    }
}

impl Default for RegistryClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RegistryClient {
    client: Client,
    config: RegistryConfig,
    auth: Auth,
    /// Bearer tokens keyed by `registry/repository`
    tokens: RwLock<HashMap<String, String>>,
}

impl RegistryClient {
    pub fn builder() -> RegistryClientBuilder {
        RegistryClientBuilder::new()
    }

    /// Base URL (`scheme://host[:port]`) for a registry host
    pub fn base_url(&self, registry: &str) -> String {
        format!("{}://{}", registry_scheme(registry, self.config.plain_http), registry)
    }

    async fn list_tags_internal(&self, repository: &ImageReference) -> Result<Vec<String>> {
        let mut url = Url::parse(&format!(
            "{}/v2/{}/tags/list",
            self.base_url(&repository.registry),
            repository.repository
        ))?;
        url.query_pairs_mut()
            .append_pair("n", &self.config.tag_page_size.to_string());

        let mut tags = Vec::new();
        let mut visited = HashSet::new();

        loop {
            visited.insert(url.to_string());
            let response = self.get(&url, repository, None).await?;
            let next = next_page(&url, &response)?;

            let body = response.bytes().await?;
            let page: TagListResponse = serde_json::from_slice(&body)?;
            let page_tags = page.tags.unwrap_or_default();
            debug!(%url, count = page_tags.len(), "received tag page");
            tags.extend(page_tags);

            match next {
                Some(next) if !visited.contains(next.as_str()) => url = next,
                _ => break,
            }
        }

        Ok(tags)
    }

    async fn fetch_manifest_internal(&self, reference: &ImageReference) -> Result<FetchedManifest> {
        let identifier = reference.identifier.as_ref().ok_or_else(|| {
            SizerError::Validation(format!("Reference '{}' has no tag or digest", reference))
        })?;

        let url = Url::parse(&format!(
            "{}/v2/{}/manifests/{}",
            self.base_url(&reference.registry),
            reference.repository,
            identifier.as_path()
        ))?;

        let accept = ACCEPTED_MANIFEST_TYPES.join(", ");
        let response = self.get(&url, reference, Some(&accept)).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(|h| normalize_content_type(h).to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await?.to_vec();
        let mut manifest = FetchedManifest::from_bytes(&content_type, bytes);
        if let Identifier::Digest(expected) = identifier {
            DigestUtils::verify(&manifest.bytes, expected)?;
            manifest = manifest.keyed_by(expected.clone());
        }

        debug!(
            %reference,
            media_type = %manifest.media_type,
            digest = %manifest.digest,
            size = manifest.size(),
            "fetched manifest"
        );
        Ok(manifest)
    }

    /// GET `url`, answering an authentication challenge once if the registry
    /// asks for one.
    async fn get(
        &self,
        url: &Url,
        reference: &ImageReference,
        accept: Option<&str>,
    ) -> Result<Response> {
        let token_key = reference.repository_name();
        let cached = self.cached_token(&token_key)?;
        let credential = match cached {
            Some(token) => Credential::Bearer(token),
            None => Credential::Anonymous,
        };

        let response = self.request(url, accept, &credential).send().await?;
        debug!(%url, status = %response.status(), "registry response");

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .and_then(AuthChallenge::parse);

            let credential = match challenge {
                Some(AuthChallenge::Bearer { realm, service, scope }) => {
                    let default_scope = format!("repository:{}:pull", reference.repository);
                    let token = self
                        .auth
                        .fetch_token(&realm, service.as_deref(), scope.as_deref(), &default_scope)
                        .await?;
                    self.store_token(token_key, token.clone())?;
                    Credential::Bearer(token)
                }
                Some(AuthChallenge::Basic) => {
                    let (username, password) = self.auth.credentials().ok_or_else(|| {
                        SizerError::Authentication(format!(
                            "Registry {} requires credentials",
                            reference.registry
                        ))
                    })?;
                    Credential::Basic(username, password)
                }
                None => {
                    return Err(SizerError::Authentication(format!(
                        "Unauthorized for {} with no usable challenge",
                        url
                    )));
                }
            };

            let retried = self.request(url, accept, &credential).send().await?;
            debug!(%url, status = %retried.status(), "registry response after authentication");
            if retried.status() == StatusCode::UNAUTHORIZED {
                return Err(SizerError::Authentication(format!(
                    "Credentials rejected for {}",
                    url
                )));
            }
            retried
        } else {
            response
        };

        check_status(url, response).await
    }

    fn request(&self, url: &Url, accept: Option<&str>, credential: &Credential<'_>) -> RequestBuilder {
        let mut request = self.client.get(url.clone());
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        match credential {
            Credential::Anonymous => request,
            Credential::Bearer(token) => request.bearer_auth(token),
            Credential::Basic(username, password) => request.basic_auth(username, Some(password)),
        }
    }

    fn cached_token(&self, key: &str) -> Result<Option<String>> {
        let guard = self.tokens.read().map_err(|_| {
            SizerError::Registry("Failed to acquire token read lock".to_string())
        })?;
        Ok(guard.get(key).cloned())
    }

    fn store_token(&self, key: String, token: String) -> Result<()> {
        let mut guard = self.tokens.write().map_err(|_| {
            SizerError::Registry("Failed to acquire token write lock".to_string())
        })?;
        guard.insert(key, token);
        Ok(())
    }
}

#[async_trait]
impl ManifestSource for RegistryClient {
    async fn list_tags(&self, repository: &ImageReference) -> Result<Vec<String>> {
        self.list_tags_internal(repository)
            .await
            .map_err(|e| SizerError::tag_list(repository.repository_name(), e))
    }

    async fn fetch_manifest(&self, reference: &ImageReference) -> Result<FetchedManifest> {
        self.fetch_manifest_internal(reference)
            .await
            .map_err(|e| SizerError::fetch(reference.to_string(), e))
    }
}

async fn check_status(url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());

    Err(match status {
        StatusCode::NOT_FOUND => SizerError::Registry(format!("Not found: {}", url)),
        StatusCode::FORBIDDEN => SizerError::Authentication(format!(
            "Forbidden: insufficient permissions for {}: {}",
            url, error_text
        )),
        StatusCode::TOO_MANY_REQUESTS => {
            SizerError::Registry(format!("Rate limited for {}: {}", url, error_text))
        }
        _ => SizerError::Registry(format!(
            "GET {} returned {}: {}",
            url, status, error_text
        )),
    })
}

/// Next page URL from a `Link: <...>; rel="next"` header, resolved against
/// the current request URL.
fn next_page(current: &Url, response: &Response) -> Result<Option<Url>> {
    let Some(link) = response.headers().get(LINK).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    match parse_next_link(link) {
        Some(target) => Ok(Some(current.join(target)?)),
        None => Ok(None),
    }
}

fn parse_next_link(header: &str) -> Option<&str> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params.split(';').any(|p| {
            let p = p.trim().replace(' ', "");
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target.trim().strip_prefix('<')?.strip_suffix('>')
    })
}

/// Localhost and loopback registries default to HTTP; everything else to
/// HTTPS unless `plain_http` is set.
fn registry_scheme(registry: &str, plain_http: bool) -> &'static str {
    let host = if let Some(bracketed) = registry.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or(bracketed)
    } else {
        registry.split(':').next().unwrap_or(registry)
    };

    if plain_http || host == "localhost" || host == "127.0.0.1" || host == "::1" {
        "http"
    } else {
        "https"
    }
}
