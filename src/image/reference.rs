//! Image reference parsing
//!
//! Unlike most registry tooling, an image name without a tag or digest is NOT
//! defaulted to `latest`: it denotes every tag of the repository.

use crate::error::{Result, SizerError};
use crate::image::digest::BlobDigest;
use std::fmt;

pub const DOCKER_HUB_REGISTRY: &str = "registry-1.docker.io";
const DOCKER_HUB_ALIASES: [&str; 3] = ["docker.io", "index.docker.io", DOCKER_HUB_REGISTRY];
const MAX_TAG_LEN: usize = 128;

/// Tag or digest qualifying a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Tag(String),
    Digest(BlobDigest),
}

impl Identifier {
    /// Value as used in the `/manifests/<reference>` URL path
    pub fn as_path(&self) -> &str {
        match self {
            Identifier::Tag(tag) => tag,
            Identifier::Digest(digest) => digest.as_str(),
        }
    }
}

/// A parsed image reference: registry host, repository path and optional
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub identifier: Option<Identifier>,
}

impl ImageReference {
    /// Parse an image name.
    ///
    /// Supported formats:
    /// - `busybox` (all tags of `library/busybox` on Docker Hub)
    /// - `alpine:3.20`
    /// - `ghcr.io/foo/bar:v1`
    /// - `localhost:5000/repo@sha256:<hex>`
    /// - `busybox:1.36@sha256:<hex>` (fetched by digest)
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SizerError::ReferenceParse("empty image reference".to_string()));
        }

        let (name_part, identifier) = if let Some((name, digest)) = raw.split_once('@') {
            let digest = BlobDigest::parse(digest).map_err(|e| {
                SizerError::ReferenceParse(format!("invalid digest in '{}': {}", raw, e))
            })?;
            // `name:tag@digest` is fetched by digest; the tag is dropped.
            let (name, _tag) = split_tag(raw, name)?;
            (name, Some(Identifier::Digest(digest)))
        } else {
            match split_tag(raw, raw)? {
                (name, Some(tag)) => (name, Some(Identifier::Tag(tag.to_string()))),
                (name, None) => (name, None),
            }
        };

        let (registry, repository) = split_registry(name_part);

        let repository = if DOCKER_HUB_ALIASES.contains(&registry.as_str()) && !repository.contains('/') {
            format!("library/{}", repository)
        } else {
            repository
        };
        let registry = if DOCKER_HUB_ALIASES.contains(&registry.as_str()) {
            DOCKER_HUB_REGISTRY.to_string()
        } else {
            registry
        };

        validate_repository(raw, &repository)?;

        Ok(Self {
            registry,
            repository,
            identifier,
        })
    }

    /// Same repository, qualified by `tag`
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            identifier: Some(Identifier::Tag(tag.to_string())),
        }
    }

    /// Same repository, qualified by `digest`
    pub fn with_digest(&self, digest: &BlobDigest) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            identifier: Some(Identifier::Digest(digest.clone())),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.identifier.is_some()
    }

    /// `registry/repository` without identifier
    pub fn repository_name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        match &self.identifier {
            Some(Identifier::Tag(tag)) => write!(f, ":{}", tag),
            Some(Identifier::Digest(digest)) => write!(f, "@{}", digest),
            None => Ok(()),
        }
    }
}

/// Split a trailing `:tag` off `name`. A tag colon always comes after the
/// last '/', otherwise it belongs to a registry port ("localhost:5000/repo").
fn split_tag<'a>(raw: &str, name: &'a str) -> Result<(&'a str, Option<&'a str>)> {
    let after_last_slash = name.rfind('/').map(|p| p + 1).unwrap_or(0);
    match name.rfind(':') {
        Some(colon_pos) if colon_pos >= after_last_slash => {
            let tag = &name[colon_pos + 1..];
            validate_tag(raw, tag)?;
            Ok((&name[..colon_pos], Some(tag)))
        }
        _ => Ok((name, None)),
    }
}

/// Split `name` into registry host and repository path. The first component
/// is a registry when it contains a dot or a port, or is `localhost`.
fn split_registry(name: &str) -> (String, String) {
    match name.split_once('/') {
        Some((first, rest)) if first.contains('.') || first.contains(':') || first == "localhost" => {
            (first.to_string(), rest.to_string())
        }
        _ => (DOCKER_HUB_REGISTRY.to_string(), name.to_string()),
    }
}

fn validate_tag(raw: &str, tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || "_.-".contains(c));

    if !valid_first || !valid_rest || tag.len() > MAX_TAG_LEN {
        return Err(SizerError::ReferenceParse(format!(
            "invalid tag '{}' in '{}'",
            tag, raw
        )));
    }
    Ok(())
}

fn validate_repository(raw: &str, repository: &str) -> Result<()> {
    let component_ok = |component: &str| {
        let bytes = component.as_bytes();
        !component.is_empty()
            && bytes[0].is_ascii_alphanumeric()
            && bytes[bytes.len() - 1].is_ascii_alphanumeric()
            && component
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c))
    };

    if repository.is_empty() || !repository.split('/').all(component_ok) {
        return Err(SizerError::ReferenceParse(format!(
            "invalid repository name '{}' in '{}'",
            repository, raw
        )));
    }
    Ok(())
}
