//! Manifest types and media-type classification
//!
//! A fetched manifest is classified exactly once into a [`ManifestNode`]:
//! either an image index (multi-platform) or a single image. Descriptors are
//! decoded leniently and validated on read, so a missing digest or size is
//! reported as a descriptor error rather than a JSON error.

use crate::error::{Result, SizerError};
use crate::image::digest::BlobDigest;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Media types sent in the `Accept` header of manifest requests
pub const ACCEPTED_MANIFEST_TYPES: [&str; 4] = [
    MEDIA_TYPE_OCI_INDEX,
    MEDIA_TYPE_DOCKER_MANIFEST_LIST,
    MEDIA_TYPE_OCI_MANIFEST,
    MEDIA_TYPE_DOCKER_MANIFEST,
];

/// Manifest kind derived from a media type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestType {
    Index,
    Image,
    /// No usable media type; the body decides
    Generic,
    Unsupported,
}

impl ManifestType {
    pub fn from_media_type(media_type: &str) -> Self {
        match media_type {
            MEDIA_TYPE_OCI_INDEX | MEDIA_TYPE_DOCKER_MANIFEST_LIST => ManifestType::Index,
            MEDIA_TYPE_OCI_MANIFEST | MEDIA_TYPE_DOCKER_MANIFEST => ManifestType::Image,
            "" | "application/json" | "text/plain" | "application/octet-stream" => {
                ManifestType::Generic
            }
            _ => ManifestType::Unsupported,
        }
    }
}

/// Target platform of a manifest inside an image index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default)]
    pub variant: Option<String>,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

/// A content descriptor as it appears in manifests and indexes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType", default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub digest: Option<String>,

    #[serde(default)]
    pub size: Option<i64>,

    #[serde(default)]
    pub platform: Option<Platform>,
}

impl Descriptor {
    /// Validated digest and size of the described blob
    pub fn read(&self) -> Result<(BlobDigest, u64)> {
        let digest = self.digest()?;
        let size = match self.size {
            Some(size) if size >= 0 => size as u64,
            Some(size) => {
                return Err(SizerError::DescriptorRead(format!(
                    "Negative size {} for {}",
                    size, digest
                )));
            }
            None => {
                return Err(SizerError::DescriptorRead(format!(
                    "Descriptor {} has no size",
                    digest
                )));
            }
        };
        Ok((digest, size))
    }

    pub fn digest(&self) -> Result<BlobDigest> {
        let raw = self.digest.as_deref().ok_or_else(|| {
            SizerError::DescriptorRead("Descriptor has no digest".to_string())
        })?;
        BlobDigest::parse(raw)
    }

    pub fn media_type(&self) -> &str {
        self.media_type.as_deref().unwrap_or("unknown")
    }

    pub fn platform_label(&self) -> String {
        self.platform
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// A single image manifest (OCI or Docker v2 schema 2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageManifest {
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: u32,

    #[serde(rename = "mediaType", default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub config: Option<Descriptor>,

    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

/// An image index / manifest list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageIndex {
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: u32,

    #[serde(rename = "mediaType", default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub manifests: Vec<Descriptor>,
}

/// Classified manifest content
#[derive(Debug, Clone)]
pub enum ManifestNode {
    Index(ImageIndex),
    Image(ImageManifest),
}

/// Raw manifest bytes as returned by a registry, with the digest they hash to
#[derive(Debug, Clone)]
pub struct FetchedManifest {
    pub media_type: String,
    pub digest: BlobDigest,
    pub bytes: Vec<u8>,
}

impl FetchedManifest {
    /// Wrap `bytes`, computing the sha256 digest. An empty `media_type` is
    /// replaced by the body's `mediaType` field when present.
    pub fn from_bytes(media_type: &str, bytes: Vec<u8>) -> Self {
        let media_type = if media_type.is_empty() || media_type == "application/json" {
            body_media_type(&bytes).unwrap_or_else(|| media_type.to_string())
        } else {
            media_type.to_string()
        };
        Self {
            digest: BlobDigest::sha256_of(&bytes),
            media_type,
            bytes,
        }
    }

    /// Record the manifest under `digest` instead of its computed sha256.
    /// Used when a registry served it for a digest of another algorithm.
    pub fn keyed_by(mut self, digest: BlobDigest) -> Self {
        self.digest = digest;
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Decide index vs. image in one step.
    pub fn classify(&self, reference: &str) -> Result<ManifestNode> {
        let unsupported = || SizerError::UnsupportedManifest {
            reference: reference.to_string(),
            media_type: self.media_type.clone(),
        };

        match ManifestType::from_media_type(&self.media_type) {
            ManifestType::Index => Ok(ManifestNode::Index(self.decode()?)),
            ManifestType::Image => Ok(ManifestNode::Image(self.decode()?)),
            ManifestType::Unsupported => Err(unsupported()),
            ManifestType::Generic => {
                let raw: serde_json::Value = serde_json::from_slice(&self.bytes)
                    .map_err(|_| unsupported())?;
                if raw.get("manifests").is_some_and(|m| m.is_array()) {
                    Ok(ManifestNode::Index(serde_json::from_value(raw).map_err(decode_error)?))
                } else if raw.get("layers").is_some_and(|l| l.is_array()) {
                    Ok(ManifestNode::Image(serde_json::from_value(raw).map_err(decode_error)?))
                } else {
                    Err(unsupported())
                }
            }
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.bytes).map_err(decode_error)
    }
}

fn decode_error(err: serde_json::Error) -> SizerError {
    SizerError::DescriptorRead(format!("Malformed manifest: {}", err))
}

fn body_media_type(bytes: &[u8]) -> Option<String> {
    let raw: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    raw.get("mediaType")?.as_str().map(str::to_string)
}

/// Strip parameters from a `Content-Type` value (`type; charset=utf-8`)
pub fn normalize_content_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}
