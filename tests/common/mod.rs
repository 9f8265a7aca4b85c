//! In-memory registry used by the collector tests

#![allow(dead_code)]

use async_trait::async_trait;
use image_blob_sizer::image::manifest::{
    MEDIA_TYPE_DOCKER_MANIFEST, MEDIA_TYPE_DOCKER_MANIFEST_LIST, MEDIA_TYPE_OCI_INDEX,
    MEDIA_TYPE_OCI_MANIFEST,
};
use image_blob_sizer::image::{BlobDigest, FetchedManifest, ImageReference};
use image_blob_sizer::{ManifestSource, Result, SizerError};
use std::collections::HashMap;
use std::sync::Mutex;

pub const REGISTRY: &str = "registry.test";

/// Registry contents keyed by reference strings such as
/// `registry.test/app:1.0` or `registry.test/app@sha256:...`.
#[derive(Default)]
pub struct FakeRegistry {
    tags: HashMap<String, Vec<String>>,
    failing_tag_lists: Vec<String>,
    manifests: HashMap<String, FetchedManifest>,
    fetches: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, repository: &str, tags: &[&str]) -> Self {
        self.tags.insert(
            format!("{}/{}", REGISTRY, repository),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn with_failing_tags(mut self, repository: &str) -> Self {
        self.failing_tag_lists.push(format!("{}/{}", REGISTRY, repository));
        self
    }

    /// Serve `manifest` under `repository:tag` and under its digest.
    pub fn with_tagged(mut self, repository: &str, tag: &str, manifest: &FetchedManifest) -> Self {
        self.manifests
            .insert(format!("{}/{}:{}", REGISTRY, repository, tag), manifest.clone());
        self.with_digest(repository, manifest)
    }

    /// Serve `manifest` under its digest only.
    pub fn with_digest(mut self, repository: &str, manifest: &FetchedManifest) -> Self {
        self.manifests.insert(
            format!("{}/{}@{}", REGISTRY, repository, manifest.digest),
            manifest.clone(),
        );
        self
    }

    /// References fetched so far, in order
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManifestSource for FakeRegistry {
    async fn list_tags(&self, repository: &ImageReference) -> Result<Vec<String>> {
        let key = repository.repository_name();
        if self.failing_tag_lists.contains(&key) {
            return Err(SizerError::Registry("HTTP 500 Internal Server Error".to_string()));
        }
        self.tags
            .get(&key)
            .cloned()
            .ok_or_else(|| SizerError::Registry(format!("Not found: {}", key)))
    }

    async fn fetch_manifest(&self, reference: &ImageReference) -> Result<FetchedManifest> {
        let key = reference.to_string();
        self.fetches.lock().unwrap().push(key.clone());
        self.manifests
            .get(&key)
            .cloned()
            .ok_or_else(|| SizerError::Registry(format!("Not found: {}", key)))
    }
}

pub fn name(repository: &str) -> String {
    format!("{}/{}", REGISTRY, repository)
}

/// Deterministic fake layer digest
pub fn layer_digest(seed: char) -> BlobDigest {
    BlobDigest::parse(&format!("sha256:{}", seed.to_string().repeat(64))).unwrap()
}

pub fn oci_image(layers: &[(&BlobDigest, u64)]) -> FetchedManifest {
    image_with_type(MEDIA_TYPE_OCI_MANIFEST, layers)
}

pub fn docker_image(layers: &[(&BlobDigest, u64)]) -> FetchedManifest {
    image_with_type(MEDIA_TYPE_DOCKER_MANIFEST, layers)
}

fn image_with_type(media_type: &str, layers: &[(&BlobDigest, u64)]) -> FetchedManifest {
    let layers: Vec<serde_json::Value> = layers
        .iter()
        .map(|(digest, size)| {
            serde_json::json!({
                "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
                "digest": digest.as_str(),
                "size": size,
            })
        })
        .collect();
    let body = serde_json::json!({
        "schemaVersion": 2,
        "mediaType": media_type,
        "config": {
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "digest": format!("sha256:{}", "c".repeat(64)),
            "size": 1469,
        },
        "layers": layers,
    });
    FetchedManifest::from_bytes(media_type, serde_json::to_vec(&body).unwrap())
}

pub fn oci_index(children: &[&FetchedManifest]) -> FetchedManifest {
    index_with_type(MEDIA_TYPE_OCI_INDEX, children)
}

pub fn docker_manifest_list(children: &[&FetchedManifest]) -> FetchedManifest {
    index_with_type(MEDIA_TYPE_DOCKER_MANIFEST_LIST, children)
}

fn index_with_type(media_type: &str, children: &[&FetchedManifest]) -> FetchedManifest {
    let architectures = ["amd64", "arm64", "s390x", "ppc64le"];
    let manifests: Vec<serde_json::Value> = children
        .iter()
        .enumerate()
        .map(|(i, child)| {
            serde_json::json!({
                "mediaType": child.media_type,
                "digest": child.digest.as_str(),
                "size": child.size(),
                "platform": {
                    "os": "linux",
                    "architecture": architectures[i % architectures.len()],
                },
            })
        })
        .collect();
    let body = serde_json::json!({
        "schemaVersion": 2,
        "mediaType": media_type,
        "manifests": manifests,
    });
    FetchedManifest::from_bytes(media_type, serde_json::to_vec(&body).unwrap())
}

pub fn raw_manifest(media_type: &str, body: &str) -> FetchedManifest {
    FetchedManifest::from_bytes(media_type, body.as_bytes().to_vec())
}
