//! Registry collaborator interface

use crate::error::Result;
use crate::image::{FetchedManifest, ImageReference};
use async_trait::async_trait;

/// Read-only view of a container registry as consumed by the blob collector
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// List every tag of `repository`. The identifier of the reference, if
    /// any, is ignored.
    async fn list_tags(&self, repository: &ImageReference) -> Result<Vec<String>>;

    /// Fetch the manifest named by a qualified reference (tag or digest).
    async fn fetch_manifest(&self, reference: &ImageReference) -> Result<FetchedManifest>;
}

#[async_trait]
impl<T: ManifestSource + ?Sized> ManifestSource for &T {
    async fn list_tags(&self, repository: &ImageReference) -> Result<Vec<String>> {
        (**self).list_tags(repository).await
    }

    async fn fetch_manifest(&self, reference: &ImageReference) -> Result<FetchedManifest> {
        (**self).fetch_manifest(reference).await
    }
}
