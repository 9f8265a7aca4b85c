//! Manifest walking: index → child manifests → images

use crate::collector::BlobCollector;
use crate::collector::extractor::extract;
use crate::collector::table::BlobSizeTable;
use crate::common::ManifestSource;
use crate::error::{Result, SizerError};
use crate::image::{FetchedManifest, ImageReference, ManifestNode};
use std::future::Future;
use std::pin::Pin;
use tracing::info;

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<BlobSizeTable>> + Send + 'a>>;

impl<S: ManifestSource> BlobCollector<S> {
    /// Fetch the manifest of a qualified reference and collect the blobs it
    /// covers. Children of an index are visited in the order the registry
    /// lists them.
    pub async fn walk(&self, reference: &ImageReference) -> Result<BlobSizeTable> {
        let manifest = self
            .source
            .fetch_manifest(reference)
            .await
            .map_err(|e| SizerError::fetch(reference.to_string(), e))?;
        self.visit(reference, manifest, 0).await
    }

    fn visit<'a>(
        &'a self,
        reference: &'a ImageReference,
        manifest: FetchedManifest,
        depth: usize,
    ) -> WalkFuture<'a> {
        Box::pin(async move {
            let index = match manifest.classify(&reference.to_string())? {
                ManifestNode::Image(image) => {
                    info!(%reference, digest = %manifest.digest, "get blobs from image");
                    return extract(&manifest, &image);
                }
                ManifestNode::Index(index) => index,
            };

            if depth >= self.max_depth {
                return Err(SizerError::NestingTooDeep {
                    reference: reference.to_string(),
                    depth: self.max_depth,
                });
            }

            let mut blobs = BlobSizeTable::new();
            blobs.insert(manifest.digest.clone(), manifest.size());

            info!(
                %reference,
                digest = %manifest.digest,
                children = index.manifests.len(),
                "get images from image index"
            );

            for entry in &index.manifests {
                let digest = entry.digest()?;
                info!(
                    %reference,
                    %digest,
                    platform = %entry.platform_label(),
                    media_type = entry.media_type(),
                    "get blobs from image"
                );

                let child_ref = reference.with_digest(&digest);
                let child = self
                    .source
                    .fetch_manifest(&child_ref)
                    .await
                    .map_err(|e| SizerError::fetch(child_ref.to_string(), e))?;
                blobs.merge(self.visit(&child_ref, child, depth + 1).await?);
            }

            Ok(blobs)
        })
    }
}
