//! Reference resolution: one qualified reference, or every tag of a repository

use crate::collector::BlobCollector;
use crate::collector::table::BlobSizeTable;
use crate::common::ManifestSource;
use crate::error::{Result, SizerError};
use crate::image::ImageReference;
use tracing::info;

impl<S: ManifestSource> BlobCollector<S> {
    /// Collect blobs for one user-supplied image name.
    ///
    /// A name with a tag or digest is walked directly. A bare repository name
    /// expands to all of its tags; it is never defaulted to `latest`. A failed
    /// tag listing aborts the whole repository.
    pub async fn resolve(&self, image_name: &str) -> Result<BlobSizeTable> {
        let reference = ImageReference::parse(image_name)?;
        if reference.is_qualified() {
            return self.walk(&reference).await;
        }

        let tags = self
            .source
            .list_tags(&reference)
            .await
            .map_err(|e| SizerError::tag_list(reference.repository_name(), e))?;

        info!(repository = %reference.repository_name(), tags = tags.len(), "get blobs for all tags");

        let mut blobs = BlobSizeTable::new();
        for tag in &tags {
            blobs.merge(self.walk(&reference.with_tag(tag)).await?);
        }
        Ok(blobs)
    }
}
