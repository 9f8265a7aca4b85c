//! Blob collection
//!
//! [`BlobCollector`] drives the traversal top-down: the resolver turns an
//! image name into qualified references, the walker classifies each manifest
//! and descends into indexes, and the extractor reads an image's manifest and
//! layer sizes. Each level returns an owned [`BlobSizeTable`] that its caller
//! merges; nothing is shared between calls.
//!
//! Processing is sequential and fail-fast: the first error ends the run and
//! no partial result is returned.

pub mod extractor;
pub mod resolver;
pub mod table;
pub mod walker;

pub use table::BlobSizeTable;

use crate::common::ManifestSource;
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::Result;
use tracing::info;

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub blobs: BlobSizeTable,
    pub total: u64,
}

impl CollectionReport {
    pub fn new(blobs: BlobSizeTable) -> Result<Self> {
        let total = blobs.total()?;
        Ok(Self { blobs, total })
    }
}

pub struct BlobCollector<S> {
    source: S,
    max_depth: usize,
}

impl<S: ManifestSource> BlobCollector<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how many image indexes may nest inside each other
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolve every name in order and merge the results into one table.
    pub async fn run<I>(&self, image_names: I) -> Result<CollectionReport>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut blobs = BlobSizeTable::new();
        for name in image_names {
            let name = name.as_ref();
            info!(image = name, "collecting blobs");
            blobs.merge(self.resolve(name).await?);
        }
        CollectionReport::new(blobs)
    }
}
