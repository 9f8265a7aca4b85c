//! Image blob extraction: the manifest itself plus every layer

use crate::collector::table::BlobSizeTable;
use crate::error::Result;
use crate::image::{FetchedManifest, ImageManifest};

/// Blob sizes of a single image: one entry for the manifest, one per layer
/// in manifest order. Any unreadable layer descriptor fails the whole image.
pub fn extract(manifest: &FetchedManifest, image: &ImageManifest) -> Result<BlobSizeTable> {
    let mut blobs = BlobSizeTable::new();
    blobs.insert(manifest.digest.clone(), manifest.size());

    for layer in &image.layers {
        let (digest, size) = layer.read()?;
        blobs.insert(digest, size);
    }

    Ok(blobs)
}
