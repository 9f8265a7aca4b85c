//! Image reference, digest and manifest types
//!
//! These are the read-only snapshots the collector works on: a parsed
//! [`ImageReference`], the [`BlobDigest`] used as deduplication key, and the
//! manifest shapes fetched from a registry.

pub mod digest;
pub mod manifest;
pub mod reference;

pub use digest::{BlobDigest, DigestUtils};
pub use manifest::{Descriptor, FetchedManifest, ImageIndex, ImageManifest, ManifestNode, Platform};
pub use reference::{Identifier, ImageReference};
