//! Image Blob Sizer Library
//!
//! Enumerates the content-addressed blobs (manifests and layers) referenced by
//! container image names in a remote registry, with each blob's size and a
//! deduplicated total.

pub mod cli;
pub mod collector;
pub mod common;
pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod output;
pub mod registry;

pub use collector::{BlobCollector, BlobSizeTable, CollectionReport};
pub use common::ManifestSource;
pub use config::{AppConfig, AuthConfig};
pub use error::{Result, SizerError};
