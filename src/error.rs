//! Error handling module for the blob sizer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SizerError {
    #[error("Invalid image reference: {0}")]
    ReferenceParse(String),

    #[error("Failed to get tags for '{repository}': {source}")]
    TagList {
        repository: String,
        #[source]
        source: Box<SizerError>,
    },

    #[error("Failed to fetch manifest '{reference}': {source}")]
    Fetch {
        reference: String,
        #[source]
        source: Box<SizerError>,
    },

    #[error("Manifest '{reference}' is not image and image index but '{media_type}'")]
    UnsupportedManifest {
        reference: String,
        media_type: String,
    },

    #[error("Descriptor error: {0}")]
    DescriptorRead(String),

    #[error("Image index nesting under '{reference}' exceeds depth {depth}")]
    NestingTooDeep { reference: String, depth: usize },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SizerError {
    /// Wrap `source` as a tag listing failure. An error that already is one
    /// is returned unchanged.
    pub fn tag_list(repository: impl Into<String>, source: SizerError) -> Self {
        match source {
            err @ SizerError::TagList { .. } => err,
            other => SizerError::TagList {
                repository: repository.into(),
                source: Box::new(other),
            },
        }
    }

    /// Wrap `source` as a manifest fetch failure. An error that already is
    /// one is returned unchanged.
    pub fn fetch(reference: impl Into<String>, source: SizerError) -> Self {
        match source {
            err @ SizerError::Fetch { .. } => err,
            other => SizerError::Fetch {
                reference: reference.into(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_list_error_names_repository() {
        let err = SizerError::tag_list(
            "library/busybox",
            SizerError::Registry("HTTP 500".to_string()),
        );
        let msg = err.to_string();
        assert!(msg.contains("library/busybox"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn wrapping_is_idempotent() {
        let inner = SizerError::fetch("busybox:1", SizerError::Registry("Not found".to_string()));
        match SizerError::fetch("busybox:other", inner) {
            SizerError::Fetch { reference, .. } => assert_eq!(reference, "busybox:1"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unsupported_manifest_reports_media_type() {
        let err = SizerError::UnsupportedManifest {
            reference: "busybox:old".to_string(),
            media_type: "application/vnd.docker.distribution.manifest.v1+prettyjws".to_string(),
        };
        assert!(err.to_string().contains("manifest.v1+prettyjws"));
    }
}
