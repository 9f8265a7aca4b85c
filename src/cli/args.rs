//! Command-line argument parsing

use crate::config::{AppConfig, AuthConfig, DEFAULT_MAX_DEPTH, OutputFormat, RegistryConfig};
use crate::error::{Result, SizerError};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "image-blob-sizer")]
#[command(about = "List the manifest and layer blobs of container images with their sizes")]
#[command(version)]
pub struct Args {
    /// Image names; a name without tag or digest covers every tag
    #[arg(value_name = "IMAGE", required = true, num_args = 1..)]
    pub images: Vec<String>,

    /// Registry username
    #[arg(long = "username", short = 'u', help = "Username for registry authentication")]
    pub username: Option<String>,

    /// Registry password
    #[arg(long = "password", short = 'p', help = "Password for registry authentication")]
    pub password: Option<String>,

    /// Skip TLS verification
    #[arg(long = "skip-tls", short = 'k', help = "Skip TLS certificate verification")]
    pub skip_tls: bool,

    /// Plain HTTP for all registries
    #[arg(long = "plain-http", help = "Talk to every registry over plain HTTP")]
    pub plain_http: bool,

    /// Timeout in seconds for network operations
    #[arg(
        long = "timeout",
        short = 't',
        default_value = "300",
        help = "Timeout for network operations in seconds"
    )]
    pub timeout: u64,

    /// Maximum image index nesting
    #[arg(
        long = "max-depth",
        default_value_t = DEFAULT_MAX_DEPTH,
        help = "Maximum nesting of image indexes"
    )]
    pub max_depth: usize,

    /// Output format for results
    #[arg(
        long = "output",
        short = 'o',
        default_value = "text",
        help = "Output format: text, json"
    )]
    pub output: String,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(long = "quiet", short = 'q', help = "Only log warnings and errors")]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<()> {
        self.to_config().map(|_| ())
    }

    /// Load configuration from environment variables. Credentials given on
    /// the command line take precedence; the other variables override.
    pub fn from_env(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.username.is_none() {
            self.username = lookup("BLOB_SIZER_USERNAME");
        }

        if self.password.is_none() {
            self.password = lookup("BLOB_SIZER_PASSWORD");
        }

        if let Some(timeout) = lookup("BLOB_SIZER_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout = t;
            }
        }

        if lookup("BLOB_SIZER_VERBOSE").as_deref().is_some_and(is_enabled) {
            self.verbose = true;
        }

        if lookup("BLOB_SIZER_SKIP_TLS").as_deref().is_some_and(is_enabled) {
            self.skip_tls = true;
        }

        if lookup("BLOB_SIZER_PLAIN_HTTP").as_deref().is_some_and(is_enabled) {
            self.plain_http = true;
        }

        self
    }

    /// Build and validate the application configuration
    pub fn to_config(&self) -> Result<AppConfig> {
        let output: OutputFormat = self.output.parse()?;

        if self.images.iter().any(|name| name.trim().is_empty()) {
            return Err(SizerError::Validation(
                "Image names cannot be empty".to_string(),
            ));
        }

        let config = AppConfig {
            registry: RegistryConfig::default()
                .with_skip_tls(self.skip_tls)
                .with_plain_http(self.plain_http)
                .with_timeout(self.timeout),
            auth: AuthConfig::new(self.username.clone(), self.password.clone()),
            output,
            max_depth: self.max_depth,
            images: self.images.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Truthy environment value (`1`, `true`, `yes`, `on`). Anything else,
/// including `0` and `false`, leaves the flag as given on the command line.
fn is_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
