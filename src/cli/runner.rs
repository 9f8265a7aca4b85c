//! Runner: builds the registry client, collects blobs and prints the report

use crate::cli::args::Args;
use crate::collector::{BlobCollector, CollectionReport};
use crate::common::ManifestSource;
use crate::config::AppConfig;
use crate::error::Result;
use crate::logging::{format_duration, format_size};
use crate::output;
use crate::registry::RegistryClient;
use std::io::Write;
use std::time::Instant;
use tracing::info;

pub struct Runner {
    config: AppConfig,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        let config = args.to_config()?;
        Ok(Self { config })
    }

    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Collect from the configured registries and write the report to stdout.
    pub async fn run(&self) -> Result<()> {
        let client = RegistryClient::builder()
            .with_registry_config(self.config.registry.clone())
            .with_auth(self.config.auth.clone())
            .build()?;

        info!(
            images = self.config.images.len(),
            authenticated = self.config.has_auth(),
            "starting blob collection"
        );

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_with(client, &mut out).await
    }

    /// Collect through `source` and write the report to `out`. Nothing is
    /// written when collection fails.
    pub async fn run_with<S, W>(&self, source: S, out: &mut W) -> Result<()>
    where
        S: ManifestSource,
        W: Write,
    {
        let report = self.collect(source).await?;
        output::write_report(out, &report, self.config.output)
    }

    async fn collect<S: ManifestSource>(&self, source: S) -> Result<CollectionReport> {
        let start_time = Instant::now();
        let collector = BlobCollector::new(source).with_max_depth(self.config.max_depth);
        let report = collector.run(&self.config.images).await?;

        info!(
            blobs = report.blobs.len(),
            total = %format_size(report.total),
            elapsed = %format_duration(start_time.elapsed()),
            "blob collection completed"
        );
        Ok(report)
    }
}
