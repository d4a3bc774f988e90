//! The `resolve` command: extract and resolve identifiers in payloads.
//!
//! All files share one [`ReferenceCache`], and their resolutions run
//! concurrently, so identifiers common to several files are fetched once.
//! Lookup failures do not fail the command: affected entries are printed
//! with `null` fields.
//!
//! ```bash
//! sfrefs resolve --endpoint https://shop.test/lookup promo.json banner.json
//! sfrefs resolve --stats --timeout 3 promo.json
//! ```

use super::common::read_payload;
use crate::config::GlobalConfig;
use crate::extract::extract_refs;
use crate::models::{ResolveOptions, ResolvedRefs};
use crate::resolver::{HttpCatalogClient, ReferenceCache};
use anyhow::{Context, Result};
use clap::Args;
use futures::future::join_all;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Extract identifiers and resolve them through the catalog lookup.
#[derive(Debug, Args)]
pub struct ResolveCommand {
    /// JSON payload files to resolve.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Catalog lookup endpoint (overrides the config file).
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Lookup timeout in seconds (overrides the config file).
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Re-fetch identifiers even if already resolved.
    #[arg(long)]
    force: bool,

    /// Print cache statistics to stderr when done.
    #[arg(long)]
    stats: bool,
}

#[derive(Serialize)]
struct FileResolution<'a> {
    file: String,
    #[serde(flatten)]
    resolved: &'a ResolvedRefs,
}

impl ResolveCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no endpoint is
    /// configured, or a payload cannot be read or parsed.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let mut config = GlobalConfig::load_with_optional(config_path).await?;
        if let Some(endpoint) = self.endpoint {
            config.lookup.endpoint = Some(endpoint);
        }
        if let Some(timeout) = self.timeout {
            config.lookup.timeout_secs = timeout;
        }

        let client = HttpCatalogClient::from_config(&config.lookup)
            .context("Cannot create catalog lookup client")?;
        let cache = ReferenceCache::new(client);

        let mut payloads = Vec::with_capacity(self.files.len());
        for path in &self.files {
            payloads.push(extract_refs(&read_payload(path).await?));
        }

        let options = ResolveOptions { force: self.force };
        let resolutions =
            join_all(payloads.iter().map(|sets| cache.resolve_sets(sets, options))).await;

        let output: Vec<FileResolution<'_>> = self
            .files
            .iter()
            .zip(&resolutions)
            .map(|(path, resolved)| FileResolution {
                file: path.display().to_string(),
                resolved,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);

        let stats = cache.stats();
        info!(
            "{} lookups ({} failed), {:.1}% served from memo",
            stats.lookups_issued,
            stats.lookups_failed,
            stats.hit_rate()
        );
        if self.stats {
            eprintln!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Ok(())
    }
}
