//! Command-line interface for storefront-refs.
//!
//! The `sfrefs` binary exposes the extractor and the resolver for scripting
//! and for diagnosing payloads outside the storefront:
//!
//! - `extract` - Print the product and variant identifiers found in payloads
//! - `promotion` - Same, using the promotion-aware extraction helper
//! - `resolve` - Extract and resolve identifiers through the catalog lookup
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug logging (cache hits, claims, HTTP requests)
//! - `--quiet` - Only log errors
//! - `--config <PATH>` - Use a specific configuration file
//!
//! # Examples
//!
//! ```bash
//! sfrefs extract promo.json
//! sfrefs promotion promotions.json
//! sfrefs --verbose resolve --endpoint https://shop.test/lookup promo.json banner.json
//! ```

mod common;
mod extract;
mod promotion;
mod resolve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use extract::ExtractCommand;
pub use promotion::PromotionCommand;
pub use resolve::ResolveCommand;

/// Runtime configuration derived from the global CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter directive; `None` defers to `RUST_LOG` (or `info`).
    pub log_level: Option<String>,
    /// Explicit configuration file path.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Install the global tracing subscriber, logging to stderr.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init();
    }
}

/// Catalog reference extraction and resolution for storefront payloads.
#[derive(Parser)]
#[command(
    name = "sfrefs",
    about = "Extract and resolve catalog product/variant references in storefront payloads",
    version,
    long_about = "sfrefs finds product and variant identifiers anywhere in JSON payloads and \
                  resolves them to display names and SKUs through a memoized, batched catalog lookup."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output (memo hits, in-flight waits, HTTP requests).
    ///
    /// Overrides `RUST_LOG`. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: ~/.sfrefs/config.toml).
    #[arg(short, long, global = true, env = "SFREFS_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the identifiers found anywhere in JSON payload files.
    Extract(ExtractCommand),

    /// Print the identifiers referenced by promotion payload files.
    Promotion(PromotionCommand),

    /// Extract identifiers and resolve them through the catalog lookup.
    Resolve(ResolveCommand),
}

impl Cli {
    /// Execute the parsed command with configuration from the global flags.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload cannot be read or parsed, or the
    /// configuration is unusable. Lookup failures are not errors.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the parsed flags.
    ///
    /// - `--verbose` → `debug`
    /// - `--quiet` → `error`
    /// - neither → defer to `RUST_LOG`
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an injected configuration.
    ///
    /// # Errors
    ///
    /// See [`Cli::execute`].
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Extract(cmd) => cmd.execute().await,
            Commands::Promotion(cmd) => cmd.execute().await,
            Commands::Resolve(cmd) => cmd.execute(config.config_path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_levels() {
        let cli = Cli::parse_from(["sfrefs", "--verbose", "extract", "a.json"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));

        let cli = Cli::parse_from(["sfrefs", "-q", "extract", "a.json"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("error"));

        let cli = Cli::parse_from(["sfrefs", "--config", "/tmp/c.toml", "extract", "a.json"]);
        let config = cli.build_config();
        assert_eq!(config.log_level, None);
        assert_eq!(config.config_path, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["sfrefs", "-v", "-q", "extract", "a.json"]).is_err());
    }

    #[test]
    fn test_resolve_flags_parse() {
        let cli = Cli::try_parse_from([
            "sfrefs",
            "resolve",
            "--endpoint",
            "http://127.0.0.1:9/lookup",
            "--timeout",
            "2",
            "--force",
            "a.json",
            "b.json",
        ]);
        assert!(cli.is_ok());
    }
}
