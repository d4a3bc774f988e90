//! Configuration management for storefront-refs
//!
//! A single optional TOML file configures how the resolver reaches the
//! catalog lookup endpoint. See [`GlobalConfig`] for the format and location.
//!
//! # Configuration Priority
//!
//! 1. Command-line flags (`--endpoint`, `--timeout`)
//! 2. `--config <PATH>` or `SFREFS_CONFIG_PATH`
//! 3. `~/.sfrefs/config.toml`
//! 4. Default values

mod global;

pub use global::{GlobalConfig, LookupConfig};
