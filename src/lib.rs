//! storefront-refs - catalog reference resolution for storefront payloads
//!
//! Promotion and marketing payloads served to a storefront reference catalog
//! products and variants by identifier, scattered at arbitrary depth. Before
//! those payloads can be rendered, every identifier needs a display name (and
//! for variants, a SKU). This crate does that in two steps:
//!
//! 1. [`extract`] walks any JSON tree and collects product and variant
//!    identifiers by key name (`productId`, `relatedProductIds`,
//!    `giftVariantId`, ...)
//! 2. [`resolver`] resolves identifier sets through a memoized, batched
//!    catalog lookup that only ever asks the network for what it does not
//!    already know, and never fails its caller
//!
//! # Core Modules
//!
//! - [`extract`] - Identifier extraction (generic and promotion-aware)
//! - [`resolver`] - [`ReferenceCache`](resolver::ReferenceCache), the memo
//!   table and the [`CatalogLookup`](resolver::CatalogLookup) transport seam
//! - [`models`] - Identifier sets, display records and lookup wire types
//!
//! # Supporting Modules
//!
//! - [`config`] - Global configuration (`~/.sfrefs/config.toml`)
//! - [`core`] - Error types and user-facing error reporting
//! - [`cli`] - The `sfrefs` command-line interface
//! - [`constants`] - Timeouts and configuration locations
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_refs::extract::extract_refs;
//! use storefront_refs::models::ResolveOptions;
//! use storefront_refs::resolver::{HttpCatalogClient, ReferenceCache};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = ReferenceCache::new(HttpCatalogClient::new(
//!     "https://shop.example.com/store/catalog/lookup",
//!     Duration::from_secs(10),
//! )?);
//!
//! let promotion = json!({
//!     "conditions": [{ "eligibleProductIds": ["prod_1", "prod_2"] }],
//!     "actions": [{ "giftVariantId": "variant_9" }]
//! });
//!
//! let refs = extract_refs(&promotion);
//! let resolved = cache.resolve_sets(&refs, ResolveOptions::default()).await;
//! assert_eq!(resolved.products.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod extract;
pub mod models;
pub mod resolver;
