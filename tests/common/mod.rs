//! Shared fixtures for storefront-refs integration tests.
//!
//! [`MockCatalog`] is a scripted [`CatalogLookup`] that records every request
//! it receives, so tests can assert exactly what went over the "network".

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

use storefront_refs::core::RefsError;
use storefront_refs::models::{LookupRequest, LookupResponse, ProductRef, VariantRef};
use storefront_refs::resolver::CatalogLookup;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for a test binary.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// In-memory catalog with scripted contents.
///
/// Only identifiers present in the catalog are returned; everything else is
/// simply omitted from the response, like the real endpoint.
#[derive(Default)]
pub struct MockCatalog {
    products: Mutex<HashMap<String, Option<String>>>,
    variants: Mutex<HashMap<String, (Option<String>, Option<String>)>>,
    requests: Mutex<Vec<LookupRequest>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product with an optional name.
    pub fn with_product(self, id: &str, name: Option<&str>) -> Self {
        self.set_product(id, name);
        self
    }

    /// Add a variant with optional SKU and name.
    pub fn with_variant(self, id: &str, sku: Option<&str>, name: Option<&str>) -> Self {
        self.variants
            .lock()
            .unwrap()
            .insert(id.to_string(), (sku.map(str::to_string), name.map(str::to_string)));
        self
    }

    /// Delay every lookup by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_product(&self, id: &str, name: Option<&str>) {
        self.products.lock().unwrap().insert(id.to_string(), name.map(str::to_string));
    }

    pub fn remove_product(&self, id: &str) {
        self.products.lock().unwrap().remove(id);
    }

    /// Make subsequent lookups fail with a 503.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<LookupRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn answer(&self, request: &LookupRequest) -> LookupResponse {
        let products = self.products.lock().unwrap();
        let variants = self.variants.lock().unwrap();

        LookupResponse {
            products: request
                .product_ids
                .iter()
                .filter_map(|id| {
                    products.get(id).map(|name| ProductRef {
                        id: id.clone(),
                        name: name.clone(),
                    })
                })
                .collect(),
            variants: request
                .variant_ids
                .iter()
                .filter_map(|id| {
                    variants.get(id).map(|(sku, name)| VariantRef {
                        id: id.clone(),
                        sku: sku.clone(),
                        name: name.clone(),
                    })
                })
                .collect(),
        }
    }
}

impl CatalogLookup for MockCatalog {
    async fn lookup(&self, request: &LookupRequest) -> Result<LookupResponse, RefsError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(RefsError::LookupStatus {
                endpoint: "mock://catalog".to_string(),
                status: 503,
            });
        }

        Ok(self.answer(request))
    }
}
