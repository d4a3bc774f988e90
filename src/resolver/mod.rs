//! Reference resolution cache for catalog identifiers.
//!
//! [`ReferenceCache`] turns identifier sets (usually from
//! [`extract_refs`](crate::extract::extract_refs)) into display records, going
//! to the catalog only for what it does not already know.
//!
//! # Resolution Flow
//!
//! For one [`ReferenceCache::resolve`] call:
//! 1. **Sanitize**: drop empty identifiers, collapse duplicates
//! 2. **Gap computation**: an identifier is missing if the call is forced, or
//!    its memo entry is Unknown or Negative
//! 3. **Claim**: missing identifiers not already being fetched by another
//!    call are claimed by this call; the rest are awaited
//! 4. **Fetch**: one lookup carrying only the claimed identifiers
//! 5. **Merge** (success only): returned entries are written verbatim;
//!    claimed identifiers the catalog did not mention are written Negative
//! 6. **Answer**: one entry per requested identifier, read from the memo
//!
//! When nothing is missing, steps 3-5 are skipped and the call completes
//! without suspending.
//!
//! # Failure Handling
//!
//! `resolve` never fails. A failed lookup (transport error, timeout, non-2xx,
//! bad body) is logged and leaves the memo untouched, so a transient outage
//! does not record anything as Negative. The answer is whatever the memo
//! already holds, with absent fields for the rest.
//!
//! # Concurrency
//!
//! The cache is `Clone`; clones share state. Concurrent calls that need the
//! same identifier coordinate through an in-flight table: the first call
//! reserves the identifier with a shared handle, later calls wait on it and
//! then read the memo. Reservations are released by a drop guard, so a failed
//! or cancelled fetch wakes its waiters too.
//!
//! A fetch that completed (successfully or not) settles its handle, and its
//! waiters answer from the memo. A fetch whose call was cancelled never
//! settles: its waiters go back to the claim step and fetch what is still
//! missing themselves, in one follow-up lookup. All waiting within one call
//! shares a single deadline of [`PENDING_STATE_TIMEOUT`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use storefront_refs::extract::extract_refs;
//! use storefront_refs::models::ResolveOptions;
//! use storefront_refs::resolver::{HttpCatalogClient, ReferenceCache};
//! use std::time::Duration;
//!
//! # async fn example(payload: serde_json::Value) -> anyhow::Result<()> {
//! let client = HttpCatalogClient::new("https://shop.example.com/lookup", Duration::from_secs(10))?;
//! let cache = ReferenceCache::new(client);
//!
//! let refs = extract_refs(&payload);
//! let resolved = cache.resolve(&refs.product_ids, &refs.variant_ids, ResolveOptions::default()).await;
//! for product in &resolved.products {
//!     println!("{} -> {:?}", product.id, product.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
mod memo;

pub use client::{CatalogLookup, HttpCatalogClient};
pub use memo::{MemoCounts, ResolutionState};

use crate::constants::PENDING_STATE_TIMEOUT;
use crate::models::{IdentifierSets, LookupRequest, RefKind, ResolveOptions, ResolvedRefs};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use memo::{MemoTable, ProductInfo, VariantInfo};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// An identifier qualified by its space, the unit of in-flight tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RefKey {
    kind: RefKind,
    id: String,
}

/// Handle shared between the call fetching some identifiers and the calls
/// waiting on them.
#[derive(Debug, Default)]
struct InFlight {
    notify: Notify,
    /// Set once the owner's lookup has completed, successfully or not.
    settled: AtomicBool,
}

impl InFlight {
    fn settle(&self) {
        self.settled.store(true, Ordering::Release);
    }

    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

type InFlightTable = DashMap<RefKey, Arc<InFlight>>;

/// How a wait on another call's lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    /// The owner's lookup completed; the memo holds whatever it produced.
    Settled,
    /// The owner was dropped before its lookup completed.
    Abandoned,
    /// The call's pending deadline passed first.
    TimedOut,
}

/// Reservation of identifiers being fetched by one `resolve` call.
///
/// Dropping the claim removes its reservations and wakes every waiter,
/// whether the fetch succeeded, failed or was cancelled.
struct InFlightClaim {
    keys: Vec<RefKey>,
    handle: Arc<InFlight>,
    in_flight: Arc<InFlightTable>,
}

impl InFlightClaim {
    fn request(&self) -> LookupRequest {
        let mut request = LookupRequest::default();
        for key in &self.keys {
            match key.kind {
                RefKind::Product => request.product_ids.push(key.id.clone()),
                RefKind::Variant => request.variant_ids.push(key.id.clone()),
            }
        }
        request
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        for key in &self.keys {
            self.in_flight.remove_if(key, |_, handle| Arc::ptr_eq(handle, &self.handle));
        }
        self.handle.notify.notify_waiters();
    }
}

#[derive(Debug, Default)]
struct Counters {
    lookups_issued: AtomicU64,
    lookups_failed: AtomicU64,
    ids_from_memo: AtomicU64,
    ids_fetched: AtomicU64,
    ids_coalesced: AtomicU64,
}

/// Snapshot of cache activity and memo contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Memo entries per kind and state.
    pub entries: MemoCounts,
    /// Lookups sent to the catalog.
    pub lookups_issued: u64,
    /// Lookups that failed and fell back to the memo.
    pub lookups_failed: u64,
    /// Requested identifiers answered without any fetch.
    pub ids_from_memo: u64,
    /// Identifiers carried by lookups this cache issued.
    pub ids_fetched: u64,
    /// Identifiers that joined another call's in-flight lookup.
    pub ids_coalesced: u64,
}

impl CacheStats {
    /// Share of requested identifiers answered from the memo, as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.ids_from_memo + self.ids_fetched + self.ids_coalesced;
        if total == 0 {
            0.0
        } else {
            (self.ids_from_memo as f64 / total as f64) * 100.0
        }
    }
}

/// Memoizing, batching resolver of product and variant identifiers.
///
/// Construct one per client session and share it (it is cheap to clone).
/// Memo entries live as long as the cache and are never evicted.
pub struct ReferenceCache<C> {
    client: Arc<C>,
    memo: Arc<MemoTable>,
    in_flight: Arc<InFlightTable>,
    counters: Arc<Counters>,
    pending_timeout: Duration,
}

impl<C> Clone for ReferenceCache<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            memo: Arc::clone(&self.memo),
            in_flight: Arc::clone(&self.in_flight),
            counters: Arc::clone(&self.counters),
            pending_timeout: self.pending_timeout,
        }
    }
}

impl<C: CatalogLookup> ReferenceCache<C> {
    /// Create an empty cache resolving through `client`.
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            memo: Arc::new(MemoTable::new()),
            in_flight: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
            pending_timeout: PENDING_STATE_TIMEOUT,
        }
    }

    /// Override how long a call waits on another call's in-flight lookup.
    #[must_use]
    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    /// The lookup client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Current resolution state of a product identifier.
    pub fn product_state(&self, id: &str) -> ResolutionState {
        self.memo.state(RefKind::Product, id)
    }

    /// Current resolution state of a variant identifier.
    pub fn variant_state(&self, id: &str) -> ResolutionState {
        self.memo.state(RefKind::Variant, id)
    }

    /// When an identifier's memo entry was last written.
    pub fn fetched_at(&self, kind: RefKind, id: &str) -> Option<DateTime<Utc>> {
        self.memo.fetched_at(kind, id)
    }

    /// Snapshot of activity counters and memo contents.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.memo.counts(),
            lookups_issued: self.counters.lookups_issued.load(Ordering::Relaxed),
            lookups_failed: self.counters.lookups_failed.load(Ordering::Relaxed),
            ids_from_memo: self.counters.ids_from_memo.load(Ordering::Relaxed),
            ids_fetched: self.counters.ids_fetched.load(Ordering::Relaxed),
            ids_coalesced: self.counters.ids_coalesced.load(Ordering::Relaxed),
        }
    }

    /// Resolve the identifiers of an extracted payload.
    pub async fn resolve_sets(&self, sets: &IdentifierSets, options: ResolveOptions) -> ResolvedRefs {
        self.resolve(&sets.product_ids, &sets.variant_ids, options).await
    }

    /// Resolve product and variant identifiers to display records.
    ///
    /// Returns exactly one entry per distinct non-empty input identifier,
    /// in first-occurrence order. Never fails; see the module docs for how
    /// lookup failures degrade.
    pub async fn resolve<P, V>(
        &self,
        product_ids: P,
        variant_ids: V,
        options: ResolveOptions,
    ) -> ResolvedRefs
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let products = sanitize(product_ids);
        let variants = sanitize(variant_ids);

        let missing: Vec<RefKey> = products
            .iter()
            .map(|id| (RefKind::Product, id))
            .chain(variants.iter().map(|id| (RefKind::Variant, id)))
            .filter(|(kind, id)| self.memo.needs_fetch(*kind, id, options.force))
            .map(|(kind, id)| RefKey {
                kind,
                id: id.clone(),
            })
            .collect();

        let from_memo = (products.len() + variants.len() - missing.len()) as u64;
        self.counters.ids_from_memo.fetch_add(from_memo, Ordering::Relaxed);

        if missing.is_empty() {
            debug!(
                target: "resolver",
                "All {} identifiers served from memo",
                products.len() + variants.len()
            );
            return self.answer(&products, &variants);
        }

        let deadline = Instant::now() + self.pending_timeout;
        let mut pending = missing;
        let mut coalesced = false;

        while !pending.is_empty() {
            let (claim, awaited) = self.claim(pending);

            if !claim.keys.is_empty() {
                let request = claim.request();
                self.fetch_and_merge(&request, options.force).await;
                claim.handle.settle();
            }
            drop(claim);

            if awaited.is_empty() {
                break;
            }

            debug!(
                target: "resolver",
                "Waiting on {} identifiers already being fetched",
                awaited.len()
            );
            if !coalesced {
                self.counters.ids_coalesced.fetch_add(awaited.len() as u64, Ordering::Relaxed);
                coalesced = true;
            }

            let mut abandoned = Vec::new();
            for (key, handle) in awaited {
                let outcome = self.wait_for(&key, handle, deadline).await;
                if outcome == WaitOutcome::Abandoned
                    && self.memo.needs_fetch(key.kind, &key.id, options.force)
                {
                    abandoned.push(key);
                }
            }

            if !abandoned.is_empty() {
                debug!(
                    target: "resolver",
                    "{} identifiers were left unfetched by a cancelled call; fetching them",
                    abandoned.len()
                );
            }
            pending = abandoned;
        }

        self.answer(&products, &variants)
    }

    /// Reserve every missing identifier nobody else is fetching.
    ///
    /// Returns this call's claim and, for identifiers owned by other calls,
    /// the handle of the lookup to wait on.
    fn claim(&self, missing: Vec<RefKey>) -> (InFlightClaim, Vec<(RefKey, Arc<InFlight>)>) {
        let handle = Arc::new(InFlight::default());
        let mut claimed = Vec::new();
        let mut awaited = Vec::new();

        for key in missing {
            match self.in_flight.entry(key) {
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    claimed.push(entry.key().clone());
                    entry.insert(Arc::clone(&handle));
                }
                dashmap::mapref::entry::Entry::Occupied(entry) => {
                    awaited.push((entry.key().clone(), Arc::clone(entry.get())));
                }
            }
        }

        let claim = InFlightClaim {
            keys: claimed,
            handle,
            in_flight: Arc::clone(&self.in_flight),
        };
        (claim, awaited)
    }

    /// Wait until the lookup behind `handle` releases `key`, or `deadline`.
    ///
    /// If an abandoned reservation was taken over by another call, the wait
    /// moves on to that call's lookup.
    async fn wait_for(
        &self,
        key: &RefKey,
        mut handle: Arc<InFlight>,
        deadline: Instant,
    ) -> WaitOutcome {
        loop {
            // Register before checking: the owner removes its entry before
            // calling notify_waiters, so either the check sees the removal
            // or this future receives the wakeup.
            let notified = handle.notify.notified();
            let current = self.in_flight.get(key).map(|entry| Arc::clone(entry.value()));

            match current {
                Some(current) if Arc::ptr_eq(&current, &handle) => {
                    tokio::select! {
                        () = notified => {}
                        () = tokio::time::sleep_until(deadline) => {
                            warn!(
                                target: "resolver",
                                "Timed out waiting for in-flight lookup of {} {}; answering from memo",
                                key.kind,
                                key.id
                            );
                            return WaitOutcome::TimedOut;
                        }
                    }
                }
                _ if handle.is_settled() => return WaitOutcome::Settled,
                Some(current) => {
                    drop(notified);
                    handle = current;
                }
                None => return WaitOutcome::Abandoned,
            }
        }
    }

    async fn fetch_and_merge(&self, request: &LookupRequest, force: bool) {
        let requested = (request.product_ids.len() + request.variant_ids.len()) as u64;
        self.counters.lookups_issued.fetch_add(1, Ordering::Relaxed);
        self.counters.ids_fetched.fetch_add(requested, Ordering::Relaxed);

        info!(
            target: "resolver",
            "Looking up {} products and {} variants{}",
            request.product_ids.len(),
            request.variant_ids.len(),
            if force { " (forced)" } else { "" }
        );

        match self.client.lookup(request).await {
            Ok(response) => {
                let mut seen_products = HashSet::new();
                for product in response.products {
                    if product.id.is_empty() {
                        continue;
                    }
                    seen_products.insert(product.id.clone());
                    self.memo.write_product(
                        product.id,
                        ProductInfo {
                            name: product.name,
                        },
                        force,
                    );
                }

                let mut seen_variants = HashSet::new();
                for variant in response.variants {
                    if variant.id.is_empty() {
                        continue;
                    }
                    seen_variants.insert(variant.id.clone());
                    self.memo.write_variant(
                        variant.id,
                        VariantInfo {
                            sku: variant.sku,
                            name: variant.name,
                        },
                        force,
                    );
                }

                let mut negative = 0usize;
                for id in request.product_ids.iter().filter(|id| !seen_products.contains(*id)) {
                    self.memo.write_product(id.clone(), ProductInfo::default(), force);
                    negative += 1;
                }
                for id in request.variant_ids.iter().filter(|id| !seen_variants.contains(*id)) {
                    self.memo.write_variant(id.clone(), VariantInfo::default(), force);
                    negative += 1;
                }

                if negative > 0 {
                    debug!(
                        target: "resolver",
                        "Catalog returned nothing for {negative} identifiers; recorded as negative"
                    );
                }
            }
            Err(error) => {
                self.counters.lookups_failed.fetch_add(1, Ordering::Relaxed);
                warn!(target: "resolver", "{error}; answering from memo");
            }
        }
    }

    fn answer(&self, products: &[String], variants: &[String]) -> ResolvedRefs {
        ResolvedRefs {
            products: products.iter().map(|id| self.memo.product(id)).collect(),
            variants: variants.iter().map(|id| self.memo.variant(id)).collect(),
        }
    }
}

/// Drop empty identifiers and duplicates, keeping first-occurrence order.
fn sanitize<I>(ids: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut ids: Vec<String> = ids
        .into_iter()
        .map(|id| id.as_ref().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}
