//! The memo table behind [`ReferenceCache`](super::ReferenceCache).
//!
//! One concurrent map per identifier space. An identifier with no entry is
//! *Unknown*; an entry whose display fields are all `None` is *Negative*;
//! anything else is *Resolved*.
//!
//! Writes follow one rule: a non-forced write never turns a *Resolved* entry
//! back into a *Negative* one. Entries are never removed.

use crate::models::{ProductRef, RefKind, VariantRef};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Resolution state of a single identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionState {
    /// Never looked up.
    Unknown,
    /// Looked up; the catalog had nothing to say.
    Negative,
    /// Looked up; at least one display field is known.
    Resolved,
}

/// Display fields memoized for one identifier.
pub(crate) trait DisplayFields: Clone {
    /// Whether every display field is absent.
    fn is_negative(&self) -> bool;
}

/// Memoized product display data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProductInfo {
    pub(crate) name: Option<String>,
}

impl DisplayFields for ProductInfo {
    fn is_negative(&self) -> bool {
        self.name.is_none()
    }
}

/// Memoized variant display data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct VariantInfo {
    pub(crate) sku: Option<String>,
    pub(crate) name: Option<String>,
}

impl DisplayFields for VariantInfo {
    fn is_negative(&self) -> bool {
        self.sku.is_none() && self.name.is_none()
    }
}

#[derive(Debug, Clone)]
struct MemoEntry<T> {
    info: T,
    fetched_at: DateTime<Utc>,
}

/// Number of memo entries per kind and state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoCounts {
    /// Products with a known name.
    pub products_resolved: usize,
    /// Products looked up without result.
    pub products_negative: usize,
    /// Variants with a known name or SKU.
    pub variants_resolved: usize,
    /// Variants looked up without result.
    pub variants_negative: usize,
}

/// Process-lifetime memo of resolution results, keyed per identifier space.
#[derive(Debug, Default)]
pub(crate) struct MemoTable {
    products: DashMap<String, MemoEntry<ProductInfo>>,
    variants: DashMap<String, MemoEntry<VariantInfo>>,
}

impl MemoTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self, kind: RefKind, id: &str) -> ResolutionState {
        match kind {
            RefKind::Product => state_of(&self.products, id),
            RefKind::Variant => state_of(&self.variants, id),
        }
    }

    /// Whether `id` has to go to the network.
    ///
    /// Negative entries are retried on every request that includes them.
    pub(crate) fn needs_fetch(&self, kind: RefKind, id: &str, force: bool) -> bool {
        force || self.state(kind, id) != ResolutionState::Resolved
    }

    pub(crate) fn product(&self, id: &str) -> ProductRef {
        match self.products.get(id) {
            Some(entry) => ProductRef {
                id: id.to_string(),
                name: entry.info.name.clone(),
            },
            None => ProductRef::absent(id),
        }
    }

    pub(crate) fn variant(&self, id: &str) -> VariantRef {
        match self.variants.get(id) {
            Some(entry) => VariantRef {
                id: id.to_string(),
                sku: entry.info.sku.clone(),
                name: entry.info.name.clone(),
            },
            None => VariantRef::absent(id),
        }
    }

    /// When `id` was last written, if ever.
    pub(crate) fn fetched_at(&self, kind: RefKind, id: &str) -> Option<DateTime<Utc>> {
        match kind {
            RefKind::Product => self.products.get(id).map(|e| e.fetched_at),
            RefKind::Variant => self.variants.get(id).map(|e| e.fetched_at),
        }
    }

    pub(crate) fn write_product(&self, id: String, info: ProductInfo, force: bool) -> bool {
        write_entry(&self.products, id, info, force)
    }

    pub(crate) fn write_variant(&self, id: String, info: VariantInfo, force: bool) -> bool {
        write_entry(&self.variants, id, info, force)
    }

    pub(crate) fn counts(&self) -> MemoCounts {
        let (products_resolved, products_negative) = count_states(&self.products);
        let (variants_resolved, variants_negative) = count_states(&self.variants);
        MemoCounts {
            products_resolved,
            products_negative,
            variants_resolved,
            variants_negative,
        }
    }
}

fn state_of<T: DisplayFields>(table: &DashMap<String, MemoEntry<T>>, id: &str) -> ResolutionState {
    match table.get(id) {
        None => ResolutionState::Unknown,
        Some(entry) if entry.info.is_negative() => ResolutionState::Negative,
        Some(_) => ResolutionState::Resolved,
    }
}

/// Write an entry, refusing to downgrade Resolved to Negative unless forced.
///
/// Returns whether the entry was written.
fn write_entry<T: DisplayFields>(
    table: &DashMap<String, MemoEntry<T>>,
    id: String,
    info: T,
    force: bool,
) -> bool {
    let entry = MemoEntry {
        info,
        fetched_at: Utc::now(),
    };

    match table.entry(id) {
        dashmap::mapref::entry::Entry::Occupied(mut existing) => {
            if !force && entry.info.is_negative() && !existing.get().info.is_negative() {
                return false;
            }
            existing.insert(entry);
            true
        }
        dashmap::mapref::entry::Entry::Vacant(vacant) => {
            vacant.insert(entry);
            true
        }
    }
}

fn count_states<T: DisplayFields>(table: &DashMap<String, MemoEntry<T>>) -> (usize, usize) {
    table.iter().fold((0, 0), |(resolved, negative), entry| {
        if entry.info.is_negative() {
            (resolved, negative + 1)
        } else {
            (resolved + 1, negative)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> ProductInfo {
        ProductInfo {
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_states() {
        let memo = MemoTable::new();
        assert_eq!(memo.state(RefKind::Product, "p1"), ResolutionState::Unknown);

        memo.write_product("p1".to_string(), ProductInfo::default(), false);
        assert_eq!(memo.state(RefKind::Product, "p1"), ResolutionState::Negative);

        memo.write_product("p1".to_string(), named("Mug"), false);
        assert_eq!(memo.state(RefKind::Product, "p1"), ResolutionState::Resolved);

        // Same string in the other space is untouched
        assert_eq!(memo.state(RefKind::Variant, "p1"), ResolutionState::Unknown);
    }

    #[test]
    fn test_variant_with_only_sku_is_resolved() {
        let memo = MemoTable::new();
        memo.write_variant(
            "v1".to_string(),
            VariantInfo {
                sku: Some("SKU-1".to_string()),
                name: None,
            },
            false,
        );
        assert_eq!(memo.state(RefKind::Variant, "v1"), ResolutionState::Resolved);
        assert_eq!(memo.variant("v1").sku.as_deref(), Some("SKU-1"));
    }

    #[test]
    fn test_non_forced_write_never_downgrades() {
        let memo = MemoTable::new();
        memo.write_product("p1".to_string(), named("Mug"), false);

        assert!(!memo.write_product("p1".to_string(), ProductInfo::default(), false));
        assert_eq!(memo.product("p1").name.as_deref(), Some("Mug"));

        assert!(memo.write_product("p1".to_string(), ProductInfo::default(), true));
        assert_eq!(memo.state(RefKind::Product, "p1"), ResolutionState::Negative);
    }

    #[test]
    fn test_needs_fetch() {
        let memo = MemoTable::new();
        memo.write_product("resolved".to_string(), named("Mug"), false);
        memo.write_product("negative".to_string(), ProductInfo::default(), false);

        assert!(memo.needs_fetch(RefKind::Product, "unknown", false));
        assert!(memo.needs_fetch(RefKind::Product, "negative", false));
        assert!(!memo.needs_fetch(RefKind::Product, "resolved", false));
        assert!(memo.needs_fetch(RefKind::Product, "resolved", true));
    }

    #[test]
    fn test_counts_and_timestamps() {
        let memo = MemoTable::new();
        memo.write_product("p1".to_string(), named("Mug"), false);
        memo.write_product("p2".to_string(), ProductInfo::default(), false);
        memo.write_variant("v1".to_string(), VariantInfo::default(), false);

        let counts = memo.counts();
        assert_eq!(counts.products_resolved, 1);
        assert_eq!(counts.products_negative, 1);
        assert_eq!(counts.variants_resolved, 0);
        assert_eq!(counts.variants_negative, 1);

        assert!(memo.fetched_at(RefKind::Product, "p1").is_some());
        assert!(memo.fetched_at(RefKind::Variant, "nope").is_none());
    }

    #[test]
    fn test_unknown_reads_as_absent() {
        let memo = MemoTable::new();
        assert_eq!(memo.product("p9"), ProductRef::absent("p9"));
        assert_eq!(memo.variant("v9"), VariantRef::absent("v9"));
    }
}
