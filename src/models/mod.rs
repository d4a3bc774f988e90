//! Shared data models for catalog reference resolution
//!
//! This module provides the value types that flow between the identifier
//! extractor, the reference cache and the lookup transport. The wire types
//! ([`LookupRequest`], [`LookupResponse`]) mirror the JSON exchanged with the
//! catalog lookup endpoint; the result types ([`ProductRef`], [`VariantRef`],
//! [`ResolvedRefs`]) are what rendering code consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The two disjoint identifier spaces of the catalog.
///
/// The same string may name a product and, independently, a variant. Each
/// kind is resolved against its own backing collection and memoized in its
/// own table, so the kind always travels with the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    /// A catalog product.
    Product,
    /// A purchasable variant of a product.
    Variant,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product => write!(f, "product"),
            Self::Variant => write!(f, "variant"),
        }
    }
}

/// Deduplicated product and variant identifiers found in a payload.
///
/// Backed by [`BTreeSet`] so that iteration (and JSON output) is stable
/// regardless of where in the payload an identifier was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierSets {
    /// Product identifiers.
    pub product_ids: BTreeSet<String>,
    /// Variant identifiers.
    pub variant_ids: BTreeSet<String>,
}

impl IdentifierSets {
    /// Create an empty pair of sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identifier into the set for `kind`.
    ///
    /// Empty strings are ignored. Returns `true` if the identifier was new.
    pub fn insert(&mut self, kind: RefKind, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        match kind {
            RefKind::Product => self.product_ids.insert(id.to_string()),
            RefKind::Variant => self.variant_ids.insert(id.to_string()),
        }
    }

    /// Union another pair of sets into this one.
    pub fn merge(&mut self, other: Self) {
        self.product_ids.extend(other.product_ids);
        self.variant_ids.extend(other.variant_ids);
    }

    /// Whether both sets are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.product_ids.is_empty() && self.variant_ids.is_empty()
    }

    /// Total number of identifiers across both kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.product_ids.len() + self.variant_ids.len()
    }
}

/// Display metadata for a product.
///
/// `name` is `None` when the product has never been resolved or the catalog
/// had nothing to say about it. It always serializes (as `null` when absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Product identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl ProductRef {
    /// A product entry with no display data.
    #[must_use]
    pub fn absent(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Display metadata for a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRef {
    /// Variant identifier.
    pub id: String,
    /// Stock keeping unit.
    #[serde(default)]
    pub sku: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl VariantRef {
    /// A variant entry with no display data.
    #[must_use]
    pub fn absent(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sku: None,
            name: None,
        }
    }
}

/// Body of a batched catalog lookup.
///
/// Each list is omitted from the JSON body when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    /// Product identifiers to resolve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_ids: Vec<String>,
    /// Variant identifiers to resolve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variant_ids: Vec<String>,
}

/// Response of a batched catalog lookup.
///
/// The server may return fewer entries than requested; identifiers it does
/// not mention are treated as "nothing known" by the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    /// Resolved products.
    #[serde(default)]
    pub products: Vec<ProductRef>,
    /// Resolved variants.
    #[serde(default)]
    pub variants: Vec<VariantRef>,
}

/// Options for a single `resolve` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Re-fetch every requested identifier regardless of memo state.
    pub force: bool,
}

impl ResolveOptions {
    /// Options forcing a re-fetch.
    #[must_use]
    pub const fn forced() -> Self {
        Self { force: true }
    }
}

/// Answer to a `resolve` call: one entry per requested identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRefs {
    /// One entry per requested product, in first-request order.
    pub products: Vec<ProductRef>,
    /// One entry per requested variant, in first-request order.
    pub variants: Vec<VariantRef>,
}

impl ResolvedRefs {
    /// Look up the entry for a requested product.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<&ProductRef> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Look up the entry for a requested variant.
    #[must_use]
    pub fn variant(&self, id: &str) -> Option<&VariantRef> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Display name of a requested product, if resolved.
    #[must_use]
    pub fn product_name(&self, id: &str) -> Option<&str> {
        self.product(id).and_then(|p| p.name.as_deref())
    }
}
