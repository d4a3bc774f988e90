//! Catalog identifier extraction from arbitrary JSON payloads.
//!
//! Promotion and marketing payloads reference products and variants from all
//! over their structure: a condition may carry `targetProductIds`, an action
//! a `giftVariantId`, a display block a list of banners each with its own
//! `productId`. This module walks any [`serde_json::Value`] tree and collects
//! every identifier it can recognize, without knowing the payload's schema.
//!
//! # Extraction Rules
//!
//! For every key/value pair of every object, at any depth:
//! - An array of strings under a key ending in `ProductIds` / `VariantIds`
//!   contributes all of its elements
//! - A string under a key ending in `ProductId` / `VariantId` contributes
//!   that string
//! - Any other object or array is descended into
//! - Any other scalar contributes nothing
//!
//! Key suffixes match case-insensitively, so `productId`, `ProductID` and
//! `main_productid` are all recognized. The plural check runs first.
//!
//! # Usage
//!
//! ```rust
//! use storefront_refs::extract::extract_refs;
//! use serde_json::json;
//!
//! let payload = json!({
//!     "conditions": [{ "relatedProductIds": ["p1", "p2"] }],
//!     "actions": { "reward": { "giftVariantId": "v9" } },
//! });
//!
//! let refs = extract_refs(&payload);
//! assert!(refs.product_ids.contains("p1"));
//! assert!(refs.variant_ids.contains("v9"));
//! ```

pub mod promotion;

pub use promotion::{extract_promotion_refs, extract_promotions_refs};

use crate::models::{IdentifierSets, RefKind};
use serde_json::{Map, Value};

/// A key-suffix rule mapping object keys to an identifier space.
///
/// Suffixes are stored lowercase and compared against the lowercased key.
#[derive(Debug, Clone, Copy)]
struct KeyRule {
    singular: &'static str,
    plural: &'static str,
    kind: RefKind,
}

/// Recognized identifier keys, evaluated in order.
const KEY_RULES: &[KeyRule] = &[
    KeyRule {
        singular: "productid",
        plural: "productids",
        kind: RefKind::Product,
    },
    KeyRule {
        singular: "variantid",
        plural: "variantids",
        kind: RefKind::Variant,
    },
];

impl KeyRule {
    fn plural_kind(key: &str) -> Option<RefKind> {
        KEY_RULES.iter().find(|rule| key.ends_with(rule.plural)).map(|rule| rule.kind)
    }

    fn singular_kind(key: &str) -> Option<RefKind> {
        KEY_RULES.iter().find(|rule| key.ends_with(rule.singular)).map(|rule| rule.kind)
    }
}

/// Extract every product and variant identifier from a JSON value.
///
/// Never fails: shapes that match no rule simply contribute nothing. The
/// result is deduplicated, and extracting the same payload twice yields the
/// same sets.
///
/// # Arguments
///
/// * `value` - Any JSON value (object, array or scalar)
///
/// # Returns
///
/// The product and variant identifier sets found anywhere in `value`
#[must_use]
pub fn extract_refs(value: &Value) -> IdentifierSets {
    let mut refs = IdentifierSets::new();
    collect(value, &mut refs);
    refs
}

fn collect(value: &Value, refs: &mut IdentifierSets) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect(item, refs);
            }
        }
        Value::Object(map) => collect_object(map, refs),
        _ => {}
    }
}

fn collect_object(map: &Map<String, Value>, refs: &mut IdentifierSets) {
    for (key, value) in map {
        let key = key.to_ascii_lowercase();

        match value {
            Value::Array(items) => match (KeyRule::plural_kind(&key), all_strings(items)) {
                (Some(kind), Some(ids)) => {
                    for id in ids {
                        refs.insert(kind, id);
                    }
                }
                _ => collect(value, refs),
            },
            Value::String(id) => {
                if let Some(kind) = KeyRule::singular_kind(&key) {
                    refs.insert(kind, id);
                }
            }
            Value::Object(_) => collect(value, refs),
            _ => {}
        }
    }
}

/// Borrow every element as `&str` if the array holds only strings.
fn all_strings(items: &[Value]) -> Option<Vec<&str>> {
    items.iter().map(Value::as_str).collect()
}
