//! Identifier extraction specialized for promotion payloads.
//!
//! A promotion carries its references in three well-known sub-trees
//! (`conditions`, `actions`, `displays`), but older and newer payload shapes
//! also put them elsewhere. The helpers here scan the known sub-trees and then
//! the whole object as a fallback, delegating all traversal to
//! [`extract_refs`].

use super::extract_refs;
use crate::models::IdentifierSets;
use serde_json::Value;

/// Sub-trees of a promotion that usually hold catalog references.
const PROMOTION_SECTIONS: &[&str] = &["conditions", "actions", "displays"];

/// Collect identifiers referenced by a single promotion.
#[must_use]
pub fn extract_promotion_refs(promotion: &Value) -> IdentifierSets {
    let mut refs = IdentifierSets::new();

    if let Some(map) = promotion.as_object() {
        for section in PROMOTION_SECTIONS {
            if let Some(subtree) = map.get(*section) {
                refs.merge(extract_refs(subtree));
            }
        }
    }

    refs.merge(extract_refs(promotion));
    refs
}

/// Collect identifiers referenced by any number of promotions.
#[must_use]
pub fn extract_promotions_refs(promotions: &[Value]) -> IdentifierSets {
    promotions.iter().fold(IdentifierSets::new(), |mut acc, promotion| {
        acc.merge(extract_promotion_refs(promotion));
        acc
    })
}
