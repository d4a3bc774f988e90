//! The `promotion` command: identifiers referenced by promotion payloads.
//!
//! A file may contain a single promotion object or an array of promotions.

use super::common::{print_sets, read_payload};
use crate::extract::{extract_promotion_refs, extract_promotions_refs};
use crate::models::IdentifierSets;
use anyhow::Result;
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

/// Print the identifiers referenced by promotion payload files.
#[derive(Debug, Args)]
pub struct PromotionCommand {
    /// Promotion JSON files (one promotion object or an array of them each).
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

impl PromotionCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read or is not valid JSON.
    pub async fn execute(self) -> Result<()> {
        let mut sets = IdentifierSets::new();
        for path in &self.files {
            let payload = read_payload(path).await?;
            let found = match &payload {
                Value::Array(promotions) => extract_promotions_refs(promotions),
                promotion => extract_promotion_refs(promotion),
            };
            sets.merge(found);
        }
        print_sets(&sets)
    }
}
