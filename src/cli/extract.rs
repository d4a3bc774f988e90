//! The `extract` command: list identifiers found in JSON payloads.
//!
//! Every file is walked with the generic extractor and the results are
//! merged into one pair of sets.
//!
//! ```bash
//! sfrefs extract promo.json banners.json
//! ```
//!
//! Output:
//! ```json
//! { "productIds": ["p1", "p2"], "variantIds": ["v1"] }
//! ```

use super::common::{print_sets, read_payload};
use crate::extract::extract_refs;
use crate::models::IdentifierSets;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

/// Print the identifiers found anywhere in JSON payload files.
#[derive(Debug, Args)]
pub struct ExtractCommand {
    /// JSON payload files to scan.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

impl ExtractCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read or is not valid JSON.
    pub async fn execute(self) -> Result<()> {
        let mut sets = IdentifierSets::new();
        for path in &self.files {
            let payload = read_payload(path).await?;
            let found = extract_refs(&payload);
            debug!("{}: {} identifiers", path.display(), found.len());
            sets.merge(found);
        }
        print_sets(&sets)
    }
}
