//! Helpers shared by the CLI commands.

use crate::core::RefsError;
use crate::models::IdentifierSets;
use anyhow::Result;
use serde_json::Value;
use std::path::Path;

/// Read and parse one JSON payload file.
pub(crate) async fn read_payload(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| RefsError::PayloadError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let value = serde_json::from_str(&content).map_err(|e| RefsError::PayloadError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(value)
}

/// Print identifier sets as pretty JSON on stdout.
pub(crate) fn print_sets(sets: &IdentifierSets) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(sets)?);
    Ok(())
}
