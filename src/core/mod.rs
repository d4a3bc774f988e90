//! Core types for storefront-refs
//!
//! Currently this is the error layer shared by every other module:
//! - [`RefsError`] - enumerated failure modes
//! - [`ErrorContext`] - user-facing wrapper with details and suggestions
//! - [`user_friendly_error`] - map any [`anyhow::Error`] to an [`ErrorContext`]

pub mod error;

pub use error::{ErrorContext, RefsError, user_friendly_error};
