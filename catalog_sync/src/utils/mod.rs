//! Utilities for catalog_sync
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use naming::{fold_case, old_name_or_name, qualified_name, quote_identifier, same_name};
