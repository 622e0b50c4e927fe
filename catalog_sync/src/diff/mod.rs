//! Catalog comparison
//!
//! This module provides the match policy, the normalization rules, the diff
//! engine and the change-list model it produces.

pub mod change;
pub mod engine;
pub mod normalize;
pub mod omf;

pub use change::{Change, ChangeId, ChangeTree};
pub use engine::{diff_make, diff_objects};
pub use normalize::NormalizedComparer;
pub use omf::{CompareContext, Omf};
