//! Synchronization layer
//!
//! This module turns a change tree into a tree of per-object decisions,
//! applies database-side changes back onto the model, keeps sync profiles
//! and drives a whole synchronization session.

pub mod applier;
pub mod diff_tree;
pub mod old_names;
pub mod profile;
pub mod report;
pub mod session;

pub use applier::{ApplySummary, ChangesApplier};
pub use diff_tree::{ApplyDirection, DiffNode, DiffNodeController, DiffTree, NodeId};
pub use old_names::update_all_old_names;
pub use profile::{InMemoryProfileStore, JsonFileProfileStore, NameMap, SyncProfile, SyncProfileStore};
pub use report::{AttributeChange, ObjectReport, ReportAction, SyncReport};
pub use session::{SyncSession, SyncSettings};
