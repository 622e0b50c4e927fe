//! In-memory catalog model
//!
//! This module provides the typed object arenas, member descriptor tables,
//! identity keys and the catalog document loader.

pub mod datatype;
pub mod document;
pub mod keys;
pub mod members;
pub mod types;

pub use document::{load_catalog, save_catalog, CatalogDocument};
pub use keys::{catalog_map, filter_key, match_key, qualified_key};
pub use members::{members, Member, MemberAccess, Value};
pub use types::{
    Catalog, Column, ForeignKey, Index, IndexColumn, ObjectId, ObjectKind, ObjectRef, Partition, Routine, Schema,
    Table, Trigger, View,
};
