//! Shared fixtures for the integration tests

#![allow(dead_code)]

use catalog_sync::catalog::{Column, Schema, Table};
use catalog_sync::diff::{Change, ChangeTree, NormalizedComparer, Omf};
use catalog_sync::{Catalog, ObjectId};

/// Catalog with one schema and one table holding `columns` (name, type)
pub fn single_table(schema: &str, table: &str, columns: &[(&str, &str)]) -> (Catalog, ObjectId) {
    let mut catalog = Catalog::new("def");
    let schema_id = catalog.add_schema(Schema::new(schema));
    let table_id = catalog
        .add_table(&schema_id, Table::new(table).engine("InnoDB"))
        .expect("schema exists");
    for (name, data_type) in columns {
        catalog
            .add_column(&table_id, Column::new(name, data_type))
            .expect("table exists");
    }
    (catalog, table_id)
}

/// Match policy with every normalization rule installed
pub fn normalized_omf() -> Omf {
    let mut omf = Omf::new();
    NormalizedComparer::default().init_omf(&mut omf);
    omf
}

/// Type names of every change in the tree, depth first from the root
pub fn change_types(tree: &ChangeTree) -> Vec<&'static str> {
    tree.iter().map(|id| tree.get(id).type_name()).collect()
}

pub fn count_changes(tree: &ChangeTree, type_name: &str) -> usize {
    change_types(tree).into_iter().filter(|t| *t == type_name).count()
}

/// Index of every `ListItemAdded` change
pub fn added_indexes(tree: &ChangeTree) -> Vec<usize> {
    tree.iter()
        .filter_map(|id| match tree.get(id) {
            Change::ListItemAdded { index, .. } => Some(*index),
            _ => None,
        })
        .collect()
}
