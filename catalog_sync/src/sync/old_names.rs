//! Old-name bookkeeping

use crate::catalog::types::{Catalog, ObjectId};

/// Every id of the catalog that carries an old name
fn named_objects(catalog: &Catalog) -> Vec<ObjectId> {
    catalog
        .schemas
        .keys()
        .chain(catalog.tables.keys())
        .chain(catalog.columns.keys())
        .chain(catalog.indices.keys())
        .chain(catalog.foreign_keys.keys())
        .chain(catalog.triggers.keys())
        .chain(catalog.views.keys())
        .chain(catalog.routines.keys())
        .cloned()
        .collect()
}

/// Copy each object's current name into its old name
///
/// With `only_empty` set, old names that are already known are kept, so
/// renames recorded earlier survive.
pub fn update_all_old_names(catalog: &mut Catalog, only_empty: bool) -> usize {
    let mut updated = 0;
    for id in named_objects(catalog) {
        if only_empty && !catalog.old_name_of(&id).is_empty() {
            continue;
        }
        let name = catalog.name_of(&id);
        catalog.set_old_name(&id, &name);
        updated += 1;
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Schema, Table};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fills_only_empty_old_names() {
        let mut catalog = Catalog::new("def");
        let schema = catalog.add_schema(Schema::new("s"));
        let renamed = catalog.add_table(&schema, Table::new("people")).unwrap();
        catalog.set_old_name(&renamed, "persons");
        let column = catalog.add_column(&renamed, Column::new("id", "INT")).unwrap();

        let updated = update_all_old_names(&mut catalog, true);
        assert_eq!(updated, 2);
        assert_eq!(catalog.tables[&renamed].old_name, "persons");
        assert_eq!(catalog.columns[&column].old_name, "id");
        assert_eq!(catalog.schemas[&schema].old_name, "s");

        update_all_old_names(&mut catalog, false);
        assert_eq!(catalog.tables[&renamed].old_name, "people");
    }
}
