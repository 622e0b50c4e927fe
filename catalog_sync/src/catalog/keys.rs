//! Identity keys used to match objects across two independently loaded catalogs

use std::collections::HashMap;

use crate::catalog::types::{Catalog, ObjectId, ObjectKind};
use crate::utils::naming::{fold_case, old_name_or_name};

/// Key matching an object against its siblings in the other catalog
///
/// Schemas match by name, index columns by the column they reference,
/// partition definitions by name, everything else by old name (falling back
/// to the current name). Column keys are always caseless.
pub fn match_key(catalog: &Catalog, id: &ObjectId, case_sensitive: bool) -> String {
    match catalog.kind_of(id) {
        Some(ObjectKind::Catalog) => catalog.name.clone(),
        Some(ObjectKind::Schema) => fold_case(&catalog.schemas[id].name, case_sensitive),
        Some(ObjectKind::IndexColumn) => match &catalog.index_columns[id].column {
            Some(column) if catalog.columns.contains_key(column) => {
                format!("column:{}", match_key(catalog, column, case_sensitive))
            }
            _ => String::new(),
        },
        Some(ObjectKind::Partition) => fold_case(&catalog.partitions[id].name, case_sensitive),
        // Column names are caseless on every server
        Some(ObjectKind::Column) => {
            let column = &catalog.columns[id];
            fold_case(old_name_or_name(&column.name, &column.old_name), false)
        }
        Some(_) => {
            let name = catalog.name_of(id);
            let old_name = catalog.old_name_of(id);
            fold_case(old_name_or_name(&name, &old_name), case_sensitive)
        }
        None => String::new(),
    }
}

/// Fully qualified key: `` `schema`.`table`.`column` `` built from old names
pub fn qualified_key(catalog: &Catalog, id: &ObjectId, case_sensitive: bool) -> String {
    let mut segments = Vec::new();
    let mut current = Some(id.clone());
    while let Some(cur) = current {
        match catalog.kind_of(&cur) {
            None | Some(ObjectKind::Catalog) => break,
            Some(ObjectKind::Schema) => segments.push(catalog.schemas[&cur].name.clone()),
            Some(ObjectKind::IndexColumn) => segments.push(catalog.name_of(&cur)),
            Some(_) => {
                let name = catalog.name_of(&cur);
                let old_name = catalog.old_name_of(&cur);
                segments.push(old_name_or_name(&name, &old_name).to_string());
            }
        }
        current = catalog.owner_of(&cur);
    }
    segments.reverse();
    let key = segments
        .iter()
        .map(|s| format!("`{}`", s))
        .collect::<Vec<_>>()
        .join(".");
    fold_case(&key, case_sensitive)
}

/// Key used by filter lists and catalog maps, prefixed with the object kind
pub fn filter_key(catalog: &Catalog, id: &ObjectId, case_sensitive: bool) -> String {
    match catalog.kind_of(id) {
        Some(kind) => format!("{}::{}", kind.as_str(), qualified_key(catalog, id, case_sensitive)),
        None => String::new(),
    }
}

/// Map of filter keys to ids for every schema, table, trigger, view and routine
pub fn catalog_map(catalog: &Catalog, case_sensitive: bool) -> HashMap<String, ObjectId> {
    let mut map = HashMap::new();
    for schema_id in &catalog.schemata {
        let schema = match catalog.schemas.get(schema_id) {
            Some(s) => s,
            None => continue,
        };
        map.insert(filter_key(catalog, schema_id, case_sensitive), schema_id.clone());
        for table_id in &schema.tables {
            map.insert(filter_key(catalog, table_id, case_sensitive), table_id.clone());
            if let Some(table) = catalog.tables.get(table_id) {
                for trigger_id in &table.triggers {
                    map.insert(filter_key(catalog, trigger_id, case_sensitive), trigger_id.clone());
                }
            }
        }
        for view_id in &schema.views {
            map.insert(filter_key(catalog, view_id, case_sensitive), view_id.clone());
        }
        for routine_id in &schema.routines {
            map.insert(filter_key(catalog, routine_id, case_sensitive), routine_id.clone());
        }
    }
    map
}
