//! Partitioning clauses
//!
//! Same scheme and expression means the partitioning is changed in place
//! (count changes, added, dropped or reorganized definitions). Anything else
//! rebuilds it with a full `PARTITION BY`.

use tracing::debug;

use crate::catalog::types::{Catalog, Partition, Table};
use crate::diff::normalize::normalize_sql;
use crate::utils::naming::{quote_identifier, quote_string};

/// How the partitioning of a table must change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionTransform {
    Unchanged,
    /// Target has no partitioning left
    Remove,
    /// Scheme, expression or subpartitioning differ
    Rebuild,
    /// HASH/KEY partitions to merge away
    Coalesce(i64),
    /// HASH/KEY partitions to add
    AddCount(i64),
    /// RANGE/LIST definitions added, dropped or changed
    Definitions,
}

fn is_hash_or_key(partition_type: &str) -> bool {
    let upper = partition_type.to_uppercase();
    upper.contains("HASH") || upper.contains("KEY")
}

fn same_text(left: &str, right: &str) -> bool {
    normalize_sql(left) == normalize_sql(right)
}

fn definitions<'c>(catalog: &'c Catalog, table: &Table) -> Vec<&'c Partition> {
    table
        .partitions
        .iter()
        .filter_map(|id| catalog.partitions.get(id))
        .collect()
}

/// Explicit HASH/KEY definitions differ in name or options
fn named_definitions_differ(source: &Catalog, old: &Table, target: &Catalog, new: &Table) -> bool {
    let old_defs = definitions(source, old);
    let new_defs = definitions(target, new);
    old_defs.len() != new_defs.len()
        || old_defs.iter().zip(&new_defs).any(|(a, b)| {
            !a.name.eq_ignore_ascii_case(&b.name)
                || a.engine != b.engine
                || a.comment != b.comment
                || a.max_rows != b.max_rows
                || a.min_rows != b.min_rows
        })
}

/// Classify the change from `old` (in `source`) to `new` (in `target`)
pub fn classify(source: &Catalog, old: &Table, target: &Catalog, new: &Table) -> PartitionTransform {
    if new.partition_type.is_empty() {
        return if old.partition_type.is_empty() {
            PartitionTransform::Unchanged
        } else {
            PartitionTransform::Remove
        };
    }

    let same_scheme = old.partition_type.eq_ignore_ascii_case(&new.partition_type)
        && same_text(&old.partition_expression, &new.partition_expression)
        && old.subpartition_type.eq_ignore_ascii_case(&new.subpartition_type)
        && same_text(&old.subpartition_expression, &new.subpartition_expression)
        && old.subpartition_count == new.subpartition_count;
    if !same_scheme {
        return PartitionTransform::Rebuild;
    }

    if is_hash_or_key(&new.partition_type) {
        return match new.partition_count.cmp(&old.partition_count) {
            std::cmp::Ordering::Less => PartitionTransform::Coalesce(old.partition_count - new.partition_count),
            std::cmp::Ordering::Greater => PartitionTransform::AddCount(new.partition_count - old.partition_count),
            std::cmp::Ordering::Equal if named_definitions_differ(source, old, target, new) => {
                debug!(table = %new.name, "Partition definitions changed at the same count, rebuilding");
                PartitionTransform::Rebuild
            }
            std::cmp::Ordering::Equal => PartitionTransform::Unchanged,
        };
    }

    let old_defs = definitions(source, old);
    let new_defs = definitions(target, new);
    let changed = old_defs.len() != new_defs.len()
        || old_defs.iter().zip(&new_defs).any(|(a, b)| {
            !a.name.eq_ignore_ascii_case(&b.name) || !same_text(&a.value, &b.value)
        });
    if changed {
        PartitionTransform::Definitions
    } else {
        PartitionTransform::Unchanged
    }
}

/// `PARTITION p0 VALUES LESS THAN (10)` with its options
pub fn partition_definition(partition: &Partition) -> String {
    let mut out = format!("PARTITION {}", quote_identifier(&partition.name));
    if !partition.value.is_empty() {
        out.push_str(&format!(" VALUES {}", partition.value));
    }
    if !partition.engine.is_empty() {
        out.push_str(&format!(" ENGINE = {}", partition.engine));
    }
    if !partition.comment.is_empty() {
        out.push_str(&format!(" COMMENT = {}", quote_string(&partition.comment)));
    }
    if !partition.max_rows.is_empty() {
        out.push_str(&format!(" MAX_ROWS = {}", partition.max_rows));
    }
    if !partition.min_rows.is_empty() {
        out.push_str(&format!(" MIN_ROWS = {}", partition.min_rows));
    }
    out
}

/// Full `PARTITION BY` clause of a table
pub fn partition_by_clause(catalog: &Catalog, table: &Table) -> String {
    let mut out = format!("PARTITION BY {}({})", table.partition_type, table.partition_expression);
    let defs = definitions(catalog, table);
    if table.partition_count > 0 && (defs.is_empty() || is_hash_or_key(&table.partition_type)) {
        out.push_str(&format!(" PARTITIONS {}", table.partition_count));
    }
    if !table.subpartition_type.is_empty() {
        out.push_str(&format!(
            " SUBPARTITION BY {}({})",
            table.subpartition_type, table.subpartition_expression
        ));
        if table.subpartition_count > 0 {
            out.push_str(&format!(" SUBPARTITIONS {}", table.subpartition_count));
        }
    }
    if !defs.is_empty() {
        let parts: Vec<String> = defs.iter().map(|p| partition_definition(p)).collect();
        out.push_str(&format!(" ({})", parts.join(", ")));
    }
    out
}

/// ALTER TABLE clauses turning the old partitioning into the new one
///
/// Each clause needs its own statement; MySQL accepts one partition
/// operation per ALTER TABLE.
pub fn partition_clauses(source: &Catalog, old: &Table, target: &Catalog, new: &Table) -> Vec<String> {
    match classify(source, old, target, new) {
        PartitionTransform::Unchanged => Vec::new(),
        PartitionTransform::Remove => vec!["REMOVE PARTITIONING".to_string()],
        PartitionTransform::Rebuild => vec![partition_by_clause(target, new)],
        PartitionTransform::Coalesce(n) => vec![format!("COALESCE PARTITION {}", n)],
        PartitionTransform::AddCount(n) => vec![format!("ADD PARTITION PARTITIONS {}", n)],
        PartitionTransform::Definitions => {
            let old_defs = definitions(source, old);
            let new_defs = definitions(target, new);
            let find = |defs: &[&Partition], name: &str| defs.iter().position(|p| p.name.eq_ignore_ascii_case(name));

            let dropped: Vec<String> = old_defs
                .iter()
                .filter(|p| find(&new_defs, &p.name).is_none())
                .map(|p| quote_identifier(&p.name))
                .collect();
            let reorganized: Vec<(&Partition, &Partition)> = new_defs
                .iter()
                .filter_map(|p| {
                    let old_def = old_defs[find(&old_defs, &p.name)?];
                    (!same_text(&old_def.value, &p.value)).then_some((old_def, *p))
                })
                .collect();
            let added: Vec<String> = new_defs
                .iter()
                .filter(|p| find(&old_defs, &p.name).is_none())
                .map(|p| partition_definition(p))
                .collect();

            let mut clauses = Vec::new();
            if !dropped.is_empty() {
                clauses.push(format!("DROP PARTITION {}", dropped.join(", ")));
            }
            if !reorganized.is_empty() {
                let names: Vec<String> = reorganized.iter().map(|(o, _)| quote_identifier(&o.name)).collect();
                let defs: Vec<String> = reorganized.iter().map(|(_, n)| partition_definition(n)).collect();
                clauses.push(format!(
                    "REORGANIZE PARTITION {} INTO ({})",
                    names.join(", "),
                    defs.join(", ")
                ));
            }
            if !added.is_empty() {
                clauses.push(format!("ADD PARTITION ({})", added.join(", ")));
            }
            if clauses.is_empty() {
                // Only the order differs; rewrite the whole clause
                clauses.push(partition_by_clause(target, new));
            }
            clauses
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Schema};
    use pretty_assertions::assert_eq;

    fn range_catalog(bounds: &[(&str, &str)]) -> (Catalog, crate::catalog::types::ObjectId) {
        let mut catalog = Catalog::new("def");
        let schema = catalog.add_schema(Schema::new("s"));
        let table = catalog
            .add_table(&schema, Table::new("t").partitioned("RANGE", "id", bounds.len() as i64))
            .unwrap();
        catalog.add_column(&table, Column::new("id", "INT")).unwrap();
        for (name, value) in bounds {
            catalog.add_partition(&table, Partition::new(name, value)).unwrap();
        }
        (catalog, table)
    }

    #[test]
    fn test_hash_count_changes() {
        let old = Table::new("t").partitioned("HASH", "id", 4);
        let new = Table::new("t").partitioned("HASH", "id", 2);
        let catalog = Catalog::new("def");
        assert_eq!(classify(&catalog, &old, &catalog, &new), PartitionTransform::Coalesce(2));
        assert_eq!(partition_clauses(&catalog, &new, &catalog, &old), vec!["ADD PARTITION PARTITIONS 2"]);
    }

    #[test]
    fn test_hash_definitions_at_same_count_rebuild() {
        let mut source = Catalog::new("def");
        let schema = source.add_schema(Schema::new("s"));
        let old = source
            .add_table(&schema, Table::new("t").partitioned("HASH", "id", 2))
            .unwrap();
        source.add_partition(&old, Partition::new("p0", "")).unwrap();
        source.add_partition(&old, Partition::new("p1", "")).unwrap();

        let mut target = source.clone();
        let renamed = target.tables[&old].partitions[1].clone();
        target.partitions[&renamed].name = "p_last".to_string();

        let (old_table, new_table) = (&source.tables[&old], &target.tables[&old]);
        assert_eq!(classify(&source, old_table, &target, new_table), PartitionTransform::Rebuild);
        assert_eq!(
            partition_clauses(&source, old_table, &target, new_table),
            vec!["PARTITION BY HASH(id) PARTITIONS 2 (PARTITION `p0`, PARTITION `p_last`)"]
        );
        assert_eq!(classify(&source, old_table, &source, old_table), PartitionTransform::Unchanged);
    }

    #[test]
    fn test_scheme_change_rebuilds() {
        let old = Table::new("t").partitioned("HASH", "id", 4);
        let new = Table::new("t").partitioned("KEY", "id", 4);
        let catalog = Catalog::new("def");
        assert_eq!(
            partition_clauses(&catalog, &old, &catalog, &new),
            vec!["PARTITION BY KEY(id) PARTITIONS 4"]
        );
        assert_eq!(
            partition_clauses(&catalog, &old, &catalog, &Table::new("t")),
            vec!["REMOVE PARTITIONING"]
        );
    }

    #[test]
    fn test_range_definitions() {
        let (source, old) = range_catalog(&[("p0", "LESS THAN (10)"), ("p1", "LESS THAN (20)")]);
        let (target, new) = range_catalog(&[("p0", "LESS THAN (15)"), ("p2", "LESS THAN (30)")]);
        let clauses = partition_clauses(&source, &source.tables[&old], &target, &target.tables[&new]);
        assert_eq!(
            clauses,
            vec![
                "DROP PARTITION `p1`",
                "REORGANIZE PARTITION `p0` INTO (PARTITION `p0` VALUES LESS THAN (15))",
                "ADD PARTITION (PARTITION `p2` VALUES LESS THAN (30))",
            ]
        );
    }

    #[test]
    fn test_partition_by_clause_lists_definitions() {
        let (catalog, table) = range_catalog(&[("p0", "LESS THAN (10)"), ("p1", "LESS THAN MAXVALUE")]);
        assert_eq!(
            partition_by_clause(&catalog, &catalog.tables[&table]),
            "PARTITION BY RANGE(id) (PARTITION `p0` VALUES LESS THAN (10), PARTITION `p1` VALUES LESS THAN MAXVALUE)"
        );
    }
}
