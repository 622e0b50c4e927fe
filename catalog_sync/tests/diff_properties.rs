//! Properties of the diff engine and the SQL generated from its change trees

mod common;

use pretty_assertions::assert_eq;
use rstest::rstest;

use catalog_sync::catalog::{Column, ForeignKey, Index, Schema, Table};
use catalog_sync::sql::partition::{classify, PartitionTransform};
use catalog_sync::{diff_make, Catalog, DiffSqlGenerator, GeneratorOptions, Omf};

use common::{added_indexes, count_changes, normalized_omf, single_table};

fn statements(source: &Catalog, target: &Catalog) -> Vec<String> {
    match diff_make(source, target, &normalized_omf()) {
        Some(changes) => {
            DiffSqlGenerator::new(&GeneratorOptions::all_objects())
                .generate(source, target, &changes)
                .statements
        }
        None => Vec::new(),
    }
}

#[test]
fn test_identical_catalogs_have_no_changes() {
    let (left, _) = single_table("shop", "orders", &[("id", "INT"), ("total", "DECIMAL(10,2)")]);
    let (right, _) = single_table("shop", "orders", &[("id", "INT"), ("total", "DECIMAL(10,2)")]);
    assert!(diff_make(&left, &right, &Omf::new()).is_none());
}

#[test]
fn test_binary_flag_matches_bin_collation() {
    let mut db = Catalog::new("def");
    let s = db.add_schema(Schema::new("s"));
    let t = db.add_table(&s, Table::new("t")).unwrap();
    db.add_column(&t, Column::new("code", "VARCHAR(10)").charset("utf8", "utf8_bin"))
        .unwrap();

    let mut model = Catalog::new("def");
    let s = model.add_schema(Schema::new("s"));
    let t = model.add_table(&s, Table::new("t")).unwrap();
    model
        .add_column(&t, Column::new("code", "VARCHAR(10) BINARY").charset("utf8", ""))
        .unwrap();

    assert!(diff_make(&db, &model, &normalized_omf()).is_none());
}

#[test]
fn test_enum_spacing_is_cosmetic() {
    let (db, _) = single_table("s", "t", &[("state", "ENUM('new','paid')")]);
    let (model, _) = single_table("s", "t", &[("state", "ENUM('new', 'paid')")]);
    assert!(diff_make(&db, &model, &normalized_omf()).is_none());

    let (changed, _) = single_table("s", "t", &[("state", "ENUM('new', 'shipped')")]);
    assert!(diff_make(&db, &changed, &normalized_omf()).is_some());
}

#[test]
fn test_index_reorder_generates_nothing() {
    let build = |order: &[&str]| {
        let (mut catalog, t) = single_table("s", "t", &[("a", "INT"), ("b", "INT")]);
        for name in order {
            let column = if *name == "ix_a" { "a" } else { "b" };
            catalog.add_index(&t, Index::new(name, "INDEX"), &[column]).unwrap();
        }
        catalog
    };
    let db = build(&["ix_a", "ix_b"]);
    let model = build(&["ix_b", "ix_a"]);

    let changes = diff_make(&db, &model, &normalized_omf()).expect("order differs");
    assert_eq!(count_changes(&changes, "ListItemOrderChanged"), 1);
    assert!(statements(&db, &model).is_empty());
}

#[rstest]
#[case(0, "ALTER TABLE `s`.`t` ADD COLUMN `x` INT FIRST")]
#[case(1, "ALTER TABLE `s`.`t` ADD COLUMN `x` INT AFTER `c0`")]
#[case(2, "ALTER TABLE `s`.`t` ADD COLUMN `x` INT AFTER `c1`")]
#[case(3, "ALTER TABLE `s`.`t` ADD COLUMN `x` INT AFTER `c2`")]
#[case(4, "ALTER TABLE `s`.`t` ADD COLUMN `x` INT")]
fn test_column_insert_at_every_position(#[case] position: usize, #[case] expected: &str) {
    let columns = [("c0", "INT"), ("c1", "INT"), ("c2", "INT"), ("c3", "INT")];
    let (db, _) = single_table("s", "t", &columns);
    let (mut model, t) = single_table("s", "t", &columns);
    model.insert_column(&t, position, Column::new("x", "INT")).unwrap();

    let changes = diff_make(&db, &model, &normalized_omf()).expect("column added");
    assert_eq!(added_indexes(&changes), vec![position]);
    assert_eq!(count_changes(&changes, "ListItemOrderChanged"), 0);
    assert_eq!(statements(&db, &model), vec![expected.to_string()]);
}

#[test]
fn test_swapped_columns_are_moved_not_recreated() {
    let (db, _) = single_table("s", "t", &[("a", "INT"), ("b", "INT"), ("c", "INT")]);
    let (model, _) = single_table("s", "t", &[("a", "INT"), ("c", "INT"), ("b", "INT")]);

    let changes = diff_make(&db, &model, &normalized_omf()).expect("order differs");
    assert_eq!(count_changes(&changes, "ListItemOrderChanged"), 1);
    assert_eq!(count_changes(&changes, "ListItemAdded"), 0);
    assert_eq!(count_changes(&changes, "ListItemRemoved"), 0);
    assert_eq!(
        statements(&db, &model),
        vec!["ALTER TABLE `s`.`t` CHANGE COLUMN `b` `b` INT AFTER `c`".to_string()]
    );
}

#[test]
fn test_rename_is_a_single_statement() {
    let (db, _) = single_table("s", "clients", &[("id", "INT")]);
    let (mut model, t) = single_table("s", "customers", &[("id", "INT")]);
    model.set_old_name(&t, "clients");

    assert_eq!(
        statements(&db, &model),
        vec!["RENAME TABLE `s`.`clients` TO `s`.`customers`".to_string()]
    );
}

#[test]
fn test_foreign_key_reorder_is_a_no_op() {
    let build = |order: &[&str]| {
        let mut catalog = Catalog::new("def");
        let s = catalog.add_schema(Schema::new("s"));
        let parent = catalog.add_table(&s, Table::new("parent")).unwrap();
        catalog.add_column(&parent, Column::new("id", "INT")).unwrap();
        let child = catalog.add_table(&s, Table::new("child")).unwrap();
        catalog.add_column(&child, Column::new("a", "INT")).unwrap();
        catalog.add_column(&child, Column::new("b", "INT")).unwrap();
        for name in order {
            let column = if *name == "fk_a" { "a" } else { "b" };
            catalog
                .add_foreign_key(&child, ForeignKey::new(name), &[column], &parent, &["id"])
                .unwrap();
        }
        catalog
    };
    let db = build(&["fk_a", "fk_b"]);
    let model = build(&["fk_b", "fk_a"]);

    assert!(diff_make(&db, &model, &normalized_omf()).is_some());
    assert!(statements(&db, &model).is_empty());
}

#[test]
fn test_partition_changes_are_classified() {
    let catalog = Catalog::new("def");
    let hash4 = Table::new("t").partitioned("HASH", "id", 4);
    let hash6 = Table::new("t").partitioned("HASH", "id", 6);
    let range = Table::new("t").partitioned("RANGE", "id", 4);

    assert_eq!(classify(&catalog, &hash4, &catalog, &hash6), PartitionTransform::AddCount(2));
    assert_eq!(classify(&catalog, &hash6, &catalog, &hash4), PartitionTransform::Coalesce(2));
    assert_eq!(classify(&catalog, &hash4, &catalog, &range), PartitionTransform::Rebuild);
    assert_eq!(classify(&catalog, &hash4, &catalog, &Table::new("t")), PartitionTransform::Remove);
    assert_eq!(classify(&catalog, &hash4, &catalog, &hash4), PartitionTransform::Unchanged);
}

#[test]
fn test_partition_count_change_through_the_generator() {
    let build = |count: i64| {
        let mut catalog = Catalog::new("def");
        let s = catalog.add_schema(Schema::new("s"));
        let t = catalog
            .add_table(&s, Table::new("t").partitioned("HASH", "id", count))
            .unwrap();
        catalog.add_column(&t, Column::new("id", "INT")).unwrap();
        catalog
    };
    assert_eq!(
        statements(&build(4), &build(2)),
        vec!["ALTER TABLE `s`.`t` COALESCE PARTITION 2".to_string()]
    );
}

#[test]
fn test_trailing_text_column_scenario() {
    let (org, _) = single_table("test", "t1", &[("id", "INT"), ("id2", "INT")]);
    let (model, _) = single_table("test", "t1", &[("id", "INT"), ("id2", "INT"), ("t", "TEXT")]);

    let changes = diff_make(&org, &model, &normalized_omf()).expect("column added");
    assert_eq!(added_indexes(&changes), vec![2]);
    assert_eq!(
        statements(&org, &model),
        vec!["ALTER TABLE `test`.`t1` ADD COLUMN `t` TEXT".to_string()]
    );
}

#[test]
fn test_partition_changes_follow_foreign_keys_in_kept_order() {
    let build = |count: i64, with_fk: bool| {
        let mut catalog = Catalog::new("def");
        let s = catalog.add_schema(Schema::new("s"));
        let parent = catalog.add_table(&s, Table::new("parent").engine("InnoDB")).unwrap();
        catalog.add_column(&parent, Column::new("id", "INT")).unwrap();
        let child = catalog
            .add_table(&s, Table::new("child").engine("InnoDB").partitioned("HASH", "id", count))
            .unwrap();
        catalog.add_column(&child, Column::new("id", "INT")).unwrap();
        catalog.add_column(&child, Column::new("parent_id", "INT")).unwrap();
        if with_fk {
            catalog
                .add_foreign_key(&child, ForeignKey::new("fk_parent"), &["parent_id"], &parent, &["id"])
                .unwrap();
        }
        catalog
    };
    let (db, model) = (build(4, false), build(2, true));

    let changes = diff_make(&db, &model, &normalized_omf()).expect("child changed");
    let options = GeneratorOptions {
        keep_order: true,
        ..GeneratorOptions::all_objects()
    };
    let statements = DiffSqlGenerator::new(&options).generate(&db, &model, &changes).statements;
    let coalesce = statements
        .iter()
        .position(|s| s == "ALTER TABLE `s`.`child` COALESCE PARTITION 2")
        .expect("partition statement");
    let fk = statements
        .iter()
        .position(|s| s.contains("ADD CONSTRAINT `fk_parent`"))
        .expect("foreign key statement");
    assert!(fk < coalesce, "{:#?}", statements);
}
