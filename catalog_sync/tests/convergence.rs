//! Convergence: changes carried across in either direction leave nothing to diff

mod common;

use pretty_assertions::assert_eq;

use catalog_sync::catalog::{Column, ForeignKey, Index, Schema, Table};
use catalog_sync::{diff_make, ApplyDirection, Catalog, NodeId, SyncSession, SyncSettings};

use common::{normalized_omf, single_table};

/// Bring `into` in line with `from` by applying the diff tree towards it
fn converge(into: Catalog, from: &Catalog) -> Catalog {
    let mut session = SyncSession::new(into, from.clone(), SyncSettings::default());
    session.init_diff_tree(&[]).unwrap();
    session
        .set_apply_direction(&NodeId::root(), ApplyDirection::ApplyToModel, true)
        .unwrap();
    session.apply_changes_to_model().unwrap();
    session.into_model()
}

fn model_and_database() -> (Catalog, Catalog) {
    let mut db = Catalog::new("def");
    let s = db.add_schema(Schema::new("shop"));
    let customers = db.add_table(&s, Table::new("customers").engine("InnoDB")).unwrap();
    db.add_column(&customers, Column::new("id", "INT").not_null(true)).unwrap();
    db.add_column(&customers, Column::new("name", "VARCHAR(45)")).unwrap();
    db.add_column(&customers, Column::new("fax", "VARCHAR(20)")).unwrap();
    db.add_index(&customers, Index::new("PRIMARY", "PRIMARY"), &["id"]).unwrap();
    let audit = db.add_table(&s, Table::new("audit").engine("MyISAM")).unwrap();
    db.add_column(&audit, Column::new("entry", "TEXT")).unwrap();

    let mut model = Catalog::new("def");
    let s = model.add_schema(Schema::new("shop"));
    let customers = model
        .add_table(&s, Table::new("customers").engine("InnoDB").comment("people we sell to"))
        .unwrap();
    model.add_column(&customers, Column::new("id", "INT").not_null(true)).unwrap();
    model.add_column(&customers, Column::new("email", "VARCHAR(120)")).unwrap();
    model.add_column(&customers, Column::new("name", "VARCHAR(100)")).unwrap();
    model.add_index(&customers, Index::new("PRIMARY", "PRIMARY"), &["id"]).unwrap();
    let orders = model.add_table(&s, Table::new("orders").engine("InnoDB")).unwrap();
    model.add_column(&orders, Column::new("id", "INT").not_null(true)).unwrap();
    model.add_column(&orders, Column::new("customer_id", "INT")).unwrap();
    model
        .add_foreign_key(&orders, ForeignKey::new("fk_customer"), &["customer_id"], &customers, &["id"])
        .unwrap();

    (model, db)
}

#[test]
fn test_database_converges_to_model() {
    let (model, db) = model_and_database();

    let mut forward = SyncSession::new(model.clone(), db.clone(), SyncSettings::default());
    forward.init_diff_tree(&[]).unwrap();
    let script = forward.generate_diff_tree_script();
    assert!(script.contains("CREATE TABLE IF NOT EXISTS `shop`.`orders`"));
    assert!(script.contains("DROP TABLE IF EXISTS `shop`.`audit`"));
    assert!(script.contains("DROP COLUMN `fax`"));

    // The database copy takes the role of the model and receives the model's side
    let converged = converge(db, &model);
    assert!(diff_make(&model, &converged, &normalized_omf()).is_none());
}

#[test]
fn test_model_converges_to_database() {
    let (model, db) = model_and_database();
    let converged = converge(model, &db);
    assert!(diff_make(&db, &converged, &normalized_omf()).is_none());

    let s = converged.find_schema("shop").unwrap();
    let customers = converged.find_table(&s, "customers").unwrap();
    assert_eq!(
        converged.column_names(&customers),
        vec!["id".to_string(), "name".to_string(), "fax".to_string()]
    );
    assert_eq!(converged.tables[&customers].comment, "");
    assert!(converged.find_table(&s, "orders").is_none());
    assert!(converged.find_table(&s, "audit").is_some());
}

#[test]
fn test_trailing_text_column_round_trip() {
    let (org, _) = single_table("test", "t1", &[("id", "INT"), ("id2", "INT")]);
    let (model, _) = single_table("test", "t1", &[("id", "INT"), ("id2", "INT"), ("t", "TEXT")]);

    let converged = converge(org, &model);
    assert!(diff_make(&model, &converged, &normalized_omf()).is_none());
}

#[test]
fn test_moved_column_is_put_back() {
    let (db, _) = single_table("s", "t", &[("a", "INT"), ("b", "INT"), ("c", "INT")]);
    let (model, t) = single_table("s", "t", &[("c", "INT"), ("a", "INT"), ("b", "INT")]);

    let converged = converge(model, &db);
    assert_eq!(
        converged.column_names(&t),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert!(diff_make(&db, &converged, &normalized_omf()).is_none());
}

#[test]
fn test_dont_apply_keeps_model_side() {
    let (db, _) = single_table("s", "t", &[("id", "INT")]);
    let (model, t) = single_table("s", "t", &[("id", "INT"), ("extra", "INT")]);

    let mut session = SyncSession::new(model, db, SyncSettings::default());
    session.init_diff_tree(&[]).unwrap();
    session
        .set_apply_direction(&NodeId::root(), ApplyDirection::DontApply, true)
        .unwrap();
    let summary = session.apply_changes_to_model().unwrap();
    assert!(summary.is_empty());
    assert_eq!(
        session.model().column_names(&t),
        vec!["id".to_string(), "extra".to_string()]
    );
}

#[test]
fn test_renamed_column_converges_both_ways() {
    let (db, _) = single_table("s", "t", &[("id", "INT"), ("b", "INT")]);
    let (mut model, t) = single_table("s", "t", &[("id", "INT"), ("a", "INT")]);
    let a = model.tables[&t].columns[1].clone();
    model.set_old_name(&a, "b");

    let mut forward = SyncSession::new(model.clone(), db.clone(), SyncSettings::default());
    forward.init_diff_tree(&[]).unwrap();
    let script = forward.generate_diff_tree_script();
    assert!(script.contains("ALTER TABLE `s`.`t` CHANGE COLUMN `b` `a` INT"));
    assert!(!script.contains("DROP COLUMN"));

    let converged = converge(model, &db);
    assert_eq!(converged.column_names(&t), vec!["id".to_string(), "b".to_string()]);
    assert!(diff_make(&db, &converged, &normalized_omf()).is_none());
}
