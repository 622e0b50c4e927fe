//! Sessions driven from configuration and catalog documents

mod common;

use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::tempdir;

use catalog_sync::catalog::{load_catalog, save_catalog, Routine, Trigger, View};
use catalog_sync::sync::{JsonFileProfileStore, SyncProfile, SyncProfileStore};
use catalog_sync::{
    config, diff_make, ApplyDirection, Catalog, CatalogSyncClient, Error, NodeId, ReportAction, SyncSession,
    SyncSettings,
};

use common::{normalized_omf, single_table};

const MODEL_YAML: &str = r#"
name: def
schemata:
  - name: shop
    tables:
      - name: customers
        engine: InnoDB
        columns:
          - { name: id, type: INT, not_null: true }
          - { name: name, type: VARCHAR(100) }
        indices:
          - { name: PRIMARY, type: PRIMARY, columns: [id] }
      - name: orders
        engine: InnoDB
        columns:
          - { name: id, type: INT, not_null: true }
          - { name: customer_id, type: INT }
        foreign_keys:
          - name: fk_customer
            columns: [customer_id]
            referenced_table: customers
            referenced_columns: [id]
"#;

const DATABASE_YAML: &str = r#"
name: def
schemata:
  - name: shop
    tables:
      - name: customers
        engine: InnoDB
        columns:
          - { name: id, type: INT, not_null: true }
          - { name: name, type: VARCHAR(45) }
        indices:
          - { name: PRIMARY, type: PRIMARY, columns: [id] }
"#;

fn test_config(profile_file: &str) -> config::Config {
    let config_str = format!(
        r###"
        [comparison]
        case_sensitive = false
        skip_routine_definer = true

        [generator]
        keep_order = true
        generate_use = false

        [sync]
        skip_triggers = false
        skip_routines = true
        schema_skip_list = ["mysql"]
        default_engine = "InnoDB"
        profile_name = "localhost"
        profile_file = "{}"

        [logging]
        level = "debug"
        format = "json"
        console = false
        "###,
        profile_file.replace('\\', "\\\\")
    );
    toml::from_str(&config_str).expect("Failed to parse test config")
}

#[test]
fn test_config_loading() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("catalog_sync.toml");
    fs::write(
        &path,
        r#"
        [comparison]
        case_sensitive = true
        max_table_comment_length = 2048

        [sync]
        schema_skip_list = ["mysql", "sys"]
        "#,
    )
    .unwrap();

    let config = config::load_from_file(path.to_str().unwrap()).unwrap();
    assert!(config.comparison.case_sensitive);
    assert_eq!(config.comparison.max_table_comment_length, 2048);
    assert_eq!(config.comparison.dontdiff_mask, 3);
    assert_eq!(config.sync.schema_skip_list, vec!["mysql".to_string(), "sys".to_string()]);
    assert_eq!(config.sync.default_engine, "InnoDB");
    assert!(config.generator.keep_order);
    assert!(config.logging.is_none());

    let full = test_config("profiles.json");
    assert!(full.sync.skip_routines);
    let logging = full.logging.unwrap();
    assert_eq!(logging.format, "json");
    assert!(!logging.console);

    assert!(matches!(
        config::load_from_file(dir.path().join("missing.toml").to_str().unwrap()),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_document_round_trip() {
    let dir = tempdir().unwrap();
    let yaml = dir.path().join("model.yaml");
    fs::write(&yaml, MODEL_YAML).unwrap();

    let catalog = load_catalog(&yaml).unwrap();
    let shop = catalog.find_schema("shop").unwrap();
    let orders = catalog.find_table(&shop, "orders").unwrap();
    let customers = catalog.find_table(&shop, "customers").unwrap();
    let fk = &catalog.foreign_keys[&catalog.tables[&orders].foreign_keys[0]];
    assert_eq!(fk.referenced_table.as_ref(), Some(&customers));

    let json = dir.path().join("model.json");
    save_catalog(&catalog, &json).unwrap();
    let reloaded = load_catalog(&json).unwrap();
    assert!(catalog_sync::diff_make(&catalog, &reloaded, &common::normalized_omf()).is_none());

    fs::write(dir.path().join("broken.yaml"), "schemata: [").unwrap();
    assert!(load_catalog(&dir.path().join("broken.yaml")).is_err());
}

#[test]
fn test_client_session_script_and_report() {
    let dir = tempdir().unwrap();
    let model = dir.path().join("model.yaml");
    let database = dir.path().join("database.yaml");
    fs::write(&model, MODEL_YAML).unwrap();
    fs::write(&database, DATABASE_YAML).unwrap();
    let profiles = dir.path().join("profiles.json");

    let client = CatalogSyncClient::new(test_config(profiles.to_str().unwrap()));
    let mut session = client.open(&model, &database).unwrap();
    let tree = session.init_diff_tree(&[]).unwrap();
    assert!(tree.dump(0).contains("model->"));

    let script = session.generate_diff_tree_script();
    assert!(script.contains("CREATE TABLE IF NOT EXISTS `shop`.`orders`"));
    assert!(script.contains("ALTER TABLE `shop`.`customers` CHANGE COLUMN `name` `name` VARCHAR(100)"));
    assert!(script.contains("ADD CONSTRAINT `fk_customer`"));

    let report = session.generate_diff_tree_report().unwrap();
    let tables: Vec<(&str, ReportAction)> = report.schemas[0]
        .children
        .iter()
        .map(|t| (t.name.as_str(), t.action))
        .collect();
    assert_eq!(tables, vec![("customers", ReportAction::Alter), ("orders", ReportAction::Create)]);

    // Leaving the new table out drops it from script and report alike
    let orders = tree_node(&session, "orders");
    session
        .set_apply_direction(&orders, ApplyDirection::DontApply, true)
        .unwrap();
    let script = session.generate_diff_tree_script();
    assert!(!script.contains("`orders`"));
    assert_eq!(session.generate_diff_tree_report().unwrap().schemas[0].children.len(), 1);

    let sql = session.get_sql_for_object(&orders).unwrap();
    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `shop`.`orders`"));
}

fn tree_node(session: &catalog_sync::SyncSession, name: &str) -> NodeId {
    let tree = session.diff_tree().expect("initialized");
    tree.iter()
        .find(|(_, node)| node.name() == name)
        .map(|(id, _)| id)
        .expect("node exists")
}

#[test]
fn test_profiles_persist_between_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("profiles.json");
    let store = JsonFileProfileStore::new(&path);
    assert!(store.get("model", "shop").unwrap().is_none());

    let (catalog, table) = single_table("shop", "orders", &[("id", "INT")]);
    let schema = catalog.find_schema("shop").unwrap();
    store
        .put("model", "shop", SyncProfile::from_schema("localhost", &catalog, &schema))
        .unwrap();
    assert!(path.exists());

    let reopened = JsonFileProfileStore::new(&path);
    let profile = reopened.get("model", "shop").unwrap().expect("stored");
    assert_eq!(profile.name, "localhost");
    assert_eq!(profile.last_known_names.get(&table).map(String::as_str), Some("orders"));
    assert!(reopened.get("model", "other").unwrap().is_none());

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(reopened.get("model", "shop"), Err(Error::Profile(_))));
}

#[test]
fn test_apply_writes_profile_and_model() {
    let dir = tempdir().unwrap();
    let model = dir.path().join("model.yaml");
    let database = dir.path().join("database.yaml");
    fs::write(&model, MODEL_YAML).unwrap();
    fs::write(&database, DATABASE_YAML).unwrap();
    let profiles = dir.path().join("profiles.json");

    let client = CatalogSyncClient::new(test_config(profiles.to_str().unwrap()));
    let mut session = client.open(&model, &database).unwrap();
    session.init_diff_tree(&[]).unwrap();
    session
        .set_apply_direction(&NodeId::root(), ApplyDirection::ApplyToModel, true)
        .unwrap();
    let summary = session.apply_changes_to_model().unwrap();
    assert_eq!(summary.removed, 1);
    session.save_sync_profile().unwrap();

    let output = dir.path().join("updated.yaml");
    save_catalog(session.model(), &output).unwrap();
    let updated = load_catalog(&output).unwrap();
    let shop = updated.find_schema("shop").unwrap();
    assert!(updated.find_table(&shop, "orders").is_none());

    let store = JsonFileProfileStore::new(&profiles);
    let key = format!("{}/localhost", session.model().id);
    assert!(store.get(&key, "shop").unwrap().is_some());
}

#[test]
fn test_invalid_node_ids_are_usage_errors() {
    assert!(matches!(NodeId::parse("0.x"), Err(Error::Usage(_))));

    let (model, _) = single_table("s", "t", &[("id", "INT")]);
    let (db, _) = single_table("s", "t", &[("id", "BIGINT")]);
    let mut session = catalog_sync::SyncSession::new(model, db, Default::default());
    session.init_diff_tree(&[]).unwrap();
    assert!(matches!(
        session.set_apply_direction(&NodeId(vec![7, 3]), ApplyDirection::ApplyToDb, false),
        Err(Error::Usage(_))
    ));
    assert!(session.set_next_apply_direction(&NodeId(vec![0])).is_ok());
}

#[test]
fn test_renames_survive_reloading_documents() {
    let dir = tempdir().unwrap();
    let model = dir.path().join("model.yaml");
    let database = dir.path().join("database.yaml");
    fs::write(&model, MODEL_YAML).unwrap();
    fs::write(&database, MODEL_YAML).unwrap();
    let profiles = dir.path().join("profiles.json");
    let client = CatalogSyncClient::new(test_config(profiles.to_str().unwrap()));

    let mut session = client.open(&model, &database).unwrap();
    session.init_diff_tree(&[]).unwrap();
    assert!(session.save_sync_profile().unwrap());
    let model_id = session.model().id.clone();
    drop(session);

    // Rename the table in the document the way an editor would
    let saved = fs::read_to_string(&model).unwrap();
    assert!(saved.contains(model_id.as_str()));
    fs::write(&model, saved.replace("name: orders", "name: purchases")).unwrap();

    let mut session = client.open(&model, &database).unwrap();
    assert_eq!(session.model().id, model_id);
    session.init_diff_tree(&[]).unwrap();
    let script = session.generate_diff_tree_script();
    assert!(script.contains("RENAME TABLE `shop`.`orders` TO `shop`.`purchases`"));
    assert!(!script.contains("CREATE TABLE"));
    assert!(!script.contains("DROP TABLE"));
}

#[test]
fn test_duplicate_document_ids_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.yaml");
    fs::write(
        &path,
        r#"
name: def
schemata:
  - name: shop
    tables:
      - { id: t1, name: a, columns: [{ name: id, type: INT }] }
      - { id: t1, name: b, columns: [{ name: id, type: INT }] }
"#,
    )
    .unwrap();
    assert!(matches!(load_catalog(&path), Err(Error::Document(_))));
}

/// Code objects of `shop`.`orders`
#[derive(Clone, Copy, Default)]
struct Code {
    trigger: Option<&'static str>,
    view: Option<&'static str>,
    routine: Option<&'static str>,
}

impl Code {
    fn trigger(body: &'static str) -> Self {
        Self { trigger: Some(body), ..Default::default() }
    }

    fn view(select: &'static str) -> Self {
        Self { view: Some(select), ..Default::default() }
    }

    fn routine(definition: &'static str) -> Self {
        Self { routine: Some(definition), ..Default::default() }
    }

    fn catalog(self) -> Catalog {
        let (mut catalog, table) = single_table("shop", "orders", &[("id", "INT")]);
        let schema = catalog.find_schema("shop").unwrap();
        if let Some(body) = self.trigger {
            catalog.add_trigger(&table, Trigger::new("trg_orders", "BEFORE", "INSERT", body)).unwrap();
        }
        if let Some(select) = self.view {
            catalog.add_view(&schema, View::new("v_orders", select)).unwrap();
        }
        if let Some(definition) = self.routine {
            catalog.add_routine(&schema, Routine::new("p_orders", "PROCEDURE", definition)).unwrap();
        }
        catalog
    }
}

const TRIGGER_V1: &str = "CREATE TRIGGER `shop`.`trg_orders` BEFORE INSERT ON `shop`.`orders` FOR EACH ROW SET NEW.id = 1";
const TRIGGER_V2: &str = "CREATE TRIGGER `shop`.`trg_orders` BEFORE INSERT ON `shop`.`orders` FOR EACH ROW SET NEW.id = 2";
const DROP_TRIGGER: &str = "DROP TRIGGER IF EXISTS `shop`.`trg_orders`";
const VIEW_V1: &str = "CREATE OR REPLACE VIEW `shop`.`v_orders` AS SELECT id FROM orders";
const VIEW_V2: &str = "CREATE OR REPLACE VIEW `shop`.`v_orders` AS SELECT id FROM orders WHERE id > 0";
const DROP_VIEW: &str = "DROP VIEW IF EXISTS `shop`.`v_orders`";
const ROUTINE_V1: &str = "CREATE PROCEDURE `shop`.`p_orders` () BEGIN SELECT 1; END";
const ROUTINE_V2: &str = "CREATE PROCEDURE `shop`.`p_orders` () BEGIN SELECT 2; END";
const DROP_ROUTINE: &str = "DROP PROCEDURE IF EXISTS `shop`.`p_orders`";

#[rstest]
#[case::trigger_added(Code::trigger("SET NEW.id = 1"), Code::default(), &[TRIGGER_V1], &[DROP_TRIGGER])]
#[case::trigger_modified(Code::trigger("SET NEW.id = 2"), Code::trigger("SET NEW.id = 1"), &[DROP_TRIGGER, TRIGGER_V2], &[TRIGGER_V1])]
#[case::trigger_dropped(Code::default(), Code::trigger("SET NEW.id = 1"), &[DROP_TRIGGER], &["CREATE TRIGGER"])]
#[case::view_added(Code::view("SELECT id FROM orders"), Code::default(), &[VIEW_V1], &[DROP_VIEW])]
#[case::view_modified(Code::view("SELECT id FROM orders WHERE id > 0"), Code::view("SELECT id FROM orders"), &[VIEW_V2], &[DROP_VIEW])]
#[case::view_dropped(Code::default(), Code::view("SELECT id FROM orders"), &[DROP_VIEW], &["CREATE OR REPLACE VIEW"])]
#[case::routine_added(Code::routine("() BEGIN SELECT 1; END"), Code::default(), &[ROUTINE_V1], &[DROP_ROUTINE])]
#[case::routine_modified(Code::routine("() BEGIN SELECT 2; END"), Code::routine("() BEGIN SELECT 1; END"), &[DROP_ROUTINE, ROUTINE_V2], &[ROUTINE_V1])]
#[case::routine_dropped(Code::default(), Code::routine("() BEGIN SELECT 1; END"), &[DROP_ROUTINE], &["CREATE PROCEDURE"])]
fn test_code_objects_sync_both_ways(
    #[case] model: Code,
    #[case] database: Code,
    #[case] present: &[&str],
    #[case] absent: &[&str],
) {
    // The table itself is identical on both sides
    let mut session = SyncSession::new(model.catalog(), database.catalog(), SyncSettings::default());
    session.init_diff_tree(&[]).unwrap();
    let script = session.generate_diff_tree_script();
    for statement in present {
        assert!(script.contains(statement), "missing {:?} in\n{}", statement, script);
    }
    for statement in absent {
        assert!(!script.contains(statement), "unexpected {:?} in\n{}", statement, script);
    }
    assert!(!script.contains("ALTER TABLE"));

    session
        .set_apply_direction(&NodeId::root(), ApplyDirection::ApplyToModel, true)
        .unwrap();
    session.apply_changes_to_model().unwrap();
    assert!(diff_make(session.external(), session.model(), &normalized_omf()).is_none());
}
