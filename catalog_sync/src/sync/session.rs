//! Synchronization session
//!
//! Ties the pieces together for one model/database pair: prepares both
//! catalogs, diffs them, builds the diff tree the user picks directions on,
//! then renders the script for the database side or applies the database
//! side back onto the model.

use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::catalog::document::save_catalog;
use crate::catalog::keys::filter_key;
use crate::catalog::types::{Catalog, ObjectId, ObjectKind};
use crate::config::{ComparisonConfig, Config};
use crate::diff::engine::diff_make;
use crate::diff::normalize::NormalizedComparer;
use crate::diff::omf::Omf;
use crate::error::{Error, Result};
use crate::sql::generator::{DiffSqlGenerator, SqlOutput};
use crate::sql::options::GeneratorOptions;
use crate::sql::script::make_sql_sync_script;
use crate::sync::applier::{ApplySummary, ChangesApplier};
use crate::sync::diff_tree::{ApplyDirection, DiffNodeController, DiffTree, NodeId};
use crate::sync::old_names::update_all_old_names;
use crate::sync::profile::{SyncProfile, SyncProfileStore};
use crate::sync::report::SyncReport;

/// Members the session diff always leaves out: bookkeeping and server counters
const SESSION_DONTDIFF_MASK: u32 = 3;

/// Settings of one session
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub comparison: ComparisonConfig,
    /// Base option bag; filter lists are replaced when scripting the diff tree
    pub generator: GeneratorOptions,
    pub skip_triggers: bool,
    pub skip_routines: bool,
    /// Schemas removed from both sides before diffing
    pub schema_skip_list: Vec<String>,
    /// Engine given to model tables that do not name one
    pub default_engine: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            comparison: config.comparison.clone(),
            generator: GeneratorOptions::from_config(&config.generator, config.comparison.case_sensitive),
            skip_triggers: config.sync.skip_triggers,
            skip_routines: config.sync.skip_routines,
            schema_skip_list: config.sync.schema_skip_list.clone(),
            default_engine: config.sync.default_engine.clone(),
        }
    }
}

/// Catalogs as they were diffed
struct Prepared {
    model_copy: Catalog,
    external: Catalog,
    tree: DiffTree,
    /// Unfiltered statements of the whole diff
    alter_output: SqlOutput,
}

pub struct SyncSession {
    model: Catalog,
    external: Catalog,
    model_id: String,
    profile_name: Option<String>,
    settings: SyncSettings,
    profiles: Option<Box<dyn SyncProfileStore>>,
    /// Document the model was loaded from; rewritten when a profile is saved
    model_document: Option<PathBuf>,
    prepared: Option<Prepared>,
}

impl SyncSession {
    /// Session synchronizing `model` with the `external` (database) catalog
    pub fn new(model: Catalog, external: Catalog, settings: SyncSettings) -> Self {
        let model_id = model.id.to_string();
        Self {
            model,
            external,
            model_id,
            profile_name: None,
            settings,
            profiles: None,
            model_document: None,
            prepared: None,
        }
    }

    /// Identity under which profiles of this model are stored
    pub fn with_model_id(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    /// Use a named sync profile kept in `store`
    pub fn with_profile_store(mut self, profile_name: &str, store: Box<dyn SyncProfileStore>) -> Self {
        self.profile_name = Some(profile_name.to_string());
        self.profiles = Some(store);
        self
    }

    /// Document the model is written back to when a sync profile is saved
    pub fn with_model_document(mut self, path: impl AsRef<Path>) -> Self {
        self.set_model_document(path);
        self
    }

    pub fn set_model_document(&mut self, path: impl AsRef<Path>) {
        self.model_document = Some(path.as_ref().to_path_buf());
    }

    pub fn model_document(&self) -> Option<&Path> {
        self.model_document.as_deref()
    }

    pub fn model(&self) -> &Catalog {
        &self.model
    }

    pub fn external(&self) -> &Catalog {
        &self.external
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn into_model(self) -> Catalog {
        self.model
    }

    pub fn diff_tree(&self) -> Option<&DiffTree> {
        self.prepared.as_ref().map(|p| &p.tree)
    }

    fn prepared(&self) -> Result<&Prepared> {
        self.prepared
            .as_ref()
            .ok_or_else(|| Error::usage("The diff tree has not been initialized"))
    }

    fn prepared_mut(&mut self) -> Result<&mut Prepared> {
        self.prepared
            .as_mut()
            .ok_or_else(|| Error::usage("The diff tree has not been initialized"))
    }

    /// Key profiles are stored under; one profile set per model and profile name
    fn profile_key(&self) -> Option<(String, &dyn SyncProfileStore)> {
        match (&self.profile_name, &self.profiles) {
            (Some(name), Some(store)) => Some((format!("{}/{}", self.model_id, name), store.as_ref())),
            _ => None,
        }
    }

    /// Seed old names of the model from the stored profile of each schema
    pub fn restore_sync_profile(&mut self) -> Result<usize> {
        let (key, store) = match self.profile_key() {
            Some(found) => found,
            None => return Ok(0),
        };
        let mut found = Vec::new();
        for schema_id in &self.model.schemata {
            let schema_name = self.model.name_of(schema_id);
            match store.get(&key, &schema_name)? {
                Some(profile) => found.push((schema_id.clone(), profile)),
                None => info!(profile = %key, schema = %schema_name, "No sync profile found"),
            }
        }

        let mut seeded = 0;
        for (schema_id, profile) in found {
            info!(profile = %key, schema = %self.model.name_of(&schema_id), "Restoring old names from sync profile");
            seeded += profile.apply_to_schema(&mut self.model, &schema_id);
        }
        Ok(seeded)
    }

    /// Store the current names of every model schema as the new baseline
    ///
    /// Profile entries refer to model object ids, so the model document (when
    /// one is attached) is written back with its ids. Returns false when the
    /// session has no profile.
    pub fn save_sync_profile(&self) -> Result<bool> {
        let (key, store) = match self.profile_key() {
            Some(found) => found,
            None => return Ok(false),
        };
        let name = self.profile_name.as_deref().unwrap_or_default();
        for schema_id in &self.model.schemata {
            let schema_name = self.model.name_of(schema_id);
            info!(profile = %key, schema = %schema_name, "Saving sync profile");
            store.put(&key, &schema_name, SyncProfile::from_schema(name, &self.model, schema_id))?;
        }
        self.save_model_document()?;
        Ok(true)
    }

    /// Write the model to its attached document, if any
    pub fn save_model_document(&self) -> Result<()> {
        if let Some(path) = &self.model_document {
            save_catalog(&self.model, path)?;
            info!(path = %path.display(), "Wrote model document");
        }
        Ok(())
    }

    /// Prepare both catalogs, diff them and build the diff tree
    ///
    /// Model schemas listed in `skip_schemata` that have no database
    /// counterpart get no node.
    pub fn init_diff_tree(&mut self, skip_schemata: &[String]) -> Result<&DiffTree> {
        self.restore_sync_profile()?;

        let mut model_copy = self.model.clone();
        let mut external = self.external.clone();
        apply_defaults(&mut model_copy, &self.settings.default_engine);
        apply_defaults(&mut external, &self.settings.default_engine);
        update_all_old_names(&mut model_copy, true);
        update_all_old_names(&mut external, true);

        if self.settings.skip_triggers {
            info!("Removing triggers from the model copy");
            remove_all(&mut model_copy, ObjectKind::Trigger);
        }
        if self.settings.skip_routines {
            info!("Removing routines from the model copy");
            remove_all(&mut model_copy, ObjectKind::Routine);
        }
        for schema_name in &self.settings.schema_skip_list {
            remove_schemas_named(&mut external, schema_name);
            remove_schemas_named(&mut model_copy, schema_name);
        }

        let mut omf = Omf::from_config(&self.settings.comparison);
        omf.dontdiff_mask = SESSION_DONTDIFF_MASK;
        NormalizedComparer::from_config(&self.settings.comparison).init_omf(&mut omf);
        let changes = diff_make(&external, &model_copy, &omf);

        let alter_output = match &changes {
            Some(changes) => {
                let options = GeneratorOptions {
                    use_filtered_lists: false,
                    ..self.settings.generator.clone()
                };
                DiffSqlGenerator::new(&options).generate(&external, &model_copy, changes)
            }
            None => SqlOutput::default(),
        };
        info!(
            changes = changes.as_ref().map_or(0, |c| c.len()),
            statements = alter_output.statements.len(),
            "Compared model with database"
        );

        let tree = DiffTree::new(
            skip_schemata,
            &model_copy,
            &external,
            changes,
            DiffNodeController::default(),
        );
        debug!("Diff tree:\n{}", tree.dump(0));

        let prepared = self.prepared.insert(Prepared {
            model_copy,
            external,
            tree,
            alter_output,
        });
        Ok(&prepared.tree)
    }

    /// Generator options whose filter lists hold the objects the diff tree
    /// sends to the database
    pub fn script_options(&self) -> Result<GeneratorOptions> {
        let prepared = self.prepared()?;
        let cs = self.settings.generator.case_sensitive;
        let mut options = GeneratorOptions {
            use_filtered_lists: true,
            keep_order: true,
            schema_filter_list: Vec::new(),
            table_filter_list: Vec::new(),
            view_filter_list: Vec::new(),
            routine_filter_list: Vec::new(),
            trigger_filter_list: Vec::new(),
            ..self.settings.generator.clone()
        };

        for object in prepared.tree.get_object_list_for_script() {
            let catalog = if prepared.model_copy.contains(&object.id) {
                &prepared.model_copy
            } else {
                &prepared.external
            };
            let key = filter_key(catalog, &object.id, cs);
            let list = match object.kind {
                ObjectKind::Schema => &mut options.schema_filter_list,
                ObjectKind::Table => &mut options.table_filter_list,
                ObjectKind::View => &mut options.view_filter_list,
                ObjectKind::Routine => &mut options.routine_filter_list,
                ObjectKind::Trigger => &mut options.trigger_filter_list,
                _ => continue,
            };
            if !list.contains(&key) {
                list.push(key);
            }
        }
        Ok(options)
    }

    fn try_generate_script(&self) -> Result<String> {
        let prepared = self.prepared()?;
        let changes = match prepared.tree.changes() {
            Some(changes) => changes,
            None => return Ok(String::new()),
        };
        let options = self.script_options()?;
        let mut output = DiffSqlGenerator::new(&options).generate(&prepared.external, &prepared.model_copy, changes);
        make_sql_sync_script(&options, &mut output)?;
        Ok(output.script)
    }

    /// Script applying every node marked for the database; empty when
    /// nothing is marked or generation fails
    pub fn generate_diff_tree_script(&self) -> String {
        match self.try_generate_script() {
            Ok(script) => script,
            Err(err) => {
                error!(error = %err, "Failed to generate the synchronization script");
                String::new()
            }
        }
    }

    /// Report of the objects the diff tree sends to the database
    pub fn generate_diff_tree_report(&self) -> Result<SyncReport> {
        let prepared = self.prepared()?;
        let changes = match prepared.tree.changes() {
            Some(changes) => changes,
            None => return Ok(SyncReport::default()),
        };
        let options = self.script_options()?;
        Ok(SyncReport::build(&prepared.external, &prepared.model_copy, changes, &options))
    }

    /// Bring every node marked [`ApplyDirection::ApplyToModel`] back into the model
    pub fn apply_changes_to_model(&mut self) -> Result<ApplySummary> {
        let case_sensitive = self.settings.comparison.case_sensitive;
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| Error::usage("The diff tree has not been initialized"))?;
        let changes = match prepared.tree.changes() {
            Some(changes) => changes,
            None => return Ok(ApplySummary::default()),
        };
        let mut applier = ChangesApplier::new(case_sensitive);
        let summary = applier.apply_changes_to_model(
            &mut self.model,
            &prepared.external,
            &prepared.model_copy,
            changes,
            prepared.tree.root(),
        )?;
        if !summary.dropped_references.is_empty() {
            warn!(dropped = ?summary.dropped_references, "Dropped references to objects that no longer exist");
        }
        Ok(summary)
    }

    /// Statements of the unfiltered diff that belong to a node's object
    pub fn get_sql_for_object(&self, node: &NodeId) -> Result<String> {
        let prepared = self.prepared()?;
        let node = prepared.tree.node(node)?;
        let ids: Vec<&ObjectId> = node
            .model_part
            .iter()
            .chain(node.db_part.iter())
            .map(|o| &o.id)
            .collect();

        let mut sql = String::new();
        for (statement, object) in prepared.alter_output.statements.iter().zip(&prepared.alter_output.objects) {
            if ids.contains(&&object.id) {
                sql.push_str(statement);
                sql.push('\n');
            }
        }
        Ok(sql)
    }

    pub fn set_next_apply_direction(&mut self, node: &NodeId) -> Result<()> {
        self.prepared_mut()?.tree.set_next_apply_direction(node)
    }

    pub fn set_apply_direction(&mut self, node: &NodeId, direction: ApplyDirection, recursive: bool) -> Result<()> {
        self.prepared_mut()?.tree.set_apply_direction(node, direction, recursive)
    }

    /// Generate the script on a blocking worker and hand the session back with it
    pub async fn generate_script_in_background(self) -> Result<(Self, String)> {
        tokio::task::spawn_blocking(move || {
            let script = self.generate_diff_tree_script();
            (self, script)
        })
        .await
        .map_err(|e| Error::ScriptGeneration(format!("Background script generation failed: {}", e)))
    }
}

/// Give tables without an engine the default one
fn apply_defaults(catalog: &mut Catalog, default_engine: &str) {
    if default_engine.is_empty() {
        return;
    }
    for table in catalog.tables.values_mut() {
        if table.engine.is_empty() {
            table.engine = default_engine.to_string();
        }
    }
}

fn remove_all(catalog: &mut Catalog, kind: ObjectKind) {
    let ids: Vec<ObjectId> = match kind {
        ObjectKind::Trigger => catalog.triggers.keys().cloned().collect(),
        ObjectKind::Routine => catalog.routines.keys().cloned().collect(),
        _ => return,
    };
    for id in ids {
        catalog.remove_object(&id);
    }
}

fn remove_schemas_named(catalog: &mut Catalog, name: &str) {
    let ids: Vec<ObjectId> = catalog
        .schemata
        .iter()
        .filter(|id| catalog.name_of(id) == name)
        .cloned()
        .collect();
    for id in ids {
        catalog.remove_object(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Routine, Schema, Table, Trigger};
    use crate::sync::profile::JsonFileProfileStore;
    use pretty_assertions::assert_eq;

    fn shop(columns: &[(&str, &str)]) -> Catalog {
        let mut catalog = Catalog::new("def");
        let schema = catalog.add_schema(Schema::new("shop"));
        let table = catalog.add_table(&schema, Table::new("orders").engine("InnoDB")).unwrap();
        for (name, data_type) in columns {
            catalog.add_column(&table, Column::new(name, data_type)).unwrap();
        }
        catalog
    }

    #[test]
    fn test_uninitialized_session_is_a_usage_error() {
        let session = SyncSession::new(shop(&[]), shop(&[]), SyncSettings::default());
        assert!(matches!(session.generate_diff_tree_report(), Err(Error::Usage(_))));
        assert!(matches!(session.get_sql_for_object(&NodeId::root()), Err(Error::Usage(_))));
        assert_eq!(session.generate_diff_tree_script(), "");
    }

    #[test]
    fn test_script_for_added_column() {
        let model = shop(&[("id", "INT"), ("note", "TEXT")]);
        let external = shop(&[("id", "INT")]);
        let mut session = SyncSession::new(model, external, SyncSettings::default());
        session.init_diff_tree(&[]).unwrap();

        let script = session.generate_diff_tree_script();
        assert!(script.contains("ALTER TABLE `shop`.`orders`"));
        assert!(script.contains("ADD COLUMN `note` TEXT"));

        let sql = session.get_sql_for_object(&NodeId(vec![0, 0])).unwrap();
        assert!(sql.contains("ADD COLUMN `note`"));
        assert!(sql.ends_with('\n'));
    }

    #[test]
    fn test_dont_apply_nodes_are_left_out_of_the_script() {
        let model = shop(&[("id", "INT"), ("note", "TEXT")]);
        let external = shop(&[("id", "INT")]);
        let mut session = SyncSession::new(model, external, SyncSettings::default());
        session.init_diff_tree(&[]).unwrap();
        session
            .set_apply_direction(&NodeId(vec![0, 0]), ApplyDirection::DontApply, false)
            .unwrap();
        assert_eq!(session.generate_diff_tree_script(), "");
    }

    #[test]
    fn test_skip_settings_remove_objects_before_diffing() {
        let mut model = shop(&[("id", "INT")]);
        let schema = model.find_schema("shop").unwrap();
        let table = model.find_table(&schema, "orders").unwrap();
        model
            .add_trigger(&table, Trigger::new("trg", "BEFORE", "INSERT", "SET NEW.id = 1"))
            .unwrap();
        model
            .add_routine(&schema, Routine::new("p", "PROCEDURE", "CREATE PROCEDURE p() BEGIN END"))
            .unwrap();
        let extra = model.add_schema(Schema::new("scratch"));
        model.add_table(&extra, Table::new("tmp")).unwrap();

        let settings = SyncSettings {
            skip_triggers: true,
            skip_routines: true,
            schema_skip_list: vec!["scratch".to_string()],
            ..Default::default()
        };
        let mut session = SyncSession::new(model, shop(&[("id", "INT")]), settings);
        let tree = session.init_diff_tree(&[]).unwrap();
        assert!(tree.changes().is_none());
        assert_eq!(session.generate_diff_tree_script(), "");
    }

    #[test]
    fn test_default_engine_is_applied_before_diffing() {
        let mut model = Catalog::new("def");
        let schema = model.add_schema(Schema::new("shop"));
        let table = model.add_table(&schema, Table::new("orders")).unwrap();
        model.add_column(&table, Column::new("id", "INT")).unwrap();

        let mut session = SyncSession::new(model, shop(&[("id", "INT")]), SyncSettings::default());
        assert!(session.init_diff_tree(&[]).unwrap().changes().is_none());
    }

    #[test]
    fn test_profile_seeds_renames() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProfileStore::new(dir.path().join("profiles.json"));

        let session = SyncSession::new(shop(&[("id", "INT")]), shop(&[("id", "INT")]), SyncSettings::default())
            .with_model_id("m1")
            .with_profile_store("localhost", Box::new(store.clone()));
        session.save_sync_profile().unwrap();
        assert!(store.get("m1/localhost", "shop").unwrap().is_some());

        // Rename in the model without recording an old name
        let mut model = session.into_model();
        let schema = model.find_schema("shop").unwrap();
        let table = model.find_table(&schema, "orders").unwrap();
        model.tables[&table].name = "purchases".to_string();
        model.tables[&table].old_name.clear();

        let mut session = SyncSession::new(model, shop(&[("id", "INT")]), SyncSettings::default())
            .with_model_id("m1")
            .with_profile_store("localhost", Box::new(store));
        session.init_diff_tree(&[]).unwrap();

        let script = session.generate_diff_tree_script();
        assert!(script.contains("RENAME TABLE `shop`.`orders` TO `shop`.`purchases`"));
        assert!(!script.contains("CREATE TABLE"));
    }

    #[tokio::test]
    async fn test_background_generation_returns_the_session() {
        let model = shop(&[("id", "INT"), ("note", "TEXT")]);
        let mut session = SyncSession::new(model, shop(&[("id", "INT")]), SyncSettings::default());
        session.init_diff_tree(&[]).unwrap();
        let (session, script) = session.generate_script_in_background().await.unwrap();
        assert!(script.contains("ADD COLUMN `note` TEXT"));
        assert!(session.diff_tree().is_some());
    }
}
