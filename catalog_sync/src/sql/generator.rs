//! Change tree to MySQL DDL
//!
//! Walks the change tree of a catalog diff (source = live database, target =
//! model) and emits one statement per DDL operation, each paired with the
//! object it belongs to. Statement ordering follows what the server needs:
//! foreign keys go first and come back last, tables are created before their
//! constraints and triggers, and columns are positioned in target order.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, trace};

use crate::catalog::keys::filter_key;
use crate::catalog::types::{Catalog, ObjectId, ObjectKind, ObjectRef};
use crate::diff::change::{Change, ChangeId, ChangeTree};
use crate::sql::mysql::{MysqlDialect, TABLE_OPTIONS};
use crate::sql::options::GeneratorOptions;
use crate::sql::partition::partition_clauses;
use crate::utils::naming::{fold_case, quote_identifier};

/// Generated statements with the objects they belong to
///
/// `statements`, `objects` and `schemas` are index aligned. `script` stays
/// empty until [`crate::sql::make_sql_sync_script`] composes it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SqlOutput {
    pub statements: Vec<String>,
    pub objects: Vec<ObjectRef>,
    /// Schema each statement runs in
    pub schemas: Vec<String>,
    pub script: String,
}

impl SqlOutput {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements emitted for one object
    pub fn statements_for(&self, id: &ObjectId) -> Vec<&str> {
        self.statements
            .iter()
            .zip(&self.objects)
            .filter(|(_, object)| object.id == *id)
            .map(|(sql, _)| sql.as_str())
            .collect()
    }
}

/// Statement groups, in the order they run when emission order is not kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum StatementClass {
    DropForeignKey,
    Drop,
    Create,
    Alter,
    AddForeignKey,
}

#[derive(Debug)]
struct Statement {
    sql: String,
    object: ObjectRef,
    class: StatementClass,
    schema: String,
}

/// One entry of an owned list change
#[derive(Debug, Clone)]
enum ListItem {
    Added(ObjectId),
    Removed(ObjectId),
    Altered {
        old: ObjectId,
        new: ObjectId,
        change: Option<ChangeId>,
        moved: bool,
    },
}

/// Generates MySQL DDL for a catalog change tree
pub struct DiffSqlGenerator {
    options: GeneratorOptions,
    dialect: MysqlDialect,
    filters: HashMap<ObjectKind, HashSet<String>>,
}

impl DiffSqlGenerator {
    /// Create a generator for the given options
    pub fn new(options: &GeneratorOptions) -> Self {
        let filters = [
            ObjectKind::Schema,
            ObjectKind::Table,
            ObjectKind::View,
            ObjectKind::Routine,
            ObjectKind::Trigger,
        ]
        .into_iter()
        .map(|kind| (kind, options.folded_filter(kind)))
        .collect();

        Self {
            options: options.clone(),
            dialect: MysqlDialect::new(options.omit_schemas),
            filters,
        }
    }

    /// Generate the statements turning `source` into `target`
    pub fn generate(&self, source: &Catalog, target: &Catalog, changes: &ChangeTree) -> SqlOutput {
        let mut run = Run {
            generator: self,
            source,
            target,
            tree: changes,
            statements: Vec::new(),
        };
        run.root();

        let mut statements = run.statements;
        if !self.options.keep_order {
            statements.sort_by_key(|s| s.class);
        }
        debug!(statements = statements.len(), "Generated synchronization statements");

        let mut output = SqlOutput::default();
        for statement in statements {
            output.statements.push(statement.sql);
            output.objects.push(statement.object);
            output.schemas.push(statement.schema);
        }
        output
    }

    /// Whether the filter lists let statements for an object through
    fn allowed(&self, catalog: &Catalog, id: &ObjectId) -> bool {
        if !self.options.use_filtered_lists {
            return true;
        }
        let kind = match catalog.kind_of(id) {
            Some(kind) => kind,
            None => return false,
        };
        match self.filters.get(&kind) {
            Some(filter) => {
                let cs = self.options.case_sensitive;
                filter.contains(&fold_case(&filter_key(catalog, id, cs), cs))
            }
            None => true,
        }
    }
}

/// State of one generation pass
struct Run<'a> {
    generator: &'a DiffSqlGenerator,
    source: &'a Catalog,
    target: &'a Catalog,
    tree: &'a ChangeTree,
    statements: Vec<Statement>,
}

impl<'a> Run<'a> {
    fn options(&self) -> &'a GeneratorOptions {
        &self.generator.options
    }

    fn dialect(&self) -> &'a MysqlDialect {
        &self.generator.dialect
    }

    fn allowed(&self, catalog: &Catalog, id: &ObjectId) -> bool {
        self.generator.allowed(catalog, id)
    }

    fn separate_foreign_keys(&self) -> bool {
        self.options().separate_foreign_keys && !self.options().skip_foreign_keys
    }

    /// Foreign keys go inside CREATE TABLE
    fn inline_foreign_keys(&self) -> bool {
        !self.options().separate_foreign_keys && !self.options().skip_foreign_keys
    }

    fn push(&mut self, class: StatementClass, catalog: &Catalog, id: &ObjectId, sql: String) {
        if sql.is_empty() {
            return;
        }
        let object = match catalog.object_ref(id) {
            Some(object) => object,
            None => return,
        };
        let schema = catalog.schema_of(id).map(|s| s.name.clone()).unwrap_or_default();
        trace!(kind = %object.kind, name = %object.name, ?class, "Statement");
        self.statements.push(Statement {
            sql,
            object,
            class,
            schema,
        });
    }

    fn root(&mut self) {
        let tree = self.tree;
        if tree.len() == 0 {
            return;
        }
        let root = tree.root();
        match tree.get(root) {
            Change::ValueAdded { value } => self.create_object(value),
            Change::ValueRemoved { value } => self.drop_object(value),
            Change::MultiChange { .. } => {
                if self.attr_change(root, "schemata").is_some() {
                    self.schemata(root);
                } else {
                    debug!("Change tree has no schema list changes");
                }
            }
            other => debug!(change = other.type_name(), "Unsupported root change"),
        }
    }

    /// Subchange of the named member under an object change
    fn attr_change(&self, object_change: ChangeId, attr: &str) -> Option<ChangeId> {
        let tree = self.tree;
        tree.children(object_change)
            .into_iter()
            .find(|c| tree.attr_name(*c) == Some(attr))
            .and_then(|c| tree.subchange(c))
    }

    fn changed_attrs(&self, object_change: ChangeId) -> Vec<&'a str> {
        let tree = self.tree;
        tree.children(object_change)
            .into_iter()
            .filter_map(|c| tree.attr_name(c))
            .collect()
    }

    fn list_items(&self, object_change: Option<ChangeId>, attr: &str) -> Vec<ListItem> {
        let tree = self.tree;
        let list = match object_change.and_then(|c| self.attr_change(c, attr)) {
            Some(list) => list,
            None => return Vec::new(),
        };
        tree.children(list)
            .into_iter()
            .filter_map(|item| match tree.get(item) {
                Change::ListItemAdded { value, .. } => Some(ListItem::Added(value.id.clone())),
                Change::ListItemRemoved { value, .. } => Some(ListItem::Removed(value.id.clone())),
                Change::ListItemModified { old, new, subchange, .. } => Some(ListItem::Altered {
                    old: old.id.clone(),
                    new: new.id.clone(),
                    change: Some(*subchange),
                    moved: false,
                }),
                Change::ListItemOrderChanged { old, new, subchange, .. } => Some(ListItem::Altered {
                    old: old.id.clone(),
                    new: new.id.clone(),
                    change: *subchange,
                    moved: true,
                }),
                _ => None,
            })
            .collect()
    }

    fn schemata(&mut self, root: ChangeId) {
        for item in self.list_items(Some(root), "schemata") {
            match item {
                ListItem::Added(id) => self.create_schema(&id),
                ListItem::Removed(id) => self.drop_schema(&id),
                ListItem::Altered {
                    new, change: Some(change), ..
                } => self.alter_schema(&new, change),
                ListItem::Altered { .. } => {}
            }
        }
    }

    fn create_object(&mut self, value: &ObjectRef) {
        let target = self.target;
        let id = &value.id;
        if !self.allowed(target, id) && value.kind != ObjectKind::Schema {
            return;
        }
        let dialect = self.dialect();
        match value.kind {
            ObjectKind::Schema => self.create_schema(id),
            ObjectKind::Table => {
                let sql = dialect.create_table(target, id, self.inline_foreign_keys());
                self.push(StatementClass::Create, target, id, sql);
                if self.separate_foreign_keys() {
                    let fks = target.tables.get(id).map(|t| t.foreign_keys.clone()).unwrap_or_default();
                    self.add_foreign_keys(id, &fks);
                }
                self.create_table_triggers(id);
            }
            ObjectKind::View => self.push(StatementClass::Create, target, id, dialect.create_view(target, id)),
            ObjectKind::Routine => self.push(StatementClass::Create, target, id, dialect.create_routine(target, id)),
            ObjectKind::Trigger => self.push(StatementClass::Create, target, id, dialect.create_trigger(target, id)),
            other => debug!(kind = %other, "No standalone DDL for added object"),
        }
    }

    fn drop_object(&mut self, value: &ObjectRef) {
        let source = self.source;
        let id = &value.id;
        if !self.allowed(source, id) {
            return;
        }
        let dialect = self.dialect();
        match value.kind {
            ObjectKind::Schema => self.drop_schema(id),
            ObjectKind::Table => self.push(StatementClass::Drop, source, id, dialect.drop_table(source, id)),
            ObjectKind::View => self.push(StatementClass::Drop, source, id, dialect.drop_view(source, id)),
            ObjectKind::Routine => self.push(StatementClass::Drop, source, id, dialect.drop_routine(source, id)),
            ObjectKind::Trigger => self.push(StatementClass::Drop, source, id, dialect.drop_trigger(source, id)),
            other => debug!(kind = %other, "No standalone DDL for removed object"),
        }
    }

    fn drop_schema(&mut self, id: &ObjectId) {
        let source = self.source;
        if self.options().generate_schema_drops && self.allowed(source, id) {
            let sql = self.dialect().drop_schema(source, id);
            self.push(StatementClass::Drop, source, id, sql);
        }
    }

    /// CREATE SCHEMA followed by everything it contains
    fn create_schema(&mut self, id: &ObjectId) {
        let target = self.target;
        let dialect = self.dialect();
        let schema = match target.schemas.get(id) {
            Some(schema) => schema,
            None => return,
        };
        if self.allowed(target, id) {
            self.push(StatementClass::Create, target, id, dialect.create_schema(target, id));
        }

        let tables: Vec<&ObjectId> = schema.tables.iter().filter(|t| self.allowed(target, t)).collect();
        let inline_fks = self.inline_foreign_keys();
        for table_id in &tables {
            let sql = dialect.create_table(target, table_id, inline_fks);
            self.push(StatementClass::Create, target, table_id, sql);
        }
        if self.separate_foreign_keys() {
            for table_id in &tables {
                let fks = target.tables.get(*table_id).map(|t| t.foreign_keys.clone()).unwrap_or_default();
                self.add_foreign_keys(table_id, &fks);
            }
        }
        for view_id in &schema.views {
            if self.allowed(target, view_id) {
                self.push(StatementClass::Create, target, view_id, dialect.create_view(target, view_id));
            }
        }
        for routine_id in &schema.routines {
            if self.allowed(target, routine_id) {
                self.push(StatementClass::Create, target, routine_id, dialect.create_routine(target, routine_id));
            }
        }
        for table_id in &tables {
            self.create_table_triggers(table_id);
        }
    }

    fn create_table_triggers(&mut self, table_id: &ObjectId) {
        let target = self.target;
        let triggers = match target.tables.get(table_id) {
            Some(table) => &table.triggers,
            None => return,
        };
        for trigger_id in triggers {
            if self.allowed(target, trigger_id) {
                let sql = self.dialect().create_trigger(target, trigger_id);
                self.push(StatementClass::Create, target, trigger_id, sql);
            }
        }
    }

    /// Foreign key definition for an ADD clause, `None` when it must be skipped
    fn foreign_key_clause(&self, catalog: &Catalog, fk_id: &ObjectId) -> Option<String> {
        let fk = catalog.foreign_keys.get(fk_id)?;
        if fk.model_only {
            debug!(fk = %fk.name, "Skipping model-only foreign key");
            return None;
        }
        let definition = self.dialect().foreign_key_definition(catalog, fk_id);
        if definition.is_none() {
            error!(fk = %fk.name, "Foreign key references a table that is not in the catalog; skipped");
        }
        definition
    }

    /// One ALTER TABLE adding the given foreign keys of a target table
    fn add_foreign_keys(&mut self, table_id: &ObjectId, fks: &[ObjectId]) {
        if self.options().skip_foreign_keys {
            return;
        }
        let target = self.target;
        let clauses: Vec<String> = fks
            .iter()
            .filter_map(|fk| self.foreign_key_clause(target, fk))
            .map(|definition| format!("ADD {}", definition))
            .collect();
        if clauses.is_empty() {
            return;
        }
        let sql = format!(
            "ALTER TABLE {} {}",
            self.dialect().object_name(target, table_id),
            clauses.join(",\n")
        );
        self.push(StatementClass::AddForeignKey, target, table_id, sql);
    }

    /// One ALTER TABLE dropping foreign keys, named after the source table
    fn drop_foreign_keys(&mut self, source_table: &ObjectId, fks: &[ObjectId], object_catalog: &Catalog, object: &ObjectId) {
        if self.options().skip_foreign_keys {
            return;
        }
        let source = self.source;
        let dialect = self.dialect();
        let clauses: Vec<String> = fks
            .iter()
            .filter(|fk| source.foreign_keys.get(*fk).map_or(false, |f| !f.model_only))
            .map(|fk| dialect.drop_foreign_key_clause(source, fk))
            .collect();
        if clauses.is_empty() {
            return;
        }
        let sql = format!(
            "ALTER TABLE {} {}",
            dialect.object_name(source, source_table),
            clauses.join(",\n")
        );
        self.push(StatementClass::DropForeignKey, object_catalog, object, sql);
    }

    fn alter_schema(&mut self, new: &ObjectId, change: ChangeId) {
        let source = self.source;
        let target = self.target;
        let dialect = self.dialect();

        let options_changed = self
            .changed_attrs(change)
            .iter()
            .any(|attr| matches!(*attr, "defaultCharacterSetName" | "defaultCollationName"));
        if options_changed && self.allowed(target, new) {
            self.push(StatementClass::Alter, target, new, dialect.alter_schema(target, new));
        }

        let table_items = self.list_items(Some(change), "tables");
        let mut removed = Vec::new();
        let mut added = Vec::new();
        let mut altered = Vec::new();
        // Trigger changes only answer to the trigger filter
        let mut trigger_changes = Vec::new();
        for item in table_items {
            if let ListItem::Altered { change: Some(change), .. } = &item {
                trigger_changes.push(*change);
            }
            match item {
                ListItem::Removed(id) if self.allowed(source, &id) => removed.push(id),
                ListItem::Added(id) if self.allowed(target, &id) => added.push(id),
                ListItem::Altered {
                    old,
                    new,
                    change: Some(change),
                    ..
                } if self.allowed(target, &new) => altered.push((old, new, change)),
                _ => {}
            }
        }

        for id in &removed {
            let fks = source.tables.get(id).map(|t| t.foreign_keys.clone()).unwrap_or_default();
            self.drop_foreign_keys(id, &fks, source, id);
        }
        for (old_table, new_table, table_change) in &altered {
            let fks: Vec<ObjectId> = self
                .list_items(Some(*table_change), "foreignKeys")
                .into_iter()
                .filter_map(|item| match item {
                    ListItem::Removed(id) => Some(id),
                    ListItem::Altered { old, change: Some(_), .. } => Some(old),
                    _ => None,
                })
                .collect();
            self.drop_foreign_keys(old_table, &fks, target, new_table);
        }

        for id in &removed {
            self.push(StatementClass::Drop, source, id, dialect.drop_table(source, id));
        }
        let inline_fks = self.inline_foreign_keys();
        for id in &added {
            self.push(StatementClass::Create, target, id, dialect.create_table(target, id, inline_fks));
        }
        let mut repartitions = Vec::new();
        for (old_table, new_table, table_change) in &altered {
            let statements = self.alter_table(old_table, new_table, *table_change);
            repartitions.push((new_table.clone(), statements));
        }

        if self.separate_foreign_keys() {
            for id in &added {
                let fks = target.tables.get(id).map(|t| t.foreign_keys.clone()).unwrap_or_default();
                self.add_foreign_keys(id, &fks);
            }
        }
        for (_, new_table, table_change) in &altered {
            let fks: Vec<ObjectId> = self
                .list_items(Some(*table_change), "foreignKeys")
                .into_iter()
                .filter_map(|item| match item {
                    ListItem::Added(id) => Some(id),
                    ListItem::Altered { new, change: Some(_), .. } => Some(new),
                    _ => None,
                })
                .collect();
            self.add_foreign_keys(new_table, &fks);
        }

        // Partition changes come last for each table
        for (table_id, statements) in repartitions {
            for sql in statements {
                self.push(StatementClass::Alter, target, &table_id, sql);
            }
        }

        self.alter_views(change);
        self.alter_routines(change);

        for id in &added {
            self.create_table_triggers(id);
        }
        for table_change in trigger_changes {
            self.alter_triggers(table_change);
        }
    }

    fn alter_views(&mut self, schema_change: ChangeId) {
        let source = self.source;
        let target = self.target;
        let dialect = self.dialect();
        let items = self.list_items(Some(schema_change), "views");

        for item in &items {
            if let ListItem::Removed(id) = item {
                if self.allowed(source, id) {
                    self.push(StatementClass::Drop, source, id, dialect.drop_view(source, id));
                }
            }
        }
        for item in &items {
            match item {
                ListItem::Added(id) if self.allowed(target, id) => {
                    self.push(StatementClass::Create, target, id, dialect.create_view(target, id));
                }
                ListItem::Altered {
                    old,
                    new,
                    change: Some(_),
                    ..
                } if self.allowed(target, new) => {
                    if source.name_of(old) != target.name_of(new) {
                        self.push(StatementClass::Drop, source, old, dialect.drop_view(source, old));
                    }
                    self.push(StatementClass::Create, target, new, dialect.create_view(target, new));
                }
                _ => {}
            }
        }
    }

    fn alter_routines(&mut self, schema_change: ChangeId) {
        let source = self.source;
        let target = self.target;
        let dialect = self.dialect();
        let items = self.list_items(Some(schema_change), "routines");

        for item in &items {
            if let ListItem::Removed(id) = item {
                if self.allowed(source, id) {
                    self.push(StatementClass::Drop, source, id, dialect.drop_routine(source, id));
                }
            }
        }
        for item in &items {
            if let ListItem::Altered {
                old,
                new,
                change: Some(_),
                ..
            } = item
            {
                if self.allowed(target, new) {
                    self.push(StatementClass::Drop, target, new, dialect.drop_routine(source, old));
                    self.push(StatementClass::Create, target, new, dialect.create_routine(target, new));
                }
            }
        }
        for item in &items {
            if let ListItem::Added(id) = item {
                if self.allowed(target, id) {
                    self.push(StatementClass::Create, target, id, dialect.create_routine(target, id));
                }
            }
        }
    }

    fn alter_triggers(&mut self, table_change: ChangeId) {
        let source = self.source;
        let target = self.target;
        let dialect = self.dialect();
        for item in self.list_items(Some(table_change), "triggers") {
            match item {
                ListItem::Removed(id) if self.allowed(source, &id) => {
                    self.push(StatementClass::Drop, source, &id, dialect.drop_trigger(source, &id));
                }
                ListItem::Altered {
                    old,
                    new,
                    change: Some(_),
                    ..
                } if self.allowed(target, &new) => {
                    self.push(StatementClass::Drop, target, &new, dialect.drop_trigger(source, &old));
                    self.push(StatementClass::Create, target, &new, dialect.create_trigger(target, &new));
                }
                ListItem::Added(id) if self.allowed(target, &id) => {
                    self.push(StatementClass::Create, target, &id, dialect.create_trigger(target, &id));
                }
                _ => {}
            }
        }
    }

    /// Index named like one of the table's foreign keys
    fn is_foreign_key_index(&self, catalog: &Catalog, index_id: &ObjectId) -> bool {
        let index = match catalog.indices.get(index_id) {
            Some(index) => index,
            None => return false,
        };
        catalog.tables.get(&index.owner).map_or(false, |table| {
            table.foreign_keys.iter().any(|fk| {
                catalog
                    .foreign_keys
                    .get(fk)
                    .map_or(false, |fk| fk.name.eq_ignore_ascii_case(&index.name))
            })
        })
    }

    /// Emit the rename and the ALTER TABLE of one table; returns the
    /// partition statements, which the caller emits after foreign keys
    fn alter_table(&mut self, old: &ObjectId, new: &ObjectId, change: ChangeId) -> Vec<String> {
        let source = self.source;
        let target = self.target;
        let dialect = self.dialect();
        let skip_fk_indexes = self.options().skip_fk_indexes;
        let attrs = self.changed_attrs(change);

        if attrs.contains(&"name") {
            let sql = format!(
                "RENAME TABLE {} TO {}",
                dialect.object_name(source, old),
                dialect.object_name(target, new)
            );
            self.push(StatementClass::Alter, target, new, sql);
        }

        let mut clauses = Vec::new();

        let index_items = self.list_items(Some(change), "indices");
        for item in &index_items {
            match item {
                ListItem::Removed(id) | ListItem::Altered { old: id, change: Some(_), .. } => {
                    if skip_fk_indexes && self.is_foreign_key_index(source, id) {
                        continue;
                    }
                    clauses.push(dialect.drop_index_clause(source, id));
                }
                _ => {}
            }
        }

        let column_items = self.list_items(Some(change), "columns");
        for item in &column_items {
            if let ListItem::Removed(id) = item {
                clauses.push(format!("DROP COLUMN {}", quote_identifier(&source.name_of(id))));
            }
        }

        // Added and moved columns are placed in target order
        let mut positioned: HashMap<&ObjectId, Option<&ObjectId>> = HashMap::new();
        for item in &column_items {
            match item {
                ListItem::Added(id) => {
                    positioned.insert(id, None);
                }
                ListItem::Altered {
                    old, new, moved: true, ..
                } => {
                    positioned.insert(new, Some(old));
                }
                _ => {}
            }
        }
        let target_columns = target.tables.get(new).map(|t| t.columns.clone()).unwrap_or_default();
        for (j, column_id) in target_columns.iter().enumerate() {
            let moved_from = match positioned.get(column_id) {
                Some(entry) => *entry,
                None => continue,
            };
            let position = if j == 0 {
                " FIRST".to_string()
            } else {
                format!(" AFTER {}", quote_identifier(&target.name_of(&target_columns[j - 1])))
            };
            let definition = dialect.column_definition(target, column_id);
            match moved_from {
                None if j + 1 == target_columns.len() => clauses.push(format!("ADD COLUMN {}", definition)),
                None => clauses.push(format!("ADD COLUMN {}{}", definition, position)),
                Some(old_column) => clauses.push(format!(
                    "CHANGE COLUMN {} {}{}",
                    quote_identifier(&source.name_of(old_column)),
                    definition,
                    position
                )),
            }
        }

        for item in &column_items {
            if let ListItem::Altered {
                old,
                new,
                change: Some(_),
                moved: false,
            } = item
            {
                clauses.push(format!(
                    "CHANGE COLUMN {} {}",
                    quote_identifier(&source.name_of(old)),
                    dialect.column_definition(target, new)
                ));
            }
        }

        for item in &index_items {
            match item {
                ListItem::Added(id) | ListItem::Altered { new: id, change: Some(_), .. } => {
                    if skip_fk_indexes && self.is_foreign_key_index(target, id) {
                        continue;
                    }
                    clauses.push(format!("ADD {}", dialect.index_definition(target, id)));
                }
                _ => {}
            }
        }

        if let Some(table) = target.tables.get(new) {
            for (attr, _) in TABLE_OPTIONS {
                if attrs.contains(attr) {
                    if let Some(option) = dialect.table_option(table, attr) {
                        clauses.push(option);
                    }
                }
            }
        }

        let table_name = dialect.object_name(target, new);
        if !clauses.is_empty() {
            let sql = format!("ALTER TABLE {} {}", table_name, clauses.join(",\n"));
            self.push(StatementClass::Alter, target, new, sql);
        }

        let partitioning_changed = attrs.iter().any(|attr| {
            matches!(
                *attr,
                "partitionType"
                    | "partitionExpression"
                    | "partitionCount"
                    | "subpartitionType"
                    | "subpartitionExpression"
                    | "subpartitionCount"
                    | "partitionDefinitions"
            )
        });
        if !partitioning_changed {
            return Vec::new();
        }
        match (source.tables.get(old), target.tables.get(new)) {
            (Some(old_table), Some(new_table)) => partition_clauses(source, old_table, target, new_table)
                .into_iter()
                .map(|clause| format!("ALTER TABLE {} {}", table_name, clause))
                .collect(),
            _ => Vec::new(),
        }
    }
}
