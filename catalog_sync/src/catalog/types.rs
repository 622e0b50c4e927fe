//! Type definitions for catalog objects
//!
//! Every object lives in a per-kind arena owned by the [`Catalog`] root.
//! Containment (`owner`, child lists) and references (foreign key targets,
//! index columns) are plain [`ObjectId`] values resolved through the arenas.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

use crate::catalog::datatype;
use crate::error::{Error, Result};

/// Stable opaque object identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Generate a fresh identity
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kinds of object a catalog holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Catalog,
    Schema,
    Table,
    Column,
    Index,
    IndexColumn,
    ForeignKey,
    Trigger,
    View,
    Routine,
    Partition,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Catalog => "catalog",
            ObjectKind::Schema => "schema",
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Index => "index",
            ObjectKind::IndexColumn => "index_column",
            ObjectKind::ForeignKey => "foreign_key",
            ObjectKind::Trigger => "trigger",
            ObjectKind::View => "view",
            ObjectKind::Routine => "routine",
            ObjectKind::Partition => "partition",
        }
    }

    /// Kinds that get their own node in a diff tree
    pub fn is_node_object(&self) -> bool {
        matches!(
            self,
            ObjectKind::Schema
                | ObjectKind::Table
                | ObjectKind::View
                | ObjectKind::Routine
                | ObjectKind::Trigger
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed handle on a catalog object, carrying its name for diagnostics
///
/// Equality and hashing only look at kind and id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: ObjectId,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            name: name.into(),
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

/// Represents a schema (database)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub default_charset: String,
    pub default_collation: String,
    pub comment: String,
    pub tables: Vec<ObjectId>,
    pub views: Vec<ObjectId>,
    pub routines: Vec<ObjectId>,
}

impl Schema {
    /// Create a new schema with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn charset(mut self, charset: &str, collation: &str) -> Self {
        self.default_charset = charset.to_string();
        self.default_collation = collation.to_string();
        self
    }
}

/// Represents a table together with its table options and partitioning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub engine: String,
    pub next_auto_inc: String,
    pub password: String,
    pub delay_key_write: i64,
    pub default_charset: String,
    pub default_collation: String,
    pub merge_union: String,
    pub merge_insert: String,
    pub pack_keys: String,
    pub checksum: i64,
    pub comment: String,
    pub row_format: String,
    pub key_block_size: String,
    pub avg_row_length: String,
    pub min_rows: String,
    pub max_rows: String,
    pub connection_string: String,
    pub partition_type: String,
    pub partition_expression: String,
    pub partition_count: i64,
    pub subpartition_type: String,
    pub subpartition_expression: String,
    pub subpartition_count: i64,
    pub columns: Vec<ObjectId>,
    pub indices: Vec<ObjectId>,
    pub foreign_keys: Vec<ObjectId>,
    pub triggers: Vec<ObjectId>,
    pub partitions: Vec<ObjectId>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn engine(mut self, engine: &str) -> Self {
        self.engine = engine.to_string();
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    /// Set the partitioning scheme (`HASH`, `KEY`, `RANGE`, `LIST`, optionally `LINEAR ...`)
    pub fn partitioned(mut self, partition_type: &str, expression: &str, count: i64) -> Self {
        self.partition_type = partition_type.to_string();
        self.partition_expression = expression.to_string();
        self.partition_count = count;
        self
    }
}

/// Represents a column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub simple_type: String,
    pub length: i64,
    pub precision: i64,
    pub scale: i64,
    pub explicit_params: String,
    pub flags: Vec<String>,
    pub not_null: bool,
    pub auto_increment: bool,
    pub default_value: String,
    pub default_value_is_null: bool,
    pub charset: String,
    pub collation: String,
    pub comment: String,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            id: ObjectId::new(),
            owner: ObjectId::default(),
            name: String::new(),
            old_name: String::new(),
            simple_type: String::new(),
            length: -1,
            precision: -1,
            scale: -1,
            explicit_params: String::new(),
            flags: Vec::new(),
            not_null: false,
            auto_increment: false,
            default_value: String::new(),
            default_value_is_null: false,
            charset: String::new(),
            collation: String::new(),
            comment: String::new(),
        }
    }
}

impl Column {
    /// Create a new column from a textual type such as `VARCHAR(45)` or `INT UNSIGNED`
    pub fn new(name: &str, data_type: &str) -> Self {
        let parsed = datatype::parse_type(data_type);
        Self {
            name: name.to_string(),
            simple_type: parsed.simple_type,
            length: parsed.length,
            precision: parsed.precision,
            scale: parsed.scale,
            explicit_params: parsed.explicit_params,
            flags: parsed.flags,
            ..Default::default()
        }
    }

    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default_value = value.to_string();
        self
    }

    pub fn charset(mut self, charset: &str, collation: &str) -> Self {
        self.charset = charset.to_string();
        self.collation = collation.to_string();
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn flag(mut self, flag: &str) -> Self {
        let flag = flag.to_uppercase();
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    /// Rebuild the textual type
    pub fn formatted_type(&self) -> String {
        datatype::format_type(self)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }
}

/// Represents an index (primary key, unique key, plain index, fulltext, spatial)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub index_type: String,
    pub index_kind: String,
    pub key_block_size: i64,
    pub with_parser: String,
    pub comment: String,
    pub columns: Vec<ObjectId>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            id: ObjectId::new(),
            owner: ObjectId::default(),
            name: String::new(),
            old_name: String::new(),
            index_type: "INDEX".to_string(),
            index_kind: String::new(),
            key_block_size: 0,
            with_parser: String::new(),
            comment: String::new(),
            columns: Vec::new(),
        }
    }
}

impl Index {
    /// Create a new index of the given type (`PRIMARY`, `UNIQUE`, `INDEX`, `FULLTEXT`, `SPATIAL`)
    pub fn new(name: &str, index_type: &str) -> Self {
        Self {
            name: name.to_string(),
            index_type: index_type.to_uppercase(),
            ..Default::default()
        }
    }

    pub fn is_primary(&self) -> bool {
        self.index_type.eq_ignore_ascii_case("PRIMARY")
    }
}

/// One column entry of an index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexColumn {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub column: Option<ObjectId>,
    pub descend: bool,
    pub column_length: i64,
}

/// Represents a foreign key constraint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKey {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub columns: Vec<ObjectId>,
    pub referenced_table: Option<ObjectId>,
    pub referenced_columns: Vec<ObjectId>,
    pub delete_rule: String,
    pub update_rule: String,
    pub model_only: bool,
    pub comment: String,
}

impl ForeignKey {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn rules(mut self, delete_rule: &str, update_rule: &str) -> Self {
        self.delete_rule = delete_rule.to_string();
        self.update_rule = update_rule.to_string();
        self
    }
}

/// Represents a trigger attached to a table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trigger {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub timing: String,
    pub event: String,
    pub sql_definition: String,
    pub definer: String,
    pub enabled: bool,
}

impl Trigger {
    pub fn new(name: &str, timing: &str, event: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            timing: timing.to_uppercase(),
            event: event.to_uppercase(),
            sql_definition: body.to_string(),
            enabled: true,
            ..Default::default()
        }
    }
}

/// Represents a view
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct View {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub sql_definition: String,
    pub definer: String,
    pub algorithm: String,
    pub with_check_condition: bool,
    pub old_model_sql_definition: String,
    pub old_server_sql_definition: String,
}

impl View {
    pub fn new(name: &str, select: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_definition: select.to_string(),
            ..Default::default()
        }
    }
}

/// Represents a stored procedure or function
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Routine {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub routine_type: String,
    pub sql_definition: String,
    pub definer: String,
    pub comment: String,
}

impl Routine {
    pub fn new(name: &str, routine_type: &str, definition: &str) -> Self {
        Self {
            name: name.to_string(),
            routine_type: routine_type.to_uppercase(),
            sql_definition: definition.to_string(),
            ..Default::default()
        }
    }
}

/// One partition definition of a partitioned table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partition {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub value: String,
    pub comment: String,
    pub engine: String,
    pub max_rows: String,
    pub min_rows: String,
}

impl Partition {
    /// Create a partition definition; `value` is the bound expression, e.g. `LESS THAN (10)`
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            ..Default::default()
        }
    }
}

/// The root container of one schema snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub id: ObjectId,
    pub name: String,
    pub default_charset: String,
    pub default_collation: String,
    pub schemata: Vec<ObjectId>,
    pub schemas: IndexMap<ObjectId, Schema>,
    pub tables: IndexMap<ObjectId, Table>,
    pub columns: IndexMap<ObjectId, Column>,
    pub indices: IndexMap<ObjectId, Index>,
    pub index_columns: IndexMap<ObjectId, IndexColumn>,
    pub foreign_keys: IndexMap<ObjectId, ForeignKey>,
    pub triggers: IndexMap<ObjectId, Trigger>,
    pub views: IndexMap<ObjectId, View>,
    pub routines: IndexMap<ObjectId, Routine>,
    pub partitions: IndexMap<ObjectId, Partition>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a schema to the catalog
    pub fn add_schema(&mut self, mut schema: Schema) -> ObjectId {
        schema.owner = self.id.clone();
        let id = schema.id.clone();
        self.schemata.push(id.clone());
        self.schemas.insert(id.clone(), schema);
        id
    }

    /// Add a table to a schema
    pub fn add_table(&mut self, schema_id: &ObjectId, mut table: Table) -> Result<ObjectId> {
        let schema = self
            .schemas
            .get_mut(schema_id)
            .ok_or_else(|| Error::usage(format!("Unknown schema {}", schema_id)))?;
        table.owner = schema_id.clone();
        let id = table.id.clone();
        schema.tables.push(id.clone());
        self.tables.insert(id.clone(), table);
        Ok(id)
    }

    /// Add a column to a table
    pub fn add_column(&mut self, table_id: &ObjectId, mut column: Column) -> Result<ObjectId> {
        let table = self
            .tables
            .get_mut(table_id)
            .ok_or_else(|| Error::usage(format!("Unknown table {}", table_id)))?;
        column.owner = table_id.clone();
        let id = column.id.clone();
        table.columns.push(id.clone());
        self.columns.insert(id.clone(), column);
        Ok(id)
    }

    /// Insert a column at a position of the table's column list
    pub fn insert_column(&mut self, table_id: &ObjectId, position: usize, column: Column) -> Result<ObjectId> {
        let id = self.add_column(table_id, column)?;
        if let Some(table) = self.tables.get_mut(table_id) {
            table.columns.pop();
            let position = position.min(table.columns.len());
            table.columns.insert(position, id.clone());
        }
        Ok(id)
    }

    /// Add an index whose columns are looked up by name in the owning table
    pub fn add_index(&mut self, table_id: &ObjectId, mut index: Index, column_names: &[&str]) -> Result<ObjectId> {
        if !self.tables.contains_key(table_id) {
            return Err(Error::usage(format!("Unknown table {}", table_id)));
        }
        index.owner = table_id.clone();
        index.columns.clear();
        let index_id = index.id.clone();

        for column_name in column_names {
            let column = self.find_column(table_id, column_name).ok_or_else(|| {
                Error::usage(format!("Index {} references unknown column {}", index.name, column_name))
            })?;
            let index_column = IndexColumn {
                owner: index_id.clone(),
                column: Some(column),
                ..Default::default()
            };
            index.columns.push(index_column.id.clone());
            self.index_columns.insert(index_column.id.clone(), index_column);
        }

        if let Some(table) = self.tables.get_mut(table_id) {
            table.indices.push(index_id.clone());
        }
        self.indices.insert(index_id.clone(), index);
        Ok(index_id)
    }

    /// Add a foreign key, resolving column names in the owning and referenced tables
    pub fn add_foreign_key(
        &mut self,
        table_id: &ObjectId,
        mut fk: ForeignKey,
        columns: &[&str],
        referenced_table: &ObjectId,
        referenced_columns: &[&str],
    ) -> Result<ObjectId> {
        if !self.tables.contains_key(referenced_table) {
            return Err(Error::usage(format!("Unknown referenced table {}", referenced_table)));
        }
        fk.columns = self.resolve_columns(table_id, columns)?;
        fk.referenced_columns = self.resolve_columns(referenced_table, referenced_columns)?;
        fk.referenced_table = Some(referenced_table.clone());
        self.add_foreign_key_raw(table_id, fk)
    }

    /// Add a foreign key whose references are already set
    pub fn add_foreign_key_raw(&mut self, table_id: &ObjectId, mut fk: ForeignKey) -> Result<ObjectId> {
        let table = self
            .tables
            .get_mut(table_id)
            .ok_or_else(|| Error::usage(format!("Unknown table {}", table_id)))?;
        fk.owner = table_id.clone();
        let id = fk.id.clone();
        table.foreign_keys.push(id.clone());
        self.foreign_keys.insert(id.clone(), fk);
        Ok(id)
    }

    /// Add a trigger to a table
    pub fn add_trigger(&mut self, table_id: &ObjectId, mut trigger: Trigger) -> Result<ObjectId> {
        let table = self
            .tables
            .get_mut(table_id)
            .ok_or_else(|| Error::usage(format!("Unknown table {}", table_id)))?;
        trigger.owner = table_id.clone();
        let id = trigger.id.clone();
        table.triggers.push(id.clone());
        self.triggers.insert(id.clone(), trigger);
        Ok(id)
    }

    /// Add a partition definition to a table
    pub fn add_partition(&mut self, table_id: &ObjectId, mut partition: Partition) -> Result<ObjectId> {
        let table = self
            .tables
            .get_mut(table_id)
            .ok_or_else(|| Error::usage(format!("Unknown table {}", table_id)))?;
        partition.owner = table_id.clone();
        let id = partition.id.clone();
        table.partitions.push(id.clone());
        self.partitions.insert(id.clone(), partition);
        Ok(id)
    }

    /// Add a view to a schema
    pub fn add_view(&mut self, schema_id: &ObjectId, mut view: View) -> Result<ObjectId> {
        let schema = self
            .schemas
            .get_mut(schema_id)
            .ok_or_else(|| Error::usage(format!("Unknown schema {}", schema_id)))?;
        view.owner = schema_id.clone();
        let id = view.id.clone();
        schema.views.push(id.clone());
        self.views.insert(id.clone(), view);
        Ok(id)
    }

    /// Add a routine to a schema
    pub fn add_routine(&mut self, schema_id: &ObjectId, mut routine: Routine) -> Result<ObjectId> {
        let schema = self
            .schemas
            .get_mut(schema_id)
            .ok_or_else(|| Error::usage(format!("Unknown schema {}", schema_id)))?;
        routine.owner = schema_id.clone();
        let id = routine.id.clone();
        schema.routines.push(id.clone());
        self.routines.insert(id.clone(), routine);
        Ok(id)
    }

    fn resolve_columns(&self, table_id: &ObjectId, names: &[&str]) -> Result<Vec<ObjectId>> {
        names
            .iter()
            .map(|name| {
                self.find_column(table_id, name)
                    .ok_or_else(|| Error::usage(format!("Unknown column {} in table {}", name, table_id)))
            })
            .collect()
    }

    /// Find a schema by name
    pub fn find_schema(&self, name: &str) -> Option<ObjectId> {
        self.schemata
            .iter()
            .find(|id| self.schemas.get(*id).map_or(false, |s| s.name == name))
            .cloned()
    }

    /// Find a table by name inside a schema
    pub fn find_table(&self, schema_id: &ObjectId, name: &str) -> Option<ObjectId> {
        let schema = self.schemas.get(schema_id)?;
        schema
            .tables
            .iter()
            .find(|id| self.tables.get(*id).map_or(false, |t| t.name == name))
            .cloned()
    }

    /// Find a column by name (case insensitive) inside a table
    pub fn find_column(&self, table_id: &ObjectId, name: &str) -> Option<ObjectId> {
        let table = self.tables.get(table_id)?;
        table
            .columns
            .iter()
            .find(|id| {
                self.columns
                    .get(*id)
                    .map_or(false, |c| c.name.eq_ignore_ascii_case(name))
            })
            .cloned()
    }

    pub fn find_index(&self, table_id: &ObjectId, name: &str) -> Option<ObjectId> {
        let table = self.tables.get(table_id)?;
        table
            .indices
            .iter()
            .find(|id| self.indices.get(*id).map_or(false, |i| i.name == name))
            .cloned()
    }

    pub fn find_foreign_key(&self, table_id: &ObjectId, name: &str) -> Option<ObjectId> {
        let table = self.tables.get(table_id)?;
        table
            .foreign_keys
            .iter()
            .find(|id| self.foreign_keys.get(*id).map_or(false, |f| f.name == name))
            .cloned()
    }

    /// Look up a table by schema and table name
    pub fn table_by_name(&self, schema: &str, table: &str) -> Option<&Table> {
        let schema_id = self.find_schema(schema)?;
        let table_id = self.find_table(&schema_id, table)?;
        self.tables.get(&table_id)
    }

    /// Names of a table's columns in declaration order
    pub fn column_names(&self, table_id: &ObjectId) -> Vec<String> {
        self.tables
            .get(table_id)
            .map(|t| {
                t.columns
                    .iter()
                    .filter_map(|c| self.columns.get(c).map(|c| c.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Determine which arena holds an id
    pub fn kind_of(&self, id: &ObjectId) -> Option<ObjectKind> {
        if *id == self.id {
            Some(ObjectKind::Catalog)
        } else if self.schemas.contains_key(id) {
            Some(ObjectKind::Schema)
        } else if self.tables.contains_key(id) {
            Some(ObjectKind::Table)
        } else if self.columns.contains_key(id) {
            Some(ObjectKind::Column)
        } else if self.indices.contains_key(id) {
            Some(ObjectKind::Index)
        } else if self.index_columns.contains_key(id) {
            Some(ObjectKind::IndexColumn)
        } else if self.foreign_keys.contains_key(id) {
            Some(ObjectKind::ForeignKey)
        } else if self.triggers.contains_key(id) {
            Some(ObjectKind::Trigger)
        } else if self.views.contains_key(id) {
            Some(ObjectKind::View)
        } else if self.routines.contains_key(id) {
            Some(ObjectKind::Routine)
        } else if self.partitions.contains_key(id) {
            Some(ObjectKind::Partition)
        } else {
            None
        }
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.kind_of(id).is_some()
    }

    /// Build a typed handle for an id
    pub fn object_ref(&self, id: &ObjectId) -> Option<ObjectRef> {
        let kind = self.kind_of(id)?;
        Some(ObjectRef::new(kind, id.clone(), self.name_of(id)))
    }

    /// Current name of an object; index columns report their column's name
    pub fn name_of(&self, id: &ObjectId) -> String {
        match self.kind_of(id) {
            Some(ObjectKind::Catalog) => self.name.clone(),
            Some(ObjectKind::Schema) => self.schemas[id].name.clone(),
            Some(ObjectKind::Table) => self.tables[id].name.clone(),
            Some(ObjectKind::Column) => self.columns[id].name.clone(),
            Some(ObjectKind::Index) => self.indices[id].name.clone(),
            Some(ObjectKind::IndexColumn) => self.index_columns[id]
                .column
                .as_ref()
                .and_then(|c| self.columns.get(c))
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            Some(ObjectKind::ForeignKey) => self.foreign_keys[id].name.clone(),
            Some(ObjectKind::Trigger) => self.triggers[id].name.clone(),
            Some(ObjectKind::View) => self.views[id].name.clone(),
            Some(ObjectKind::Routine) => self.routines[id].name.clone(),
            Some(ObjectKind::Partition) => self.partitions[id].name.clone(),
            None => String::new(),
        }
    }

    /// Old name of an object, empty for kinds that do not track one
    pub fn old_name_of(&self, id: &ObjectId) -> String {
        match self.kind_of(id) {
            Some(ObjectKind::Schema) => self.schemas[id].old_name.clone(),
            Some(ObjectKind::Table) => self.tables[id].old_name.clone(),
            Some(ObjectKind::Column) => self.columns[id].old_name.clone(),
            Some(ObjectKind::Index) => self.indices[id].old_name.clone(),
            Some(ObjectKind::ForeignKey) => self.foreign_keys[id].old_name.clone(),
            Some(ObjectKind::Trigger) => self.triggers[id].old_name.clone(),
            Some(ObjectKind::View) => self.views[id].old_name.clone(),
            Some(ObjectKind::Routine) => self.routines[id].old_name.clone(),
            _ => String::new(),
        }
    }

    /// Set the old name of an object; kinds without one are ignored
    pub fn set_old_name(&mut self, id: &ObjectId, old_name: &str) {
        let old_name = old_name.to_string();
        if let Some(o) = self.schemas.get_mut(id) {
            o.old_name = old_name;
        } else if let Some(o) = self.tables.get_mut(id) {
            o.old_name = old_name;
        } else if let Some(o) = self.columns.get_mut(id) {
            o.old_name = old_name;
        } else if let Some(o) = self.indices.get_mut(id) {
            o.old_name = old_name;
        } else if let Some(o) = self.foreign_keys.get_mut(id) {
            o.old_name = old_name;
        } else if let Some(o) = self.triggers.get_mut(id) {
            o.old_name = old_name;
        } else if let Some(o) = self.views.get_mut(id) {
            o.old_name = old_name;
        } else if let Some(o) = self.routines.get_mut(id) {
            o.old_name = old_name;
        }
    }

    /// Owner of an object; the catalog itself has none
    pub fn owner_of(&self, id: &ObjectId) -> Option<ObjectId> {
        match self.kind_of(id)? {
            ObjectKind::Catalog => None,
            ObjectKind::Schema => Some(self.schemas[id].owner.clone()),
            ObjectKind::Table => Some(self.tables[id].owner.clone()),
            ObjectKind::Column => Some(self.columns[id].owner.clone()),
            ObjectKind::Index => Some(self.indices[id].owner.clone()),
            ObjectKind::IndexColumn => Some(self.index_columns[id].owner.clone()),
            ObjectKind::ForeignKey => Some(self.foreign_keys[id].owner.clone()),
            ObjectKind::Trigger => Some(self.triggers[id].owner.clone()),
            ObjectKind::View => Some(self.views[id].owner.clone()),
            ObjectKind::Routine => Some(self.routines[id].owner.clone()),
            ObjectKind::Partition => Some(self.partitions[id].owner.clone()),
        }
    }

    /// Walk the owner chain up to the schema containing an object
    pub fn schema_of(&self, id: &ObjectId) -> Option<&Schema> {
        let mut current = id.clone();
        loop {
            if let Some(schema) = self.schemas.get(&current) {
                return Some(schema);
            }
            current = self.owner_of(&current)?;
        }
    }

    /// Walk the owner chain up to the table containing an object
    pub fn table_of(&self, id: &ObjectId) -> Option<&Table> {
        let mut current = id.clone();
        loop {
            if let Some(table) = self.tables.get(&current) {
                return Some(table);
            }
            current = self.owner_of(&current)?;
        }
    }

    fn set_owner(&mut self, id: &ObjectId, owner: &ObjectId) {
        let owner = owner.clone();
        if let Some(o) = self.schemas.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.tables.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.columns.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.indices.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.index_columns.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.foreign_keys.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.triggers.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.views.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.routines.get_mut(id) {
            o.owner = owner;
        } else if let Some(o) = self.partitions.get_mut(id) {
            o.owner = owner;
        }
    }

    /// Direct owned children of an object, in member order
    pub fn children_of(&self, id: &ObjectId) -> Vec<ObjectId> {
        match self.kind_of(id) {
            Some(ObjectKind::Catalog) => self.schemata.clone(),
            Some(ObjectKind::Schema) => {
                let s = &self.schemas[id];
                s.tables.iter().chain(&s.views).chain(&s.routines).cloned().collect()
            }
            Some(ObjectKind::Table) => {
                let t = &self.tables[id];
                t.columns
                    .iter()
                    .chain(&t.indices)
                    .chain(&t.foreign_keys)
                    .chain(&t.triggers)
                    .chain(&t.partitions)
                    .cloned()
                    .collect()
            }
            Some(ObjectKind::Index) => self.indices[id].columns.clone(),
            _ => Vec::new(),
        }
    }

    /// Collect an object and everything nested under it, depth first
    pub fn subtree_ids(&self, id: &ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let children = self.children_of(&current);
            out.push(current);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Remove an object from its owner's list and drop its whole subtree
    ///
    /// Returns every removed id. References held by other objects are left
    /// untouched; callers reconcile them.
    pub fn remove_object(&mut self, id: &ObjectId) -> Vec<ObjectId> {
        if *id == self.id || !self.contains(id) {
            return Vec::new();
        }
        if let Some(owner) = self.owner_of(id) {
            self.detach_from_owner(&owner, id);
        }

        let removed = self.subtree_ids(id);
        for removed_id in &removed {
            self.schemas.shift_remove(removed_id);
            self.tables.shift_remove(removed_id);
            self.columns.shift_remove(removed_id);
            self.indices.shift_remove(removed_id);
            self.index_columns.shift_remove(removed_id);
            self.foreign_keys.shift_remove(removed_id);
            self.triggers.shift_remove(removed_id);
            self.views.shift_remove(removed_id);
            self.routines.shift_remove(removed_id);
            self.partitions.shift_remove(removed_id);
        }
        removed
    }

    fn detach_from_owner(&mut self, owner: &ObjectId, id: &ObjectId) {
        let strip = |list: &mut Vec<ObjectId>| list.retain(|c| c != id);
        if *owner == self.id {
            strip(&mut self.schemata);
        } else if let Some(s) = self.schemas.get_mut(owner) {
            strip(&mut s.tables);
            strip(&mut s.views);
            strip(&mut s.routines);
        } else if let Some(t) = self.tables.get_mut(owner) {
            strip(&mut t.columns);
            strip(&mut t.indices);
            strip(&mut t.foreign_keys);
            strip(&mut t.triggers);
            strip(&mut t.partitions);
        } else if let Some(i) = self.indices.get_mut(owner) {
            strip(&mut i.columns);
        }
    }

    /// Deep-copy an object subtree from another catalog under `new_owner`
    ///
    /// The copies get fresh ids and are not linked into any owner list; the
    /// caller places the returned root id. References inside the subtree are
    /// redirected to the copies, references leaving it keep their source ids.
    /// Returns the new root id and the source-to-copy id mapping.
    pub fn copy_subtree_from(
        &mut self,
        source: &Catalog,
        id: &ObjectId,
        new_owner: &ObjectId,
    ) -> Result<(ObjectId, HashMap<ObjectId, ObjectId>)> {
        if !source.contains(id) {
            return Err(Error::usage(format!("Object {} is not part of the source catalog", id)));
        }
        let mut mapping = HashMap::new();
        for source_id in source.subtree_ids(id) {
            mapping.insert(source_id, ObjectId::new());
        }
        let remap = |id: &ObjectId| mapping.get(id).cloned().unwrap_or_else(|| id.clone());
        let remap_list = |ids: &Vec<ObjectId>| ids.iter().map(|i| remap(i)).collect::<Vec<_>>();

        for source_id in source.subtree_ids(id) {
            let new_id = remap(&source_id);
            let owner = if source_id == *id {
                new_owner.clone()
            } else {
                source.owner_of(&source_id).map(|o| remap(&o)).unwrap_or_default()
            };

            if let Some(o) = source.schemas.get(&source_id) {
                let mut o = o.clone();
                o.tables = remap_list(&o.tables);
                o.views = remap_list(&o.views);
                o.routines = remap_list(&o.routines);
                o.id = new_id.clone();
                self.schemas.insert(new_id.clone(), o);
            } else if let Some(o) = source.tables.get(&source_id) {
                let mut o = o.clone();
                o.columns = remap_list(&o.columns);
                o.indices = remap_list(&o.indices);
                o.foreign_keys = remap_list(&o.foreign_keys);
                o.triggers = remap_list(&o.triggers);
                o.partitions = remap_list(&o.partitions);
                o.id = new_id.clone();
                self.tables.insert(new_id.clone(), o);
            } else if let Some(o) = source.columns.get(&source_id) {
                let mut o = o.clone();
                o.id = new_id.clone();
                self.columns.insert(new_id.clone(), o);
            } else if let Some(o) = source.indices.get(&source_id) {
                let mut o = o.clone();
                o.columns = remap_list(&o.columns);
                o.id = new_id.clone();
                self.indices.insert(new_id.clone(), o);
            } else if let Some(o) = source.index_columns.get(&source_id) {
                let mut o = o.clone();
                o.column = o.column.as_ref().map(|c| remap(c));
                o.id = new_id.clone();
                self.index_columns.insert(new_id.clone(), o);
            } else if let Some(o) = source.foreign_keys.get(&source_id) {
                let mut o = o.clone();
                o.columns = remap_list(&o.columns);
                o.referenced_table = o.referenced_table.as_ref().map(|t| remap(t));
                o.referenced_columns = remap_list(&o.referenced_columns);
                o.id = new_id.clone();
                self.foreign_keys.insert(new_id.clone(), o);
            } else if let Some(o) = source.triggers.get(&source_id) {
                let mut o = o.clone();
                o.id = new_id.clone();
                self.triggers.insert(new_id.clone(), o);
            } else if let Some(o) = source.views.get(&source_id) {
                let mut o = o.clone();
                o.id = new_id.clone();
                self.views.insert(new_id.clone(), o);
            } else if let Some(o) = source.routines.get(&source_id) {
                let mut o = o.clone();
                o.id = new_id.clone();
                self.routines.insert(new_id.clone(), o);
            } else if let Some(o) = source.partitions.get(&source_id) {
                let mut o = o.clone();
                o.id = new_id.clone();
                self.partitions.insert(new_id.clone(), o);
            }
            self.set_owner(&new_id, &owner);
        }

        let root = remap(id);
        Ok((root, mapping))
    }

    /// Every foreign key id in catalog order
    pub fn all_foreign_keys(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        for schema_id in &self.schemata {
            if let Some(schema) = self.schemas.get(schema_id) {
                for table_id in &schema.tables {
                    if let Some(table) = self.tables.get(table_id) {
                        out.extend(table.foreign_keys.iter().cloned());
                    }
                }
            }
        }
        out
    }
}
