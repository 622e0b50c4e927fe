//! YAML/JSON catalog documents
//!
//! A catalog document names everything by name; loading resolves the names
//! into ids. Foreign keys pointing at tables that do not exist are kept with
//! an unset referenced table so later stages can report them.
//!
//! Every named object may carry an `id`. Ids given in the document are kept
//! and written back on save; sync profiles refer to objects by these ids.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::catalog::types::{
    Catalog, Column, ForeignKey, Index, IndexColumn, ObjectId, Partition, Routine, Schema, Table,
    Trigger, View,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDocument {
    /// Persistent object id; assigned on load when absent
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_charset: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_collation: String,
    pub schemata: Vec<SchemaDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_charset: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_collation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    pub tables: Vec<TableDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<ViewDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routines: Vec<RoutineDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub engine: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_charset: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_collation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub row_format: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pack_keys: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_block_size: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub min_rows: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub max_rows: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub avg_row_length: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_auto_inc: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub merge_union: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub merge_insert: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub connection_string: String,
    pub checksum: i64,
    pub delay_key_write: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitioning: Option<PartitioningDocument>,
    pub columns: Vec<ColumnDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<IndexDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeyDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<TriggerDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub not_null: bool,
    pub auto_increment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub charset: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub collation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexColumnDocument {
    Name(String),
    Detailed {
        column: String,
        #[serde(default)]
        descend: bool,
        #[serde(default)]
        length: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_name: String,
    #[serde(rename = "type")]
    pub index_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    pub columns: Vec<IndexColumnDocument>,
}

impl Default for IndexDocument {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            old_name: String::new(),
            index_type: "INDEX".to_string(),
            kind: String::new(),
            comment: String::new(),
            columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_name: String,
    pub columns: Vec<String>,
    /// `table` in the same schema or `schema.table`
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub on_delete: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub on_update: String,
    pub model_only: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_name: String,
    pub timing: String,
    pub event: String,
    pub definition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub definer: String,
    pub enabled: bool,
}

impl Default for TriggerDocument {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            old_name: String::new(),
            timing: "BEFORE".to_string(),
            event: "INSERT".to_string(),
            definition: String::new(),
            definer: String::new(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_name: String,
    pub definition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub definer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub algorithm: String,
    pub with_check_condition: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_name: String,
    #[serde(rename = "type")]
    pub routine_type: String,
    pub definition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub definer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitioningDocument {
    #[serde(rename = "type")]
    pub partition_type: String,
    pub expression: String,
    pub count: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subpartition_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subpartition_expression: String,
    pub subpartition_count: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<PartitionDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionDocument {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub engine: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub max_rows: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub min_rows: String,
}

/// Load a catalog from a `.json`, `.yaml` or `.yml` file
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Document(format!("Failed to read {}: {}", path.display(), e)))?;
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_catalog_json(&text)
    } else {
        parse_catalog_yaml(&text)
    }
}

/// Write a catalog as YAML (or JSON for `.json` paths)
pub fn save_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    let document = CatalogDocument::from_catalog(catalog);
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    let text = if is_json {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_yaml::to_string(&document)?
    };
    fs::write(path, text)?;
    Ok(())
}

pub fn parse_catalog_yaml(text: &str) -> Result<Catalog> {
    let document: CatalogDocument = serde_yaml::from_str(text)?;
    document.into_catalog()
}

pub fn parse_catalog_json(text: &str) -> Result<Catalog> {
    let document: CatalogDocument = serde_json::from_str(text)?;
    document.into_catalog()
}

impl CatalogDocument {
    /// Resolve names into a catalog
    pub fn into_catalog(self) -> Result<Catalog> {
        let mut catalog = Catalog::new(&self.name);
        if !self.id.is_empty() {
            catalog.id = ObjectId::from(self.id.as_str());
        }
        catalog.default_charset = self.default_charset.clone();
        catalog.default_collation = self.default_collation.clone();

        // Foreign keys are resolved once every table exists
        let mut pending_fks: Vec<(ObjectId, String, ForeignKeyDocument)> = Vec::new();

        for schema_doc in self.schemata {
            let mut schema = Schema::new(&schema_doc.name).charset(&schema_doc.default_charset, &schema_doc.default_collation);
            schema.old_name = schema_doc.old_name;
            schema.comment = schema_doc.comment;
            if let Some(id) = document_id(&catalog, &schema_doc.id)? {
                schema.id = id;
            }
            let schema_id = catalog.add_schema(schema);

            for table_doc in schema_doc.tables {
                let table_id = load_table(&mut catalog, &schema_id, &table_doc)?;
                for fk in table_doc.foreign_keys {
                    pending_fks.push((table_id.clone(), schema_doc.name.clone(), fk));
                }
            }

            for view_doc in schema_doc.views {
                let mut view = View::new(&view_doc.name, &view_doc.definition);
                view.old_name = view_doc.old_name;
                view.definer = view_doc.definer;
                view.algorithm = view_doc.algorithm;
                view.with_check_condition = view_doc.with_check_condition;
                if let Some(id) = document_id(&catalog, &view_doc.id)? {
                    view.id = id;
                }
                catalog.add_view(&schema_id, view)?;
            }

            for routine_doc in schema_doc.routines {
                let mut routine = Routine::new(&routine_doc.name, &routine_doc.routine_type, &routine_doc.definition);
                routine.old_name = routine_doc.old_name;
                routine.definer = routine_doc.definer;
                routine.comment = routine_doc.comment;
                if let Some(id) = document_id(&catalog, &routine_doc.id)? {
                    routine.id = id;
                }
                catalog.add_routine(&schema_id, routine)?;
            }
        }

        for (table_id, schema_name, fk_doc) in pending_fks {
            load_foreign_key(&mut catalog, &table_id, &schema_name, fk_doc)?;
        }

        Ok(catalog)
    }

    /// Describe a catalog by name
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let schemata = catalog
            .schemata
            .iter()
            .filter_map(|id| catalog.schemas.get(id))
            .map(|schema| SchemaDocument {
                id: schema.id.to_string(),
                name: schema.name.clone(),
                old_name: schema.old_name.clone(),
                default_charset: schema.default_charset.clone(),
                default_collation: schema.default_collation.clone(),
                comment: schema.comment.clone(),
                tables: schema
                    .tables
                    .iter()
                    .filter_map(|id| catalog.tables.get(id))
                    .map(|table| table_document(catalog, schema, table))
                    .collect(),
                views: schema
                    .views
                    .iter()
                    .filter_map(|id| catalog.views.get(id))
                    .map(|view| ViewDocument {
                        id: view.id.to_string(),
                        name: view.name.clone(),
                        old_name: view.old_name.clone(),
                        definition: view.sql_definition.clone(),
                        definer: view.definer.clone(),
                        algorithm: view.algorithm.clone(),
                        with_check_condition: view.with_check_condition,
                    })
                    .collect(),
                routines: schema
                    .routines
                    .iter()
                    .filter_map(|id| catalog.routines.get(id))
                    .map(|routine| RoutineDocument {
                        id: routine.id.to_string(),
                        name: routine.name.clone(),
                        old_name: routine.old_name.clone(),
                        routine_type: routine.routine_type.clone(),
                        definition: routine.sql_definition.clone(),
                        definer: routine.definer.clone(),
                        comment: routine.comment.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            id: catalog.id.to_string(),
            name: catalog.name.clone(),
            default_charset: catalog.default_charset.clone(),
            default_collation: catalog.default_collation.clone(),
            schemata,
        }
    }
}

/// Id given in the document, `None` when the document leaves it out
fn document_id(catalog: &Catalog, id: &str) -> Result<Option<ObjectId>> {
    if id.is_empty() {
        return Ok(None);
    }
    let id = ObjectId::from(id);
    if catalog.contains(&id) {
        return Err(Error::Document(format!("Duplicate object id {}", id)));
    }
    Ok(Some(id))
}

fn load_table(catalog: &mut Catalog, schema_id: &ObjectId, doc: &TableDocument) -> Result<ObjectId> {
    let mut table = Table::new(&doc.name);
    table.old_name = doc.old_name.clone();
    table.engine = doc.engine.clone();
    table.comment = doc.comment.clone();
    table.default_charset = doc.default_charset.clone();
    table.default_collation = doc.default_collation.clone();
    table.row_format = doc.row_format.clone();
    table.pack_keys = doc.pack_keys.clone();
    table.key_block_size = doc.key_block_size.clone();
    table.min_rows = doc.min_rows.clone();
    table.max_rows = doc.max_rows.clone();
    table.avg_row_length = doc.avg_row_length.clone();
    table.next_auto_inc = doc.next_auto_inc.clone();
    table.password = doc.password.clone();
    table.merge_union = doc.merge_union.clone();
    table.merge_insert = doc.merge_insert.clone();
    table.connection_string = doc.connection_string.clone();
    table.checksum = doc.checksum;
    table.delay_key_write = doc.delay_key_write;
    if let Some(id) = document_id(catalog, &doc.id)? {
        table.id = id;
    }
    if let Some(p) = &doc.partitioning {
        table.partition_type = p.partition_type.to_uppercase();
        table.partition_expression = p.expression.clone();
        table.partition_count = p.count;
        table.subpartition_type = p.subpartition_type.to_uppercase();
        table.subpartition_expression = p.subpartition_expression.clone();
        table.subpartition_count = p.subpartition_count;
    }
    let table_id = catalog.add_table(schema_id, table)?;

    for column_doc in &doc.columns {
        let mut column = Column::new(&column_doc.name, &column_doc.data_type)
            .not_null(column_doc.not_null)
            .auto_increment(column_doc.auto_increment)
            .charset(&column_doc.charset, &column_doc.collation)
            .comment(&column_doc.comment);
        column.old_name = column_doc.old_name.clone();
        if let Some(id) = document_id(catalog, &column_doc.id)? {
            column.id = id;
        }
        if let Some(default) = &column_doc.default {
            column.default_value_is_null = default.eq_ignore_ascii_case("NULL");
            column.default_value = default.clone();
        }
        catalog.add_column(&table_id, column)?;
    }

    for index_doc in &doc.indices {
        let mut index = Index::new(&index_doc.name, &index_doc.index_type);
        index.old_name = index_doc.old_name.clone();
        index.index_kind = index_doc.kind.to_uppercase();
        index.comment = index_doc.comment.clone();
        if let Some(id) = document_id(catalog, &index_doc.id)? {
            index.id = id;
        }
        let index_id = catalog.add_index(&table_id, index, &[])?;
        for entry in &index_doc.columns {
            let (name, descend, length) = match entry {
                IndexColumnDocument::Name(name) => (name.as_str(), false, 0),
                IndexColumnDocument::Detailed { column, descend, length } => (column.as_str(), *descend, *length),
            };
            let column = catalog.find_column(&table_id, name).ok_or_else(|| {
                Error::Document(format!(
                    "Index {}.{} references unknown column {}",
                    doc.name, index_doc.name, name
                ))
            })?;
            let index_column = IndexColumn {
                owner: index_id.clone(),
                column: Some(column),
                descend,
                column_length: length,
                ..Default::default()
            };
            if let Some(index) = catalog.indices.get_mut(&index_id) {
                index.columns.push(index_column.id.clone());
            }
            catalog.index_columns.insert(index_column.id.clone(), index_column);
        }
    }

    for trigger_doc in &doc.triggers {
        let mut trigger = Trigger::new(&trigger_doc.name, &trigger_doc.timing, &trigger_doc.event, &trigger_doc.definition);
        trigger.old_name = trigger_doc.old_name.clone();
        trigger.definer = trigger_doc.definer.clone();
        trigger.enabled = trigger_doc.enabled;
        if let Some(id) = document_id(catalog, &trigger_doc.id)? {
            trigger.id = id;
        }
        catalog.add_trigger(&table_id, trigger)?;
    }

    if let Some(p) = &doc.partitioning {
        for part_doc in &p.definitions {
            let mut partition = Partition::new(&part_doc.name, &part_doc.value);
            partition.comment = part_doc.comment.clone();
            partition.engine = part_doc.engine.clone();
            partition.max_rows = part_doc.max_rows.clone();
            partition.min_rows = part_doc.min_rows.clone();
            catalog.add_partition(&table_id, partition)?;
        }
    }

    Ok(table_id)
}

fn load_foreign_key(catalog: &mut Catalog, table_id: &ObjectId, schema_name: &str, doc: ForeignKeyDocument) -> Result<()> {
    let table_name = catalog.name_of(table_id);
    let mut columns = Vec::new();
    for name in &doc.columns {
        let column = catalog.find_column(table_id, name).ok_or_else(|| {
            Error::Document(format!("Foreign key {}.{} references unknown column {}", table_name, doc.name, name))
        })?;
        columns.push(column);
    }

    let (ref_schema, ref_table) = match doc.referenced_table.split_once('.') {
        Some((schema, table)) => (schema.to_string(), table.to_string()),
        None => (schema_name.to_string(), doc.referenced_table.clone()),
    };
    let referenced = catalog
        .find_schema(&ref_schema)
        .and_then(|schema_id| catalog.find_table(&schema_id, &ref_table));

    let mut referenced_columns = Vec::new();
    match &referenced {
        Some(ref_id) => {
            for name in &doc.referenced_columns {
                match catalog.find_column(ref_id, name) {
                    Some(column) => referenced_columns.push(column),
                    None => tracing::warn!(
                        foreign_key = %doc.name,
                        column = %name,
                        "Referenced column not found, dropping it from the foreign key"
                    ),
                }
            }
        }
        None => tracing::warn!(
            foreign_key = %doc.name,
            table = %table_name,
            referenced_table = %doc.referenced_table,
            "Foreign key references an unknown table"
        ),
    }

    let mut fk = ForeignKey::new(&doc.name).rules(&doc.on_delete.to_uppercase(), &doc.on_update.to_uppercase());
    fk.old_name = doc.old_name;
    fk.columns = columns;
    fk.referenced_table = referenced;
    fk.referenced_columns = referenced_columns;
    fk.model_only = doc.model_only;
    fk.comment = doc.comment;
    if let Some(id) = document_id(catalog, &doc.id)? {
        fk.id = id;
    }
    catalog.add_foreign_key_raw(table_id, fk)?;
    Ok(())
}

fn table_document(catalog: &Catalog, schema: &Schema, table: &Table) -> TableDocument {
    let column_name = |id: &ObjectId| catalog.columns.get(id).map(|c| c.name.clone()).unwrap_or_default();

    let columns = table
        .columns
        .iter()
        .filter_map(|id| catalog.columns.get(id))
        .map(|c| ColumnDocument {
            id: c.id.to_string(),
            name: c.name.clone(),
            old_name: c.old_name.clone(),
            data_type: c.formatted_type(),
            not_null: c.not_null,
            auto_increment: c.auto_increment,
            default: if c.default_value.is_empty() && !c.default_value_is_null {
                None
            } else {
                Some(c.default_value.clone())
            },
            charset: c.charset.clone(),
            collation: c.collation.clone(),
            comment: c.comment.clone(),
        })
        .collect();

    let indices = table
        .indices
        .iter()
        .filter_map(|id| catalog.indices.get(id))
        .map(|index| IndexDocument {
            id: index.id.to_string(),
            name: index.name.clone(),
            old_name: index.old_name.clone(),
            index_type: index.index_type.clone(),
            kind: index.index_kind.clone(),
            comment: index.comment.clone(),
            columns: index
                .columns
                .iter()
                .filter_map(|id| catalog.index_columns.get(id))
                .map(|ic| {
                    let name = ic.column.as_ref().map(|c| column_name(c)).unwrap_or_default();
                    if ic.descend || ic.column_length > 0 {
                        IndexColumnDocument::Detailed {
                            column: name,
                            descend: ic.descend,
                            length: ic.column_length,
                        }
                    } else {
                        IndexColumnDocument::Name(name)
                    }
                })
                .collect(),
        })
        .collect();

    let foreign_keys = table
        .foreign_keys
        .iter()
        .filter_map(|id| catalog.foreign_keys.get(id))
        .map(|fk| {
            let referenced_table = match fk.referenced_table.as_ref().and_then(|t| catalog.tables.get(t)) {
                Some(target) if target.owner == schema.id => target.name.clone(),
                Some(target) => format!("{}.{}", catalog.name_of(&target.owner), target.name),
                None => String::new(),
            };
            ForeignKeyDocument {
                id: fk.id.to_string(),
                name: fk.name.clone(),
                old_name: fk.old_name.clone(),
                columns: fk.columns.iter().map(|c| column_name(c)).collect(),
                referenced_table,
                referenced_columns: fk.referenced_columns.iter().map(|c| column_name(c)).collect(),
                on_delete: fk.delete_rule.clone(),
                on_update: fk.update_rule.clone(),
                model_only: fk.model_only,
                comment: fk.comment.clone(),
            }
        })
        .collect();

    let triggers = table
        .triggers
        .iter()
        .filter_map(|id| catalog.triggers.get(id))
        .map(|t| TriggerDocument {
            id: t.id.to_string(),
            name: t.name.clone(),
            old_name: t.old_name.clone(),
            timing: t.timing.clone(),
            event: t.event.clone(),
            definition: t.sql_definition.clone(),
            definer: t.definer.clone(),
            enabled: t.enabled,
        })
        .collect();

    let partitioning = if table.partition_type.is_empty() {
        None
    } else {
        Some(PartitioningDocument {
            partition_type: table.partition_type.clone(),
            expression: table.partition_expression.clone(),
            count: table.partition_count,
            subpartition_type: table.subpartition_type.clone(),
            subpartition_expression: table.subpartition_expression.clone(),
            subpartition_count: table.subpartition_count,
            definitions: table
                .partitions
                .iter()
                .filter_map(|id| catalog.partitions.get(id))
                .map(|p| PartitionDocument {
                    name: p.name.clone(),
                    value: p.value.clone(),
                    comment: p.comment.clone(),
                    engine: p.engine.clone(),
                    max_rows: p.max_rows.clone(),
                    min_rows: p.min_rows.clone(),
                })
                .collect(),
        })
    };

    TableDocument {
        id: table.id.to_string(),
        name: table.name.clone(),
        old_name: table.old_name.clone(),
        engine: table.engine.clone(),
        comment: table.comment.clone(),
        default_charset: table.default_charset.clone(),
        default_collation: table.default_collation.clone(),
        row_format: table.row_format.clone(),
        pack_keys: table.pack_keys.clone(),
        key_block_size: table.key_block_size.clone(),
        min_rows: table.min_rows.clone(),
        max_rows: table.max_rows.clone(),
        avg_row_length: table.avg_row_length.clone(),
        next_auto_inc: table.next_auto_inc.clone(),
        password: table.password.clone(),
        merge_union: table.merge_union.clone(),
        merge_insert: table.merge_insert.clone(),
        connection_string: table.connection_string.clone(),
        checksum: table.checksum,
        delay_key_write: table.delay_key_write,
        partitioning,
        columns,
        indices,
        foreign_keys,
        triggers,
    }
}
