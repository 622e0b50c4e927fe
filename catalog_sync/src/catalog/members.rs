//! Per-kind member descriptor tables
//!
//! Each object kind exposes a static list of [`Member`]s describing how the
//! diff engine, the changes applier and the object mapper walk it: plain
//! values, references to other objects (compared by identity key, never
//! followed) and owned child lists (deep compared).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::types::{Catalog, ObjectId, ObjectKind};

/// Bookkeeping members (old names, model-only markers, stored snapshots)
pub const DONTDIFF_BOOKKEEPING: u32 = 1;
/// Counters the server maintains on its own
pub const DONTDIFF_SERVER_STATE: u32 = 2;
/// Object bodies (`sqlDefinition`)
pub const DONTDIFF_BODY: u32 = 4;

/// A member value as seen by the generic walkers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Str(String),
    StrList(Vec<String>),
    Ref(Option<ObjectId>),
    RefList(Vec<ObjectId>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Render the value using names from `catalog` for references
    pub fn describe(&self, catalog: &Catalog) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Str(s) => format!("'{}'", s),
            Value::StrList(items) => format!("[{}]", items.join(", ")),
            Value::Ref(Some(id)) => catalog.name_of(id),
            Value::Ref(None) => "NULL".to_string(),
            Value::RefList(ids) => format!(
                "[{}]",
                ids.iter().map(|id| catalog.name_of(id)).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "'{}'", s),
            Value::StrList(items) => write!(f, "[{}]", items.join(", ")),
            Value::Ref(Some(id)) => write!(f, "ref({})", id),
            Value::Ref(None) => write!(f, "NULL"),
            Value::RefList(ids) => write!(
                f,
                "[{}]",
                ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

pub type Getter = fn(&Catalog, &ObjectId) -> Option<Value>;
pub type Setter = fn(&mut Catalog, &ObjectId, Value);
pub type ListGetter = fn(&Catalog, &ObjectId) -> Option<Vec<ObjectId>>;
pub type ListSetter = fn(&mut Catalog, &ObjectId, Vec<ObjectId>);

/// How a member is read and written
pub enum MemberAccess {
    /// Scalar or scalar list, compared through the match policy
    Value { get: Getter, set: Setter },
    /// Non-owned reference(s), compared by the referenced object's identity key
    Reference { get: Getter, set: Setter },
    /// Owned child list, diffed item by item
    Owned {
        child: ObjectKind,
        get: ListGetter,
        set: ListSetter,
    },
}

/// One reflected member of an object kind
pub struct Member {
    pub name: &'static str,
    pub dontdiff: u32,
    pub access: MemberAccess,
}

impl Member {
    pub fn is_owned(&self) -> bool {
        matches!(self.access, MemberAccess::Owned { .. })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.access, MemberAccess::Reference { .. })
    }

    /// Whether the member is excluded under the given mask
    pub fn skipped(&self, mask: u32) -> bool {
        self.dontdiff & mask != 0
    }

    /// Read a value or reference member
    pub fn get(&self, catalog: &Catalog, id: &ObjectId) -> Option<Value> {
        match &self.access {
            MemberAccess::Value { get, .. } | MemberAccess::Reference { get, .. } => get(catalog, id),
            MemberAccess::Owned { .. } => None,
        }
    }

    /// Write a value or reference member; owned lists are ignored
    pub fn set(&self, catalog: &mut Catalog, id: &ObjectId, value: Value) {
        match &self.access {
            MemberAccess::Value { set, .. } | MemberAccess::Reference { set, .. } => set(catalog, id, value),
            MemberAccess::Owned { .. } => {}
        }
    }

    /// Read an owned child list
    pub fn list(&self, catalog: &Catalog, id: &ObjectId) -> Option<Vec<ObjectId>> {
        match &self.access {
            MemberAccess::Owned { get, .. } => get(catalog, id),
            _ => None,
        }
    }

    /// Replace an owned child list
    pub fn set_list(&self, catalog: &mut Catalog, id: &ObjectId, items: Vec<ObjectId>) {
        if let MemberAccess::Owned { set, .. } = &self.access {
            set(catalog, id, items);
        }
    }

    pub fn child_kind(&self) -> Option<ObjectKind> {
        match &self.access {
            MemberAccess::Owned { child, .. } => Some(*child),
            _ => None,
        }
    }
}

macro_rules! string_member {
    ($name:literal, $arena:ident, $field:ident) => {
        string_member!($name, $arena, $field, 0)
    };
    ($name:literal, $arena:ident, $field:ident, $dontdiff:expr) => {
        Member {
            name: $name,
            dontdiff: $dontdiff,
            access: MemberAccess::Value {
                get: |cat: &Catalog, id: &ObjectId| cat.$arena.get(id).map(|o| Value::Str(o.$field.clone())),
                set: |cat: &mut Catalog, id: &ObjectId, value: Value| {
                    if let (Some(o), Value::Str(v)) = (cat.$arena.get_mut(id), value) {
                        o.$field = v;
                    }
                },
            },
        }
    };
}

macro_rules! int_member {
    ($name:literal, $arena:ident, $field:ident) => {
        Member {
            name: $name,
            dontdiff: 0,
            access: MemberAccess::Value {
                get: |cat: &Catalog, id: &ObjectId| cat.$arena.get(id).map(|o| Value::Int(o.$field)),
                set: |cat: &mut Catalog, id: &ObjectId, value: Value| {
                    if let (Some(o), Value::Int(v)) = (cat.$arena.get_mut(id), value) {
                        o.$field = v;
                    }
                },
            },
        }
    };
}

macro_rules! bool_member {
    ($name:literal, $arena:ident, $field:ident) => {
        bool_member!($name, $arena, $field, 0)
    };
    ($name:literal, $arena:ident, $field:ident, $dontdiff:expr) => {
        Member {
            name: $name,
            dontdiff: $dontdiff,
            access: MemberAccess::Value {
                get: |cat: &Catalog, id: &ObjectId| cat.$arena.get(id).map(|o| Value::Int(o.$field as i64)),
                set: |cat: &mut Catalog, id: &ObjectId, value: Value| {
                    if let (Some(o), Value::Int(v)) = (cat.$arena.get_mut(id), value) {
                        o.$field = v != 0;
                    }
                },
            },
        }
    };
}

macro_rules! ref_member {
    ($name:literal, $arena:ident, $field:ident) => {
        Member {
            name: $name,
            dontdiff: 0,
            access: MemberAccess::Reference {
                get: |cat: &Catalog, id: &ObjectId| cat.$arena.get(id).map(|o| Value::Ref(o.$field.clone())),
                set: |cat: &mut Catalog, id: &ObjectId, value: Value| {
                    if let (Some(o), Value::Ref(v)) = (cat.$arena.get_mut(id), value) {
                        o.$field = v;
                    }
                },
            },
        }
    };
}

macro_rules! ref_list_member {
    ($name:literal, $arena:ident, $field:ident) => {
        Member {
            name: $name,
            dontdiff: 0,
            access: MemberAccess::Reference {
                get: |cat: &Catalog, id: &ObjectId| cat.$arena.get(id).map(|o| Value::RefList(o.$field.clone())),
                set: |cat: &mut Catalog, id: &ObjectId, value: Value| {
                    if let (Some(o), Value::RefList(v)) = (cat.$arena.get_mut(id), value) {
                        o.$field = v;
                    }
                },
            },
        }
    };
}

macro_rules! owned_member {
    ($name:literal, $arena:ident, $field:ident, $child:expr) => {
        Member {
            name: $name,
            dontdiff: 0,
            access: MemberAccess::Owned {
                child: $child,
                get: |cat: &Catalog, id: &ObjectId| cat.$arena.get(id).map(|o| o.$field.clone()),
                set: |cat: &mut Catalog, id: &ObjectId, items: Vec<ObjectId>| {
                    if let Some(o) = cat.$arena.get_mut(id) {
                        o.$field = items;
                    }
                },
            },
        }
    };
}

static CATALOG_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![Member {
        name: "schemata",
        dontdiff: 0,
        access: MemberAccess::Owned {
            child: ObjectKind::Schema,
            get: |cat: &Catalog, id: &ObjectId| (cat.id == *id).then(|| cat.schemata.clone()),
            set: |cat: &mut Catalog, id: &ObjectId, items: Vec<ObjectId>| {
                if cat.id == *id {
                    cat.schemata = items;
                }
            },
        },
    }]
});

static SCHEMA_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", schemas, name),
        string_member!("oldName", schemas, old_name, DONTDIFF_BOOKKEEPING),
        string_member!("defaultCharacterSetName", schemas, default_charset),
        string_member!("defaultCollationName", schemas, default_collation),
        string_member!("comment", schemas, comment),
        owned_member!("tables", schemas, tables, ObjectKind::Table),
        owned_member!("views", schemas, views, ObjectKind::View),
        owned_member!("routines", schemas, routines, ObjectKind::Routine),
    ]
});

static TABLE_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", tables, name),
        string_member!("oldName", tables, old_name, DONTDIFF_BOOKKEEPING),
        string_member!("tableEngine", tables, engine),
        string_member!("nextAutoInc", tables, next_auto_inc, DONTDIFF_SERVER_STATE),
        string_member!("password", tables, password),
        int_member!("delayKeyWrite", tables, delay_key_write),
        string_member!("defaultCharacterSetName", tables, default_charset),
        string_member!("defaultCollationName", tables, default_collation),
        string_member!("mergeUnion", tables, merge_union),
        string_member!("mergeInsert", tables, merge_insert),
        string_member!("packKeys", tables, pack_keys),
        int_member!("checksum", tables, checksum),
        string_member!("comment", tables, comment),
        string_member!("rowFormat", tables, row_format),
        string_member!("keyBlockSize", tables, key_block_size),
        string_member!("avgRowLength", tables, avg_row_length, DONTDIFF_SERVER_STATE),
        string_member!("minRows", tables, min_rows),
        string_member!("maxRows", tables, max_rows),
        string_member!("connectionString", tables, connection_string),
        string_member!("partitionType", tables, partition_type),
        string_member!("partitionExpression", tables, partition_expression),
        int_member!("partitionCount", tables, partition_count),
        string_member!("subpartitionType", tables, subpartition_type),
        string_member!("subpartitionExpression", tables, subpartition_expression),
        int_member!("subpartitionCount", tables, subpartition_count),
        owned_member!("columns", tables, columns, ObjectKind::Column),
        owned_member!("indices", tables, indices, ObjectKind::Index),
        owned_member!("foreignKeys", tables, foreign_keys, ObjectKind::ForeignKey),
        owned_member!("triggers", tables, triggers, ObjectKind::Trigger),
        owned_member!("partitionDefinitions", tables, partitions, ObjectKind::Partition),
    ]
});

static COLUMN_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", columns, name),
        string_member!("oldName", columns, old_name, DONTDIFF_BOOKKEEPING),
        string_member!("simpleType", columns, simple_type),
        int_member!("length", columns, length),
        int_member!("precision", columns, precision),
        int_member!("scale", columns, scale),
        string_member!("datatypeExplicitParams", columns, explicit_params),
        Member {
            name: "flags",
            dontdiff: 0,
            access: MemberAccess::Value {
                get: |cat: &Catalog, id: &ObjectId| cat.columns.get(id).map(|o| Value::StrList(o.flags.clone())),
                set: |cat: &mut Catalog, id: &ObjectId, value: Value| {
                    if let (Some(o), Value::StrList(v)) = (cat.columns.get_mut(id), value) {
                        o.flags = v;
                    }
                },
            },
        },
        bool_member!("isNotNull", columns, not_null),
        bool_member!("autoIncrement", columns, auto_increment),
        string_member!("defaultValue", columns, default_value),
        bool_member!("defaultValueIsNull", columns, default_value_is_null),
        string_member!("characterSetName", columns, charset),
        string_member!("collationName", columns, collation),
        string_member!("comment", columns, comment),
    ]
});

static INDEX_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", indices, name),
        string_member!("oldName", indices, old_name, DONTDIFF_BOOKKEEPING),
        string_member!("indexType", indices, index_type),
        string_member!("indexKind", indices, index_kind),
        int_member!("keyBlockSize", indices, key_block_size),
        string_member!("withParser", indices, with_parser),
        string_member!("comment", indices, comment),
        owned_member!("columns", indices, columns, ObjectKind::IndexColumn),
    ]
});

static INDEX_COLUMN_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        ref_member!("referencedColumn", index_columns, column),
        bool_member!("descend", index_columns, descend),
        int_member!("columnLength", index_columns, column_length),
    ]
});

static FOREIGN_KEY_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", foreign_keys, name),
        string_member!("oldName", foreign_keys, old_name, DONTDIFF_BOOKKEEPING),
        ref_list_member!("columns", foreign_keys, columns),
        ref_member!("referencedTable", foreign_keys, referenced_table),
        ref_list_member!("referencedColumns", foreign_keys, referenced_columns),
        string_member!("deleteRule", foreign_keys, delete_rule),
        string_member!("updateRule", foreign_keys, update_rule),
        bool_member!("modelOnly", foreign_keys, model_only, DONTDIFF_BOOKKEEPING),
        string_member!("comment", foreign_keys, comment),
    ]
});

static TRIGGER_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", triggers, name),
        string_member!("oldName", triggers, old_name, DONTDIFF_BOOKKEEPING),
        string_member!("timing", triggers, timing),
        string_member!("event", triggers, event),
        string_member!("sqlDefinition", triggers, sql_definition, DONTDIFF_BODY),
        string_member!("definer", triggers, definer),
        bool_member!("enabled", triggers, enabled),
    ]
});

static VIEW_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", views, name),
        string_member!("oldName", views, old_name, DONTDIFF_BOOKKEEPING),
        string_member!("sqlDefinition", views, sql_definition, DONTDIFF_BODY),
        string_member!("definer", views, definer),
        string_member!("algorithm", views, algorithm),
        bool_member!("withCheckCondition", views, with_check_condition),
        string_member!("oldModelSqlDefinition", views, old_model_sql_definition, DONTDIFF_BOOKKEEPING),
        string_member!("oldServerSqlDefinition", views, old_server_sql_definition, DONTDIFF_BOOKKEEPING),
    ]
});

static ROUTINE_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", routines, name),
        string_member!("oldName", routines, old_name, DONTDIFF_BOOKKEEPING),
        string_member!("routineType", routines, routine_type),
        string_member!("sqlDefinition", routines, sql_definition, DONTDIFF_BODY),
        string_member!("definer", routines, definer),
        string_member!("comment", routines, comment),
    ]
});

static PARTITION_MEMBERS: Lazy<Vec<Member>> = Lazy::new(|| {
    vec![
        string_member!("name", partitions, name),
        string_member!("value", partitions, value),
        string_member!("comment", partitions, comment),
        string_member!("engine", partitions, engine),
        string_member!("maxRows", partitions, max_rows),
        string_member!("minRows", partitions, min_rows),
    ]
});

/// The member table of an object kind
pub fn members(kind: ObjectKind) -> &'static [Member] {
    match kind {
        ObjectKind::Catalog => &CATALOG_MEMBERS,
        ObjectKind::Schema => &SCHEMA_MEMBERS,
        ObjectKind::Table => &TABLE_MEMBERS,
        ObjectKind::Column => &COLUMN_MEMBERS,
        ObjectKind::Index => &INDEX_MEMBERS,
        ObjectKind::IndexColumn => &INDEX_COLUMN_MEMBERS,
        ObjectKind::ForeignKey => &FOREIGN_KEY_MEMBERS,
        ObjectKind::Trigger => &TRIGGER_MEMBERS,
        ObjectKind::View => &VIEW_MEMBERS,
        ObjectKind::Routine => &ROUTINE_MEMBERS,
        ObjectKind::Partition => &PARTITION_MEMBERS,
    }
}

/// Look up a member of a kind by name
pub fn member(kind: ObjectKind, name: &str) -> Option<&'static Member> {
    members(kind).iter().find(|m| m.name == name)
}

/// Find the owned list member of `owner_kind` that holds children of `child_kind`
pub fn owning_member(owner_kind: ObjectKind, child_kind: ObjectKind) -> Option<&'static Member> {
    members(owner_kind)
        .iter()
        .find(|m| m.child_kind() == Some(child_kind))
}
