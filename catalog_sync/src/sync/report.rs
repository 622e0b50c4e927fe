//! Human readable synchronization report
//!
//! Summarizes a change tree per schema: which objects get created, dropped
//! or altered, and for altered objects which members change from what to
//! what. The report is plain data so it can be serialized for external
//! templating; [`SyncReport::render_text`] gives a basic text layout.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::catalog::keys::filter_key;
use crate::catalog::types::{Catalog, ObjectId, ObjectKind, ObjectRef};
use crate::diff::change::{Change, ChangeId, ChangeTree};
use crate::sql::options::GeneratorOptions;
use crate::utils::naming::fold_case;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    Create,
    Drop,
    Alter,
    /// Only the position changed
    Move,
}

impl fmt::Display for ReportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReportAction::Create => "create",
            ReportAction::Drop => "drop",
            ReportAction::Alter => "alter",
            ReportAction::Move => "move",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub name: String,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectReport {
    pub kind: ObjectKind,
    pub name: String,
    pub action: ReportAction,
    pub attributes: Vec<AttributeChange>,
    pub children: Vec<ObjectReport>,
}

impl ObjectReport {
    fn new(object: &ObjectRef, action: ReportAction) -> Self {
        Self {
            kind: object.kind,
            name: object.name.clone(),
            action,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Names of the members that change on this object
    pub fn changed_attributes(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    fn write_text(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{}{} `{}` ({})\n", indent, kind_label(self.kind), self.name, self.action));
        for attribute in &self.attributes {
            out.push_str(&format!("{}  {}: {} -> {}\n", indent, attribute.name, attribute.old, attribute.new));
        }
        for child in &self.children {
            child.write_text(out, depth + 1);
        }
    }
}

fn kind_label(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Catalog => "Catalog",
        ObjectKind::Schema => "Schema",
        ObjectKind::Table => "Table",
        ObjectKind::Column => "Column",
        ObjectKind::Index => "Index",
        ObjectKind::IndexColumn => "Index column",
        ObjectKind::ForeignKey => "Foreign key",
        ObjectKind::Trigger => "Trigger",
        ObjectKind::View => "View",
        ObjectKind::Routine => "Routine",
        ObjectKind::Partition => "Partition",
    }
}

/// Report of one change tree, one entry per affected schema
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub schemas: Vec<ObjectReport>,
}

impl SyncReport {
    /// Build the report of `changes` (from `source` to `target`), keeping only
    /// node objects the option filter lists let through
    pub fn build(source: &Catalog, target: &Catalog, changes: &ChangeTree, options: &GeneratorOptions) -> Self {
        let builder = Builder::new(source, target, changes, options);
        let mut report = SyncReport::default();
        if changes.len() == 0 {
            return report;
        }
        let root = changes.root();
        for attr_change in changes.children(root) {
            if changes.attr_name(attr_change) != Some("schemata") {
                continue;
            }
            if let Some(list) = changes.subchange(attr_change) {
                report.schemas.extend(builder.list(list));
            }
        }
        report
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Plain text rendering, one line per object and changed member
    pub fn render_text(&self) -> String {
        if self.schemas.is_empty() {
            return "No differences found.\n".to_string();
        }
        let mut out = String::new();
        for schema in &self.schemas {
            schema.write_text(&mut out, 0);
        }
        out
    }
}

struct Builder<'a> {
    source: &'a Catalog,
    target: &'a Catalog,
    tree: &'a ChangeTree,
    case_sensitive: bool,
    filters: Option<HashMap<ObjectKind, HashSet<String>>>,
}

impl<'a> Builder<'a> {
    fn new(source: &'a Catalog, target: &'a Catalog, tree: &'a ChangeTree, options: &GeneratorOptions) -> Self {
        let filters = options.use_filtered_lists.then(|| {
            [
                ObjectKind::Schema,
                ObjectKind::Table,
                ObjectKind::View,
                ObjectKind::Routine,
                ObjectKind::Trigger,
            ]
            .into_iter()
            .map(|kind| (kind, options.folded_filter(kind)))
            .collect()
        });
        Self {
            source,
            target,
            tree,
            case_sensitive: options.case_sensitive,
            filters,
        }
    }

    fn allowed(&self, catalog: &Catalog, id: &ObjectId) -> bool {
        let filters = match &self.filters {
            Some(filters) => filters,
            None => return true,
        };
        match catalog.kind_of(id).and_then(|kind| filters.get(&kind)) {
            Some(filter) => {
                let cs = self.case_sensitive;
                filter.contains(&fold_case(&filter_key(catalog, id, cs), cs))
            }
            None => true,
        }
    }

    /// Reports for the items of a list change
    fn list(&self, list: ChangeId) -> Vec<ObjectReport> {
        let tree = self.tree;
        let mut reports = Vec::new();
        for item in tree.children(list) {
            let report = match tree.get(item) {
                Change::ListItemAdded { value, .. } => {
                    self.allowed(self.target, &value.id)
                        .then(|| ObjectReport::new(value, ReportAction::Create))
                }
                Change::ListItemRemoved { value, .. } => {
                    self.allowed(self.source, &value.id)
                        .then(|| ObjectReport::new(value, ReportAction::Drop))
                }
                Change::ListItemModified { new, subchange, .. } => self.altered(new, Some(*subchange), false),
                Change::ListItemOrderChanged { new, subchange, .. } => self.altered(new, *subchange, true),
                _ => None,
            };
            reports.extend(report);
        }
        reports
    }

    fn altered(&self, new: &ObjectRef, subchange: Option<ChangeId>, moved: bool) -> Option<ObjectReport> {
        if !self.allowed(self.target, &new.id) {
            return None;
        }
        let tree = self.tree;
        let action = if subchange.is_some() {
            ReportAction::Alter
        } else {
            ReportAction::Move
        };
        let mut report = ObjectReport::new(new, action);
        if moved && subchange.is_some() {
            report.attributes.push(AttributeChange {
                name: "position".to_string(),
                old: String::new(),
                new: String::new(),
            });
        }

        for attr_change in subchange.map(|c| tree.children(c)).unwrap_or_default() {
            let (attr, value_change) = match tree.get(attr_change) {
                Change::ObjectAttrModified { attr, subchange } => (attr, *subchange),
                _ => continue,
            };
            match tree.get(value_change) {
                Change::SimpleValue { old, new } => report.attributes.push(AttributeChange {
                    name: attr.clone(),
                    old: old.describe(self.source),
                    new: new.describe(self.target),
                }),
                Change::MultiChange { .. } => report.children.extend(self.list(value_change)),
                _ => {}
            }
        }

        // Node objects whose visible changes were all filtered out are dropped
        if report.action == ReportAction::Alter
            && report.attributes.is_empty()
            && report.children.is_empty()
            && new.kind.is_node_object()
        {
            return None;
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Schema, Table};
    use crate::diff::engine::diff_make;
    use crate::diff::omf::Omf;
    use pretty_assertions::assert_eq;

    fn catalogs() -> (Catalog, Catalog) {
        let mut source = Catalog::new("def");
        let s = source.add_schema(Schema::new("shop"));
        let t = source.add_table(&s, Table::new("orders").engine("MyISAM")).unwrap();
        source.add_column(&t, Column::new("id", "INT")).unwrap();
        source.add_table(&s, Table::new("legacy")).unwrap();

        let mut target = Catalog::new("def");
        let s = target.add_schema(Schema::new("shop"));
        let t = target.add_table(&s, Table::new("orders").engine("InnoDB")).unwrap();
        target.add_column(&t, Column::new("id", "INT")).unwrap();
        target.add_column(&t, Column::new("total", "DECIMAL(10,2)")).unwrap();
        (source, target)
    }

    #[test]
    fn test_report_lists_changes_per_schema() {
        let (source, target) = catalogs();
        let changes = diff_make(&source, &target, &Omf::new()).unwrap();
        let report = SyncReport::build(&source, &target, &changes, &GeneratorOptions::all_objects());

        assert_eq!(report.schemas.len(), 1);
        let schema = &report.schemas[0];
        assert_eq!(schema.action, ReportAction::Alter);
        let names: Vec<(&str, ReportAction)> = schema.children.iter().map(|c| (c.name.as_str(), c.action)).collect();
        assert_eq!(names, vec![("legacy", ReportAction::Drop), ("orders", ReportAction::Alter)]);

        let orders = &schema.children[1];
        assert_eq!(orders.changed_attributes(), vec!["tableEngine"]);
        assert_eq!(orders.children[0].name, "total");
        assert_eq!(orders.children[0].action, ReportAction::Create);

        let text = report.render_text();
        assert!(text.contains("Table `orders` (alter)\n"));
        assert!(text.contains("tableEngine: 'MyISAM' -> 'InnoDB'"));
        assert!(text.contains("Column `total` (create)"));
    }

    #[test]
    fn test_report_honours_filter_lists() {
        let (source, target) = catalogs();
        let changes = diff_make(&source, &target, &Omf::new()).unwrap();
        let options = GeneratorOptions {
            schema_filter_list: vec!["schema::`shop`".to_string()],
            table_filter_list: vec!["table::`shop`.`legacy`".to_string()],
            ..Default::default()
        };
        let report = SyncReport::build(&source, &target, &changes, &options);
        let schema = &report.schemas[0];
        assert_eq!(schema.children.len(), 1);
        assert_eq!(schema.children[0].name, "legacy");
    }

    #[test]
    fn test_empty_report_text() {
        assert_eq!(SyncReport::default().render_text(), "No differences found.\n");
    }
}
