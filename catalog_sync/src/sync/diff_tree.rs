//! Diff tree
//!
//! Pairs the node objects (schemas, tables, triggers, views, routines) of the
//! model with their counterparts in the external catalog and records, per
//! pair, the change that concerns it and the direction it should be applied
//! in. The tree drives both script generation (model to database) and the
//! changes applier (database to model).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

use crate::catalog::keys::{catalog_map, filter_key};
use crate::catalog::types::{Catalog, ObjectId, ObjectKind, ObjectRef};
use crate::diff::change::{Change, ChangeId, ChangeTree};
use crate::error::{Error, Result};

/// Where the change of a node should go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplyDirection {
    ApplyToModel,
    ApplyToDb,
    DontApply,
    CantApply,
}

impl fmt::Display for ApplyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApplyDirection::ApplyToModel => "<-db",
            ApplyDirection::ApplyToDb => "model->",
            ApplyDirection::DontApply => "ignore",
            ApplyDirection::CantApply => "n/a",
        };
        f.write_str(label)
    }
}

/// Path of child indices from the root; the empty path is the root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodeId(pub Vec<usize>);

impl NodeId {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Id of the `index`-th child of this node
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Parse a dotted path such as `0.2.1`
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::root());
        }
        text.split('.')
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .map_err(|_| Error::usage(format!("Invalid node id: {}", text)))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

/// One model/database pair
#[derive(Debug, Clone)]
pub struct DiffNode {
    pub model_part: Option<ObjectRef>,
    pub db_part: Option<ObjectRef>,
    pub direction: ApplyDirection,
    pub modified: bool,
    /// Change of the change tree owned by the [`DiffTree`]
    pub change: Option<ChangeId>,
    pub children: Vec<DiffNode>,
}

impl DiffNode {
    pub fn new(model_part: Option<ObjectRef>, db_part: Option<ObjectRef>) -> Self {
        Self {
            model_part,
            db_part,
            direction: ApplyDirection::CantApply,
            modified: false,
            change: None,
            children: Vec::new(),
        }
    }

    /// The object this node stands for, the model side first
    pub fn object(&self) -> Option<&ObjectRef> {
        self.model_part.as_ref().or(self.db_part.as_ref())
    }

    pub fn name(&self) -> &str {
        self.object().map(|o| o.name.as_str()).unwrap_or("")
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn set_modified_change(&mut self, change: ChangeId) {
        self.change = Some(change);
        self.modified = true;
        self.direction = ApplyDirection::ApplyToDb;
    }

    /// Matches the database side when present, the model side otherwise
    fn matches(&self, id: &ObjectId) -> bool {
        match (&self.db_part, &self.model_part) {
            (Some(db), _) => db.id == *id,
            (None, Some(model)) => model.id == *id,
            (None, None) => false,
        }
    }

    fn path_to(&self, id: &ObjectId, path: &mut Vec<usize>) -> bool {
        if self.matches(id) {
            return true;
        }
        for (index, child) in self.children.iter().enumerate() {
            path.push(index);
            if child.path_to(id, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// First child whose database (or model) part carries `name`; exact match
    /// first, then ignoring case
    pub fn find_child_by_db_part_name(&self, name: &str) -> Option<&DiffNode> {
        let part_name = |node: &DiffNode| {
            node.db_part
                .as_ref()
                .or(node.model_part.as_ref())
                .map(|o| o.name.clone())
        };
        self.children
            .iter()
            .find(|c| part_name(c).as_deref() == Some(name))
            .or_else(|| {
                let upper = name.to_uppercase();
                self.children
                    .iter()
                    .find(|c| part_name(c).map(|n| n.to_uppercase()) == Some(upper.clone()))
            })
    }

    /// Objects whose SQL a synchronization script should contain
    pub fn get_object_list_for_script(&self, out: &mut Vec<ObjectRef>) {
        let mut included = false;
        if self.direction == ApplyDirection::ApplyToDb {
            match (&self.model_part, &self.db_part) {
                (Some(model), Some(_)) => out.push(model.clone()),
                (Some(model), None) => {
                    // Newly created object: everything under it comes along
                    out.push(model.clone());
                    for child in &self.children {
                        child.push_model_parts(out);
                    }
                    return;
                }
                (None, Some(db)) => {
                    out.push(db.clone());
                    return;
                }
                (None, None) => {}
            }
            included = true;
        }

        if !included && self.children.iter().any(|c| c.model_part.is_none()) {
            if let Some(model) = &self.model_part {
                out.push(model.clone());
            }
        }
        for child in &self.children {
            child.get_object_list_for_script(out);
        }
    }

    fn push_model_parts(&self, out: &mut Vec<ObjectRef>) {
        if let Some(model) = &self.model_part {
            out.push(model.clone());
        }
        for child in &self.children {
            child.push_model_parts(out);
        }
    }

    /// Database objects to bring into the model and model objects to remove
    pub fn get_object_list_to_apply_to_model(&self, apply: &mut Vec<ObjectRef>, remove: &mut Vec<ObjectRef>) {
        if self.direction == ApplyDirection::ApplyToModel {
            if let Some(db) = &self.db_part {
                apply.push(db.clone());
            } else if let Some(model) = &self.model_part {
                remove.push(model.clone());
            }
        }
        for child in &self.children {
            child.get_object_list_to_apply_to_model(apply, remove);
        }
    }

    fn write_dump(&self, changes: Option<&ChangeTree>, out: &mut String, depth: usize) {
        let change = match (self.change, changes) {
            (Some(id), Some(tree)) => tree.get(id).type_name(),
            _ => "nil",
        };
        out.push_str(&format!(
            "{}-: {}: {} | {} | {}\n",
            " ".repeat(depth),
            change,
            self.db_part.as_ref().map_or("nil", |o| o.name.as_str()),
            self.direction,
            self.model_part.as_ref().map_or("nil", |o| o.name.as_str()),
        ));
        for child in &self.children {
            child.write_dump(changes, out, depth + 1);
        }
    }
}

/// Cycles the apply direction of nodes
#[derive(Debug, Clone)]
pub struct DiffNodeController {
    directions: HashMap<ApplyDirection, ApplyDirection>,
}

impl Default for DiffNodeController {
    fn default() -> Self {
        let directions = [
            (ApplyDirection::ApplyToModel, ApplyDirection::ApplyToDb),
            (ApplyDirection::ApplyToDb, ApplyDirection::DontApply),
            (ApplyDirection::DontApply, ApplyDirection::ApplyToModel),
        ]
        .into_iter()
        .collect();
        Self { directions }
    }
}

impl DiffNodeController {
    /// Controller with a custom transition map
    pub fn with_directions(directions: HashMap<ApplyDirection, ApplyDirection>) -> Self {
        Self { directions }
    }

    /// Move a node to the next direction of the cycle; unknown states become `DontApply`
    pub fn set_next_apply_direction(&self, node: &mut DiffNode) {
        node.direction = self
            .directions
            .get(&node.direction)
            .copied()
            .unwrap_or(ApplyDirection::DontApply);
    }

    pub fn set_apply_direction(&self, node: &mut DiffNode, direction: ApplyDirection, recursive: bool) {
        node.direction = direction;
        if recursive {
            for child in &mut node.children {
                self.set_apply_direction(child, direction, recursive);
            }
        }
    }
}

/// Model/database pairing of one synchronization session
#[derive(Debug, Clone)]
pub struct DiffTree {
    root: DiffNode,
    changes: Option<ChangeTree>,
    controller: DiffNodeController,
}

impl DiffTree {
    /// Pair the node objects of `model` with `external` and attach `changes`
    ///
    /// `changes` must come from diffing `external` (source) against `model`
    /// (target). Model schemas without an external counterpart are left out
    /// when their name is in `skip_schemata`.
    pub fn new(
        skip_schemata: &[String],
        model: &Catalog,
        external: &Catalog,
        changes: Option<ChangeTree>,
        controller: DiffNodeController,
    ) -> Self {
        let root = DiffNode::new(model.object_ref(&model.id), external.object_ref(&external.id));
        let mut tree = Self {
            root,
            changes: None,
            controller,
        };
        tree.fill(skip_schemata, model, external);
        if let Some(changes) = &changes {
            if changes.len() > 0 {
                let root_change = changes.root();
                tree.update_with_changes(changes, external, root_change);
            }
        }
        tree.changes = changes;
        debug!(nodes = tree.iter().count(), "Built diff tree");
        tree
    }

    fn fill(&mut self, skip_schemata: &[String], model: &Catalog, external: &Catalog) {
        // Caseless on both sides, as the diff engine matched them
        let map = catalog_map(external, false);
        let counterpart = |id: &ObjectId| -> Option<ObjectRef> {
            map.get(&filter_key(model, id, false)).and_then(|ext| external.object_ref(ext))
        };

        for schema_id in &model.schemata {
            let schema = match model.schemas.get(schema_id) {
                Some(schema) => schema,
                None => continue,
            };
            let external_schema = counterpart(schema_id);
            if external_schema.is_none() && skip_schemata.iter().any(|s| *s == schema.name) {
                trace!(schema = %schema.name, "Skipping unmatched schema");
                continue;
            }
            let mut schema_node = DiffNode::new(model.object_ref(schema_id), external_schema);

            for table_id in &schema.tables {
                let mut table_node = DiffNode::new(model.object_ref(table_id), counterpart(table_id));
                if let Some(table) = model.tables.get(table_id) {
                    for trigger_id in &table.triggers {
                        table_node
                            .children
                            .push(DiffNode::new(model.object_ref(trigger_id), counterpart(trigger_id)));
                    }
                }
                schema_node.children.push(table_node);
            }
            for view_id in &schema.views {
                schema_node
                    .children
                    .push(DiffNode::new(model.object_ref(view_id), counterpart(view_id)));
            }
            for routine_id in &schema.routines {
                schema_node
                    .children
                    .push(DiffNode::new(model.object_ref(routine_id), counterpart(routine_id)));
            }
            self.root.children.push(schema_node);
        }
    }

    /// Attach the changes of node objects to their nodes
    ///
    /// Returns whether `change` modifies the object it sits under without
    /// having been attached to a node of its own.
    fn update_with_changes(&mut self, changes: &ChangeTree, external: &Catalog, change: ChangeId) -> bool {
        match changes.get(change) {
            Change::SimpleValue { .. } => true,
            Change::ValueAdded { value } | Change::ValueRemoved { value } => {
                if value.kind.is_node_object() {
                    self.attach(external, value.clone(), change);
                    false
                } else {
                    true
                }
            }
            Change::ListItemAdded { value, .. } | Change::ListItemRemoved { value, .. } => {
                if value.kind.is_node_object() {
                    self.attach(external, value.clone(), change);
                    false
                } else {
                    true
                }
            }
            Change::MultiChange { subchanges } => {
                let mut modified = false;
                for sub in subchanges.clone() {
                    if self.update_with_changes(changes, external, sub) {
                        modified = true;
                    }
                }
                modified
            }
            Change::ObjectAttrModified { subchange, .. } => self.update_with_changes(changes, external, *subchange),
            Change::ListItemModified { old, subchange, .. } => {
                let old = old.clone();
                let modified = self.update_with_changes(changes, external, *subchange);
                if modified && old.kind.is_node_object() {
                    self.attach(external, old, change);
                    return false;
                }
                modified
            }
            Change::ListItemOrderChanged { old, subchange, .. } => {
                // Position only matters for columns and index columns
                if matches!(old.kind, ObjectKind::Column | ObjectKind::IndexColumn) {
                    return true;
                }
                let old = old.clone();
                match subchange {
                    Some(sub) => {
                        let modified = self.update_with_changes(changes, external, *sub);
                        if modified && old.kind.is_node_object() {
                            self.attach(external, old, change);
                            return false;
                        }
                        modified
                    }
                    None => false,
                }
            }
        }
    }

    /// Attach a change to the node of `object`, creating a database-only node
    /// under the owner's node (or the root) when there is none
    fn attach(&mut self, external: &Catalog, object: ObjectRef, change: ChangeId) {
        if let Some(path) = self.find_node_for_object(&object.id) {
            if let Ok(node) = self.node_mut(&path) {
                node.set_modified_change(change);
            }
            return;
        }

        let owner_path = external
            .owner_of(&object.id)
            .and_then(|owner| self.find_node_for_object(&owner))
            .unwrap_or_else(NodeId::root);
        trace!(kind = %object.kind, name = %object.name, owner = %owner_path, "Database-only node");
        let mut node = DiffNode::new(None, Some(object));
        node.set_modified_change(change);
        if let Ok(owner) = self.node_mut(&owner_path) {
            owner.children.push(node);
        }
    }

    pub fn root(&self) -> &DiffNode {
        &self.root
    }

    /// The change tree the nodes point into
    pub fn changes(&self) -> Option<&ChangeTree> {
        self.changes.as_ref()
    }

    pub fn controller(&self) -> &DiffNodeController {
        &self.controller
    }

    pub fn node(&self, id: &NodeId) -> Result<&DiffNode> {
        let mut node = &self.root;
        for index in &id.0 {
            node = node
                .children
                .get(*index)
                .ok_or_else(|| Error::usage(format!("Invalid node id {}", id)))?;
        }
        Ok(node)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Result<&mut DiffNode> {
        let mut node = &mut self.root;
        for index in &id.0 {
            node = node
                .children
                .get_mut(*index)
                .ok_or_else(|| Error::usage(format!("Invalid node id {}", id)))?;
        }
        Ok(node)
    }

    /// Path of the node whose database part (or model part, for model-only
    /// nodes) is `id`
    pub fn find_node_for_object(&self, id: &ObjectId) -> Option<NodeId> {
        let mut path = Vec::new();
        if self.root.path_to(id, &mut path) {
            Some(NodeId(path))
        } else {
            None
        }
    }

    pub fn set_next_apply_direction(&mut self, id: &NodeId) -> Result<()> {
        let controller = self.controller.clone();
        controller.set_next_apply_direction(self.node_mut(id)?);
        Ok(())
    }

    pub fn set_apply_direction(&mut self, id: &NodeId, direction: ApplyDirection, recursive: bool) -> Result<()> {
        let controller = self.controller.clone();
        controller.set_apply_direction(self.node_mut(id)?, direction, recursive);
        Ok(())
    }

    pub fn get_object_list_for_script(&self) -> Vec<ObjectRef> {
        let mut out = Vec::new();
        self.root.get_object_list_for_script(&mut out);
        out
    }

    pub fn get_object_list_to_apply_to_model(&self, apply: &mut Vec<ObjectRef>, remove: &mut Vec<ObjectRef>) {
        self.root.get_object_list_to_apply_to_model(apply, remove);
    }

    /// One line per node: change type, database name, direction, model name
    pub fn dump(&self, depth: usize) -> String {
        let mut out = String::new();
        self.root.write_dump(self.changes.as_ref(), &mut out, depth);
        out
    }

    /// Every node with its id, depth first
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DiffNode)> + '_ {
        let mut stack = vec![(NodeId::root(), &self.root)];
        std::iter::from_fn(move || {
            let (id, node) = stack.pop()?;
            for (index, child) in node.children.iter().enumerate().rev() {
                stack.push((id.child(index), child));
            }
            Some((id, node))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Schema, Table};
    use crate::diff::engine::diff_make;
    use crate::diff::omf::Omf;
    use pretty_assertions::assert_eq;

    fn catalog(tables: &[&str]) -> Catalog {
        let mut catalog = Catalog::new("def");
        let schema = catalog.add_schema(Schema::new("s"));
        for name in tables {
            let table = catalog.add_table(&schema, Table::new(name)).unwrap();
            catalog.add_column(&table, Column::new("id", "INT")).unwrap();
        }
        catalog
    }

    fn tree(model: &Catalog, external: &Catalog) -> DiffTree {
        let changes = diff_make(external, model, &Omf::new());
        DiffTree::new(&[], model, external, changes, DiffNodeController::default())
    }

    #[test]
    fn test_pairs_model_with_external_objects() {
        let model = catalog(&["a", "b"]);
        let external = catalog(&["a", "c"]);
        let tree = tree(&model, &external);

        let schema = tree.node(&NodeId(vec![0])).unwrap();
        assert!(schema.db_part.is_some());
        assert_eq!(schema.children.len(), 3);

        let a = &schema.children[0];
        assert!(a.db_part.is_some() && a.model_part.is_some());
        assert_eq!(a.direction, ApplyDirection::CantApply);

        let b = &schema.children[1];
        assert!(b.db_part.is_none());
        assert_eq!(b.direction, ApplyDirection::ApplyToDb);

        // c only exists in the database and hangs under the schema node
        let c = &schema.children[2];
        assert!(c.model_part.is_none());
        assert_eq!(c.name(), "c");
        assert_eq!(c.direction, ApplyDirection::ApplyToDb);
    }

    #[test]
    fn test_object_list_for_script() {
        let model = catalog(&["a", "b"]);
        let external = catalog(&["a", "c"]);
        let tree = tree(&model, &external);

        let names: Vec<String> = tree.get_object_list_for_script().into_iter().map(|o| o.name).collect();
        // The schema comes along because one child has no model part
        assert_eq!(names, vec!["s", "b", "c"]);
    }

    #[test]
    fn test_invalid_node_id_is_a_usage_error() {
        let model = catalog(&["a"]);
        let tree = tree(&model, &model.clone());
        assert!(matches!(tree.node(&NodeId(vec![0, 7])), Err(Error::Usage(_))));
        assert!(tree.node(&NodeId::root()).is_ok());
    }

    #[test]
    fn test_controller_cycles_directions() {
        let model = catalog(&["a"]);
        let mut tree = tree(&model, &catalog(&[]));
        let id = NodeId(vec![0, 0]);
        assert_eq!(tree.node(&id).unwrap().direction, ApplyDirection::ApplyToDb);

        tree.set_next_apply_direction(&id).unwrap();
        assert_eq!(tree.node(&id).unwrap().direction, ApplyDirection::DontApply);
        tree.set_next_apply_direction(&id).unwrap();
        assert_eq!(tree.node(&id).unwrap().direction, ApplyDirection::ApplyToModel);
        tree.set_next_apply_direction(&id).unwrap();
        assert_eq!(tree.node(&id).unwrap().direction, ApplyDirection::ApplyToDb);

        tree.set_apply_direction(&NodeId::root(), ApplyDirection::CantApply, false).unwrap();
        tree.set_next_apply_direction(&NodeId::root()).unwrap();
        assert_eq!(tree.root().direction, ApplyDirection::DontApply);

        tree.set_apply_direction(&NodeId::root(), ApplyDirection::ApplyToModel, true).unwrap();
        assert!(tree.iter().all(|(_, n)| n.direction == ApplyDirection::ApplyToModel));
    }

    #[test]
    fn test_apply_to_model_lists() {
        let model = catalog(&["a", "b"]);
        let external = catalog(&["a", "c"]);
        let mut tree = tree(&model, &external);
        tree.set_apply_direction(&NodeId(vec![0, 1]), ApplyDirection::ApplyToModel, false)
            .unwrap();
        tree.set_apply_direction(&NodeId(vec![0, 2]), ApplyDirection::ApplyToModel, false)
            .unwrap();

        let mut apply = Vec::new();
        let mut remove = Vec::new();
        tree.get_object_list_to_apply_to_model(&mut apply, &mut remove);
        assert_eq!(apply.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(remove.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_skipped_schemata_and_child_lookup() {
        let model = catalog(&["Orders"]);
        let tree = DiffTree::new(&["s".to_string()], &model, &Catalog::new("def"), None, DiffNodeController::default());
        assert!(tree.root().children.is_empty());

        let tree = tree_with_schema(&model);
        let schema = tree.node(&NodeId(vec![0])).unwrap();
        assert!(schema.find_child_by_db_part_name("Orders").is_some());
        assert!(schema.find_child_by_db_part_name("orders").is_some());
        assert!(schema.find_child_by_db_part_name("missing").is_none());
    }

    fn tree_with_schema(model: &Catalog) -> DiffTree {
        tree(model, &model.clone())
    }

    #[test]
    fn test_node_id_parse_and_display() {
        let id = NodeId::parse("0.2.1").unwrap();
        assert_eq!(id, NodeId(vec![0, 2, 1]));
        assert_eq!(id.to_string(), "0.2.1");
        assert_eq!(NodeId::parse("").unwrap(), NodeId::root());
        assert!(NodeId::parse("0.x").is_err());
    }
}
