//! Changes applier
//!
//! Applies the inverse of a diff onto the model catalog so that the chosen
//! objects mirror the external catalog again. The diff runs from the external
//! catalog (source) to a copy of the model (target); every change found under
//! a node marked [`ApplyDirection::ApplyToModel`] is undone on the model
//! itself.
//!
//! Objects of the three catalogs are related through an id mapping built by
//! walking them in parallel and matching children by name. Objects copied
//! from the external catalog keep pointing at external ids until
//! [`ChangesApplier::update_catalog`] redirects their references.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};

use crate::catalog::members::{member, members, owning_member, MemberAccess, Value, DONTDIFF_BOOKKEEPING};
use crate::catalog::types::{Catalog, ObjectId, ObjectKind, ObjectRef};
use crate::diff::change::{Change, ChangeId, ChangeTree};
use crate::error::Result;
use crate::sync::diff_tree::{ApplyDirection, DiffNode};
use crate::utils::naming::same_name;

/// What an apply pass did to the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplySummary {
    /// Objects copied back from the external catalog
    pub restored: usize,
    /// Objects removed from the model
    pub removed: usize,
    /// Objects whose members were reverted or reordered
    pub modified: usize,
    /// Foreign keys and indexes dropped because what they pointed at is gone
    pub dropped_references: Vec<String>,
}

impl ApplySummary {
    pub fn is_empty(&self) -> bool {
        self.restored == 0 && self.removed == 0 && self.modified == 0 && self.dropped_references.is_empty()
    }
}

/// Catalogs taking part in one apply pass
struct Sides<'a> {
    /// External catalog the diff started from
    source: &'a Catalog,
    /// Model copy the diff ended at
    target: &'a Catalog,
    changes: &'a ChangeTree,
}

pub struct ChangesApplier {
    case_sensitive: bool,
    mapping: HashMap<ObjectId, ObjectId>,
    secondary_mapping: HashMap<ObjectId, ObjectId>,
    processed_changes: HashSet<ChangeId>,
    removed_objects: HashSet<ObjectId>,
    summary: ApplySummary,
}

impl ChangesApplier {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            mapping: HashMap::new(),
            secondary_mapping: HashMap::new(),
            processed_changes: HashSet::new(),
            removed_objects: HashSet::new(),
            summary: ApplySummary::default(),
        }
    }

    /// Model object an id of another catalog stands for; ids not in the
    /// mapping stand for themselves
    pub fn mapped(&self, id: &ObjectId) -> ObjectId {
        self.mapping.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    pub fn summary(&self) -> &ApplySummary {
        &self.summary
    }

    fn names_match(&self, kind: ObjectKind, catalog: &Catalog, id: &ObjectId, model: &Catalog, model_id: &ObjectId) -> bool {
        if kind == ObjectKind::Catalog {
            return true;
        }
        let case_sensitive = matches!(kind, ObjectKind::Schema | ObjectKind::Table) && self.case_sensitive;
        let name = catalog.name_of(id);
        let model_old_name = model.old_name_of(model_id);
        same_name(&name, &model.name_of(model_id), case_sensitive)
            || (!model_old_name.is_empty() && same_name(&name, &model_old_name, case_sensitive))
    }

    /// Map `obj` of `catalog` onto `model_obj` of `model`, then its children
    ///
    /// Owned children are paired by name. References held by a paired object
    /// go to the secondary mapping. Returns false when the pair is rejected or
    /// already known.
    pub fn build_obj_mapping(
        &mut self,
        catalog: &Catalog,
        obj: &ObjectId,
        model: &Catalog,
        model_obj: &ObjectId,
        overwrite: bool,
    ) -> bool {
        let kind = match (catalog.kind_of(obj), model.kind_of(model_obj)) {
            (Some(left), Some(right)) if left == right => left,
            _ => return false,
        };
        if !self.names_match(kind, catalog, obj, model, model_obj) {
            return false;
        }
        if obj == model_obj || (!overwrite && self.mapping.contains_key(obj)) {
            return false;
        }
        self.mapping.insert(obj.clone(), model_obj.clone());

        for m in members(kind) {
            if m.skipped(DONTDIFF_BOOKKEEPING) {
                continue;
            }
            match &m.access {
                MemberAccess::Owned { child, .. } => {
                    let items = m.list(catalog, obj).unwrap_or_default();
                    let model_items = m.list(model, model_obj).unwrap_or_default();
                    for item in &items {
                        let counterpart = model_items
                            .iter()
                            .find(|candidate| self.names_match(*child, catalog, item, model, candidate))
                            .cloned();
                        if let Some(counterpart) = counterpart {
                            self.build_obj_mapping(catalog, item, model, &counterpart, overwrite);
                        }
                    }
                }
                MemberAccess::Reference { .. } => match (m.get(catalog, obj), m.get(model, model_obj)) {
                    (Some(Value::Ref(Some(left))), Some(Value::Ref(Some(right)))) => {
                        self.map_reference(catalog, &left, model, &right);
                    }
                    (Some(Value::RefList(left)), Some(Value::RefList(right))) => {
                        for item in &left {
                            let counterpart = right
                                .iter()
                                .find(|candidate| same_name(&catalog.name_of(item), &model.name_of(candidate), false))
                                .cloned();
                            if let Some(counterpart) = counterpart {
                                self.map_reference(catalog, item, model, &counterpart);
                            }
                        }
                    }
                    _ => {}
                },
                MemberAccess::Value { .. } => {}
            }
        }
        true
    }

    fn map_reference(&mut self, catalog: &Catalog, left: &ObjectId, model: &Catalog, right: &ObjectId) {
        if left != right && same_name(&catalog.name_of(left), &model.name_of(right), false) {
            self.secondary_mapping.insert(left.clone(), right.clone());
        }
    }

    /// Fill gaps of the primary mapping from the secondary one
    pub fn consolidate_mapping(&mut self) {
        for (from, to) in self.secondary_mapping.drain() {
            self.mapping.entry(from).or_insert(to);
        }
    }

    /// Apply the changes of the first `ApplyToModel` node on every path below `node`
    pub fn apply_node_to_model(
        &mut self,
        model: &mut Catalog,
        source: &Catalog,
        target: &Catalog,
        changes: &ChangeTree,
        node: &DiffNode,
    ) -> Result<()> {
        let sides = Sides {
            source,
            target,
            changes,
        };
        self.apply_node(model, &sides, node)
    }

    fn apply_node(&mut self, model: &mut Catalog, sides: &Sides<'_>, node: &DiffNode) -> Result<()> {
        if let (Some(change), ApplyDirection::ApplyToModel) = (node.change, node.direction) {
            let owner = node.object().and_then(|object| {
                if object.kind == ObjectKind::Catalog {
                    None
                } else if node.model_part.is_some() {
                    sides.target.owner_of(&object.id)
                } else {
                    sides.source.owner_of(&object.id)
                }
            });
            match owner {
                Some(owner) => {
                    let owner = self.mapped(&owner);
                    return self.apply_change(model, sides, change, &owner);
                }
                None => {
                    warn!(node = node.name(), "Cannot apply a change without an owner");
                    return Ok(());
                }
            }
        }
        for child in &node.children {
            self.apply_node(model, sides, child)?;
        }
        Ok(())
    }

    fn apply_change(&mut self, model: &mut Catalog, sides: &Sides<'_>, change: ChangeId, owner: &ObjectId) -> Result<()> {
        if !self.processed_changes.insert(change) {
            return Ok(());
        }
        match sides.changes.get(change) {
            Change::ListItemModified { old, new, subchange, .. } => {
                self.revert_members(model, sides, old, new, *subchange)
            }
            Change::ListItemRemoved { value, .. } => self.restore(model, sides, value, owner),
            Change::ListItemAdded { value, .. } => {
                self.remove(model, value);
                Ok(())
            }
            Change::ListItemOrderChanged { old, new, subchange, .. } => {
                self.reorder(model, sides, old, new, owner);
                match subchange {
                    Some(subchange) => self.revert_members(model, sides, old, new, *subchange),
                    None => Ok(()),
                }
            }
            Change::MultiChange { subchanges } => self.apply_list(model, sides, subchanges, owner),
            other => {
                debug!(change = other.type_name(), "Unhandled change");
                Ok(())
            }
        }
    }

    /// Apply one owned list; moves go last, in external order
    fn apply_list(&mut self, model: &mut Catalog, sides: &Sides<'_>, items: &[ChangeId], owner: &ObjectId) -> Result<()> {
        let mut moves = Vec::new();
        for item in items {
            match sides.changes.get(*item) {
                Change::ListItemOrderChanged { old, .. } => {
                    let position = sides
                        .source
                        .owner_of(&old.id)
                        .and_then(|o| self.external_position(sides.source, &o, old))
                        .unwrap_or(usize::MAX);
                    moves.push((position, *item));
                }
                _ => self.apply_change(model, sides, *item, owner)?,
            }
        }
        moves.sort_by_key(|(position, _)| *position);
        for (_, item) in moves {
            self.apply_change(model, sides, item, owner)?;
        }
        Ok(())
    }

    fn external_position(&self, source: &Catalog, owner: &ObjectId, object: &ObjectRef) -> Option<usize> {
        let owner_kind = source.kind_of(owner)?;
        let list = owning_member(owner_kind, object.kind)?.list(source, owner)?;
        list.iter().position(|id| *id == object.id)
    }

    /// Put the old member values back on the model object
    fn revert_members(
        &mut self,
        model: &mut Catalog,
        sides: &Sides<'_>,
        old: &ObjectRef,
        new: &ObjectRef,
        subchange: ChangeId,
    ) -> Result<()> {
        let object = self.mapped(&new.id);
        let kind = match model.kind_of(&object) {
            Some(kind) => kind,
            None => {
                warn!(kind = %new.kind, name = %new.name, "Modified object is not part of the model");
                return Ok(());
            }
        };

        for attr_change in sides.changes.children(subchange) {
            let (attr, value_change) = match sides.changes.get(attr_change) {
                Change::ObjectAttrModified { attr, subchange } => (attr.as_str(), *subchange),
                _ => continue,
            };
            match sides.changes.get(value_change) {
                Change::SimpleValue { old: value, .. } => match member(kind, attr) {
                    Some(m) => m.set(model, &object, value.clone()),
                    None => warn!(kind = %kind, attr, "Unknown member"),
                },
                Change::MultiChange { subchanges } => {
                    self.apply_list(model, sides, subchanges, &object)?;
                }
                other => debug!(attr, change = other.type_name(), "Unhandled member change"),
            }
        }

        self.build_obj_mapping(sides.source, &old.id, model, &object, false);
        self.summary.modified += 1;
        Ok(())
    }

    /// Copy an external object into the model, before the first following
    /// sibling that already has a model counterpart
    fn restore(&mut self, model: &mut Catalog, sides: &Sides<'_>, value: &ObjectRef, owner: &ObjectId) -> Result<()> {
        let owner_kind = match model.kind_of(owner) {
            Some(kind) => kind,
            None => {
                warn!(kind = %value.kind, name = %value.name, "Owner of restored object is not part of the model");
                return Ok(());
            }
        };
        let list_member = match owning_member(owner_kind, value.kind) {
            Some(m) => m,
            None => {
                warn!(owner = %owner_kind, kind = %value.kind, "No list to restore into");
                return Ok(());
            }
        };

        let external_list = sides
            .source
            .owner_of(&value.id)
            .and_then(|o| list_member.list(sides.source, &o))
            .unwrap_or_default();
        let mut model_list = list_member.list(model, owner).unwrap_or_default();
        let mut insert_at = model_list.len();
        if let Some(position) = external_list.iter().position(|id| *id == value.id) {
            for sibling in &external_list[position + 1..] {
                if let Some(mapped) = self.mapping.get(sibling) {
                    if let Some(index) = model_list.iter().position(|id| id == mapped) {
                        insert_at = index;
                        break;
                    }
                }
            }
        }

        let (copy, copies) = model.copy_subtree_from(sides.source, &value.id, owner)?;
        model_list.insert(insert_at, copy);
        list_member.set_list(model, owner, model_list);
        for (from, to) in copies {
            self.mapping.insert(from, to);
        }
        debug!(kind = %value.kind, name = %value.name, position = insert_at, "Restored object");
        self.summary.restored += 1;
        Ok(())
    }

    fn remove(&mut self, model: &mut Catalog, value: &ObjectRef) {
        let object = self.mapped(&value.id);
        let removed = model.remove_object(&object);
        if removed.is_empty() {
            warn!(kind = %value.kind, name = %value.name, "Added object is not part of the model");
            return;
        }
        debug!(kind = %value.kind, name = %value.name, nested = removed.len(), "Removed object");
        self.removed_objects.extend(removed);
        self.summary.removed += 1;
    }

    /// Move the model item right after the model counterpart of its external predecessor
    fn reorder(&mut self, model: &mut Catalog, sides: &Sides<'_>, old: &ObjectRef, new: &ObjectRef, owner: &ObjectId) {
        let list_member = match model.kind_of(owner).and_then(|k| owning_member(k, old.kind)) {
            Some(m) => m,
            None => return,
        };
        let external_list = sides
            .source
            .owner_of(&old.id)
            .and_then(|o| list_member.list(sides.source, &o))
            .unwrap_or_default();
        let mut list = list_member.list(model, owner).unwrap_or_default();
        let item = self.mapped(&new.id);
        let (external_position, current) = match (
            external_list.iter().position(|id| *id == old.id),
            list.iter().position(|id| *id == item),
        ) {
            (Some(e), Some(c)) => (e, c),
            _ => return,
        };

        list.remove(current);
        let anchor = external_list[..external_position]
            .iter()
            .rev()
            .filter_map(|id| self.mapping.get(id))
            .find_map(|mapped| list.iter().position(|id| id == mapped));
        let index = anchor.map_or(0, |a| a + 1);
        list.insert(index, item);
        list_member.set_list(model, owner, list);
        self.summary.modified += 1;
    }

    /// Redirect references to external ids onto model objects and drop
    /// foreign keys and indexes whose targets are gone
    pub fn update_catalog(&mut self, model: &mut Catalog) {
        for fk_id in model.all_foreign_keys() {
            let fk = match model.foreign_keys.get(&fk_id) {
                Some(fk) => fk.clone(),
                None => continue,
            };
            let table_name = model.table_of(&fk_id).map(|t| t.name.clone()).unwrap_or_default();
            let referenced_table = match &fk.referenced_table {
                Some(table) => table.clone(),
                None => {
                    error!(table = %table_name, fk = %fk.name, "Foreign key has no referenced table");
                    continue;
                }
            };

            let resolve = |id: &ObjectId, arena_has: &dyn Fn(&ObjectId) -> bool| -> Option<ObjectId> {
                if self.removed_objects.contains(id) {
                    return None;
                }
                let mapped = self.mapped(id);
                arena_has(&mapped).then_some(mapped)
            };
            let has_table = |id: &ObjectId| model.tables.contains_key(id);
            let has_column = |id: &ObjectId| model.columns.contains_key(id);

            let table = resolve(&referenced_table, &has_table);
            let columns: Option<Vec<ObjectId>> = fk.columns.iter().map(|c| resolve(c, &has_column)).collect();
            let referenced_columns: Option<Vec<ObjectId>> =
                fk.referenced_columns.iter().map(|c| resolve(c, &has_column)).collect();

            match (table, columns, referenced_columns) {
                (Some(table), Some(columns), Some(referenced_columns)) => {
                    if let Some(fk) = model.foreign_keys.get_mut(&fk_id) {
                        fk.referenced_table = Some(table);
                        fk.columns = columns;
                        fk.referenced_columns = referenced_columns;
                    }
                }
                _ => {
                    warn!(table = %table_name, fk = %fk.name, "Dropping foreign key with dangling references");
                    model.remove_object(&fk_id);
                    self.summary
                        .dropped_references
                        .push(format!("foreign key `{}`.`{}`", table_name, fk.name));
                }
            }
        }

        let index_ids: Vec<ObjectId> = model.indices.keys().cloned().collect();
        for index_id in index_ids {
            let column_ids = match model.indices.get(&index_id) {
                Some(index) => index.columns.clone(),
                None => continue,
            };
            let mut dangling = false;
            let mut remapped = Vec::new();
            for index_column in &column_ids {
                let column = match model.index_columns.get(index_column).and_then(|c| c.column.clone()) {
                    Some(column) => column,
                    None => continue,
                };
                let mapped = self.mapped(&column);
                if self.removed_objects.contains(&column) || !model.columns.contains_key(&mapped) {
                    dangling = true;
                    break;
                }
                remapped.push((index_column.clone(), mapped));
            }

            if dangling {
                let table_name = model.table_of(&index_id).map(|t| t.name.clone()).unwrap_or_default();
                let index_name = model.name_of(&index_id);
                warn!(table = %table_name, index = %index_name, "Dropping index over removed columns");
                model.remove_object(&index_id);
                self.summary
                    .dropped_references
                    .push(format!("index `{}`.`{}`", table_name, index_name));
            } else {
                for (index_column, column) in remapped {
                    if let Some(ic) = model.index_columns.get_mut(&index_column) {
                        ic.column = Some(column);
                    }
                }
            }
        }
    }

    /// Map, apply every `ApplyToModel` node under `root` and fix references
    pub fn apply_changes_to_model(
        &mut self,
        model: &mut Catalog,
        source: &Catalog,
        target: &Catalog,
        changes: &ChangeTree,
        root: &DiffNode,
    ) -> Result<ApplySummary> {
        self.build_obj_mapping(target, &target.id, model, &model.id, false);
        self.build_obj_mapping(source, &source.id, model, &model.id, false);
        self.consolidate_mapping();

        self.apply_node_to_model(model, source, target, changes, root)?;
        self.update_catalog(model);

        info!(
            restored = self.summary.restored,
            removed = self.summary.removed,
            modified = self.summary.modified,
            dropped = self.summary.dropped_references.len(),
            "Applied database changes to the model"
        );
        Ok(self.summary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, ForeignKey, Index, Schema, Table};
    use crate::diff::engine::diff_make;
    use crate::diff::omf::Omf;
    use crate::sync::diff_tree::{DiffNodeController, DiffTree, NodeId};
    use pretty_assertions::assert_eq;

    fn apply_all(model: &mut Catalog, external: &Catalog) -> ApplySummary {
        let copy = model.clone();
        let changes = diff_make(external, &copy, &Omf::new()).unwrap();
        let mut tree = DiffTree::new(&[], &copy, external, Some(changes), DiffNodeController::default());
        tree.set_apply_direction(&NodeId::root(), ApplyDirection::ApplyToModel, true)
            .unwrap();
        let changes = tree.changes().unwrap().clone();
        ChangesApplier::new(false)
            .apply_changes_to_model(model, external, &copy, &changes, tree.root())
            .unwrap()
    }

    #[test]
    fn test_build_obj_mapping_pairs_by_name() {
        let mut left = Catalog::new("def");
        let s1 = left.add_schema(Schema::new("s"));
        let t1 = left.add_table(&s1, Table::new("T")).unwrap();
        let c1 = left.add_column(&t1, Column::new("ID", "INT")).unwrap();

        let mut right = Catalog::new("def");
        let s2 = right.add_schema(Schema::new("s"));
        let t2 = right.add_table(&s2, Table::new("t")).unwrap();
        let c2 = right.add_column(&t2, Column::new("id", "INT")).unwrap();

        let mut applier = ChangesApplier::new(false);
        assert!(applier.build_obj_mapping(&left, &left.id, &right, &right.id, false));
        assert_eq!(applier.mapped(&t1), t2);
        assert_eq!(applier.mapped(&c1), c2);
        // Identical ids are never recorded
        assert!(!applier.build_obj_mapping(&right, &t2, &right, &t2, false));

        let mut strict = ChangesApplier::new(true);
        strict.build_obj_mapping(&left, &left.id, &right, &right.id, false);
        assert_eq!(strict.mapped(&t1), t1);
    }

    #[test]
    fn test_reverts_modified_column() {
        let mut external = Catalog::new("def");
        let s = external.add_schema(Schema::new("s"));
        let t = external.add_table(&s, Table::new("t")).unwrap();
        external.add_column(&t, Column::new("name", "VARCHAR(45)")).unwrap();

        let mut model = Catalog::new("def");
        let s = model.add_schema(Schema::new("s"));
        let t = model.add_table(&s, Table::new("t").comment("people")).unwrap();
        let c = model.add_column(&t, Column::new("name", "VARCHAR(100)").not_null(true)).unwrap();

        let summary = apply_all(&mut model, &external);
        assert_eq!(model.columns[&c].length, 45);
        assert!(!model.columns[&c].not_null);
        assert_eq!(model.tables[&t].comment, "");
        assert!(summary.modified >= 1);
        assert!(diff_make(&external, &model, &Omf::new()).is_none());
    }

    #[test]
    fn test_restores_dropped_table_and_remaps_foreign_keys() {
        let mut external = Catalog::new("def");
        let s = external.add_schema(Schema::new("s"));
        let parent = external.add_table(&s, Table::new("parent")).unwrap();
        external.add_column(&parent, Column::new("id", "INT")).unwrap();
        let child = external.add_table(&s, Table::new("child")).unwrap();
        external.add_column(&child, Column::new("parent_id", "INT")).unwrap();
        external
            .add_foreign_key(&child, ForeignKey::new("fk_parent"), &["parent_id"], &parent, &["id"])
            .unwrap();

        let mut model = Catalog::new("def");
        let s = model.add_schema(Schema::new("s"));
        let parent = model.add_table(&s, Table::new("parent")).unwrap();
        model.add_column(&parent, Column::new("id", "INT")).unwrap();

        let summary = apply_all(&mut model, &external);
        assert_eq!(summary.restored, 1);
        assert!(summary.dropped_references.is_empty());

        let child = model.find_table(&s, "child").unwrap();
        let fk_id = &model.tables[&child].foreign_keys[0];
        let fk = &model.foreign_keys[fk_id];
        assert_eq!(fk.referenced_table.as_ref(), Some(&parent));
        assert!(fk.referenced_columns.iter().all(|c| model.columns.contains_key(c)));
        assert!(diff_make(&external, &model, &Omf::new()).is_none());
    }

    #[test]
    fn test_removes_added_column_and_dependent_index() {
        let mut external = Catalog::new("def");
        let s = external.add_schema(Schema::new("s"));
        let t = external.add_table(&s, Table::new("t")).unwrap();
        external.add_column(&t, Column::new("id", "INT")).unwrap();

        let mut model = Catalog::new("def");
        let s = model.add_schema(Schema::new("s"));
        let t = model.add_table(&s, Table::new("t")).unwrap();
        model.add_column(&t, Column::new("id", "INT")).unwrap();
        model.add_column(&t, Column::new("extra", "INT")).unwrap();
        model.add_index(&t, Index::new("ix_extra", "INDEX"), &["extra"]).unwrap();

        let summary = apply_all(&mut model, &external);
        assert_eq!(model.column_names(&t), vec!["id".to_string()]);
        assert!(model.tables[&t].indices.is_empty());
        assert!(summary.removed >= 1);
        assert!(diff_make(&external, &model, &Omf::new()).is_none());
    }
}
