//! Structural diff of two catalogs
//!
//! Objects are walked through their member descriptor tables. Owned lists
//! are matched by identity key, never by position; positional moves are
//! reported against the longest run of items that kept their relative order.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

use crate::catalog::keys::{match_key, qualified_key};
use crate::catalog::members::{members, MemberAccess, Value};
use crate::catalog::types::{Catalog, ObjectId, ObjectKind, ObjectRef};
use crate::diff::change::{Change, ChangeId, ChangeTree};
use crate::diff::omf::{CompareContext, Omf};
use crate::error::{Error, Result};

/// Diff two catalogs; `None` means no difference
pub fn diff_make(source: &Catalog, target: &Catalog, omf: &Omf) -> Option<ChangeTree> {
    let mut differ = Differ::new(source, target, omf);
    let root = differ.compare_object(ObjectKind::Catalog, &source.id, &target.id)?;
    let mut tree = differ.tree;
    tree.set_root(root);
    debug!(changes = tree.len(), "Catalog diff complete");
    Some(tree)
}

/// Diff any two objects of the same kind; either side may be absent
pub fn diff_objects(
    source: &Catalog,
    source_obj: Option<&ObjectRef>,
    target: &Catalog,
    target_obj: Option<&ObjectRef>,
    omf: &Omf,
) -> Result<Option<ChangeTree>> {
    let mut differ = Differ::new(source, target, omf);
    let root = match (source_obj, target_obj) {
        (None, None) => return Ok(None),
        (Some(value), None) => differ.tree.push(Change::ValueRemoved { value: value.clone() }),
        (None, Some(value)) => differ.tree.push(Change::ValueAdded { value: value.clone() }),
        (Some(s), Some(t)) => {
            if s.kind != t.kind {
                return Err(Error::usage(format!("Cannot diff a {} against a {}", s.kind, t.kind)));
            }
            if !source.contains(&s.id) || !target.contains(&t.id) {
                return Err(Error::usage("Diffed objects must belong to the given catalogs"));
            }
            match differ.compare_object(s.kind, &s.id, &t.id) {
                Some(root) => root,
                None => return Ok(None),
            }
        }
    };
    let mut tree = differ.tree;
    tree.set_root(root);
    Ok(Some(tree))
}

struct Differ<'a> {
    source: &'a Catalog,
    target: &'a Catalog,
    omf: &'a Omf,
    tree: ChangeTree,
}

impl<'a> Differ<'a> {
    fn new(source: &'a Catalog, target: &'a Catalog, omf: &'a Omf) -> Self {
        Self {
            source,
            target,
            omf,
            tree: ChangeTree::new(),
        }
    }

    fn source_ref(&self, id: &ObjectId) -> ObjectRef {
        self.source
            .object_ref(id)
            .unwrap_or_else(|| ObjectRef::new(ObjectKind::Catalog, id.clone(), ""))
    }

    fn target_ref(&self, id: &ObjectId) -> ObjectRef {
        self.target
            .object_ref(id)
            .unwrap_or_else(|| ObjectRef::new(ObjectKind::Catalog, id.clone(), ""))
    }

    /// Compare two objects member by member
    fn compare_object(&mut self, kind: ObjectKind, source_id: &ObjectId, target_id: &ObjectId) -> Option<ChangeId> {
        let mut attr_changes = Vec::new();

        for member in members(kind) {
            if member.skipped(self.omf.dontdiff_mask) {
                continue;
            }

            let subchange = match &member.access {
                MemberAccess::Value { get, .. } => {
                    let (old, new) = (get(self.source, source_id), get(self.target, target_id));
                    match (old, new) {
                        (Some(old), Some(new)) if !self.equal(kind, member.name, source_id, target_id, &old, &new) => {
                            Some(self.tree.push(Change::SimpleValue { old, new }))
                        }
                        _ => None,
                    }
                }
                MemberAccess::Reference { get, .. } => {
                    let (old, new) = (get(self.source, source_id), get(self.target, target_id));
                    match (old, new) {
                        (Some(old), Some(new)) if !self.references_equal(kind, member.name, source_id, target_id, &old, &new) => {
                            Some(self.tree.push(Change::SimpleValue { old, new }))
                        }
                        _ => None,
                    }
                }
                MemberAccess::Owned { child, get, .. } => {
                    let old = get(self.source, source_id).unwrap_or_default();
                    let new = get(self.target, target_id).unwrap_or_default();
                    self.diff_list(*child, &old, &new)
                }
            };

            if let Some(subchange) = subchange {
                trace!(kind = %kind, attr = member.name, "Member differs");
                attr_changes.push(self.tree.push(Change::ObjectAttrModified {
                    attr: member.name.to_string(),
                    subchange,
                }));
            }
        }

        if attr_changes.is_empty() {
            None
        } else {
            Some(self.tree.push(Change::MultiChange { subchanges: attr_changes }))
        }
    }

    fn equal(
        &self,
        kind: ObjectKind,
        attr: &str,
        source_id: &ObjectId,
        target_id: &ObjectId,
        old: &Value,
        new: &Value,
    ) -> bool {
        let ctx = CompareContext {
            source: self.source,
            target: self.target,
            kind,
            source_id,
            target_id,
            attr,
            omf: self.omf,
        };
        self.omf.values_equal(&ctx, old, new)
    }

    /// References are equal when they point at objects with the same identity key
    fn references_equal(
        &self,
        kind: ObjectKind,
        attr: &str,
        source_id: &ObjectId,
        target_id: &ObjectId,
        old: &Value,
        new: &Value,
    ) -> bool {
        if self.equal(kind, attr, source_id, target_id, old, new) {
            return true;
        }
        let case_sensitive = self.omf.case_sensitive;
        let source_key = |id: &ObjectId| qualified_key(self.source, id, case_sensitive);
        let target_key = |id: &ObjectId| qualified_key(self.target, id, case_sensitive);
        match (old, new) {
            (Value::Ref(None), Value::Ref(None)) => true,
            (Value::Ref(Some(l)), Value::Ref(Some(r))) => source_key(l) == target_key(r),
            (Value::RefList(l), Value::RefList(r)) => {
                l.len() == r.len() && l.iter().zip(r).all(|(a, b)| source_key(a) == target_key(b))
            }
            _ => false,
        }
    }

    /// Ordered list diff with identity matching by key
    fn diff_list(&mut self, kind: ObjectKind, source_items: &[ObjectId], target_items: &[ObjectId]) -> Option<ChangeId> {
        let case_sensitive = self.omf.case_sensitive;

        // Target positions per key; duplicates are consumed in order
        let mut positions: HashMap<String, VecDeque<usize>> = HashMap::new();
        for (j, id) in target_items.iter().enumerate() {
            let key = match_key(self.target, id, case_sensitive);
            if !key.is_empty() {
                positions.entry(key).or_default().push_back(j);
            }
        }

        let mut source_match: Vec<Option<usize>> = vec![None; source_items.len()];
        let mut target_match: Vec<Option<usize>> = vec![None; target_items.len()];
        for (i, id) in source_items.iter().enumerate() {
            let key = match_key(self.source, id, case_sensitive);
            if let Some(j) = positions.get_mut(&key).and_then(|queue| queue.pop_front()) {
                source_match[i] = Some(j);
                target_match[j] = Some(i);
            }
        }

        let in_place = stable_positions(&source_match);
        let mut changes = Vec::new();

        for (i, id) in source_items.iter().enumerate() {
            if source_match[i].is_none() {
                changes.push(self.tree.push(Change::ListItemRemoved {
                    value: self.source_ref(id),
                    index: i,
                }));
            }
        }

        for (j, id) in target_items.iter().enumerate() {
            let prev = (j > 0).then(|| self.target_ref(&target_items[j - 1]));
            match target_match[j] {
                None => {
                    changes.push(self.tree.push(Change::ListItemAdded {
                        value: self.target_ref(id),
                        index: j,
                        prev,
                    }));
                }
                Some(i) => {
                    let source_id = &source_items[i];
                    let subchange = self.compare_object(kind, source_id, id);
                    let old = self.source_ref(source_id);
                    let new = self.target_ref(id);
                    if !in_place.contains(&j) {
                        changes.push(self.tree.push(Change::ListItemOrderChanged {
                            old,
                            new,
                            prev,
                            subchange,
                            index: j,
                        }));
                    } else if let Some(subchange) = subchange {
                        changes.push(self.tree.push(Change::ListItemModified {
                            old,
                            new,
                            subchange,
                            index: j,
                        }));
                    }
                }
            }
        }

        if changes.is_empty() {
            None
        } else {
            Some(self.tree.push(Change::MultiChange { subchanges: changes }))
        }
    }
}

/// Target positions of the matched items that keep their relative order
///
/// Computes a longest increasing subsequence over the target positions taken
/// in source order; every matched item outside it has moved.
fn stable_positions(source_match: &[Option<usize>]) -> HashSet<usize> {
    let seq: Vec<usize> = source_match.iter().flatten().copied().collect();
    // tails[k] = index into seq of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (idx, value) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < *value);
        if pos > 0 {
            prev[idx] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(idx);
        } else {
            tails[pos] = idx;
        }
    }

    let mut result = HashSet::new();
    let mut current = tails.last().copied();
    while let Some(idx) = current {
        result.insert(seq[idx]);
        current = prev[idx];
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stable_positions_keeps_longest_run() {
        let matches = vec![Some(0), Some(2), Some(1), Some(3)];
        let stable = stable_positions(&matches);
        assert_eq!(stable.len(), 3);
        assert!(stable.contains(&0));
        assert!(stable.contains(&3));
    }

    #[test]
    fn test_stable_positions_skips_unmatched() {
        let matches = vec![Some(0), None, Some(1)];
        let stable = stable_positions(&matches);
        assert_eq!(stable, HashSet::from([0, 1]));
    }
}
