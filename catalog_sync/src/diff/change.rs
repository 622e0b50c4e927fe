//! Change-list model
//!
//! The diff result is a tree of [`Change`] nodes stored in an arena. Parent
//! links are plain [`ChangeId`]s used for navigation and tracing only.

use std::fmt;

use crate::catalog::members::Value;
use crate::catalog::types::ObjectRef;

/// Index of a node inside a [`ChangeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeId(usize);

impl ChangeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One typed difference
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A scalar member differs
    SimpleValue { old: Value, new: Value },
    /// The whole object only exists on the target side
    ValueAdded { value: ObjectRef },
    /// The whole object only exists on the source side
    ValueRemoved { value: ObjectRef },
    /// A named member differs; `subchange` describes how
    ObjectAttrModified { attr: String, subchange: ChangeId },
    /// Every difference found under one object or list
    MultiChange { subchanges: Vec<ChangeId> },
    ListItemAdded {
        value: ObjectRef,
        index: usize,
        prev: Option<ObjectRef>,
    },
    ListItemRemoved { value: ObjectRef, index: usize },
    ListItemModified {
        old: ObjectRef,
        new: ObjectRef,
        subchange: ChangeId,
        index: usize,
    },
    /// Same identity at a different position; `prev` is the target predecessor
    ListItemOrderChanged {
        old: ObjectRef,
        new: ObjectRef,
        prev: Option<ObjectRef>,
        subchange: Option<ChangeId>,
        index: usize,
    },
}

impl Change {
    pub fn type_name(&self) -> &'static str {
        match self {
            Change::SimpleValue { .. } => "SimpleValue",
            Change::ValueAdded { .. } => "ValueAdded",
            Change::ValueRemoved { .. } => "ValueRemoved",
            Change::ObjectAttrModified { .. } => "ObjectAttrModified",
            Change::MultiChange { .. } => "MultiChange",
            Change::ListItemAdded { .. } => "ListItemAdded",
            Change::ListItemRemoved { .. } => "ListItemRemoved",
            Change::ListItemModified { .. } => "ListItemModified",
            Change::ListItemOrderChanged { .. } => "ListItemOrderChanged",
        }
    }

    /// Direct child changes
    pub fn children(&self) -> Vec<ChangeId> {
        match self {
            Change::ObjectAttrModified { subchange, .. } | Change::ListItemModified { subchange, .. } => {
                vec![*subchange]
            }
            Change::ListItemOrderChanged {
                subchange: Some(subchange),
                ..
            } => vec![*subchange],
            Change::MultiChange { subchanges } => subchanges.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeNode {
    pub parent: Option<ChangeId>,
    pub change: Change,
}

/// Arena holding one diff result
#[derive(Debug, Clone, Default)]
pub struct ChangeTree {
    nodes: Vec<ChangeNode>,
    root: Option<ChangeId>,
}

impl ChangeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change; its children get their parent link set
    pub fn push(&mut self, change: Change) -> ChangeId {
        let id = ChangeId(self.nodes.len());
        for child in change.children() {
            if let Some(node) = self.nodes.get_mut(child.0) {
                node.parent = Some(id);
            }
        }
        self.nodes.push(ChangeNode { parent: None, change });
        id
    }

    pub fn set_root(&mut self, root: ChangeId) {
        self.root = Some(root);
    }

    /// The root change, or the last pushed node when no root was set
    pub fn root(&self) -> ChangeId {
        self.root.unwrap_or(ChangeId(self.nodes.len().saturating_sub(1)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root aggregates nothing
    pub fn is_empty(&self) -> bool {
        match self.nodes.get(self.root().0) {
            None => true,
            Some(node) => matches!(&node.change, Change::MultiChange { subchanges } if subchanges.is_empty()),
        }
    }

    pub fn get(&self, id: ChangeId) -> &Change {
        &self.nodes[id.0].change
    }

    pub fn parent(&self, id: ChangeId) -> Option<ChangeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ChangeId) -> Vec<ChangeId> {
        self.get(id).children()
    }

    pub fn subchange(&self, id: ChangeId) -> Option<ChangeId> {
        match self.get(id) {
            Change::ObjectAttrModified { subchange, .. } | Change::ListItemModified { subchange, .. } => {
                Some(*subchange)
            }
            Change::ListItemOrderChanged { subchange, .. } => *subchange,
            _ => None,
        }
    }

    /// Added or removed object
    pub fn value(&self, id: ChangeId) -> Option<&ObjectRef> {
        match self.get(id) {
            Change::ValueAdded { value }
            | Change::ValueRemoved { value }
            | Change::ListItemAdded { value, .. }
            | Change::ListItemRemoved { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn old_value(&self, id: ChangeId) -> Option<&ObjectRef> {
        match self.get(id) {
            Change::ListItemModified { old, .. } | Change::ListItemOrderChanged { old, .. } => Some(old),
            _ => None,
        }
    }

    pub fn new_value(&self, id: ChangeId) -> Option<&ObjectRef> {
        match self.get(id) {
            Change::ListItemModified { new, .. } | Change::ListItemOrderChanged { new, .. } => Some(new),
            _ => None,
        }
    }

    pub fn prev(&self, id: ChangeId) -> Option<&ObjectRef> {
        match self.get(id) {
            Change::ListItemAdded { prev, .. } | Change::ListItemOrderChanged { prev, .. } => prev.as_ref(),
            _ => None,
        }
    }

    pub fn index(&self, id: ChangeId) -> Option<usize> {
        match self.get(id) {
            Change::ListItemAdded { index, .. }
            | Change::ListItemRemoved { index, .. }
            | Change::ListItemModified { index, .. }
            | Change::ListItemOrderChanged { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn attr_name(&self, id: ChangeId) -> Option<&str> {
        match self.get(id) {
            Change::ObjectAttrModified { attr, .. } => Some(attr),
            _ => None,
        }
    }

    /// Name of the member a list item change belongs to
    pub fn owning_attr(&self, id: ChangeId) -> Option<&str> {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if let Some(attr) = self.attr_name(parent) {
                return Some(attr);
            }
            current = self.parent(parent);
        }
        None
    }

    /// Every change id in pre-order starting at the root
    pub fn iter(&self) -> impl Iterator<Item = ChangeId> + '_ {
        let mut stack = if self.nodes.is_empty() { Vec::new() } else { vec![self.root()] };
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.children(id).into_iter().rev());
            Some(id)
        })
    }

    /// Indented trace of a change and everything below it
    pub fn dump_log(&self, id: ChangeId, depth: usize) -> String {
        let mut out = String::new();
        self.write_log(&mut out, id, depth);
        out
    }

    fn write_log(&self, out: &mut String, id: ChangeId, depth: usize) {
        let indent = " ".repeat(depth * 2);
        let change = self.get(id);
        let detail = match change {
            Change::SimpleValue { old, new } => format!(" {} -> {}", old, new),
            Change::ValueAdded { value } | Change::ValueRemoved { value } => {
                format!(" {} {}", value.kind, value.name)
            }
            Change::ObjectAttrModified { attr, .. } => format!(" {}", attr),
            Change::MultiChange { .. } => String::new(),
            Change::ListItemAdded { value, index, prev } => format!(
                " {} {} at {} after {}",
                value.kind,
                value.name,
                index,
                prev.as_ref().map_or("<first>", |p| p.name.as_str())
            ),
            Change::ListItemRemoved { value, index } => format!(" {} {} at {}", value.kind, value.name, index),
            Change::ListItemModified { old, new, index, .. } => {
                format!(" {} {} -> {} at {}", old.kind, old.name, new.name, index)
            }
            Change::ListItemOrderChanged { old, new, prev, index, .. } => format!(
                " {} {} -> {} to {} after {}",
                old.kind,
                old.name,
                new.name,
                index,
                prev.as_ref().map_or("<first>", |p| p.name.as_str())
            ),
        };
        out.push_str(&format!("{}{}{}\n", indent, change.type_name(), detail));
        for child in change.children() {
            self.write_log(out, child, depth + 1);
        }
    }
}

impl fmt::Display for ChangeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return Ok(());
        }
        f.write_str(&self.dump_log(self.root(), 0))
    }
}
