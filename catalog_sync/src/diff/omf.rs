//! Object match policy
//!
//! Controls which members are compared and how: the dontdiff mask, case
//! sensitivity and per-member comparator overrides.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::catalog::members::{Value, DONTDIFF_BOOKKEEPING, DONTDIFF_SERVER_STATE};
use crate::catalog::types::{Catalog, ObjectId, ObjectKind};
use crate::config::ComparisonConfig;

/// Everything a comparator may inspect besides the two values
pub struct CompareContext<'a> {
    pub source: &'a Catalog,
    pub target: &'a Catalog,
    pub kind: ObjectKind,
    pub source_id: &'a ObjectId,
    pub target_id: &'a ObjectId,
    pub attr: &'a str,
    pub omf: &'a Omf,
}

/// Returns true when the two values must be treated as equal
pub type Comparator = Arc<dyn Fn(&CompareContext<'_>, &Value, &Value) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Omf {
    pub dontdiff_mask: u32,
    pub case_sensitive: bool,
    pub skip_routine_definer: bool,
    overrides: HashMap<String, Vec<Comparator>>,
}

impl Default for Omf {
    fn default() -> Self {
        Self {
            dontdiff_mask: DONTDIFF_BOOKKEEPING | DONTDIFF_SERVER_STATE,
            case_sensitive: false,
            skip_routine_definer: false,
            overrides: HashMap::new(),
        }
    }
}

impl fmt::Debug for Omf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attrs: Vec<&String> = self.overrides.keys().collect();
        attrs.sort();
        f.debug_struct("Omf")
            .field("dontdiff_mask", &self.dontdiff_mask)
            .field("case_sensitive", &self.case_sensitive)
            .field("skip_routine_definer", &self.skip_routine_definer)
            .field("overrides", &attrs)
            .finish()
    }
}

impl Omf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ComparisonConfig) -> Self {
        Self {
            dontdiff_mask: config.dontdiff_mask,
            case_sensitive: config.case_sensitive,
            skip_routine_definer: config.skip_routine_definer,
            overrides: HashMap::new(),
        }
    }

    /// Register a comparator for a member name
    pub fn add_override<F>(&mut self, attr: &str, comparator: F)
    where
        F: Fn(&CompareContext<'_>, &Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.overrides
            .entry(attr.to_string())
            .or_default()
            .push(Arc::new(comparator));
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    pub fn has_override(&self, attr: &str) -> bool {
        self.overrides.get(attr).map_or(false, |list| !list.is_empty())
    }

    /// Compare two member values: any matching override wins, then plain equality
    pub fn values_equal(&self, ctx: &CompareContext<'_>, left: &Value, right: &Value) -> bool {
        if let Some(comparators) = self.overrides.get(ctx.attr) {
            if comparators.iter().any(|cmp| cmp(ctx, left, right)) {
                return true;
            }
        }
        left == right
    }
}
