use crate::block::{Block, EvalScope, MergeState, merge_prefix};
use crate::errors::ChronoSieveErrors;
use crate::interval::{self, Interval};
use std::fmt;
use std::sync::OnceLock;

/// [`NotBlock`] inverts its single optional child: the expression is "on" exactly while
/// the child is not, computed as the sweep-line complement of the child's evaluation
/// against the domain. A childless NOT is always on and evaluates to the whole domain.
/// The surface forms are `NOT a` and the shorthand `! a`
#[derive(Debug, Clone)]
pub struct NotBlock {
    child: Option<Box<Block>>,
    merge: MergeState,
    hash_cache: OnceLock<u64>,
}

impl NotBlock {
    pub fn new(child: Option<Block>) -> Self {
        Self {
            child: child.map(Box::new),
            merge: MergeState::Default,
            hash_cache: OnceLock::new(),
        }
    }

    pub fn child(&self) -> Option<&Block> {
        self.child.as_deref()
    }

    /// Mutable access to the child, the memoized hash is discarded since the caller may
    /// change anything the hash depends on
    pub fn child_mut(&mut self) -> Option<&mut Block> {
        self.hash_cache = OnceLock::new();
        self.child.as_deref_mut()
    }

    pub fn set_child(&mut self, child: Option<Block>) {
        self.child = child.map(Box::new);
        self.hash_cache = OnceLock::new();
    }

    pub fn merge_state(&self) -> MergeState {
        self.merge
    }

    pub fn set_merge_state(&mut self, state: MergeState) {
        self.merge = state;
        self.hash_cache = OnceLock::new();
    }

    pub fn hash(&self) -> u64 {
        *self.hash_cache.get_or_init(|| {
            use std::hash::{Hash, Hasher};
            let mut hasher = std::hash::DefaultHasher::new();
            hasher.write_u8(11);
            self.merge.hash(&mut hasher);
            match &self.child {
                Some(child) => {
                    hasher.write_u8(1);
                    hasher.write_u64(child.hash());
                }
                None => hasher.write_u8(0),
            }
            hasher.finish()
        })
    }

    pub(crate) fn eval_in(
        &self,
        start: i64,
        end: i64,
        merge: bool,
        scope: &EvalScope<'_>,
    ) -> Result<Vec<Interval>, ChronoSieveErrors> {
        let effective = self.merge.resolve(merge);
        match &self.child {
            None => Ok(vec![Interval::raw(start, end)]),
            Some(child) => {
                let intervals = child.eval_in(start, end, effective, scope)?;
                Ok(interval::complement(&intervals, start, end, effective))
            }
        }
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        match &self.child {
            None => Ok(true),
            Some(child) => Ok(!child.eval_timestamp_in(t, scope)?),
        }
    }
}

impl PartialEq for NotBlock {
    fn eq(&self, other: &Self) -> bool {
        self.child == other.child && self.merge == other.merge
    }
}

impl fmt::Display for NotBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}NOT (", merge_prefix(self.merge))?;
        if let Some(child) = &self.child {
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}
