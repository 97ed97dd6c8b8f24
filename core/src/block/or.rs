use crate::block::{Block, EvalScope, MergeState, condition_children_methods};
use crate::errors::ChronoSieveErrors;
use crate::interval::{self, Interval};
use std::sync::OnceLock;

/// [`OrBlock`] holds an ordered list of child blocks and produces the sweep-line union
/// of their evaluations, the expression is "on" while at least one child is. The surface
/// forms are `a OR b` and the shorthand `a , b`, consecutive disjunctions flatten into
/// one multi-child block
#[derive(Debug, Clone)]
pub struct OrBlock {
    children: Vec<Block>,
    merge: MergeState,
    hash_cache: OnceLock<u64>,
}

condition_children_methods!(OrBlock, "OrBlock", " OR ", 10);

impl OrBlock {
    pub(crate) fn eval_in(
        &self,
        start: i64,
        end: i64,
        merge: bool,
        scope: &EvalScope<'_>,
    ) -> Result<Vec<Interval>, ChronoSieveErrors> {
        if self.children.is_empty() {
            return Ok(Vec::new());
        }
        let effective = self.merge.resolve(merge);
        let mut order: Vec<&Block> = self.children.iter().collect();
        order.sort_by_key(|child| child.block_group());

        let mut results = Vec::new();
        for child in order {
            let intervals = child.eval_in(start, end, effective, scope)?;
            if !intervals.is_empty() {
                results.push(intervals);
            }
        }
        Ok(interval::union(&results, effective))
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        let mut order: Vec<&Block> = self.children.iter().collect();
        order.sort_by_key(|child| child.block_group());
        for child in order {
            if child.eval_timestamp_in(t, scope)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
