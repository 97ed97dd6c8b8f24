use crate::block::{Block, EvalScope, MergeState, condition_children_methods};
use crate::errors::ChronoSieveErrors;
use crate::interval::{self, Interval};
use std::sync::OnceLock;

/// [`AndBlock`] holds an ordered list of child blocks and produces the sweep-line
/// intersection of their evaluations, the expression is "on" only while every child is.
/// The surface forms are `a AND b` and the shorthand `a . b`, consecutive conjunctions
/// flatten into one multi-child block
///
/// # Evaluation Order
/// Children are evaluated cheapest group first (fields, then conditions, then
/// references), and the block short-circuits to an empty result as soon as any child
/// produces no intervals
#[derive(Debug, Clone)]
pub struct AndBlock {
    children: Vec<Block>,
    merge: MergeState,
    hash_cache: OnceLock<u64>,
}

condition_children_methods!(AndBlock, "AndBlock", " AND ", 9);

impl AndBlock {
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

        let mut results = Vec::with_capacity(order.len());
        for child in order {
            let intervals = child.eval_in(start, end, effective, scope)?;
            if intervals.is_empty() {
                return Ok(Vec::new());
            }
            results.push(intervals);
        }
        Ok(interval::intersection(&results, effective))
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        if self.children.is_empty() {
            return Ok(false);
        }
        let mut order: Vec<&Block> = self.children.iter().collect();
        order.sort_by_key(|child| child.block_group());
        for child in order {
            if !child.eval_timestamp_in(t, scope)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
