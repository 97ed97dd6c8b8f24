pub mod and; // skipcq: RS-D1001

pub mod date; // skipcq: RS-D1001

pub mod datetime; // skipcq: RS-D1001

pub mod month; // skipcq: RS-D1001

pub mod monthday; // skipcq: RS-D1001

pub mod not; // skipcq: RS-D1001

pub mod or; // skipcq: RS-D1001

pub mod reference; // skipcq: RS-D1001

pub mod time; // skipcq: RS-D1001

pub mod weekday; // skipcq: RS-D1001

pub mod year; // skipcq: RS-D1001

pub use crate::block::and::AndBlock;
pub use crate::block::date::DateField;
pub use crate::block::datetime::DateTimeField;
pub use crate::block::month::MonthField;
pub use crate::block::monthday::MonthDayField;
pub use crate::block::not::NotBlock;
pub use crate::block::or::OrBlock;
pub use crate::block::reference::ReferenceBlock;
pub use crate::block::time::TimeField;
pub use crate::block::weekday::WeekDayField;
pub use crate::block::year::YearField;

use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use crate::schedule::Schedule;
use std::cell::RefCell;
use std::fmt;

/// [`MergeState`] is the tri-valued annotation every block carries, controlling whether
/// adjacent or touching output intervals coalesce during evaluation
///
/// # Variants
/// The [`MergeState`] enum includes:
/// - [`MergeState::Default`] inherit the caller's merge argument (true at the root)
/// - [`MergeState::On`] force coalescing regardless of the caller
/// - [`MergeState::Off`] force per-unit output regardless of the caller
///
/// The resolved value is what a block applies locally **and** what it passes down to its
/// children as their caller argument, children with an explicit state override it again.
/// In the surface syntax the `~` prefix produces [`MergeState::On`] and `#` produces
/// [`MergeState::Off`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MergeState {
    #[default]
    Default,
    On,
    Off,
}

impl MergeState {
    /// Resolves the effective merge flag from this state and the caller's argument
    pub fn resolve(self, caller: bool) -> bool {
        match self {
            MergeState::Default => caller,
            MergeState::On => true,
            MergeState::Off => false,
        }
    }
}

pub(crate) fn merge_prefix(state: MergeState) -> &'static str {
    match state {
        MergeState::Default => "",
        MergeState::On => "~",
        MergeState::Off => "#",
    }
}

/// [`BlockGroup`] tags each block kind by evaluation cost, condition blocks sort their
/// children by this tag so cheap field predicates run before nested conditions and
/// registry lookups, letting AND empty-result short-circuits fire as early as possible
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockGroup {
    Field,
    Condition,
    Reference,
}

/// Per-evaluation state threaded through the recursion: the optional registry used to
/// resolve references, plus the stack of reference identifiers currently being expanded,
/// used to refuse cyclic reference chains instead of recursing forever
pub(crate) struct EvalScope<'a> {
    schedule: Option<&'a Schedule>,
    visiting: RefCell<Vec<String>>,
}

impl<'a> EvalScope<'a> {
    pub fn new(schedule: Option<&'a Schedule>) -> Self {
        Self {
            schedule,
            visiting: RefCell::new(Vec::new()),
        }
    }

    pub fn schedule(&self) -> Option<&'a Schedule> {
        self.schedule
    }

    pub fn enter(&self, id: &str) -> Result<(), ChronoSieveErrors> {
        let mut visiting = self.visiting.borrow_mut();
        if visiting.iter().any(|visited| visited == id) {
            return Err(ChronoSieveErrors::ReferenceError(
                id.to_owned(),
                "the reference chain loops back onto itself".to_owned(),
            ));
        }
        visiting.push(id.to_owned());
        Ok(())
    }

    pub fn exit(&self) {
        self.visiting.borrow_mut().pop();
    }
}

/// Accumulates calendar-unit results during a field walk: with merge on, consecutive
/// matching units extend one open run, a non-matching unit flushes it; with merge off
/// every matching unit is emitted on its own
pub(crate) struct RunAccumulator {
    out: Vec<Interval>,
    open: Option<Interval>,
    merge: bool,
}

impl RunAccumulator {
    pub fn new(merge: bool) -> Self {
        Self {
            out: Vec::new(),
            open: None,
            merge,
        }
    }

    pub fn push_unit(&mut self, unit: Interval, hit: bool) {
        if hit {
            if self.merge {
                match self.open.as_mut() {
                    Some(run) => run.end = unit.end,
                    None => self.open = Some(unit),
                }
            } else {
                self.out.push(unit);
            }
        } else if let Some(run) = self.open.take() {
            self.out.push(run);
        }
    }

    pub fn finish(mut self) -> Vec<Interval> {
        if let Some(run) = self.open.take() {
            self.out.push(run);
        }
        self.out
    }
}

/// Shared evaluation path of the date and datetime fields: sort the stored intervals,
/// coalesce them when the effective merge is on, then binary-search the slice touching the
/// domain and clip every kept interval to it
pub(crate) fn eval_stored_intervals(
    values: &[Interval],
    start: i64,
    end: i64,
    effective: bool,
) -> Vec<Interval> {
    let mut ranges = values.to_vec();
    ranges.sort_unstable();
    if effective {
        let mut coalesced = Vec::with_capacity(ranges.len());
        for range in ranges {
            crate::interval::push_merged(&mut coalesced, range, true);
        }
        ranges = coalesced;
    }
    // without coalescing the end positions are not monotone, so only the upper bound
    // can be binary-searched
    let lower = if effective {
        ranges.partition_point(|range| range.end < start)
    } else {
        0
    };
    let upper = ranges.partition_point(|range| range.start <= end);
    ranges[lower..upper]
        .iter()
        .filter_map(|range| range.clip(start, end))
        .collect()
}

/// [`Block`] is a node of the parsed expression tree and the basic unit of evaluation. The
/// eight field kinds each express one calendrical predicate, the three condition kinds
/// combine child blocks with boolean algebra, and [`Block::Reference`] delegates to a named
/// entry of a [`Schedule`]
///
/// # Evaluation
/// [`Block::evaluate`] walks the tree over an inclusive UTC millisecond domain and returns
/// the sorted list of intervals during which the expression holds, coalesced according to
/// the resolved [`MergeState`] of each node. [`Block::evaluate_timestamp`] answers the
/// membership question for a single timestamp without materializing intervals
///
/// # Construction
/// Blocks are produced by [`parse_expression`](crate::parser::parse_expression) or
/// assembled programmatically from the individual field and condition types, which all
/// convert into [`Block`] via ``From``
///
/// # Trait Implementation(s)
/// [`Block`] implements the [`Debug`], [`Clone`], [`PartialEq`] and
/// [`Display`](fmt::Display) traits, the latter printing a normalized surface form that
/// re-parses into a structurally equal tree
///
/// # See Also
/// - [`Schedule`]
/// - [`MergeState`]
/// - [`parse_expression`](crate::parser::parse_expression)
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Time(TimeField),
    WeekDay(WeekDayField),
    Month(MonthField),
    MonthDay(MonthDayField),
    Year(YearField),
    Date(DateField),
    DateTime(DateTimeField),
    Reference(ReferenceBlock),
    And(AndBlock),
    Or(OrBlock),
    Not(NotBlock),
}

macro_rules! for_each_block {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Block::Time($inner) => $body,
            Block::WeekDay($inner) => $body,
            Block::Month($inner) => $body,
            Block::MonthDay($inner) => $body,
            Block::Year($inner) => $body,
            Block::Date($inner) => $body,
            Block::DateTime($inner) => $body,
            Block::Reference($inner) => $body,
            Block::And($inner) => $body,
            Block::Or($inner) => $body,
            Block::Not($inner) => $body,
        }
    };
}

impl Block {
    /// Evaluates the block over the inclusive domain `[start, end]`
    ///
    /// # Argument(s)
    /// This method accepts the domain endpoints as UTC milliseconds since the Unix epoch,
    /// an optional [`Schedule`] used to resolve [`Block::Reference`] nodes, and the root
    /// ``merge`` argument which every [`MergeState::Default`] block inherits (pass ``true``
    /// for the canonical coalesced output)
    ///
    /// # Returns
    /// The sorted list of inclusive intervals within the domain during which the
    /// expression holds, or the first error raised while walking the tree
    ///
    /// # See Also
    /// - [`Block::evaluate_timestamp`]
    /// - [`Schedule::evaluate`]
    pub fn evaluate(
        &self,
        start: i64,
        end: i64,
        schedule: Option<&Schedule>,
        merge: bool,
    ) -> Result<Vec<Interval>, ChronoSieveErrors> {
        if start > end {
            return Err(ChronoSieveErrors::ValidationError(
                format!("[{start}, {end}]"),
                "an evaluation domain whose start does not exceed its end".to_owned(),
            ));
        }
        let scope = EvalScope::new(schedule);
        self.eval_in(start, end, merge, &scope)
    }

    /// Answers whether the expression holds at the single timestamp ``t``, resolving
    /// references through the optional ``schedule``
    ///
    /// # See Also
    /// - [`Block::evaluate`]
    pub fn evaluate_timestamp(
        &self,
        t: i64,
        schedule: Option<&Schedule>,
    ) -> Result<bool, ChronoSieveErrors> {
        let scope = EvalScope::new(schedule);
        self.eval_timestamp_in(t, &scope)
    }

    pub(crate) fn eval_in(
        &self,
        start: i64,
        end: i64,
        merge: bool,
        scope: &EvalScope<'_>,
    ) -> Result<Vec<Interval>, ChronoSieveErrors> {
        for_each_block!(self, inner => inner.eval_in(start, end, merge, scope))
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        for_each_block!(self, inner => inner.eval_timestamp_in(t, scope))
    }

    /// Memoized 64-bit structural hash covering the node kind, its values or children and
    /// its merge state. Clones share the hash, any mutation through the block mutators
    /// recomputes it lazily
    pub fn hash(&self) -> u64 {
        for_each_block!(self, inner => inner.hash())
    }

    pub fn merge_state(&self) -> MergeState {
        for_each_block!(self, inner => inner.merge_state())
    }

    pub fn set_merge_state(&mut self, state: MergeState) {
        for_each_block!(self, inner => inner.set_merge_state(state))
    }

    /// The evaluation-ordering group of this block kind
    pub fn block_group(&self) -> BlockGroup {
        match self {
            Block::Time(_)
            | Block::WeekDay(_)
            | Block::Month(_)
            | Block::MonthDay(_)
            | Block::Year(_)
            | Block::Date(_)
            | Block::DateTime(_) => BlockGroup::Field,
            Block::And(_) | Block::Or(_) | Block::Not(_) => BlockGroup::Condition,
            Block::Reference(_) => BlockGroup::Reference,
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for_each_block!(self, inner => fmt::Display::fmt(inner, f))
    }
}

macro_rules! block_from_impl {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Block {
            fn from(value: $ty) -> Self {
                Block::$variant(value)
            }
        }
    };
}

block_from_impl!(Time, TimeField);
block_from_impl!(WeekDay, WeekDayField);
block_from_impl!(Month, MonthField);
block_from_impl!(MonthDay, MonthDayField);
block_from_impl!(Year, YearField);
block_from_impl!(Date, DateField);
block_from_impl!(DateTime, DateTimeField);
block_from_impl!(Reference, ReferenceBlock);
block_from_impl!(And, AndBlock);
block_from_impl!(Or, OrBlock);
block_from_impl!(Not, NotBlock);

/// Generates the constraint-list plumbing shared by the four numeric fields: validated
/// construction, value accessors and mutators, bitmap compilation, merge-state handling,
/// the memoized structural hash and the surface-syntax [`Display`](fmt::Display) form
macro_rules! numeric_field {
    (
        $(#[$outer:meta])*
        $name:ident, $keyword:literal, $label:literal, $min:literal, $max:literal, $tag:literal
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone)]
        pub struct $name {
            values: Vec<crate::value::FieldValue>,
            bitmap: crate::bitmap::Bitmap,
            merge: crate::block::MergeState,
            hash_cache: std::sync::OnceLock<u64>,
        }

        impl $name {
            pub const MIN: i32 = $min;
            pub const MAX: i32 = $max;

            /// Constructs the field from a list of numeric constraints, every constraint
            /// is validated against the field bounds before the bitmap is compiled
            pub fn new(
                values: Vec<crate::value::FieldValue>,
            ) -> Result<Self, crate::errors::ChronoSieveErrors> {
                let mut field = Self {
                    values: Vec::new(),
                    bitmap: crate::bitmap::Bitmap::new((Self::MAX - Self::MIN + 1) as usize),
                    merge: crate::block::MergeState::Default,
                    hash_cache: std::sync::OnceLock::new(),
                };
                field.set_values(values)?;
                Ok(field)
            }

            pub fn values(&self) -> &[crate::value::FieldValue] {
                &self.values
            }

            /// Replaces the whole constraint list, rejecting the batch when any entry is
            /// out of bounds
            pub fn set_values(
                &mut self,
                values: Vec<crate::value::FieldValue>,
            ) -> Result<(), crate::errors::ChronoSieveErrors> {
                for value in &values {
                    value.validate(Self::MIN, Self::MAX, $label)?;
                }
                self.values = values;
                self.rebuild();
                Ok(())
            }

            pub fn add_value(
                &mut self,
                value: crate::value::FieldValue,
            ) -> Result<(), crate::errors::ChronoSieveErrors> {
                value.validate(Self::MIN, Self::MAX, $label)?;
                self.values.push(value);
                self.rebuild();
                Ok(())
            }

            pub fn add_value_at(
                &mut self,
                value: crate::value::FieldValue,
                index: usize,
            ) -> Result<(), crate::errors::ChronoSieveErrors> {
                if index > self.values.len() {
                    return Err(crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.values.len(),
                    ));
                }
                value.validate(Self::MIN, Self::MAX, $label)?;
                self.values.insert(index, value);
                self.rebuild();
                Ok(())
            }

            pub fn get_value(
                &self,
                index: usize,
            ) -> Result<crate::value::FieldValue, crate::errors::ChronoSieveErrors> {
                self.values.get(index).copied().ok_or_else(|| {
                    crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.values.len(),
                    )
                })
            }

            pub fn remove_value(
                &mut self,
                index: usize,
            ) -> Result<crate::value::FieldValue, crate::errors::ChronoSieveErrors> {
                if index >= self.values.len() {
                    return Err(crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.values.len(),
                    ));
                }
                let removed = self.values.remove(index);
                self.rebuild();
                Ok(removed)
            }

            pub fn merge_state(&self) -> crate::block::MergeState {
                self.merge
            }

            pub fn set_merge_state(&mut self, state: crate::block::MergeState) {
                self.merge = state;
                self.hash_cache = std::sync::OnceLock::new();
            }

            pub fn hash(&self) -> u64 {
                *self.hash_cache.get_or_init(|| {
                    use std::hash::{Hash, Hasher};
                    let mut hasher = std::hash::DefaultHasher::new();
                    hasher.write_u8($tag);
                    self.merge.hash(&mut hasher);
                    for value in &self.values {
                        value.hash(&mut hasher);
                    }
                    hasher.finish()
                })
            }

            pub(crate) fn matches(&self, unit: i32) -> bool {
                unit >= Self::MIN
                    && unit <= Self::MAX
                    && self.bitmap.get((unit - Self::MIN) as usize)
            }

            pub(crate) fn is_empty_field(&self) -> bool {
                self.values.is_empty()
            }

            pub(crate) fn covers_everything(&self) -> bool {
                self.bitmap.is_full()
            }

            fn rebuild(&mut self) {
                let mut bitmap =
                    crate::bitmap::Bitmap::new((Self::MAX - Self::MIN + 1) as usize);
                for value in &self.values {
                    value.for_each_match(Self::MIN, Self::MAX, |v| {
                        bitmap.set((v - Self::MIN) as usize);
                    });
                }
                self.bitmap = bitmap;
                self.hash_cache = std::sync::OnceLock::new();
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.values == other.values && self.merge == other.merge
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", crate::block::merge_prefix(self.merge))?;
                f.write_str(concat!($keyword, "["))?;
                for (index, value) in self.values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    };
}
pub(crate) use numeric_field;

/// Generates the child-list plumbing shared by [`AndBlock`] and [`OrBlock`]: construction,
/// child accessors and mutators, merge-state handling, the memoized structural hash and
/// the parenthesized [`Display`](fmt::Display) form
macro_rules! condition_children_methods {
    ($name:ident, $label:literal, $sep:literal, $tag:literal) => {
        impl $name {
            pub fn new(children: Vec<crate::block::Block>) -> Self {
                Self {
                    children,
                    merge: crate::block::MergeState::Default,
                    hash_cache: std::sync::OnceLock::new(),
                }
            }

            pub fn children(&self) -> &[crate::block::Block] {
                &self.children
            }

            pub fn add_child(&mut self, child: crate::block::Block) {
                self.children.push(child);
                self.invalidate();
            }

            pub fn add_child_at(
                &mut self,
                child: crate::block::Block,
                index: usize,
            ) -> Result<(), crate::errors::ChronoSieveErrors> {
                if index > self.children.len() {
                    return Err(crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.children.len(),
                    ));
                }
                self.children.insert(index, child);
                self.invalidate();
                Ok(())
            }

            pub fn get_child(
                &self,
                index: usize,
            ) -> Result<&crate::block::Block, crate::errors::ChronoSieveErrors> {
                self.children.get(index).ok_or_else(|| {
                    crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.children.len(),
                    )
                })
            }

            pub fn remove_child(
                &mut self,
                index: usize,
            ) -> Result<crate::block::Block, crate::errors::ChronoSieveErrors> {
                if index >= self.children.len() {
                    return Err(crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.children.len(),
                    ));
                }
                let removed = self.children.remove(index);
                self.invalidate();
                Ok(removed)
            }

            pub fn merge_state(&self) -> crate::block::MergeState {
                self.merge
            }

            pub fn set_merge_state(&mut self, state: crate::block::MergeState) {
                self.merge = state;
                self.invalidate();
            }

            pub fn hash(&self) -> u64 {
                *self.hash_cache.get_or_init(|| {
                    use std::hash::{Hash, Hasher};
                    let mut hasher = std::hash::DefaultHasher::new();
                    hasher.write_u8($tag);
                    self.merge.hash(&mut hasher);
                    for child in &self.children {
                        hasher.write_u64(child.hash());
                    }
                    hasher.finish()
                })
            }

            fn invalidate(&mut self) {
                self.hash_cache = std::sync::OnceLock::new();
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.children == other.children && self.merge == other.merge
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", crate::block::merge_prefix(self.merge))?;
                f.write_str("(")?;
                for (index, child) in self.children.iter().enumerate() {
                    if index > 0 {
                        f.write_str($sep)?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    };
}
pub(crate) use condition_children_methods;

/// Generates the interval-list plumbing shared by the time, date and datetime fields,
/// expecting the host to provide ``fn validate_value(&Interval) -> Result<(), _>``
macro_rules! interval_field_methods {
    ($name:ident, $label:literal, $tag:literal) => {
        impl $name {
            /// Constructs the field from a list of interval values, every value is run
            /// through the field's validator
            pub fn new(
                values: Vec<crate::interval::Interval>,
            ) -> Result<Self, crate::errors::ChronoSieveErrors> {
                let mut field = Self {
                    values: Vec::new(),
                    merge: crate::block::MergeState::Default,
                    hash_cache: std::sync::OnceLock::new(),
                };
                field.set_values(values)?;
                Ok(field)
            }

            pub fn values(&self) -> &[crate::interval::Interval] {
                &self.values
            }

            pub fn set_values(
                &mut self,
                values: Vec<crate::interval::Interval>,
            ) -> Result<(), crate::errors::ChronoSieveErrors> {
                for value in &values {
                    Self::validate_value(value)?;
                }
                self.values = values;
                self.invalidate();
                Ok(())
            }

            pub fn add_value(
                &mut self,
                value: crate::interval::Interval,
            ) -> Result<(), crate::errors::ChronoSieveErrors> {
                Self::validate_value(&value)?;
                self.values.push(value);
                self.invalidate();
                Ok(())
            }

            pub fn add_value_at(
                &mut self,
                value: crate::interval::Interval,
                index: usize,
            ) -> Result<(), crate::errors::ChronoSieveErrors> {
                if index > self.values.len() {
                    return Err(crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.values.len(),
                    ));
                }
                Self::validate_value(&value)?;
                self.values.insert(index, value);
                self.invalidate();
                Ok(())
            }

            pub fn get_value(
                &self,
                index: usize,
            ) -> Result<crate::interval::Interval, crate::errors::ChronoSieveErrors> {
                self.values.get(index).copied().ok_or_else(|| {
                    crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.values.len(),
                    )
                })
            }

            pub fn remove_value(
                &mut self,
                index: usize,
            ) -> Result<crate::interval::Interval, crate::errors::ChronoSieveErrors> {
                if index >= self.values.len() {
                    return Err(crate::errors::ChronoSieveErrors::IndexOutOfBounds(
                        index,
                        $label.to_owned(),
                        self.values.len(),
                    ));
                }
                let removed = self.values.remove(index);
                self.invalidate();
                Ok(removed)
            }

            pub fn merge_state(&self) -> crate::block::MergeState {
                self.merge
            }

            pub fn set_merge_state(&mut self, state: crate::block::MergeState) {
                self.merge = state;
                self.invalidate();
            }

            pub fn hash(&self) -> u64 {
                *self.hash_cache.get_or_init(|| {
                    use std::hash::{Hash, Hasher};
                    let mut hasher = std::hash::DefaultHasher::new();
                    hasher.write_u8($tag);
                    self.merge.hash(&mut hasher);
                    for value in &self.values {
                        value.hash(&mut hasher);
                    }
                    hasher.finish()
                })
            }

            fn invalidate(&mut self) {
                self.hash_cache = std::sync::OnceLock::new();
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.values == other.values && self.merge == other.merge
            }
        }
    };
}
pub(crate) use interval_field_methods;
