use crate::block::{Block, EvalScope, MergeState, merge_prefix};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// [`ReferenceBlock`] delegates evaluation to a named entry of the
/// [`Schedule`](crate::schedule::Schedule) registry. It owns only the alphanumeric
/// identifier, the referenced block stays owned by the registry. The surface form is
/// `REF[...]`, e.g. `REF[businesshours]`
///
/// # Merge Semantics
/// The reference resolves its own effective merge from its state and the caller's
/// argument, then passes that resolved value into the referenced tree, where the
/// referenced blocks' own explicit states may override it again
///
/// # Failure Modes
/// Evaluation raises a [`ChronoSieveErrors::ReferenceError`] when no registry was
/// supplied, when the identifier is unknown, or when the reference chain loops back
/// onto an identifier already being expanded
#[derive(Debug, Clone)]
pub struct ReferenceBlock {
    id: String,
    merge: MergeState,
    hash_cache: OnceLock<u64>,
}

impl ReferenceBlock {
    /// Constructs / Creates a [`ReferenceBlock`] from an identifier, rejecting anything
    /// that is not composed of one or more ASCII alphanumeric characters with a
    /// [`ChronoSieveErrors::InvalidID`]
    pub fn new(id: impl Into<String>) -> Result<Self, ChronoSieveErrors> {
        let id = id.into();
        if id.is_empty() || !id.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
            return Err(ChronoSieveErrors::InvalidID(id));
        }
        Ok(Self {
            id,
            merge: MergeState::Default,
            hash_cache: OnceLock::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
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
            hasher.write_u8(8);
            self.merge.hash(&mut hasher);
            self.id.hash(&mut hasher);
            hasher.finish()
        })
    }

    fn resolve_block(&self, scope: &EvalScope<'_>) -> Result<Arc<Block>, ChronoSieveErrors> {
        let Some(schedule) = scope.schedule() else {
            return Err(ChronoSieveErrors::ReferenceError(
                self.id.clone(),
                "no schedule was provided for resolution".to_owned(),
            ));
        };
        schedule.resolve(&self.id).ok_or_else(|| {
            ChronoSieveErrors::ReferenceError(
                self.id.clone(),
                "no entry with this identifier exists".to_owned(),
            )
        })
    }

    pub(crate) fn eval_in(
        &self,
        start: i64,
        end: i64,
        merge: bool,
        scope: &EvalScope<'_>,
    ) -> Result<Vec<Interval>, ChronoSieveErrors> {
        let block = self.resolve_block(scope)?;
        let effective = self.merge.resolve(merge);
        scope.enter(&self.id)?;
        let result = block.eval_in(start, end, effective, scope);
        scope.exit();
        result
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        let block = self.resolve_block(scope)?;
        scope.enter(&self.id)?;
        let result = block.eval_timestamp_in(t, scope);
        scope.exit();
        result
    }
}

impl PartialEq for ReferenceBlock {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.merge == other.merge
    }
}

impl fmt::Display for ReferenceBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}REF[{}]", merge_prefix(self.merge), self.id)
    }
}
