use std::fmt::Debug;
use thiserror::Error;

#[allow(unused_imports)]
use crate::block::Block;

#[allow(unused_imports)]
use crate::schedule::Schedule;

/// [`ChronoSieveErrors`] is the main enum that contains all the errors which can be thrown by
/// ChronoSieve, it uses under the hood [`thiserror`] to make it as smooth sailing to add more
/// errors in the future as possible. Every fallible operation of the library surfaces one of
/// these variants, errors produced deep inside an evaluation propagate unchanged to the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChronoSieveErrors {
    /// This error is meant to happen when a schedule expression does not match the grammar,
    /// the first field carries the full offending expression and the second a short reason
    #[error("Failed to parse the schedule expression `{0}`: {1}")]
    ParseError(String, String),

    /// This error is meant to happen when a constructed value falls outside the bounds a
    /// field accepts, or when a schedule identifier is already taken while overwriting is
    /// disabled. The first field is the rejected value, the second describes what was expected
    #[error("Value `{0}` was rejected, expected {1}")]
    ValidationError(String, String),

    /// This error is meant to happen when retrieving or removing a value from a block that
    /// has a specified value list length, but the index is out of bounds
    #[error("Value index `{0}` is out of bounds for `{1}` with value list size `{2}` element(s)")]
    IndexOutOfBounds(usize, String, usize),

    /// This error is meant to happen when reference resolution fails during evaluation,
    /// either because no [`Schedule`] was supplied, the identifier is unknown, or the
    /// reference chain loops back onto itself
    #[error("Reference `{0}` cannot be resolved: {1}")]
    ReferenceError(String, String),

    /// This error is meant to happen when a reference or registry identifier contains
    /// anything other than ASCII alphanumeric characters
    #[error("Identifier `{0}` must consist of one or more alphanumeric characters")]
    InvalidID(String),
}
