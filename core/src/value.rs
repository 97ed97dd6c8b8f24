use crate::errors::ChronoSieveErrors;
use std::fmt;

/// Lowest factor / offset bound shared by every algebraic constraint, regardless of which
/// field hosts it
pub const ALGEBRAIC_FACTOR_MIN: i32 = 1;

/// Highest factor / offset bound shared by every algebraic constraint
pub const ALGEBRAIC_BOUND_MAX: i32 = 9998;

/// [`AlgebraicOp`] selects the sign of the offset inside an algebraic constraint,
/// `an+b` versus `an-b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgebraicOp {
    Add,
    Sub,
}

/// [`FieldValue`] is a numeric constraint hosted by the weekday, month, month-day and year
/// fields. It comes in three shapes:
/// - [`FieldValue::Single`] matches exactly one value
/// - [`FieldValue::Range`] matches every value of an inclusive range
/// - [`FieldValue::Algebraic`] matches the arithmetic sequence `a·n + b` (or `a·n − b`),
///   enumerated only within the hosting field's bounds
///
/// # Trait Implementation(s)
/// [`FieldValue`] implements the [`Debug`], [`Clone`], [`Copy`], [`PartialEq`], [`Eq`],
/// [`Hash`] and [`Display`](fmt::Display) traits, the latter producing the surface syntax
/// form (`5`, `1..5`, `2n+1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Single(i32),
    Range(i32, i32),
    Algebraic(i32, AlgebraicOp, i32),
}

impl FieldValue {
    /// Validates the constraint against the hosting field's inclusive `[min, max]` bounds,
    /// ``field`` names the host in the produced error
    pub(crate) fn validate(
        &self,
        min: i32,
        max: i32,
        field: &str,
    ) -> Result<(), ChronoSieveErrors> {
        let out_of_bounds = |value: i32| {
            ChronoSieveErrors::ValidationError(
                value.to_string(),
                format!("a value between {min} and {max} for {field}"),
            )
        };
        match *self {
            FieldValue::Single(value) => {
                if value < min || value > max {
                    return Err(out_of_bounds(value));
                }
            }
            FieldValue::Range(start, end) => {
                if start > end {
                    return Err(ChronoSieveErrors::ValidationError(
                        format!("{start}..{end}"),
                        format!("a range whose start does not exceed its end for {field}"),
                    ));
                }
                if start < min || start > max {
                    return Err(out_of_bounds(start));
                }
                if end < min || end > max {
                    return Err(out_of_bounds(end));
                }
            }
            FieldValue::Algebraic(factor, _, offset) => {
                if factor < ALGEBRAIC_FACTOR_MIN || factor > ALGEBRAIC_BOUND_MAX {
                    return Err(ChronoSieveErrors::ValidationError(
                        factor.to_string(),
                        format!(
                            "an algebraic factor between {ALGEBRAIC_FACTOR_MIN} and \
                            {ALGEBRAIC_BOUND_MAX}"
                        ),
                    ));
                }
                if offset < 0 || offset > ALGEBRAIC_BOUND_MAX {
                    return Err(ChronoSieveErrors::ValidationError(
                        offset.to_string(),
                        format!("an algebraic offset between 0 and {ALGEBRAIC_BOUND_MAX}"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Invokes ``visit`` for every matching value within `[min, max]`, in ascending order
    /// for the single and range shapes and in sequence order for the algebraic shape.
    /// Additive sequences start at `n = 0` so the bare offset itself is a member,
    /// subtractive sequences start at `n = 1`
    pub(crate) fn for_each_match(&self, min: i32, max: i32, mut visit: impl FnMut(i32)) {
        match *self {
            FieldValue::Single(value) => {
                if value >= min && value <= max {
                    visit(value);
                }
            }
            FieldValue::Range(start, end) => {
                for value in start.max(min)..=end.min(max) {
                    visit(value);
                }
            }
            FieldValue::Algebraic(factor, op, offset) => {
                let (mut n, signed_offset) = match op {
                    AlgebraicOp::Add => (0i64, i64::from(offset)),
                    AlgebraicOp::Sub => (1i64, -i64::from(offset)),
                };
                loop {
                    let value = i64::from(factor) * n + signed_offset;
                    if value > i64::from(max) {
                        break;
                    }
                    if value >= i64::from(min) {
                        visit(value as i32);
                    }
                    n += 1;
                }
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FieldValue::Single(value) => write!(f, "{value}"),
            FieldValue::Range(start, end) => write!(f, "{start}..{end}"),
            FieldValue::Algebraic(factor, AlgebraicOp::Add, offset) => {
                write!(f, "{factor}n+{offset}")
            }
            FieldValue::Algebraic(factor, AlgebraicOp::Sub, offset) => {
                write!(f, "{factor}n-{offset}")
            }
        }
    }
}
