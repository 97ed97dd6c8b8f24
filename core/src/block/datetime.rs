use crate::block::{EvalScope, MergeState, eval_stored_intervals, interval_field_methods, merge_prefix};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use crate::utils::{calendar_max_ms, calendar_min_ms, format_datetime};
use std::fmt;
use std::sync::OnceLock;

/// [`DateTimeField`] matches arbitrary UTC millisecond spans, the most precise of the
/// field blocks. Values only require `start <= end` and residence within the supported
/// calendar span, there is no midnight alignment. The surface form is `DT[...]`, e.g.
/// `DT[2024-01-01T09:30..2024-01-02T17:00]`
#[derive(Debug, Clone)]
pub struct DateTimeField {
    values: Vec<Interval>,
    merge: MergeState,
    hash_cache: OnceLock<u64>,
}

interval_field_methods!(DateTimeField, "DateTimeField", 7);

impl DateTimeField {
    fn validate_value(value: &Interval) -> Result<(), ChronoSieveErrors> {
        if value.start > value.end {
            return Err(ChronoSieveErrors::ValidationError(
                value.to_string(),
                "a datetime range whose start does not exceed its end".to_owned(),
            ));
        }
        if value.start < calendar_min_ms() || value.end > calendar_max_ms() {
            return Err(ChronoSieveErrors::ValidationError(
                value.to_string(),
                "a datetime range within the supported -9999..9999 year span".to_owned(),
            ));
        }
        Ok(())
    }

    pub(crate) fn eval_in(
        &self,
        start: i64,
        end: i64,
        merge: bool,
        _scope: &EvalScope<'_>,
    ) -> Result<Vec<Interval>, ChronoSieveErrors> {
        if self.values.is_empty() {
            return Ok(Vec::new());
        }
        let effective = self.merge.resolve(merge);
        Ok(eval_stored_intervals(&self.values, start, end, effective))
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        _scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        Ok(self.values.iter().any(|value| value.contains(t)))
    }
}

impl fmt::Display for DateTimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", merge_prefix(self.merge))?;
        f.write_str("DT[")?;
        for (index, value) in self.values.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(
                f,
                "{}..{}",
                format_datetime(value.start),
                format_datetime(value.end)
            )?;
        }
        f.write_str("]")
    }
}
