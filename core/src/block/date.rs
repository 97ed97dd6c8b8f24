use crate::block::{EvalScope, MergeState, eval_stored_intervals, interval_field_methods, merge_prefix};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use crate::utils::{DAY_MAX_MS, calendar_max_ms, calendar_min_ms, format_date_ms, ms_of_day};
use std::fmt;
use std::sync::OnceLock;

/// [`DateField`] matches explicit whole-day spans of the UTC calendar. Every value must
/// start exactly at UTC midnight and end exactly at `23:59:59.999` UTC, so a value is
/// always one or more complete days. The surface form is `D[...]`, either a single day
/// `D[2024-01-01]` or a span `D[2024-01-01..2024-01-05]`
#[derive(Debug, Clone)]
pub struct DateField {
    values: Vec<Interval>,
    merge: MergeState,
    hash_cache: OnceLock<u64>,
}

interval_field_methods!(DateField, "DateField", 6);

impl DateField {
    fn validate_value(value: &Interval) -> Result<(), ChronoSieveErrors> {
        if value.start > value.end {
            return Err(ChronoSieveErrors::ValidationError(
                value.to_string(),
                "a date range whose first day does not come after its last".to_owned(),
            ));
        }
        if ms_of_day(value.start) != 0 {
            return Err(ChronoSieveErrors::ValidationError(
                value.to_string(),
                "a date range starting exactly at UTC midnight".to_owned(),
            ));
        }
        if ms_of_day(value.end) != DAY_MAX_MS {
            return Err(ChronoSieveErrors::ValidationError(
                value.to_string(),
                "a date range ending exactly at 23:59:59.999 UTC".to_owned(),
            ));
        }
        if value.start < calendar_min_ms() || value.end > calendar_max_ms() {
            return Err(ChronoSieveErrors::ValidationError(
                value.to_string(),
                "a date range within the supported -9999..9999 year span".to_owned(),
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

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", merge_prefix(self.merge))?;
        f.write_str("D[")?;
        for (index, value) in self.values.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            if value.end - value.start == DAY_MAX_MS {
                write!(f, "{}", format_date_ms(value.start))?;
            } else {
                write!(
                    f,
                    "{}..{}",
                    format_date_ms(value.start),
                    format_date_ms(value.end)
                )?;
            }
        }
        f.write_str("]")
    }
}
