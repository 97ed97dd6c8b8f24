use crate::block::{EvalScope, MergeState, interval_field_methods, merge_prefix};
use crate::errors::ChronoSieveErrors;
use crate::interval::{Interval, push_merged};
use crate::utils::{DAY_MAX_MS, DAY_MS, day_index, format_time_of_day, ms_of_day};
use std::fmt;
use std::sync::OnceLock;

/// [`TimeField`] matches a set of time-of-day ranges on every UTC day of the domain. Values
/// are stored as millisecond offsets from midnight within `[0, 86_399_999]` and each range's
/// start must lie strictly before its end. The surface form is `T[...]`, e.g.
/// `T[9:00..17:00]` or the padded `T[9>..17>]` which expands to
/// `09:59:59.999..17:59:59.999`
///
/// # Evaluation
/// With the effective merge on, the value list is first coalesced into canonical form, and
/// a single range spanning the full day short-circuits to the whole domain. The walk then
/// projects every range onto every UTC day, clips to the domain and coalesces across
/// midnight when ranges touch the day boundary
///
/// # See Also
/// - [`Interval`]
/// - [`Block`](crate::block::Block)
#[derive(Debug, Clone)]
pub struct TimeField {
    values: Vec<Interval>,
    merge: MergeState,
    hash_cache: OnceLock<u64>,
}

interval_field_methods!(TimeField, "TimeField", 1);

impl TimeField {
    /// The final millisecond of a UTC day, the highest admissible time-of-day value
    pub const DAY_MAX: i64 = DAY_MAX_MS;

    fn validate_value(value: &Interval) -> Result<(), ChronoSieveErrors> {
        if value.start < 0 || value.end > Self::DAY_MAX {
            return Err(ChronoSieveErrors::ValidationError(
                value.to_string(),
                "a time-of-day range within 00:00:00.000..23:59:59.999".to_owned(),
            ));
        }
        if value.start >= value.end {
            return Err(ChronoSieveErrors::ValidationError(
                value.to_string(),
                "a time-of-day range whose start lies strictly before its end".to_owned(),
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
        let mut ranges = self.values.clone();
        ranges.sort_unstable();
        if effective {
            let mut coalesced = Vec::with_capacity(ranges.len());
            for range in ranges {
                push_merged(&mut coalesced, range, true);
            }
            ranges = coalesced;
        }
        if ranges.len() == 1 && ranges[0].start == 0 && ranges[0].end == Self::DAY_MAX {
            return Ok(vec![Interval::raw(start, end)]);
        }

        let mut out = Vec::new();
        for day in day_index(start)..=day_index(end) {
            let day_start = day.saturating_mul(DAY_MS);
            for range in &ranges {
                let range_start = day_start.saturating_add(range.start);
                let range_end = day_start.saturating_add(range.end);
                if range_end < start || range_start > end {
                    continue;
                }
                let clipped = Interval::raw(range_start.max(start), range_end.min(end));
                if effective {
                    push_merged(&mut out, clipped, true);
                } else {
                    out.push(clipped);
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        _scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        let time_of_day = ms_of_day(t);
        Ok(self.values.iter().any(|range| range.contains(time_of_day)))
    }
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", merge_prefix(self.merge))?;
        f.write_str("T[")?;
        for (index, value) in self.values.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(
                f,
                "{}..{}",
                format_time_of_day(value.start),
                format_time_of_day(value.end)
            )?;
        }
        f.write_str("]")
    }
}
