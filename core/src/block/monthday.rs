use crate::block::{EvalScope, RunAccumulator, numeric_field};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use crate::utils::{DAY_MAX_MS, DAY_MS, day_index, day_index_to_date, ms_to_date};
use chrono::Datelike;

numeric_field!(
    /// [`MonthDayField`] matches whole UTC days by their day-of-month number, `1` through
    /// `31`. The surface form is `MD[...]`. Days 29 to 31 are silently absent in months
    /// that do not have them, February without a 29th simply produces no interval rather
    /// than an error
    MonthDayField,
    "MD",
    "MonthDayField",
    1,
    31,
    4
);

impl MonthDayField {
    pub(crate) fn eval_in(
        &self,
        start: i64,
        end: i64,
        merge: bool,
        _scope: &EvalScope<'_>,
    ) -> Result<Vec<Interval>, ChronoSieveErrors> {
        if self.is_empty_field() {
            return Ok(Vec::new());
        }
        let effective = self.merge_state().resolve(merge);
        if self.covers_everything() {
            return Ok(vec![Interval::raw(start, end)]);
        }
        let mut runs = RunAccumulator::new(effective);
        for day in day_index(start)..=day_index(end) {
            let date = day_index_to_date(day)?;
            let day_start = day.saturating_mul(DAY_MS);
            let unit = Interval::raw(
                day_start.max(start),
                day_start.saturating_add(DAY_MAX_MS).min(end),
            );
            runs.push_unit(unit, self.matches(date.day() as i32));
        }
        Ok(runs.finish())
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        _scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        let date = ms_to_date(t)?;
        Ok(self.matches(date.day() as i32))
    }
}
