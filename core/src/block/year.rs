use crate::block::{EvalScope, RunAccumulator, numeric_field};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use crate::utils::{ms_to_date, year_start_ms};
use chrono::Datelike;

numeric_field!(
    /// [`YearField`] matches whole UTC calendar years within the supported `-9999..9999`
    /// span. The surface form is `Y[...]`, e.g. `Y[2024]`, `Y[2020..2030]` or `Y[4n+0]`.
    /// Year ranges are naturally contiguous, so a range under effective merge collapses
    /// into one interval
    YearField,
    "Y",
    "YearField",
    -9999,
    9999,
    5
);

impl YearField {
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
        let first = i64::from(ms_to_date(start)?.year());
        let last = i64::from(ms_to_date(end)?.year());

        let mut runs = RunAccumulator::new(effective);
        for year in first..=last {
            let year_start = year_start_ms(year)?;
            let year_end = year_start_ms(year + 1)? - 1;
            let unit = Interval::raw(year_start.max(start), year_end.min(end));
            runs.push_unit(unit, self.matches(year as i32));
        }
        Ok(runs.finish())
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        _scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        let date = ms_to_date(t)?;
        Ok(self.matches(date.year()))
    }
}
