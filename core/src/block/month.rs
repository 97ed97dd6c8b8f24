use crate::block::{EvalScope, RunAccumulator, numeric_field};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use crate::utils::{month_start_ms, ms_to_date};
use chrono::Datelike;

numeric_field!(
    /// [`MonthField`] matches whole UTC calendar months by number, `1 = January` through
    /// `12 = December`. The surface form is `M[...]`. The walk flattens months into a
    /// `year * 12 + month` index so ranges crossing a year boundary step cleanly from
    /// December into January
    MonthField,
    "M",
    "MonthField",
    1,
    12,
    3
);

impl MonthField {
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
        let first_date = ms_to_date(start)?;
        let last_date = ms_to_date(end)?;
        let first = i64::from(first_date.year()) * 12 + i64::from(first_date.month0());
        let last = i64::from(last_date.year()) * 12 + i64::from(last_date.month0());

        let mut runs = RunAccumulator::new(effective);
        for month in first..=last {
            let month_start = month_start_ms(month)?;
            let month_end = month_start_ms(month + 1)? - 1;
            let unit = Interval::raw(month_start.max(start), month_end.min(end));
            runs.push_unit(unit, self.matches((month.rem_euclid(12) + 1) as i32));
        }
        Ok(runs.finish())
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        _scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        let date = ms_to_date(t)?;
        Ok(self.matches(date.month() as i32))
    }
}
