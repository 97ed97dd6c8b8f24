use crate::block::{EvalScope, RunAccumulator, numeric_field};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use crate::utils::{DAY_MAX_MS, DAY_MS, day_index, iso_weekday_of_day};

numeric_field!(
    /// [`WeekDayField`] matches whole UTC days by their ISO weekday number, where
    /// `1 = Monday` through `7 = Sunday` (Sunday is never zero). The surface form is
    /// `WD[...]`, e.g. `WD[1..5]` for the working week or `WD[2n+1]` for every odd
    /// weekday
    ///
    /// # Evaluation
    /// The walk visits one UTC day at a time, testing the precompiled bitmap and either
    /// extending an open run (effective merge on) or emitting each matching day on its
    /// own (merge off). A bitmap covering all seven weekdays short-circuits to the whole
    /// domain
    ///
    /// # See Also
    /// - [`FieldValue`](crate::value::FieldValue)
    /// - [`Block`](crate::block::Block)
    WeekDayField,
    "WD",
    "WeekDayField",
    1,
    7,
    2
);

impl WeekDayField {
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
            let day_start = day.saturating_mul(DAY_MS);
            let unit = Interval::raw(
                day_start.max(start),
                day_start.saturating_add(DAY_MAX_MS).min(end),
            );
            runs.push_unit(unit, self.matches(iso_weekday_of_day(day)));
        }
        Ok(runs.finish())
    }

    pub(crate) fn eval_timestamp_in(
        &self,
        t: i64,
        _scope: &EvalScope<'_>,
    ) -> Result<bool, ChronoSieveErrors> {
        Ok(self.matches(iso_weekday_of_day(day_index(t))))
    }
}
