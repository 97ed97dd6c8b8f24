use crate::errors::ChronoSieveErrors;
use chrono::{Datelike, NaiveDate};

pub(crate) const DAY_MS: i64 = 86_400_000;
pub(crate) const DAY_MAX_MS: i64 = DAY_MS - 1;

/// Days between 0001-01-01 (proleptic Gregorian day one) and the Unix epoch
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

fn out_of_calendar(value: i64) -> ChronoSieveErrors {
    ChronoSieveErrors::ValidationError(
        value.to_string(),
        "a timestamp within the supported calendar range".to_owned(),
    )
}

/// Index of the UTC day containing ``ms``, negative before the epoch
pub(crate) fn day_index(ms: i64) -> i64 {
    ms.div_euclid(DAY_MS)
}

/// Milliseconds elapsed since the preceding UTC midnight
pub(crate) fn ms_of_day(ms: i64) -> i64 {
    ms.rem_euclid(DAY_MS)
}

/// ISO weekday (1 = Monday .. 7 = Sunday) of a UTC day index, computed arithmetically
/// since epoch day zero was a Thursday
pub(crate) fn iso_weekday_of_day(day: i64) -> i32 {
    ((day + 3).rem_euclid(7) + 1) as i32
}

/// Converts a UTC day index into a calendar date, failing outside chrono's date range
pub(crate) fn day_index_to_date(day: i64) -> Result<NaiveDate, ChronoSieveErrors> {
    i32::try_from(day + EPOCH_DAYS_FROM_CE)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| out_of_calendar(day))
}

/// Millisecond timestamp of UTC midnight opening ``date``
pub(crate) fn date_to_ms(date: NaiveDate) -> i64 {
    (i64::from(date.num_days_from_ce()) - EPOCH_DAYS_FROM_CE) * DAY_MS
}

/// The calendar date holding the timestamp ``ms``
pub(crate) fn ms_to_date(ms: i64) -> Result<NaiveDate, ChronoSieveErrors> {
    day_index_to_date(day_index(ms))
}

/// Millisecond timestamp of UTC midnight opening the given month of the flattened
/// `year * 12 + month0` month index
pub(crate) fn month_start_ms(month_index: i64) -> Result<i64, ChronoSieveErrors> {
    let year = month_index.div_euclid(12);
    let month0 = month_index.rem_euclid(12);
    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month0 as u32 + 1, 1))
        .map(date_to_ms)
        .ok_or_else(|| out_of_calendar(month_index))
}

/// Millisecond timestamp of UTC midnight opening January 1st of ``year``
pub(crate) fn year_start_ms(year: i64) -> Result<i64, ChronoSieveErrors> {
    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        .map(date_to_ms)
        .ok_or_else(|| out_of_calendar(year))
}

/// Earliest timestamp the calendar fields accept, UTC midnight of -9999-01-01
pub(crate) fn calendar_min_ms() -> i64 {
    NaiveDate::from_ymd_opt(-9999, 1, 1)
        .map(date_to_ms)
        .unwrap_or(i64::MIN)
}

/// Latest timestamp the calendar fields accept, the final millisecond of 9999-12-31 UTC
pub(crate) fn calendar_max_ms() -> i64 {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .map(|date| date_to_ms(date) + DAY_MAX_MS)
        .unwrap_or(i64::MAX)
}

pub(crate) fn format_time_of_day(time_of_day: i64) -> String {
    let hour = time_of_day / 3_600_000;
    let minute = time_of_day % 3_600_000 / 60_000;
    let second = time_of_day % 60_000 / 1_000;
    let milli = time_of_day % 1_000;
    format!("{hour:02}:{minute:02}:{second:02}.{milli:03}")
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Printable form of the calendar day holding ``ms``, falling back to the raw number
/// when the timestamp escapes the calendar range
pub(crate) fn format_date_ms(ms: i64) -> String {
    match ms_to_date(ms) {
        Ok(date) => format_date(date),
        Err(_) => ms.to_string(),
    }
}

/// Printable form of an arbitrary UTC millisecond timestamp, falling back to the raw
/// number when the timestamp escapes the calendar range
pub(crate) fn format_datetime(ms: i64) -> String {
    match ms_to_date(ms) {
        Ok(date) => format!("{}T{}", format_date(date), format_time_of_day(ms_of_day(ms))),
        Err(_) => ms.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_day_is_thursday() {
        assert_eq!(iso_weekday_of_day(0), 4);
        assert_eq!(iso_weekday_of_day(4), 1);
        assert_eq!(iso_weekday_of_day(-1), 3);
    }

    #[test]
    fn test_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let ms = date_to_ms(date);
        assert_eq!(ms_to_date(ms).unwrap(), date);
        assert_eq!(ms_to_date(ms + DAY_MAX_MS).unwrap(), date);
    }

    #[test]
    fn test_epoch_midnight_is_day_zero() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_ms(epoch), 0);
        assert_eq!(day_index(0), 0);
        assert_eq!(day_index(-1), -1);
    }

    #[test]
    fn test_month_index_spans_year_boundaries() {
        let december_2023 = 2023 * 12 + 11;
        let january_2024 = 2024 * 12;
        assert_eq!(
            month_start_ms(january_2024).unwrap(),
            month_start_ms(december_2023).unwrap() + 31 * DAY_MS
        );
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_time_of_day(34_200_000), "09:30:00.000");
        assert_eq!(format_datetime(0), "1970-01-01T00:00:00.000");
    }
}
