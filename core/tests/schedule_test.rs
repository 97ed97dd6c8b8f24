use chrono::{TimeZone, Utc};

pub fn utc_ms(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .unwrap()
        .timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronosieve::block::MergeState;
    use chronosieve::cache::IntervalCacheConfig;
    use chronosieve::errors::ChronoSieveErrors;
    use chronosieve::interval::Interval;
    use chronosieve::parser::parse_expression;
    use chronosieve::schedule::Schedule;

    const HOUR_MS: i64 = 3_600_000;

    fn business_schedule() -> Schedule {
        let schedule = Schedule::new();
        schedule
            .set(
                "businesshours",
                "Business hours",
                parse_expression("T[9:00..17:00] AND WD[1..5]").unwrap(),
                true,
            )
            .unwrap();
        schedule
            .set(
                "holidays",
                "Public holidays",
                parse_expression("D[2024-01-01]").unwrap(),
                true,
            )
            .unwrap();
        schedule
    }

    #[test]
    fn test_registry_crud() {
        let schedule = business_schedule();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.get("businesshours").unwrap().name, "Business hours");
        assert!(schedule.get("unknown").is_none());

        assert!(schedule.remove("holidays"));
        assert!(!schedule.remove("holidays"));
        assert_eq!(schedule.len(), 1);

        let mut ids = schedule.ids();
        ids.sort();
        assert_eq!(ids, vec!["businesshours"]);
    }

    #[test]
    fn test_set_rejects_malformed_and_taken_identifiers() {
        let schedule = business_schedule();
        let block = parse_expression("WD[1]").unwrap();

        assert!(matches!(
            schedule.set("bad id!", "Broken", block.clone(), true),
            Err(ChronoSieveErrors::InvalidID(_))
        ));
        assert!(matches!(
            schedule.set("", "Broken", block.clone(), true),
            Err(ChronoSieveErrors::ValidationError(_, _)) | Err(ChronoSieveErrors::InvalidID(_))
        ));
        assert!(matches!(
            schedule.set("businesshours", "Clash", block.clone(), false),
            Err(ChronoSieveErrors::ValidationError(_, _))
        ));
        assert!(schedule.set("businesshours", "Replaced", block, true).is_ok());
        assert_eq!(schedule.get("businesshours").unwrap().name, "Replaced");
    }

    #[test]
    fn test_holiday_exclusion_via_references() {
        let schedule = business_schedule();
        let block = parse_expression("REF[businesshours] AND NOT REF[holidays]").unwrap();

        let start = utc_ms(2024, 1, 1, 0, 0, 0);
        let end = utc_ms(2024, 1, 2, 23, 59, 59) + 999;
        let intervals = block.evaluate(start, end, Some(&schedule), true).unwrap();

        // the Monday holiday is excluded, only Tuesday business hours remain
        let tuesday = utc_ms(2024, 1, 2, 0, 0, 0);
        assert_eq!(
            intervals,
            vec![Interval::new(tuesday + 9 * HOUR_MS, tuesday + 17 * HOUR_MS).unwrap()]
        );
    }

    #[test]
    fn test_reference_failure_modes() {
        let block = parse_expression("REF[businesshours]").unwrap();
        let start = utc_ms(2024, 1, 1, 0, 0, 0);
        let end = utc_ms(2024, 1, 7, 0, 0, 0);

        assert!(matches!(
            block.evaluate(start, end, None, true),
            Err(ChronoSieveErrors::ReferenceError(_, _))
        ));

        let empty = Schedule::new();
        assert!(matches!(
            block.evaluate(start, end, Some(&empty), true),
            Err(ChronoSieveErrors::ReferenceError(_, _))
        ));
        assert!(matches!(
            empty.evaluate("businesshours", start, end, true),
            Err(ChronoSieveErrors::ReferenceError(_, _))
        ));
    }

    #[test]
    fn test_cyclic_references_are_refused() {
        let schedule = Schedule::new();
        schedule
            .set("a", "First", parse_expression("REF[b]").unwrap(), true)
            .unwrap();
        schedule
            .set("b", "Second", parse_expression("REF[a]").unwrap(), true)
            .unwrap();
        schedule
            .set("selfish", "Self reference", parse_expression("REF[selfish]").unwrap(), true)
            .unwrap();

        let start = utc_ms(2024, 1, 1, 0, 0, 0);
        let end = utc_ms(2024, 1, 2, 0, 0, 0);
        for id in ["a", "b", "selfish"] {
            assert!(matches!(
                schedule.evaluate(id, start, end, true),
                Err(ChronoSieveErrors::ReferenceError(_, _))
            ), "{id} must be detected as cyclic");
            assert!(matches!(
                schedule.evaluate_timestamp(id, start),
                Err(ChronoSieveErrors::ReferenceError(_, _))
            ));
        }
    }

    #[test]
    fn test_reference_merge_state_overrides_the_callers() {
        let schedule = Schedule::new();
        schedule
            .set("week", "Working week", parse_expression("WD[1..5]").unwrap(), true)
            .unwrap();

        let start = utc_ms(2024, 1, 1, 0, 0, 0);
        let end = utc_ms(2024, 1, 7, 23, 59, 59) + 999;

        let merged = parse_expression("REF[week]").unwrap();
        assert_eq!(merged.evaluate(start, end, Some(&schedule), true).unwrap().len(), 1);

        let split = parse_expression("#REF[week]").unwrap();
        assert_eq!(split.evaluate(start, end, Some(&schedule), true).unwrap().len(), 5);
    }

    #[test]
    fn test_schedule_evaluate_uses_the_cache() {
        let schedule = business_schedule();
        let start = utc_ms(2024, 1, 1, 0, 0, 0);
        let end = utc_ms(2024, 1, 7, 23, 59, 59) + 999;

        let first = schedule.evaluate("businesshours", start, end, true).unwrap();
        let stats = schedule.cache_stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);

        let second = schedule.evaluate("businesshours", start, end, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(schedule.cache_stats().hits, 1);

        // a narrower domain is answered from the wider cached entry by clipping
        let narrow_start = utc_ms(2024, 1, 2, 10, 0, 0);
        let narrow_end = utc_ms(2024, 1, 3, 12, 0, 0);
        let narrow = schedule
            .evaluate("businesshours", narrow_start, narrow_end, true)
            .unwrap();
        assert_eq!(schedule.cache_stats().hits, 2);
        let clipped: Vec<Interval> = first
            .iter()
            .filter_map(|interval| interval.clip(narrow_start, narrow_end))
            .collect();
        assert_eq!(narrow, clipped);
    }

    #[test]
    fn test_cache_opt_out_and_clear() {
        let schedule = business_schedule();
        let start = utc_ms(2024, 1, 1, 0, 0, 0);
        let end = utc_ms(2024, 1, 7, 23, 59, 59) + 999;

        schedule.evaluate("businesshours", start, end, false).unwrap();
        schedule.evaluate("businesshours", start, end, false).unwrap();
        assert_eq!(schedule.cache_stats().hits, 0);
        assert_eq!(schedule.cache_stats().misses, 2);

        schedule.evaluate("businesshours", start, end, true).unwrap();
        schedule.clear_cache();
        schedule.evaluate("businesshours", start, end, true).unwrap();
        assert_eq!(schedule.cache_stats().hits, 0);
    }

    #[test]
    fn test_oversized_results_are_returned_but_not_cached() {
        let config = IntervalCacheConfig::builder().max_ranges_per_entry(3).build();
        let schedule = Schedule::with_config(config);
        schedule
            .set("split", "Split week", parse_expression("#WD[1..5]").unwrap(), true)
            .unwrap();

        let start = utc_ms(2024, 1, 1, 0, 0, 0);
        let end = utc_ms(2024, 1, 7, 23, 59, 59) + 999;
        let intervals = schedule.evaluate("split", start, end, true).unwrap();
        assert_eq!(intervals.len(), 5);

        // nothing was stored, so the second call misses again
        schedule.evaluate("split", start, end, true).unwrap();
        assert_eq!(schedule.cache_stats().hits, 0);
        assert_eq!(schedule.cache_stats().misses, 2);
    }

    #[test]
    fn test_schedule_evaluate_timestamp_delegates() {
        let schedule = business_schedule();
        assert!(
            schedule
                .evaluate_timestamp("businesshours", utc_ms(2024, 1, 2, 12, 0, 0))
                .unwrap()
        );
        assert!(
            !schedule
                .evaluate_timestamp("businesshours", utc_ms(2024, 1, 6, 12, 0, 0))
                .unwrap()
        );
    }

    #[test]
    fn test_hash_stability_and_sensitivity() {
        let block = parse_expression("T[9:00..17:00] AND WD[1..5]").unwrap();
        let clone = block.clone();
        assert_eq!(block.hash(), clone.hash());

        let mut annotated = block.clone();
        annotated.set_merge_state(MergeState::Off);
        assert_ne!(block.hash(), annotated.hash());

        let reparsed = parse_expression("T[9:00..17:00] AND WD[1..5]").unwrap();
        assert_eq!(block.hash(), reparsed.hash());

        let different = parse_expression("T[9:00..17:00] AND WD[1..6]").unwrap();
        assert_ne!(block.hash(), different.hash());
    }

    #[test]
    fn test_field_mutators_invalidate_the_hash() {
        use chronosieve::block::WeekDayField;
        use chronosieve::value::FieldValue;

        let mut field = WeekDayField::new(vec![FieldValue::Range(1, 5)]).unwrap();
        let before = field.hash();

        field.add_value(FieldValue::Single(6)).unwrap();
        let after = field.hash();
        assert_ne!(before, after);

        assert_eq!(field.get_value(1).unwrap(), FieldValue::Single(6));
        assert!(matches!(
            field.get_value(2),
            Err(ChronoSieveErrors::IndexOutOfBounds(2, _, 2))
        ));

        field.remove_value(1).unwrap();
        assert_eq!(field.hash(), before);
        assert!(field.remove_value(5).is_err());
    }
}
