use chrono::{TimeZone, Utc};

pub fn utc_ms(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .unwrap()
        .timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronosieve::block::{Block, MergeState};
    use chronosieve::errors::ChronoSieveErrors;
    use chronosieve::parser::parse_expression;
    use chronosieve::value::{AlgebraicOp, FieldValue};

    #[test]
    fn test_or_binds_looser_than_and() {
        let block = parse_expression("WD[1] , WD[2] . WD[3]").unwrap();
        let Block::Or(or) = block else {
            panic!("expected an OR at the root");
        };
        assert_eq!(or.children().len(), 2);
        assert!(matches!(or.children()[0], Block::WeekDay(_)));
        let Block::And(and) = &or.children()[1] else {
            panic!("expected an AND as the second OR operand");
        };
        assert_eq!(and.children().len(), 2);
    }

    #[test]
    fn test_consecutive_conjunctions_flatten() {
        let block = parse_expression("WD[1] AND WD[2] AND WD[3]").unwrap();
        let Block::And(and) = block else {
            panic!("expected an AND at the root");
        };
        assert_eq!(and.children().len(), 3);

        let nested = parse_expression("WD[1] AND (WD[2] AND WD[3])").unwrap();
        let Block::And(outer) = nested else {
            panic!("expected an AND at the root");
        };
        assert_eq!(outer.children().len(), 2);
        assert!(matches!(outer.children()[1], Block::And(_)));
    }

    #[test]
    fn test_not_spellings_are_equivalent()  {
        let word = parse_expression("NOT WD[1]").unwrap();
        let bang = parse_expression("!WD[1]").unwrap();
        assert_eq!(word, bang);
        assert_eq!(word.hash(), bang.hash());
    }

    #[test]
    fn test_merge_annotations_on_fields() {
        let off = parse_expression("#WD[1..5]").unwrap();
        assert_eq!(off.merge_state(), MergeState::Off);
        let on = parse_expression("~T[9:00..10:00]").unwrap();
        assert_eq!(on.merge_state(), MergeState::On);
    }

    #[test]
    fn test_merge_annotations_nest_through_conditions() {
        let block = parse_expression("#(~T[1:00..2:00] AND WD[1..5])").unwrap();
        let Block::And(and) = block else {
            panic!("expected an AND at the root");
        };
        assert_eq!(and.merge_state(), MergeState::Off);
        assert_eq!(and.children()[0].merge_state(), MergeState::On);
        assert_eq!(and.children()[1].merge_state(), MergeState::Default);
    }

    #[test]
    fn test_annotation_on_not_lands_on_its_operand() {
        let block = parse_expression("#(NOT WD[1])").unwrap();
        let Block::Not(not) = block else {
            panic!("expected a NOT at the root");
        };
        assert_eq!(not.merge_state(), MergeState::Default);
        assert_eq!(not.child().unwrap().merge_state(), MergeState::Off);

        let inner = parse_expression("NOT #WD[1]").unwrap();
        let Block::Not(not) = inner else {
            panic!("expected a NOT at the root");
        };
        assert_eq!(not.child().unwrap().merge_state(), MergeState::Off);
    }

    #[test]
    fn test_time_precisions() {
        let cases = [
            ("T[9..10]", 32_400_000, 36_000_000),
            ("T[9:30..10]", 34_200_000, 36_000_000),
            ("T[9:30:15..10]", 34_215_000, 36_000_000),
            ("T[9:30:15.5..10]", 34_215_005, 36_000_000),
            ("T[9>..17>]", 35_999_999, 64_799_999),
            ("T[9:30>..10]", 34_259_999, 36_000_000),
        ];
        for (source, start, end) in cases {
            let block = parse_expression(source).unwrap();
            let Block::Time(time) = block else {
                panic!("expected a time field for {source}");
            };
            assert_eq!(time.values().len(), 1, "{source}");
            assert_eq!(time.values()[0].start, start, "{source}");
            assert_eq!(time.values()[0].end, end, "{source}");
        }
    }

    #[test]
    fn test_single_date_spans_the_whole_day() {
        let block = parse_expression("D[2024-01-01]").unwrap();
        let Block::Date(date) = block else {
            panic!("expected a date field");
        };
        assert_eq!(date.values()[0].start, utc_ms(2024, 1, 1, 0, 0, 0));
        assert_eq!(date.values()[0].end, utc_ms(2024, 1, 1, 23, 59, 59) + 999);
    }

    #[test]
    fn test_date_range_and_datetime_literals() {
        let block = parse_expression("D[2024-01-01..2024-01-03]").unwrap();
        let Block::Date(date) = block else {
            panic!("expected a date field");
        };
        assert_eq!(date.values()[0].start, utc_ms(2024, 1, 1, 0, 0, 0));
        assert_eq!(date.values()[0].end, utc_ms(2024, 1, 3, 23, 59, 59) + 999);

        let block = parse_expression("DT[2024-01-01T09:30..2024-01-01T17>]").unwrap();
        let Block::DateTime(datetime) = block else {
            panic!("expected a datetime field");
        };
        assert_eq!(datetime.values()[0].start, utc_ms(2024, 1, 1, 9, 30, 0));
        assert_eq!(datetime.values()[0].end, utc_ms(2024, 1, 1, 17, 59, 59) + 999);
    }

    #[test]
    fn test_algebraic_and_negative_values() {
        let block = parse_expression("WD[2n+1]").unwrap();
        let Block::WeekDay(weekday) = block else {
            panic!("expected a weekday field");
        };
        assert_eq!(
            weekday.values(),
            &[FieldValue::Algebraic(2, AlgebraicOp::Add, 1)]
        );

        let block = parse_expression("Y[-100..100]").unwrap();
        let Block::Year(year) = block else {
            panic!("expected a year field");
        };
        assert_eq!(year.values(), &[FieldValue::Range(-100, 100)]);
    }

    #[test]
    fn test_reference_identifiers() {
        let block = parse_expression("REF[businessHours42]").unwrap();
        let Block::Reference(reference) = block else {
            panic!("expected a reference");
        };
        assert_eq!(reference.id(), "businessHours42");

        assert!(matches!(
            parse_expression("REF[bad id]"),
            Err(ChronoSieveErrors::ParseError(_, _))
        ));
        assert!(matches!(
            parse_expression("REF[]"),
            Err(ChronoSieveErrors::ParseError(_, _))
        ));
    }

    #[test]
    fn test_empty_value_lists_construct_empty_fields() {
        let block = parse_expression("WD[]").unwrap();
        let Block::WeekDay(weekday) = &block else {
            panic!("expected a weekday field");
        };
        assert!(weekday.values().is_empty());
        assert!(block.evaluate(0, 1_000_000, None, true).unwrap().is_empty());
    }

    #[test]
    fn test_parse_failures() {
        for source in [
            "",
            "(WD[1]",
            "WD[1] extra",
            "WD[1] AND",
            "T[9:00]",
            "T[9:000..10]",
            "Q[1..2]",
            "WD[1 5]",
            "D[2024-13-01]",
            "DT[2024-01-01..2024-01-02]",
            "# NOT WD[1]",
        ] {
            assert!(matches!(
                parse_expression(source),
                Err(ChronoSieveErrors::ParseError(_, _))
            ), "{source} should fail to parse");
        }
    }

    #[test]
    fn test_constraint_rejections_surface_validation_errors() {
        for source in ["WD[8]", "M[0]", "T[17:00..9:00]", "MD[1..32]", "WD[0n+1]"] {
            assert!(matches!(
                parse_expression(source),
                Err(ChronoSieveErrors::ValidationError(_, _))
            ), "{source} should fail validation");
        }
    }

    #[test]
    fn test_round_trip_reaches_a_fixed_point() {
        for source in [
            "T[9:00..17:00] AND WD[1..5]",
            "#(~T[1:00..2:00] AND WD[1..5])",
            "NOT (WD[6,7] OR D[2024-01-01])",
            "DT[2024-01-01T09:30..2024-01-02T17:00] , Y[-100..100]",
            "M[1..3,12] AND MD[2n+1] AND #REF[abc]",
            "T[9>..17>]",
        ] {
            let first = parse_expression(source).unwrap();
            let printed = first.to_string();
            let second = parse_expression(&printed).unwrap();
            assert_eq!(first, second, "round trip changed {source} (printed {printed})");
            assert_eq!(first.hash(), second.hash());
            assert_eq!(printed, second.to_string());
        }
    }
}
