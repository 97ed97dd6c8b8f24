pub(crate) mod cursor; // skipcq: RS-D1001

use crate::block::{
    AndBlock, Block, DateField, DateTimeField, MergeState, MonthDayField, MonthField, NotBlock,
    OrBlock, ReferenceBlock, TimeField, WeekDayField, YearField,
};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use crate::parser::cursor::Cursor;
use crate::utils::{DAY_MAX_MS, date_to_ms};
use crate::value::{AlgebraicOp, FieldValue};
use chrono::NaiveDate;

/// Parses a schedule expression into its [`Block`] tree
///
/// The grammar, highest precedence first and left-associative within a level:
///
/// ```text
/// Expr     := Or
/// Or       := And ( ('OR' | ',')  And )*
/// And      := Not ( ('AND' | '.') Not )*
/// Not      := ('NOT' | '!') Unary | Unary
/// Unary    := ('#' | '~') Unary | Atom
/// Atom     := '(' Expr ')' | Field
/// Field    := T'[' TimeList ']' | WD'[' ValList ']' | D'[' DateList ']'
///           | M'[' ValList ']' | MD'[' ValList ']' | Y'[' ValList ']'
///           | DT'[' DTList ']' | REF'[' AlphaNum+ ']'
/// ```
///
/// Whitespace is permitted between tokens. Consecutive `AND`s (and `OR`s) flatten into a
/// single multi-child block. The `#` and `~` prefixes pin the operand's
/// [`MergeState`] to off respectively on, and when the operand is a NOT the annotation
/// lands on the NOT's inner operand instead
///
/// # Returns
/// The root [`Block`] of the expression, a [`ChronoSieveErrors::ParseError`] carrying the
/// offending expression on any lexical or structural mismatch, or a
/// [`ChronoSieveErrors::ValidationError`] when a field constructor rejects a constraint
///
/// # Examples
///
/// ```
/// use chronosieve::parser::parse_expression;
///
/// let block = parse_expression("T[9:00..17:00] AND WD[1..5]").unwrap();
/// let round_trip = parse_expression(&block.to_string()).unwrap();
/// assert_eq!(block.hash(), round_trip.hash());
/// ```
pub fn parse_expression(text: &str) -> Result<Block, ChronoSieveErrors> {
    let mut parser = ExpressionParser {
        cursor: Cursor::new(text),
        source: text,
    };
    let block = parser.parse_or()?;
    parser.cursor.skip_whitespace();
    if !parser.cursor.at_end() {
        return Err(parser.fail("unexpected trailing input after the expression"));
    }
    Ok(block)
}

/// Pins the merge annotation produced by a `#` / `~` prefix onto ``block``. A NOT with a
/// child forwards the annotation to that child, and since parentheses never materialize
/// as tree nodes, nested parens strip down to the innermost block on their own
fn apply_merge_annotation(block: &mut Block, state: MergeState) {
    if let Block::Not(not) = block {
        if let Some(child) = not.child_mut() {
            child.set_merge_state(state);
            return;
        }
    }
    block.set_merge_state(state);
}

struct ExpressionParser<'a> {
    cursor: Cursor<'a>,
    source: &'a str,
}

impl<'a> ExpressionParser<'a> {
    fn fail(&self, reason: impl Into<String>) -> ChronoSieveErrors {
        ChronoSieveErrors::ParseError(self.source.to_owned(), reason.into())
    }

    fn parse_or(&mut self) -> Result<Block, ChronoSieveErrors> {
        let first = self.parse_and()?;
        let mut rest = Vec::new();
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat(',') || self.cursor.eat_keyword("OR") {
                rest.push(self.parse_and()?);
            } else {
                break;
            }
        }
        if rest.is_empty() {
            return Ok(first);
        }
        let mut children = vec![first];
        children.append(&mut rest);
        Ok(Block::Or(OrBlock::new(children)))
    }

    fn parse_and(&mut self) -> Result<Block, ChronoSieveErrors> {
        let first = self.parse_not()?;
        let mut rest = Vec::new();
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat('.') || self.cursor.eat_keyword("AND") {
                rest.push(self.parse_not()?);
            } else {
                break;
            }
        }
        if rest.is_empty() {
            return Ok(first);
        }
        let mut children = vec![first];
        children.append(&mut rest);
        Ok(Block::And(AndBlock::new(children)))
    }

    fn parse_not(&mut self) -> Result<Block, ChronoSieveErrors> {
        self.cursor.skip_whitespace();
        if self.cursor.eat_keyword("NOT") || self.cursor.eat('!') {
            let operand = self.parse_unary()?;
            return Ok(Block::Not(NotBlock::new(Some(operand))));
        }
        self.parse_unary()
    }

    fn parse_unary(&mut self) -> Result<Block, ChronoSieveErrors> {
        self.cursor.skip_whitespace();
        if self.cursor.eat('#') {
            let mut operand = self.parse_unary()?;
            apply_merge_annotation(&mut operand, MergeState::Off);
            return Ok(operand);
        }
        if self.cursor.eat('~') {
            let mut operand = self.parse_unary()?;
            apply_merge_annotation(&mut operand, MergeState::On);
            return Ok(operand);
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Block, ChronoSieveErrors> {
        self.cursor.skip_whitespace();
        if self.cursor.eat('(') {
            let inner = self.parse_or()?;
            self.cursor.skip_whitespace();
            if !self.cursor.eat(')') {
                return Err(self.fail("expected a closing `)`"));
            }
            return Ok(inner);
        }
        self.parse_field()
    }

    // longer keywords probe first so `DT` / `MD` never lose against `D` / `M` / `T`
    fn parse_field(&mut self) -> Result<Block, ChronoSieveErrors> {
        if self.cursor.eat_field_opener("REF") {
            return self.parse_reference();
        }
        if self.cursor.eat_field_opener("WD") {
            let values = self.parse_value_list()?;
            return Ok(Block::WeekDay(WeekDayField::new(values)?));
        }
        if self.cursor.eat_field_opener("MD") {
            let values = self.parse_value_list()?;
            return Ok(Block::MonthDay(MonthDayField::new(values)?));
        }
        if self.cursor.eat_field_opener("DT") {
            let values = self.parse_datetime_list()?;
            return Ok(Block::DateTime(DateTimeField::new(values)?));
        }
        if self.cursor.eat_field_opener("T") {
            let values = self.parse_time_list()?;
            return Ok(Block::Time(TimeField::new(values)?));
        }
        if self.cursor.eat_field_opener("D") {
            let values = self.parse_date_list()?;
            return Ok(Block::Date(DateField::new(values)?));
        }
        if self.cursor.eat_field_opener("M") {
            let values = self.parse_value_list()?;
            return Ok(Block::Month(MonthField::new(values)?));
        }
        if self.cursor.eat_field_opener("Y") {
            let values = self.parse_value_list()?;
            return Ok(Block::Year(YearField::new(values)?));
        }
        Err(self.fail("expected a field or a parenthesized expression"))
    }

    fn parse_reference(&mut self) -> Result<Block, ChronoSieveErrors> {
        self.cursor.skip_whitespace();
        let id = self.cursor.take_while(|c| c.is_ascii_alphanumeric());
        if id.is_empty() {
            return Err(self.fail("expected an alphanumeric reference identifier"));
        }
        let id = id.to_owned();
        self.cursor.skip_whitespace();
        if !self.cursor.eat(']') {
            return Err(self.fail("expected a closing `]` after the reference identifier"));
        }
        Ok(Block::Reference(ReferenceBlock::new(id)?))
    }

    /// Parses the comma-separated body of an already-opened `[...]` list, including the
    /// closing bracket. Empty lists are legal and construct empty fields
    fn parse_list<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> Result<T, ChronoSieveErrors>,
    ) -> Result<Vec<T>, ChronoSieveErrors> {
        let mut items = Vec::new();
        self.cursor.skip_whitespace();
        if self.cursor.eat(']') {
            return Ok(items);
        }
        loop {
            items.push(element(self)?);
            self.cursor.skip_whitespace();
            if self.cursor.eat(',') {
                continue;
            }
            if self.cursor.eat(']') {
                break;
            }
            return Err(self.fail("expected `,` or `]` inside a field value list"));
        }
        Ok(items)
    }

    fn parse_value_list(&mut self) -> Result<Vec<FieldValue>, ChronoSieveErrors> {
        self.parse_list(Self::parse_value)
    }

    fn parse_value(&mut self) -> Result<FieldValue, ChronoSieveErrors> {
        let first = self.parse_signed_number()?;
        self.cursor.skip_whitespace();
        if self.cursor.eat('n') {
            self.cursor.skip_whitespace();
            let op = if self.cursor.eat('+') {
                AlgebraicOp::Add
            } else if self.cursor.eat('-') {
                AlgebraicOp::Sub
            } else {
                return Err(self.fail("expected `+` or `-` after `n` in an algebraic value"));
            };
            self.cursor.skip_whitespace();
            let offset = self.parse_unsigned_number()?;
            return Ok(FieldValue::Algebraic(first, op, offset));
        }
        if self.cursor.eat_str("..") {
            let second = self.parse_signed_number()?;
            return Ok(FieldValue::Range(first, second));
        }
        Ok(FieldValue::Single(first))
    }

    fn parse_signed_number(&mut self) -> Result<i32, ChronoSieveErrors> {
        self.cursor.skip_whitespace();
        let negative = self.cursor.eat('-');
        let magnitude = self.parse_unsigned_number()?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    fn parse_unsigned_number(&mut self) -> Result<i32, ChronoSieveErrors> {
        let digits = self.cursor.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.fail("expected a number"));
        }
        digits
            .parse::<i32>()
            .map_err(|_| self.fail("numeric literal is too large"))
    }

    fn parse_time_list(&mut self) -> Result<Vec<Interval>, ChronoSieveErrors> {
        self.parse_list(|parser| {
            let start = parser.parse_time()?;
            parser.cursor.skip_whitespace();
            if !parser.cursor.eat_str("..") {
                return Err(parser.fail("expected `..` between the two times of a time range"));
            }
            let end = parser.parse_time()?;
            Ok(Interval::raw(start, end))
        })
    }

    /// Parses one time literal of precision `H`, `H:M`, `H:M:S` or `H:M:S.mmm`. A trailing
    /// `>` pads every unspecified lower component to its maximum, without it they are zero
    fn parse_time(&mut self) -> Result<i64, ChronoSieveErrors> {
        self.cursor.skip_whitespace();
        let hour = self.parse_fixed_number(2, "hour")?;
        let mut minute = None;
        let mut second = None;
        let mut milli = None;
        if self.cursor.eat(':') {
            minute = Some(self.parse_fixed_number(2, "minute")?);
            if self.cursor.eat(':') {
                second = Some(self.parse_fixed_number(2, "second")?);
                // a lone `.` opens the millisecond component, `..` belongs to the range
                if self.cursor.rest().starts_with('.') && !self.cursor.rest().starts_with("..") {
                    self.cursor.bump();
                    milli = Some(self.parse_fixed_number(3, "millisecond")?);
                }
            }
        }
        let padded = self.cursor.eat('>');
        let fill = |component: Option<i64>, max: i64| component.unwrap_or(if padded { max } else { 0 });
        let minute = fill(minute, 59);
        let second = fill(second, 59);
        let milli = fill(milli, 999);
        if hour > 23 || minute > 59 || second > 59 {
            return Err(self.fail("time component out of range"));
        }
        Ok(hour * 3_600_000 + minute * 60_000 + second * 1_000 + milli)
    }

    fn parse_fixed_number(
        &mut self,
        max_digits: usize,
        what: &str,
    ) -> Result<i64, ChronoSieveErrors> {
        let digits = self.cursor.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() || digits.len() > max_digits {
            return Err(self.fail(format!("expected a {what} of 1 to {max_digits} digit(s)")));
        }
        digits
            .parse::<i64>()
            .map_err(|_| self.fail(format!("invalid {what}")))
    }

    fn parse_date_list(&mut self) -> Result<Vec<Interval>, ChronoSieveErrors> {
        self.parse_list(|parser| {
            let first = parser.parse_date()?;
            parser.cursor.skip_whitespace();
            let last = if parser.cursor.eat_str("..") {
                parser.parse_date()?
            } else {
                first
            };
            Ok(Interval::raw(date_to_ms(first), date_to_ms(last) + DAY_MAX_MS))
        })
    }

    fn parse_date(&mut self) -> Result<NaiveDate, ChronoSieveErrors> {
        self.cursor.skip_whitespace();
        let negative = self.cursor.eat('-');
        let year_digits = self.cursor.take_while(|c| c.is_ascii_digit());
        if year_digits.len() != 4 {
            return Err(self.fail("expected a 4-digit year in a date literal"));
        }
        let mut year: i32 = year_digits
            .parse()
            .map_err(|_| self.fail("invalid year in a date literal"))?;
        if negative {
            year = -year;
        }
        if !self.cursor.eat('-') {
            return Err(self.fail("expected `-` after the year of a date literal"));
        }
        let month = self.parse_fixed_number(2, "month")?;
        if !self.cursor.eat('-') {
            return Err(self.fail("expected `-` after the month of a date literal"));
        }
        let day = self.parse_fixed_number(2, "day")?;
        NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .ok_or_else(|| self.fail("not a valid calendar date"))
    }

    fn parse_datetime_list(&mut self) -> Result<Vec<Interval>, ChronoSieveErrors> {
        self.parse_list(|parser| {
            let start = parser.parse_datetime()?;
            parser.cursor.skip_whitespace();
            if !parser.cursor.eat_str("..") {
                return Err(
                    parser.fail("expected `..` between the two datetimes of a datetime range")
                );
            }
            let end = parser.parse_datetime()?;
            Ok(Interval::raw(start, end))
        })
    }

    fn parse_datetime(&mut self) -> Result<i64, ChronoSieveErrors> {
        let date = self.parse_date()?;
        if !self.cursor.eat('T') {
            return Err(self.fail("expected `T` between the date and time of a datetime literal"));
        }
        let time = self.parse_time()?;
        Ok(date_to_ms(date) + time)
    }
}
