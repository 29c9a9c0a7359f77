use std::sync::OnceLock;

use chrono::{Datelike, Days, Local, Months, NaiveDate};
use regex::Regex;
use tracing::trace;

const TERM_PATTERN: &str = r"(?i)([+-]?)(\d+)([dwmqy])([se]?)\s*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snap {
    None,
    Start,
    End,
}

#[derive(Debug, Clone, Copy)]
struct Term {
    negative: bool,
    amount: u32,
    unit: Unit,
    snap: Snap,
}

/// Parses dates expressed relative to a reference date, such as `-3y 6m`,
/// `0qs` or `-4qs+2d`.
///
/// An expression is a sequence of terms `[+|-]<n><unit>[s|e]` where the unit
/// is one of `d`, `w`, `m`, `q` or `y`. Terms are applied left to right. A
/// term without a sign takes the sign of the closest signed term before it.
/// The `s` and `e` modifiers move the result to the start or end of the unit;
/// the end of a week is its Friday.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeDateParser;

impl RelativeDateParser {
    /// Parse `source` relative to `reference`. Returns `None` if the
    /// expression is malformed or the result is out of range.
    pub fn parse(source: &str, reference: NaiveDate) -> Option<NaiveDate> {
        let terms = Self::terms(source)?;
        let mut date = reference;
        for term in terms {
            date = term.apply(date)?;
        }
        trace!(source, %reference, %date, "Parsed relative date");
        Some(date)
    }

    /// Parse `source` relative to the local current date.
    pub fn parse_today(source: &str) -> Option<NaiveDate> {
        Self::parse(source, Local::now().date_naive())
    }

    fn terms(source: &str) -> Option<Vec<Term>> {
        static TERM: OnceLock<Regex> = OnceLock::new();
        let regex = TERM.get_or_init(|| Regex::new(TERM_PATTERN).expect("valid term pattern"));

        let body = source.trim_start();
        let mut terms = Vec::new();
        let mut position = 0;
        let mut negative = false;
        for captures in regex.captures_iter(body) {
            let matched = captures.get(0)?;
            if matched.start() != position {
                return None;
            }
            position = matched.end();

            match &captures[1] {
                "-" => negative = true,
                "+" => negative = false,
                _ => {}
            }
            let amount: u32 = captures[2].parse().ok()?;
            let unit = match captures[3].to_ascii_lowercase().as_str() {
                "d" => Unit::Day,
                "w" => Unit::Week,
                "m" => Unit::Month,
                "q" => Unit::Quarter,
                _ => Unit::Year,
            };
            let snap = match captures[4].to_ascii_lowercase().as_str() {
                "s" => Snap::Start,
                "e" => Snap::End,
                _ => Snap::None,
            };
            terms.push(Term {
                negative,
                amount,
                unit,
                snap,
            });
        }

        if terms.is_empty() || position != body.len() {
            return None;
        }
        Some(terms)
    }
}

impl Term {
    fn apply(&self, date: NaiveDate) -> Option<NaiveDate> {
        let shifted = match self.unit {
            Unit::Day => shift_days(date, u64::from(self.amount), self.negative)?,
            Unit::Week => shift_days(date, u64::from(self.amount) * 7, self.negative)?,
            Unit::Month => shift_months(date, self.amount, self.negative)?,
            Unit::Quarter => shift_months(date, self.amount.checked_mul(3)?, self.negative)?,
            Unit::Year => shift_months(date, self.amount.checked_mul(12)?, self.negative)?,
        };
        match self.snap {
            Snap::None => Some(shifted),
            Snap::Start => start_of(self.unit, shifted),
            Snap::End => end_of(self.unit, shifted),
        }
    }
}

fn shift_days(date: NaiveDate, days: u64, negative: bool) -> Option<NaiveDate> {
    if negative {
        date.checked_sub_days(Days::new(days))
    } else {
        date.checked_add_days(Days::new(days))
    }
}

fn shift_months(date: NaiveDate, months: u32, negative: bool) -> Option<NaiveDate> {
    if negative {
        date.checked_sub_months(Months::new(months))
    } else {
        date.checked_add_months(Months::new(months))
    }
}

fn start_of(unit: Unit, date: NaiveDate) -> Option<NaiveDate> {
    match unit {
        Unit::Day => Some(date),
        Unit::Week => {
            let offset = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(Days::new(offset))
        }
        Unit::Month => date.with_day(1),
        Unit::Quarter => NaiveDate::from_ymd_opt(date.year(), quarter_first_month(date), 1),
        Unit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    }
}

fn end_of(unit: Unit, date: NaiveDate) -> Option<NaiveDate> {
    match unit {
        Unit::Day => Some(date),
        Unit::Week => start_of(Unit::Week, date)?.checked_add_days(Days::new(4)),
        Unit::Month => last_day_of_month(date.year(), date.month()),
        Unit::Quarter => last_day_of_month(date.year(), quarter_first_month(date) + 2),
        Unit::Year => NaiveDate::from_ymd_opt(date.year(), 12, 31),
    }
}

fn quarter_first_month(date: NaiveDate) -> u32 {
    (date.month0() / 3) * 3 + 1
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn check(expected: &str, reference: &str, source: &str) {
        assert_eq!(
            RelativeDateParser::parse(source, date(reference)),
            Some(date(expected)),
            "failure for {source:?}"
        );
    }

    #[test]
    fn test_single_units() {
        check("2011-04-11", "2011-04-10", "1d");
        check("2011-04-17", "2011-04-10", "1w");
        check("2011-05-10", "2011-04-10", "1m");
        check("2011-07-10", "2011-04-10", "1q");
        check("2012-04-10", "2011-04-10", "1y");
        check("2011-04-12", "2011-04-10", "2D");
        check("2012-01-10", "2011-04-10", "3Q");
        check("2010-04-10", "2011-04-10", " -1y");
        check("2011-03-10", "2011-04-10", "-1m ");
    }

    #[test]
    fn test_multiple_terms() {
        check("2015-07-25", "2011-04-10", "1d 2w 3m 4y ");
        check("2111-03-09", "2011-04-10", " -30D+52W-12M+100Y");
    }

    #[test]
    fn test_unsigned_term_inherits_sign() {
        check("2007-10-10", "2011-04-10", "-3y6m");
        check("2007-10-10", "2011-04-10", "-3y 6m");
        check("2007-10-10", "2011-04-10", "-3y-6m");
        check("2008-10-10", "2011-04-10", "-3y+6m");
    }

    #[test]
    fn test_terms_applied_in_order_across_leap_year() {
        check("2008-02-29", "2011-08-30", "-3y 6m");
        check("2008-02-28", "2011-08-30", "-6m 3y");
    }

    #[test]
    fn test_start_and_end_modifiers() {
        let cases = [
            ("0ds", "2014-08-25"),
            ("0de", "2014-08-25"),
            ("0ws", "2014-08-25"),
            ("0we", "2014-08-29"),
            ("0ms", "2014-08-01"),
            ("0me", "2014-08-31"),
            ("0qs", "2014-07-01"),
            ("0qe", "2014-09-30"),
            ("0ys", "2014-01-01"),
            ("0ye", "2014-12-31"),
            ("-3ws", "2014-08-04"),
            ("-3ms", "2014-05-01"),
            ("-1qs", "2014-04-01"),
            ("-2qs", "2014-01-01"),
            ("-3qs", "2013-10-01"),
            ("-4qs", "2013-07-01"),
            ("-3ys", "2011-01-01"),
            ("-4qs+2d", "2013-07-03"),
            ("-3ys+4d", "2011-01-05"),
            ("-3ys+4d+2m", "2011-03-05"),
        ];
        for (source, expected) in cases {
            check(expected, "2014-08-25", source);
        }
    }

    #[test]
    fn test_quarters() {
        for reference in ["2014-07-01", "2014-08-25", "2014-09-30"] {
            check("2014-07-01", reference, "0qs");
            check("2014-09-30", reference, "0qe");
            check("2014-04-01", reference, "-1qs");
            check("2014-06-30", reference, "-1qe");
            check("2013-07-01", reference, "-4qs");
            check("2013-09-30", reference, "-4qe");
            check("2014-10-01", reference, "1qs");
            check("2014-12-31", reference, "1qe");
            check("2015-07-01", reference, "4qs");
            check("2015-09-30", reference, "4qe");
        }
        check("2014-08-25", "2014-08-25", "0q");
        check("2014-06-30", "2014-09-30", "-1q");
        check("2014-12-30", "2014-09-30", "1q");
        check("2013-09-30", "2014-09-30", "-4q");
    }

    #[test]
    fn test_week_end_is_friday() {
        // Sunday belongs to the week starting the previous Monday
        check("2014-08-29", "2014-08-31", "0we");
        check("2014-08-25", "2014-08-31", "0ws");
    }

    #[test]
    fn test_invalid_expressions() {
        let reference = date("2014-08-25");
        for source in ["", "  ", "-", "-1", " d", "-1dy", "-1z", "1d1z", "1qw", "1d -", "1 d"] {
            assert_eq!(
                RelativeDateParser::parse(source, reference),
                None,
                "{source:?} should not parse"
            );
        }
    }

    #[test]
    fn test_overflow_is_rejected() {
        let reference = date("2014-08-25");
        assert_eq!(RelativeDateParser::parse("99999999999d", reference), None);
        assert_eq!(RelativeDateParser::parse("4000000000y", reference), None);
        assert_eq!(RelativeDateParser::parse("9999999y", reference), None);
    }

    #[test]
    fn test_parse_today() {
        let today = Local::now().date_naive();
        assert_eq!(RelativeDateParser::parse_today("0d"), Some(today));
    }
}
