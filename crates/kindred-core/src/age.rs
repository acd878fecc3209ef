//! # Dates and Ages
//!
//! Parsing of genealogical date strings and exact age computation.
//!
//! Accepted forms:
//! - GEDCOM-X formal dates: `+1900-01-31`, `+1900-01`, `+1900`, optionally
//!   prefixed with `A` (approximate).
//! - GEDCOM dates: `31 JAN 1900`, `JAN 1900`, `1900`, optionally prefixed with
//!   `ABT`, `EST`, `CAL`, `BEF` or `AFT`.
//!
//! Ages are whole years. When both dates carry a day the subtraction is
//! calendar-accurate; with coarser precision the missing parts are ignored.

use crate::{FactType, Person};
use chrono::{Datelike, NaiveDate};

/// A parsed date with whatever precision the source carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenealogyDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub approximate: bool,
}

impl GenealogyDate {
    /// A full calendar date.
    #[must_use]
    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: Some(date.month()),
            day: Some(date.day()),
            approximate: false,
        }
    }

    /// The calendar date when day precision is available.
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month?, self.day?)
    }
}

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const GEDCOM_QUALIFIERS: [&str; 6] = ["ABT", "ABOUT", "EST", "CAL", "BEF", "AFT"];

/// Parse a date string. Returns `None` for anything unrecognized.
#[must_use]
pub fn parse_date(raw: &str) -> Option<GenealogyDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (approximate, rest) = match trimmed.strip_prefix('A') {
        Some(rest) if rest.starts_with(['+', '-']) => (true, rest),
        _ => (false, trimmed),
    };
    if rest.starts_with(['+', '-']) {
        return parse_formal(rest).map(|date| GenealogyDate {
            approximate,
            ..date
        });
    }

    parse_gedcom(trimmed)
}

fn parse_formal(raw: &str) -> Option<GenealogyDate> {
    let (sign, body) = raw.split_at(1);
    let mut parts = body.split('-');

    let year: i32 = parts.next()?.parse().ok()?;
    let year = if sign == "-" { -year } else { year };
    let month = parts.next().map(str::parse::<u32>).transpose().ok()?;
    let day = parts.next().map(str::parse::<u32>).transpose().ok()?;
    if parts.next().is_some() {
        return None;
    }

    validate(GenealogyDate {
        year,
        month,
        day,
        approximate: false,
    })
}

fn parse_gedcom(raw: &str) -> Option<GenealogyDate> {
    let upper = raw.to_ascii_uppercase();
    let mut tokens: Vec<&str> = upper.split_whitespace().collect();

    let approximate = tokens
        .first()
        .is_some_and(|first| GEDCOM_QUALIFIERS.contains(first));
    if approximate {
        tokens.remove(0);
    }

    let date = match tokens.as_slice() {
        [year] => GenealogyDate {
            year: year.parse().ok()?,
            month: None,
            day: None,
            approximate,
        },
        [month, year] => GenealogyDate {
            year: year.parse().ok()?,
            month: Some(month_number(month)?),
            day: None,
            approximate,
        },
        [day, month, year] => GenealogyDate {
            year: year.parse().ok()?,
            month: Some(month_number(month)?),
            day: Some(day.parse().ok()?),
            approximate,
        },
        _ => return None,
    };

    validate(date)
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|month| token.starts_with(month))
        .map(|index| index as u32 + 1)
}

fn validate(date: GenealogyDate) -> Option<GenealogyDate> {
    match (date.month, date.day) {
        (Some(_), Some(_)) => date.to_naive().map(|_| date),
        (Some(month), None) => (1..=12).contains(&month).then_some(date),
        (None, Some(_)) => None,
        (None, None) => Some(date),
    }
}

/// Whole years elapsed between two dates, `None` if `to` precedes `from`.
#[must_use]
pub fn years_between(from: &GenealogyDate, to: &GenealogyDate) -> Option<i64> {
    if let (Some(from), Some(to)) = (from.to_naive(), to.to_naive()) {
        return to.years_since(from).map(i64::from);
    }

    let mut years = i64::from(to.year) - i64::from(from.year);
    if let (Some(from_month), Some(to_month)) = (from.month, to.month)
        && to_month < from_month
    {
        years -= 1;
    }
    (years >= 0).then_some(years)
}

/// Exact age of a person, if the record allows one.
///
/// Birth to death, or birth to `as_of` for living persons, or a numeric Age
/// fact (`42`, `42y`).
#[must_use]
pub fn exact_age(person: &Person, as_of: NaiveDate) -> Option<i64> {
    let from_dates = person.birth_date().and_then(parse_date).and_then(|birth| {
        match person.death_date().and_then(parse_date) {
            Some(death) => years_between(&birth, &death),
            None if person.is_living() => {
                years_between(&birth, &GenealogyDate::from_naive(as_of))
            }
            None => None,
        }
    });

    from_dates.or_else(|| {
        person
            .fact(&FactType::Age)?
            .value
            .as_deref()?
            .trim()
            .trim_end_matches(['y', 'Y'])
            .parse::<i64>()
            .ok()
            .filter(|age| *age >= 0)
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fact, PersonId};

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn parses_formal_dates() {
        let full = parse_date("+1900-03-15").expect("parse");
        assert_eq!((full.year, full.month, full.day), (1900, Some(3), Some(15)));

        let month = parse_date("+1900-03").expect("parse");
        assert_eq!(month.day, None);

        let approx = parse_date("A+1850").expect("parse");
        assert!(approx.approximate);
        assert_eq!(approx.year, 1850);
    }

    #[test]
    fn parses_gedcom_dates() {
        let full = parse_date("15 MAR 1900").expect("parse");
        assert_eq!((full.year, full.month, full.day), (1900, Some(3), Some(15)));

        let about = parse_date("abt 1850").expect("parse");
        assert!(about.approximate);
        assert_eq!(about.month, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("+1900-13").is_none());
        assert!(parse_date("31 FEB 1900").is_none());
    }

    #[test]
    fn birthday_not_reached_subtracts_a_year() {
        let birth = GenealogyDate::from_naive(ymd(1900, 6, 1));
        let before = GenealogyDate::from_naive(ymd(1950, 5, 31));
        let on = GenealogyDate::from_naive(ymd(1950, 6, 1));

        assert_eq!(years_between(&birth, &before), Some(49));
        assert_eq!(years_between(&birth, &on), Some(50));
        assert_eq!(years_between(&on, &birth), None);
    }

    #[test]
    fn year_only_dates_use_year_difference() {
        let birth = parse_date("+1900").expect("parse");
        let death = parse_date("+1970-01-01").expect("parse");
        assert_eq!(years_between(&birth, &death), Some(70));
    }

    #[test]
    fn exact_age_from_birth_and_death() {
        let person = Person::new(PersonId(1))
            .with_fact(Fact::new(FactType::Birth).with_date("+1900-06-01"))
            .with_fact(Fact::new(FactType::Death).with_date("+1980-01-01"));

        assert_eq!(exact_age(&person, ymd(2020, 1, 1)), Some(79));
    }

    #[test]
    fn exact_age_for_living_uses_as_of() {
        let person =
            Person::new(PersonId(1)).with_fact(Fact::new(FactType::Birth).with_date("1 JAN 1990"));

        assert_eq!(exact_age(&person, ymd(2020, 1, 1)), Some(30));
    }

    #[test]
    fn dead_without_death_date_has_no_exact_age() {
        let person = Person::new(PersonId(1))
            .with_fact(Fact::new(FactType::Birth).with_date("+1900"))
            .with_fact(Fact::new(FactType::Death));

        assert_eq!(exact_age(&person, ymd(2020, 1, 1)), None);
    }

    #[test]
    fn age_fact_is_used_as_fallback() {
        let person = Person::new(PersonId(1)).with_fact(Fact::new(FactType::Age).with_value("42y"));
        assert_eq!(exact_age(&person, ymd(2020, 1, 1)), Some(42));
    }
}
