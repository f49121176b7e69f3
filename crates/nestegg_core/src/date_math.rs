//! Fast date arithmetic helpers that bypass jiff's `Span` machinery.
//!
//! The simulation steps one calendar year at a time and needs whole-year
//! ages for every person on every step. jiff `Span` arithmetic is correct but
//! heavy for that loop, so the helpers here work directly on the civil
//! year/month/day fields.

use jiff::civil::Date;

/// Fast leap year check.
#[inline]
pub fn is_leap_year(year: i16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Fast inline days-in-month calculation without creating a `jiff::civil::Date`.
#[inline]
pub fn days_in_month(year: i16, month: i8) -> i8 {
    const DAYS: [i8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[(month - 1) as usize]
    }
}

/// Shift a date by whole years, clamping Feb 29 to Feb 28 in common years.
///
/// The shifted year must lie in jiff's civil range (-9999..=9999);
/// `SimulationRequest::validate` bounds the horizon so simulated years do.
#[inline]
pub fn add_years(d: Date, years: i16) -> Date {
    let year = d.year() + years;
    let day = d.day().min(days_in_month(year, d.month()));
    jiff::civil::date(year, d.month(), day)
}

/// Completed years of age on `on` for someone born on `birth`.
///
/// Negative when `on` precedes the birthday year. A Feb 29 birthday
/// counts as reached on Mar 1 in common years.
#[inline]
pub fn age_on(birth: Date, on: Date) -> i16 {
    let mut age = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Number of whole years from `from` until `birth` reaches `target_age`,
/// zero when that age has already been reached.
#[inline]
pub fn years_until_age(birth: Date, from: Date, target_age: u8) -> usize {
    let current = age_on(birth, from);
    (i16::from(target_age) - current).max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2025));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 4), 30);
    }

    #[test]
    fn test_add_years_basic() {
        assert_eq!(add_years(date(2025, 6, 15), 1), date(2026, 6, 15));
        assert_eq!(add_years(date(2025, 6, 15), 30), date(2055, 6, 15));
        assert_eq!(add_years(date(2025, 6, 15), -5), date(2020, 6, 15));
    }

    #[test]
    fn test_add_years_leap_day_clamps() {
        assert_eq!(add_years(date(2024, 2, 29), 1), date(2025, 2, 28));
        assert_eq!(add_years(date(2024, 2, 29), 4), date(2028, 2, 29));
    }

    #[test]
    fn test_add_years_matches_jiff() {
        let cases = [date(2020, 1, 1), date(2023, 7, 31), date(2025, 12, 31)];
        for d in cases {
            for n in [1i16, 7, 40] {
                let expected = d.checked_add(jiff::Span::new().years(n)).unwrap();
                assert_eq!(add_years(d, n), expected, "mismatch for {d} + {n}y");
            }
        }
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let birth = date(1960, 6, 15);
        assert_eq!(age_on(birth, date(2025, 6, 14)), 64);
        assert_eq!(age_on(birth, date(2025, 6, 15)), 65);
        assert_eq!(age_on(birth, date(2025, 12, 31)), 65);
    }

    #[test]
    fn test_age_on_before_birth() {
        assert_eq!(age_on(date(2000, 3, 1), date(1999, 3, 1)), -1);
    }

    #[test]
    fn test_age_on_leap_birthday() {
        let birth = date(1956, 2, 29);
        assert_eq!(age_on(birth, date(2025, 2, 28)), 68);
        assert_eq!(age_on(birth, date(2025, 3, 1)), 69);
    }

    #[test]
    fn test_years_until_age() {
        let birth = date(1960, 1, 1);
        assert_eq!(years_until_age(birth, date(2025, 1, 1), 95), 30);
        assert_eq!(years_until_age(birth, date(2025, 1, 1), 60), 0);
    }
}
