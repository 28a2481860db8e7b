//! Age arithmetic from a birth date.

use chrono::{Datelike, NaiveDate};

/// Full years lived between `birth_date` and `today`.
///
/// A birthday counts once its month/day has been reached. For a Feb 29
/// birthday that means Mar 1 in non-leap years. Returns a negative value for
/// birth dates in the future.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let before_birthday = (today.month(), today.day()) < (birth_date.month(), birth_date.day());
    today.year() - birth_date.year() - i32::from(before_birthday)
}

/// Whether someone born on `birth_date` is at least `min_age` years old on `today`.
pub fn is_adult(birth_date: NaiveDate, today: NaiveDate, min_age: i32) -> bool {
    age_on(birth_date, today) >= min_age
}
