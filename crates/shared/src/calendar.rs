//! Working-day arithmetic. Saturdays and Sundays are the only non-working days;
//! public holidays are not taken into account.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::InvalidRangeError;

pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of working days in the inclusive range `start..=end`.
pub fn count_working_days(start: NaiveDate, end: NaiveDate) -> Result<u32, InvalidRangeError> {
    if end < start {
        return Err(InvalidRangeError { start, end });
    }

    let span = (end - start).num_days() + 1;
    let full_weeks = span / 7;
    let mut count = full_weeks * 5;

    // Past the last representable date means the remainder is empty.
    if let Some(rest) = start.checked_add_signed(Duration::days(full_weeks * 7)) {
        count += rest
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| is_working_day(*day))
            .count() as i64;
    }

    Ok(count as u32)
}

/// Working days of `start..=end` that fall inside `year`. Empty intersections count as zero.
pub fn working_days_in_year(start: NaiveDate, end: NaiveDate, year: i32) -> u32 {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return 0;
    };

    count_working_days(start.max(first), end.min(last)).unwrap_or(0)
}

#[cfg(test)]
#[path = "tests/calendar_tests.rs"]
mod tests;
