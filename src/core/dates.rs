//! Calendar helpers shared by validation and the date transforms.
//!
//! Everything is computed in UTC so that a date never shifts by a day
//! depending on the host timezone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Output layout for date reformatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `MM/DD/YYYY`
    MonthDayYear,
    /// `YYYY-MM-DD`
    YearMonthDay,
}

/// Split a `YYYY-MM-DD` or `MM/DD/YYYY` string into a calendar date.
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate, String> {
    let trimmed = input.trim();
    let (year, month, day) = if trimmed.contains('-') {
        let parts = split_numbers(trimmed, '-')?;
        (parts[0], parts[1], parts[2])
    } else if trimmed.contains('/') {
        let parts = split_numbers(trimmed, '/')?;
        (parts[2], parts[0], parts[1])
    } else {
        return Err(format!("invalid date format: '{}'", input));
    };
    let month = u32::try_from(month).map_err(|_| format!("invalid month in '{}'", input))?;
    let day = u32::try_from(day).map_err(|_| format!("invalid day in '{}'", input))?;
    let year = i32::try_from(year).map_err(|_| format!("invalid year in '{}'", input))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("'{}' is not a calendar date", input))
}

fn split_numbers(input: &str, separator: char) -> Result<[i64; 3], String> {
    let parts: Vec<&str> = input.split(separator).collect();
    if parts.len() != 3 {
        return Err(format!("invalid date format: '{}'", input));
    }
    let mut numbers = [0_i64; 3];
    for (slot, part) in numbers.iter_mut().zip(parts) {
        *slot = part
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid date component '{}' in '{}'", part, input))?;
    }
    Ok(numbers)
}

/// Reformat a date string into the requested layout with zero-padded month and day.
pub fn reformat_date(input: &str, layout: DateLayout) -> Result<String, String> {
    let date = parse_calendar_date(input)?;
    Ok(match layout {
        DateLayout::MonthDayYear => date.format("%m/%d/%Y").to_string(),
        DateLayout::YearMonthDay => date.format("%Y-%m-%d").to_string(),
    })
}

/// Parse a date or date-time string into a UTC instant.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC), and the two
/// calendar date layouts (read as UTC midnight).
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = input.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    let date = parse_calendar_date(trimmed).map_err(|_| format!("invalid date: '{}'", input))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("invalid date: '{}'", input))
}

/// Whole years elapsed between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    use chrono::Datelike;
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}
