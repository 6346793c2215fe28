// Date handling for the `/ctf-event` command.
//
// Admins type dates as `DD/MM/YYYY HH:MM` in WIB (UTC+7). Everything stored
// or sent to Discord is UTC; WIB is only used again for display.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Jakarta;
use thiserror::Error;

/// Offset of the local time admins type in, in seconds (WIB, UTC+7).
pub const WIB_OFFSET_SECS: i32 = 7 * 3600;

/// Example shown to users when parsing fails.
pub const DATE_FORMAT_HINT: &str = "DD/MM/YYYY HH:MM (e.g. 31/01/2026 15:00)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("`{0}` does not match the DD/MM/YYYY HH:MM format")]
    Format(String),
    #[error("`{0}` is not a real calendar date/time")]
    OutOfRange(String),
}

/// Parse a `DD/MM/YYYY HH:MM` string interpreted in WIB into UTC.
///
/// Every field must have exactly the digit count shown in the pattern, and
/// date and time are separated by whitespace.
pub fn parse_wib(input: &str) -> Result<DateTime<Utc>, ScheduleError> {
    let format_err = || ScheduleError::Format(input.to_string());

    let mut parts = input.split_whitespace();
    let (date_part, time_part) = match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(time), None) => (date, time),
        _ => return Err(format_err()),
    };
    // The pattern is anchored, so leading/trailing whitespace is not accepted.
    if input.trim() != input {
        return Err(format_err());
    }

    let date_fields: Vec<&str> = date_part.split('/').collect();
    let time_fields: Vec<&str> = time_part.split(':').collect();
    if date_fields.len() != 3 || time_fields.len() != 2 {
        return Err(format_err());
    }

    let day = digits(date_fields[0], 2).ok_or_else(format_err)?;
    let month = digits(date_fields[1], 2).ok_or_else(format_err)?;
    let year = digits(date_fields[2], 4).ok_or_else(format_err)?;
    let hour = digits(time_fields[0], 2).ok_or_else(format_err)?;
    let minute = digits(time_fields[1], 2).ok_or_else(format_err)?;

    let out_of_range = || ScheduleError::OutOfRange(input.to_string());
    let naive = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or_else(out_of_range)?;

    let wib = FixedOffset::east_opt(WIB_OFFSET_SECS).ok_or_else(out_of_range)?;
    let local = wib
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(out_of_range)?;

    Ok(local.with_timezone(&Utc))
}

/// Parse a field of exactly `width` ASCII digits.
fn digits(field: &str, width: usize) -> Option<u32> {
    if field.len() != width || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Format a single instant for display, e.g. `Sat, Jan 31, 2026, 03:00 PM WIB`.
pub fn format_wib(at: DateTime<Utc>) -> String {
    at.with_timezone(&Jakarta)
        .format("%a, %b %-d, %Y, %I:%M %p %Z")
        .to_string()
}

/// Format the event period shown in embeds.
pub fn format_range(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("**{}** → **{}**", format_wib(start), format_wib(end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parses_wib_into_utc() {
        let parsed = parse_wib("31/01/2026 15:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_midnight_rolls_back_a_day_in_utc() {
        let parsed = parse_wib("01/03/2026 00:30").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 2, 28, 17, 30, 0).unwrap());
    }

    #[test]
    fn test_allows_extra_whitespace_between_parts() {
        assert!(parse_wib("31/01/2026    15:00").is_ok());
    }

    #[test]
    fn test_rejects_impossible_values() {
        assert_eq!(
            parse_wib("31/13/2026 25:00"),
            Err(ScheduleError::OutOfRange("31/13/2026 25:00".to_string()))
        );
        assert!(matches!(
            parse_wib("30/02/2026 10:00"),
            Err(ScheduleError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_wib("01/01/2026 12:60"),
            Err(ScheduleError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        let bad = [
            "",
            "31/01/2026",
            "15:00",
            "1/01/2026 15:00",
            "31/1/2026 15:00",
            "31/01/26 15:00",
            "31-01-2026 15:00",
            "31/01/2026 15.00",
            "31/01/2026 5:00",
            "31/01/2026T15:00",
            "31/01/2026 15:00 WIB",
            " 31/01/2026 15:00",
            "3a/01/2026 15:00",
            "+1/01/2026 15:00",
        ];
        for input in bad {
            assert!(
                matches!(parse_wib(input), Err(ScheduleError::Format(_))),
                "expected format error for {input:?}"
            );
        }
    }

    #[test]
    fn test_format_uses_wib() {
        let at = Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap();
        let shown = format_wib(at);
        assert!(shown.starts_with("Sat, Jan 31, 2026, 03:00 PM"), "{shown}");
        assert!(shown.ends_with("WIB"), "{shown}");
        assert_eq!(at.with_timezone(&Jakarta).hour(), 15);
    }

    #[test]
    fn test_format_range_contains_both_ends() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let range = format_range(start, end);
        assert!(range.contains("Jan 31"));
        assert!(range.contains("Feb 1"));
    }
}
