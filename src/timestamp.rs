//! Parsing of the platform's `YYYY-MM-DD HH:MM AM/PM ZONE` timestamps into
//! instants in the reference zone.

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::{OffsetComponents, Tz};

use crate::config::{TimestampConfig, TimestampShape};
use crate::errors::GradebookError;
use crate::models::Instant;

const WALL_CLOCK_FORMAT: &str = "%Y-%m-%d %I:%M %p";

/// Shift applied to every parsed due date to match how the platform displays them.
pub const DUE_DATE_SHIFT_HOURS: i64 = 1;

pub const DUE_DATE_FIELD: &str = "Due date";
pub const SUBMISSION_DATE_FIELD: &str = "Score date";

pub fn parse_due_date(
    raw: Option<&str>,
    config: &TimestampConfig,
) -> Result<Instant, GradebookError> {
    let instant = parse_instant(DUE_DATE_FIELD, raw, config.due_shape, config.zone)?;
    Ok(match instant {
        Instant::At(value) => Instant::At(value + Duration::hours(DUE_DATE_SHIFT_HOURS)),
        Instant::Absent => Instant::Absent,
    })
}

pub fn parse_submission_date(
    raw: Option<&str>,
    config: &TimestampConfig,
) -> Result<Instant, GradebookError> {
    parse_instant(
        SUBMISSION_DATE_FIELD,
        raw,
        config.submission_shape,
        config.zone,
    )
}

/// Parses one timestamp field. Blank input is `Absent`; anything else must
/// match the configured shape exactly.
pub fn parse_instant(
    field: &'static str,
    raw: Option<&str>,
    shape: TimestampShape,
    zone: Tz,
) -> Result<Instant, GradebookError> {
    let text = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return Ok(Instant::Absent),
    };

    let parsed = match shape {
        TimestampShape::Qualified => parse_qualified(field, text)?.with_timezone(&zone),
        TimestampShape::Implied => {
            let (wall, _) = split_abbreviation(text);
            let naive = parse_wall_clock(field, text, wall)?;
            localize_standard(naive, zone)
        }
    };

    Ok(Instant::At(parsed))
}

fn parse_qualified(field: &'static str, text: &str) -> Result<DateTime<FixedOffset>, GradebookError> {
    let (wall, abbreviation) = split_abbreviation(text);
    let abbreviation =
        abbreviation.ok_or_else(|| parse_error(field, text, "missing zone abbreviation"))?;
    let offset = abbreviation_offset(abbreviation).ok_or_else(|| {
        parse_error(
            field,
            text,
            &format!("unrecognized zone abbreviation {abbreviation:?}"),
        )
    })?;
    let naive = parse_wall_clock(field, text, wall)?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| parse_error(field, text, "time does not exist at that offset"))
}

/// Splits `... 11:59 PM PST` into the wall-clock part and the trailing zone
/// token. Returns no token when the text ends with the meridiem.
fn split_abbreviation(text: &str) -> (&str, Option<&str>) {
    match text.rsplit_once(' ') {
        Some((wall, token))
            if token.chars().all(|c| c.is_ascii_alphabetic())
                && !token.eq_ignore_ascii_case("am")
                && !token.eq_ignore_ascii_case("pm") =>
        {
            (wall.trim_end(), Some(token))
        }
        _ => (text, None),
    }
}

fn parse_wall_clock(
    field: &'static str,
    text: &str,
    wall: &str,
) -> Result<NaiveDateTime, GradebookError> {
    NaiveDateTime::parse_from_str(wall, WALL_CLOCK_FORMAT)
        .map_err(|err| parse_error(field, text, &err.to_string()))
}

fn abbreviation_offset(abbreviation: &str) -> Option<FixedOffset> {
    let hours = match abbreviation.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => 0,
        "HST" => -10,
        "AKST" => -9,
        "AKDT" | "PST" => -8,
        "PDT" | "MST" => -7,
        "MDT" | "CST" => -6,
        "CDT" | "EST" => -5,
        "EDT" => -4,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// Localizes a wall-clock time without DST inference: ambiguous times take the
/// standard-time reading, and times inside a spring-forward gap are read at the
/// zone's standard offset.
fn localize_standard(naive: NaiveDateTime, zone: Tz) -> DateTime<Tz> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(value) => value,
        LocalResult::Ambiguous(first, second) => {
            if first.offset().dst_offset() == Duration::zero() {
                first
            } else {
                second
            }
        }
        LocalResult::None => {
            let standard = zone.offset_from_utc_datetime(&naive).base_utc_offset();
            zone.from_utc_datetime(&(naive - standard))
        }
    }
}

fn parse_error(field: &'static str, raw: &str, reason: &str) -> GradebookError {
    GradebookError::Parse {
        field,
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::America::Los_Angeles;

    fn utc(text: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    fn at(instant: Instant) -> DateTime<Utc> {
        instant.as_datetime().unwrap().with_timezone(&Utc)
    }

    #[test]
    fn blank_input_is_absent() {
        for raw in [None, Some(""), Some("   ")] {
            let instant = parse_instant("Score date", raw, TimestampShape::Qualified, Los_Angeles)
                .unwrap();
            assert!(instant.is_absent());
        }
    }

    #[test]
    fn qualified_form_converts_into_target_zone() {
        let instant = parse_instant(
            "Score date",
            Some("2024-07-01 12:00 PM EDT"),
            TimestampShape::Qualified,
            Los_Angeles,
        )
        .unwrap();

        assert_eq!(at(instant), utc("2024-07-01 16:00"));
        assert_eq!(instant.as_datetime().unwrap().timezone(), Los_Angeles);
    }

    #[test]
    fn both_shapes_agree_for_the_same_wall_clock() {
        for raw in ["2024-01-12 08:00 AM PST", "2024-07-12 08:00 AM PDT"] {
            let qualified =
                parse_instant("Score date", Some(raw), TimestampShape::Qualified, Los_Angeles)
                    .unwrap();
            let implied =
                parse_instant("Score date", Some(raw), TimestampShape::Implied, Los_Angeles)
                    .unwrap();
            assert_eq!(qualified, implied, "{raw}");
        }
    }

    #[test]
    fn implied_form_ignores_the_abbreviation() {
        let instant = parse_instant(
            "Score date",
            Some("2024-01-12 08:00 AM EST"),
            TimestampShape::Implied,
            Los_Angeles,
        )
        .unwrap();
        assert_eq!(at(instant), utc("2024-01-12 16:00"));
    }

    #[test]
    fn implied_ambiguous_time_uses_standard_offset() {
        let instant = parse_instant(
            "Score date",
            Some("2024-11-03 01:30 AM PST"),
            TimestampShape::Implied,
            Los_Angeles,
        )
        .unwrap();
        assert_eq!(at(instant), utc("2024-11-03 09:30"));
    }

    #[test]
    fn implied_nonexistent_time_uses_standard_offset() {
        let instant = parse_instant(
            "Score date",
            Some("2024-03-10 02:30 AM PST"),
            TimestampShape::Implied,
            Los_Angeles,
        )
        .unwrap();
        assert_eq!(at(instant), utc("2024-03-10 10:30"));
    }

    #[test]
    fn due_dates_are_shifted_one_hour() {
        let config = TimestampConfig::default();
        let due = parse_due_date(Some("2024-01-10 11:59 PM PST"), &config).unwrap();
        assert_eq!(at(due), utc("2024-01-11 08:59"));

        let submitted = parse_submission_date(Some("2024-01-10 11:59 PM PST"), &config).unwrap();
        assert_eq!(at(submitted), utc("2024-01-11 07:59"));
    }

    #[test]
    fn malformed_text_is_a_parse_error_naming_the_field() {
        let config = TimestampConfig::default();
        let err = parse_due_date(Some("next tuesday"), &config).unwrap_err();
        match err {
            GradebookError::Parse { field, raw, .. } => {
                assert_eq!(field, DUE_DATE_FIELD);
                assert_eq!(raw, "next tuesday");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn qualified_form_requires_a_known_abbreviation() {
        for raw in ["2024-01-12 08:00 AM", "2024-01-12 08:00 AM XYZ"] {
            let err = parse_instant("Score date", Some(raw), TimestampShape::Qualified, Los_Angeles)
                .unwrap_err();
            assert!(matches!(err, GradebookError::Parse { .. }), "{raw}");
        }
    }

    #[test]
    fn twenty_four_hour_text_is_rejected() {
        let err = parse_instant(
            "Score date",
            Some("2024-01-12 18:00 PST"),
            TimestampShape::Implied,
            Los_Angeles,
        )
        .unwrap_err();
        assert!(matches!(err, GradebookError::Parse { field: "Score date", .. }));
    }
}
