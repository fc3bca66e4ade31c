//! The single accepted text layout for timestamps and the published timestamp representation.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike, Utc};
use thiserror::Error;

/// Human-readable form of the only accepted text layout.
pub const TEXT_LAYOUT: &str = "YYYY-MM-DD HH:MM:SS ZZZ";

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("{input:?} does not match layout {TEXT_LAYOUT}")]
    Layout { input: String },

    #[error("{input:?} has unrecognized zone abbreviation {zone:?}")]
    Zone { input: String, zone: String },

    #[error("{input:?} has an invalid date or time: {source}")]
    DateTime {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{input:?} is outside the representable range")]
    OutOfRange { input: String },

    #[error("year {year} is outside [0, 9999]")]
    YearOutOfRange { year: i32 },
}

/// Parses `YYYY-MM-DD HH:MM:SS ZZZ` into a UTC instant.
///
/// Every numeric field is zero-padded to its full width and second 60 is rejected.
///
/// `UTC` and `GMT` are offset zero and `GMT+h` / `GMT-h` carry whole-hour offsets. Any other
/// abbreviation of three uppercase letters (or four/five ending in `T`, plus `ChST` and `MeST`)
/// is accepted without a known offset and treated as UTC.
pub fn parse_text_timestamp(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let layout_error = || TimestampError::Layout {
        input: input.to_string(),
    };
    let (date_time, zone) = input.rsplit_once(' ').ok_or_else(layout_error)?;
    if !has_fixed_width_shape(date_time) {
        return Err(layout_error());
    }

    let offset_seconds = zone_offset_seconds(zone).ok_or_else(|| TimestampError::Zone {
        input: input.to_string(),
        zone: zone.to_string(),
    })?;

    let naive = NaiveDateTime::parse_from_str(date_time, DATE_TIME_FORMAT).map_err(|source| {
        TimestampError::DateTime {
            input: input.to_string(),
            source,
        }
    })?;
    if naive.nanosecond() >= 1_000_000_000 {
        return Err(TimestampError::OutOfRange {
            input: input.to_string(),
        });
    }

    FixedOffset::east_opt(offset_seconds)
        .and_then(|offset| naive.and_local_timezone(offset).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| TimestampError::OutOfRange {
            input: input.to_string(),
        })
}

/// `YYYY-MM-DD HH:MM:SS`, byte for byte.
fn has_fixed_width_shape(date_time: &str) -> bool {
    const SHAPE: &[u8; 19] = b"dddd-dd-dd dd:dd:dd";
    let bytes = date_time.as_bytes();
    bytes.len() == SHAPE.len()
        && bytes.iter().zip(SHAPE).all(|(byte, expected)| match expected {
            b'd' => byte.is_ascii_digit(),
            separator => byte == separator,
        })
}

fn zone_offset_seconds(zone: &str) -> Option<i32> {
    if matches!(zone, "UTC" | "GMT" | "ChST" | "MeST") {
        return Some(0);
    }
    if let Some(rest) = zone.strip_prefix("GMT") {
        return gmt_offset_seconds(rest);
    }

    let uppercase = zone.bytes().all(|byte| byte.is_ascii_uppercase());
    let accepted = match zone.len() {
        3 => uppercase,
        4 | 5 => uppercase && zone.ends_with('T'),
        _ => false,
    };
    accepted.then_some(0)
}

fn gmt_offset_seconds(rest: &str) -> Option<i32> {
    let (sign, digits) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits.parse().ok()?;
    (hours <= 23).then_some(sign * hours * 3600)
}

/// RFC 3339 in UTC with a `Z` suffix. Fractional seconds appear only when non-zero and
/// carry no trailing zeros.
pub fn format_rfc3339(value: &DateTime<Utc>) -> Result<String, TimestampError> {
    let year = value.year();
    if !(0..=9999).contains(&year) {
        return Err(TimestampError::YearOutOfRange { year });
    }

    let base = value.format("%Y-%m-%dT%H:%M:%S");
    let nanos = value.timestamp_subsec_nanos() % 1_000_000_000;
    if nanos == 0 {
        return Ok(format!("{base}Z"));
    }
    let digits = format!("{nanos:09}");
    Ok(format!("{base}.{}Z", digits.trim_end_matches('0')))
}
