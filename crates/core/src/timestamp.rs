//! Text forms of message timestamps.
//!
//! Messages keep a [`NaiveDateTime`] in memory. It is turned into text only
//! when written to a chat log ([`ISO_FORMAT`]) or sent to the completion
//! service and shown on screen ([`DISPLAY_FORMAT`]).

use std::fmt::{self, Display};

use chrono::NaiveDateTime;

/// ISO 8601 with microseconds, as stored in chat logs.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Second precision, as shown to people and sent to the completion service.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A timestamp that isn't in [`ISO_FORMAT`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidTimestamp(String);

impl Display for InvalidTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timestamp {:?} is not in the form YYYY-MM-DDTHH:MM:SS.ffffff",
            self.0
        )
    }
}

impl std::error::Error for InvalidTimestamp {}

/// Formats a timestamp for a chat log.
#[inline]
pub fn to_iso(timestamp: &NaiveDateTime) -> String {
    timestamp.format(ISO_FORMAT).to_string()
}

/// Formats a timestamp for display, dropping the fractional seconds.
#[inline]
pub fn to_display(timestamp: &NaiveDateTime) -> String {
    timestamp.format(DISPLAY_FORMAT).to_string()
}

/// Parses a timestamp written by [`to_iso`].
///
/// Only the exact layout is accepted: no offsets, no missing or extra
/// fractional digits, no space instead of `T`.
pub fn parse_iso(text: &str) -> Result<NaiveDateTime, InvalidTimestamp> {
    let parsed = NaiveDateTime::parse_from_str(text, ISO_FORMAT)
        .map_err(|_| InvalidTimestamp(text.to_owned()))?;
    // The parser tolerates a few variations; anything that doesn't format
    // back to the same text is not ours.
    if to_iso(&parsed) != text {
        return Err(InvalidTimestamp(text.to_owned()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_micro_opt(9, 3, 7, 120_500)
            .unwrap()
    }

    #[test]
    fn test_formats() {
        assert_eq!(to_iso(&sample()), "2024-05-01T09:03:07.120500");
        assert_eq!(to_display(&sample()), "2024-05-01 09:03:07");
    }

    #[test]
    fn test_parse_iso() {
        assert_eq!(parse_iso("2024-05-01T09:03:07.120500"), Ok(sample()));
    }

    #[test]
    fn test_parse_rejects_other_layouts() {
        for text in [
            "2024-05-01 09:03:07",
            "2024-05-01 09:03:07.120500",
            "2024-05-01T09:03:07",
            "2024-05-01T09:03:07.1205",
            "2024-05-01T09:03:07.120500000",
            "2024-05-01T09:03:07.120500+09:00",
            "2024-05-01T09:03:07.120500Z",
            "yesterday",
            "",
        ] {
            assert!(parse_iso(text).is_err(), "{text:?} should be rejected");
        }
    }
}
