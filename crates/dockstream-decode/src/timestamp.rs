use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Runtime-prefixed timestamps look like `2024-01-15T10:30:00.123456789Z`,
/// with fractional seconds of variable length and an optional numeric zone
/// suffix.
static RE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]+Z[0-9+-]*")
        .expect("timestamp pattern is valid")
});

/// How far into a line the timestamp may start and still count as a prefix.
/// Tolerates short junk ahead of the prefix (e.g. multiplexing headers) but
/// rejects timestamps quoted mid-message.
pub(crate) const MAX_PREFIX_OFFSET: usize = 10;

/// Outcome of scanning a line for its timestamp prefix
pub(crate) enum TimestampPrefix<'a> {
    /// Parsed instant plus the message remainder after the separator byte
    Parsed {
        timestamp: DateTime<Utc>,
        rest: &'a str,
    },
    /// The pattern matched but the value is not a real instant
    Unparseable { error: chrono::ParseError },
    /// No timestamp within the first [`MAX_PREFIX_OFFSET`] bytes
    Missing,
}

/// Scan `line` for a leading runtime timestamp
pub(crate) fn extract(line: &str) -> TimestampPrefix<'_> {
    let Some(m) = RE_TIME.find(line) else {
        return TimestampPrefix::Missing;
    };
    if m.start() >= MAX_PREFIX_OFFSET {
        return TimestampPrefix::Missing;
    }

    match DateTime::parse_from_rfc3339(m.as_str()) {
        Ok(ts) => {
            // One separator byte follows the prefix; the remainder is the message
            let rest = line.get(m.end() + 1..).unwrap_or("");
            TimestampPrefix::Parsed {
                timestamp: ts.with_timezone(&Utc),
                rest,
            }
        }
        Err(error) => TimestampPrefix::Unparseable { error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_extract_full_precision_prefix() {
        let line = "2024-01-02T03:04:05.123456789Z hello world";
        match extract(line) {
            TimestampPrefix::Parsed { timestamp, rest } => {
                let expected = Utc
                    .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
                    .unwrap()
                    .with_nanosecond(123_456_789)
                    .unwrap();
                assert_eq!(timestamp, expected);
                assert_eq!(rest, "hello world");
            }
            _ => panic!("expected a parsed prefix"),
        }
    }

    #[test]
    fn test_extract_requires_fractional_seconds() {
        // Runtimes always emit fractional seconds; without them the pattern
        // does not match
        assert!(matches!(
            extract("2024-01-02T03:04:05Z hello"),
            TimestampPrefix::Missing
        ));
    }

    #[test]
    fn test_extract_missing_prefix() {
        assert!(matches!(
            extract("plain text with no timestamp"),
            TimestampPrefix::Missing
        ));
    }

    #[test]
    fn test_extract_rejects_late_prefix() {
        let line = "a message quoting 2024-01-02T03:04:05.000Z later on";
        assert!(matches!(extract(line), TimestampPrefix::Missing));
    }

    #[test]
    fn test_extract_accepts_short_leading_junk() {
        let line = "!! 2024-01-02T03:04:05.000Z msg";
        assert!(matches!(extract(line), TimestampPrefix::Parsed { .. }));
    }

    #[test]
    fn test_extract_invalid_calendar_value() {
        // Matches the pattern but month 13 is not a real instant
        let line = "2024-13-02T03:04:05.000Z msg";
        assert!(matches!(extract(line), TimestampPrefix::Unparseable { .. }));
    }

    #[test]
    fn test_extract_prefix_at_end_of_line() {
        // No separator or message after the prefix
        let line = "2024-01-02T03:04:05.000Z";
        match extract(line) {
            TimestampPrefix::Parsed { rest, .. } => assert_eq!(rest, ""),
            _ => panic!("expected a parsed prefix"),
        }
    }

    #[test]
    fn test_extract_multibyte_utf8_no_panic() {
        // Box-drawing characters are 3 bytes each; slicing after the prefix
        // must not land inside one
        let line = "2024-01-02T03:04:05.000Z╭───╮";
        match extract(line) {
            TimestampPrefix::Parsed { rest, .. } => assert_eq!(rest, ""),
            _ => panic!("expected a parsed prefix"),
        }
    }
}
