//! Structural parsing of raw input lines.
//!
//! Input format: `logType|eventTime|rawData`. Only the field count is checked
//! here; a bad timestamp is reported later by the time deriver.

use crate::error::ParseError;

pub const FIELD_DELIMITER: char = '|';
pub const FIELD_COUNT: usize = 3;

/// The three fields of one input line, borrowed from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFields<'a> {
    pub log_type: &'a str,
    pub event_time: &'a str,
    pub raw_data: &'a str,
}

/// Split a raw line into its fields.
///
/// A trailing `\r` is dropped so CRLF files parse the same as LF files.
/// Any field count other than [`FIELD_COUNT`] is rejected, including lines
/// whose payload itself contains the delimiter.
pub fn parse_line(line: &str) -> Result<ParsedFields<'_>, ParseError> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut fields = line.split(FIELD_DELIMITER);
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(log_type), Some(event_time), Some(raw_data), None) => Ok(ParsedFields {
            log_type,
            event_time,
            raw_data,
        }),
        _ => Err(ParseError::FieldCount {
            expected: FIELD_COUNT,
            found: line.split(FIELD_DELIMITER).count(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_fields() {
        let fields = parse_line("nginx|2024-01-01 00:00:00|GET /index.html 200").unwrap();
        assert_eq!(fields.log_type, "nginx");
        assert_eq!(fields.event_time, "2024-01-01 00:00:00");
        assert_eq!(fields.raw_data, "GET /index.html 200");
    }

    #[test]
    fn rejects_wrong_field_counts() {
        assert_eq!(
            parse_line("bad-line"),
            Err(ParseError::FieldCount {
                expected: 3,
                found: 1
            })
        );
        assert_eq!(
            parse_line("a|b"),
            Err(ParseError::FieldCount {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            parse_line("a|b|c|d"),
            Err(ParseError::FieldCount {
                expected: 3,
                found: 4
            })
        );
    }

    #[test]
    fn empty_fields_are_structurally_valid() {
        let fields = parse_line("||").unwrap();
        assert_eq!(fields.log_type, "");
        assert_eq!(fields.event_time, "");
        assert_eq!(fields.raw_data, "");
    }

    #[test]
    fn strips_carriage_return() {
        let fields = parse_line("app|2024-01-01T00:00:00|hello\r").unwrap();
        assert_eq!(fields.raw_data, "hello");
    }
}
