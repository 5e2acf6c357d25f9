//! Response parsers
//!
//! A command response is `<tag>: <value>` with arbitrary whitespace and
//! newlines around the value. Every parser here is a pure function over the
//! raw response bytes; the connected client decides which one to apply by
//! consulting the field catalog.

use crate::error::{Error, Result};

/// Byte-level substring search, the validity test the wire protocol is built on
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Extract the value text from a response
///
/// Takes everything after the first colon (the whole payload when no colon is
/// present), decodes as UTF-8 and trims surrounding whitespace and newlines.
pub fn parse_text(resp: &[u8]) -> Result<String> {
    let start = resp
        .iter()
        .position(|&b| b == b':')
        .map_or(0, |pos| pos + 1);
    let text = std::str::from_utf8(&resp[start..])
        .map_err(|_| Error::malformed(String::from_utf8_lossy(resp), "not valid UTF-8"))?;
    Ok(text.trim().to_string())
}

/// Parse the response value as a float
pub fn parse_float(resp: &[u8]) -> Result<f64> {
    let text = parse_text(resp)?;
    text.parse::<f64>()
        .map_err(|_| Error::malformed(text, "not a valid float"))
}

/// Parse the response value as an integer
pub fn parse_int(resp: &[u8]) -> Result<i64> {
    let text = parse_text(resp)?;
    text.parse::<i64>()
        .map_err(|_| Error::malformed(text, "not a valid integer"))
}

/// Parse the response value as a boolean
///
/// The daemon writes `true`/`false` literals but responses are matched by
/// case-insensitive substring containment of "true", not exact equality.
/// Anything without "true" (including the literal "false") reads as false.
pub fn parse_bool(resp: &[u8]) -> Result<bool> {
    let text = parse_text(resp)?;
    Ok(text.to_lowercase().contains("true"))
}

/// Validate a set-command acknowledgment
///
/// Succeeds iff the response contains "done"; otherwise the daemon embedded
/// its failure reason inline, which is surfaced verbatim.
pub fn assert_done(resp: &[u8]) -> Result<()> {
    if contains(resp, b"done") {
        Ok(())
    } else {
        Err(Error::ServerRejected(
            String::from_utf8_lossy(resp).into_owned(),
        ))
    }
}

/// Which parser a field's responses go through
///
/// A closed set dispatched through [`ParserKind::apply`] so the field catalog
/// stays statically checkable; no parser callbacks are passed around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Text,
    Float,
    Int,
    Bool,
    /// Acknowledgment-only; yields no value
    Done,
}

impl ParserKind {
    /// Run this parser over raw response bytes
    pub fn apply(self, resp: &[u8]) -> Result<FieldValue> {
        match self {
            Self::Text => parse_text(resp).map(FieldValue::Text),
            Self::Float => parse_float(resp).map(FieldValue::Float),
            Self::Int => parse_int(resp).map(FieldValue::Int),
            Self::Bool => parse_bool(resp).map(FieldValue::Bool),
            Self::Done => assert_done(resp).map(|()| FieldValue::Done),
        }
    }
}

/// A typed response value produced by [`ParserKind::apply`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    /// Acknowledgment of a set command
    Done,
}

impl FieldValue {
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(Error::malformed(format!("{other:?}"), "expected text")),
        }
    }

    pub fn into_float(self) -> Result<f64> {
        match self {
            Self::Float(v) => Ok(v),
            other => Err(Error::malformed(format!("{other:?}"), "expected float")),
        }
    }

    pub fn into_int(self) -> Result<i64> {
        match self {
            Self::Int(v) => Ok(v),
            other => Err(Error::malformed(format!("{other:?}"), "expected integer")),
        }
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(v),
            other => Err(Error::malformed(format!("{other:?}"), "expected boolean")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_after_first_colon() {
        let resp = b"battery: 88.5\n";
        assert_eq!(parse_text(resp).unwrap(), "88.5");
    }

    #[test]
    fn test_parse_text_keeps_later_colons() {
        let resp = b"rtc_time: 2024-01-01T12:30:00+00:00\n";
        assert_eq!(parse_text(resp).unwrap(), "2024-01-01T12:30:00+00:00");
    }

    #[test]
    fn test_parse_text_without_colon_returns_whole_payload() {
        assert_eq!(parse_text(b" done\n").unwrap(), "done");
    }

    #[test]
    fn test_parse_text_rejects_invalid_utf8() {
        let resp = b"model: \xff\xfe";
        assert!(matches!(
            parse_text(resp),
            Err(Error::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float(b"battery: 88.5\n").unwrap(), 88.5);
        assert!(matches!(
            parse_float(b"battery: full"),
            Err(Error::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(b"battery_led_amount: 4\n").unwrap(), 4);
        assert!(parse_int(b"battery_led_amount: 4.5").is_err());
    }

    #[test]
    fn test_parse_bool_is_substring_containment() {
        assert!(parse_bool(b"battery_charging: True\n").unwrap());
        assert!(parse_bool(b"x: totally true").unwrap());
        assert!(!parse_bool(b"battery_charging: false").unwrap());
        assert!(!parse_bool(b"battery_charging: yes").unwrap());
    }

    #[test]
    fn test_assert_done() {
        assert!(assert_done(b"set_battery_output: done\n").is_ok());

        let err = assert_done(b"error: bad range").unwrap_err();
        match err {
            Error::ServerRejected(msg) => assert_eq!(msg, "error: bad range"),
            other => panic!("expected ServerRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_parser_kind_dispatch() {
        assert_eq!(
            ParserKind::Float.apply(b"battery: 88.5").unwrap(),
            FieldValue::Float(88.5)
        );
        assert_eq!(
            ParserKind::Bool.apply(b"x: true").unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(ParserKind::Done.apply(b"done").unwrap(), FieldValue::Done);
    }

    #[test]
    fn test_field_value_accessors() {
        assert_eq!(FieldValue::Float(1.5).into_float().unwrap(), 1.5);
        assert!(FieldValue::Text("x".to_string()).into_float().is_err());
        assert_eq!(FieldValue::Int(7).into_int().unwrap(), 7);
        assert!(FieldValue::Bool(true).into_bool().unwrap());
    }

    #[test]
    fn test_contains() {
        assert!(contains(b"abc done xyz", b"done"));
        assert!(!contains(b"abc", b"done"));
        assert!(contains(b"anything", b""));
    }
}
