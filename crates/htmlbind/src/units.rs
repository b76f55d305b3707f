//! Ready-made decode hooks for values scraped with decoration around them:
//! prices with currency symbols, counts with suffixes, formatted dates.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::coerce::{parse_float, TextDecode};
use crate::error::{ScanError, ScanResult};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:[,.]\d+)*(\.\d+)?").expect("number pattern is a valid regex")
});

/// Pull the first number out of `text`, dropping thousands separators.
fn extract_number(text: &str) -> ScanResult<f64> {
    let found = NUMBER
        .find(text)
        .ok_or_else(|| ScanError::NumericParse {
            input: text.to_string(),
            kind: "number",
            reason: "no number found".to_string(),
        })?;

    parse_float(&found.as_str().replace(',', ""))
}

/// A float decoded from text carrying a unit or currency, e.g. `"$59.99"`
/// or `"1,000,000 views"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloatUnitValue(pub f64);

impl TextDecode for FloatUnitValue {
    fn decode_text(&mut self, raw: &str) -> ScanResult<()> {
        self.0 = extract_number(raw)?;
        Ok(())
    }
}

/// An integer decoded from text carrying a unit, e.g. `"20k"`. Fractions
/// are truncated toward zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntUnitValue(pub i64);

impl TextDecode for IntUnitValue {
    fn decode_text(&mut self, raw: &str) -> ScanResult<()> {
        self.0 = extract_number(raw)? as i64;
        Ok(())
    }
}

/// A point in time decoded with a chrono format string.
///
/// Set `format` before scanning to pick the layout; without one the text
/// must be RFC 3339. Formats without an offset are read as UTC, and formats
/// without a time as midnight UTC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timestamp {
    pub format: Option<String>,
    pub time: DateTime<Utc>,
}

impl Timestamp {
    pub fn with_format(format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            time: DateTime::default(),
        }
    }
}

impl TextDecode for Timestamp {
    fn decode_text(&mut self, raw: &str) -> ScanResult<()> {
        let date_error = |source| ScanError::DateParse {
            input: raw.to_string(),
            source,
        };

        let Some(format) = self.format.as_deref() else {
            self.time = DateTime::parse_from_rfc3339(raw)
                .map_err(date_error)?
                .with_timezone(&Utc);
            return Ok(());
        };

        self.time = match DateTime::parse_from_str(raw, format) {
            Ok(zoned) => zoned.with_timezone(&Utc),
            Err(_) => match NaiveDateTime::parse_from_str(raw, format) {
                Ok(naive) => naive.and_utc(),
                Err(_) => NaiveDate::parse_from_str(raw, format)
                    .map_err(date_error)?
                    .and_hms_opt(0, 0, 0)
                    .unwrap_or_default()
                    .and_utc(),
            },
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_float_unit_value() {
        let cases = [
            ("20k", 20.0),
            ("$59.99", 59.99),
            ("1,000,000", 1_000_000.0),
            ("-10.5", -10.5),
            ("100 USD", 100.0),
            ("0.123", 0.123),
            ("-0.5", -0.5),
            ("1,000,000.00", 1_000_000.0),
        ];

        for (input, expected) in cases {
            let mut num = FloatUnitValue::default();
            num.decode_text(input).unwrap();
            assert_eq!(num.0, expected, "{input}");
        }
    }

    #[test]
    fn test_int_unit_value() {
        let cases = [
            ("20k", 20),
            ("$59.99", 59),
            ("1,000,000", 1_000_000),
            ("-10.5", -10),
            ("100 USD", 100),
            ("-0.5", 0),
            ("1,000,000.00", 1_000_000),
        ];

        for (input, expected) in cases {
            let mut num = IntUnitValue::default();
            num.decode_text(input).unwrap();
            assert_eq!(num.0, expected, "{input}");
        }
    }

    #[test]
    fn test_unit_values_reject_text_without_numbers() {
        let err = FloatUnitValue::default().decode_text("abc").unwrap_err();
        assert!(matches!(err, ScanError::NumericParse { .. }));

        let err = IntUnitValue::default().decode_text("abc").unwrap_err();
        assert!(matches!(err, ScanError::NumericParse { .. }));
    }

    #[test]
    fn test_timestamp_formats() {
        let cases = [
            (
                "2024-01-15T10:30:00Z",
                "%Y-%m-%dT%H:%M:%SZ",
                Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            ),
            (
                "31-07-2024",
                "%d-%m-%Y",
                Utc.with_ymd_and_hms(2024, 7, 31, 0, 0, 0).unwrap(),
            ),
            (
                "2023-Mar-10 15:04:05",
                "%Y-%b-%d %H:%M:%S",
                Utc.with_ymd_and_hms(2023, 3, 10, 15, 4, 5).unwrap(),
            ),
            (
                "2023-03-10 15:04:05 +0200",
                "%Y-%m-%d %H:%M:%S %z",
                Utc.with_ymd_and_hms(2023, 3, 10, 13, 4, 5).unwrap(),
            ),
        ];

        for (input, format, expected) in cases {
            let mut ts = Timestamp::with_format(format);
            ts.decode_text(input).unwrap();
            assert_eq!(ts.time, expected, "{input}");
        }
    }

    #[test]
    fn test_timestamp_defaults_to_rfc3339() {
        let mut ts = Timestamp::default();
        ts.decode_text("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(ts.time, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
        assert_eq!(ts.format, None);
    }

    #[test]
    fn test_timestamp_error() {
        let err = Timestamp::default().decode_text("invalid-time").unwrap_err();
        assert!(matches!(err, ScanError::DateParse { ref input, .. } if input == "invalid-time"));
    }
}
