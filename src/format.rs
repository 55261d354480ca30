/*!
Column formatters.

A formatter overrides the generic conversion for one column. It parses the
raw text of a field into a [`Value`] when reading, and renders a [`Value`]
back into text when writing. Formatter output is written verbatim: the
formatter, not the writer, is responsible for keeping it free of separators,
quotes and line breaks.

Formatters are resolved by name, once, when a descriptor is built. The
[`FormatRegistry`] maps names to shared formatter instances.
*/

use std::collections::HashMap;
use std::error;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::value::Value;

/// The canonical textual form of a date, as accepted by `NaiveDate`'s serde
/// implementation.
const ISO_DATE: &str = "%Y-%m-%d";

/// The canonical textual form of a date and time, as accepted by
/// `NaiveDateTime`'s serde implementation.
const ISO_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A pluggable transformer between raw CSV text and field values.
pub trait Format: fmt::Debug + Send + Sync {
    /// Parse raw CSV text into a value.
    ///
    /// This is called for every field of the column, blank ones included.
    /// Returning `Value::Null` leaves the field at its default.
    fn parse(&self, text: &str) -> Result<Value, FormatError>;

    /// Render a value into CSV text.
    fn format(&self, value: &Value) -> Result<String, FormatError>;
}

/// An error produced by a formatter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormatError {
    msg: String,
}

impl FormatError {
    /// Create a new formatter error with the given message.
    pub fn new<S: Into<String>>(msg: S) -> FormatError {
        FormatError { msg: msg.into() }
    }

    fn unexpected(value: &Value, expected: &str) -> FormatError {
        FormatError::new(format!("expected {} but got {:?}", expected, value))
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "format error: {}", self.msg)
    }
}

impl error::Error for FormatError {}

impl From<chrono::ParseError> for FormatError {
    fn from(err: chrono::ParseError) -> FormatError {
        FormatError::new(err.to_string())
    }
}

/// Formats dates using a `strftime` style pattern.
///
/// Parsed dates are handed to the record as ISO `YYYY-MM-DD` text, which is
/// what `chrono::NaiveDate` deserializes from. When writing, the value is
/// expected in that same form, which is what `NaiveDate` serializes to.
#[derive(Clone, Debug)]
pub struct DateFormat {
    pattern: String,
}

impl DateFormat {
    /// Create a date formatter using the given `strftime` pattern.
    pub fn new<S: Into<String>>(pattern: S) -> DateFormat {
        DateFormat { pattern: pattern.into() }
    }
}

impl Format for DateFormat {
    fn parse(&self, text: &str) -> Result<Value, FormatError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let date = NaiveDate::parse_from_str(text.trim(), &self.pattern)?;
        Ok(Value::Str(date.format(ISO_DATE).to_string()))
    }

    fn format(&self, value: &Value) -> Result<String, FormatError> {
        let text = value
            .as_str()
            .ok_or_else(|| FormatError::unexpected(value, "a date"))?;
        let date = NaiveDate::parse_from_str(text, ISO_DATE)?;
        Ok(date.format(&self.pattern).to_string())
    }
}

/// Formats timestamps using a `strftime` style pattern.
///
/// Like [`DateFormat`], but for `chrono::NaiveDateTime` fields.
#[derive(Clone, Debug)]
pub struct DateTimeFormat {
    pattern: String,
}

impl DateTimeFormat {
    /// Create a timestamp formatter using the given `strftime` pattern.
    pub fn new<S: Into<String>>(pattern: S) -> DateTimeFormat {
        DateTimeFormat { pattern: pattern.into() }
    }
}

impl Format for DateTimeFormat {
    fn parse(&self, text: &str) -> Result<Value, FormatError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let dt = NaiveDateTime::parse_from_str(text.trim(), &self.pattern)?;
        Ok(Value::Str(dt.format(ISO_DATE_TIME).to_string()))
    }

    fn format(&self, value: &Value) -> Result<String, FormatError> {
        let text = value
            .as_str()
            .ok_or_else(|| FormatError::unexpected(value, "a timestamp"))?;
        let dt = NaiveDateTime::parse_from_str(text, ISO_DATE_TIME)?;
        Ok(dt.format(&self.pattern).to_string())
    }
}

/// Formats ratios as percentages, e.g., `0.125` as `12.50%`.
#[derive(Clone, Debug)]
pub struct PercentFormat {
    decimals: usize,
}

impl PercentFormat {
    /// Create a percent formatter writing the given number of decimals.
    pub fn new(decimals: usize) -> PercentFormat {
        PercentFormat { decimals: decimals }
    }
}

impl Default for PercentFormat {
    fn default() -> PercentFormat {
        PercentFormat::new(2)
    }
}

impl Format for PercentFormat {
    fn parse(&self, text: &str) -> Result<Value, FormatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Value::Null);
        }
        let number = text.strip_suffix('%').unwrap_or(text).trim_end();
        let percent: f64 = number.parse().map_err(|_| {
            FormatError::new(format!("invalid percent value '{}'", text))
        })?;
        Ok(Value::F64(percent / 100.0))
    }

    fn format(&self, value: &Value) -> Result<String, FormatError> {
        let ratio = value
            .as_f64()
            .ok_or_else(|| FormatError::unexpected(value, "a number"))?;
        Ok(format!("{:.*}%", self.decimals, ratio * 100.0))
    }
}

/// Formats booleans using custom labels, e.g., `yes` and `no`.
///
/// Parsing ignores ASCII case. Blank text that matches neither label parses
/// as `Value::Null`.
#[derive(Clone, Debug)]
pub struct BooleanFormat {
    yes: String,
    no: String,
}

impl BooleanFormat {
    /// Create a boolean formatter with the given labels for true and false.
    pub fn new<S: Into<String>, T: Into<String>>(yes: S, no: T) -> BooleanFormat {
        BooleanFormat { yes: yes.into(), no: no.into() }
    }
}

impl Format for BooleanFormat {
    fn parse(&self, text: &str) -> Result<Value, FormatError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case(&self.yes) {
            Ok(Value::Bool(true))
        } else if text.eq_ignore_ascii_case(&self.no) {
            Ok(Value::Bool(false))
        } else if text.is_empty() {
            Ok(Value::Null)
        } else {
            Err(FormatError::new(format!(
                "expected '{}' or '{}' but got '{}'",
                self.yes, self.no, text
            )))
        }
    }

    fn format(&self, value: &Value) -> Result<String, FormatError> {
        match *value {
            Value::Bool(true) => Ok(self.yes.clone()),
            Value::Bool(false) => Ok(self.no.clone()),
            _ => Err(FormatError::unexpected(value, "a boolean")),
        }
    }
}

/// A name keyed collection of formatters.
///
/// `FormatRegistry::default()` comes with these formatters:
///
/// * `iso-date`: [`DateFormat`] with `%Y-%m-%d`.
/// * `short-date`: [`DateFormat`] with `%m/%d/%y`.
/// * `date-time`: [`DateTimeFormat`] with `%Y-%m-%d %H:%M:%S`.
/// * `percent`: [`PercentFormat`] with two decimals.
/// * `yes-no`: [`BooleanFormat`] with `yes` and `no`.
///
/// `FormatRegistry::new()` is empty.
#[derive(Clone, Debug)]
pub struct FormatRegistry {
    formats: HashMap<String, Arc<dyn Format>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> FormatRegistry {
        FormatRegistry { formats: HashMap::new() }
    }

    /// Register a formatter under the given name, replacing any formatter
    /// previously registered under that name.
    pub fn register<S, F>(&mut self, name: S, format: F) -> &mut FormatRegistry
    where
        S: Into<String>,
        F: Format + 'static,
    {
        self.formats.insert(name.into(), Arc::new(format));
        self
    }

    /// Look up a formatter by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Format>> {
        self.formats.get(name).cloned()
    }

    /// Returns true if a formatter is registered under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }
}

impl Default for FormatRegistry {
    fn default() -> FormatRegistry {
        let mut registry = FormatRegistry::new();
        registry
            .register("iso-date", DateFormat::new(ISO_DATE))
            .register("short-date", DateFormat::new("%m/%d/%y"))
            .register("date-time", DateTimeFormat::new("%Y-%m-%d %H:%M:%S"))
            .register("percent", PercentFormat::default())
            .register("yes-no", BooleanFormat::new("yes", "no"));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BooleanFormat, DateFormat, DateTimeFormat, Format, FormatRegistry,
        PercentFormat,
    };
    use crate::value::Value;

    #[test]
    fn date_round_trip() {
        let fmt = DateFormat::new("%d.%m.%Y");
        let value = fmt.parse("18.10.2026").unwrap();
        assert_eq!(value, Value::from("2026-10-18"));
        assert_eq!(fmt.format(&value).unwrap(), "18.10.2026");
    }

    #[test]
    fn date_errors() {
        let fmt = DateFormat::new("%d.%m.%Y");
        assert!(fmt.parse("2026-10-18").is_err());
        assert_eq!(fmt.parse("  ").unwrap(), Value::Null);
        assert!(fmt.format(&Value::I64(3)).is_err());
    }

    #[test]
    fn date_time_round_trip() {
        let fmt = DateTimeFormat::new("%Y-%m-%d %H:%M");
        let value = fmt.parse("2026-10-18 09:30").unwrap();
        assert_eq!(value, Value::from("2026-10-18T09:30:00"));
        assert_eq!(fmt.format(&value).unwrap(), "2026-10-18 09:30");
    }

    #[test]
    fn percent() {
        let fmt = PercentFormat::default();
        assert_eq!(fmt.parse("12.5%").unwrap(), Value::F64(0.125));
        assert_eq!(fmt.parse(" 50 % ").unwrap(), Value::F64(0.5));
        assert_eq!(fmt.format(&Value::F64(0.125)).unwrap(), "12.50%");
        assert_eq!(fmt.format(&Value::I64(1)).unwrap(), "100.00%");
        assert!(fmt.parse("half").is_err());
        assert_eq!(fmt.parse("").unwrap(), Value::Null);
        assert!(fmt.format(&Value::from("x")).is_err());
    }

    #[test]
    fn boolean() {
        let fmt = BooleanFormat::new("yes", "no");
        assert_eq!(fmt.parse("YES").unwrap(), Value::Bool(true));
        assert_eq!(fmt.parse("no").unwrap(), Value::Bool(false));
        assert!(fmt.parse("maybe").is_err());
        assert_eq!(fmt.parse(" ").unwrap(), Value::Null);
        assert_eq!(fmt.format(&Value::Bool(true)).unwrap(), "yes");
        assert!(fmt.format(&Value::Null).is_err());
    }

    #[test]
    fn registry() {
        let mut registry = FormatRegistry::default();
        assert!(registry.contains("short-date"));
        assert!(registry.get("percent").is_some());
        assert!(registry.get("roman").is_none());

        registry.register("percent", PercentFormat::new(0));
        let fmt = registry.get("percent").unwrap();
        assert_eq!(fmt.format(&Value::F64(0.5)).unwrap(), "50%");

        assert!(FormatRegistry::new().get("percent").is_none());
    }
}
