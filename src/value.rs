use std::borrow::Cow;
use std::fmt;

/// A single field value, detached from the record it came from.
///
/// Values flow through column formatters: a formatter parses raw CSV text
/// into a `Value` and renders a `Value` back into text. The writer also
/// captures every record field as a `Value` before rendering it.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An absent value, e.g., `None`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    I64(i64),
    /// An unsigned integer.
    U64(u64),
    /// A single precision float.
    F32(f32),
    /// A double precision float.
    F64(f64),
    /// A single character.
    Char(char),
    /// A string.
    Str(String),
}

impl Value {
    /// Returns true if this is `Value::Null`.
    pub fn is_null(&self) -> bool {
        match *self {
            Value::Null => true,
            _ => false,
        }
    }

    /// Returns the canonical text form of this value.
    ///
    /// This is the generic conversion used for columns without a formatter.
    /// Integers are rendered with `itoa` and floats with `ryu`. `Null`
    /// renders as the empty string; writers substitute their null token
    /// before ever getting here.
    pub fn to_text(&self) -> Cow<str> {
        match *self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
            Value::I64(n) => Cow::Owned(itoa::Buffer::new().format(n).into()),
            Value::U64(n) => Cow::Owned(itoa::Buffer::new().format(n).into()),
            Value::F32(n) => Cow::Owned(format_float(n)),
            Value::F64(n) => Cow::Owned(format_float(n)),
            Value::Char(c) => Cow::Owned(c.to_string()),
            Value::Str(ref s) => Cow::Borrowed(s),
        }
    }

    /// Returns this value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::I64(n) => Some(n as f64),
            Value::U64(n) => Some(n as f64),
            Value::F32(n) => Some(f64::from(n)),
            Value::F64(n) => Some(n),
            _ => None,
        }
    }

    /// Returns this value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::Str(ref s) => Some(s),
            _ => None,
        }
    }
}

fn format_float<F: ryu::Float>(n: F) -> String {
    let mut buf = ryu::Buffer::new();
    buf.format(n).to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Value {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::F64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Value {
        Value::Char(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(v: &'a str) -> Value {
        Value::Str(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::Value;

    #[test]
    fn text_forms() {
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Bool(true).to_text(), "true");
        assert_eq!(Value::I64(-54).to_text(), "-54");
        assert_eq!(Value::U64(18_446_744_073_709_551_615).to_text(), "18446744073709551615");
        assert_eq!(Value::F64(1.5).to_text(), "1.5");
        assert_eq!(Value::F64(54.0).to_text(), "54.0");
        assert_eq!(Value::F32(0.1).to_text(), "0.1");
        assert_eq!(Value::Char('x').to_text(), "x");
        assert_eq!(Value::from("a,b").to_text(), "a,b");
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3i64)), Value::I64(3));
        assert!(Value::from(None::<String>).is_null());
        assert_eq!(Value::U64(4).as_f64(), Some(4.0));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::Bool(false).as_f64(), None);
    }
}
