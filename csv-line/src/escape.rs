use std::borrow::Cow;

use crate::QUOTE;

/// The escaping a field value needs before it can be written as CSV.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Escaping {
    /// The value contains no separator, CR, LF or quote. It is written as is.
    None,
    /// The value contains a separator, CR or LF but no quote. It only needs
    /// to be enclosed in quotes.
    Enclose,
    /// The value contains at least one quote. It is enclosed in quotes and
    /// every quote inside it is doubled.
    Double,
}

/// Determine the escaping required by `value` when fields are separated by
/// `separator`.
///
/// The scan stops at the first quote, since nothing found after it can
/// change the answer.
pub fn escaping(value: &str, separator: char) -> Escaping {
    let mut escaping = Escaping::None;
    for c in value.chars() {
        if c == QUOTE {
            return Escaping::Double;
        }
        if c == separator || c == '\r' || c == '\n' {
            escaping = Escaping::Enclose;
        }
    }
    escaping
}

/// Convert a field value into its CSV-safe form.
///
/// A value is returned unchanged (and borrowed) if and only if it contains
/// none of `separator`, `\r`, `\n` or `"`. Otherwise it is enclosed in
/// double quotes, with every double quote inside it doubled.
///
/// This is *not* idempotent: escaping an already escaped value quotes it a
/// second time.
///
/// # Example
///
/// ```
/// use csv_line::escape;
///
/// assert_eq!(escape("plain", ','), "plain");
/// assert_eq!(escape("a,b", ','), "\"a,b\"");
/// assert_eq!(escape("a\"b", ','), "\"a\"\"b\"");
/// assert_eq!(escape("a\r\nb", ','), "\"a\r\nb\"");
/// ```
pub fn escape(value: &str, separator: char) -> Cow<str> {
    match escaping(value, separator) {
        Escaping::None => Cow::Borrowed(value),
        Escaping::Enclose => {
            let mut buf = String::with_capacity(value.len() + 2);
            buf.push(QUOTE);
            buf.push_str(value);
            buf.push(QUOTE);
            Cow::Owned(buf)
        }
        Escaping::Double => Cow::Owned(quote_field(value)),
    }
}

fn quote_field(mut s: &str) -> String {
    let mut buf = String::with_capacity(s.len() + 4);
    buf.push(QUOTE);
    loop {
        match memchr::memchr(b'"', s.as_bytes()) {
            None => {
                buf.push_str(s);
                break;
            }
            Some(next_quote) => {
                buf.push_str(&s[..next_quote]);
                buf.push(QUOTE);
                buf.push(QUOTE);
                s = &s[next_quote + 1..];
            }
        }
    }
    buf.push(QUOTE);
    buf
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::{escape, escaping, Escaping};
    use crate::tokenize;

    macro_rules! escapes_to {
        ($name:ident, $value:expr, $expected:expr) => {
            escapes_to!($name, $value, $expected, ',');
        };
        ($name:ident, $value:expr, $expected:expr, $sep:expr) => {
            #[test]
            fn $name() {
                assert_eq!(escape($value, $sep), $expected);
            }
        };
    }

    escapes_to!(plain, "John Doe", "John Doe");
    escapes_to!(empty, "", "");
    escapes_to!(separator, "a,b", "\"a,b\"");
    escapes_to!(quote, "a\"b", "\"a\"\"b\"");
    escapes_to!(crlf, "a\r\nb", "\"a\r\nb\"");
    escapes_to!(lone_cr, "a\rb", "\"a\rb\"");
    escapes_to!(lone_lf, "a\nb", "\"a\nb\"");
    escapes_to!(only_quote, "\"", "\"\"\"\"");
    escapes_to!(
        separator_and_quotes,
        "Grand Doe, \"Elder\"",
        "\"Grand Doe, \"\"Elder\"\"\""
    );
    escapes_to!(
        quote_and_crlf,
        "Baby Doe,\r\n\"Son of John\".",
        "\"Baby Doe,\r\n\"\"Son of John\"\".\""
    );
    escapes_to!(comma_with_tab_separator, "a,b", "a,b", '\t');
    escapes_to!(tab_with_tab_separator, "a\tb", "\"a\tb\"", '\t');
    escapes_to!(unicode_separator, "α§β", "\"α§β\"", '§');

    #[test]
    fn unchanged_values_are_borrowed() {
        assert!(matches!(escape("abc", ','), Cow::Borrowed("abc")));
    }

    #[test]
    fn decision_stops_at_first_quote() {
        assert_eq!(escaping("\"a,b", ','), Escaping::Double);
        assert_eq!(escaping("a,b\"", ','), Escaping::Double);
        assert_eq!(escaping("a,b", ','), Escaping::Enclose);
        assert_eq!(escaping("ab", ','), Escaping::None);
    }

    #[test]
    fn escaping_is_not_idempotent() {
        let once = escape("a,b", ',').into_owned();
        let twice = escape(&once, ',').into_owned();
        assert_eq!(once, "\"a,b\"");
        assert_eq!(twice, "\"\"\"a,b\"\"\"");
        assert_ne!(once, twice);
    }

    #[test]
    fn escaped_fields_tokenize_back() {
        let values = ["plain", "a,b", "a\"b", "\"", "x\r\ny", "", "\"a,\"\"b\""];
        let line = values
            .iter()
            .map(|v| escape(v, ',').into_owned())
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(tokenize(&line, ','), values.to_vec());
    }
}
