use std::borrow::Cow;

use crate::QUOTE;

use self::State::*;

/// Split a single line of CSV text into its raw fields.
///
/// This is a convenience wrapper around [`Fields`] that allocates a `String`
/// for every field. The result is never empty: the empty line yields a
/// single empty field.
///
/// Note that the tokenizer never fails. Unbalanced quotes do not produce an
/// error, they only change which characters end up in which field.
///
/// # Example
///
/// ```
/// use csv_line::tokenize;
///
/// assert_eq!(tokenize("a,b,c", ','), vec!["a", "b", "c"]);
/// assert_eq!(tokenize(r#""a,b",c"#, ','), vec!["a,b", "c"]);
/// assert_eq!(tokenize(r#""a""b""#, ','), vec![r#"a"b"#]);
/// ```
pub fn tokenize(line: &str, separator: char) -> Vec<String> {
    Fields::new(line, separator).map(Cow::into_owned).collect()
}

/// An iterator over the raw fields of a single CSV line.
///
/// Fields that are not quoted are borrowed straight from the line. Quoted
/// fields need their quotes removed and are therefore owned.
///
/// The iterator is driven by a three state automaton:
///
/// * `ValueStart`: the start of every field. A leading quote switches to
///   `UnescapeValue` and is consumed. Anything else switches to `ReadValue`
///   without consuming the character.
/// * `ReadValue`: characters are taken verbatim until the separator.
/// * `UnescapeValue`: quotes are counted. A quote whose (zero based) ordinal
///   is even is dropped while an odd one is kept, so `""` yields one literal
///   quote. The separator ends the field only when the count is odd.
///
/// At the end of the line whatever has been accumulated becomes the last
/// field, regardless of state.
#[derive(Clone, Debug)]
pub struct Fields<'a> {
    line: &'a str,
    separator: char,
    pos: usize,
    state: State,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    ValueStart,
    ReadValue,
    UnescapeValue,
    End,
}

impl<'a> Fields<'a> {
    /// Create an iterator over the fields of `line`, split on `separator`.
    pub fn new(line: &'a str, separator: char) -> Fields<'a> {
        Fields { line: line, separator: separator, pos: 0, state: ValueStart }
    }

    /// The byte offset in the line at which the next field starts.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_value(&mut self) -> &'a str {
        let rest = &self.line[self.pos..];
        match rest.find(self.separator) {
            Some(i) => {
                self.pos += i + self.separator.len_utf8();
                self.state = ValueStart;
                &rest[..i]
            }
            None => {
                self.pos = self.line.len();
                self.state = End;
                rest
            }
        }
    }

    fn unescape_value(&mut self) -> String {
        let rest = &self.line[self.pos..];
        let mut field = String::with_capacity(rest.len());
        let mut quotes = 0usize;
        for (i, c) in rest.char_indices() {
            if c == self.separator && quotes % 2 == 1 {
                self.pos += i + c.len_utf8();
                self.state = ValueStart;
                return field;
            }
            if c == QUOTE {
                quotes += 1;
                if quotes % 2 == 1 {
                    continue;
                }
            }
            field.push(c);
        }
        self.pos = self.line.len();
        self.state = End;
        field
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Cow<'a, str>;

    fn next(&mut self) -> Option<Cow<'a, str>> {
        match self.state {
            End => None,
            ValueStart => {
                if self.line[self.pos..].starts_with(QUOTE) {
                    self.pos += QUOTE.len_utf8();
                    self.state = UnescapeValue;
                    Some(Cow::Owned(self.unescape_value()))
                } else {
                    self.state = ReadValue;
                    Some(Cow::Borrowed(self.read_value()))
                }
            }
            // Both states are always left before `next` returns.
            ReadValue => Some(Cow::Borrowed(self.read_value())),
            UnescapeValue => Some(Cow::Owned(self.unescape_value())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::{tokenize, Fields};

    macro_rules! parses_to {
        ($name:ident, $line:expr, $expected:expr) => {
            parses_to!($name, $line, $expected, ',');
        };
        ($name:ident, $line:expr, $expected:expr, $sep:expr) => {
            #[test]
            fn $name() {
                let expected: Vec<&str> = $expected;
                assert_eq!(tokenize($line, $sep), expected);
            }
        };
    }

    parses_to!(empty_line, "", vec![""]);
    parses_to!(one_field, "a", vec!["a"]);
    parses_to!(simple, "a,b,c", vec!["a", "b", "c"]);
    parses_to!(trailing_separator, "a,b,", vec!["a", "b", ""]);
    parses_to!(leading_separator, ",a", vec!["", "a"]);
    parses_to!(only_separators, ",,", vec!["", "", ""]);
    parses_to!(spaces_kept, " a , b ", vec![" a ", " b "]);

    parses_to!(quoted_separator, "\"a,b\",c", vec!["a,b", "c"]);
    parses_to!(quoted_last, "a,\"b,c\"", vec!["a", "b,c"]);
    parses_to!(doubled_quote, "\"a\"\"b\"", vec!["a\"b"]);
    parses_to!(
        doubled_quotes_with_separator,
        "\"Grand Doe, \"\"Elder\"\"\",77",
        vec!["Grand Doe, \"Elder\"", "77"]
    );
    parses_to!(quoted_empty, "\"\",a", vec!["", "a"]);
    parses_to!(quoted_crlf, "\"a\r\nb\",c", vec!["a\r\nb", "c"]);

    // A quote that is not the first character of a field is plain data.
    parses_to!(inner_quote_unquoted, "a\"b,c", vec!["a\"b", "c"]);

    // Malformed quoting degrades instead of failing.
    parses_to!(unterminated_quote, "\"a,b", vec!["a,b"]);
    parses_to!(text_after_closing_quote, "\"a\"b,c", vec!["ab", "c"]);
    parses_to!(lone_quote, "\"", vec![""]);

    parses_to!(tab, "a\tb\t\"c\td\"", vec!["a", "b", "c\td"], '\t');
    parses_to!(semicolon, "1,5;2,5", vec!["1,5", "2,5"], ';');
    parses_to!(unicode_separator, "α§β§\"γ§δ\"", vec!["α", "β", "γ§δ"], '§');
    parses_to!(unicode_data, "żółw,\"łódź\"", vec!["żółw", "łódź"]);

    #[test]
    fn unquoted_fields_are_borrowed() {
        let mut it = Fields::new("a,\"b\"", ',');
        assert!(matches!(it.next(), Some(Cow::Borrowed("a"))));
        assert!(matches!(it.next(), Some(Cow::Owned(ref s)) if s == "b"));
        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn position_tracks_next_field() {
        let mut it = Fields::new("ab,\"c\",d", ',');
        assert_eq!(it.position(), 0);
        it.next();
        assert_eq!(it.position(), 3);
        it.next();
        assert_eq!(it.position(), 7);
        it.next();
        assert_eq!(it.position(), 8);
    }
}
