/*!
`csv-line` provides the two automata at the heart of `csv-bind`: a tokenizer
that splits one line of CSV text into raw fields, and an encoder that turns a
single field value back into a CSV-safe token.

Both are pure functions over `&str`. Neither does any I/O, neither allocates
when it doesn't have to, and neither can fail: malformed input always yields
*some* answer.

# Example

```
use csv_line::{escape, tokenize};

let fields = tokenize(r#""Doe, John",54"#, ',');
assert_eq!(fields, vec!["Doe, John", "54"]);

assert_eq!(escape(&fields[0], ','), r#""Doe, John""#);
assert_eq!(escape(&fields[1], ','), "54");
```
*/

#![deny(missing_docs)]

pub use crate::escape::{escape, escaping, Escaping};
pub use crate::tokenizer::{tokenize, Fields};

mod escape;
mod tokenizer;

/// The quotation character recognized by the tokenizer and emitted by the
/// encoder.
pub const QUOTE: char = '"';

/// The record terminator emitted after every line written by `csv-bind`.
pub const CRLF: &str = "\r\n";
