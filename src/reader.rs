use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use bstr::ByteSlice;
use csv_line::Fields;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::deserializer::{deserialize_record, Slot};
use crate::descriptor::{Descriptor, Inner};
use crate::error::{Error, Result};

/// A streaming CSV reader that yields one record per line.
///
/// A reader decodes lines with the descriptor's charset, skips blank lines
/// and lines starting with `#`, and maps the fields of each remaining line
/// onto a new `T`. Lines may end with `\n`, `\r\n` or a lone `\r`.
///
/// Problems with the data do not stop the reader. A line with the wrong
/// number of fields is logged and mapped as far as it goes. A field that
/// cannot be converted is logged and left at its default value. Only a
/// record type the field converter cannot express at all produces an error
/// item, and reading continues after it.
///
/// # Example
///
/// ```
/// use csv_bind::{Descriptor, Reader};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// # fn main() -> csv_bind::Result<()> {
/// let descriptor = Descriptor::builder()
///     .named_column("Name", "name")
///     .named_column("Age", "age")
///     .has_header(true)
///     .build::<Person>()?;
///
/// let data = "Name,Age\nJohn Doe,54\n# retired\n\"Grand Doe, Sr\",\n";
/// let mut rdr = Reader::new(&descriptor, data.as_bytes())?;
/// let people = rdr.collect::<csv_bind::Result<Vec<Person>>>()?;
/// assert_eq!(people, vec![
///     Person { name: "John Doe".to_string(), age: 54 },
///     Person { name: "Grand Doe, Sr".to_string(), age: 0 },
/// ]);
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Reader<T, R> {
    descriptor: Descriptor<T>,
    rdr: io::BufReader<R>,
    buf: Vec<u8>,
    /// The number of physical lines read so far.
    lines_read: u64,
    /// The next line to decode, if any.
    pending: Option<String>,
    pending_line: u64,
    headers: Option<Vec<String>>,
    /// The last line ended with `\r`, so a leading `\n` is part of it.
    skip_lf: bool,
}

impl<T: DeserializeOwned> Reader<T, File> {
    /// Open the file at `path` and read it with the given descriptor.
    pub fn from_path<P: AsRef<Path>>(
        descriptor: &Descriptor<T>,
        path: P,
    ) -> Result<Reader<T, File>> {
        Reader::new(descriptor, File::open(path)?)
    }
}

impl<T: DeserializeOwned, R: io::Read> Reader<T, R> {
    /// Create a reader over `rdr`.
    ///
    /// The first line is read right away. This fails if the stream is
    /// empty, if its first line is empty, or if reading it fails. When the
    /// descriptor has a header, the first line is checked against the
    /// column names and skipped. Otherwise it is the first record, even if
    /// it starts with `#`.
    pub fn new(descriptor: &Descriptor<T>, rdr: R) -> Result<Reader<T, R>> {
        let mut reader = Reader {
            descriptor: descriptor.clone(),
            rdr: io::BufReader::new(rdr),
            buf: vec![],
            lines_read: 0,
            pending: None,
            pending_line: 0,
            headers: None,
            skip_lf: false,
        };
        let first = match reader.read_line()? {
            None => return Err(Error::EmptyStream),
            Some(line) => line,
        };
        if first.is_empty() {
            return Err(Error::EmptyFirstLine);
        }
        if descriptor.has_header() {
            reader.check_header(&first);
            reader.advance();
        } else {
            reader.pending = Some(first);
            reader.pending_line = reader.lines_read;
        }
        Ok(reader)
    }

    /// Returns true if another record is available.
    pub fn has_next(&self) -> bool {
        self.pending.is_some()
    }

    /// The physical line number, starting at 1, of the next record, or of
    /// the last record once the stream is exhausted.
    pub fn line_number(&self) -> u64 {
        self.pending_line
    }

    /// The fields of the header line, if the descriptor has a header.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// The descriptor this reader maps lines with.
    pub fn descriptor(&self) -> &Descriptor<T> {
        &self.descriptor
    }

    /// Close the underlying stream.
    pub fn close(self) {}

    /// Unwrap the underlying stream.
    ///
    /// Any data buffered but not yet decoded is lost.
    pub fn into_inner(self) -> R {
        self.rdr.into_inner()
    }

    fn check_header(&mut self, line: &str) {
        let inner = self.descriptor.inner();
        let found: Vec<String> =
            Fields::new(line, inner.separator).map(Cow::into_owned).collect();
        if let Some(expected) = inner.header() {
            if expected.iter().ne(found.iter()) {
                warn!(
                    expected = ?expected,
                    found = ?found,
                    "CSV header does not match the column names"
                );
            }
        }
        self.headers = Some(found);
    }

    /// Read one physical line without its terminator.
    ///
    /// A line ends at `\n`, `\r\n` or a lone `\r`.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.skip_lf {
            self.skip_lf = false;
            if self.rdr.fill_buf()?.first() == Some(&b'\n') {
                self.rdr.consume(1);
            }
        }
        let mut read_any = false;
        loop {
            let (used, end) = {
                let available = match self.rdr.fill_buf() {
                    Ok(available) => available,
                    Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                        continue
                    }
                    Err(err) => return Err(err),
                };
                if available.is_empty() {
                    break;
                }
                match available.find_byteset(b"\r\n") {
                    Some(i) => {
                        self.buf.extend_from_slice(&available[..i]);
                        self.skip_lf = available[i] == b'\r';
                        (i + 1, true)
                    }
                    None => {
                        self.buf.extend_from_slice(available);
                        (available.len(), false)
                    }
                }
            };
            read_any = true;
            self.rdr.consume(used);
            if end {
                break;
            }
        }
        if !read_any {
            return Ok(None);
        }
        self.lines_read += 1;
        Ok(Some(self.descriptor.charset().decode(&self.buf).into_owned()))
    }

    /// Buffer the next line that is neither blank nor a comment.
    ///
    /// A read error is logged and ends the stream.
    fn advance(&mut self) {
        self.pending = None;
        loop {
            match self.read_line() {
                Ok(None) => return,
                Ok(Some(line)) => {
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    self.pending = Some(line);
                    self.pending_line = self.lines_read;
                    return;
                }
                Err(err) => {
                    error!(
                        line = self.lines_read + 1,
                        "failed to read CSV line, stopping: {}", err
                    );
                    return;
                }
            }
        }
    }
}

fn decode_line<T: DeserializeOwned>(
    inner: &Inner,
    line: &str,
    number: u64,
) -> Result<T> {
    if inner.debug {
        debug!(line = number, "{}", line);
    }
    let tokens: Vec<Cow<str>> = Fields::new(line, inner.separator).collect();
    if tokens.len() != inner.columns.len() {
        warn!(
            line = number,
            expected = inner.columns.len(),
            found = tokens.len(),
            "invalid CSV line: {}",
            line
        );
    }

    let mut slots = vec![Slot::Missing; inner.fields.len()];
    for (column, token) in inner.columns.iter().zip(tokens) {
        let slot = match column.format() {
            None => Slot::Text(token),
            Some(format) => match format.parse(&token) {
                Ok(value) => Slot::Value(value),
                Err(err) => {
                    warn!(
                        line = number,
                        column = column.property(),
                        "{}",
                        err
                    );
                    Slot::Missing
                }
            },
        };
        slots[column.field()] = slot;
    }
    deserialize_record(inner.fields, slots)
        .map_err(|err| Error::Deserialize { line: number, err: err })
}

impl<T: DeserializeOwned, R: io::Read> Iterator for Reader<T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        let line = self.pending.take()?;
        let record = decode_line(self.descriptor.inner(), &line, self.pending_line);
        self.advance();
        Some(record)
    }
}
