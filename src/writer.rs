use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use csv_line::{escape, CRLF};
use serde::Serialize;

use crate::charset::Charset;
use crate::descriptor::{Descriptor, Inner, DEFAULT_NULL_VALUE};
use crate::error::Result;
use crate::format::Format;
use crate::serializer::capture;
use crate::value::Value;

/// A CSV writer that turns records into lines.
///
/// Every line is terminated with `\r\n`. Fields containing the separator,
/// a quote, CR or LF are enclosed in quotes, with inner quotes doubled.
/// Absent values are written as the null token. The output of a column
/// formatter is written as is.
///
/// A writer built from a descriptor writes the bound columns, in column
/// order, and starts with a header line when every column has a name.
/// A writer built with [`Writer::from_writer`] has no columns: it writes
/// every field of each record in declaration order and no header.
///
/// Each line is fully rendered before any of it is written, so a record
/// that fails to render leaves no trace in the output. No data is buffered
/// beyond that line.
///
/// # Example
///
/// ```
/// use csv_bind::{Descriptor, Writer};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize, Serialize)]
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// # fn main() -> csv_bind::Result<()> {
/// let descriptor = Descriptor::builder()
///     .named_column("Name", "name")
///     .named_column("Age", "age")
///     .build::<Person>()?;
///
/// let mut wtr = Writer::new(&descriptor, vec![])?;
/// wtr.write(&Person { name: "Grand Doe, \"Elder\"".to_string(), age: 77 })?;
/// let data = String::from_utf8(wtr.into_inner()?).unwrap();
/// assert_eq!(data, "Name,Age\r\n\"Grand Doe, \"\"Elder\"\"\",77\r\n");
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    wtr: W,
    separator: char,
    null_value: String,
    charset: Charset,
    binding: Option<Arc<Inner>>,
    line: String,
    buf: Vec<u8>,
}

impl Writer<io::BufWriter<File>> {
    /// Create (or truncate) the file at `path` and write to it with the
    /// given descriptor.
    pub fn from_path<T, P: AsRef<Path>>(
        descriptor: &Descriptor<T>,
        path: P,
    ) -> Result<Writer<io::BufWriter<File>>> {
        Writer::new(descriptor, io::BufWriter::new(File::create(path)?))
    }
}

impl<W: io::Write> Writer<W> {
    /// Create a writer for the columns of `descriptor`.
    ///
    /// If every column has a name, the header line is written right away.
    pub fn new<T>(descriptor: &Descriptor<T>, wtr: W) -> Result<Writer<W>> {
        let inner = Arc::clone(descriptor.inner());
        let mut writer = Writer {
            wtr: wtr,
            separator: inner.separator,
            null_value: inner.null_value.clone(),
            charset: inner.charset,
            binding: None,
            line: String::new(),
            buf: vec![],
        };
        if let Some(header) = inner.header() {
            writer.write_record(header.into_iter().map(Some))?;
        }
        writer.binding = Some(inner);
        Ok(writer)
    }

    /// Create a writer without columns.
    ///
    /// It uses `,` as the separator, `null` as the null token and UTF-8,
    /// writes no header, and writes every field of each record in
    /// declaration order.
    pub fn from_writer(wtr: W) -> Writer<W> {
        Writer {
            wtr: wtr,
            separator: ',',
            null_value: DEFAULT_NULL_VALUE.to_string(),
            charset: Charset::default(),
            binding: None,
            line: String::new(),
            buf: vec![],
        }
    }

    /// Write one record.
    ///
    /// The record is usually a struct. Maps, tuples and sequences of
    /// scalars work too, and `Some(record)` is the same as `record`.
    ///
    /// A record that serializes as `None` or `()` is rejected with
    /// `Error::NullRecord`; nothing is written and the writer remains
    /// usable. A field holding a nested struct, sequence or map is
    /// rejected with `Error::Serialize`, and a failing column formatter
    /// with `Error::Format`.
    pub fn write<S: Serialize + ?Sized>(&mut self, record: &S) -> Result<()> {
        let fields = capture(record)?;
        self.line.clear();
        match self.binding {
            Some(ref inner) => {
                for (i, column) in inner.columns.iter().enumerate() {
                    if i > 0 {
                        self.line.push(self.separator);
                    }
                    let value = fields
                        .iter()
                        .find(|&&(ref key, _)| {
                            key.as_ref().map(|k| &**k) == Some(column.property())
                        })
                        .map(|&(_, ref value)| value);
                    push_field(
                        &mut self.line,
                        value,
                        column.format().map(|f| &**f),
                        self.separator,
                        &self.null_value,
                    )?;
                }
            }
            None => {
                for (i, &(_, ref value)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.line.push(self.separator);
                    }
                    push_field(
                        &mut self.line,
                        Some(value),
                        None,
                        self.separator,
                        &self.null_value,
                    )?;
                }
            }
        }
        self.end_line()
    }

    /// Write one line of raw fields.
    ///
    /// Each field is escaped. `None` is written as the null token.
    pub fn write_record<I, F>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<F>>,
        F: AsRef<str>,
    {
        self.line.clear();
        for (i, field) in record.into_iter().enumerate() {
            if i > 0 {
                self.line.push(self.separator);
            }
            match field {
                None => self.line.push_str(&self.null_value),
                Some(field) => {
                    self.line.push_str(&escape(field.as_ref(), self.separator))
                }
            }
        }
        self.end_line()
    }

    /// Write every record from `records`, in order.
    ///
    /// This stops at the first record that fails to be written.
    pub fn write_all<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        for record in records {
            self.write(&record)?;
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.wtr.flush()?;
        Ok(())
    }

    /// Flush and close the underlying stream.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    /// Flush the underlying stream and return it.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.wtr)
    }

    /// A reference to the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.wtr
    }

    fn end_line(&mut self) -> Result<()> {
        self.line.push_str(CRLF);
        self.buf.clear();
        self.charset.encode(&self.line, &mut self.buf);
        self.wtr.write_all(&self.buf)?;
        Ok(())
    }
}

fn push_field(
    line: &mut String,
    value: Option<&Value>,
    format: Option<&dyn Format>,
    separator: char,
    null_value: &str,
) -> Result<()> {
    let value = match value {
        None | Some(Value::Null) => {
            line.push_str(null_value);
            return Ok(());
        }
        Some(value) => value,
    };
    match format {
        Some(format) => line.push_str(&format.format(value)?),
        None => line.push_str(&escape(&value.to_text(), separator)),
    }
    Ok(())
}
