use std::error;
use std::fmt;
use std::io;
use std::result;

use serde::ser;

use crate::deserializer::DeserializeError;
use crate::format::FormatError;

/// A type alias for `Result<T, csv_bind::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when building a descriptor or when reading or
/// writing CSV data.
///
/// Note that most problems with the *data* are not errors. A line with the
/// wrong number of fields, or a field that fails conversion, is reported as
/// a warning through `tracing` and the record is still produced.
#[derive(Debug)]
pub enum Error {
    /// An I/O error from the underlying stream.
    Io(io::Error),
    /// The descriptor is malformed: no columns, a bad separator, an unknown
    /// property or formatter, or a record type without named fields.
    Config(String),
    /// The CSV stream has no lines at all.
    EmptyStream,
    /// The first line of the CSV stream is empty.
    EmptyFirstLine,
    /// An absent record was given to a writer.
    ///
    /// Nothing is written and the writer remains usable.
    NullRecord,
    /// A record could not be flattened into fields when writing.
    Serialize(String),
    /// A column formatter failed to render a value when writing.
    Format(FormatError),
    /// A record could not be built from a line when reading.
    ///
    /// A field that fails to convert is left out of the record, so serde
    /// fills it in for `Option` and `#[serde(default)]` fields. This error
    /// is reported when that is not possible, i.e., the field's type has no
    /// default, or when the record type has a shape the field converter
    /// cannot express at all. Reading continues with the next line.
    Deserialize {
        /// The physical line number (starting at 1) of the offending line.
        line: u64,
        /// The underlying deserialization error.
        err: DeserializeError,
    },
}

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Error {
        Error::Config(msg.into())
    }

    /// Returns true if this is a descriptor configuration error.
    pub fn is_config(&self) -> bool {
        match *self {
            Error::Config(_) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Error {
        Error::Format(err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Format(ref err) => Some(err),
            Error::Deserialize { ref err, .. } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Config(ref msg) => {
                write!(f, "CSV descriptor error: {}", msg)
            }
            Error::EmptyStream => write!(f, "CSV error: empty CSV stream"),
            Error::EmptyFirstLine => write!(
                f,
                "CSV error: invalid CSV stream, the first line is empty"
            ),
            Error::NullRecord => {
                write!(f, "CSV write error: record argument is absent")
            }
            Error::Serialize(ref msg) => {
                write!(f, "CSV write error: {}", msg)
            }
            Error::Format(ref err) => write!(f, "CSV write error: {}", err),
            Error::Deserialize { line, ref err } => {
                write!(f, "CSV deserialize error: line {}: {}", line, err)
            }
        }
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Serialize(msg.to_string())
    }
}
