/*!
The `csv-bind` crate maps CSV lines to typed records and back, driven by a
declarative description of the columns.

# Overview

A [`Descriptor`] says which record field each CSV column is bound to, which
separator to use, whether the stream starts with a header line, how absent
values are written and which charset the bytes are in. Columns can carry a
[`Format`] that replaces the generic text conversion, for dates, percentages
and the like.

A [`Reader`] turns a byte stream into an iterator of records. A [`Writer`]
turns records into CRLF-terminated lines. Both move field values through
serde, so records are plain structs deriving `Deserialize` and `Serialize`.

The character level parsing and quoting rules live in the `csv-line` crate,
re-exported here as [`tokenize`] and [`escape`].

Reading is lenient. Lines with the wrong number of fields, and fields that
fail to convert, are reported through [`tracing`](https://docs.rs/tracing)
and the record is still produced with default values where data is missing.
This crate never installs a `tracing` subscriber.

# Example

```
use csv_bind::{Descriptor, Reader, Writer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct City {
    name: String,
    population: Option<u64>,
}

# fn main() -> csv_bind::Result<()> {
let descriptor = Descriptor::builder()
    .named_column("City", "name")
    .named_column("Population", "population")
    .has_header(true)
    .null_value("")
    .build::<City>()?;

let mut wtr = Writer::new(&descriptor, vec![])?;
wtr.write(&City { name: "Boston".to_string(), population: Some(4628910) })?;
wtr.write(&City { name: "Concord, MA".to_string(), population: None })?;
let data = wtr.into_inner()?;
assert_eq!(
    data,
    b"City,Population\r\nBoston,4628910\r\n\"Concord, MA\",\r\n".to_vec()
);

let cities = Reader::new(&descriptor, &data[..])?
    .collect::<csv_bind::Result<Vec<City>>>()?;
assert_eq!(cities[1].name, "Concord, MA");
assert_eq!(cities[1].population, None);
# Ok(()) }
```

# Descriptor files

A [`DescriptorConfig`] is the serde form of a descriptor, with formatters
referred to by name and resolved in a [`FormatRegistry`]:

```
use csv_bind::{DescriptorConfig, FormatRegistry};
use serde::Deserialize;

#[derive(Deserialize)]
struct Holiday {
    name: String,
    day: chrono::NaiveDate,
}

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let config: DescriptorConfig = serde_json::from_str(r#"{
    "type": "Holiday",
    "separator": "tab",
    "columns": [
        { "index": 0, "property": "name" },
        { "index": 1, "property": "day", "format": "short-date" }
    ]
}"#)?;
let descriptor = config.build::<Holiday>(&FormatRegistry::default())?;
assert_eq!(descriptor.separator(), '\t');
# Ok(()) }
```
*/

#![deny(missing_docs)]

pub use csv_line::{escape, tokenize};

pub use crate::charset::Charset;
pub use crate::descriptor::{
    parse_separator, Column, ColumnConfig, Descriptor, DescriptorBuilder,
    DescriptorConfig, DEFAULT_NULL_VALUE,
};
pub use crate::deserializer::{DeserializeError, DeserializeErrorKind};
pub use crate::error::{Error, Result};
pub use crate::format::{Format, FormatError, FormatRegistry};
pub use crate::reader::Reader;
pub use crate::value::Value;
pub use crate::writer::Writer;

mod charset;
mod descriptor;
mod deserializer;
mod discover;
mod error;
pub mod format;
mod reader;
mod serializer;
mod value;
mod writer;
