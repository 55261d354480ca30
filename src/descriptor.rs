use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::charset::Charset;
use crate::discover::record_shape;
use crate::error::{Error, Result};
use crate::format::{Format, FormatRegistry};

/// The token written for absent values unless configured otherwise.
pub const DEFAULT_NULL_VALUE: &str = "null";

/// An immutable description of how CSV columns map to the fields of `T`.
///
/// A descriptor is built once, with a [`DescriptorBuilder`] or from a
/// [`DescriptorConfig`], and then shared by any number of readers and
/// writers. Cloning is cheap.
///
/// Building a descriptor inspects `T`'s `Deserialize` impl to learn its
/// field names, so `T` must be a struct with named fields. Every column
/// property is checked against those names at build time.
pub struct Descriptor<T> {
    inner: Arc<Inner>,
    _record: PhantomData<fn() -> T>,
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) type_name: &'static str,
    pub(crate) fields: &'static [&'static str],
    pub(crate) columns: Vec<Column>,
    pub(crate) separator: char,
    pub(crate) has_header: bool,
    pub(crate) null_value: String,
    pub(crate) charset: Charset,
    pub(crate) debug: bool,
}

impl<T> Clone for Descriptor<T> {
    fn clone(&self) -> Descriptor<T> {
        Descriptor { inner: Arc::clone(&self.inner), _record: PhantomData }
    }
}

impl<T> fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("type_name", &self.inner.type_name)
            .field("columns", &self.inner.columns)
            .field("separator", &self.inner.separator)
            .field("has_header", &self.inner.has_header)
            .field("null_value", &self.inner.null_value)
            .field("charset", &self.inner.charset)
            .field("debug", &self.inner.debug)
            .finish()
    }
}

impl Descriptor<()> {
    /// Start building a descriptor.
    pub fn builder() -> DescriptorBuilder {
        DescriptorBuilder::new()
    }
}

impl<T> Descriptor<T> {
    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }

    /// The serde name of the record type.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    /// The columns, in CSV order.
    pub fn columns(&self) -> &[Column] {
        &self.inner.columns
    }

    /// The field separator.
    pub fn separator(&self) -> char {
        self.inner.separator
    }

    /// Whether the CSV stream starts with a header line.
    pub fn has_header(&self) -> bool {
        self.inner.has_header
    }

    /// The token written for absent values.
    pub fn null_value(&self) -> &str {
        &self.inner.null_value
    }

    /// The character encoding of the CSV stream.
    pub fn charset(&self) -> Charset {
        self.inner.charset
    }

    /// Whether readers log every raw line at debug level.
    pub fn debug(&self) -> bool {
        self.inner.debug
    }

    /// The column names, if every column has one.
    pub fn header(&self) -> Option<Vec<&str>> {
        self.inner.header()
    }
}

impl Inner {
    pub(crate) fn header(&self) -> Option<Vec<&str>> {
        self.columns.iter().map(|c| c.name()).collect()
    }
}

/// One CSV column bound to one record field.
#[derive(Clone)]
pub struct Column {
    name: Option<String>,
    property: String,
    field: usize,
    format: Option<Arc<dyn Format>>,
}

impl Column {
    /// The header label, if this column has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|s| &**s)
    }

    /// The name of the bound record field.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// The formatter used instead of the generic conversion, if any.
    pub fn format(&self) -> Option<&Arc<dyn Format>> {
        self.format.as_ref()
    }

    /// Position of the bound field in the record's declaration order.
    pub(crate) fn field(&self) -> usize {
        self.field
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("property", &self.property)
            .field("format", &self.format)
            .finish()
    }
}

#[derive(Clone, Debug)]
struct ColumnDef {
    name: Option<String>,
    property: String,
    format: Option<Arc<dyn Format>>,
}

/// Builds a [`Descriptor`] with various configuration knobs.
///
/// # Example
///
/// ```
/// use csv_bind::Descriptor;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// # fn main() -> csv_bind::Result<()> {
/// let descriptor = Descriptor::builder()
///     .named_column("Name", "name")
///     .named_column("Age", "age")
///     .separator(';')
///     .has_header(true)
///     .build::<Person>()?;
/// assert_eq!(descriptor.header(), Some(vec!["Name", "Age"]));
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct DescriptorBuilder {
    columns: Vec<ColumnDef>,
    separator: char,
    has_header: bool,
    null_value: String,
    charset: Charset,
    debug: bool,
}

impl Default for DescriptorBuilder {
    fn default() -> DescriptorBuilder {
        DescriptorBuilder {
            columns: vec![],
            separator: ',',
            has_header: false,
            null_value: DEFAULT_NULL_VALUE.to_string(),
            charset: Charset::default(),
            debug: false,
        }
    }
}

impl DescriptorBuilder {
    /// Create a new builder with no columns and default settings.
    pub fn new() -> DescriptorBuilder {
        DescriptorBuilder::default()
    }

    /// Add an unnamed column bound to the given record field.
    ///
    /// A descriptor with an unnamed column has no header line.
    pub fn column(&mut self, property: &str) -> &mut DescriptorBuilder {
        self.push(None, property, None)
    }

    /// Add a named column bound to the given record field.
    pub fn named_column(
        &mut self,
        name: &str,
        property: &str,
    ) -> &mut DescriptorBuilder {
        self.push(Some(name), property, None)
    }

    /// Add a column whose values go through the given formatter instead of
    /// the generic conversion.
    pub fn column_with_format<F: Format + 'static>(
        &mut self,
        name: Option<&str>,
        property: &str,
        format: F,
    ) -> &mut DescriptorBuilder {
        self.push(name, property, Some(Arc::new(format)))
    }

    /// Like `column_with_format`, but with a formatter that is already
    /// shared, e.g., one looked up in a [`FormatRegistry`].
    pub fn column_with_shared_format(
        &mut self,
        name: Option<&str>,
        property: &str,
        format: Arc<dyn Format>,
    ) -> &mut DescriptorBuilder {
        self.push(name, property, Some(format))
    }

    /// The field separator. The default is `,`.
    ///
    /// CR, LF and `"` cannot be used as separators.
    pub fn separator(&mut self, separator: char) -> &mut DescriptorBuilder {
        self.separator = separator;
        self
    }

    /// Whether the CSV stream starts with a header line. Disabled by
    /// default.
    pub fn has_header(&mut self, yes: bool) -> &mut DescriptorBuilder {
        self.has_header = yes;
        self
    }

    /// The token written for absent values. The default is `null`.
    pub fn null_value(&mut self, value: &str) -> &mut DescriptorBuilder {
        self.null_value = value.to_string();
        self
    }

    /// The character encoding of the CSV stream. The default is UTF-8.
    pub fn charset(&mut self, charset: Charset) -> &mut DescriptorBuilder {
        self.charset = charset;
        self
    }

    /// Log every raw line read at debug level. Disabled by default.
    pub fn debug(&mut self, yes: bool) -> &mut DescriptorBuilder {
        self.debug = yes;
        self
    }

    /// Build a descriptor for records of type `T`.
    ///
    /// This fails with a configuration error when there are no columns,
    /// the separator is CR, LF or `"`, `T` is not a struct with named
    /// fields, or a column property names a field `T` does not have or that
    /// is already bound to another column.
    pub fn build<T: DeserializeOwned>(&self) -> Result<Descriptor<T>> {
        if self.columns.is_empty() {
            return Err(Error::config("descriptor has no columns"));
        }
        check_separator(self.separator)?;
        let shape = record_shape::<T>().ok_or_else(|| {
            Error::config("record type must be a struct with named fields")
        })?;

        let mut bound = HashSet::new();
        let mut columns = Vec::with_capacity(self.columns.len());
        for def in &self.columns {
            let field = shape
                .fields
                .iter()
                .position(|&f| f == def.property)
                .ok_or_else(|| {
                    Error::config(format!(
                        "record type {} has no field '{}'",
                        shape.name, def.property
                    ))
                })?;
            if !bound.insert(field) {
                return Err(Error::config(format!(
                    "field '{}' is bound to more than one column",
                    def.property
                )));
            }
            columns.push(Column {
                name: def.name.clone(),
                property: def.property.clone(),
                field: field,
                format: def.format.clone(),
            });
        }
        Ok(Descriptor {
            inner: Arc::new(Inner {
                type_name: shape.name,
                fields: shape.fields,
                columns: columns,
                separator: self.separator,
                has_header: self.has_header,
                null_value: self.null_value.clone(),
                charset: self.charset,
                debug: self.debug,
            }),
            _record: PhantomData,
        })
    }

    fn push(
        &mut self,
        name: Option<&str>,
        property: &str,
        format: Option<Arc<dyn Format>>,
    ) -> &mut DescriptorBuilder {
        self.columns.push(ColumnDef {
            name: name.map(|s| s.to_string()),
            property: property.to_string(),
            format: format,
        });
        self
    }
}

fn check_separator(separator: char) -> Result<()> {
    match separator {
        '\r' | '\n' => Err(Error::config(
            "line terminators cannot be used as a separator",
        )),
        '"' => Err(Error::config("the quote cannot be used as a separator")),
        _ => Ok(()),
    }
}

/// Parse a separator given by name (`comma`, `semicolon`, `colon`, `tab`,
/// `space`, `pipe`) or as a single literal character.
pub fn parse_separator(name: &str) -> Result<char> {
    let sep = match &*name.to_ascii_lowercase() {
        "comma" => ',',
        "semicolon" => ';',
        "colon" => ':',
        "tab" => '\t',
        "space" => ' ',
        "pipe" => '|',
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(Error::config(format!(
                        "invalid separator '{}'",
                        name
                    )))
                }
            }
        }
    };
    check_separator(sep)?;
    Ok(sep)
}

/// A descriptor in its declarative source form.
///
/// This is what a descriptor file deserializes into. Keys are kebab-case:
///
/// ```json
/// {
///   "type": "Person",
///   "separator": "semicolon",
///   "has-header": true,
///   "null-value": "N/A",
///   "columns": [
///     { "name": "Name", "property": "name" },
///     { "name": "Born", "property": "born", "format": "short-date" }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DescriptorConfig {
    /// The serde name of the record type, checked at build time.
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    /// The columns, in CSV order.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    /// The separator name or character.
    pub separator: Option<String>,
    /// The token written for absent values.
    pub null_value: Option<String>,
    /// Whether the CSV stream starts with a header line.
    #[serde(default)]
    pub has_header: bool,
    /// The charset name.
    pub charset: Option<String>,
    /// Whether readers log every raw line at debug level.
    #[serde(default)]
    pub debug: bool,
}

/// One column in its declarative source form.
///
/// A column has either a `name`, which becomes its header label, or an
/// `index`, which marks it as unnamed.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ColumnConfig {
    /// The header label.
    pub name: Option<String>,
    /// The zero based column position, for unnamed columns. When given, it
    /// must equal the column's position in `columns`.
    pub index: Option<usize>,
    /// The bound record field.
    pub property: Option<String>,
    /// The name of a formatter in the registry.
    pub format: Option<String>,
}

impl DescriptorConfig {
    /// Build a descriptor for records of type `T`, resolving formatter
    /// names in `registry`.
    ///
    /// Besides the checks done by [`DescriptorBuilder::build`], this fails
    /// when `type` does not match `T`, a column has neither a name nor an
    /// index, a column's index is not its position, a column has no
    /// property, or a formatter name is unknown.
    pub fn build<T: DeserializeOwned>(
        &self,
        registry: &FormatRegistry,
    ) -> Result<Descriptor<T>> {
        if let Some(ref expected) = self.record_type {
            let actual = record_shape::<T>().map(|s| s.name);
            if actual != Some(&**expected) {
                return Err(Error::config(format!(
                    "descriptor is for type '{}' but the record type is {}",
                    expected,
                    actual.unwrap_or("not a struct")
                )));
            }
        }

        let mut builder = DescriptorBuilder::new();
        builder.has_header(self.has_header).debug(self.debug);
        if let Some(ref sep) = self.separator {
            builder.separator(parse_separator(sep)?);
        }
        if let Some(ref null) = self.null_value {
            builder.null_value(null);
        }
        if let Some(ref charset) = self.charset {
            builder.charset(charset.parse()?);
        }
        for (i, col) in self.columns.iter().enumerate() {
            if col.name.is_none() && col.index.is_none() {
                return Err(Error::config(format!(
                    "column {} should have either a name or an index",
                    i
                )));
            }
            if let Some(index) = col.index {
                if index != i {
                    return Err(Error::config(format!(
                        "column {} declares index {}",
                        i, index
                    )));
                }
            }
            let property = col.property.as_ref().ok_or_else(|| {
                Error::config(format!("column {} has no property", i))
            })?;
            let format = match col.format {
                None => None,
                Some(ref name) => Some(registry.get(name).ok_or_else(|| {
                    Error::config(format!("unknown formatter '{}'", name))
                })?),
            };
            builder.push(col.name.as_ref().map(|s| &**s), property, format);
        }
        builder.build()
    }
}
