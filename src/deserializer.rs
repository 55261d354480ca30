use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::iter;
use std::slice;
use std::str::FromStr;

use serde::de::value::{BorrowedStrDeserializer, StringDeserializer};
use serde::de::{
    DeserializeOwned, DeserializeSeed, Deserializer, Error as SerdeError,
    IntoDeserializer, MapAccess, Visitor,
};
use tracing::warn;

use crate::value::Value;

use self::DeserializeErrorKind as DEK;

/// What a reader knows about one struct field before building a record.
#[derive(Clone, Debug)]
pub enum Slot<'r> {
    /// No column supplied a value. The field gets its default.
    Missing,
    /// Raw text from the CSV line, converted by the field's declared type.
    Text(Cow<'r, str>),
    /// A value produced by a column formatter.
    Value(Value),
}

/// Build a record from one slot per struct field.
///
/// `fields` are the struct's field names in declaration order and `slots`
/// runs parallel to them. Slots past the end of `slots` are missing.
///
/// A field whose value its type rejects is logged and left out of the
/// record, after which the record is built again. Leaving a field out means
/// serde fills it in: `Option` fields become `None` and fields marked
/// `#[serde(default)]` take their default. A field type with neither, e.g.,
/// a bare `chrono::NaiveDate`, cannot be left out, and the original
/// conversion error is returned.
pub fn deserialize_record<T: DeserializeOwned>(
    fields: &'static [&'static str],
    slots: Vec<Slot>,
) -> Result<T, DeserializeError> {
    let mut omitted: Vec<Option<DeserializeError>> = vec![None; fields.len()];
    loop {
        let de = DeRecord { fields: fields, slots: &slots, omitted: &omitted };
        let err = match T::deserialize(de) {
            Ok(record) => return Ok(record),
            Err(err) => err,
        };
        let i = match err.field().and_then(|f| fields.iter().position(|&k| k == f)) {
            Some(i) => i,
            None => return Err(err),
        };
        if let Some(ref original) = omitted[i] {
            // The field is already left out and its type has no default.
            return Err(original.clone());
        }
        if let DEK::Unsupported(_) = err.kind {
            return Err(err);
        }
        warn!(
            field = fields[i],
            "cannot convert CSV value, leaving field out: {}", err.kind
        );
        omitted[i] = Some(err);
    }
}

struct DeRecord<'a, 'r> {
    fields: &'static [&'static str],
    slots: &'a [Slot<'r>],
    omitted: &'a [Option<DeserializeError>],
}

impl<'de, 'a, 'r> Deserializer<'de> for DeRecord<'a, 'r> {
    type Error = DeserializeError;

    fn deserialize_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_map(DeRecordMap {
            keys: self.fields.iter().enumerate(),
            slots: self.slots,
            omitted: self.omitted,
            pending: None,
        })
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct DeRecordMap<'a, 'r> {
    keys: iter::Enumerate<slice::Iter<'static, &'static str>>,
    slots: &'a [Slot<'r>],
    omitted: &'a [Option<DeserializeError>],
    pending: Option<(&'static str, Slot<'r>)>,
}

impl<'de, 'a, 'r> MapAccess<'de> for DeRecordMap<'a, 'r> {
    type Error = DeserializeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        let (i, key) = loop {
            match self.keys.next() {
                None => return Ok(None),
                Some((i, _)) if self.omitted[i].is_some() => continue,
                Some((i, &key)) => break (i, key),
            }
        };
        let slot = self.slots.get(i).cloned().unwrap_or(Slot::Missing);
        self.pending = Some((key, slot));
        seed.deserialize(BorrowedStrDeserializer::new(key)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let (key, slot) = match self.pending.take() {
            Some(pending) => pending,
            None => {
                return Err(DeserializeError::custom(
                    "field value requested before its name",
                ))
            }
        };
        seed.deserialize(DeField { key: key, slot: slot })
            .map_err(|err| err.in_field(key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.keys.len())
    }
}

/// Deserializes a single field leniently.
///
/// Missing values, empty text and text that does not convert to the field's
/// declared type all produce the type's default value (zero, `false`, `'\0'`,
/// the empty string or `None`). Conversion failures of non-empty text are
/// reported as warnings.
struct DeField<'r> {
    key: &'static str,
    slot: Slot<'r>,
}

impl<'r> DeField<'r> {
    fn text(&self) -> Option<Cow<str>> {
        match self.slot {
            Slot::Missing | Slot::Value(Value::Null) => None,
            Slot::Text(ref text) => Some(Cow::Borrowed(text)),
            Slot::Value(ref value) => Some(value.to_text()),
        }
    }

    fn is_blank(&self) -> bool {
        self.text().map_or(true, |text| text.is_empty())
    }

    fn parse<T>(&self, expected: &'static str) -> T
    where
        T: FromStr + Default,
        T::Err: fmt::Display,
    {
        self.convert(expected, |text| text.parse::<T>().map_err(|e| e.to_string()))
    }

    fn convert<T, F>(&self, expected: &'static str, convert: F) -> T
    where
        T: Default,
        F: FnOnce(&str) -> Result<T, String>,
    {
        let text = match self.text() {
            None => return T::default(),
            Some(text) => text,
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return T::default();
        }
        match convert(trimmed) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    field = self.key,
                    value = trimmed,
                    "cannot convert CSV value to {}, using default: {}",
                    expected,
                    err
                );
                T::default()
            }
        }
    }

    fn unsupported(&self, what: &str) -> DeserializeError {
        DeserializeError {
            field: Some(self.key),
            kind: DEK::Unsupported(format!(
                "{} cannot be read from a single CSV field",
                what
            )),
        }
    }
}

fn parse_bool(text: &str) -> Result<bool, String> {
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Ok(false)
    } else {
        Err(format!("'{}' is not a boolean", text))
    }
}

fn parse_char(text: &str) -> Result<char, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!(
            "expected single character but got {} characters",
            text.chars().count()
        )),
    }
}

macro_rules! deserialize_number {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(
            self,
            visitor: V,
        ) -> Result<V::Value, Self::Error> {
            visitor.$visit(self.parse::<$ty>(stringify!($ty)))
        }
    };
}

impl<'de, 'r> Deserializer<'de> for DeField<'r> {
    type Error = DeserializeError;

    fn deserialize_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.slot {
            Slot::Missing | Slot::Value(Value::Null) => visitor.visit_none(),
            Slot::Value(Value::Bool(v)) => visitor.visit_bool(v),
            Slot::Value(Value::I64(v)) => visitor.visit_i64(v),
            Slot::Value(Value::U64(v)) => visitor.visit_u64(v),
            Slot::Value(Value::F32(v)) => visitor.visit_f32(v),
            Slot::Value(Value::F64(v)) => visitor.visit_f64(v),
            Slot::Value(Value::Char(v)) => visitor.visit_char(v),
            Slot::Value(Value::Str(v)) => visitor.visit_string(v),
            Slot::Text(text) => {
                if text == "true" {
                    visitor.visit_bool(true)
                } else if text == "false" {
                    visitor.visit_bool(false)
                } else if let Ok(n) = text.parse::<u64>() {
                    visitor.visit_u64(n)
                } else if let Ok(n) = text.parse::<i64>() {
                    visitor.visit_i64(n)
                } else if let Some(n) = try_float(&text) {
                    visitor.visit_f64(n)
                } else {
                    visitor.visit_str(&text)
                }
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        if let Slot::Value(Value::Bool(v)) = self.slot {
            return visitor.visit_bool(v);
        }
        visitor.visit_bool(self.convert("bool", parse_bool))
    }

    deserialize_number!(deserialize_i8, visit_i8, i8);
    deserialize_number!(deserialize_i16, visit_i16, i16);
    deserialize_number!(deserialize_i32, visit_i32, i32);
    deserialize_number!(deserialize_i64, visit_i64, i64);
    deserialize_number!(deserialize_u8, visit_u8, u8);
    deserialize_number!(deserialize_u16, visit_u16, u16);
    deserialize_number!(deserialize_u32, visit_u32, u32);
    deserialize_number!(deserialize_u64, visit_u64, u64);
    deserialize_number!(deserialize_f32, visit_f32, f32);
    deserialize_number!(deserialize_f64, visit_f64, f64);

    fn deserialize_char<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        if let Slot::Value(Value::Char(v)) = self.slot {
            return visitor.visit_char(v);
        }
        visitor.visit_char(self.convert("char", parse_char))
    }

    fn deserialize_str<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.text() {
            None => visitor.visit_str(""),
            Some(text) => visitor.visit_str(&text),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.text() {
            None => visitor.visit_bytes(&[]),
            Some(text) => visitor.visit_bytes(text.as_bytes()),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        if self.is_blank() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("a sequence"))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("a tuple"))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported(&format!("tuple struct {}", name)))
    }

    fn deserialize_map<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("a map"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported(&format!("struct {}", name)))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let variant = self.text().map_or(String::new(), Cow::into_owned);
        let de: StringDeserializer<DeserializeError> =
            variant.into_deserializer();
        visitor.visit_enum(de)
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

fn try_float(s: &str) -> Option<f64> {
    // `f64::from_str` also accepts words like `inf` and `nan`, which are far
    // more likely to be text than numbers in a CSV field.
    let looks_numeric = s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes().all(|b| b"0123456789+-.eE".contains(&b));
    if looks_numeric {
        s.parse().ok()
    } else {
        None
    }
}

/// An error that occurs when building a record from a CSV line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeserializeError {
    field: Option<&'static str>,
    kind: DeserializeErrorKind,
}

/// The type of a deserialization error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeserializeErrorKind {
    /// A generic serde deserialization error, e.g., an unknown enum variant.
    Message(String),
    /// The record type has a shape that cannot be built from CSV fields.
    Unsupported(String),
}

impl DeserializeError {
    /// The record field in which this error occurred, if known.
    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    /// The type of this error.
    pub fn kind(&self) -> &DeserializeErrorKind {
        &self.kind
    }

    fn in_field(mut self, field: &'static str) -> DeserializeError {
        if self.field.is_none() {
            self.field = Some(field);
        }
        self
    }
}

impl SerdeError for DeserializeError {
    fn custom<T: fmt::Display>(msg: T) -> DeserializeError {
        DeserializeError { field: None, kind: DEK::Message(msg.to_string()) }
    }

    fn missing_field(field: &'static str) -> DeserializeError {
        DeserializeError {
            field: Some(field),
            kind: DEK::Message("missing field".to_string()),
        }
    }
}

impl StdError for DeserializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(field) = self.field {
            write!(f, "field '{}': {}", field, self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl fmt::Display for DeserializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DEK::Message(ref msg) => write!(f, "{}", msg),
            DEK::Unsupported(ref msg) => write!(f, "{}", msg),
        }
    }
}
