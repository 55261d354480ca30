use std::borrow::Cow;

use serde::ser::{
    Error as SerdeError, Impossible, Serialize, SerializeMap, SerializeSeq,
    SerializeStruct, SerializeTuple, SerializeTupleStruct, Serializer,
};

use crate::error::Error;
use crate::value::Value;

/// One field captured from a record, with its name when it has one.
///
/// Struct fields and map entries are named. Elements of sequences and
/// tuples are positional.
pub type Captured = (Option<Cow<'static, str>>, Value);

/// Flatten a record into its fields.
///
/// A record is a struct, a map, a tuple or a sequence, possibly wrapped in
/// `Some` or a newtype. A record that serializes as `None` or `()` yields
/// `Error::NullRecord`. Each field must itself be a scalar (or an optional
/// scalar); nested compound values are rejected.
pub fn capture<S: Serialize + ?Sized>(record: &S) -> Result<Vec<Captured>, Error> {
    let mut ser = SeRecord { fields: vec![], key: None };
    record.serialize(&mut ser)?;
    Ok(ser.fields)
}

struct SeRecord {
    fields: Vec<Captured>,
    key: Option<Cow<'static, str>>,
}

impl SeRecord {
    fn not_a_record(&self, what: &str) -> Error {
        Error::custom(format!(
            "{} cannot be written as a CSV record, expected a struct, map, \
             tuple or sequence",
            what
        ))
    }

    fn push<T: ?Sized + Serialize>(
        &mut self,
        key: Option<Cow<'static, str>>,
        value: &T,
    ) -> Result<(), Error> {
        let field = match key {
            Some(Cow::Borrowed(name)) => name,
            _ => "",
        };
        let value = value.serialize(SeField { field: field })?;
        self.fields.push((key, value));
        Ok(())
    }
}

macro_rules! not_a_record {
    ($method:ident, $ty:ty, $what:expr) => {
        fn $method(self, _v: $ty) -> Result<Self::Ok, Self::Error> {
            Err(self.not_a_record($what))
        }
    };
}

impl<'a> Serializer for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), Error>;

    not_a_record!(serialize_bool, bool, "a boolean");
    not_a_record!(serialize_i8, i8, "an integer");
    not_a_record!(serialize_i16, i16, "an integer");
    not_a_record!(serialize_i32, i32, "an integer");
    not_a_record!(serialize_i64, i64, "an integer");
    not_a_record!(serialize_u8, u8, "an integer");
    not_a_record!(serialize_u16, u16, "an integer");
    not_a_record!(serialize_u32, u32, "an integer");
    not_a_record!(serialize_u64, u64, "an integer");
    not_a_record!(serialize_f32, f32, "a float");
    not_a_record!(serialize_f64, f64, "a float");
    not_a_record!(serialize_char, char, "a character");
    not_a_record!(serialize_str, &str, "a string");
    not_a_record!(serialize_bytes, &[u8], "a byte string");

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Err(Error::NullRecord)
    }

    fn serialize_some<T: ?Sized + Serialize>(
        self,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Err(Error::NullRecord)
    }

    fn serialize_unit_struct(
        self,
        name: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Err(self.not_a_record(&format!("unit struct {}", name)))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Err(self.not_a_record(&format!("enum variant {}", variant)))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_seq(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(self)
    }

    fn serialize_tuple(
        self,
        _len: usize,
    ) -> Result<Self::SerializeTuple, Self::Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(self.not_a_record(&format!("enum variant {}", variant)))
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeMap, Self::Error> {
        Ok(self)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(self.not_a_record(&format!("enum variant {}", variant)))
    }
}

impl<'a> SerializeSeq for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.push(None, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

impl<'a> SerializeTuple for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.push(None, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

impl<'a> SerializeTupleStruct for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.push(None, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

impl<'a> SerializeMap for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(
        &mut self,
        key: &T,
    ) -> Result<(), Self::Error> {
        let key = key.serialize(SeField { field: "<map key>" })?;
        self.key = Some(Cow::Owned(key.to_text().into_owned()));
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        let key = self.key.take();
        self.push(key, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

impl<'a> SerializeStruct for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.push(Some(Cow::Borrowed(key)), value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(())
    }
}

/// Serializes a single record field into a `Value`.
struct SeField {
    field: &'static str,
}

impl SeField {
    fn nested(&self, what: &str) -> Error {
        Error::custom(format!(
            "field '{}' is {}, which cannot be written to a single CSV field",
            self.field, what
        ))
    }
}

impl Serializer for SeField {
    type Ok = Value;
    type Error = Error;
    type SerializeSeq = Impossible<Value, Error>;
    type SerializeTuple = Impossible<Value, Error>;
    type SerializeTupleStruct = Impossible<Value, Error>;
    type SerializeTupleVariant = Impossible<Value, Error>;
    type SerializeMap = Impossible<Value, Error>;
    type SerializeStruct = Impossible<Value, Error>;
    type SerializeStructVariant = Impossible<Value, Error>;

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        Ok(Value::I64(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        Ok(Value::I64(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        Ok(Value::I64(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        Ok(Value::I64(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        Ok(Value::U64(u64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        Ok(Value::U64(u64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        Ok(Value::U64(u64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        Ok(Value::U64(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        Ok(Value::F32(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        Ok(Value::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        Ok(Value::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Error> {
        Ok(Value::Str(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Error> {
        Ok(Value::Str(String::from_utf8_lossy(v).into_owned()))
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(
        self,
        value: &T,
    ) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(
        self,
        _name: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::Str(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_seq(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeSeq, Error> {
        Err(self.nested("a sequence"))
    }

    fn serialize_tuple(
        self,
        _len: usize,
    ) -> Result<Self::SerializeTuple, Error> {
        Err(self.nested("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(self.nested(&format!("tuple struct {}", name)))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(self.nested(&format!("enum variant {}", variant)))
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeMap, Error> {
        Err(self.nested("a map"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Err(self.nested(&format!("struct {}", name)))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(self.nested(&format!("enum variant {}", variant)))
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::{capture, Captured};
    use crate::error::Error;
    use crate::value::Value;

    #[derive(Serialize)]
    struct Person {
        name: Option<String>,
        age: u8,
        #[serde(skip)]
        #[allow(dead_code)]
        secret: String,
    }

    #[derive(Serialize)]
    enum Kind {
        Adult,
    }

    #[derive(Serialize)]
    struct Tagged {
        kind: Kind,
        ratio: f32,
    }

    fn named(name: &'static str, value: Value) -> Captured {
        (Some(Cow::Borrowed(name)), value)
    }

    #[test]
    fn struct_fields() {
        let p = Person { name: Some("John".into()), age: 54, secret: "x".into() };
        assert_eq!(
            capture(&p).unwrap(),
            vec![named("name", Value::from("John")), named("age", Value::U64(54))]
        );

        let p = Person { name: None, age: 1, secret: String::new() };
        assert_eq!(capture(&p).unwrap()[0], named("name", Value::Null));
    }

    #[test]
    fn unit_variants_and_floats() {
        let t = Tagged { kind: Kind::Adult, ratio: 0.5 };
        assert_eq!(
            capture(&t).unwrap(),
            vec![named("kind", Value::from("Adult")), named("ratio", Value::F32(0.5))]
        );
    }

    #[test]
    fn positional_fields() {
        let fields = capture(&("a", 1i32, 'c')).unwrap();
        assert_eq!(
            fields,
            vec![
                (None, Value::from("a")),
                (None, Value::I64(1)),
                (None, Value::Char('c')),
            ]
        );
    }

    #[test]
    fn map_fields() {
        let mut map = BTreeMap::new();
        map.insert(1, "one");
        map.insert(2, "two");
        let fields = capture(&map).unwrap();
        assert_eq!(fields[0].0.as_deref(), Some("1"));
        assert_eq!(fields[1].1, Value::from("two"));
    }

    #[test]
    fn absent_records() {
        assert!(matches!(capture(&None::<Person>), Err(Error::NullRecord)));
        assert!(matches!(capture(&()), Err(Error::NullRecord)));
        let some = Some(Person { name: None, age: 2, secret: String::new() });
        assert_eq!(capture(&some).unwrap().len(), 2);
    }

    #[test]
    fn scalars_and_nested_values_are_rejected() {
        assert!(matches!(capture(&5), Err(Error::Serialize(_))));
        assert!(matches!(capture(&"text"), Err(Error::Serialize(_))));
        assert!(matches!(capture(&vec![vec![1]]), Err(Error::Serialize(_))));
    }
}
