use std::error;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, Visitor};

/// The shape of a record type, as declared through its `Deserialize` impl.
#[derive(Clone, Copy, Debug)]
pub struct RecordShape {
    /// The serde name of the struct.
    pub name: &'static str,
    /// The names of its fields, in declaration order.
    pub fields: &'static [&'static str],
}

/// Discover the struct name and field names of `T`.
///
/// This drives `T`'s `Deserialize` impl against a deserializer that records
/// what `deserialize_struct` was asked for and then bails out. It returns
/// `None` if `T` is not a struct with named fields.
pub fn record_shape<'de, T: Deserialize<'de>>() -> Option<RecordShape> {
    let mut discover = Discover { shape: None };
    // Always fails; the interesting part is what got recorded.
    let _ = T::deserialize(&mut discover);
    discover.shape
}

struct Discover {
    shape: Option<RecordShape>,
}

#[derive(Debug)]
struct Stop;

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("record shape discovery")
    }
}

impl error::Error for Stop {}

impl de::Error for Stop {
    fn custom<T: fmt::Display>(_msg: T) -> Stop {
        Stop
    }
}

impl<'de, 'a> Deserializer<'de> for &'a mut Discover {
    type Error = Stop;

    fn deserialize_any<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> Result<V::Value, Stop> {
        Err(Stop)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Stop> {
        self.shape = Some(RecordShape { name: name, fields: fields });
        Err(Stop)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::record_shape;

    #[allow(dead_code)]
    #[derive(Deserialize)]
    struct Person {
        name: String,
        #[serde(rename = "years")]
        age: u32,
        email: Option<String>,
    }

    #[allow(dead_code)]
    #[derive(Deserialize)]
    struct Pair(String, u32);

    #[test]
    fn struct_fields() {
        let shape = record_shape::<Person>().unwrap();
        assert_eq!(shape.name, "Person");
        assert_eq!(shape.fields, &["name", "years", "email"]);
    }

    #[test]
    fn not_a_struct() {
        assert!(record_shape::<Pair>().is_none());
        assert!(record_shape::<(String, u32)>().is_none());
        assert!(record_shape::<Vec<String>>().is_none());
        assert!(record_shape::<u32>().is_none());
    }
}
