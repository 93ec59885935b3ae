//! Conversion from typed structures into property values.

use std::collections::{BTreeMap, HashMap};

use crate::error::ProviderError;
use crate::schema::{record_schema, Record};
use crate::value::{PropertyMap, PropertyValue};

/// Types that can be encoded as a property value.
pub trait Encode {
    /// Encode `self`.
    fn encode(&self) -> Result<PropertyValue, ProviderError>;
}

/// Encode a value that must become an object, such as a resource record.
pub fn encode_properties<T: Encode + ?Sized>(src: &T) -> Result<PropertyMap, ProviderError> {
    match src.encode()? {
        PropertyValue::Object(map) => Ok(map),
        other => Err(ProviderError::NotAnObject(other.type_name())),
    }
}

/// Encode a record field by field, using each field's wire name.
pub fn encode_record<T: Record>(record: &T) -> Result<PropertyValue, ProviderError> {
    let schema = record_schema::<T>()?;
    record.encode_fields(&schema).map(PropertyValue::Object)
}

impl Encode for bool {
    fn encode(&self) -> Result<PropertyValue, ProviderError> {
        Ok(PropertyValue::Bool(*self))
    }
}

macro_rules! encode_number {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                #[allow(clippy::unnecessary_cast)]
                fn encode(&self) -> Result<PropertyValue, ProviderError> {
                    Ok(PropertyValue::Number(*self as f64))
                }
            }
        )*
    };
}

encode_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Encode for String {
    fn encode(&self) -> Result<PropertyValue, ProviderError> {
        Ok(PropertyValue::String(self.clone()))
    }
}

impl Encode for str {
    fn encode(&self) -> Result<PropertyValue, ProviderError> {
        Ok(PropertyValue::String(self.to_string()))
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self) -> Result<PropertyValue, ProviderError> {
        self.iter()
            .map(Encode::encode)
            .collect::<Result<Vec<_>, _>>()
            .map(PropertyValue::Array)
    }
}

impl<T: Encode> Encode for HashMap<String, T> {
    fn encode(&self) -> Result<PropertyValue, ProviderError> {
        self.iter()
            .map(|(k, v)| Ok((k.clone(), v.encode()?)))
            .collect::<Result<PropertyMap, _>>()
            .map(PropertyValue::Object)
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn encode(&self) -> Result<PropertyValue, ProviderError> {
        self.iter()
            .map(|(k, v)| Ok((k.clone(), v.encode()?)))
            .collect::<Result<PropertyMap, _>>()
            .map(PropertyValue::Object)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self) -> Result<PropertyValue, ProviderError> {
        match self {
            Some(inner) => inner.encode(),
            None => Ok(PropertyValue::Null),
        }
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self) -> Result<PropertyValue, ProviderError> {
        self.as_ref().encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::check_record;
    use crate::decode::decode_properties;

    crate::property_record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Limits {
            #[property("memory")]
            memory: String,
            #[property("cpu,optional")]
            cpu: Option<f64>,
        }
    }

    crate::property_record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Function {
            #[property("service,forceNew")]
            service: String,
            #[property("image")]
            image: String,
            #[property("envVars,optional")]
            env_vars: HashMap<String, String>,
            #[property("replicas,optional")]
            replicas: u16,
            #[property("readOnly,optional")]
            read_only: bool,
            #[property("limits,optional")]
            limits: Option<Limits>,
            #[property("constraints,optional")]
            constraints: Vec<String>,
            #[property("-")]
            revision: u64,
        }
    }

    fn sample() -> Function {
        Function {
            service: "a".to_string(),
            image: "v1".to_string(),
            env_vars: HashMap::from([("K".to_string(), "V".to_string())]),
            replicas: 2,
            read_only: true,
            limits: Some(Limits {
                memory: "64Mi".to_string(),
                cpu: None,
            }),
            constraints: vec!["node=a".to_string()],
            revision: 0,
        }
    }

    #[test]
    fn test_encode_record_uses_wire_names() {
        let map = encode_properties(&sample()).unwrap();

        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![
            "constraints",
            "envVars",
            "image",
            "limits",
            "readOnly",
            "replicas",
            "service"
        ]);
        assert_eq!(map["replicas"], PropertyValue::Number(2.0));
        assert_eq!(map["readOnly"], PropertyValue::Bool(true));
        assert!(!map.contains_key("revision"));

        let limits = map["limits"].as_object().unwrap();
        assert_eq!(limits["memory"], PropertyValue::from("64Mi"));
        assert_eq!(limits["cpu"], PropertyValue::Null);
    }

    #[test]
    fn test_encode_none_is_null() {
        let f = Function {
            limits: None,
            ..sample()
        };
        let map = encode_properties(&f).unwrap();
        assert_eq!(map["limits"], PropertyValue::Null);
    }

    #[test]
    fn test_encode_numbers_share_one_carrier() {
        assert_eq!(7u8.encode().unwrap(), PropertyValue::Number(7.0));
        assert_eq!((-7i64).encode().unwrap(), PropertyValue::Number(-7.0));
        assert_eq!(0.25f32.encode().unwrap(), PropertyValue::Number(0.25));
    }

    #[test]
    fn test_encode_non_object_is_error() {
        let err = encode_properties("x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "encoded properties must be a map, not a string"
        );

        let err = encode_properties(&vec![1u8, 2]).unwrap_err();
        assert!(matches!(err, ProviderError::NotAnObject("array")));
    }

    #[test]
    fn test_decode_of_encode_is_identity() {
        let original = Function {
            revision: 0,
            ..sample()
        };
        let map = encode_properties(&original).unwrap();

        let mut decoded = Function::default();
        decode_properties(&map, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_encoded_record_passes_check() {
        let map = encode_properties(&sample()).unwrap();
        assert!(check_record::<Function>(&map).unwrap().is_empty());
    }
}
