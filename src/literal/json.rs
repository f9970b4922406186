//! JSON records
//!
//! `serde_json::Value` keeps the last of two equal keys, so records are
//! read through a visitor that sees every pair and refuses repeats.

use std::cell::RefCell;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};

use super::value::{Mapping, Value};
use crate::errors::{ConfigError, Result};

/// Parse a JSON object into a mapping, rejecting duplicate keys at any depth
pub fn parse_json(text: &str) -> Result<Mapping> {
    let duplicate = RefCell::new(None);
    let mut deserializer = serde_json::Deserializer::from_str(text);

    let parsed = ValueSeed {
        duplicate: &duplicate,
    }
    .deserialize(&mut deserializer);

    let value = match parsed {
        Ok(value) => value,
        Err(e) => {
            return Err(match duplicate.into_inner() {
                Some(key) => ConfigError::DuplicateKey {
                    key,
                    first_line: 0,
                    line: e.line(),
                },
                None => ConfigError::Serialization(e),
            })
        }
    };
    deserializer.end()?;

    match value {
        Value::Dict(mapping) => Ok(mapping),
        other => Err(ConfigError::Generic(format!(
            "JSON record must be an object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::None => "null",
        Value::Bool(_) => "a boolean",
        Value::Int(_) | Value::Float(_) => "a number",
        Value::Str(_) => "a string",
        Value::Tuple(_) | Value::List(_) => "an array",
        Value::Dict(_) => "an object",
    }
}

/// Builds `Value`s straight from the deserializer; remembers the first repeated key
#[derive(Clone, Copy)]
struct ValueSeed<'a> {
    duplicate: &'a RefCell<Option<String>>,
}

impl<'de, 'a> DeserializeSeed<'de> for ValueSeed<'a> {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'a> Visitor<'de> for ValueSeed<'a> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::None)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::None)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> std::result::Result<Value, E> {
        Ok(i64::try_from(u)
            .map(Value::Int)
            .unwrap_or(Value::Float(u as f64)))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Value, E> {
        Ok(Value::Str(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> std::result::Result<Value, E> {
        Ok(Value::Str(s))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(self)? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut mapping = Mapping::new();
        while let Some(key) = map.next_key::<String>()? {
            if mapping.contains_key(&key) {
                let message = format!("duplicate key '{}'", key);
                *self.duplicate.borrow_mut() = Some(key);
                return Err(de::Error::custom(message));
            }
            let value = map.next_value_seed(self)?;
            mapping.insert(key, value);
        }
        Ok(Value::Dict(mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_order_and_types() {
        let m = parse_json(r#"{"seed": 7, "fit_lr": 0.001, "demo_file": null, "hidden_size": [32, 32]}"#)
            .unwrap();
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["seed", "fit_lr", "demo_file", "hidden_size"]);
        assert_eq!(m.get("seed"), Some(&Value::Int(7)));
        assert_eq!(m.get("fit_lr"), Some(&Value::Float(0.001)));
        assert_eq!(m.get("demo_file"), Some(&Value::None));
        assert_eq!(
            m.get("hidden_size"),
            Some(&Value::List(vec![Value::Int(32), Value::Int(32)]))
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = parse_json("{\n\"seed\": 1,\n\"num_iter\": 5,\n\"seed\": 2\n}").unwrap_err();
        match err {
            ConfigError::DuplicateKey { key, line, .. } => {
                assert_eq!(key, "seed");
                assert_eq!(line, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_nested_duplicate_rejected() {
        let err = parse_json(r#"{"filter_coefs": {"f1": 0.5, "f1": 1.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateKey { ref key, .. } if key == "f1"));
    }

    #[test]
    fn test_malformed_and_non_object() {
        assert!(matches!(parse_json("{\"a\": }"), Err(ConfigError::Serialization(_))));
        assert!(matches!(parse_json("{} {}"), Err(ConfigError::Serialization(_))));
        assert!(parse_json("[1, 2]").unwrap_err().to_string().contains("an array"));
    }
}
