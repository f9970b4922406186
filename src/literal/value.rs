//! Literal value model
//!
//! A `Mapping` keeps entries in source order together with the section
//! heading each key appeared under, so a record can be rendered back with
//! its comment-delimited layout intact.

use serde_json::{Map as JsonMap, Number, Value as JsonValue};

/// A single literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Dict(Mapping),
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; ints widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Tuples and lists both read as sequences
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) | Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Dict(m) => Some(m),
            _ => None,
        }
    }

    /// Convert to JSON. Tuples become arrays, non-finite floats become null.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::None => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::Tuple(items) | Value::List(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Dict(m) => m.to_json(),
        }
    }

    /// Convert from JSON. Arrays come back as lists.
    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::None,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::Str(s.clone()),
            JsonValue::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(obj) => Value::Dict(Mapping::from_json_object(obj)),
        }
    }
}

/// One key/value pair with its source position
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: String,
    pub value: Value,
    /// Section heading the key appeared under
    pub section: Option<String>,
    /// 1-based source line (0 when inserted programmatically)
    pub line: usize,
}

/// Entries compare by key, value and section; source lines are ignored
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value && self.section == other.section
    }
}

/// Insertion-ordered mapping with unique keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<Entry>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entry(key).map(|e| &e.value)
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// Insert or replace. A replaced entry keeps its position and section.
    ///
    /// New keys have no section, so they go after the last unsectioned entry
    /// and ahead of the first heading; in the text form anything below a
    /// heading belongs to it.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
            return Some(std::mem::replace(&mut existing.value, value));
        }
        let at = self
            .entries
            .iter()
            .position(|e| e.section.is_some())
            .unwrap_or(self.entries.len());
        self.entries.insert(
            at,
            Entry {
                key,
                value,
                section: None,
                line: 0,
            },
        );
        None
    }

    /// Insert at the end of a section (or the end of the mapping when the
    /// section is new). An existing key keeps its own position and section.
    pub fn insert_in_section(&mut self, key: impl Into<String>, value: Value, section: &str) {
        let key = key.into();
        if self.contains_key(&key) {
            self.insert(key, value);
            return;
        }
        let entry = Entry {
            key,
            value,
            section: Some(section.to_string()),
            line: 0,
        };
        match self
            .entries
            .iter()
            .rposition(|e| e.section.as_deref() == Some(section))
        {
            Some(idx) => self.entries.insert(idx + 1, entry),
            None => self.entries.push(entry),
        }
    }

    /// Append a fully specified entry. Caller guarantees key uniqueness.
    pub(crate) fn push_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(idx).value)
    }

    /// Rename a key in place, keeping value, position and section
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if self.contains_key(to) {
            return false;
        }
        match self.entries.iter_mut().find(|e| e.key == from) {
            Some(entry) => {
                entry.key = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.value))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Distinct section headings in order of first appearance
    pub fn sections(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if let Some(section) = entry.section.as_deref() {
                if !seen.contains(&section) {
                    seen.push(section);
                }
            }
        }
        seen
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = JsonMap::new();
        for entry in &self.entries {
            obj.insert(entry.key.clone(), entry.value.to_json());
        }
        JsonValue::Object(obj)
    }

    pub fn from_json_object(obj: &JsonMap<String, JsonValue>) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in obj {
            mapping.insert(key.clone(), Value::from_json(value));
        }
        mapping
    }
}
