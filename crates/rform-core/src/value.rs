#![forbid(unsafe_code)]

//! Dynamic value model shared by every form unit.
//!
//! Form trees mirror a domain model whose shape (nested objects, arrays of
//! objects, nullable branches) is only known at runtime, so every unit
//! reports its contribution as a [`Value`]. Leaves hold scalars, layers
//! aggregate into [`Value::Object`], lists aggregate into [`Value::List`].
//!
//! # Invariants
//!
//! 1. Object keys iterate in insertion order ([`ValueMap`] is an `IndexMap`).
//! 2. Equality is deep and structural; object equality ignores key order.
//! 3. An *absent* leaf state is `Option<Value>::None`; it is rendered as
//!    [`Value::Null`] once folded into an aggregate.

use std::fmt;

use indexmap::IndexMap;
use time::Date;

/// Insertion-ordered string-keyed map used for object-shaped values.
pub type ValueMap = IndexMap<String, Value>;

/// Metadata for a file attached to a file-kind node.
///
/// The form layer never reads file contents; it only tracks identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileRef {
    /// File name as reported by the host.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type, when known.
    pub mime: Option<String>,
}

impl FileRef {
    /// Create a file reference without a MIME type.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mime: None,
        }
    }

    /// Attach a MIME type.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// A dynamically typed form value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null (also used for absent leaves inside aggregates).
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(Date),
    File(FileRef),
    /// Array-shaped value (list units).
    List(Vec<Value>),
    /// Object-shaped value (layer units).
    Object(ValueMap),
}

/// Discriminant of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Date,
    File,
    List,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Date => "date",
            Self::File => "file",
            Self::List => "list",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Build an object value from key/value pairs, preserving order.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list value.
    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Render an optional leaf state into an aggregate slot.
    #[inline]
    pub fn from_state(state: Option<Value>) -> Self {
        state.unwrap_or(Value::Null)
    }

    /// The kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Date(_) => ValueKind::Date,
            Self::File(_) => ValueKind::File,
            Self::List(_) => ValueKind::List,
            Self::Object(_) => ValueKind::Object,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            Self::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key on an object value. Non-objects yield `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Look up an index on a list value. Non-lists yield `None`.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.as_list().and_then(|items| items.get(index))
    }

    /// Whether the value carries no user content: null, empty text, empty list.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(
                f,
                "{:04}-{:02}-{:02}",
                d.year(),
                u8::from(d.month()),
                d.day()
            ),
            Self::File(file) => f.write_str(&file.name),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Object(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Self::Date(d)
    }
}

impl From<FileRef> for Value {
    fn from(f: FileRef) -> Self {
        Self::File(f)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Self::Object(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// serde
// ---------------------------------------------------------------------------

#[cfg(feature = "serde")]
mod serde_impl {
    use super::{FileRef, Value, ValueMap};
    use serde_json::Value as Json;
    use time::Date;
    use time::macros::format_description;

    const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]");

    impl From<&Value> for Json {
        fn from(value: &Value) -> Self {
            match value {
                Value::Null => Json::Null,
                Value::Bool(b) => Json::Bool(*b),
                Value::Int(i) => Json::from(*i),
                Value::Float(x) => serde_json::Number::from_f64(*x).map_or(Json::Null, Json::Number),
                Value::Text(s) => Json::String(s.clone()),
                Value::Date(d) => d
                    .format(DATE_FORMAT)
                    .map_or(Json::Null, Json::String),
                Value::File(file) => serde_json::to_value(file).unwrap_or(Json::Null),
                Value::List(items) => Json::Array(items.iter().map(Json::from).collect()),
                Value::Object(map) => Json::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Json::from(v)))
                        .collect(),
                ),
            }
        }
    }

    impl From<Json> for Value {
        /// JSON carries no date or file tag, so strings stay text and
        /// objects stay objects.
        fn from(json: Json) -> Self {
            match json {
                Json::Null => Value::Null,
                Json::Bool(b) => Value::Bool(b),
                Json::Number(n) => match n.as_i64() {
                    Some(i) => Value::Int(i),
                    None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
                },
                Json::String(s) => Value::Text(s),
                Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
                Json::Object(map) => Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, Value::from(v)))
                        .collect::<ValueMap>(),
                ),
            }
        }
    }

    impl Value {
        /// Parse an ISO `YYYY-MM-DD` date into a date value.
        pub fn parse_date(text: &str) -> Option<Value> {
            Date::parse(text, DATE_FORMAT).ok().map(Value::Date)
        }

        /// Interpret a JSON object with `name`/`size` as a file reference.
        pub fn file_from_json(json: Json) -> Option<Value> {
            serde_json::from_value::<FileRef>(json).ok().map(Value::File)
        }
    }

    impl serde::Serialize for Value {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            Json::from(self).serialize(serializer)
        }
    }

    impl<'de> serde::Deserialize<'de> for Value {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            Json::deserialize(deserializer).map(Value::from)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
