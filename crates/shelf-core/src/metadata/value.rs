//! Caller-facing metadata values.
//!
//! [`MetaValue`] is what callers put into a record's attribute map. It is
//! deliberately wider than JSON: non-finite floats, timestamps and arbitrary
//! displayable values are accepted and turned into JSON by the
//! [`MetadataEncoder`](super::MetadataEncoder).

use std::{collections::BTreeMap, fmt, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};

/// Open attribute mapping stored in a record's metadata document.
pub type Attributes = BTreeMap<String, MetaValue>;

/// A metadata attribute value before normalization.
#[derive(Clone)]
pub enum MetaValue {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer of any width up to 64 bits.
    Int(i64),
    /// Unsigned integer of any width up to 64 bits.
    UInt(u64),
    /// Floating point value, possibly NaN or infinite.
    Float(f64),
    /// Text.
    Text(String),
    /// Sequence (possibly nested, e.g. a numeric matrix).
    List(Vec<MetaValue>),
    /// Nested mapping.
    Map(BTreeMap<String, MetaValue>),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Calendar date.
    Date(NaiveDate),
    /// An already-encoded JSON value, passed through unchanged.
    Json(serde_json::Value),
    /// Anything else that can render itself as text.
    Display(Arc<dyn fmt::Display + Send + Sync>),
}

impl MetaValue {
    /// Wrap any displayable value; it will be stored as its text rendering
    /// unless a custom normalizer claims it first.
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        MetaValue::Display(Arc::new(value))
    }
}

impl fmt::Debug for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => f.write_str("Null"),
            MetaValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            MetaValue::Int(v) => f.debug_tuple("Int").field(v).finish(),
            MetaValue::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
            MetaValue::Float(v) => f.debug_tuple("Float").field(v).finish(),
            MetaValue::Text(v) => f.debug_tuple("Text").field(v).finish(),
            MetaValue::List(v) => f.debug_tuple("List").field(v).finish(),
            MetaValue::Map(v) => f.debug_tuple("Map").field(v).finish(),
            MetaValue::Timestamp(v) => f.debug_tuple("Timestamp").field(v).finish(),
            MetaValue::Date(v) => f.debug_tuple("Date").field(v).finish(),
            MetaValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            MetaValue::Display(v) => f.debug_tuple("Display").field(&v.to_string()).finish(),
        }
    }
}

/// Text rendering used by the encoder's fallback step.
impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => f.write_str("null"),
            MetaValue::Bool(v) => write!(f, "{v}"),
            MetaValue::Int(v) => write!(f, "{v}"),
            MetaValue::UInt(v) => write!(f, "{v}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Text(v) => f.write_str(v),
            MetaValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            MetaValue::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            MetaValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            MetaValue::Date(v) => write!(f, "{v}"),
            MetaValue::Json(v) => write!(f, "{v}"),
            MetaValue::Display(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<f32> for MetaValue {
    fn from(v: f32) -> Self {
        MetaValue::Float(f64::from(v))
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

macro_rules! meta_value_from_int {
    ($variant:ident, $target:ty; $($t:ty),*) => {
        $(impl From<$t> for MetaValue {
            fn from(v: $t) -> Self {
                MetaValue::$variant(<$target>::from(v))
            }
        })*
    };
}

meta_value_from_int!(Int, i64; i8, i16, i32, i64);
meta_value_from_int!(UInt, u64; u8, u16, u32, u64);

impl From<usize> for MetaValue {
    fn from(v: usize) -> Self {
        MetaValue::UInt(v as u64)
    }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(v: DateTime<Utc>) -> Self {
        MetaValue::Timestamp(v)
    }
}

impl From<NaiveDate> for MetaValue {
    fn from(v: NaiveDate) -> Self {
        MetaValue::Date(v)
    }
}

impl From<serde_json::Value> for MetaValue {
    fn from(v: serde_json::Value) -> Self {
        MetaValue::Json(v)
    }
}

impl<T: Into<MetaValue>> From<Vec<T>> for MetaValue {
    fn from(v: Vec<T>) -> Self {
        MetaValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(MetaValue::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<MetaValue>> FromIterator<(K, V)> for MetaValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MetaValue::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
