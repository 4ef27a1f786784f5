//! Metadata documents and their JSON normalization.
//!
//! A record's metadata document is a flat JSON object. Values arrive as
//! [`MetaValue`]s and are normalized by a [`MetadataEncoder`]: an ordered list
//! of [`Normalize`] steps, each of which may claim a value and turn it into
//! JSON. The first step that returns `Some` wins. A value no step claims is
//! stored as its text rendering.
//!
//! The default chain:
//!
//! | step        | handles                                                     |
//! |-------------|-------------------------------------------------------------|
//! | primitives  | null, booleans, text, pre-encoded JSON                      |
//! | integers    | signed / unsigned integers → JSON integers                  |
//! | floats      | finite → JSON number, NaN → `null`, ±inf → unclaimed (text) |
//! | sequences   | lists → arrays, each element re-encoded through the chain  |
//! | mappings    | maps → objects, each value re-encoded through the chain    |
//!
//! Timestamps, dates and [`MetaValue::Display`] values fall through to the
//! text rendering unless a caller prepends a step for them.

mod value;

use std::{fmt, sync::Arc};

use serde_json::{Map, Number, Value};

pub use value::{Attributes, MetaValue};

/// A serialized metadata document.
pub type MetadataDocument = Map<String, Value>;

/// One step of the normalization chain.
///
/// Returning `None` passes the value on to the next step. `encoder` is the
/// full chain, for steps that need to encode nested values.
pub trait Normalize: Send + Sync {
    /// Try to render `value` as JSON.
    fn normalize(&self, value: &MetaValue, encoder: &MetadataEncoder) -> Option<Value>;
}

impl<F> Normalize for F
where
    F: Fn(&MetaValue, &MetadataEncoder) -> Option<Value> + Send + Sync,
{
    fn normalize(&self, value: &MetaValue, encoder: &MetadataEncoder) -> Option<Value> {
        self(value, encoder)
    }
}

/// Null, booleans, text and pre-encoded JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Primitives;

impl Normalize for Primitives {
    fn normalize(&self, value: &MetaValue, _: &MetadataEncoder) -> Option<Value> {
        match value {
            MetaValue::Null => Some(Value::Null),
            MetaValue::Bool(b) => Some(Value::Bool(*b)),
            MetaValue::Text(s) => Some(Value::String(s.clone())),
            MetaValue::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Integers of every width become plain JSON integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integers;

impl Normalize for Integers {
    fn normalize(&self, value: &MetaValue, _: &MetadataEncoder) -> Option<Value> {
        match value {
            MetaValue::Int(v) => Some(Value::Number(Number::from(*v))),
            MetaValue::UInt(v) => Some(Value::Number(Number::from(*v))),
            _ => None,
        }
    }
}

/// Finite floats become JSON numbers and NaN becomes `null`.
///
/// Infinities have no JSON form and are left for the text fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct Floats;

impl Normalize for Floats {
    fn normalize(&self, value: &MetaValue, _: &MetadataEncoder) -> Option<Value> {
        match value {
            MetaValue::Float(v) if v.is_nan() => Some(Value::Null),
            MetaValue::Float(v) => Number::from_f64(*v).map(Value::Number),
            _ => None,
        }
    }
}

/// Lists become arrays; nested lists become nested arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequences;

impl Normalize for Sequences {
    fn normalize(&self, value: &MetaValue, encoder: &MetadataEncoder) -> Option<Value> {
        match value {
            MetaValue::List(items) => Some(Value::Array(
                items.iter().map(|item| encoder.encode(item)).collect(),
            )),
            _ => None,
        }
    }
}

/// Maps become JSON objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mappings;

impl Normalize for Mappings {
    fn normalize(&self, value: &MetaValue, encoder: &MetadataEncoder) -> Option<Value> {
        match value {
            MetaValue::Map(entries) => Some(Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), encoder.encode(v)))
                    .collect(),
            )),
            _ => None,
        }
    }
}

/// Ordered chain of normalization steps with a text fallback.
#[derive(Clone)]
pub struct MetadataEncoder {
    steps: Vec<Arc<dyn Normalize>>,
}

impl fmt::Debug for MetadataEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataEncoder")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl Default for MetadataEncoder {
    fn default() -> Self {
        MetadataEncoder {
            steps: vec![
                Arc::new(Primitives),
                Arc::new(Integers),
                Arc::new(Floats),
                Arc::new(Sequences),
                Arc::new(Mappings),
            ],
        }
    }
}

impl MetadataEncoder {
    /// An encoder with no steps: every value is stored as text.
    pub fn empty() -> Self {
        MetadataEncoder { steps: Vec::new() }
    }

    /// Run `step` before all existing steps.
    pub fn prepend(mut self, step: impl Normalize + 'static) -> Self {
        self.steps.insert(0, Arc::new(step));
        self
    }

    /// Run `step` after all existing steps (but before the text fallback).
    pub fn append(mut self, step: impl Normalize + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Encode a single value.
    pub fn encode(&self, value: &MetaValue) -> Value {
        self.steps
            .iter()
            .find_map(|step| step.normalize(value, self))
            .unwrap_or_else(|| Value::String(value.to_string()))
    }

    /// Encode a whole attribute map into a metadata document.
    pub fn encode_document(&self, attributes: &Attributes) -> MetadataDocument {
        attributes
            .iter()
            .map(|(k, v)| (k.clone(), self.encode(v)))
            .collect()
    }
}
