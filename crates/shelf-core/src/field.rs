//! Field schema: one directory level per field.
//!
//! A [`FieldSpec`] names one level of the record hierarchy and says how to
//! obtain a value when the caller leaves it out: a fixed default, a
//! generator evaluated at resolution time, or nothing (the field is
//! required).

use std::{fmt, sync::Arc};

use chrono::Local;

use crate::layout::{SegmentProblem, check_segment};

/// Format used by [`FieldSpec::date`] unless another one is given.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used by [`FieldSpec::timestamp`]. Contains no path separators.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A typed value for one field of the addressing key.
///
/// Every variant renders to text; that text becomes the directory name.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// Boolean, rendered as `true` / `false`.
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::UInt(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl FieldValue {
    /// Render the value as a single path segment.
    pub fn to_segment(&self) -> Result<String, SegmentProblem> {
        let text = self.to_string();
        check_segment(&text)?;
        Ok(text)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(f64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

macro_rules! field_value_from_int {
    ($variant:ident, $target:ty; $($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::$variant(<$target>::from(v))
            }
        })*
    };
}

field_value_from_int!(Int, i64; i8, i16, i32, i64);
field_value_from_int!(UInt, u64; u8, u16, u32, u64);

/// Zero-argument value generator, invoked each time a field is resolved.
pub type Generator = Arc<dyn Fn() -> FieldValue + Send + Sync>;

/// How a field obtains its value when the caller does not supply one.
#[derive(Clone, Default)]
pub enum DefaultRule {
    /// No default: the caller must supply a value.
    #[default]
    Required,
    /// A fixed value.
    Fixed(FieldValue),
    /// A generator evaluated at resolution time.
    Generated(Generator),
}

impl fmt::Debug for DefaultRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultRule::Required => f.write_str("Required"),
            DefaultRule::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            DefaultRule::Generated(_) => f.write_str("Generated(<fn>)"),
        }
    }
}

/// One level of the record directory hierarchy.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    rule: DefaultRule,
}

impl FieldSpec {
    /// A field with no default.
    pub fn required(name: impl Into<String>) -> Self {
        FieldSpec {
            name: name.into(),
            rule: DefaultRule::Required,
        }
    }

    /// A field falling back to `default`.
    pub fn with_default(name: impl Into<String>, default: impl Into<FieldValue>) -> Self {
        FieldSpec {
            name: name.into(),
            rule: DefaultRule::Fixed(default.into()),
        }
    }

    /// A field falling back to whatever `generator` returns at resolution
    /// time.
    pub fn generated<F, V>(name: impl Into<String>, generator: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<FieldValue>,
    {
        let generator: Generator = Arc::new(move || -> FieldValue { generator().into() });
        FieldSpec {
            name: name.into(),
            rule: DefaultRule::Generated(generator),
        }
    }

    /// A field defaulting to today's local date in `format`.
    pub fn date(name: impl Into<String>, format: Option<&str>) -> Self {
        let format = format.unwrap_or(DEFAULT_DATE_FORMAT).to_string();
        Self::generated(name, move || Local::now().format(&format).to_string())
    }

    /// A field defaulting to the current local time, formatted with
    /// [`TIMESTAMP_FORMAT`].
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::generated(name, || Local::now().format(TIMESTAMP_FORMAT).to_string())
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default rule.
    pub fn rule(&self) -> &DefaultRule {
        &self.rule
    }

    /// Caller-supplied values win; otherwise the generator, then the fixed
    /// default. `None` means the field is required and nothing was given.
    pub fn resolve(&self, provided: Option<FieldValue>) -> Option<FieldValue> {
        if provided.is_some() {
            return provided;
        }
        match &self.rule {
            DefaultRule::Required => None,
            DefaultRule::Fixed(v) => Some(v.clone()),
            DefaultRule::Generated(g) => Some(g()),
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        FieldSpec::required(name)
    }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self {
        FieldSpec::required(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn provided_value_wins_over_every_rule() {
        let fixed = FieldSpec::with_default("b", "B");
        let generated = FieldSpec::generated("c", || "dummy");

        assert_eq!(fixed.resolve(Some("x".into())), Some("x".into()));
        assert_eq!(generated.resolve(Some(7i64.into())), Some(FieldValue::Int(7)));
    }

    #[test]
    fn required_without_value_resolves_to_none() {
        assert_eq!(FieldSpec::required("a").resolve(None), None);
    }

    #[test]
    fn constructors_pick_the_matching_rule() {
        assert!(matches!(FieldSpec::from("a").rule(), DefaultRule::Required));
        assert!(matches!(
            FieldSpec::with_default("b", 2i64).rule(),
            DefaultRule::Fixed(FieldValue::Int(2))
        ));
        assert!(matches!(
            FieldSpec::date("day", Some("%Y%m%d")).rule(),
            DefaultRule::Generated(_)
        ));
    }

    #[test]
    fn fixed_default_is_used_when_missing() {
        let spec = FieldSpec::with_default("b", "B");
        assert_eq!(spec.resolve(None), Some(FieldValue::Text("B".into())));
    }

    #[test]
    fn generator_runs_on_every_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let spec = FieldSpec::generated("n", move || {
            counter.fetch_add(1, Ordering::SeqCst) as u64
        });

        assert_eq!(spec.resolve(None), Some(FieldValue::UInt(0)));
        assert_eq!(spec.resolve(None), Some(FieldValue::UInt(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn date_and_timestamp_fields_render_as_single_segments() {
        let date = FieldSpec::date("day", None).resolve(None).expect("generated");
        let ts = FieldSpec::timestamp("ts").resolve(None).expect("generated");

        let date = date.to_segment().expect("valid segment");
        assert_eq!(date.len(), "2024-01-01".len());
        assert!(ts.to_segment().is_ok());
    }

    #[test]
    fn values_render_to_text() {
        assert_eq!(FieldValue::from(42u8).to_string(), "42");
        assert_eq!(FieldValue::from(-3i32).to_string(), "-3");
        assert_eq!(FieldValue::from(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::from(true).to_string(), "true");
    }

    #[test]
    fn separator_in_value_is_not_a_segment() {
        let err = FieldValue::from("a/b").to_segment().expect_err("separator");
        assert_eq!(err, SegmentProblem::Separator);
    }
}
