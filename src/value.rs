use std::fmt;
use std::sync::Arc;

use crate::error::Error;

/// A parameter supplied to [`prepare`](crate::EngineConfig::prepare).
///
/// Values are dynamically typed: the engine inspects their [`Category`] to decide
/// whether they are emitted bare, quoted and escaped, expanded as a list, or rejected.
///
/// # Examples
///
/// ```
/// use sqlx_prepare::{Category, Value};
///
/// assert_eq!(Value::from(18).category(), Category::Integer);
/// assert_eq!(Value::from("18").category(), Category::Integer);
/// assert_eq!(Value::from("007").category(), Category::String);
/// assert_eq!(Value::from(None::<i32>).category(), Category::Null);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Ordered key/value pairs, used for named placeholders.
    Map(Vec<(String, Value)>),
    /// Error handler trailing a `%type` placeholder's value.
    Handler(ErrorHandler),
}

/// Runtime category of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Sequence,
    Mapping,
    Handler,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Null => "null",
            Category::Bool => "boolean",
            Category::Integer => "integer",
            Category::Float => "float",
            Category::String => "string",
            Category::Sequence => "array",
            Category::Mapping => "map",
            Category::Handler => "callable",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Category::Integer | Category::Float)
    }

    pub fn is_scalar(self) -> bool {
        !matches!(
            self,
            Category::Sequence | Category::Mapping | Category::Handler
        )
    }
}

impl Value {
    /// Classifies the value.
    ///
    /// Strings only count as numeric when they are exactly the formatted form of
    /// their own float value, so `"18"` and `"1.5"` are numeric but `"007"`,
    /// `"1e3"`, `" 5"` and `"1.0"` stay strings.
    pub fn category(&self) -> Category {
        match self {
            Value::Null => Category::Null,
            Value::Bool(_) => Category::Bool,
            Value::Int(_) => Category::Integer,
            Value::Float(_) => Category::Float,
            Value::Str(s) if looks_numeric(s) => {
                if s.contains('.') {
                    Category::Float
                } else {
                    Category::Integer
                }
            }
            Value::Str(_) => Category::String,
            Value::List(_) => Category::Sequence,
            Value::Map(_) => Category::Mapping,
            Value::Handler(_) => Category::Handler,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        self.category().is_numeric()
    }

    /// Returns the value as a [`Number`] if it is numeric.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::Str(s) if looks_numeric(s) => Number::parse(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up `key` in a [`Value::Map`].
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Wraps a closure as a [`Value::Handler`].
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        Value::Handler(ErrorHandler(Arc::new(f)))
    }

    /// Converts the value into JSON for the `:json_encode` modifier family.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Handler(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// A callable supplied alongside a typed placeholder's value.
///
/// It is consumed by the placeholder it follows and invoked with the error if
/// that placeholder fails validation.
#[derive(Clone)]
pub struct ErrorHandler(Arc<dyn Fn(&Error) + Send + Sync>);

impl ErrorHandler {
    pub fn call(&self, error: &Error) {
        (self.0)(error)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHandler(..)")
    }
}

impl PartialEq for ErrorHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Integer or float, as resolved from a numeric [`Value`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Parses a decimal literal such as `10`, `-3`, `+2.5` or `.5`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix('+').unwrap_or(s);
        if s.is_empty() {
            return None;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Some(Number::Int(i));
        }
        let digits = s.strip_prefix('-').unwrap_or(s);
        if !digits.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
            return None;
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Some(Number::Float(f)),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_negative(self) -> bool {
        self.as_f64() < 0.0
    }

    /// Clamps between optional bounds, keeping the type of whichever side wins.
    pub fn clamp(self, min: Option<Number>, max: Option<Number>) -> Number {
        let mut out = self;
        if let Some(min) = min {
            if out.as_f64() < min.as_f64() {
                out = min;
            }
        }
        if let Some(max) = max {
            if out.as_f64() > max.as_f64() {
                out = max;
            }
        }
        out
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(v) => f.write_str(&format_float(*v)),
        }
    }
}

/// Formats a float the way numeric strings are compared against.
pub(crate) fn format_float(f: f64) -> String {
    format!("{f}")
}

/// True when `s` is exactly the formatted form of its own float value.
pub fn looks_numeric(s: &str) -> bool {
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => format_float(f) == s,
        _ => false,
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Str(v.to_string()),
        }
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<Value>> From<&[T]> for Value {
    fn from(v: &[T]) -> Self {
        Value::List(v.iter().cloned().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Builds a positional parameter list.
///
/// ```
/// use sqlx_prepare::{params, Value};
///
/// let p = params![18, "Alice", None::<i32>];
/// assert_eq!(p, vec![Value::Int(18), Value::from("Alice"), Value::Null]);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

/// Builds a [`Value::Map`] for named placeholders.
///
/// ```
/// use sqlx_prepare::{named, Value};
///
/// let m = named! { "id" => 5, "@dated" => "CURDATE()" };
/// assert_eq!(m.get("id"), Some(&Value::Int(5)));
/// ```
#[macro_export]
macro_rules! named {
    ($($key:expr => $value:expr),* $(,)?) => {
        $crate::Value::Map(::std::vec![
            $((::std::string::String::from($key), $crate::Value::from($value))),*
        ])
    };
}
