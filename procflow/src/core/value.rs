//! Dynamically typed argument and result values.

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Semantic type hint for values and parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// A string, file path included.
    Str,
    /// A signed integer.
    Int,
    /// A floating point number.
    Double,
    /// A raster image.
    Image,
    /// A list of values.
    Array,
    /// A boolean flag.
    Bool,
    /// A string restricted to a list of choices.
    Enum,
    /// No value.
    #[default]
    None,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => write!(f, "str"),
            Self::Int => write!(f, "int"),
            Self::Double => write!(f, "double"),
            Self::Image => write!(f, "image"),
            Self::Array => write!(f, "array"),
            Self::Bool => write!(f, "bool"),
            Self::Enum => write!(f, "enum"),
            Self::None => write!(f, "none"),
        }
    }
}

impl ValueKind {
    /// Returns true if a value of this kind may be passed where `self` is declared.
    ///
    /// `None` is admitted everywhere; integers widen to doubles and enums
    /// are carried as strings.
    #[must_use]
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value.kind()) {
            (_, Self::None) | (Self::None, _) => true,
            (Self::Double, Self::Int) | (Self::Enum, Self::Str) => true,
            (declared, actual) => *declared == actual,
        }
    }
}

/// A concrete value passed to or returned from an operation.
///
/// `Value::None` doubles as the unset sentinel: a parameter with nothing to
/// resolve to yields it, and the operation decides whether that is
/// acceptable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value.
    #[default]
    None,
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Double(f64),
    /// A string.
    Str(String),
    /// A list of values.
    Array(Vec<Value>),
    /// A shared raster image.
    Image(Arc<DynamicImage>),
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::Str(_) => ValueKind::Str,
            Self::Array(_) => ValueKind::Array,
            Self::Image(_) => ValueKind::Image,
        }
    }

    /// Returns true for the unset sentinel.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the array items, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns the image, if this is one.
    #[must_use]
    pub fn as_image(&self) -> Option<&Arc<DynamicImage>> {
        match self {
            Self::Image(img) => Some(img),
            _ => None,
        }
    }

    /// Converts to a JSON summary suitable for events and presentation views.
    ///
    /// Images are summarised by their dimensions and color type rather than
    /// their pixels.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::None => serde_json::Value::Null,
            Self::Bool(b) => serde_json::json!(b),
            Self::Int(i) => serde_json::json!(i),
            Self::Double(d) => serde_json::json!(d),
            Self::Str(s) => serde_json::json!(s),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Image(img) => {
                let (width, height) = img.dimensions();
                serde_json::json!({
                    "image": {
                        "width": width,
                        "height": height,
                        "color": format!("{:?}", img.color()),
                    }
                })
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Image(img) => write!(f, "<image {}x{}>", img.width(), img.height()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<DynamicImage> for Value {
    fn from(value: DynamicImage) -> Self {
        Self::Image(Arc::new(value))
    }
}

impl From<Arc<DynamicImage>> for Value {
    fn from(value: Arc<DynamicImage>) -> Self {
        Self::Image(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}
