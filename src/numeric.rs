//! Numeric coercion of heterogeneous input
//!
//! Records pulled from loosely typed sources (CSV columns, JSON fields) are
//! represented as [`Datum`]. [`to_numeric`] turns a datum into a number the
//! accumulators can consume: numbers pass through, numeric-looking strings are
//! parsed, and any other string contributes its character length.

use crate::error::{Result, StatsError};

/// A dynamically typed input value
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Datum>),
}

impl Datum {
    fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Int(_) => "int",
            Datum::Float(_) => "float",
            Datum::Text(_) => "str",
            Datum::List(_) => "list",
        }
    }
}

macro_rules! datum_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Datum {
            fn from(value: $t) -> Self {
                Datum::Int(value as i64)
            }
        })*
    };
}

datum_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Datum {
    fn from(value: f32) -> Self {
        Datum::Float(value as f64)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Float(value)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Text(value.to_owned())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Text(value)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(value: Option<T>) -> Self {
        value.map_or(Datum::Null, Into::into)
    }
}

impl<T: Into<Datum>> From<Vec<T>> for Datum {
    fn from(value: Vec<T>) -> Self {
        Datum::List(value.into_iter().map(Into::into).collect())
    }
}

/// A coerced numeric value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// Coerce a datum into a number.
///
/// Returns `Ok(None)` for `Datum::Null`. Strings are parsed as an integer,
/// then as a float, and otherwise replaced by their length in characters.
///
/// # Errors
///
/// [`StatsError::InvalidInputType`] for booleans and lists.
///
/// # Example
///
/// ```
/// use opstats::numeric::{to_numeric, Datum, Number};
///
/// assert_eq!(to_numeric(&"42".into()).unwrap(), Some(Number::Int(42)));
/// assert_eq!(to_numeric(&"abc".into()).unwrap(), Some(Number::Int(3)));
/// assert_eq!(to_numeric(&Datum::Null).unwrap(), None);
/// ```
pub fn to_numeric(value: &Datum) -> Result<Option<Number>> {
    match value {
        Datum::Null => Ok(None),
        Datum::Int(i) => Ok(Some(Number::Int(*i))),
        Datum::Float(f) => Ok(Some(Number::Float(*f))),
        Datum::Text(s) => Ok(Some(parse_text(s))),
        other => Err(StatsError::InvalidInputType(other.type_name())),
    }
}

fn parse_text(s: &str) -> Number {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Number::Int(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) => Number::Float(f),
        Err(_) => Number::Int(s.chars().count() as i64),
    }
}
