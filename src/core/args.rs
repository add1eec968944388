//! Event argument vectors.
//!
//! Every fired event carries an ordered, heterogeneous list of values.
//! Guards inspect it, actions and entry/behavior callbacks receive it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single dynamically typed event argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Variant {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Variant>),
    Map(BTreeMap<String, Variant>),
}

/// Argument vector passed along with an event.
pub type Args = Vec<Variant>;

impl Variant {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view; unsigned values that fit are converted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(u) => Some(*u),
            Self::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Variant]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Variant>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Name of the carried type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<()> for Variant {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! variant_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Variant {
            fn from(value: $ty) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! variant_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Variant {
            fn from(value: $ty) -> Self {
                Self::UInt(u64::from(value))
            }
        })*
    };
}

variant_from_signed!(i8, i16, i32, i64);
variant_from_unsigned!(u8, u16, u32, u64);

impl From<f32> for Variant {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Variant {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<Variant>> for Variant {
    fn from(value: Vec<Variant>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, Variant>> for Variant {
    fn from(value: BTreeMap<String, Variant>) -> Self {
        Self::Map(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_matching_variant() {
        assert_eq!(Variant::from(3i32), Variant::Int(3));
        assert_eq!(Variant::from(3u8), Variant::UInt(3));
        assert_eq!(Variant::from(true), Variant::Bool(true));
        assert_eq!(Variant::from("x"), Variant::String("x".to_string()));
        assert_eq!(Variant::from(()), Variant::Unit);
    }

    #[test]
    fn integer_views_cross_signedness_when_lossless() {
        assert_eq!(Variant::UInt(7).as_i64(), Some(7));
        assert_eq!(Variant::Int(-1).as_u64(), None);
        assert_eq!(Variant::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Variant::String("7".into()).as_i64(), None);
    }

    #[test]
    fn display_renders_nested_values() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Variant::Bool(false));
        let value = Variant::List(vec![Variant::Int(1), Variant::from("a"), Variant::Map(map)]);
        assert_eq!(value.to_string(), "[1, \"a\", {k: false}]");
    }

    #[test]
    fn type_names_are_stable() {
        assert_eq!(Variant::Unit.type_name(), "unit");
        assert_eq!(Variant::Bytes(vec![1]).type_name(), "bytes");
    }
}
