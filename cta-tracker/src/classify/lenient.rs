//! Tolerant building blocks for tracker payloads.
//!
//! The trackers were designed around XML. Converted to JSON, a repeated element
//! that happens to occur once arrives as a bare value instead of a list, empty
//! elements arrive as `""` or `null`, and numbers arrive as strings (or not).
//! [`Many`] and [`Scalar`] absorb those differences so the DTOs can stay plain.

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::parse_timestamp;

/// Normalize a possibly-repeated value to a list.
///
/// `null`, blank strings, empty objects and empty lists give nothing, a single
/// value gives itself, and lists are flattened with nulls dropped.
pub fn repeated(value: &Value) -> Vec<&Value> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::Object(map) if map.is_empty() => Vec::new(),
        Value::Array(items) => items.iter().flat_map(repeated).collect(),
        other => vec![other],
    }
}

/// A repeatable element, normalized with [`repeated`].
///
/// Use with `#[serde(default)]` so an absent field is empty too.
#[derive(Debug, Clone, PartialEq)]
pub struct Many<T>(pub Vec<T>);

impl<T> Default for Many<T> {
    fn default() -> Self {
        Many(Vec::new())
    }
}

impl<T> Many<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&T> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> IntoIterator for Many<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Many<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Many<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        repeated(&value)
            .into_iter()
            .map(|v| T::deserialize(v).map_err(D::Error::custom))
            .collect::<Result<Vec<_>, _>>()
            .map(Many)
    }
}

/// A leaf value of whatever JSON type the tracker chose.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Cdata {
        #[serde(rename = "#cdata-section")]
        cdata: String,
    },
    Text {
        #[serde(rename = "#text")]
        text: String,
    },
    /// A list, as the alerts API sometimes sends: first non-empty wins.
    List(Vec<Scalar>),
    /// Any other shape; carries no text.
    Other(Value),
}

impl Scalar {
    /// Trimmed text, `None` when blank.
    pub fn text(&self) -> Option<String> {
        let s = match self {
            Scalar::Str(s) | Scalar::Cdata { cdata: s } | Scalar::Text { text: s } => {
                s.trim().to_string()
            }
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::List(items) => return items.iter().find_map(Scalar::text),
            Scalar::Other(_) => return None,
        };
        (!s.is_empty()).then_some(s)
    }

    pub fn parse<T: FromStr>(&self) -> Option<T> {
        match self {
            Scalar::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64).parse().ok(),
            _ => self.text()?.parse().ok(),
        }
    }

    /// "1", "true" and `true` are set; anything else is not.
    pub fn flag(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i == 1,
            _ => matches!(
                self.text().map(|s| s.to_ascii_lowercase()).as_deref(),
                Some("1") | Some("true")
            ),
        }
    }
}

/// Accessors over optional scalar fields.
pub trait ScalarField {
    fn text(&self) -> Option<String>;
    fn parse<T: FromStr>(&self) -> Option<T>;
    fn flag(&self) -> bool;
    fn timestamp(&self) -> Option<NaiveDateTime>;
}

impl ScalarField for Option<Scalar> {
    fn text(&self) -> Option<String> {
        self.as_ref().and_then(Scalar::text)
    }

    fn parse<T: FromStr>(&self) -> Option<T> {
        self.as_ref().and_then(Scalar::parse)
    }

    fn flag(&self) -> bool {
        self.as_ref().is_some_and(Scalar::flag)
    }

    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.text().and_then(|s| parse_timestamp(&s).ok())
    }
}
