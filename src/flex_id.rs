use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identifier as Xtream panels actually send it: number, string or null.
///
/// Panels disagree on `stream_id` and `category_id` types, sometimes within
/// one response, so numeric strings are normalized to `Number`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FlexId {
    Number(i64),
    String(String),
    #[default]
    Null,
}

impl FlexId {
    pub fn is_null(&self) -> bool {
        matches!(self, FlexId::Null)
    }
}

impl From<i64> for FlexId {
    fn from(n: i64) -> Self {
        FlexId::Number(n)
    }
}

impl From<&str> for FlexId {
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) => FlexId::Number(n),
            Err(_) => FlexId::String(s.to_string()),
        }
    }
}

impl fmt::Display for FlexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlexId::Number(n) => write!(f, "{}", n),
            FlexId::String(s) => write!(f, "{}", s),
            FlexId::Null => write!(f, "null"),
        }
    }
}

impl Serialize for FlexId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FlexId::Number(n) => serializer.serialize_i64(*n),
            FlexId::String(s) => serializer.serialize_str(s),
            FlexId::Null => serializer.serialize_none(),
        }
    }
}

struct FlexIdVisitor;

impl<'de> Visitor<'de> for FlexIdVisitor {
    type Value = FlexId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number, string, or null")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FlexId, E> {
        Ok(FlexId::Number(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FlexId, E> {
        match i64::try_from(v) {
            Ok(n) => Ok(FlexId::Number(n)),
            Err(_) => Ok(FlexId::String(v.to_string())),
        }
    }

    // Some panels send ids as 1234.0
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FlexId, E> {
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            Ok(FlexId::Number(v as i64))
        } else {
            Ok(FlexId::String(v.to_string()))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FlexId, E> {
        Ok(FlexId::from(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<FlexId, E> {
        Ok(FlexId::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<FlexId, E> {
        Ok(FlexId::Null)
    }
}

impl<'de> Deserialize<'de> for FlexId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FlexIdVisitor)
    }
}
