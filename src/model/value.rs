//! Generated field values.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Fixed-point decimal: `mantissa / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i64,
    scale: u32,
}

impl Decimal {
    /// Largest scale kept exactly by an `i64` mantissa with useful headroom.
    pub const MAX_SCALE: u32 = 9;

    pub fn new(mantissa: i64, scale: u32) -> Self {
        Self {
            mantissa,
            scale: scale.min(Self::MAX_SCALE),
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Converts an integer without loss, rendered with `scale` places.
    pub fn from_int(value: i64, scale: u32) -> Self {
        let scale = scale.min(Self::MAX_SCALE);
        Self {
            mantissa: value.saturating_mul(10_i64.pow(scale)),
            scale,
        }
    }

    /// Rounds a float half away from zero to `scale` places.
    pub fn from_f64(value: f64, scale: u32) -> Self {
        let scale = scale.min(Self::MAX_SCALE);
        let factor = 10_f64.powi(scale as i32);
        Self {
            mantissa: (value * factor).round() as i64,
            scale,
        }
    }

    pub fn mantissa(&self) -> i64 {
        self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10_f64.powi(self.scale as i32)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let divisor = 10_u64.pow(self.scale);
        let magnitude = self.mantissa.unsigned_abs();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / divisor,
            magnitude % divisor,
            width = self.scale as usize
        )
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

/// The value of one field of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Field intentionally left empty.
    Blank,
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Text(String),
    Uuid(Uuid),
}

impl FieldValue {
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Blank)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt(value) => Some(*value),
            FieldValue::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Blank => Ok(()),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::UInt(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Timestamp(v) => {
                write!(f, "{}", v.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Uuid(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Blank => serializer.serialize_none(),
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::UInt(v) => serializer.serialize_u64(*v),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Decimal(v) => v.serialize(serializer),
            FieldValue::Bool(v) => serializer.serialize_bool(*v),
            FieldValue::Timestamp(_) | FieldValue::Uuid(_) => {
                serializer.collect_str(self)
            }
            FieldValue::Text(v) => serializer.serialize_str(v),
        }
    }
}
