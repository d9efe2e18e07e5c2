use crate::{Error, Result};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{any, fmt, str::FromStr};

/// Dynamically typed value used for query parameters and decoded columns.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Int64(Option<i64>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Int64(None)
                | Value::Float64(None)
                | Value::Decimal(None)
                | Value::Varchar(None)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int64(Some(v)) => v.fmt(f),
            Value::Float64(Some(v)) => v.fmt(f),
            Value::Decimal(Some(v)) => v.fmt(f),
            Value::Varchar(Some(v)) => write!(f, "'{}'", v),
            _ => f.write_str("NULL"),
        }
    }
}

/// Conversion between native Rust types and [`Value`].
///
/// `try_from_value` is lenient in the direction drivers need: a backend that
/// hands back an integer column as text, or a decimal as a float, still
/// decodes as long as the conversion is exact.
pub trait AsValue {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

fn conversion_error<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert `{}` into {}",
        value,
        any::type_name::<T>()
    ))
}

impl AsValue for Value {
    fn as_value(self) -> Value {
        self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl AsValue for i64 {
    fn as_value(self) -> Value {
        Value::Int64(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Int64(Some(v)) => Ok(*v),
            Value::Decimal(Some(v)) if v.fract().is_zero() => {
                v.to_i64().ok_or_else(|| conversion_error::<Self>(&value))
            }
            Value::Varchar(Some(v)) => v
                .trim()
                .parse()
                .map_err(|_| conversion_error::<Self>(&value)),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for u64 {
    fn as_value(self) -> Value {
        match i64::try_from(self) {
            Ok(v) => Value::Int64(Some(v)),
            Err(..) => Value::Decimal(Decimal::from_u64(self)),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let error = conversion_error::<Self>(&value);
        i64::try_from_value(value)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or(error)
    }
}

impl AsValue for u32 {
    fn as_value(self) -> Value {
        Value::Int64(Some(self.into()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let error = conversion_error::<Self>(&value);
        i64::try_from_value(value)
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(error)
    }
}

impl AsValue for Decimal {
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Decimal(Some(v)) => Ok(*v),
            Value::Int64(Some(v)) => Ok(Decimal::from(*v)),
            // Floats only come back from backends without a decimal type, round
            // trips of currency values are exact at this scale
            Value::Float64(Some(v)) => {
                Decimal::from_f64(*v).ok_or_else(|| conversion_error::<Self>(&value))
            }
            Value::Varchar(Some(v)) => {
                Decimal::from_str(v.trim()).map_err(|_| conversion_error::<Self>(&value))
            }
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            value => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl AsValue for &str {
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.to_owned()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Err(conversion_error::<Self>(&value))
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
}
