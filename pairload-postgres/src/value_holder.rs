use bytes::BytesMut;
use pairload_core::Value;
use postgres_types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{error::Error, io::Read};

/// Adapts a [`Value`] to the type postgres expects for the parameter or column.
#[derive(Debug)]
pub(crate) struct ValueHolder(pub(crate) Value);

impl From<Value> for ValueHolder {
    fn from(value: Value) -> Self {
        ValueHolder(value)
    }
}

fn mismatch(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    pairload_core::Error::msg(format!("Cannot write `{}` as a postgres {}", value, ty)).into()
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Self::from_sql_nullable(ty, Some(raw))
    }
    fn from_sql_null(ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Self::from_sql_nullable(ty, None)
    }
    fn from_sql_nullable(
        ty: &Type,
        raw: Option<&'a [u8]>,
    ) -> Result<Self, Box<dyn Error + Sync + Send>> {
        macro_rules! to_value {
            ($ty_var:ident, $raw:ident, $($($ty:path)|+ => ( $value:path, $source:ty ) ,)+) => {
                match *$ty_var {
                    $($($ty)|+ => $value(if let Some($raw) = $raw { Some(<$source>::from_sql($ty_var, $raw)?.into()) } else { None }),)+
                    _ => {
                        if let Some(mut raw) = $raw {
                            let mut buf = String::new();
                            let _ = raw.read_to_string(&mut buf);
                            return Err(pairload_core::Error::msg(format!("Cannot decode sql type: `{}`, value: `{}`", $ty_var, buf)).into());
                        }
                        Value::Null
                    }
                }
            };
        }
        let value = to_value!(ty, raw,
            Type::INT2 => (Value::Int64, i16),
            Type::INT4 => (Value::Int64, i32),
            Type::INT8 => (Value::Int64, i64),
            Type::OID => (Value::Int64, u32),
            Type::FLOAT4 => (Value::Float64, f32),
            Type::FLOAT8 => (Value::Float64, f64),
            Type::NUMERIC => (Value::Decimal, Decimal),
            Type::VARCHAR | Type::TEXT | Type::NAME | Type::BPCHAR => (Value::Varchar, String),
        );
        Ok(value.into())
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>>
    where
        Self: Sized,
    {
        let value = &self.0;
        if value.is_null() {
            return Ok(IsNull::Yes);
        }
        match (value, ty) {
            (Value::Int64(Some(v)), &Type::INT2) => i16::try_from(*v)?.to_sql(ty, out),
            (Value::Int64(Some(v)), &Type::INT4) => i32::try_from(*v)?.to_sql(ty, out),
            (Value::Int64(Some(v)), &Type::INT8) => v.to_sql(ty, out),
            (Value::Int64(Some(v)), &Type::NUMERIC) => Decimal::from(*v).to_sql(ty, out),
            (Value::Int64(Some(v)), &Type::FLOAT8) => (*v as f64).to_sql(ty, out),
            (Value::Float64(Some(v)), &Type::FLOAT4) => (*v as f32).to_sql(ty, out),
            (Value::Float64(Some(v)), &Type::FLOAT8) => v.to_sql(ty, out),
            (Value::Float64(Some(v)), &Type::NUMERIC) => Decimal::from_f64(*v)
                .ok_or_else(|| mismatch(value, ty))?
                .to_sql(ty, out),
            (Value::Decimal(Some(v)), &Type::NUMERIC) => v.to_sql(ty, out),
            (Value::Decimal(Some(v)), &Type::FLOAT8) => v
                .to_f64()
                .ok_or_else(|| mismatch(value, ty))?
                .to_sql(ty, out),
            (Value::Varchar(Some(v)), _) => v.to_sql(ty, out),
            (Value::Int64(Some(v)), &Type::TEXT | &Type::VARCHAR) => {
                v.to_string().to_sql(ty, out)
            }
            (Value::Decimal(Some(v)), &Type::TEXT | &Type::VARCHAR) => {
                v.to_string().to_sql(ty, out)
            }
            _ => Err(mismatch(value, ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn encode(value: Value, ty: &Type) -> Result<BytesMut, Box<dyn Error + Sync + Send>> {
        let mut out = BytesMut::new();
        ValueHolder(value).to_sql(ty, &mut out)?;
        Ok(out)
    }

    #[test]
    fn narrow_integers() {
        let out = encode(Value::Int64(Some(150)), &Type::INT4).expect("Failed to encode");
        assert_eq!(&out[..], 150i32.to_be_bytes());
        assert!(encode(Value::Int64(Some(i64::MAX)), &Type::INT4).is_err());
    }

    #[test]
    fn decimals_and_nulls() {
        let out = encode(Value::Decimal(Some(dec!(33.33))), &Type::NUMERIC)
            .expect("Failed to encode");
        let decoded = ValueHolder::from_sql(&Type::NUMERIC, &out).expect("Failed to decode");
        assert_eq!(decoded.0, Value::Decimal(Some(dec!(33.33))));
        let mut out = BytesMut::new();
        assert!(matches!(
            ValueHolder(Value::Varchar(None)).to_sql(&Type::TEXT, &mut out),
            Ok(IsNull::Yes)
        ));
        let null = ValueHolder::from_sql_null(&Type::INT8).expect("Failed to decode");
        assert_eq!(null.0, Value::Int64(None));
    }

    #[test]
    fn unsupported() {
        assert!(encode(Value::Decimal(Some(dec!(1))), &Type::BOOL).is_err());
    }
}
