//! PrimitiveType and LogicalType: tagged variants over inheritance (Design
//! Note), each carrying its own encode/decode behaviour instead of a class
//! hierarchy. `LogicalType` additionally carries `to_primitive`/
//! `from_primitive`, the conversions spec.md §3 requires.

use crate::error::{ParquetCoreError, Result};
use crate::value::Value;

/// The fixed set of Parquet physical types (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray,
}

impl PrimitiveType {
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "BOOLEAN" => PrimitiveType::Boolean,
            "INT32" => PrimitiveType::Int32,
            "INT64" => PrimitiveType::Int64,
            "INT96" => PrimitiveType::Int96,
            "FLOAT" => PrimitiveType::Float,
            "DOUBLE" => PrimitiveType::Double,
            "BYTE_ARRAY" => PrimitiveType::ByteArray,
            "FIXED_LEN_BYTE_ARRAY" => PrimitiveType::FixedLenByteArray,
            other => {
                return Err(ParquetCoreError::config(format!(
                    "unknown primitive type '{other}'"
                )))
            }
        })
    }

    /// The thrift `Type` enum's wire value.
    pub fn thrift_id(&self) -> i32 {
        match self {
            PrimitiveType::Boolean => 0,
            PrimitiveType::Int32 => 1,
            PrimitiveType::Int64 => 2,
            PrimitiveType::Int96 => 3,
            PrimitiveType::Float => 4,
            PrimitiveType::Double => 5,
            PrimitiveType::ByteArray => 6,
            PrimitiveType::FixedLenByteArray => 7,
        }
    }

    pub fn from_thrift_id(id: i32) -> Result<Self> {
        Ok(match id {
            0 => PrimitiveType::Boolean,
            1 => PrimitiveType::Int32,
            2 => PrimitiveType::Int64,
            3 => PrimitiveType::Int96,
            4 => PrimitiveType::Float,
            5 => PrimitiveType::Double,
            6 => PrimitiveType::ByteArray,
            7 => PrimitiveType::FixedLenByteArray,
            other => return Err(ParquetCoreError::format(format!("unknown Type id {other}"))),
        })
    }

    /// Fixed PLAIN width in bytes, when the type has one (BYTE_ARRAY and
    /// FIXED_LEN_BYTE_ARRAY are variable/declared-length respectively).
    pub fn fixed_plain_width(&self) -> Option<usize> {
        match self {
            PrimitiveType::Boolean => None, // bit-packed
            PrimitiveType::Int32 => Some(4),
            PrimitiveType::Int64 => Some(8),
            PrimitiveType::Int96 => Some(12),
            PrimitiveType::Float => Some(4),
            PrimitiveType::Double => Some(8),
            PrimitiveType::ByteArray => None,
            PrimitiveType::FixedLenByteArray => None,
        }
    }
}

/// The logical (converted) types spec.md §3 names. Represented with Thrift's
/// legacy `ConvertedType` wire encoding (see DESIGN.md for why this crate
/// does not hand-roll the newer `LogicalType` union).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Utf8,
    Date,
    TimestampMicros,
    TimestampMillis,
    Interval,
    Bson,
    Json,
    Decimal { precision: u32, scale: i32 },
}

impl LogicalType {
    pub fn from_name(name: &str, precision: Option<u32>, scale: Option<i32>) -> Result<Self> {
        Ok(match name {
            "UTF8" => LogicalType::Utf8,
            "DATE" => LogicalType::Date,
            "TIMESTAMP_MICROS" => LogicalType::TimestampMicros,
            "TIMESTAMP_MILLIS" => LogicalType::TimestampMillis,
            "INTERVAL" => LogicalType::Interval,
            "BSON" => LogicalType::Bson,
            "JSON" => LogicalType::Json,
            "DECIMAL" => {
                let precision = precision.ok_or_else(|| {
                    ParquetCoreError::config("DECIMAL logical type requires 'precision'")
                })?;
                let scale = scale.unwrap_or(0);
                if precision == 0 || precision > 38 {
                    return Err(ParquetCoreError::config(format!(
                        "DECIMAL precision {precision} is out of supported range (1..=38)"
                    )));
                }
                if scale < 0 || scale as i64 > precision as i64 {
                    return Err(ParquetCoreError::config(format!(
                        "DECIMAL scale {scale} is out of range for precision {precision}"
                    )));
                }
                LogicalType::Decimal { precision, scale }
            }
            other => {
                return Err(ParquetCoreError::config(format!(
                    "unknown logical type '{other}'"
                )))
            }
        })
    }

    /// The physical type this logical type is backed by.
    pub fn backing_primitive(&self) -> PrimitiveType {
        match self {
            LogicalType::Utf8 | LogicalType::Bson | LogicalType::Json => PrimitiveType::ByteArray,
            LogicalType::Date => PrimitiveType::Int32,
            LogicalType::TimestampMicros => PrimitiveType::Int64,
            LogicalType::TimestampMillis => PrimitiveType::Int64,
            LogicalType::Interval => PrimitiveType::FixedLenByteArray,
            LogicalType::Decimal { precision, .. } => {
                if *precision <= 9 {
                    PrimitiveType::Int32
                } else if *precision <= 18 {
                    PrimitiveType::Int64
                } else {
                    PrimitiveType::FixedLenByteArray
                }
            }
        }
    }

    /// Declared `typeLength`, when the backing primitive requires one.
    pub fn type_length(&self) -> Option<i32> {
        match self {
            LogicalType::Interval => Some(12),
            LogicalType::Decimal { precision, .. } if *precision > 18 => {
                // minimal byte width that can hold `precision` decimal digits
                Some(decimal_byte_width(*precision))
            }
            _ => None,
        }
    }

    /// The legacy `ConvertedType` thrift id this logical type serializes as.
    pub fn converted_type_id(&self) -> i32 {
        match self {
            LogicalType::Utf8 => 0,
            LogicalType::Decimal { .. } => 5,
            LogicalType::Date => 6,
            LogicalType::TimestampMillis => 9,
            LogicalType::TimestampMicros => 10,
            LogicalType::Json => 19,
            LogicalType::Bson => 20,
            LogicalType::Interval => 21,
        }
    }

    pub fn from_converted_type_id(
        id: i32,
        precision: Option<i32>,
        scale: Option<i32>,
    ) -> Result<Self> {
        Ok(match id {
            0 => LogicalType::Utf8,
            5 => LogicalType::Decimal {
                precision: precision.unwrap_or(0).max(0) as u32,
                scale: scale.unwrap_or(0),
            },
            6 => LogicalType::Date,
            9 => LogicalType::TimestampMillis,
            10 => LogicalType::TimestampMicros,
            19 => LogicalType::Json,
            20 => LogicalType::Bson,
            21 => LogicalType::Interval,
            other => {
                return Err(ParquetCoreError::format(format!(
                    "unsupported ConvertedType id {other}"
                )))
            }
        })
    }

    /// Coerce a user-supplied scalar `Value` into the primitive representation
    /// this logical type is backed by (spec.md §4.3, §8 invariant 9).
    pub fn to_primitive(&self, value: Value) -> Result<Value> {
        match self {
            LogicalType::Utf8 | LogicalType::Json => match value {
                Value::Bytes(b) => Ok(Value::Bytes(b)),
                other => Err(unsupported_value(&other, "a UTF-8/JSON string")),
            },
            LogicalType::Bson => match value {
                Value::Bytes(b) => Ok(Value::Bytes(b)),
                other => Err(unsupported_value(&other, "BSON bytes")),
            },
            LogicalType::Interval => match value {
                Value::Bytes(b) if b.len() == 12 => Ok(Value::Bytes(b)),
                other => Err(unsupported_value(&other, "a 12-byte INTERVAL")),
            },
            LogicalType::Date => match value {
                Value::I32(v) => Ok(Value::I32(v)),
                other => Err(unsupported_value(&other, "a DATE (i32 day count)")),
            },
            LogicalType::TimestampMicros | LogicalType::TimestampMillis => match value {
                Value::I64(v) => Ok(Value::I64(v)),
                other => Err(unsupported_value(&other, "a TIMESTAMP (i64)")),
            },
            LogicalType::Decimal { precision, scale } => {
                let unscaled = match &value {
                    Value::Double(d) => {
                        // truncate toward zero, as spec.md §3/§8 invariant 9 requires
                        let factor = 10f64.powi(*scale);
                        (*d * factor).trunc() as i128
                    }
                    Value::I64(v) => (*v as i128) * 10i128.pow((*scale).max(0) as u32),
                    Value::I32(v) => (*v as i128) * 10i128.pow((*scale).max(0) as u32),
                    other => return Err(unsupported_value(other, "a DECIMAL numeric value")),
                };
                Ok(decimal_unscaled_to_value(unscaled, *precision))
            }
        }
    }

    /// Inverse of `to_primitive`, used by the assembler to surface a
    /// primitive value back as the user-facing logical shape.
    pub fn from_primitive(&self, value: Value) -> Value {
        match self {
            LogicalType::Decimal { scale, .. } => {
                let unscaled = decimal_value_to_unscaled(&value);
                let factor = 10f64.powi(*scale);
                Value::Double(unscaled as f64 / factor)
            }
            _ => value,
        }
    }
}

fn unsupported_value(value: &Value, expected: &str) -> ParquetCoreError {
    ParquetCoreError::config(format!(
        "value of type '{}' is not supported for {expected}",
        value.type_name()
    ))
}

fn decimal_byte_width(precision: u32) -> i32 {
    // ceil(precision * log2(10) / 8), using the same table Parquet
    // implementations commonly hard-code for DECIMAL-as-FIXED_LEN_BYTE_ARRAY.
    let bits_needed = (precision as f64) * std::f64::consts::LOG2_10;
    ((bits_needed / 8.0).ceil() as i32).max(1)
}

fn decimal_unscaled_to_value(unscaled: i128, precision: u32) -> Value {
    if precision <= 9 {
        Value::I32(unscaled as i32)
    } else if precision <= 18 {
        Value::I64(unscaled as i64)
    } else {
        let width = decimal_byte_width(precision) as usize;
        Value::Bytes(i128_to_be_bytes(unscaled, width))
    }
}

fn decimal_value_to_unscaled(value: &Value) -> i128 {
    match value {
        Value::I32(v) => *v as i128,
        Value::I64(v) => *v as i128,
        Value::Bytes(b) => be_bytes_to_i128(b),
        _ => 0,
    }
}

fn i128_to_be_bytes(value: i128, width: usize) -> Vec<u8> {
    let full = value.to_be_bytes();
    full[full.len() - width..].to_vec()
}

fn be_bytes_to_i128(bytes: &[u8]) -> i128 {
    let negative = bytes.first().map(|b| b & 0x80 != 0).unwrap_or(false);
    let mut buf = [if negative { 0xffu8 } else { 0u8 }; 16];
    let start = 16 - bytes.len();
    buf[start..].copy_from_slice(bytes);
    i128::from_be_bytes(buf)
}

/// A node's repetition, relative to its parent (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepetitionType {
    Required,
    Optional,
    Repeated,
}

impl RepetitionType {
    pub fn thrift_id(&self) -> i32 {
        match self {
            RepetitionType::Required => 0,
            RepetitionType::Optional => 1,
            RepetitionType::Repeated => 2,
        }
    }

    pub fn from_thrift_id(id: i32) -> Result<Self> {
        Ok(match id {
            0 => RepetitionType::Required,
            1 => RepetitionType::Optional,
            2 => RepetitionType::Repeated,
            other => {
                return Err(ParquetCoreError::format(format!(
                    "unknown FieldRepetitionType id {other}"
                )))
            }
        })
    }
}
