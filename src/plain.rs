//! The PLAIN value encoding (spec.md §4.2): little-endian fixed widths for
//! numerics, bit-packed LSB-first for BOOLEAN, length-prefixed for
//! BYTE_ARRAY, raw fixed-width for FIXED_LEN_BYTE_ARRAY.
//!
//! Operates over a whole column's non-null values at once (nulls never
//! reach these functions — spec.md §4.2 "Null values ... are absent from
//! the value buffer").

use crate::error::{ParquetCoreError, Result};
use crate::schema::PrimitiveType;
use crate::value::Value;

pub fn encode_plain_values(
    values: &[Value],
    primitive: PrimitiveType,
    type_length: Option<i32>,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match primitive {
        PrimitiveType::Boolean => {
            let mut byte = 0u8;
            let mut bit = 0u8;
            for v in values {
                if as_bool(v)? {
                    byte |= 1 << bit;
                }
                bit += 1;
                if bit == 8 {
                    out.push(byte);
                    byte = 0;
                    bit = 0;
                }
            }
            if bit > 0 {
                out.push(byte);
            }
        }
        PrimitiveType::Int32 => {
            for v in values {
                out.extend_from_slice(&as_i32(v)?.to_le_bytes());
            }
        }
        PrimitiveType::Int64 => {
            for v in values {
                out.extend_from_slice(&as_i64(v)?.to_le_bytes());
            }
        }
        PrimitiveType::Int96 => {
            for v in values {
                out.extend_from_slice(&as_i96(v)?);
            }
        }
        PrimitiveType::Float => {
            for v in values {
                out.extend_from_slice(&as_f32(v)?.to_le_bytes());
            }
        }
        PrimitiveType::Double => {
            for v in values {
                out.extend_from_slice(&as_f64(v)?.to_le_bytes());
            }
        }
        PrimitiveType::ByteArray => {
            for v in values {
                let b = as_bytes(v)?;
                out.extend_from_slice(&(b.len() as u32).to_le_bytes());
                out.extend_from_slice(b);
            }
        }
        PrimitiveType::FixedLenByteArray => {
            let len = type_length.ok_or_else(|| {
                ParquetCoreError::config("FIXED_LEN_BYTE_ARRAY column is missing typeLength")
            })? as usize;
            for v in values {
                let b = as_bytes(v)?;
                if b.len() != len {
                    return Err(ParquetCoreError::invalid_input(format!(
                        "FIXED_LEN_BYTE_ARRAY expected {len} bytes, got {}",
                        b.len()
                    )));
                }
                out.extend_from_slice(b);
            }
        }
    }
    Ok(out)
}

pub fn decode_plain_values(
    bytes: &[u8],
    primitive: PrimitiveType,
    type_length: Option<i32>,
    count: usize,
) -> Result<Vec<Value>> {
    let mut out = Vec::with_capacity(count);
    let mut pos = 0usize;
    match primitive {
        PrimitiveType::Boolean => {
            for i in 0..count {
                let byte = *bytes
                    .get(i / 8)
                    .ok_or_else(|| ParquetCoreError::format("truncated PLAIN boolean data"))?;
                out.push(Value::Bool((byte >> (i % 8)) & 1 == 1));
            }
        }
        PrimitiveType::Int32 => {
            for _ in 0..count {
                let chunk = take(bytes, &mut pos, 4)?;
                out.push(Value::I32(i32::from_le_bytes(chunk.try_into().unwrap())));
            }
        }
        PrimitiveType::Int64 => {
            for _ in 0..count {
                let chunk = take(bytes, &mut pos, 8)?;
                out.push(Value::I64(i64::from_le_bytes(chunk.try_into().unwrap())));
            }
        }
        PrimitiveType::Int96 => {
            for _ in 0..count {
                let chunk = take(bytes, &mut pos, 12)?;
                let mut arr = [0u8; 12];
                arr.copy_from_slice(chunk);
                out.push(Value::I96(arr));
            }
        }
        PrimitiveType::Float => {
            for _ in 0..count {
                let chunk = take(bytes, &mut pos, 4)?;
                out.push(Value::Float(f32::from_le_bytes(chunk.try_into().unwrap())));
            }
        }
        PrimitiveType::Double => {
            for _ in 0..count {
                let chunk = take(bytes, &mut pos, 8)?;
                out.push(Value::Double(f64::from_le_bytes(chunk.try_into().unwrap())));
            }
        }
        PrimitiveType::ByteArray => {
            for _ in 0..count {
                let len_bytes = take(bytes, &mut pos, 4)?;
                let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
                let data = take(bytes, &mut pos, len)?;
                out.push(Value::Bytes(data.to_vec()));
            }
        }
        PrimitiveType::FixedLenByteArray => {
            let len = type_length.ok_or_else(|| {
                ParquetCoreError::format("FIXED_LEN_BYTE_ARRAY column is missing typeLength")
            })? as usize;
            for _ in 0..count {
                let data = take(bytes, &mut pos, len)?;
                out.push(Value::Bytes(data.to_vec()));
            }
        }
    }
    Ok(out)
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = *pos + len;
    if end > bytes.len() {
        return Err(ParquetCoreError::format("truncated PLAIN value data"));
    }
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn as_bool(v: &Value) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(type_mismatch(other, "BOOLEAN")),
    }
}
fn as_i32(v: &Value) -> Result<i32> {
    match v {
        Value::I32(n) => Ok(*n),
        other => Err(type_mismatch(other, "INT32")),
    }
}
fn as_i64(v: &Value) -> Result<i64> {
    match v {
        Value::I64(n) => Ok(*n),
        other => Err(type_mismatch(other, "INT64")),
    }
}
fn as_i96(v: &Value) -> Result<[u8; 12]> {
    match v {
        Value::I96(n) => Ok(*n),
        other => Err(type_mismatch(other, "INT96")),
    }
}
fn as_f32(v: &Value) -> Result<f32> {
    match v {
        Value::Float(n) => Ok(*n),
        other => Err(type_mismatch(other, "FLOAT")),
    }
}
fn as_f64(v: &Value) -> Result<f64> {
    match v {
        Value::Double(n) => Ok(*n),
        other => Err(type_mismatch(other, "DOUBLE")),
    }
}
fn as_bytes(v: &Value) -> Result<&[u8]> {
    match v {
        Value::Bytes(b) => Ok(b.as_slice()),
        other => Err(type_mismatch(other, "BYTE_ARRAY")),
    }
}

fn type_mismatch(value: &Value, expected: &str) -> ParquetCoreError {
    ParquetCoreError::invalid_input(format!(
        "expected a value coercible to {expected}, got '{}'",
        value.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_array_roundtrip() {
        let values = vec![
            Value::Bytes(vec![1, 2, 3]),
            Value::Bytes(vec![]),
            Value::Bytes(vec![9]),
        ];
        let encoded = encode_plain_values(&values, PrimitiveType::ByteArray, None).unwrap();
        let decoded =
            decode_plain_values(&encoded, PrimitiveType::ByteArray, None, values.len()).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn boolean_bit_packing() {
        let values: Vec<Value> = [true, false, true, true, false, false, false, true, true]
            .iter()
            .map(|b| Value::Bool(*b))
            .collect();
        let encoded = encode_plain_values(&values, PrimitiveType::Boolean, None).unwrap();
        assert_eq!(encoded.len(), 2); // 9 bits -> 2 bytes
        let decoded =
            decode_plain_values(&encoded, PrimitiveType::Boolean, None, values.len()).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn fixed_len_byte_array_roundtrip() {
        let values = vec![Value::Bytes(vec![1, 2, 3, 4]), Value::Bytes(vec![5, 6, 7, 8])];
        let encoded =
            encode_plain_values(&values, PrimitiveType::FixedLenByteArray, Some(4)).unwrap();
        assert_eq!(encoded.len(), 8);
        let decoded = decode_plain_values(
            &encoded,
            PrimitiveType::FixedLenByteArray,
            Some(4),
            values.len(),
        )
        .unwrap();
        assert_eq!(decoded, values);
    }
}
