//! A minimal Thrift Compact Protocol reader/writer (spec.md §5: "metadata
//! serialization is a capability, not a mandate" — `ThriftMetaCodec` in
//! `metacodec.rs` is this crate's concrete implementation of that
//! capability, and needs real compact-protocol framing to produce bit-exact
//! Parquet footers). Grounded on the field-header/zigzag scheme
//! `parquet2`'s metadata reader/writer (other_examples/) use, generalized
//! here to a small standalone encoder/decoder instead of depending on the
//! `parquet-format`/`thrift` crates.

use crate::error::{ParquetCoreError, Result};

pub const CT_STOP: u8 = 0x00;
pub const CT_BOOLEAN_TRUE: u8 = 0x01;
pub const CT_BOOLEAN_FALSE: u8 = 0x02;
pub const CT_BYTE: u8 = 0x03;
pub const CT_I16: u8 = 0x04;
pub const CT_I32: u8 = 0x05;
pub const CT_I64: u8 = 0x06;
pub const CT_DOUBLE: u8 = 0x07;
pub const CT_BINARY: u8 = 0x08;
pub const CT_LIST: u8 = 0x09;
pub const CT_STRUCT: u8 = 0x0c;

pub struct ThriftWriter {
    pub buf: Vec<u8>,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
}

impl ThriftWriter {
    pub fn new() -> Self {
        ThriftWriter {
            buf: Vec::new(),
            last_field_id: 0,
            field_id_stack: Vec::new(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_struct_begin(&mut self) {
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
    }

    pub fn write_struct_end(&mut self) {
        self.buf.push(CT_STOP);
        self.last_field_id = self
            .field_id_stack
            .pop()
            .expect("write_struct_end without matching write_struct_begin");
    }

    /// Writes a field header for `field_id` with compact type `ctype`, using
    /// the short delta form when possible.
    fn write_field_header(&mut self, field_id: i16, ctype: u8) {
        let delta = field_id - self.last_field_id;
        if delta > 0 && delta <= 15 {
            self.buf.push(((delta as u8) << 4) | ctype);
        } else {
            self.buf.push(ctype);
            write_zigzag_varint(&mut self.buf, field_id as i64);
        }
        self.last_field_id = field_id;
    }

    pub fn write_bool_field(&mut self, field_id: i16, value: bool) {
        let ctype = if value { CT_BOOLEAN_TRUE } else { CT_BOOLEAN_FALSE };
        self.write_field_header(field_id, ctype);
    }

    pub fn write_i32_field(&mut self, field_id: i16, value: i32) {
        self.write_field_header(field_id, CT_I32);
        write_zigzag_varint(&mut self.buf, value as i64);
    }

    pub fn write_i64_field(&mut self, field_id: i16, value: i64) {
        self.write_field_header(field_id, CT_I64);
        write_zigzag_varint(&mut self.buf, value);
    }

    pub fn write_double_field(&mut self, field_id: i16, value: f64) {
        self.write_field_header(field_id, CT_DOUBLE);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_binary_field(&mut self, field_id: i16, value: &[u8]) {
        self.write_field_header(field_id, CT_BINARY);
        write_varint(&mut self.buf, value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    pub fn write_string_field(&mut self, field_id: i16, value: &str) {
        self.write_binary_field(field_id, value.as_bytes());
    }

    /// Begins a STRUCT-typed field; caller must `write_struct_begin`/`_end`
    /// around the nested struct's own fields.
    pub fn write_struct_field_header(&mut self, field_id: i16) {
        self.write_field_header(field_id, CT_STRUCT);
    }

    /// Writes a list-of-structs field header plus the list's own header
    /// (element count + element compact type); caller then writes each
    /// element as its own struct.
    pub fn write_struct_list_field_header(&mut self, field_id: i16, len: usize) {
        self.write_field_header(field_id, CT_LIST);
        write_list_header(&mut self.buf, len, CT_STRUCT);
    }

    pub fn write_i32_list_field(&mut self, field_id: i16, values: &[i32]) {
        self.write_field_header(field_id, CT_LIST);
        write_list_header(&mut self.buf, values.len(), CT_I32);
        for v in values {
            write_zigzag_varint(&mut self.buf, *v as i64);
        }
    }

    pub fn write_string_list_field(&mut self, field_id: i16, values: &[String]) {
        self.write_field_header(field_id, CT_LIST);
        write_list_header(&mut self.buf, values.len(), CT_BINARY);
        for v in values {
            write_varint(&mut self.buf, v.len() as u64);
            self.buf.extend_from_slice(v.as_bytes());
        }
    }
}

fn write_list_header(out: &mut Vec<u8>, len: usize, elem_ctype: u8) {
    if len < 15 {
        out.push(((len as u8) << 4) | elem_ctype);
    } else {
        out.push(0xf0 | elem_ctype);
        write_varint(out, len as u64);
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

fn write_zigzag_varint(out: &mut Vec<u8>, value: i64) {
    write_varint(out, zigzag_encode(value));
}

pub struct ThriftReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
}

/// One decoded field header: `None` marks the struct's STOP.
pub struct FieldHeader {
    pub id: i16,
    pub ctype: u8,
}

impl<'a> ThriftReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ThriftReader {
            bytes,
            pos: 0,
            last_field_id: 0,
            field_id_stack: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| ParquetCoreError::format("truncated thrift compact data"))?;
        self.pos += 1;
        Ok(b)
    }

    fn varint(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0;
        loop {
            let b = self.byte()?;
            result |= ((b & 0x7f) as u64) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(result)
    }

    fn zigzag_varint(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.varint()?))
    }

    pub fn read_struct_begin(&mut self) {
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
    }

    pub fn read_struct_end(&mut self) {
        self.last_field_id = self
            .field_id_stack
            .pop()
            .expect("read_struct_end without matching read_struct_begin");
    }

    /// Reads the next field header, or `None` at the struct's STOP marker.
    pub fn read_field_header(&mut self) -> Result<Option<FieldHeader>> {
        let header = self.byte()?;
        if header == CT_STOP {
            return Ok(None);
        }
        let ctype = header & 0x0f;
        let delta = (header >> 4) & 0x0f;
        let id = if delta == 0 {
            self.zigzag_varint()? as i16
        } else {
            self.last_field_id + delta as i16
        };
        self.last_field_id = id;
        Ok(Some(FieldHeader { id, ctype }))
    }

    pub fn read_bool(&mut self, ctype: u8) -> Result<bool> {
        Ok(ctype == CT_BOOLEAN_TRUE)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.zigzag_varint()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.zigzag_varint()
    }

    pub fn read_double(&mut self) -> Result<f64> {
        let bytes = self.take(8)?;
        Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_binary(&mut self) -> Result<Vec<u8>> {
        let len = self.varint()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String> {
        String::from_utf8(self.read_binary()?)
            .map_err(|e| ParquetCoreError::format(format!("non-UTF8 thrift string: {e}")))
    }

    /// Reads a list header, returning `(len, element_ctype)`.
    pub fn read_list_header(&mut self) -> Result<(usize, u8)> {
        let header = self.byte()?;
        let ctype = header & 0x0f;
        let short_len = (header >> 4) & 0x0f;
        let len = if short_len == 15 {
            self.varint()? as usize
        } else {
            short_len as usize
        };
        Ok((len, ctype))
    }

    /// Skips a value of the given compact type, used to ignore unknown
    /// fields (forward compatibility, the same way real Parquet readers do).
    pub fn skip(&mut self, ctype: u8) -> Result<()> {
        match ctype {
            CT_BOOLEAN_TRUE | CT_BOOLEAN_FALSE => {}
            CT_BYTE => {
                self.byte()?;
            }
            CT_I16 | CT_I32 | CT_I64 => {
                self.zigzag_varint()?;
            }
            CT_DOUBLE => {
                self.take(8)?;
            }
            CT_BINARY => {
                self.read_binary()?;
            }
            CT_LIST => {
                let (len, elem_ctype) = self.read_list_header()?;
                for _ in 0..len {
                    self.skip(elem_ctype)?;
                }
            }
            CT_STRUCT => {
                self.read_struct_begin();
                while let Some(field) = self.read_field_header()? {
                    self.skip(field.ctype)?;
                }
                self.read_struct_end();
            }
            other => {
                return Err(ParquetCoreError::format(format!(
                    "unsupported thrift compact type {other} while skipping"
                )))
            }
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        if end > self.bytes.len() {
            return Err(ParquetCoreError::format("truncated thrift compact data"));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_simple_struct() {
        let mut w = ThriftWriter::new();
        w.write_struct_begin();
        w.write_i32_field(1, 42);
        w.write_string_field(2, "hello");
        w.write_bool_field(3, true);
        w.write_struct_end();
        let bytes = w.into_bytes();

        let mut r = ThriftReader::new(&bytes);
        r.read_struct_begin();
        let f1 = r.read_field_header().unwrap().unwrap();
        assert_eq!(f1.id, 1);
        assert_eq!(r.read_i32().unwrap(), 42);
        let f2 = r.read_field_header().unwrap().unwrap();
        assert_eq!(f2.id, 2);
        assert_eq!(r.read_string().unwrap(), "hello");
        let f3 = r.read_field_header().unwrap().unwrap();
        assert_eq!(f3.id, 3);
        assert!(r.read_bool(f3.ctype).unwrap());
        assert!(r.read_field_header().unwrap().is_none());
        r.read_struct_end();
    }

    #[test]
    fn skips_unknown_fields() {
        let mut w = ThriftWriter::new();
        w.write_struct_begin();
        w.write_i32_field(1, 1);
        w.write_i32_list_field(5, &[1, 2, 3]);
        w.write_i32_field(9, 99);
        w.write_struct_end();
        let bytes = w.into_bytes();

        let mut r = ThriftReader::new(&bytes);
        r.read_struct_begin();
        let f1 = r.read_field_header().unwrap().unwrap();
        assert_eq!(f1.id, 1);
        r.read_i32().unwrap();
        let f5 = r.read_field_header().unwrap().unwrap();
        assert_eq!(f5.id, 5);
        r.skip(f5.ctype).unwrap();
        let f9 = r.read_field_header().unwrap().unwrap();
        assert_eq!(f9.id, 9);
        assert_eq!(r.read_i32().unwrap(), 99);
    }
}
