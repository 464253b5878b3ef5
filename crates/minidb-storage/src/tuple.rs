//! Tuple representation and serialization.

use bytes::{Buf, BufMut, BytesMut};
use minidb_common::types::{DataType, SchemaRef, Value};

/// A typed row bound to its schema.
///
/// Wire format: a null bitmap of ⌈n/8⌉ bytes (bit `i` set iff value `i` is
/// NULL), followed by the non-null values in column order:
/// - integers as i64 little-endian
/// - booleans as a single 0/1 byte
/// - text as a u16 little-endian length followed by the bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    values: Vec<Value>,
    schema: SchemaRef,
}

impl Tuple {
    /// Creates a tuple from values conforming to `schema`.
    pub fn new(values: Vec<Value>, schema: SchemaRef) -> Self {
        debug_assert_eq!(values.len(), schema.len());
        Self { values, schema }
    }

    /// Returns the values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value at column `index`.
    pub fn value(&self, index: usize) -> &Value {
        &self.values[index]
    }

    /// Returns the schema this tuple is bound to.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Consumes the tuple, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Serializes the tuple to its wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let bitmap_len = self.values.len().div_ceil(8);
        let mut buf = BytesMut::with_capacity(bitmap_len + 16 * self.values.len());

        let mut bitmap = vec![0u8; bitmap_len];
        for (i, value) in self.values.iter().enumerate() {
            if value.is_null() {
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        buf.put_slice(&bitmap);

        for value in &self.values {
            match value {
                Value::Integer(i) => buf.put_i64_le(*i),
                Value::Boolean(b) => buf.put_u8(*b as u8),
                Value::Text(s) => {
                    buf.put_u16_le(s.len() as u16);
                    buf.put_slice(s.as_bytes());
                }
                Value::Null => {}
            }
        }

        buf.to_vec()
    }

    /// Deserializes a tuple from its wire format, driven by `schema`.
    ///
    /// Returns `None` if the buffer is truncated or malformed.
    pub fn deserialize(mut buf: &[u8], schema: SchemaRef) -> Option<Tuple> {
        let bitmap_len = schema.len().div_ceil(8);
        if buf.remaining() < bitmap_len {
            return None;
        }
        let bitmap = buf[..bitmap_len].to_vec();
        buf.advance(bitmap_len);

        let mut values = Vec::with_capacity(schema.len());
        for (i, column) in schema.columns().iter().enumerate() {
            let is_null = bitmap[i / 8] & (1 << (i % 8)) != 0;
            if is_null {
                values.push(Value::Null);
                continue;
            }

            match column.data_type {
                DataType::Integer => {
                    if buf.remaining() < 8 {
                        return None;
                    }
                    values.push(Value::Integer(buf.get_i64_le()));
                }
                DataType::Boolean => {
                    if buf.remaining() < 1 {
                        return None;
                    }
                    values.push(Value::Boolean(buf.get_u8() != 0));
                }
                DataType::Text => {
                    if buf.remaining() < 2 {
                        return None;
                    }
                    let len = buf.get_u16_le() as usize;
                    if buf.remaining() < len {
                        return None;
                    }
                    let text = String::from_utf8(buf[..len].to_vec()).ok()?;
                    buf.advance(len);
                    values.push(Value::Text(text));
                }
            }
        }

        Some(Tuple { values, schema })
    }
}
