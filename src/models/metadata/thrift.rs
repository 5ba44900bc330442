//! Compact-protocol Thrift reader.
//!
//! Hand-written recursive-descent deserializer for the handful of message
//! shapes Parquet stores on disk. Field headers carry a type nibble and a
//! field-id delta (with a zigzag long form for large deltas), booleans live
//! in the header type itself, integers are zigzag varints, and containers
//! carry compact size/type headers. Unknown fields are skipped by their
//! declared type.

use crate::error::ParquetError;
use crate::models::decoders::bitpack::BitReader;

// compact protocol field type nibbles
pub const T_STOP: u8 = 0;
pub const T_BOOL_TRUE: u8 = 1;
pub const T_BOOL_FALSE: u8 = 2;
pub const T_BYTE: u8 = 3;
pub const T_I16: u8 = 4;
pub const T_I32: u8 = 5;
pub const T_I64: u8 = 6;
pub const T_DOUBLE: u8 = 7;
pub const T_BINARY: u8 = 8;
pub const T_LIST: u8 = 9;
pub const T_SET: u8 = 10;
pub const T_MAP: u8 = 11;
pub const T_STRUCT: u8 = 12;

// nesting bound while skipping unknown fields
const MAX_SKIP_DEPTH: u32 = 32;

/// Cursor over one compact-encoded message.
pub struct ThriftReader<'a> {
    r: BitReader<'a>,
}

impl<'a> ThriftReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            r: BitReader::new(buf),
        }
    }

    /// Bytes consumed so far; the exact encoded length once a full message
    /// has been read.
    pub fn position(&self) -> usize {
        self.r.position()
    }

    /// Read the next field header of the current struct. Returns `None` on
    /// the stop byte. `last_id` is the running field id the delta encoding
    /// is relative to; reset it to 0 for each struct.
    pub fn read_field_begin(
        &mut self,
        last_id: &mut i16,
    ) -> Result<Option<(u8, i16)>, ParquetError> {
        let byte = self.r.read_fixed::<u8>()?;
        if byte == T_STOP {
            return Ok(None);
        }
        let ftype = byte & 0x0f;
        let delta = byte >> 4;
        let id = if delta == 0 {
            self.read_i16()?
        } else {
            *last_id + delta as i16
        };
        *last_id = id;
        Ok(Some((ftype, id)))
    }

    /// Booleans inside structs are carried by the header type nibble.
    pub fn read_bool(&mut self, ftype: u8) -> Result<bool, ParquetError> {
        match ftype {
            T_BOOL_TRUE => Ok(true),
            T_BOOL_FALSE => Ok(false),
            other => Err(ParquetError::CorruptFile(format!(
                "expected boolean field, found thrift type {}",
                other
            ))),
        }
    }

    pub fn read_i16(&mut self) -> Result<i16, ParquetError> {
        Ok(self.r.read_zigzag_varint()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, ParquetError> {
        Ok(self.r.read_zigzag_varint()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, ParquetError> {
        self.r.read_zigzag_varint()
    }

    pub fn read_double(&mut self) -> Result<f64, ParquetError> {
        self.r.read_fixed::<f64>()
    }

    /// Varint-length-prefixed bytes, borrowed from the input.
    pub fn read_binary(&mut self) -> Result<&'a [u8], ParquetError> {
        let len = self.r.read_unsigned_varint()? as usize;
        self.r.read_bytes(len)
    }

    pub fn read_string(&mut self) -> Result<String, ParquetError> {
        let bytes = self.read_binary()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ParquetError::CorruptFile(format!("invalid UTF-8 string: {}", e)))
    }

    /// Compact list header: element type and length.
    pub fn read_list_begin(&mut self) -> Result<(u8, usize), ParquetError> {
        let byte = self.r.read_fixed::<u8>()?;
        let etype = byte & 0x0f;
        let size = byte >> 4;
        let len = if size == 0x0f {
            self.r.read_unsigned_varint()? as usize
        } else {
            size as usize
        };
        Ok((etype, len))
    }

    /// Compact map header: key type, value type, length. Empty maps encode
    /// as a single zero byte with no type byte.
    pub fn read_map_begin(&mut self) -> Result<(u8, u8, usize), ParquetError> {
        let len = self.r.read_unsigned_varint()? as usize;
        if len == 0 {
            return Ok((T_STOP, T_STOP, 0));
        }
        let kv = self.r.read_fixed::<u8>()?;
        Ok((kv >> 4, kv & 0x0f, len))
    }

    /// Skip one field value of the given type.
    pub fn skip(&mut self, ftype: u8) -> Result<(), ParquetError> {
        self.skip_depth(ftype, 0)
    }

    fn skip_depth(&mut self, ftype: u8, depth: u32) -> Result<(), ParquetError> {
        if depth > MAX_SKIP_DEPTH {
            return Err(ParquetError::CorruptFile(
                "thrift nesting too deep while skipping".to_string(),
            ));
        }
        match ftype {
            T_BOOL_TRUE | T_BOOL_FALSE => Ok(()),
            T_BYTE => self.r.read_fixed::<u8>().map(|_| ()),
            T_I16 | T_I32 | T_I64 => self.r.read_zigzag_varint().map(|_| ()),
            T_DOUBLE => self.r.read_fixed::<f64>().map(|_| ()),
            T_BINARY => self.read_binary().map(|_| ()),
            T_LIST | T_SET => {
                let (etype, len) = self.read_list_begin()?;
                for _ in 0..len {
                    self.skip_element(etype, depth + 1)?;
                }
                Ok(())
            }
            T_MAP => {
                let (ktype, vtype, len) = self.read_map_begin()?;
                for _ in 0..len {
                    self.skip_element(ktype, depth + 1)?;
                    self.skip_element(vtype, depth + 1)?;
                }
                Ok(())
            }
            T_STRUCT => {
                let mut last_id = 0i16;
                while let Some((ft, _)) = self.read_field_begin(&mut last_id)? {
                    self.skip_depth(ft, depth + 1)?;
                }
                Ok(())
            }
            other => Err(ParquetError::CorruptFile(format!(
                "cannot skip unknown thrift type {}",
                other
            ))),
        }
    }

    /// Container elements store booleans as a full byte, unlike fields.
    fn skip_element(&mut self, etype: u8, depth: u32) -> Result<(), ParquetError> {
        match etype {
            T_BOOL_TRUE | T_BOOL_FALSE => self.r.read_fixed::<u8>().map(|_| ()),
            other => self.skip_depth(other, depth),
        }
    }
}
