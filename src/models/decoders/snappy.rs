//! Raw Snappy block decompression.
//!
//! Decodes a single block: a varint uncompressed-length preamble followed
//! by tagged literals and back-references. There is no framing and no
//! streaming; page boundaries come from the page header, so the caller
//! always hands in exactly one block.

use crate::error::ParquetError;
use crate::models::decoders::bitpack::BitReader;

// element tag types, low two bits of the tag byte; 3 is the 4-byte copy
const TAG_LITERAL: u32 = 0;
const TAG_COPY_1B: u32 = 1;
const TAG_COPY_2B: u32 = 2;

/// Decompress one Snappy block into a fresh buffer.
pub fn snappy_decompress(input: &[u8]) -> Result<Vec<u8>, ParquetError> {
    let mut r = BitReader::new(input);
    let expected = r.read_unsigned_varint()? as usize;
    let mut out: Vec<u8> = Vec::with_capacity(expected);

    while r.remaining() > 0 {
        let tag = r.read_fixed::<u8>()? as u32;
        match tag & 3 {
            TAG_LITERAL => {
                let len_code = tag >> 2;
                let len = if len_code < 60 {
                    len_code as usize + 1
                } else {
                    // 60..=63: literal length is stored in 1..=4 extra bytes
                    let extra = len_code as usize - 59;
                    let mut le = [0u8; 4];
                    le[..extra].copy_from_slice(r.read_bytes(extra)?);
                    u32::from_le_bytes(le) as usize + 1
                };
                out.extend_from_slice(r.read_bytes(len)?);
            }
            copy => {
                let (len, offset) = match copy {
                    TAG_COPY_1B => {
                        let lo = r.read_fixed::<u8>()? as usize;
                        (((tag >> 2) & 0x7) as usize + 4, ((tag as usize >> 5) << 8) | lo)
                    }
                    TAG_COPY_2B => {
                        ((tag >> 2) as usize + 1, r.read_fixed::<u16>()? as usize)
                    }
                    _ => ((tag >> 2) as usize + 1, r.read_fixed::<u32>()? as usize),
                };
                if offset == 0 || offset > out.len() {
                    return Err(ParquetError::DecompressionFailed(format!(
                        "Snappy copy offset {} outside {} bytes of output",
                        offset,
                        out.len()
                    )));
                }
                // overlapping copies repeat recent output, so go byte by byte
                let start = out.len() - offset;
                for i in 0..len {
                    let b = out[start + i];
                    out.push(b);
                }
            }
        }
        if out.len() > expected {
            return Err(ParquetError::DecompressionFailed(format!(
                "Snappy output exceeded declared size {}",
                expected
            )));
        }
    }

    if out.len() != expected {
        return Err(ParquetError::DecompressionFailed(format!(
            "Snappy block declared {} bytes but produced {}",
            expected,
            out.len()
        )));
    }
    Ok(out)
}
