//! Hybrid RLE / bit-packed decoder.
//!
//! Parquet uses one integer encoding for definition levels and dictionary
//! indices: a sequence of runs, each introduced by an unsigned varint
//! header. A header with low bit 0 is an RLE run (upper bits = value
//! count, one `ceil(bit_width/8)`-byte little-endian value follows); a
//! header with low bit 1 is a bit-packed run (upper bits = number of
//! 8-value groups, each value `bit_width` bits, LSB-first).

use crate::error::ParquetError;
use crate::models::decoders::bitpack::BitReader;

/// Streaming decoder over one hybrid-encoded payload.
///
/// The decoder tracks the run in progress, so interleaved `get_batch` /
/// `get_batch_spaced` calls continue where the previous call stopped.
pub struct RleBpDecoder<'a> {
    reader: BitReader<'a>,
    bit_width: u32,
    repeat_count: u64,
    repeat_value: u32,
    literal_count: u64,
}

impl<'a> RleBpDecoder<'a> {
    /// Create a decoder for values of `bit_width` bits, `0 ≤ bit_width ≤ 32`.
    pub fn new(buf: &'a [u8], bit_width: u32) -> Result<Self, ParquetError> {
        if bit_width > 32 {
            return Err(ParquetError::CorruptFile(format!(
                "RLE/bit-packed bit width {} out of range",
                bit_width
            )));
        }
        Ok(Self {
            reader: BitReader::new(buf),
            bit_width,
            repeat_count: 0,
            repeat_value: 0,
            literal_count: 0,
        })
    }

    /// Fill `out` with the next `out.len()` values.
    pub fn get_batch(&mut self, out: &mut [u32]) -> Result<(), ParquetError> {
        if self.bit_width == 0 {
            // zero-width values carry no payload at all
            out.fill(0);
            return Ok(());
        }
        for slot in out.iter_mut() {
            *slot = self.next_value()?;
        }
        Ok(())
    }

    /// Fill only the positions of `out` where `defined` is nonzero, consuming
    /// exactly `num_values - null_count` values from the stream. Undefined
    /// positions are zeroed.
    pub fn get_batch_spaced(
        &mut self,
        num_values: usize,
        null_count: usize,
        defined: &[u8],
        out: &mut [u32],
    ) -> Result<(), ParquetError> {
        debug_assert!(defined.len() >= num_values && out.len() >= num_values);
        if self.bit_width == 0 || null_count == num_values {
            out[..num_values].fill(0);
            return Ok(());
        }
        for i in 0..num_values {
            out[i] = if defined[i] != 0 { self.next_value()? } else { 0 };
        }
        Ok(())
    }

    fn next_value(&mut self) -> Result<u32, ParquetError> {
        loop {
            if self.repeat_count > 0 {
                self.repeat_count -= 1;
                return Ok(self.repeat_value);
            }
            if self.literal_count > 0 {
                self.literal_count -= 1;
                return self.reader.get_bits(self.bit_width);
            }
            self.refill()?;
        }
    }

    /// Read the next run header and prime the run state.
    fn refill(&mut self) -> Result<(), ParquetError> {
        let header = self.reader.read_unsigned_varint()?;
        if header & 1 == 0 {
            self.repeat_count = header >> 1;
            let byte_width = ((self.bit_width + 7) / 8) as usize;
            let bytes = self.reader.read_bytes(byte_width)?;
            let mut le = [0u8; 4];
            le[..byte_width].copy_from_slice(bytes);
            self.repeat_value = u32::from_le_bytes(le);
        } else {
            // groups of 8 values; the trailing group may be padding
            self.literal_count = (header >> 1) * 8;
        }
        Ok(())
    }
}

/// One-shot decode of `n` values at `bit_width` bits.
pub fn rle_bp_decode(
    buf: &[u8],
    bit_width: u32,
    n: usize,
) -> Result<Vec<u32>, ParquetError> {
    let mut out = vec![0u32; n];
    RleBpDecoder::new(buf, bit_width)?.get_batch(&mut out)?;
    Ok(out)
}
