//! Page decompression dispatch.
//!
//! Column chunks declare one codec for all of their pages. Uncompressed
//! pages alias the chunk buffer; Snappy pages decode through the raw block
//! decoder. Everything else is rejected up front, naming the codec.

use std::borrow::Cow;

use crate::enums::CompressionCodec;
use crate::error::ParquetError;
use crate::models::decoders::snappy::snappy_decompress;

/// Map a column chunk's raw codec id, keeping unknown integers in the error.
pub fn map_codec(id: i32) -> Result<CompressionCodec, ParquetError> {
    CompressionCodec::from_i32(id).ok_or_else(|| {
        ParquetError::UnsupportedFeature(format!("unknown compression codec {}", id))
    })
}

/// Produce the decoded bytes of one page.
///
/// The result must be exactly `uncompressed_size` bytes; the page header
/// declared that size and every decoder downstream trusts it.
pub fn decompress<'a>(
    input: &'a [u8],
    codec: CompressionCodec,
    uncompressed_size: usize,
) -> Result<Cow<'a, [u8]>, ParquetError> {
    match codec {
        CompressionCodec::Uncompressed => {
            if input.len() != uncompressed_size {
                return Err(ParquetError::DecompressionFailed(format!(
                    "uncompressed page declared {} bytes but holds {}",
                    uncompressed_size,
                    input.len()
                )));
            }
            Ok(Cow::Borrowed(input))
        }
        CompressionCodec::Snappy => {
            let out = snappy_decompress(input)?;
            if out.len() != uncompressed_size {
                return Err(ParquetError::DecompressionFailed(format!(
                    "page declared {} uncompressed bytes but Snappy produced {}",
                    uncompressed_size,
                    out.len()
                )));
            }
            Ok(Cow::Owned(out))
        }
        other => Err(ParquetError::UnsupportedFeature(format!(
            "compression codec {:?} ({}) is not supported",
            other,
            other.as_i32()
        ))),
    }
}
