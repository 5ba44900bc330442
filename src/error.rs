//! Error types for parquet reading

use std::{error, fmt, io};

/// Unified error type for all minparquet operations.
///
/// Every variant carries a contextual message naming the file or the
/// structure that failed; variants are stable so callers can match on the
/// failure class.
#[derive(Debug)]
pub enum ParquetError {
    /// Missing leading/trailing `PAR1` magic, or a zero footer length.
    NotParquet(String),

    /// Input ended early: short footer/chunk/page read, or a decoder ran
    /// off the end of its payload.
    TruncatedInput(String),

    /// Structurally valid Parquet the reader does not support: encryption,
    /// nested schemas, v2 data pages, external chunk references.
    UnsupportedFeature(String),

    /// Page or level encoding outside the supported set.
    UnsupportedEncoding(String),

    /// Physical type the decoder cannot handle in the current context.
    UnsupportedType(String),

    /// Dictionary state violation (duplicate dictionary page, dictionary
    /// reference without a dictionary, header flag mismatch).
    InconsistentDictionary(String),

    /// Snappy block did not decompress cleanly or produced the wrong length.
    DecompressionFailed(String),

    /// Any other structural violation (I/O failure, Thrift decode failure).
    CorruptFile(String),
}

impl fmt::Display for ParquetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParquetError::NotParquet(s) => write!(f, "Not a Parquet file: {}", s),
            ParquetError::TruncatedInput(s) => write!(f, "Truncated input: {}", s),
            ParquetError::UnsupportedFeature(s) => write!(f, "Unsupported feature: {}", s),
            ParquetError::UnsupportedEncoding(s) => write!(f, "Unsupported encoding: {}", s),
            ParquetError::UnsupportedType(s) => write!(f, "Unsupported type: {}", s),
            ParquetError::InconsistentDictionary(s) => {
                write!(f, "Inconsistent dictionary: {}", s)
            }
            ParquetError::DecompressionFailed(s) => write!(f, "Decompression failed: {}", s),
            ParquetError::CorruptFile(s) => write!(f, "Corrupt Parquet file: {}", s),
        }
    }
}

impl error::Error for ParquetError {}

// --- Conversions for error handling --- //

impl From<io::Error> for ParquetError {
    fn from(e: io::Error) -> Self {
        ParquetError::CorruptFile(format!("I/O error: {}", e))
    }
}
