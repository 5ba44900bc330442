//! # minparquet
//!
//! Minimal synchronous reader for flat Parquet files.
//!
//! Opens a file (or any `Read + Seek` source), parses the Thrift-encoded
//! footer, and materializes one row group at a time as typed per-column
//! buffers with a per-row defined bitmap:
//!
//! ```no_run
//! use minparquet::{ParquetFile, ScanState};
//!
//! let mut file = ParquetFile::open("data.parquet")?;
//! let mut state = ScanState::default();
//! let mut result = file.initialize_result();
//! while file.scan(&mut state, &mut result)? {
//!     println!("row group with {} rows", result.nrows);
//! }
//! # Ok::<(), minparquet::ParquetError>(())
//! ```
//!
//! Supported surface: flat schemas (REQUIRED/OPTIONAL leaves only), PLAIN
//! and dictionary encodings, RLE definition levels, UNCOMPRESSED and
//! SNAPPY pages. Encryption, nesting, v2 data pages, and other codecs are
//! rejected with typed errors.

pub mod models {

    pub mod decoders {
        pub mod bitpack;
        pub mod rle;
        pub mod snappy;
    }
    pub mod encoders {
        pub mod rle;
    }
    pub mod metadata {
        pub mod parquet;
        pub mod thrift;
    }
    pub mod readers {
        pub(crate) mod column_chunk;
        pub mod file_reader;
    }
    pub mod sinks {
        pub mod column_sink;
    }
}

pub mod compression;
pub mod constants;
pub mod enums;
pub mod error;

pub use crate::error::ParquetError;
pub use crate::models::readers::file_reader::{
    PageInfo, ParquetColumn, ParquetFile, ScanState,
};
pub use crate::models::sinks::column_sink::{
    ColumnData, Int96, ResultChunk, ResultColumn, StrRef, StringHeap,
};
