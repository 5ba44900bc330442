//! Parquet file reader.
//!
//! Opens a file (or any `Read + Seek` source), verifies the `PAR1` magic at
//! both ends, loads and validates the Thrift footer, and scans row groups
//! one at a time into caller-owned [`ResultChunk`]s. Also exposes the
//! speculative page-header probe and whole-file page enumeration used by
//! diagnostic callers.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::constants::{FOOTER_TAIL_LEN, MAGIC_LEN, PAGE_HEADER_PROBE_LEN, PARQUET_MAGIC};
use crate::enums::{PhysicalType, Repetition};
use crate::error::ParquetError;
use crate::models::metadata::parquet::{
    parse_file_metadata, parse_page_header, ColumnChunkMeta, FileMetaData, PageHeader,
    RowGroupMeta,
};
use crate::models::readers::column_chunk::ColumnScan;
use crate::models::sinks::column_sink::{ColumnData, ResultChunk, ResultColumn, StringHeap};

/// Descriptor of one leaf column: the schema element plus its zero-based
/// column id (its index once the root is discarded).
#[derive(Debug, Clone)]
pub struct ParquetColumn {
    pub id: usize,
    pub name: String,
    pub physical_type: PhysicalType,
    /// Value byte length for FIXED_LEN_BYTE_ARRAY columns.
    pub type_length: Option<usize>,
    pub repetition: Repetition,
    /// Legacy logical annotation, carried through untouched.
    pub converted_type: Option<i32>,
}

/// Cursor over a file's row groups, advanced by [`ParquetFile::scan`].
#[derive(Debug, Default, Clone)]
pub struct ScanState {
    pub row_group_idx: usize,
}

/// One page located by [`ParquetFile::pages`].
#[derive(Debug, Clone)]
pub struct PageInfo {
    pub row_group: usize,
    pub column: usize,
    /// Byte offset of the page header in the file.
    pub offset: u64,
    pub header_len: usize,
    /// Raw page type integer.
    pub page_type: i32,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    /// Value count, for data and dictionary pages.
    pub num_values: Option<i32>,
    /// Value encoding, for data pages.
    pub encoding: Option<i32>,
}

/// A Parquet file opened for scanning. The source is owned exclusively for
/// the reader's lifetime.
#[derive(Debug)]
pub struct ParquetFile<R: Read + Seek = File> {
    source: R,
    file_size: u64,
    metadata: FileMetaData,
    columns: Vec<ParquetColumn>,
}

impl ParquetFile<File> {
    /// Open a Parquet file on local storage.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ParquetError> {
        let file = File::open(path.as_ref()).map_err(|e| {
            ParquetError::CorruptFile(format!(
                "can't open Parquet file at '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> ParquetFile<R> {
    /// Wrap an already-open source. Verifies magic bytes, loads the footer
    /// and builds the leaf column list.
    pub fn from_reader(mut source: R) -> Result<Self, ParquetError> {
        let file_size = source.seek(SeekFrom::End(0))?;
        if file_size < (MAGIC_LEN + FOOTER_TAIL_LEN) as u64 {
            return Err(ParquetError::NotParquet(format!(
                "{} bytes is too small for a Parquet file",
                file_size
            )));
        }

        let mut magic = [0u8; MAGIC_LEN];
        source.seek(SeekFrom::Start(0))?;
        source.read_exact(&mut magic)?;
        if magic != PARQUET_MAGIC {
            return Err(ParquetError::NotParquet(
                "no leading magic bytes".to_string(),
            ));
        }
        source.seek(SeekFrom::End(-(MAGIC_LEN as i64)))?;
        source.read_exact(&mut magic)?;
        if magic != PARQUET_MAGIC {
            return Err(ParquetError::NotParquet(
                "no trailing magic bytes".to_string(),
            ));
        }

        // four-byte footer length just before the end magic
        let mut len_buf = [0u8; 4];
        source.seek(SeekFrom::End(-(FOOTER_TAIL_LEN as i64)))?;
        source.read_exact(&mut len_buf)?;
        let footer_len = u32::from_le_bytes(len_buf) as u64;
        if footer_len == 0 {
            return Err(ParquetError::NotParquet("footer length is zero".to_string()));
        }
        if footer_len + FOOTER_TAIL_LEN as u64 + MAGIC_LEN as u64 > file_size {
            return Err(ParquetError::TruncatedInput(format!(
                "footer of {} bytes does not fit in a {}-byte file",
                footer_len, file_size
            )));
        }

        let mut footer = vec![0u8; footer_len as usize];
        source.seek(SeekFrom::End(-((footer_len + FOOTER_TAIL_LEN as u64) as i64)))?;
        source.read_exact(&mut footer)?;
        let (metadata, consumed) = parse_file_metadata(&footer)?;
        debug_assert!(consumed <= footer.len());

        let columns = build_columns(&metadata)?;
        debug!(
            "opened parquet source: {} rows, {} row groups, {} columns",
            metadata.num_rows,
            metadata.row_groups.len(),
            columns.len()
        );

        Ok(Self {
            source,
            file_size,
            metadata,
            columns,
        })
    }

    /// The parsed footer, including key/value metadata and statistics.
    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    /// Leaf columns in schema order.
    pub fn columns(&self) -> &[ParquetColumn] {
        &self.columns
    }

    /// Total rows across all row groups.
    pub fn num_rows(&self) -> i64 {
        self.metadata.num_rows
    }

    /// A result chunk shaped for this file, ready to pass to [`scan`].
    ///
    /// [`scan`]: ParquetFile::scan
    pub fn initialize_result(&self) -> ResultChunk {
        ResultChunk {
            nrows: 0,
            cols: Vec::with_capacity(self.columns.len()),
        }
    }

    /// Scan the next row group into `result`. Returns `false` (and sets
    /// `result.nrows` to 0) once the row groups are exhausted. Rewinding
    /// `state.row_group_idx` re-scans a group and produces identical output.
    pub fn scan(
        &mut self,
        state: &mut ScanState,
        result: &mut ResultChunk,
    ) -> Result<bool, ParquetError> {
        if state.row_group_idx >= self.metadata.row_groups.len() {
            result.nrows = 0;
            result.cols.clear();
            return Ok(false);
        }

        // split borrows: the source moves while metadata stays referenced
        let Self {
            source,
            file_size,
            metadata,
            columns,
        } = self;
        let row_group = &metadata.row_groups[state.row_group_idx];
        let nrows = usize::try_from(row_group.num_rows).map_err(|_| {
            ParquetError::CorruptFile("negative row count in row group".to_string())
        })?;

        debug!(
            "scanning row group {} ({} rows)",
            state.row_group_idx, nrows
        );
        result.nrows = nrows;
        result.cols.clear();
        for column in columns.iter() {
            let mut result_col = initialize_column(column, nrows)?;
            scan_column(source, *file_size, row_group, column, &mut result_col)?;
            result.cols.push(result_col);
        }

        state.row_group_idx += 1;
        Ok(true)
    }

    /// Speculatively read and parse a page header at `offset`, returning the
    /// header and its exact encoded length. Reads up to 2 KiB, clamped to
    /// the file length minus the trailing magic.
    pub fn read_page_header(&mut self, offset: u64) -> Result<(PageHeader, usize), ParquetError> {
        let past = self.file_size.checked_sub(offset).ok_or_else(|| {
            ParquetError::TruncatedInput(format!(
                "page header offset {} past end of file",
                offset
            ))
        })?;
        let mut len = PAGE_HEADER_PROBE_LEN;
        if len > past {
            len = past.checked_sub(MAGIC_LEN as u64).ok_or_else(|| {
                ParquetError::TruncatedInput(format!(
                    "page header offset {} inside the file trailer",
                    offset
                ))
            })?;
        }
        let mut buf = vec![0u8; len as usize];
        self.source.seek(SeekFrom::Start(offset))?;
        self.source.read_exact(&mut buf)?;
        parse_page_header(&buf)
    }

    /// Bounded random read with an EOF check.
    pub fn read_chunk(&mut self, offset: u64, out: &mut [u8]) -> Result<(), ParquetError> {
        let available = self.file_size.saturating_sub(offset);
        if out.len() as u64 > available {
            return Err(ParquetError::TruncatedInput(format!(
                "read of {} bytes at offset {} past end of {}-byte file",
                out.len(),
                offset,
                self.file_size
            )));
        }
        self.source.seek(SeekFrom::Start(offset))?;
        self.source.read_exact(out)?;
        Ok(())
    }

    /// Enumerate every page of every column chunk, walking headers the same
    /// way the scanner does. Diagnostic surface; no payload is decoded.
    pub fn pages(&mut self) -> Result<Vec<PageInfo>, ParquetError> {
        // collect the walk list first so the probe can borrow the source
        let chunks: Vec<(usize, usize, u64, i64)> = self
            .metadata
            .row_groups
            .iter()
            .enumerate()
            .flat_map(|(rg_idx, rg)| {
                rg.columns
                    .iter()
                    .enumerate()
                    .map(move |(col_idx, chunk)| {
                        (
                            rg_idx,
                            col_idx,
                            chunk_start(chunk),
                            chunk.meta_data.total_compressed_size,
                        )
                    })
            })
            .collect();

        let mut pages = Vec::new();
        for (row_group, column, start, chunk_len) in chunks {
            let mut offset = start;
            let mut remaining = chunk_len;
            while remaining > 0 {
                let (header, header_len) = self.read_page_header(offset)?;
                let (num_values, encoding) = match (
                    &header.data_page_header,
                    &header.dictionary_page_header,
                ) {
                    (Some(dp), _) => (Some(dp.num_values), Some(dp.encoding)),
                    (None, Some(dict)) => (Some(dict.num_values), Some(dict.encoding)),
                    (None, None) => (None, None),
                };
                pages.push(PageInfo {
                    row_group,
                    column,
                    offset,
                    header_len,
                    page_type: header.type_,
                    uncompressed_page_size: header.uncompressed_page_size,
                    compressed_page_size: header.compressed_page_size,
                    num_values,
                    encoding,
                });
                if header.compressed_page_size < 0 {
                    return Err(ParquetError::CorruptFile(
                        "negative compressed size in page header".to_string(),
                    ));
                }
                let advance = header_len as i64 + header.compressed_page_size as i64;
                offset += advance as u64;
                remaining -= advance;
            }
        }
        Ok(pages)
    }
}

// --------------------- Schema validation ---------------------------- //

/// Reject what the scanner cannot handle and build the leaf descriptors.
fn build_columns(metadata: &FileMetaData) -> Result<Vec<ParquetColumn>, ParquetError> {
    if metadata.encryption_algorithm_set {
        return Err(ParquetError::UnsupportedFeature(
            "encrypted Parquet files are not supported".to_string(),
        ));
    }
    if metadata.schema.len() < 2 {
        return Err(ParquetError::CorruptFile(
            "schema carries no columns".to_string(),
        ));
    }
    let root_children = metadata.schema[0].num_children.unwrap_or(0);
    if root_children as usize != metadata.schema.len() - 1 {
        return Err(ParquetError::UnsupportedFeature(
            "only flat schemas (no nesting) are supported".to_string(),
        ));
    }

    let mut columns = Vec::with_capacity(metadata.schema.len() - 1);
    for (idx, element) in metadata.schema.iter().enumerate().skip(1) {
        if element.num_children.unwrap_or(0) > 0 {
            return Err(ParquetError::UnsupportedFeature(
                "only flat schemas (no nesting) are supported".to_string(),
            ));
        }
        let raw_type = element.type_.ok_or_else(|| {
            ParquetError::UnsupportedFeature(
                "only flat schemas (no nesting) are supported".to_string(),
            )
        })?;
        let physical_type = PhysicalType::from_i32(raw_type).ok_or_else(|| {
            ParquetError::UnsupportedType(format!(
                "unknown physical type {} for column '{}'",
                raw_type, element.name
            ))
        })?;
        let repetition = match element.repetition_type {
            None => Repetition::Required,
            Some(raw) => match Repetition::from_i32(raw) {
                Some(Repetition::Repeated) | None => {
                    return Err(ParquetError::UnsupportedFeature(format!(
                        "repetition {} of column '{}' is not supported",
                        raw, element.name
                    )));
                }
                Some(rep) => rep,
            },
        };
        columns.push(ParquetColumn {
            id: idx - 1,
            name: element.name.clone(),
            physical_type,
            type_length: element.type_length.and_then(|l| usize::try_from(l).ok()),
            repetition,
            converted_type: element.converted_type,
        });
    }

    // every row group must carry one chunk per leaf
    for (rg_idx, rg) in metadata.row_groups.iter().enumerate() {
        if rg.columns.len() != columns.len() {
            return Err(ParquetError::CorruptFile(format!(
                "row group {} has {} column chunks for {} columns",
                rg_idx,
                rg.columns.len(),
                columns.len()
            )));
        }
    }
    Ok(columns)
}

/// Allocate the typed buffer and zeroed defined bitmap for one column.
fn initialize_column(
    column: &ParquetColumn,
    nrows: usize,
) -> Result<ResultColumn, ParquetError> {
    if column.physical_type == PhysicalType::FixedLenByteArray && column.type_length.is_none() {
        return Err(ParquetError::UnsupportedType(format!(
            "FIXED_LEN_BYTE_ARRAY column '{}' has no type length",
            column.name
        )));
    }
    Ok(ResultColumn {
        id: column.id,
        data: ColumnData::for_type(column.physical_type, nrows),
        defined: vec![0u8; nrows],
        heap: StringHeap::default(),
    })
}

/// Where a chunk's pages begin. Writers are known to store 0 or garbage in
/// `dictionary_page_offset`; values below 4 cannot be real (the magic sits
/// there), so only then is the field trusted.
fn chunk_start(chunk: &ColumnChunkMeta) -> u64 {
    match chunk.meta_data.dictionary_page_offset {
        Some(dict_offset) if dict_offset >= 4 => dict_offset as u64,
        _ => chunk.meta_data.data_page_offset as u64,
    }
}

/// Load one column chunk in a single read and run the page scanner on it.
fn scan_column<R: Read + Seek>(
    source: &mut R,
    file_size: u64,
    row_group: &RowGroupMeta,
    column: &ParquetColumn,
    result_col: &mut ResultColumn,
) -> Result<(), ParquetError> {
    let chunk = &row_group.columns[column.id];

    if chunk.file_path.is_some() {
        return Err(ParquetError::UnsupportedFeature(
            "column chunks referencing other files are not supported".to_string(),
        ));
    }
    if chunk.meta_data.path_in_schema.len() != 1 {
        return Err(ParquetError::UnsupportedFeature(format!(
            "column '{}' has a nested schema path",
            column.name
        )));
    }

    let start = chunk_start(chunk);
    let chunk_len = usize::try_from(chunk.meta_data.total_compressed_size).map_err(|_| {
        ParquetError::CorruptFile(format!(
            "negative compressed size on column '{}'",
            column.name
        ))
    })?;
    if start + chunk_len as u64 > file_size {
        return Err(ParquetError::TruncatedInput(format!(
            "column chunk of {} bytes at offset {} past end of {}-byte file",
            chunk_len, start, file_size
        )));
    }

    let mut chunk_buf = vec![0u8; chunk_len];
    source.seek(SeekFrom::Start(start))?;
    source.read_exact(&mut chunk_buf)?;

    let mut scan = ColumnScan::new(
        column.physical_type,
        column.type_length,
        column.repetition != Repetition::Required,
        chunk,
    )?;
    scan.scan_pages(&chunk_buf, result_col)
}
