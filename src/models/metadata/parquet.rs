//! Parquet footer and page metadata.
//!
//! Structs mirror the Thrift IDL messages this reader consumes — field IDs
//! and enum integers are part of the wire format and must not drift. Enum
//! fields are kept as raw `i32` here so unknown integers survive parsing
//! and can be named in errors; the file reader maps them to typed enums
//! when it validates the schema.

use crate::error::ParquetError;
use crate::models::metadata::thrift::ThriftReader;

// --------------------- Structs ------------------------------------ //

/// Complete Parquet file metadata stored in the footer.
#[derive(Debug, Clone)]
pub struct FileMetaData {
    /// Format version (1 for everything this reader handles).
    pub version: i32,
    /// Flattened schema: element 0 is the root, the rest are leaves.
    pub schema: Vec<SchemaElement>,
    /// Total number of rows across all row groups.
    pub num_rows: i64,
    /// Row group descriptors in file order.
    pub row_groups: Vec<RowGroupMeta>,
    /// Optional producer-specific key/value pairs.
    pub key_value_metadata: Option<Vec<KeyValue>>,
    /// Optional producer string.
    pub created_by: Option<String>,
    /// Whether the footer carried an `encryption_algorithm` field. Its
    /// contents are never decoded; presence alone makes the file unreadable
    /// here.
    pub encryption_algorithm_set: bool,
}

/// One node of the flattened schema tree.
#[derive(Debug, Clone)]
pub struct SchemaElement {
    /// Column or group name.
    pub name: String,
    /// Physical type as the raw enum integer; unset for the root.
    pub type_: Option<i32>,
    /// Type length for FIXED_LEN_BYTE_ARRAY.
    pub type_length: Option<i32>,
    /// Repetition as the raw enum integer; unset for the root.
    pub repetition_type: Option<i32>,
    /// Child count for group nodes; unset or zero for leaves.
    pub num_children: Option<i32>,
    /// Legacy logical annotation, read but not interpreted.
    pub converted_type: Option<i32>,
    /// Decimal scale, if annotated.
    pub scale: Option<i32>,
    /// Decimal precision, if annotated.
    pub precision: Option<i32>,
    /// Writer-assigned field id, if any.
    pub field_id: Option<i32>,
}

/// Horizontal partition of the table.
#[derive(Debug, Clone)]
pub struct RowGroupMeta {
    /// One chunk per leaf column, in schema order.
    pub columns: Vec<ColumnChunkMeta>,
    /// Total byte size of all the chunks' uncompressed data.
    pub total_byte_size: i64,
    /// Number of rows in this row group.
    pub num_rows: i64,
}

/// All values of one column within one row group.
#[derive(Debug, Clone)]
pub struct ColumnChunkMeta {
    /// Set when the chunk lives in another file; always rejected here.
    pub file_path: Option<String>,
    /// Offset of the column metadata in its file.
    pub file_offset: i64,
    /// Detailed per-column metadata.
    pub meta_data: ColumnMetadata,
}

/// Per-chunk column metadata.
#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// Physical type as the raw enum integer.
    pub type_: i32,
    /// Encodings used in this chunk, raw enum integers.
    pub encodings: Vec<i32>,
    /// Path to the leaf; length 1 for flat schemas.
    pub path_in_schema: Vec<String>,
    /// Compression codec as the raw enum integer.
    pub codec: i32,
    /// Total value count, nulls included.
    pub num_values: i64,
    /// Uncompressed byte size of all pages.
    pub total_uncompressed_size: i64,
    /// Compressed byte size of all pages.
    pub total_compressed_size: i64,
    /// Byte offset of the first data page.
    pub data_page_offset: i64,
    /// Byte offset of the index page, if any.
    pub index_page_offset: Option<i64>,
    /// Byte offset of the dictionary page, if any.
    pub dictionary_page_offset: Option<i64>,
    /// Optional column statistics.
    pub statistics: Option<Statistics>,
}

/// Column or page statistics (min/max as raw encoded bytes).
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Number of null values, if recorded.
    pub null_count: Option<i64>,
    /// Number of distinct values, if recorded.
    pub distinct_count: Option<i64>,
    /// Deprecated min, raw bytes in the column's physical encoding.
    pub min: Option<Vec<u8>>,
    /// Deprecated max, raw bytes.
    pub max: Option<Vec<u8>>,
    /// Logical-order min, raw bytes.
    pub min_value: Option<Vec<u8>>,
    /// Logical-order max, raw bytes.
    pub max_value: Option<Vec<u8>>,
}

/// Producer metadata pair from the footer.
#[derive(Debug, Clone)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

/// Header preceding every page in a column chunk.
#[derive(Debug, Clone)]
pub struct PageHeader {
    /// Page type as the raw enum integer.
    pub type_: i32,
    /// Payload size after decompression.
    pub uncompressed_page_size: i32,
    /// Payload size as stored.
    pub compressed_page_size: i32,
    /// Set for data pages.
    pub data_page_header: Option<DataPageHeader>,
    /// Set for dictionary pages.
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    /// Whether a v2 data page header was present (contents are not kept;
    /// v2 pages are rejected at scan time).
    pub has_data_page_header_v2: bool,
}

/// Data page (v1) header.
#[derive(Debug, Clone)]
pub struct DataPageHeader {
    /// Number of values in the page, nulls included.
    pub num_values: i32,
    /// Value encoding, raw enum integer.
    pub encoding: i32,
    /// Definition-level encoding, raw enum integer.
    pub definition_level_encoding: i32,
    /// Repetition-level encoding, raw enum integer.
    pub repetition_level_encoding: i32,
    /// Optional page statistics.
    pub statistics: Option<Statistics>,
}

/// Dictionary page header.
#[derive(Debug, Clone)]
pub struct DictionaryPageHeader {
    /// Number of dictionary entries.
    pub num_values: i32,
    /// Dictionary value encoding, raw enum integer.
    pub encoding: i32,
    /// Whether entries are sorted.
    pub is_sorted: Option<bool>,
}

// --------------------- Entry points -------------------------------- //

/// Parse the footer's `FileMetaData`, returning the consumed byte count.
pub fn parse_file_metadata(buf: &[u8]) -> Result<(FileMetaData, usize), ParquetError> {
    let mut t = ThriftReader::new(buf);
    let meta = read_file_metadata(&mut t)?;
    Ok((meta, t.position()))
}

/// Parse one `PageHeader`, returning its exact encoded length so callers
/// can locate the payload that follows it.
pub fn parse_page_header(buf: &[u8]) -> Result<(PageHeader, usize), ParquetError> {
    let mut t = ThriftReader::new(buf);
    let header = read_page_header(&mut t)?;
    Ok((header, t.position()))
}

// --------------------- Thrift parsers ------------------------------ //

fn read_file_metadata(t: &mut ThriftReader) -> Result<FileMetaData, ParquetError> {
    let mut version = None;
    let mut schema = Vec::new();
    let mut num_rows = None;
    let mut row_groups = Vec::new();
    let mut key_value_metadata = None;
    let mut created_by = None;
    let mut encryption_algorithm_set = false;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => version = Some(t.read_i32()?),
            2 => {
                let (_etype, len) = t.read_list_begin()?;
                for _ in 0..len {
                    schema.push(read_schema_element(t)?);
                }
            }
            3 => num_rows = Some(t.read_i64()?),
            4 => {
                let (_etype, len) = t.read_list_begin()?;
                for _ in 0..len {
                    row_groups.push(read_row_group(t)?);
                }
            }
            5 => {
                let (_etype, len) = t.read_list_begin()?;
                let mut pairs = Vec::with_capacity(len);
                for _ in 0..len {
                    pairs.push(read_key_value(t)?);
                }
                key_value_metadata = Some(pairs);
            }
            6 => created_by = Some(t.read_string()?),
            8 => {
                // encryption_algorithm union: record presence, skip contents
                encryption_algorithm_set = true;
                t.skip(ftype)?;
            }
            _ => t.skip(ftype)?,
        }
    }

    Ok(FileMetaData {
        version: version
            .ok_or_else(|| ParquetError::CorruptFile("FileMetaData missing version".into()))?,
        schema,
        num_rows: num_rows
            .ok_or_else(|| ParquetError::CorruptFile("FileMetaData missing num_rows".into()))?,
        row_groups,
        key_value_metadata,
        created_by,
        encryption_algorithm_set,
    })
}

fn read_schema_element(t: &mut ThriftReader) -> Result<SchemaElement, ParquetError> {
    let mut name = None;
    let mut type_ = None;
    let mut type_length = None;
    let mut repetition_type = None;
    let mut num_children = None;
    let mut converted_type = None;
    let mut scale = None;
    let mut precision = None;
    let mut field_id = None;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => type_ = Some(t.read_i32()?),
            2 => type_length = Some(t.read_i32()?),
            3 => repetition_type = Some(t.read_i32()?),
            4 => name = Some(t.read_string()?),
            5 => num_children = Some(t.read_i32()?),
            6 => converted_type = Some(t.read_i32()?),
            7 => scale = Some(t.read_i32()?),
            8 => precision = Some(t.read_i32()?),
            9 => field_id = Some(t.read_i32()?),
            // 10 is the logicalType union: read, not interpreted
            _ => t.skip(ftype)?,
        }
    }

    Ok(SchemaElement {
        name: name
            .ok_or_else(|| ParquetError::CorruptFile("SchemaElement missing name".into()))?,
        type_,
        type_length,
        repetition_type,
        num_children,
        converted_type,
        scale,
        precision,
        field_id,
    })
}

fn read_row_group(t: &mut ThriftReader) -> Result<RowGroupMeta, ParquetError> {
    let mut columns = Vec::new();
    let mut total_byte_size = None;
    let mut num_rows = None;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => {
                let (_etype, len) = t.read_list_begin()?;
                for _ in 0..len {
                    columns.push(read_column_chunk(t)?);
                }
            }
            2 => total_byte_size = Some(t.read_i64()?),
            3 => num_rows = Some(t.read_i64()?),
            _ => t.skip(ftype)?,
        }
    }

    Ok(RowGroupMeta {
        columns,
        total_byte_size: total_byte_size.unwrap_or(0),
        num_rows: num_rows
            .ok_or_else(|| ParquetError::CorruptFile("RowGroup missing num_rows".into()))?,
    })
}

fn read_column_chunk(t: &mut ThriftReader) -> Result<ColumnChunkMeta, ParquetError> {
    let mut file_path = None;
    let mut file_offset = None;
    let mut meta_data = None;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => file_path = Some(t.read_string()?),
            2 => file_offset = Some(t.read_i64()?),
            3 => meta_data = Some(read_column_metadata(t)?),
            _ => t.skip(ftype)?,
        }
    }

    Ok(ColumnChunkMeta {
        file_path,
        file_offset: file_offset.unwrap_or(0),
        meta_data: meta_data
            .ok_or_else(|| ParquetError::CorruptFile("ColumnChunk missing metadata".into()))?,
    })
}

fn read_column_metadata(t: &mut ThriftReader) -> Result<ColumnMetadata, ParquetError> {
    let mut type_ = None;
    let mut encodings = Vec::new();
    let mut path_in_schema = Vec::new();
    let mut codec = None;
    let mut num_values = None;
    let mut total_uncompressed_size = None;
    let mut total_compressed_size = None;
    let mut data_page_offset = None;
    let mut index_page_offset = None;
    let mut dictionary_page_offset = None;
    let mut statistics = None;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => type_ = Some(t.read_i32()?),
            2 => {
                let (_etype, len) = t.read_list_begin()?;
                for _ in 0..len {
                    encodings.push(t.read_i32()?);
                }
            }
            3 => {
                let (_etype, len) = t.read_list_begin()?;
                for _ in 0..len {
                    path_in_schema.push(t.read_string()?);
                }
            }
            4 => codec = Some(t.read_i32()?),
            5 => num_values = Some(t.read_i64()?),
            6 => total_uncompressed_size = Some(t.read_i64()?),
            7 => total_compressed_size = Some(t.read_i64()?),
            9 => data_page_offset = Some(t.read_i64()?),
            10 => index_page_offset = Some(t.read_i64()?),
            11 => dictionary_page_offset = Some(t.read_i64()?),
            12 => statistics = Some(read_statistics(t)?),
            _ => t.skip(ftype)?,
        }
    }

    let missing =
        |what: &str| ParquetError::CorruptFile(format!("ColumnMetaData missing {}", what));
    Ok(ColumnMetadata {
        type_: type_.ok_or_else(|| missing("type"))?,
        encodings,
        path_in_schema,
        codec: codec.ok_or_else(|| missing("codec"))?,
        num_values: num_values.ok_or_else(|| missing("num_values"))?,
        total_uncompressed_size: total_uncompressed_size.unwrap_or(0),
        total_compressed_size: total_compressed_size
            .ok_or_else(|| missing("total_compressed_size"))?,
        data_page_offset: data_page_offset.ok_or_else(|| missing("data_page_offset"))?,
        index_page_offset,
        dictionary_page_offset,
        statistics,
    })
}

fn read_statistics(t: &mut ThriftReader) -> Result<Statistics, ParquetError> {
    let mut stats = Statistics::default();

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => stats.max = Some(t.read_binary()?.to_vec()),
            2 => stats.min = Some(t.read_binary()?.to_vec()),
            3 => stats.null_count = Some(t.read_i64()?),
            4 => stats.distinct_count = Some(t.read_i64()?),
            5 => stats.max_value = Some(t.read_binary()?.to_vec()),
            6 => stats.min_value = Some(t.read_binary()?.to_vec()),
            _ => t.skip(ftype)?,
        }
    }
    Ok(stats)
}

fn read_key_value(t: &mut ThriftReader) -> Result<KeyValue, ParquetError> {
    let mut key = None;
    let mut value = None;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => key = Some(t.read_string()?),
            2 => value = Some(t.read_string()?),
            _ => t.skip(ftype)?,
        }
    }
    Ok(KeyValue {
        key: key.ok_or_else(|| ParquetError::CorruptFile("KeyValue missing key".into()))?,
        value,
    })
}

fn read_page_header(t: &mut ThriftReader) -> Result<PageHeader, ParquetError> {
    let mut type_ = None;
    let mut uncompressed_page_size = None;
    let mut compressed_page_size = None;
    let mut data_page_header = None;
    let mut dictionary_page_header = None;
    let mut has_data_page_header_v2 = false;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => type_ = Some(t.read_i32()?),
            2 => uncompressed_page_size = Some(t.read_i32()?),
            3 => compressed_page_size = Some(t.read_i32()?),
            5 => data_page_header = Some(read_data_page_header(t)?),
            7 => dictionary_page_header = Some(read_dictionary_page_header(t)?),
            8 => {
                has_data_page_header_v2 = true;
                t.skip(ftype)?;
            }
            _ => t.skip(ftype)?,
        }
    }

    let missing = |what: &str| ParquetError::CorruptFile(format!("PageHeader missing {}", what));
    Ok(PageHeader {
        type_: type_.ok_or_else(|| missing("type"))?,
        uncompressed_page_size: uncompressed_page_size
            .ok_or_else(|| missing("uncompressed_page_size"))?,
        compressed_page_size: compressed_page_size
            .ok_or_else(|| missing("compressed_page_size"))?,
        data_page_header,
        dictionary_page_header,
        has_data_page_header_v2,
    })
}

fn read_data_page_header(t: &mut ThriftReader) -> Result<DataPageHeader, ParquetError> {
    let mut num_values = None;
    let mut encoding = None;
    let mut definition_level_encoding = None;
    let mut repetition_level_encoding = None;
    let mut statistics = None;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => num_values = Some(t.read_i32()?),
            2 => encoding = Some(t.read_i32()?),
            3 => definition_level_encoding = Some(t.read_i32()?),
            4 => repetition_level_encoding = Some(t.read_i32()?),
            5 => statistics = Some(read_statistics(t)?),
            _ => t.skip(ftype)?,
        }
    }

    let missing =
        |what: &str| ParquetError::CorruptFile(format!("DataPageHeader missing {}", what));
    Ok(DataPageHeader {
        num_values: num_values.ok_or_else(|| missing("num_values"))?,
        encoding: encoding.ok_or_else(|| missing("encoding"))?,
        definition_level_encoding: definition_level_encoding
            .ok_or_else(|| missing("definition_level_encoding"))?,
        repetition_level_encoding: repetition_level_encoding
            .ok_or_else(|| missing("repetition_level_encoding"))?,
        statistics,
    })
}

fn read_dictionary_page_header(
    t: &mut ThriftReader,
) -> Result<DictionaryPageHeader, ParquetError> {
    let mut num_values = None;
    let mut encoding = None;
    let mut is_sorted = None;

    let mut last_id = 0i16;
    while let Some((ftype, id)) = t.read_field_begin(&mut last_id)? {
        match id {
            1 => num_values = Some(t.read_i32()?),
            2 => encoding = Some(t.read_i32()?),
            3 => is_sorted = Some(t.read_bool(ftype)?),
            _ => t.skip(ftype)?,
        }
    }

    Ok(DictionaryPageHeader {
        num_values: num_values.ok_or_else(|| {
            ParquetError::CorruptFile("DictionaryPageHeader missing num_values".into())
        })?,
        encoding: encoding.ok_or_else(|| {
            ParquetError::CorruptFile("DictionaryPageHeader missing encoding".into())
        })?,
        is_sorted,
    })
}
