//! Column chunk page scanning and decoding.
//!
//! A chunk is a contiguous run of pages: at most one dictionary page
//! followed by data pages. The scanner walks page headers through the
//! chunk's compressed-size budget, decompresses each payload, and decodes
//! values into the caller's column sink. Definition levels (for OPTIONAL
//! columns) gate every value read; undefined slots consume nothing from
//! the value stream except in the dictionary path, where indices for null
//! slots are skipped via the spaced decode.

use log::trace;

use crate::compression::{decompress, map_codec};
use crate::enums::{CompressionCodec, Encoding, PageType, PhysicalType};
use crate::error::ParquetError;
use crate::models::decoders::bitpack::{BitReader, FixedWidth};
use crate::models::decoders::rle::RleBpDecoder;
use crate::models::metadata::parquet::{parse_page_header, ColumnChunkMeta, PageHeader};
use crate::models::sinks::column_sink::{ColumnData, Int96, ResultColumn, StrRef};

/// Dictionary decoded from a chunk's dictionary page. String variants hold
/// references into a heap chunk already owned by the column sink, so
/// dropping the dictionary at the end of the chunk scan is always safe.
enum Dictionary {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int96(Vec<Int96>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    ByteArray(Vec<StrRef>),
}

/// Per-chunk scan state, reset for every column chunk.
pub(crate) struct ColumnScan {
    physical_type: PhysicalType,
    /// Schema type length, required for FIXED_LEN_BYTE_ARRAY.
    type_len: Option<usize>,
    /// OPTIONAL columns carry definition levels in every data page.
    has_def_levels: bool,
    codec: CompressionCodec,
    seen_dict: bool,
    dict: Option<Dictionary>,
    /// Rows already produced by earlier pages of this chunk.
    page_start_row: usize,
}

impl ColumnScan {
    pub(crate) fn new(
        physical_type: PhysicalType,
        type_len: Option<usize>,
        has_def_levels: bool,
        chunk: &ColumnChunkMeta,
    ) -> Result<Self, ParquetError> {
        Ok(Self {
            physical_type,
            type_len,
            has_def_levels,
            codec: map_codec(chunk.meta_data.codec)?,
            seen_dict: false,
            dict: None,
            page_start_row: 0,
        })
    }

    /// Walk every page in `chunk_buf` and decode into `result_col`.
    ///
    /// The loop invariant is that a page header starts at the cursor while
    /// budget remains; a header that fails to parse therefore surfaces as
    /// the underlying `CorruptFile`/`TruncatedInput` error.
    pub(crate) fn scan_pages(
        &mut self,
        chunk_buf: &[u8],
        result_col: &mut ResultColumn,
    ) -> Result<(), ParquetError> {
        let mut pos = 0usize;
        while pos < chunk_buf.len() {
            let (header, header_len) = parse_page_header(&chunk_buf[pos..])?;
            pos += header_len;

            let compressed_len = page_size(header.compressed_page_size, "compressed")?;
            let uncompressed_len = page_size(header.uncompressed_page_size, "uncompressed")?;
            if compressed_len > chunk_buf.len() - pos {
                return Err(ParquetError::TruncatedInput(format!(
                    "page payload of {} bytes exceeds the {} bytes left in its chunk",
                    compressed_len,
                    chunk_buf.len() - pos
                )));
            }
            let payload = &chunk_buf[pos..pos + compressed_len];
            let page = decompress(payload, self.codec, uncompressed_len)?;

            trace!(
                "page type={} compressed={} uncompressed={} at chunk offset {}",
                header.type_,
                compressed_len,
                uncompressed_len,
                pos - header_len
            );

            match PageType::from_i32(header.type_) {
                Some(PageType::DictionaryPage) => {
                    self.scan_dict_page(&header, page.as_ref(), result_col)?
                }
                Some(PageType::DataPage) => {
                    self.scan_data_page(&header, page.as_ref(), result_col)?
                }
                Some(PageType::DataPageV2) => {
                    return Err(ParquetError::UnsupportedFeature(
                        "v2 data pages are not supported".to_string(),
                    ));
                }
                // index pages and custom extensions carry no row data
                _ => {}
            }

            pos += compressed_len;
        }
        Ok(())
    }

    fn scan_dict_page(
        &mut self,
        header: &PageHeader,
        page: &[u8],
        result_col: &mut ResultColumn,
    ) -> Result<(), ParquetError> {
        let dict_header = match (&header.dictionary_page_header, &header.data_page_header) {
            (Some(d), None) => d,
            _ => {
                return Err(ParquetError::InconsistentDictionary(
                    "dictionary page header mismatch".to_string(),
                ));
            }
        };

        match Encoding::from_i32(dict_header.encoding) {
            Some(Encoding::Plain) | Some(Encoding::PlainDictionary) => {}
            _ => {
                return Err(ParquetError::UnsupportedEncoding(format!(
                    "dictionary page encoding {}",
                    dict_header.encoding
                )));
            }
        }

        if self.seen_dict {
            return Err(ParquetError::InconsistentDictionary(
                "multiple dictionary pages in one column chunk".to_string(),
            ));
        }
        self.seen_dict = true;

        let dict_size = page_size(dict_header.num_values, "dictionary entry count")?;
        let mut r = BitReader::new(page);

        self.dict = Some(match self.physical_type {
            PhysicalType::Boolean => {
                let mut values = Vec::with_capacity(dict_size);
                for _ in 0..dict_size {
                    values.push(r.read_fixed::<u8>()? != 0);
                }
                Dictionary::Boolean(values)
            }
            PhysicalType::Int32 => Dictionary::Int32(fill_dict(&mut r, dict_size)?),
            PhysicalType::Int64 => Dictionary::Int64(fill_dict(&mut r, dict_size)?),
            PhysicalType::Int96 => Dictionary::Int96(fill_dict(&mut r, dict_size)?),
            PhysicalType::Float => Dictionary::Float(fill_dict(&mut r, dict_size)?),
            PhysicalType::Double => Dictionary::Double(fill_dict(&mut r, dict_size)?),
            PhysicalType::ByteArray => {
                // string data can never outgrow the page's uncompressed size
                let chunk = result_col.heap.new_chunk(page.len());
                let mut values = Vec::with_capacity(dict_size);
                for _ in 0..dict_size {
                    let len = r.read_fixed::<u32>()? as usize;
                    let bytes = r.read_bytes(len)?;
                    values.push(result_col.heap.push_str(chunk, bytes));
                }
                Dictionary::ByteArray(values)
            }
            PhysicalType::FixedLenByteArray => {
                let type_len = self.require_type_len()?;
                let chunk = result_col.heap.new_chunk(page.len() + dict_size);
                let mut values = Vec::with_capacity(dict_size);
                for _ in 0..dict_size {
                    let bytes = r.read_bytes(type_len)?;
                    values.push(result_col.heap.push_str(chunk, bytes));
                }
                Dictionary::ByteArray(values)
            }
        });
        Ok(())
    }

    fn scan_data_page(
        &mut self,
        header: &PageHeader,
        page: &[u8],
        result_col: &mut ResultColumn,
    ) -> Result<(), ParquetError> {
        let data_header = match (&header.data_page_header, &header.dictionary_page_header) {
            (Some(d), None) => d,
            _ => {
                return Err(ParquetError::InconsistentDictionary(
                    "data page header mismatch".to_string(),
                ));
            }
        };
        if header.has_data_page_header_v2 {
            return Err(ParquetError::UnsupportedFeature(
                "v2 data pages are not supported".to_string(),
            ));
        }

        let num_values = page_size(data_header.num_values, "data page value count")?;
        let start = self.page_start_row;
        if num_values > result_col.defined.len() - start {
            return Err(ParquetError::CorruptFile(format!(
                "data pages hold more than the row group's {} rows",
                result_col.defined.len()
            )));
        }

        let mut r = BitReader::new(page);

        // definition levels first; REQUIRED columns are all-present
        if self.has_def_levels {
            match Encoding::from_i32(data_header.definition_level_encoding) {
                Some(Encoding::Rle) => {}
                _ => {
                    return Err(ParquetError::UnsupportedEncoding(format!(
                        "definition level encoding {}",
                        data_header.definition_level_encoding
                    )));
                }
            }
            let def_len = r.read_fixed::<u32>()? as usize;
            let def_payload = r.read_bytes(def_len)?;
            let mut levels = vec![0u32; num_values];
            RleBpDecoder::new(def_payload, 1)?.get_batch(&mut levels)?;
            for (slot, level) in result_col.defined[start..start + num_values]
                .iter_mut()
                .zip(&levels)
            {
                *slot = *level as u8;
            }
        } else {
            result_col.defined[start..start + num_values].fill(1);
        }

        match Encoding::from_i32(data_header.encoding) {
            Some(Encoding::Plain) => self.scan_data_page_plain(num_values, &mut r, result_col)?,
            Some(Encoding::PlainDictionary) | Some(Encoding::RleDictionary) => {
                self.scan_data_page_dict(num_values, &mut r, result_col)?
            }
            _ => {
                return Err(ParquetError::UnsupportedEncoding(format!(
                    "data page encoding {}",
                    data_header.encoding
                )));
            }
        }

        self.page_start_row += num_values;
        Ok(())
    }

    fn scan_data_page_plain(
        &self,
        num_values: usize,
        r: &mut BitReader,
        result_col: &mut ResultColumn,
    ) -> Result<(), ParquetError> {
        // the byte-array path owns its heap bookkeeping, handle it apart
        if matches!(result_col.data, ColumnData::ByteArray(_)) {
            return self.fill_strings_plain(num_values, r, result_col);
        }

        let start = self.page_start_row;
        let defined = &result_col.defined;
        match &mut result_col.data {
            ColumnData::Boolean(out) => {
                // bit-packed LSB-first; undefined slots consume no bits
                for i in 0..num_values {
                    if defined[start + i] == 0 {
                        continue;
                    }
                    out[start + i] = r.get_bits(1)? != 0;
                }
                Ok(())
            }
            ColumnData::Int32(out) => fill_values_plain(r, out, defined, start, num_values),
            ColumnData::Int64(out) => fill_values_plain(r, out, defined, start, num_values),
            ColumnData::Int96(out) => fill_values_plain(r, out, defined, start, num_values),
            ColumnData::Float(out) => fill_values_plain(r, out, defined, start, num_values),
            ColumnData::Double(out) => fill_values_plain(r, out, defined, start, num_values),
            ColumnData::ByteArray(_) => unreachable!("handled above"),
        }
    }

    /// PLAIN byte arrays: a fresh heap chunk per page, sized so the page's
    /// strings (plus NUL terminators for fixed-length values) always fit.
    fn fill_strings_plain(
        &self,
        num_values: usize,
        r: &mut BitReader,
        result_col: &mut ResultColumn,
    ) -> Result<(), ParquetError> {
        let start = self.page_start_row;
        let fixed_len = match self.physical_type {
            PhysicalType::FixedLenByteArray => Some(self.require_type_len()?),
            _ => None,
        };
        let capacity = r.remaining() + if fixed_len.is_some() { num_values } else { 0 };
        let chunk = result_col.heap.new_chunk(capacity);

        for i in 0..num_values {
            if result_col.defined[start + i] == 0 {
                continue;
            }
            let len = match fixed_len {
                Some(l) => l,
                None => r.read_fixed::<u32>()? as usize,
            };
            let bytes = r.read_bytes(len)?;
            let slot = result_col.heap.push_str(chunk, bytes);
            match &mut result_col.data {
                ColumnData::ByteArray(out) => out[start + i] = slot,
                _ => unreachable!("string fill on non-string column"),
            }
        }
        Ok(())
    }

    fn scan_data_page_dict(
        &self,
        num_values: usize,
        r: &mut BitReader,
        result_col: &mut ResultColumn,
    ) -> Result<(), ParquetError> {
        let dict = match &self.dict {
            Some(d) if self.seen_dict => d,
            _ => {
                return Err(ParquetError::InconsistentDictionary(
                    "dictionary-encoded data page without a dictionary page".to_string(),
                ));
            }
        };

        let start = self.page_start_row;
        let defined = &result_col.defined[start..start + num_values];

        // the index width is a single leading byte; zero means "all index 0"
        let bit_width = r.read_fixed::<u8>()? as u32;
        let mut offsets = vec![0u32; num_values];
        if bit_width > 0 {
            let payload = r.read_bytes(r.remaining())?;
            let mut dec = RleBpDecoder::new(payload, bit_width)?;
            let null_count = defined.iter().filter(|&&d| d == 0).count();
            if null_count > 0 {
                dec.get_batch_spaced(num_values, null_count, defined, &mut offsets)?;
            } else {
                dec.get_batch(&mut offsets)?;
            }
        }

        match (dict, &mut result_col.data) {
            (Dictionary::Int32(d), ColumnData::Int32(out)) => {
                fill_values_dict(d, &offsets, out, defined, start)?
            }
            (Dictionary::Int64(d), ColumnData::Int64(out)) => {
                fill_values_dict(d, &offsets, out, defined, start)?
            }
            (Dictionary::Int96(d), ColumnData::Int96(out)) => {
                fill_values_dict(d, &offsets, out, defined, start)?
            }
            (Dictionary::Float(d), ColumnData::Float(out)) => {
                fill_values_dict(d, &offsets, out, defined, start)?
            }
            (Dictionary::Double(d), ColumnData::Double(out)) => {
                fill_values_dict(d, &offsets, out, defined, start)?
            }
            (Dictionary::ByteArray(d), ColumnData::ByteArray(out)) => {
                for (i, slot) in out[start..start + num_values].iter_mut().enumerate() {
                    *slot = if defined[i] != 0 {
                        *d.get(offsets[i] as usize).ok_or_else(dict_index_error)?
                    } else {
                        StrRef::NULL
                    };
                }
            }
            _ => {
                return Err(ParquetError::UnsupportedType(format!(
                    "{:?} cannot be dictionary-decoded",
                    self.physical_type
                )));
            }
        }
        Ok(())
    }

    fn require_type_len(&self) -> Result<usize, ParquetError> {
        self.type_len.ok_or_else(|| {
            ParquetError::UnsupportedType(
                "FIXED_LEN_BYTE_ARRAY column without a type length".to_string(),
            )
        })
    }
}

/// Bounds-check a size field from a page header.
fn page_size(v: i32, what: &str) -> Result<usize, ParquetError> {
    usize::try_from(v)
        .map_err(|_| ParquetError::CorruptFile(format!("negative {} in page header", what)))
}

fn dict_index_error() -> ParquetError {
    ParquetError::CorruptFile("dictionary index out of range".to_string())
}

/// Copy one little-endian value per defined slot; nulls consume nothing.
fn fill_values_plain<T: FixedWidth>(
    r: &mut BitReader,
    out: &mut [T],
    defined: &[u8],
    start: usize,
    num_values: usize,
) -> Result<(), ParquetError> {
    for i in 0..num_values {
        if defined[start + i] == 0 {
            continue;
        }
        out[start + i] = r.read_fixed::<T>()?;
    }
    Ok(())
}

/// Look up one dictionary value per defined slot.
fn fill_values_dict<T: Copy>(
    dict: &[T],
    offsets: &[u32],
    out: &mut [T],
    defined: &[u8],
    start: usize,
) -> Result<(), ParquetError> {
    for (i, &offset) in offsets.iter().enumerate() {
        if defined[i] != 0 {
            out[start + i] = *dict.get(offset as usize).ok_or_else(dict_index_error)?;
        }
    }
    Ok(())
}

fn fill_dict<T: FixedWidth>(r: &mut BitReader, n: usize) -> Result<Vec<T>, ParquetError> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(r.read_fixed::<T>()?);
    }
    Ok(out)
}
