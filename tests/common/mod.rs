#![allow(dead_code)] // each test binary uses its own slice of the builder

//! Shared fixture builder for the integration suite.
//!
//! Assembles real single-file Parquet fixtures: page payloads, compact
//! Thrift page headers and footer, magic bytes and trailer. Level and
//! index streams are produced with a deliberately independent bit-packer
//! so the crate's own RLE encoder is never used to test its decoder.

use minparquet::enums::PhysicalType;

// compact protocol type nibbles used by the writer
const T_I32: u8 = 5;
const T_I64: u8 = 6;
const T_BINARY: u8 = 8;
const T_LIST: u8 = 9;
const T_STRUCT: u8 = 12;

pub const CODEC_UNCOMPRESSED: i32 = 0;
pub const CODEC_SNAPPY: i32 = 1;

pub const ENC_PLAIN: i32 = 0;
pub const ENC_PLAIN_DICTIONARY: i32 = 2;
pub const ENC_RLE_DICTIONARY: i32 = 8;

// --------------------- Column fixtures ----------------------------- //

/// One column chunk of a fixture row group: schema facts plus fully
/// assembled page blobs (dictionary page first when present).
pub struct FixtureColumn {
    pub name: &'static str,
    pub physical_type: PhysicalType,
    pub type_length: Option<i32>,
    pub optional: bool,
    pub codec: i32,
    pub has_dict: bool,
    pub pages: Vec<Vec<u8>>,
    pub num_values: i64,
    pub null_count: Option<i64>,
    /// Overrides the REQUIRED/OPTIONAL integer in the schema element.
    pub raw_repetition: Option<i32>,
    /// Writes a `file_path` on the column chunk (always rejected).
    pub file_path: Option<&'static str>,
}

impl FixtureColumn {
    pub fn new(name: &'static str, physical_type: PhysicalType) -> Self {
        Self {
            name,
            physical_type,
            type_length: None,
            optional: false,
            codec: CODEC_UNCOMPRESSED,
            has_dict: false,
            pages: Vec::new(),
            num_values: 0,
            null_count: None,
            raw_repetition: None,
            file_path: None,
        }
    }
}

pub struct RowGroupFixture {
    pub num_rows: i64,
    pub columns: Vec<FixtureColumn>,
}

/// Assemble a complete single-row-group file.
pub fn build_file(num_rows: i64, columns: Vec<FixtureColumn>) -> Vec<u8> {
    build_file_multi(vec![RowGroupFixture { num_rows, columns }])
}

/// Assemble a complete file from one or more row groups. The schema is
/// taken from the first group's columns.
pub fn build_file_multi(groups: Vec<RowGroupFixture>) -> Vec<u8> {
    build_file_opts(groups, false)
}

/// Like [`build_file_multi`] but optionally stamps an empty
/// `encryption_algorithm` union into the footer.
pub fn build_file_opts(groups: Vec<RowGroupFixture>, encrypted: bool) -> Vec<u8> {
    let mut out = b"PAR1".to_vec();

    // lay chunks down in file order, remembering offsets for the footer
    let mut chunk_offsets: Vec<Vec<(i64, i64, i64)>> = Vec::new();
    for group in &groups {
        let mut offsets = Vec::new();
        for col in &group.columns {
            let start = out.len() as i64;
            let first_page_len = col.pages.first().map(|p| p.len() as i64).unwrap_or(0);
            let total: i64 = col.pages.iter().map(|p| p.len() as i64).sum();
            for page in &col.pages {
                out.extend_from_slice(page);
            }
            offsets.push((start, first_page_len, total));
        }
        chunk_offsets.push(offsets);
    }

    let footer = file_metadata_bytes(&groups, &chunk_offsets, encrypted);
    out.extend_from_slice(&footer);
    out.extend_from_slice(&(footer.len() as u32).to_le_bytes());
    out.extend_from_slice(b"PAR1");
    out
}

// --------------------- Page assembly ------------------------------- //

/// Header + payload for a v1 data page.
pub fn data_page(num_values: i32, encoding: i32, payload: &[u8], codec: i32) -> Vec<u8> {
    data_page_ext(0, num_values, encoding, 3, payload, codec)
}

/// Data page with explicit page type and definition-level encoding, for
/// rejection tests (v2 page type, non-RLE levels).
pub fn data_page_ext(
    page_type: i32,
    num_values: i32,
    encoding: i32,
    def_encoding: i32,
    payload: &[u8],
    codec: i32,
) -> Vec<u8> {
    let compressed = compress(payload, codec);
    let mut out = Vec::new();
    let mut last = 0i16;
    field_i32(&mut out, &mut last, 1, page_type);
    field_i32(&mut out, &mut last, 2, payload.len() as i32);
    field_i32(&mut out, &mut last, 3, compressed.len() as i32);
    field_header(&mut out, &mut last, T_STRUCT, 5);
    {
        let mut l = 0i16;
        field_i32(&mut out, &mut l, 1, num_values);
        field_i32(&mut out, &mut l, 2, encoding);
        field_i32(&mut out, &mut l, 3, def_encoding);
        field_i32(&mut out, &mut l, 4, 3); // repetition levels: RLE
        out.push(0);
    }
    out.push(0);
    out.extend_from_slice(&compressed);
    out
}

/// Header + payload for a dictionary page.
pub fn dict_page(num_values: i32, encoding: i32, payload: &[u8], codec: i32) -> Vec<u8> {
    let compressed = compress(payload, codec);
    let mut out = Vec::new();
    let mut last = 0i16;
    field_i32(&mut out, &mut last, 1, 2); // DICTIONARY_PAGE
    field_i32(&mut out, &mut last, 2, payload.len() as i32);
    field_i32(&mut out, &mut last, 3, compressed.len() as i32);
    field_header(&mut out, &mut last, T_STRUCT, 7);
    {
        let mut l = 0i16;
        field_i32(&mut out, &mut l, 1, num_values);
        field_i32(&mut out, &mut l, 2, encoding);
        out.push(0);
    }
    out.push(0);
    out.extend_from_slice(&compressed);
    out
}

fn compress(payload: &[u8], codec: i32) -> Vec<u8> {
    match codec {
        CODEC_UNCOMPRESSED => payload.to_vec(),
        CODEC_SNAPPY => snap::raw::Encoder::new()
            .compress_vec(payload)
            .expect("snappy fixture compression"),
        other => panic!("fixture codec {} not supported", other),
    }
}

// --------------------- Payload encoders ---------------------------- //

/// Length-prefixed RLE definition levels, one bit per row.
pub fn def_levels_payload(defined: &[bool]) -> Vec<u8> {
    let levels: Vec<u32> = defined.iter().map(|&b| b as u32).collect();
    let stream = bitpack_literal_run(&levels, 1);
    let mut out = (stream.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&stream);
    out
}

/// Dictionary index stream: leading bit-width byte plus packed indices.
pub fn dict_indices_payload(indices: &[u32], bit_width: u8) -> Vec<u8> {
    let mut out = vec![bit_width];
    if bit_width > 0 {
        out.extend_from_slice(&bitpack_literal_run(indices, bit_width as u32));
    }
    out
}

/// One bit-packed literal run: varint group header, then groups of 8
/// values LSB-first. Independent of the crate's encoder on purpose.
fn bitpack_literal_run(values: &[u32], bit_width: u32) -> Vec<u8> {
    let groups = (values.len() + 7) / 8;
    let mut out = Vec::new();
    write_varint(&mut out, ((groups as u64) << 1) | 1);
    let mut acc = 0u64;
    let mut nbits = 0u32;
    for i in 0..groups * 8 {
        let v = values.get(i).copied().unwrap_or(0) as u64;
        acc |= v << nbits;
        nbits += bit_width;
        while nbits >= 8 {
            out.push((acc & 0xff) as u8);
            acc >>= 8;
            nbits -= 8;
        }
    }
    out
}

pub fn plain_i32(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_i64(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_f64(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Booleans bit-packed LSB-first, the Parquet PLAIN layout.
pub fn plain_bools(values: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; (values.len() + 7) / 8];
    for (i, &b) in values.iter().enumerate() {
        if b {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    out
}

/// Length-prefixed byte arrays.
pub fn plain_byte_array(values: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for v in values {
        out.extend_from_slice(&(v.len() as u32).to_le_bytes());
        out.extend_from_slice(v);
    }
    out
}

/// Fixed-length values, raw concatenation.
pub fn plain_flba(values: &[&[u8]]) -> Vec<u8> {
    values.iter().flat_map(|v| v.iter().copied()).collect()
}

// --------------------- Footer writer ------------------------------- //

fn file_metadata_bytes(
    groups: &[RowGroupFixture],
    chunk_offsets: &[Vec<(i64, i64, i64)>],
    encrypted: bool,
) -> Vec<u8> {
    let schema_cols = &groups[0].columns;
    let total_rows: i64 = groups.iter().map(|g| g.num_rows).sum();

    let mut out = Vec::new();
    let mut last = 0i16;
    field_i32(&mut out, &mut last, 1, 1); // version

    // schema: root followed by one leaf per column
    field_header(&mut out, &mut last, T_LIST, 2);
    list_header(&mut out, T_STRUCT, 1 + schema_cols.len());
    {
        let mut l = 0i16;
        field_string(&mut out, &mut l, 4, "schema");
        field_i32(&mut out, &mut l, 5, schema_cols.len() as i32);
        out.push(0);
    }
    for col in schema_cols {
        let mut l = 0i16;
        field_i32(&mut out, &mut l, 1, col.physical_type.as_i32());
        if let Some(tl) = col.type_length {
            field_i32(&mut out, &mut l, 2, tl);
        }
        let repetition = col
            .raw_repetition
            .unwrap_or(if col.optional { 1 } else { 0 });
        field_i32(&mut out, &mut l, 3, repetition);
        field_string(&mut out, &mut l, 4, col.name);
        out.push(0);
    }

    field_i64(&mut out, &mut last, 3, total_rows);

    // row groups
    field_header(&mut out, &mut last, T_LIST, 4);
    list_header(&mut out, T_STRUCT, groups.len());
    for (group, offsets) in groups.iter().zip(chunk_offsets) {
        let mut l = 0i16;
        field_header(&mut out, &mut l, T_LIST, 1);
        list_header(&mut out, T_STRUCT, group.columns.len());
        for (col, &(start, first_page_len, total)) in group.columns.iter().zip(offsets) {
            let mut lc = 0i16;
            if let Some(path) = col.file_path {
                field_string(&mut out, &mut lc, 1, path);
            }
            field_i64(&mut out, &mut lc, 2, start);
            field_header(&mut out, &mut lc, T_STRUCT, 3);
            {
                let mut lm = 0i16;
                field_i32(&mut out, &mut lm, 1, col.physical_type.as_i32());
                field_header(&mut out, &mut lm, T_LIST, 2);
                list_header(&mut out, T_I32, 1);
                write_zigzag(&mut out, ENC_PLAIN as i64);
                field_header(&mut out, &mut lm, T_LIST, 3);
                list_header(&mut out, T_BINARY, 1);
                write_varint(&mut out, col.name.len() as u64);
                out.extend_from_slice(col.name.as_bytes());
                field_i32(&mut out, &mut lm, 4, col.codec);
                field_i64(&mut out, &mut lm, 5, col.num_values);
                field_i64(&mut out, &mut lm, 6, total);
                field_i64(&mut out, &mut lm, 7, total);
                let data_page_offset = if col.has_dict {
                    start + first_page_len
                } else {
                    start
                };
                field_i64(&mut out, &mut lm, 9, data_page_offset);
                if col.has_dict {
                    field_i64(&mut out, &mut lm, 11, start);
                }
                if let Some(null_count) = col.null_count {
                    field_header(&mut out, &mut lm, T_STRUCT, 12);
                    let mut ls = 0i16;
                    field_i64(&mut out, &mut ls, 3, null_count);
                    out.push(0);
                }
                out.push(0);
            }
            out.push(0);
        }
        field_i64(&mut out, &mut l, 2, offsets.iter().map(|o| o.2).sum());
        field_i64(&mut out, &mut l, 3, group.num_rows);
        out.push(0);
    }

    if encrypted {
        // empty encryption_algorithm union; presence is all that matters
        field_header(&mut out, &mut last, T_STRUCT, 8);
        out.push(0);
    }

    out.push(0); // end FileMetaData
    out
}

// --------------------- Compact thrift primitives -------------------- //

fn field_header(out: &mut Vec<u8>, last_id: &mut i16, ftype: u8, id: i16) {
    let delta = id - *last_id;
    if (1..=15).contains(&delta) {
        out.push(((delta as u8) << 4) | ftype);
    } else {
        out.push(ftype);
        write_zigzag(out, id as i64);
    }
    *last_id = id;
}

fn field_i32(out: &mut Vec<u8>, last_id: &mut i16, id: i16, v: i32) {
    field_header(out, last_id, T_I32, id);
    write_zigzag(out, v as i64);
}

fn field_i64(out: &mut Vec<u8>, last_id: &mut i16, id: i16, v: i64) {
    field_header(out, last_id, T_I64, id);
    write_zigzag(out, v);
}

fn field_string(out: &mut Vec<u8>, last_id: &mut i16, id: i16, s: &str) {
    field_header(out, last_id, T_BINARY, id);
    write_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn list_header(out: &mut Vec<u8>, etype: u8, len: usize) {
    if len < 15 {
        out.push(((len as u8) << 4) | etype);
    } else {
        out.push(0xf0 | etype);
        write_varint(out, len as u64);
    }
}

fn write_varint(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let b = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(b);
            return;
        }
        out.push(b | 0x80);
    }
}

fn write_zigzag(out: &mut Vec<u8>, v: i64) {
    write_varint(out, ((v << 1) ^ (v >> 63)) as u64);
}
