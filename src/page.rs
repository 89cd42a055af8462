//! The Page Engine (spec.md §4.5): builds V1/V2 data pages from a leaf
//! column's buffered `(value, rLevel, dLevel)` triples, and decodes them
//! back on read. Compression and per-page statistics are delegated to the
//! `Codec` capability and `stats::ColumnStats` respectively; this module
//! only owns page framing and the paging-size policy.

use crate::codec::Codec;
use crate::error::{ParquetCoreError, Result};
use crate::format::{DataPageHeader, DataPageHeaderV2, Encoding, PageHeader, PageHeaderVariant, PageType, Statistics};
use crate::levels::{bit_width, rle_hybrid_decode, rle_hybrid_encode};
use crate::plain::{decode_plain_values, encode_plain_values};
use crate::schema::PrimitiveType;
use crate::stats::ColumnStats;
use crate::value::Value;

/// A fully encoded page, ready to be written after its preceding sibling.
pub struct EncodedPage {
    pub header_bytes: Vec<u8>,
    pub body: Vec<u8>,
    pub stats: ColumnStats,
    pub num_values: i32,
    /// Uncompressed body size, as recorded in the page header (spec.md
    /// §4.6 `total_uncompressed_size` is a sum of these across a chunk).
    pub uncompressed_size: i32,
}

impl EncodedPage {
    pub fn total_len(&self) -> usize {
        self.header_bytes.len() + self.body.len()
    }
}

/// Splits one flushed leaf column's buffered triples into page-sized
/// slices (spec.md §4.5 "Paging policy"): a flush is triggered once the
/// buffered *uncompressed* body would exceed `page_size_target`, and every
/// non-empty column chunk gets at least one page. A value is never split
/// across the returned slices.
pub struct PageSlice {
    pub dl_range: std::ops::Range<usize>,
    pub value_range: std::ops::Range<usize>,
}

pub fn plan_pages(
    values: &[Value],
    dls: &[i16],
    max_dl: i16,
    primitive: PrimitiveType,
    page_size_target: usize,
) -> Vec<PageSlice> {
    let num_slots = if max_dl > 0 { dls.len() } else { values.len() };
    if num_slots == 0 {
        return vec![];
    }

    let mut slices = Vec::new();
    let mut slot_start = 0usize;
    let mut value_start = 0usize;
    let mut running_bytes = 0usize;
    let mut value_idx = 0usize;

    for slot in 0..num_slots {
        let present = if max_dl > 0 { dls[slot] == max_dl } else { true };
        let slot_bytes = if present {
            let size = plain_value_size(&values[value_idx], primitive);
            value_idx += 1;
            size
        } else {
            0
        } + 2; // amortized level-stream overhead per slot

        if running_bytes > 0 && running_bytes + slot_bytes > page_size_target && slot > slot_start {
            slices.push(PageSlice {
                dl_range: slot_start..slot,
                value_range: value_start..(value_idx - present as usize),
            });
            slot_start = slot;
            value_start = value_idx - present as usize;
            running_bytes = 0;
        }
        running_bytes += slot_bytes;
    }

    slices.push(PageSlice {
        dl_range: slot_start..num_slots,
        value_range: value_start..value_idx,
    });
    slices
}

/// `num_slots - num_present`, surfaced as a `FormatError` rather than
/// panicking/wrapping if `num_present` ever exceeds `num_slots` (a
/// dl_range/value_range mismatch from the page-slicing caller, spec.md §7
/// "all errors surface at the nearest operation boundary").
fn num_nulls_of(num_slots: usize, num_present: usize) -> Result<usize> {
    num_slots
        .checked_sub(num_present)
        .ok_or_else(|| ParquetCoreError::format("page has more present values than slots"))
}

fn plain_value_size(value: &Value, primitive: PrimitiveType) -> usize {
    match primitive {
        PrimitiveType::ByteArray => match value {
            Value::Bytes(b) => 4 + b.len(),
            _ => 4,
        },
        _ => primitive.fixed_plain_width().unwrap_or(1),
    }
}

/// Builds one page (V1 or V2, per `use_v2`) covering `values`/the `dl_range`
/// slot window of `dls`/`rls`.
#[allow(clippy::too_many_arguments)]
pub fn build_page(
    values: &[Value],
    dls: &[i16],
    rls: &[i16],
    max_dl: i16,
    max_rl: i16,
    primitive: PrimitiveType,
    type_length: Option<i32>,
    codec: &dyn Codec,
    codec_id: i32,
    use_v2: bool,
) -> Result<EncodedPage> {
    let mut stats = ColumnStats::new();
    for v in values {
        stats.observe(v);
    }
    let num_slots = if max_dl > 0 { dls.len() } else { values.len() };
    let num_nulls = num_nulls_of(num_slots, values.len())?;
    for _ in 0..num_nulls {
        stats.observe_null();
    }

    if use_v2 {
        build_page_v2(values, dls, rls, max_dl, max_rl, primitive, type_length, codec, codec_id, stats)
    } else {
        build_page_v1(values, dls, rls, max_dl, max_rl, primitive, type_length, codec, codec_id, stats)
    }
}

#[allow(clippy::too_many_arguments)]
fn build_page_v1(
    values: &[Value],
    dls: &[i16],
    rls: &[i16],
    max_dl: i16,
    max_rl: i16,
    primitive: PrimitiveType,
    type_length: Option<i32>,
    codec: &dyn Codec,
    codec_id: i32,
    stats: ColumnStats,
) -> Result<EncodedPage> {
    let num_slots = if max_dl > 0 { dls.len() } else { values.len() };
    let mut body = Vec::new();

    if max_rl > 0 {
        let width = bit_width(max_rl as i64);
        let rl32: Vec<i32> = rls.iter().map(|&v| v as i32).collect();
        let encoded = rle_hybrid_encode(&rl32, width);
        body.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        body.extend_from_slice(&encoded);
    }
    if max_dl > 0 {
        let width = bit_width(max_dl as i64);
        let dl32: Vec<i32> = dls.iter().map(|&v| v as i32).collect();
        let encoded = rle_hybrid_encode(&dl32, width);
        body.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        body.extend_from_slice(&encoded);
    }
    body.extend_from_slice(&encode_plain_values(values, primitive, type_length)?);

    let compressed = codec.compress(&body)?;
    let statistics = Statistics::from_column_stats(&stats, primitive, type_length)?;

    let header = PageHeader {
        page_type_id: PageType::DataPage.id(),
        uncompressed_page_size: body.len() as i32,
        compressed_page_size: compressed.len() as i32,
        variant: PageHeaderVariant::V1(DataPageHeader {
            num_values: num_slots as i32,
            encoding_id: Encoding::Plain.id(),
            definition_level_encoding_id: Encoding::Rle.id(),
            repetition_level_encoding_id: Encoding::Rle.id(),
            statistics: Some(statistics),
        }),
    };
    let _ = codec_id;

    Ok(EncodedPage {
        header_bytes: header.to_bytes(),
        body: compressed,
        stats,
        num_values: num_slots as i32,
        uncompressed_size: body.len() as i32,
    })
}

#[allow(clippy::too_many_arguments)]
fn build_page_v2(
    values: &[Value],
    dls: &[i16],
    rls: &[i16],
    max_dl: i16,
    max_rl: i16,
    primitive: PrimitiveType,
    type_length: Option<i32>,
    codec: &dyn Codec,
    codec_id: i32,
    stats: ColumnStats,
) -> Result<EncodedPage> {
    let num_slots = if max_dl > 0 { dls.len() } else { values.len() };
    let num_nulls = num_nulls_of(num_slots, values.len())?;
    let num_rows = if max_rl > 0 {
        rls.iter().filter(|&&r| r == 0).count().max(1)
    } else {
        num_slots
    };

    let mut rl_bytes = Vec::new();
    if max_rl > 0 {
        let width = bit_width(max_rl as i64);
        let rl32: Vec<i32> = rls.iter().map(|&v| v as i32).collect();
        rl_bytes = rle_hybrid_encode(&rl32, width);
    }
    let mut dl_bytes = Vec::new();
    if max_dl > 0 {
        let width = bit_width(max_dl as i64);
        let dl32: Vec<i32> = dls.iter().map(|&v| v as i32).collect();
        dl_bytes = rle_hybrid_encode(&dl32, width);
    }
    let value_bytes = encode_plain_values(values, primitive, type_length)?;
    let compressed_values = codec.compress(&value_bytes)?;

    let mut body = Vec::with_capacity(rl_bytes.len() + dl_bytes.len() + compressed_values.len());
    body.extend_from_slice(&rl_bytes);
    body.extend_from_slice(&dl_bytes);
    body.extend_from_slice(&compressed_values);

    let uncompressed_page_size = (rl_bytes.len() + dl_bytes.len() + value_bytes.len()) as i32;
    let compressed_page_size = body.len() as i32;
    let statistics = Statistics::from_column_stats(&stats, primitive, type_length)?;

    let header = PageHeader {
        page_type_id: PageType::DataPageV2.id(),
        uncompressed_page_size,
        compressed_page_size,
        variant: PageHeaderVariant::V2(DataPageHeaderV2 {
            num_values: num_slots as i32,
            num_nulls: num_nulls as i32,
            num_rows: num_rows as i32,
            encoding_id: Encoding::Plain.id(),
            definition_levels_byte_length: dl_bytes.len() as i32,
            repetition_levels_byte_length: rl_bytes.len() as i32,
            is_compressed: true,
            statistics: Some(statistics),
        }),
    };
    let _ = codec_id;

    Ok(EncodedPage {
        header_bytes: header.to_bytes(),
        body,
        stats,
        num_values: num_slots as i32,
        uncompressed_size,
    })
}

/// One page's decoded leaf-column triples.
pub struct DecodedPage {
    pub values: Vec<Value>,
    pub dls: Vec<i16>,
    pub rls: Vec<i16>,
}

pub fn decode_page(
    header: &PageHeader,
    body: &[u8],
    max_dl: i16,
    max_rl: i16,
    primitive: PrimitiveType,
    type_length: Option<i32>,
    codec: &dyn Codec,
) -> Result<DecodedPage> {
    match &header.variant {
        PageHeaderVariant::V1(dph) => {
            let uncompressed = codec.decompress(body, header.uncompressed_page_size as usize)?;
            let mut pos = 0usize;

            let rls = if max_rl > 0 {
                let len = read_u32_le(&uncompressed, &mut pos)?;
                let width = bit_width(max_rl as i64);
                let (vals, _) = rle_hybrid_decode(slice(&uncompressed, pos, len)?, width, dph.num_values as usize)?;
                pos += len;
                vals.into_iter().map(|v| v as i16).collect()
            } else {
                Vec::new()
            };

            let dls = if max_dl > 0 {
                let len = read_u32_le(&uncompressed, &mut pos)?;
                let width = bit_width(max_dl as i64);
                let (vals, _) = rle_hybrid_decode(slice(&uncompressed, pos, len)?, width, dph.num_values as usize)?;
                pos += len;
                vals.into_iter().map(|v| v as i16).collect()
            } else {
                vec![0i16; dph.num_values as usize]
            };

            let num_present = count_present(&dls, max_dl, dph.num_values as usize);
            let values = decode_plain_values(&uncompressed[pos..], primitive, type_length, num_present)?;
            Ok(DecodedPage { values, dls, rls })
        }
        PageHeaderVariant::V2(dph2) => {
            let mut pos = 0usize;
            let rls = if max_rl > 0 {
                let len = dph2.repetition_levels_byte_length as usize;
                let width = bit_width(max_rl as i64);
                let (vals, _) = rle_hybrid_decode(slice(body, pos, len)?, width, dph2.num_values as usize)?;
                pos += len;
                vals.into_iter().map(|v| v as i16).collect()
            } else {
                Vec::new()
            };
            let dls = if max_dl > 0 {
                let len = dph2.definition_levels_byte_length as usize;
                let width = bit_width(max_dl as i64);
                let (vals, _) = rle_hybrid_decode(slice(body, pos, len)?, width, dph2.num_values as usize)?;
                pos += len;
                vals.into_iter().map(|v| v as i16).collect()
            } else {
                vec![0i16; dph2.num_values as usize]
            };

            let value_region = &body[pos..];
            let num_present = count_present(&dls, max_dl, dph2.num_values as usize);
            let value_bytes = if dph2.is_compressed {
                let uncompressed_values_len = header.uncompressed_page_size as usize
                    - dph2.definition_levels_byte_length as usize
                    - dph2.repetition_levels_byte_length as usize;
                codec.decompress(value_region, uncompressed_values_len)?
            } else {
                value_region.to_vec()
            };
            let values = decode_plain_values(&value_bytes, primitive, type_length, num_present)?;
            Ok(DecodedPage { values, dls, rls })
        }
    }
}

fn count_present(dls: &[i16], max_dl: i16, num_values: usize) -> usize {
    if max_dl > 0 {
        dls.iter().filter(|&&d| d == max_dl).count()
    } else {
        num_values
    }
}

fn read_u32_le(bytes: &[u8], pos: &mut usize) -> Result<usize> {
    let b = slice(bytes, *pos, 4)?;
    *pos += 4;
    Ok(u32::from_le_bytes(b.try_into().unwrap()) as usize)
}

fn slice(bytes: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    bytes
        .get(start..start + len)
        .ok_or_else(|| ParquetCoreError::format("truncated page body"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Uncompressed;

    #[test]
    fn v1_page_roundtrips_required_leaf() {
        let values = vec![Value::I32(1), Value::I32(2), Value::I32(3)];
        let codec = Uncompressed;
        let page = build_page(&values, &[], &[], 0, 0, PrimitiveType::Int32, None, &codec, 0, false).unwrap();
        let (header, consumed) = PageHeader::from_bytes(&page.header_bytes).unwrap();
        assert_eq!(consumed, page.header_bytes.len());
        let decoded = decode_page(&header, &page.body, 0, 0, PrimitiveType::Int32, None, &codec).unwrap();
        assert_eq!(decoded.values, values);
    }

    #[test]
    fn v1_page_roundtrips_optional_leaf_with_nulls() {
        let values = vec![Value::I32(1), Value::I32(3)];
        let dls = vec![1i16, 0, 1];
        let codec = Uncompressed;
        let page = build_page(&values, &dls, &[], 1, 0, PrimitiveType::Int32, None, &codec, 0, false).unwrap();
        let (header, _) = PageHeader::from_bytes(&page.header_bytes).unwrap();
        let decoded = decode_page(&header, &page.body, 1, 0, PrimitiveType::Int32, None, &codec).unwrap();
        assert_eq!(decoded.values, values);
        assert_eq!(decoded.dls, dls);
    }

    #[test]
    fn v2_page_keeps_levels_uncompressed() {
        let values = vec![Value::I32(1), Value::I32(3)];
        let dls = vec![1i16, 0, 1];
        let rls = vec![0i16, 0, 1];
        let codec = Uncompressed;
        let page = build_page(&values, &dls, &rls, 1, 1, PrimitiveType::Int32, None, &codec, 0, true).unwrap();
        let (header, _) = PageHeader::from_bytes(&page.header_bytes).unwrap();
        let decoded = decode_page(&header, &page.body, 1, 1, PrimitiveType::Int32, None, &codec).unwrap();
        assert_eq!(decoded.values, values);
        assert_eq!(decoded.dls, dls);
        assert_eq!(decoded.rls, rls);
        match header.variant {
            PageHeaderVariant::V2(dph2) => assert_eq!(dph2.num_nulls, 1),
            PageHeaderVariant::V1(_) => panic!("expected V2"),
        }
    }

    #[test]
    fn plan_pages_splits_large_columns() {
        let values: Vec<Value> = (0..1000).map(Value::I32).collect();
        let slices = plan_pages(&values, &[], 0, PrimitiveType::Int32, 256);
        assert!(slices.len() > 1, "expected more than one page with a small page size target");
        let total: usize = slices.iter().map(|s| s.value_range.len()).sum();
        assert_eq!(total, values.len());
    }

    #[test]
    fn plan_pages_produces_one_page_for_small_columns() {
        let values = vec![Value::I32(1), Value::I32(2)];
        let slices = plan_pages(&values, &[], 0, PrimitiveType::Int32, 1 << 20);
        assert_eq!(slices.len(), 1);
    }
}
