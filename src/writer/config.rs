//! Writer configuration (spec.md §6 "Writer configuration"): the option
//! table as a plain struct with the documented defaults, rather than a
//! builder — mirrors how `WriterConfig`-shaped option structs land as plain
//! `Default`-able structs elsewhere in this corpus.

use crate::format::CompressionCodec;

/// A bloom filter spec for one column (spec.md §4.6, §6): the writer only
/// reserves `num_filter_bytes` and records the offset, it never builds the
/// filter itself (out of scope, per spec.md §1).
#[derive(Debug, Clone)]
pub struct BloomFilterSpec {
    /// Dotted leaf path, e.g. `"stock.q"`.
    pub column: String,
    pub num_filter_bytes: i32,
}

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub use_data_page_v2: bool,
    /// Target uncompressed body size per page, in bytes.
    pub page_size: usize,
    /// Target buffered uncompressed size per row group, in bytes.
    pub row_group_size: usize,
    /// Default compression inherited by leaves that don't declare their own.
    pub compression: CompressionCodec,
    pub bloom_filters: Vec<BloomFilterSpec>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            use_data_page_v2: false,
            page_size: 1 << 20,
            row_group_size: 128 << 20,
            compression: CompressionCodec::Uncompressed,
            bloom_filters: Vec::new(),
        }
    }
}
