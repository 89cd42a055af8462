//! The `Codec` capability (spec.md §1): compression/decompression of a
//! page's body bytes. Treated as an external collaborator — this crate only
//! needs a `compress`/`decompress` pair per `CompressionCodec`, wired to the
//! same crates the teacher's `parquet` dependency feature-gates
//! (`snap`, `flate2`, `brotli`, `lz4_flex`, `zstd`).

use crate::error::{ParquetCoreError, Result};
use crate::format::CompressionCodec;

/// A compression capability, injected into the writer/reader rather than
/// looked up globally (Design Note "Ownership").
pub trait Codec {
    fn compress(&self, uncompressed: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>>;
}

/// Resolves the crate's built-in `Codec` for a `CompressionCodec`, gated by
/// the matching Cargo feature. Unavailable features fail as a `CodecError`
/// rather than silently falling back to another codec.
pub fn codec_for(kind: CompressionCodec) -> Result<Box<dyn Codec>> {
    Ok(match kind {
        CompressionCodec::Uncompressed => Box::new(Uncompressed),
        #[cfg(feature = "snap")]
        CompressionCodec::Snappy => Box::new(SnappyCodec),
        #[cfg(not(feature = "snap"))]
        CompressionCodec::Snappy => return Err(unavailable("SNAPPY", "snap")),
        #[cfg(feature = "flate2")]
        CompressionCodec::Gzip => Box::new(GzipCodec),
        #[cfg(not(feature = "flate2"))]
        CompressionCodec::Gzip => return Err(unavailable("GZIP", "flate2")),
        #[cfg(feature = "brotli")]
        CompressionCodec::Brotli => Box::new(BrotliCodec),
        #[cfg(not(feature = "brotli"))]
        CompressionCodec::Brotli => return Err(unavailable("BROTLI", "brotli")),
        #[cfg(feature = "lz4_flex")]
        CompressionCodec::Lz4Raw => Box::new(Lz4RawCodec),
        #[cfg(not(feature = "lz4_flex"))]
        CompressionCodec::Lz4Raw => return Err(unavailable("LZ4_RAW", "lz4_flex")),
        #[cfg(feature = "zstd")]
        CompressionCodec::Zstd => Box::new(ZstdCodec),
        #[cfg(not(feature = "zstd"))]
        CompressionCodec::Zstd => return Err(unavailable("ZSTD", "zstd")),
    })
}

#[allow(dead_code)]
fn unavailable(name: &str, feature: &str) -> ParquetCoreError {
    ParquetCoreError::config(format!(
        "compression codec {name} requires the '{feature}' feature"
    ))
}

pub struct Uncompressed;

impl Codec for Uncompressed {
    fn compress(&self, uncompressed: &[u8]) -> Result<Vec<u8>> {
        Ok(uncompressed.to_vec())
    }
    fn decompress(&self, compressed: &[u8], _uncompressed_size: usize) -> Result<Vec<u8>> {
        Ok(compressed.to_vec())
    }
}

#[cfg(feature = "snap")]
pub struct SnappyCodec;

#[cfg(feature = "snap")]
impl Codec for SnappyCodec {
    fn compress(&self, uncompressed: &[u8]) -> Result<Vec<u8>> {
        Ok(snap::raw::Encoder::new()
            .compress_vec(uncompressed)
            .map_err(|e| ParquetCoreError::codec(format!("snappy compress: {e}")))?)
    }
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; uncompressed_size];
        let n = snap::raw::Decoder::new()
            .decompress(compressed, &mut out)
            .map_err(|e| ParquetCoreError::codec(format!("snappy decompress: {e}")))?;
        out.truncate(n);
        Ok(out)
    }
}

#[cfg(feature = "flate2")]
pub struct GzipCodec;

#[cfg(feature = "flate2")]
impl Codec for GzipCodec {
    fn compress(&self, uncompressed: &[u8]) -> Result<Vec<u8>> {
        use std::io::Write;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(uncompressed)
            .map_err(|e| ParquetCoreError::codec(format!("gzip compress: {e}")))?;
        encoder
            .finish()
            .map_err(|e| ParquetCoreError::codec(format!("gzip compress: {e}")))
    }
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        use std::io::Read;
        let mut decoder = flate2::read::GzDecoder::new(compressed);
        let mut out = Vec::with_capacity(uncompressed_size);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| ParquetCoreError::codec(format!("gzip decompress: {e}")))?;
        Ok(out)
    }
}

#[cfg(feature = "brotli")]
pub struct BrotliCodec;

#[cfg(feature = "brotli")]
impl Codec for BrotliCodec {
    fn compress(&self, uncompressed: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let params = brotli::enc::BrotliEncoderParams::default();
        brotli::BrotliCompress(&mut std::io::Cursor::new(uncompressed), &mut out, &params)
            .map_err(|e| ParquetCoreError::codec(format!("brotli compress: {e}")))?;
        Ok(out)
    }
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(uncompressed_size);
        brotli::BrotliDecompress(&mut std::io::Cursor::new(compressed), &mut out)
            .map_err(|e| ParquetCoreError::codec(format!("brotli decompress: {e}")))?;
        Ok(out)
    }
}

#[cfg(feature = "lz4_flex")]
pub struct Lz4RawCodec;

#[cfg(feature = "lz4_flex")]
impl Codec for Lz4RawCodec {
    fn compress(&self, uncompressed: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::block::compress(uncompressed))
    }
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        lz4_flex::block::decompress(compressed, uncompressed_size)
            .map_err(|e| ParquetCoreError::codec(format!("lz4 decompress: {e}")))
    }
}

#[cfg(feature = "zstd")]
pub struct ZstdCodec;

#[cfg(feature = "zstd")]
impl Codec for ZstdCodec {
    fn compress(&self, uncompressed: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(uncompressed, 0)
            .map_err(|e| ParquetCoreError::codec(format!("zstd compress: {e}")))
    }
    fn decompress(&self, compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        zstd::bulk::decompress(compressed, uncompressed_size)
            .map_err(|e| ParquetCoreError::codec(format!("zstd decompress: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_roundtrip() {
        let codec = codec_for(CompressionCodec::Uncompressed).unwrap();
        let data = b"hello world".to_vec();
        let compressed = codec.compress(&data).unwrap();
        let decompressed = codec.decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[cfg(feature = "snap")]
    #[test]
    fn snappy_roundtrip() {
        let codec = codec_for(CompressionCodec::Snappy).unwrap();
        let data = b"hello world, hello world, hello world".to_vec();
        let compressed = codec.compress(&data).unwrap();
        let decompressed = codec.decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_roundtrip() {
        let codec = codec_for(CompressionCodec::Zstd).unwrap();
        let data = b"hello world, hello world, hello world".to_vec();
        let compressed = codec.compress(&data).unwrap();
        let decompressed = codec.decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }
}
