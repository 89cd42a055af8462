//! The `MetaCodec` capability (spec.md §1): `encode(meta) -> bytes` and
//! `decode(bytes) -> (meta, consumed_bytes)` for `FileMetaData`. Treated as
//! an external collaborator the writer/reader depend on through a trait,
//! not a concrete type, the same way `Codec` is (Design Note "Ownership").
//! `ThriftMetaCodec` is this crate's own implementation, over the
//! hand-rolled Thrift Compact Protocol in `thrift.rs`/`format.rs`.

use crate::error::Result;
use crate::format::FileMetaData;

pub trait MetaCodec {
    fn encode(&self, meta: &FileMetaData) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<(FileMetaData, usize)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThriftMetaCodec;

impl MetaCodec for ThriftMetaCodec {
    fn encode(&self, meta: &FileMetaData) -> Result<Vec<u8>> {
        Ok(meta.to_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<(FileMetaData, usize)> {
        let meta = FileMetaData::from_bytes(bytes)?;
        // `FileMetaData::from_bytes` consumes the whole given slice; the
        // footer length itself (read separately by the envelope reader)
        // tells the caller how many bytes that was.
        Ok((meta, bytes.len()))
    }
}
