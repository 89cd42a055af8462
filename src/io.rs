//! `ByteSink`/`ByteSource` (spec.md §1): the transport capability the
//! writer/reader are generic over, so this crate never hard-codes "a file
//! on disk" — `std::fs::File`, an in-memory `Vec<u8>`, and
//! `std::io::Cursor` are just the straightforward adapters a binary built
//! on this crate would reach for first.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::error::Result;

/// Sequential append-only write target a `ParquetWriter` owns exclusively
/// (spec.md §5 "the writer holds a single handle to its sink").
pub trait ByteSink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
    /// Current write position, i.e. the absolute offset the next
    /// `write_all` call will land at. Column-chunk/page offsets in the
    /// footer are computed from this.
    fn position(&mut self) -> Result<u64>;
    fn flush(&mut self) -> Result<()>;
}

/// Random-access read source a `ParquetReader` owns until `close`.
pub trait ByteSource {
    fn len(&mut self) -> Result<u64>;
    /// Reads exactly `length` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>>;
}

impl ByteSink for File {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        Write::write_all(self, bytes)?;
        Ok(())
    }
    fn position(&mut self) -> Result<u64> {
        Ok(self.stream_position()?)
    }
    fn flush(&mut self) -> Result<()> {
        Write::flush(self)?;
        Ok(())
    }
}

impl ByteSource for File {
    fn len(&mut self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// An in-memory sink, for the streaming writer (`stream.rs`) and tests.
#[derive(Debug, Default)]
pub struct VecSink {
    pub buf: Vec<u8>,
}

impl VecSink {
    pub fn new() -> Self {
        VecSink { buf: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl ByteSink for VecSink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
    fn position(&mut self) -> Result<u64> {
        Ok(self.buf.len() as u64)
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl ByteSource for Cursor<Vec<u8>> {
    fn len(&mut self) -> Result<u64> {
        Ok(self.get_ref().len() as u64)
    }
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl ByteSource for Cursor<&[u8]> {
    fn len(&mut self) -> Result<u64> {
        Ok(self.get_ref().len() as u64)
    }
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_tracks_position() {
        let mut sink = VecSink::new();
        sink.write_all(b"abc").unwrap();
        assert_eq!(sink.position().unwrap(), 3);
        sink.write_all(b"de").unwrap();
        assert_eq!(sink.position().unwrap(), 5);
        assert_eq!(sink.into_inner(), b"abcde");
    }

    #[test]
    fn cursor_source_reads_ranges() {
        let mut source = Cursor::new(b"0123456789".to_vec());
        assert_eq!(source.len().unwrap(), 10);
        assert_eq!(source.read_at(2, 3).unwrap(), b"234");
    }
}
