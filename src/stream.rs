//! The streaming write pipeline (spec.md §6 "streaming writer"): a
//! transformer that accepts `Record`s on its input side and emits finished
//! Parquet bytes on its output side, as a `futures` `Sink`/`Stream` pair over
//! an in-memory `ParquetWriter`. Every operation here is synchronous under
//! the hood (shredding and page encoding never actually suspend), so the
//! `Sink`/`Stream` polling methods always resolve immediately — the traits
//! are adopted for the shape they give callers (`forward`, `SinkExt`,
//! combinators), not because this crate needs real async I/O.
//!
//! Errors on the input side (a record that doesn't fit the schema) or from
//! shredding/encoding propagate as `Sink::start_send`/`poll_*` failures
//! rather than being dropped (spec.md §5 "a streaming transformer surface
//! MUST surface errors as the stream's error signal", E7).

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use futures_util::sink::Sink;

use crate::error::{ParquetCoreError, Result};
use crate::io::VecSink;
use crate::metacodec::{MetaCodec, ThriftMetaCodec};
use crate::schema::Schema;
use crate::value::Record;
use crate::writer::{ParquetWriter, WriterConfig};

/// A `Sink<Record, Error = ParquetCoreError>` + `Stream<Item =
/// Result<Bytes>>` wrapping a `ParquetWriter<VecSink>`. Push records with
/// `SinkExt::send`/`feed`, then close the sink (`SinkExt::close`) to flush
/// the final row group and footer; poll the stream half to drain bytes as
/// they become available, in file order.
pub struct ParquetByteStream<M: MetaCodec = ThriftMetaCodec> {
    writer: Option<ParquetWriter<VecSink, M>>,
    /// The sink `close()` handed back, once finalized; kept around only so
    /// the `Stream` half can drain the trailing footer bytes.
    closed_sink: Option<VecSink>,
    emitted: usize,
}

impl ParquetByteStream<ThriftMetaCodec> {
    /// Opens a streaming writer over a fresh in-memory sink.
    pub fn new(schema: Schema, config: WriterConfig) -> Result<Self> {
        let writer = ParquetWriter::create(VecSink::new(), schema, config)?;
        Ok(ParquetByteStream {
            writer: Some(writer),
            closed_sink: None,
            emitted: 0,
        })
    }
}

impl<M: MetaCodec> ParquetByteStream<M> {
    fn writer_mut(&mut self) -> Result<&mut ParquetWriter<VecSink, M>> {
        self.writer
            .as_mut()
            .ok_or_else(|| ParquetCoreError::format("streaming writer is already closed"))
    }

    /// Whatever bytes have been written to the sink since the last call,
    /// ready to hand to the `Stream` consumer. Never truncates the sink's
    /// buffer — row-group/footer offsets are absolute positions into it.
    fn take_pending(&mut self) -> Option<Bytes> {
        let buf: &[u8] = if let Some(writer) = &self.writer {
            writer.peek_written()
        } else if let Some(sink) = &self.closed_sink {
            &sink.buf
        } else {
            return None;
        };
        if buf.len() > self.emitted {
            let chunk = Bytes::copy_from_slice(&buf[self.emitted..]);
            self.emitted = buf.len();
            Some(chunk)
        } else {
            None
        }
    }
}

impl<M: MetaCodec + Unpin> Sink<Record> for ParquetByteStream<M> {
    type Error = ParquetCoreError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Record) -> Result<()> {
        let this = self.get_mut();
        let value = crate::value::Value::Group(item);
        this.writer_mut()?.append_row(&value)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        let result = (|| -> Result<()> {
            this.writer_mut()?.flush_row_group()?;
            Ok(())
        })();
        Poll::Ready(result)
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        let Some(writer) = this.writer.take() else {
            return Poll::Ready(Ok(()));
        };
        match writer.close() {
            Ok(sink) => {
                this.closed_sink = Some(sink);
                Poll::Ready(Ok(()))
            }
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

impl<M: MetaCodec + Unpin> Stream for ParquetByteStream<M> {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(chunk) = this.take_pending() {
            return Poll::Ready(Some(Ok(chunk)));
        }
        if this.writer.is_none() {
            return Poll::Ready(None);
        }
        Poll::Ready(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::sink::SinkExt;
    use futures_util::stream::StreamExt;

    fn fruit_schema() -> Schema {
        let decl: crate::schema::SchemaDeclaration = serde_json::from_value(serde_json::json!([
            {"name": "name", "type": "UTF8"},
            {"name": "quantity", "type": "INT32"},
        ]))
        .unwrap();
        crate::schema::build_schema(&decl).unwrap()
    }

    #[test]
    fn streams_bytes_as_records_are_pushed() {
        futures::executor::block_on(async {
            let mut stream = ParquetByteStream::new(fruit_schema(), WriterConfig::default()).unwrap();

            stream
                .send(Record::from([
                    ("name".to_string(), crate::value::Value::Bytes(b"apple".to_vec())),
                    ("quantity".to_string(), crate::value::Value::I32(3)),
                ]))
                .await
                .unwrap();

            let mut collected = Vec::new();
            stream.close().await.unwrap();
            while let Some(chunk) = stream.next().await {
                collected.extend_from_slice(&chunk.unwrap());
            }

            assert!(!collected.is_empty());
            assert_eq!(&collected[0..4], crate::format::PARQUET_MAGIC);
            assert_eq!(&collected[collected.len() - 4..], crate::format::PARQUET_MAGIC);
        });
    }

    #[test]
    fn rejects_a_record_with_the_wrong_type() {
        futures::executor::block_on(async {
            let mut stream = ParquetByteStream::new(fruit_schema(), WriterConfig::default()).unwrap();

            let err = stream
                .send(Record::from([
                    ("name".to_string(), crate::value::Value::Bytes(b"apple".to_vec())),
                    ("quantity".to_string(), crate::value::Value::Bytes(b"not an int".to_vec())),
                ]))
                .await
                .unwrap_err();
            assert!(matches!(err, ParquetCoreError::InvalidInput(_)));
        });
    }
}
