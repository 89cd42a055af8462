//! The five error kinds from spec.md §7, as a single closed `thiserror` enum.
//!
//! Every fallible operation boundary (`build_schema`, `append_row`, `close`,
//! `cursor.next`, `open`) returns `Result<T, ParquetCoreError>`. Nothing is
//! swallowed: callers always see the nearest boundary's error.

use std::fmt;

pub type Result<T> = std::result::Result<T, ParquetCoreError>;

#[derive(thiserror::Error, Debug)]
pub enum ParquetCoreError {
    /// Invalid schema declaration: unknown type/logical type, bad DECIMAL
    /// precision, illegal nesting, or an input value type this crate does
    /// not support for the target column (message contains "is not supported").
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A record field violates the schema it is being shredded against
    /// (wrong type, missing required value).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The file/stream being read is corrupt or doesn't look like Parquet.
    #[error("corrupt parquet data: {0}")]
    FormatError(String),

    /// The underlying `ByteSink`/`ByteSource` failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A `Codec` failed to compress or decompress a page.
    #[error("codec error: {0}")]
    CodecError(String),
}

impl ParquetCoreError {
    pub fn config(msg: impl fmt::Display) -> Self {
        ParquetCoreError::ConfigError(msg.to_string())
    }
    pub fn invalid_input(msg: impl fmt::Display) -> Self {
        ParquetCoreError::InvalidInput(msg.to_string())
    }
    pub fn format(msg: impl fmt::Display) -> Self {
        ParquetCoreError::FormatError(msg.to_string())
    }
    pub fn codec(msg: impl fmt::Display) -> Self {
        ParquetCoreError::CodecError(msg.to_string())
    }

    /// True once this error has poisoned a writer: further appends must fail.
    pub fn is_poisoning(&self) -> bool {
        !matches!(self, ParquetCoreError::ConfigError(_))
    }
}
