//! Crate-wide error type.
//!
//! Every decode or encode call either returns a complete container or one of
//! these errors.  There is no partial result and nothing in this crate
//! retries.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormatError>;

#[derive(Error, Debug)]
pub enum FormatError {
    /// Header magic did not match and the stream length matched no known
    /// legacy layout for the family.
    #[error("File magic '{found}' does not match {family} magic '{expected}'")]
    MagicMismatch {
        family:   &'static str,
        expected: String,
        found:    String,
    },

    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,

    #[error("Unknown {registry} type tag {ordinal}")]
    UnknownTypeTag { registry: &'static str, ordinal: i64 },

    #[error("Signal pair references unknown signal '{0}'")]
    MissingReferencedSignal(String),

    #[error("Header declares {declared} records but {actual} were supplied")]
    RecordCountMismatch { declared: u64, actual: u64 },

    #[error("Field '{field}' is {len} bytes, exceeds fixed width {width}")]
    FieldTooLong { field: &'static str, width: usize, len: usize },

    /// A variable-width value was given to a layout with no size field.
    #[error("Type '{code}' has no fixed width and cannot be stored in a {family} record")]
    UnsizedValue { family: &'static str, code: &'static str },

    #[error("Unsupported sample element size {0} (expected 1, 2 or 4)")]
    UnsupportedElementSize(u32),

    #[error("Sample value {value} of signal '{signal}' does not fit in {width} byte(s)")]
    SampleOutOfRange { signal: String, value: i32, width: u32 },

    #[error("Signals must share element size, block size and block count: {0}")]
    InconsistentSignals(String),

    #[error("{field} holds {len} entries, more than a 32-bit count can declare")]
    CountOverflow { field: &'static str, len: usize },

    /// An unnamed reference cannot be told apart from an absent one on disk.
    #[error("Intermediate data '{0}' has a reference with an empty name")]
    UnnamedReference(String),

    #[error("Analysis '{name}' for source '{source_label}' not found")]
    MissingAnalysis { name: String, source_label: String },

    #[error("IO error: {0}")]
    Io(io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::UnexpectedEndOfStream
        } else {
            FormatError::Io(e)
        }
    }
}
