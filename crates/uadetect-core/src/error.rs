//! Dataset error types
//!
//! Loading distinguishes two failure classes: the byte stream could not be
//! read at all (`LoadError::Io`), or it was read but does not describe a valid
//! dataset (`LoadError::Format`). Both abort construction; no partial
//! provider is ever returned. Lookups never fail with an error.

use thiserror::Error;

/// Errors that can occur while loading, building or writing a dataset
#[derive(Debug, Error)]
pub enum LoadError {
    /// Missing file, truncated stream or decompression failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream does not describe a valid dataset
    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

impl LoadError {
    /// Whether this error was caused by malformed dataset content
    pub fn is_format(&self) -> bool {
        matches!(self, LoadError::Format(_))
    }
}

/// Malformed or unsupported dataset content
#[derive(Debug, Error)]
pub enum FormatError {
    /// The stream's version header is not the one this reader understands
    #[error(
        "unsupported data format version {}.{}, expected {}.{}",
        found.0, found.1, expected.0, expected.1
    )]
    UnsupportedVersion {
        found: (i32, i32),
        expected: (i32, i32),
    },

    /// A length or count prefix was negative
    #[error("negative length for {field}: {value}")]
    NegativeLength { field: &'static str, value: i64 },

    /// Handler type tag outside the known algorithm set
    #[error("unsupported handler type tag {0}")]
    UnknownHandlerType(u8),

    /// A boolean byte that was neither 0 nor 1
    #[error("invalid boolean for {field}: {value}")]
    InvalidBool { field: &'static str, value: u8 },

    /// Reference into the string table out of range
    #[error("string index {index} out of range ({len} strings)")]
    StringIndex { index: i64, len: usize },

    /// Reference to a handler that was not declared
    #[error("handler index {index} out of range ({len} handlers)")]
    HandlerIndex { index: i64, len: usize },

    /// A pattern that does not compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A character that has no single-byte encoding
    #[error("value cannot be encoded as single-byte text: {value:?}")]
    Unencodable { value: String },

    /// Nesting deeper than the reader accepts
    #[error("{field} nested deeper than {limit} levels")]
    TooDeep { field: &'static str, limit: usize },

    /// A count that does not fit its wire width
    #[error("too many entries for {field}: {count}")]
    TooMany { field: &'static str, count: usize },

    /// Builder: the same device id was declared twice
    #[error("device already exists: {0}")]
    DuplicateDevice(String),

    /// Builder: a device references a parent that was not declared before it
    #[error("unknown parent device: {0}")]
    UnknownParent(String),

    /// Builder: a device or handler name that was never declared
    #[error("unknown reference: {0}")]
    UnknownReference(String),
}

/// A request header that cannot be represented
#[derive(Debug, Error)]
pub enum HeaderError {
    /// A header line without a `:` between name and value
    #[error("header line has no ':' separator: {0:?}")]
    MissingSeparator(String),

    #[error("invalid header name: {0}")]
    Name(#[from] http::header::InvalidHeaderName),

    #[error("invalid header value: {0}")]
    Value(#[from] http::header::InvalidHeaderValue),
}

/// Result type for dataset operations
pub type LoadResult<T> = Result<T, LoadError>;
