//! Error types for configuration, payload decoding, and event extraction.
//!
//! Extraction and codec failures never cross the decision boundary - they are
//! logged and degrade to "no event observed" at the extractor seam.

use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Threshold out of range
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
    /// Duration window out of range
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Structural decode failures for the transaction envelope encoding
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Input ended inside a value
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// Leading byte does not start any known value
    #[error("unknown token byte 0x{0:02x}")]
    UnknownToken(u8),
    /// Length prefix is empty or not decimal digits
    #[error("malformed length prefix")]
    BadLength,
    /// Declared length runs past the end of the input
    #[error("declared length {wanted} exceeds remaining {available} bytes")]
    LengthOverrun { wanted: usize, available: usize },
    /// Integer is empty, malformed, or does not fit in 64 bits
    #[error("malformed integer")]
    BadInteger,
    /// Dictionary key is not a byte string or text string
    #[error("dictionary key must be a string")]
    BadKey,
    /// Text string is not valid UTF-8
    #[error("invalid utf-8 in text string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// Nested containers exceed the depth guard
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),
    /// Bytes remain after the root value
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

/// Failures while recovering a signer identity from a request body
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Submission marker present but no payload markers found
    #[error("no transaction payload located in body")]
    MissingPayload,
    /// Payload slice is not valid hex text
    #[error("invalid payload hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    /// Payload decoded but is structurally invalid
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Decoded envelope is not a dictionary
    #[error("transaction envelope is not a dictionary")]
    NotADictionary,
    /// Envelope dictionary has no signer entry
    #[error("transaction envelope has no signer field")]
    MissingSigner,
    /// Signer entry is not a byte string
    #[error("signer field is not a byte string")]
    SignerType,
    /// Signer entry is present but the wrong shape
    #[error("signer field must be {expected} bytes, got {got}")]
    SignerWidth { expected: usize, got: usize },
    /// Probe marker present but no quoted address literal found
    #[error("no address literal in probe body")]
    MissingAddress,
    /// Address literal is the wrong number of hex digits
    #[error("address must be {expected} hex digits, got {got}")]
    AddressWidth { expected: usize, got: usize },
}
