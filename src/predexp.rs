//! Predicate expression wire encoding.
//!
//! A predicate is sent to the server as a flat sequence of TLV nodes:
//!
//! ```text
//! node   := tag:u16 | len:u32 | payload:[u8; len]
//! stream := node*
//! ```
//!
//! This module provides:
//! - `PredExp`: the closed family of node kinds and their encoder
//! - `Predicate`: an owned expression tree that flattens to a checked stream
//! - A decoder for inspecting encoded streams
//! - A one-token-per-node text syntax used by the command line tool
//!
//! All multi-byte integers are big-endian.

pub mod decode;
pub mod node;
pub mod tag;
pub mod token;
pub mod tree;

pub use decode::{decode_header, decode_stream, Header};
pub use node::{encode_stream, encode_to_bytes, stream_size, PredExp};
pub use token::parse_tokens;
pub use tag::{BinKind, CompareOp, Metadata, ValueType};
pub use tree::{Operand, Predicate};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredExpError {
    #[error("Bin name too long: {len} bytes (max: {})", tag::MAX_BIN_NAME_LEN)]
    BinNameTooLong { len: usize },

    #[error("Value too large: {len} bytes does not fit the 32-bit length field")]
    ValueTooLarge { len: usize },

    #[error("Bin '{name}' has no asserted type and cannot be encoded")]
    UnknownBinType { name: String },

    #[error("Sink is full: requires {required} bytes but only {available} available")]
    SinkFull { required: usize, available: usize },

    #[error("Truncated input at offset {offset}")]
    Truncated { offset: usize },

    #[error("Unknown predicate tag: {0}")]
    UnknownTag(u16),

    #[error("Invalid payload length {len} for tag {tag}")]
    InvalidLength { tag: u16, len: u32 },

    #[error("Pre-computed GeoJSON cells are not supported (flags: {flags}, cells: {ncells})")]
    UnsupportedGeoCells { flags: u8, ncells: u16 },

    #[error("Invalid UTF-8 in payload: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    #[error("Invalid operand for operator {operator}: {operand}")]
    InvalidOperand { operator: String, operand: String },

    #[error("Too many children for {connective}: {count} (max: {})", u16::MAX)]
    TooManyChildren { connective: &'static str, count: usize },
}

pub type Result<T> = std::result::Result<T, PredExpError>;
