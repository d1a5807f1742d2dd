//! Schema-driven binary codec.
//!
//! Values are carried as `serde_json::Value` trees so any `Serialize` type
//! can be framed against a descriptor; the descriptor alone decides byte
//! layout. All multi-byte scalars are little-endian.

mod buffer;
mod codec;
mod descriptor;

pub use buffer::{ByteReader, ByteWriter};
pub use codec::{decode, encode, from_bytes, from_text, to_bytes, to_text};
pub use descriptor::{CountWidth, EnumCodes, Field, Scalar, Schema, Union, Variant};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Schema not found: tag {tag}")]
    SchemaNotFound { tag: u8 },

    #[error("Unexpected end of frame at byte {position}")]
    UnexpectedEnd { position: usize },

    #[error("String is not valid UTF-8")]
    InvalidUtf8,

    #[error("Shape mismatch at `{path}`: expected {expected}")]
    ShapeMismatch { path: String, expected: &'static str },

    #[error("Value {value} out of range at `{path}`")]
    OutOfRange { path: String, value: f64 },

    #[error("Optional value at `{path}` collides with the absent sentinel")]
    SentinelCollision { path: String },

    #[error("{remaining} trailing bytes after message")]
    TrailingBytes { remaining: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
