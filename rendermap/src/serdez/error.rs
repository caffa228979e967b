//! Codec error types.

use super::registry::SerdezId;
use thiserror::Error;

/// Errors raised by a custom serdez codec or the codec registry.
///
/// None of these are recoverable: every caller treats them as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The codec wrote or read a different number of bytes than it declared.
    #[error("{codec}: size mismatch (expected {expected} bytes, got {actual})")]
    SizeMismatch {
        codec: String,
        expected: usize,
        actual: usize,
    },

    /// The supplied buffer cannot hold the payload.
    #[error("{codec}: buffer too small ({available} bytes available, {needed} needed)")]
    BufferTooSmall {
        codec: String,
        needed: usize,
        available: usize,
    },

    /// A value of the wrong concrete type was handed to the codec.
    #[error("{codec}: value is not of the codec's type")]
    TypeMismatch { codec: String },

    /// A slot was read before any value was written into it.
    #[error("slot {index} holds no value")]
    Uninitialized { index: u64 },

    /// No codec is registered under the id.
    #[error("no serdez registered with id {0}")]
    UnknownCodec(SerdezId),

    /// A codec is already registered under the id.
    #[error("serdez id {0} already registered")]
    DuplicateId(SerdezId),

    /// Id 0 means "no codec" and cannot be registered.
    #[error("serdez id {0} is reserved")]
    ReservedId(SerdezId),
}
