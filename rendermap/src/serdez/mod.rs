//! Custom serialization for opaque, heap-owned field values.
//!
//! Fields whose elements are owning handles cannot be copied bitwise between
//! memories. Such fields name a codec by [`SerdezId`] when they are allocated,
//! and the runtime routes every copy and every destruction of an element
//! through that codec:
//!
//! - writing a slot destroys the value it held
//! - a cross-memory copy serializes each element and deserializes a fresh one
//! - destroying an instance destroys every value it still holds
//!
//! Codecs are registered with the runtime before it starts (see
//! [`SerdezRegistry`]) and are never inherited or looked up implicitly.

mod error;
mod registry;
mod texture;
mod traits;

pub use error::CodecError;
pub use registry::{SerdezId, SerdezRegistry};
pub use texture::{Rgb, TextureObject, TextureSerdez, DEFAULT_TEXTURE_SIDE};
pub use traits::{CustomSerdez, Erased, OpaqueValue, UntypedSerdez};
