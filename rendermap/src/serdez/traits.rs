//! The serdez contract and its type-erased adapter.

use super::error::CodecError;
use std::any::Any;

/// A heap-owned element value stored in a codec field slot.
///
/// Slots never hold payloads inline; they own a boxed value whose concrete
/// type only the field's codec knows.
pub type OpaqueValue = Box<dyn Any + Send + Sync>;

/// Serialize/deserialize/destroy contract for opaque element values.
///
/// The runtime never copies an opaque value bitwise. Whenever a value crosses
/// a memory boundary it is serialized into a byte buffer and a fresh value is
/// deserialized on the other side; whenever a slot is overwritten or its
/// instance is destroyed, the old value is handed to [`destroy`].
///
/// [`destroy`]: CustomSerdez::destroy
pub trait CustomSerdez: Send + Sync + 'static {
    /// The concrete element type.
    type Value: Send + Sync + 'static;

    /// Codec name used in diagnostics.
    fn name(&self) -> &str;

    /// Upper bound of [`serialized_size`](Self::serialized_size) over all values.
    fn max_serialized_size(&self) -> usize;

    /// Number of bytes [`serialize`](Self::serialize) will write for `value`.
    fn serialized_size(&self, value: &Self::Value) -> usize;

    /// Writes `value` into `buf`, returning the number of bytes written.
    fn serialize(&self, value: &Self::Value, buf: &mut [u8]) -> Result<usize, CodecError>;

    /// Allocates a fresh value from `buf`, returning it and the bytes read.
    fn deserialize(&self, buf: &[u8]) -> Result<(Box<Self::Value>, usize), CodecError>;

    /// Releases a value produced by this codec.
    fn destroy(&self, value: Box<Self::Value>) {
        drop(value);
    }
}

/// Object-safe view of a [`CustomSerdez`] operating on [`OpaqueValue`]s.
pub trait UntypedSerdez: Send + Sync {
    fn name(&self) -> &str;

    fn max_serialized_size(&self) -> usize;

    fn serialized_size(&self, value: &(dyn Any + Send + Sync)) -> Result<usize, CodecError>;

    /// Serializes and checks the codec wrote exactly its declared size.
    fn serialize(&self, value: &(dyn Any + Send + Sync), buf: &mut [u8]) -> Result<usize, CodecError>;

    fn deserialize(&self, buf: &[u8]) -> Result<(OpaqueValue, usize), CodecError>;

    fn destroy(&self, value: OpaqueValue) -> Result<(), CodecError>;
}

/// Adapter erasing the value type of a [`CustomSerdez`].
pub struct Erased<S>(pub S);

impl<S: CustomSerdez> Erased<S> {
    fn typed<'v>(&self, value: &'v (dyn Any + Send + Sync)) -> Result<&'v S::Value, CodecError> {
        value
            .downcast_ref::<S::Value>()
            .ok_or_else(|| CodecError::TypeMismatch {
                codec: self.0.name().to_string(),
            })
    }
}

impl<S: CustomSerdez> UntypedSerdez for Erased<S> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn max_serialized_size(&self) -> usize {
        self.0.max_serialized_size()
    }

    fn serialized_size(&self, value: &(dyn Any + Send + Sync)) -> Result<usize, CodecError> {
        Ok(self.0.serialized_size(self.typed(value)?))
    }

    fn serialize(&self, value: &(dyn Any + Send + Sync), buf: &mut [u8]) -> Result<usize, CodecError> {
        let value = self.typed(value)?;
        let expected = self.0.serialized_size(value);
        if buf.len() < expected {
            return Err(CodecError::BufferTooSmall {
                codec: self.0.name().to_string(),
                needed: expected,
                available: buf.len(),
            });
        }
        let written = self.0.serialize(value, buf)?;
        if written != expected {
            return Err(CodecError::SizeMismatch {
                codec: self.0.name().to_string(),
                expected,
                actual: written,
            });
        }
        Ok(written)
    }

    fn deserialize(&self, buf: &[u8]) -> Result<(OpaqueValue, usize), CodecError> {
        let (value, read) = self.0.deserialize(buf)?;
        Ok((value as OpaqueValue, read))
    }

    fn destroy(&self, value: OpaqueValue) -> Result<(), CodecError> {
        match value.downcast::<S::Value>() {
            Ok(typed) => {
                self.0.destroy(typed);
                Ok(())
            }
            Err(_) => Err(CodecError::TypeMismatch {
                codec: self.0.name().to_string(),
            }),
        }
    }
}
