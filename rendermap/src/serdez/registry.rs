//! Codec registry keyed by serdez id.

use super::error::CodecError;
use super::traits::{CustomSerdez, Erased, UntypedSerdez};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier a field space uses to name its codec. Id 0 means "no codec".
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SerdezId(pub u32);

impl SerdezId {
    /// Reserved id for plain (bitwise-copyable) fields.
    pub const NONE: SerdezId = SerdezId(0);
}

impl fmt::Display for SerdezId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered codecs, filled in before the runtime starts and read-only after.
#[derive(Default, Clone)]
pub struct SerdezRegistry {
    codecs: HashMap<SerdezId, Arc<dyn UntypedSerdez>>,
}

impl SerdezRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `codec` under `id`.
    pub fn register<S: CustomSerdez>(&mut self, id: SerdezId, codec: S) -> Result<(), CodecError> {
        self.register_untyped(id, Arc::new(Erased(codec)))
    }

    /// Registers an already type-erased codec under `id`.
    pub fn register_untyped(
        &mut self,
        id: SerdezId,
        codec: Arc<dyn UntypedSerdez>,
    ) -> Result<(), CodecError> {
        if id == SerdezId::NONE {
            return Err(CodecError::ReservedId(id));
        }
        if self.codecs.contains_key(&id) {
            return Err(CodecError::DuplicateId(id));
        }
        tracing::debug!(serdez_id = id.0, codec = codec.name(), "Registered custom serdez");
        self.codecs.insert(id, codec);
        Ok(())
    }

    /// Looks up the codec registered under `id`.
    pub fn get(&self, id: SerdezId) -> Result<Arc<dyn UntypedSerdez>, CodecError> {
        self.codecs
            .get(&id)
            .cloned()
            .ok_or(CodecError::UnknownCodec(id))
    }

    pub fn contains(&self, id: SerdezId) -> bool {
        self.codecs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for SerdezRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.codecs.keys().copied().collect();
        ids.sort();
        f.debug_struct("SerdezRegistry").field("ids", &ids).finish()
    }
}
