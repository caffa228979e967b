//! Physical instances and their codec-managed field storage.

use super::domain::{Point1, Rect1};
use super::space::FieldId;
use crate::machine::MemoryId;
use crate::serdez::{CodecError, OpaqueValue, SerdezId, UntypedSerdez};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Physical layout of an instance's fields.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Layout {
    /// Each field stored contiguously over the whole domain.
    StructureOfArrays,
    /// Fields interleaved per element.
    ArrayOfStructs,
    /// Fields interleaved in blocks of the given element count.
    Blocked(usize),
}

impl Layout {
    /// Layout implied by a mapper's blocking factor. A factor at or above the
    /// domain volume is fully contiguous, a factor of one is fully
    /// interleaved.
    pub fn from_blocking_factor(blocking_factor: usize, max_blocking_factor: usize) -> Self {
        if blocking_factor >= max_blocking_factor {
            Self::StructureOfArrays
        } else if blocking_factor <= 1 {
            Self::ArrayOfStructs
        } else {
            Self::Blocked(blocking_factor)
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StructureOfArrays => write!(f, "SoA"),
            Self::ArrayOfStructs => write!(f, "AoS"),
            Self::Blocked(n) => write!(f, "blocked({})", n),
        }
    }
}

/// Slots of one field. Every stored value is owned by the store and handed
/// back to the field's codec when it is replaced or the store is cleared.
pub struct FieldStore {
    serdez_id: SerdezId,
    codec: Arc<dyn UntypedSerdez>,
    slots: Vec<Option<OpaqueValue>>,
}

impl FieldStore {
    pub fn new(serdez_id: SerdezId, codec: Arc<dyn UntypedSerdez>, len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self {
            serdez_id,
            codec,
            slots,
        }
    }

    pub fn serdez_id(&self) -> SerdezId {
        self.serdez_id
    }

    pub fn codec(&self) -> &Arc<dyn UntypedSerdez> {
        &self.codec
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots currently holding a value.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn get(&self, offset: usize) -> Option<&(dyn Any + Send + Sync)> {
        self.slots.get(offset)?.as_deref()
    }

    /// Stores `value` at `offset`, destroying the previous value through the
    /// codec.
    pub fn replace(&mut self, offset: usize, value: OpaqueValue) -> Result<(), CodecError> {
        let slot = self
            .slots
            .get_mut(offset)
            .ok_or(CodecError::Uninitialized {
                index: offset as u64,
            })?;
        match slot.replace(value) {
            Some(old) => self.codec.destroy(old),
            None => Ok(()),
        }
    }

    /// Destroys every stored value, returning how many were destroyed.
    pub fn clear(&mut self) -> Result<usize, CodecError> {
        let mut destroyed = 0;
        let mut first_error = None;
        for slot in self.slots.iter_mut() {
            if let Some(value) = slot.take() {
                destroyed += 1;
                if let Err(e) = self.codec.destroy(value) {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(destroyed),
        }
    }
}

impl Drop for FieldStore {
    fn drop(&mut self) {
        if let Err(e) = self.clear() {
            tracing::error!(error = %e, "Failed to destroy field values");
        }
    }
}

impl fmt::Debug for FieldStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldStore")
            .field("serdez_id", &self.serdez_id)
            .field("codec", &self.codec.name())
            .field("len", &self.slots.len())
            .field("occupied", &self.occupied())
            .finish()
    }
}

/// A materialisation of a region tree's data in one memory.
///
/// Instances always span the root domain of their tree; subregions address
/// into them by point.
#[derive(Debug)]
pub struct PhysicalInstance {
    memory: MemoryId,
    domain: Rect1,
    layout: Layout,
    fields: BTreeMap<FieldId, FieldStore>,
}

impl PhysicalInstance {
    pub fn new(memory: MemoryId, domain: Rect1, layout: Layout) -> Self {
        Self {
            memory,
            domain,
            layout,
            fields: BTreeMap::new(),
        }
    }

    pub fn memory(&self) -> MemoryId {
        self.memory
    }

    pub fn domain(&self) -> Rect1 {
        self.domain
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    /// Adds storage for `fid` if the instance does not have it yet.
    pub fn ensure_field(&mut self, fid: FieldId, serdez_id: SerdezId, codec: Arc<dyn UntypedSerdez>) {
        let len = self.domain.volume() as usize;
        self.fields
            .entry(fid)
            .or_insert_with(|| FieldStore::new(serdez_id, codec, len));
    }

    pub fn has_field(&self, fid: FieldId) -> bool {
        self.fields.contains_key(&fid)
    }

    pub fn field(&self, fid: FieldId) -> Option<&FieldStore> {
        self.fields.get(&fid)
    }

    pub fn field_mut(&mut self, fid: FieldId) -> Option<&mut FieldStore> {
        self.fields.get_mut(&fid)
    }

    /// Slot offset of `p` within this instance.
    pub fn offset_of(&self, p: Point1) -> Option<usize> {
        self.domain.offset_of(p)
    }

    /// Destroys every value held by the instance.
    pub fn destroy(&mut self) -> Result<usize, CodecError> {
        let mut destroyed = 0;
        for store in self.fields.values_mut() {
            destroyed += store.clear()?;
        }
        Ok(destroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serdez::{Erased, TextureObject, TextureSerdez};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDestroy {
        inner: TextureSerdez,
        destroyed: Arc<AtomicUsize>,
    }

    impl crate::serdez::CustomSerdez for CountingDestroy {
        type Value = TextureObject;

        fn name(&self) -> &str {
            "counting"
        }

        fn max_serialized_size(&self) -> usize {
            self.inner.max_serialized_size()
        }

        fn serialized_size(&self, value: &TextureObject) -> usize {
            self.inner.serialized_size(value)
        }

        fn serialize(&self, value: &TextureObject, buf: &mut [u8]) -> Result<usize, CodecError> {
            self.inner.serialize(value, buf)
        }

        fn deserialize(&self, buf: &[u8]) -> Result<(Box<TextureObject>, usize), CodecError> {
            self.inner.deserialize(buf)
        }

        fn destroy(&self, value: Box<TextureObject>) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            drop(value);
        }
    }

    fn counting_codec() -> (Arc<dyn UntypedSerdez>, Arc<AtomicUsize>) {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let codec = Erased(CountingDestroy {
            inner: TextureSerdez::new(1),
            destroyed: destroyed.clone(),
        });
        (Arc::new(codec), destroyed)
    }

    #[test]
    fn test_layout_from_blocking_factor() {
        assert_eq!(Layout::from_blocking_factor(64, 64), Layout::StructureOfArrays);
        assert_eq!(Layout::from_blocking_factor(1, 64), Layout::ArrayOfStructs);
        assert_eq!(Layout::from_blocking_factor(8, 64), Layout::Blocked(8));
    }

    #[test]
    fn test_replace_destroys_previous_value() {
        let (codec, destroyed) = counting_codec();
        let mut store = FieldStore::new(SerdezId(1), codec, 2);

        store.replace(0, Box::new(TextureObject::new(1))).unwrap();
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
        store.replace(0, Box::new(TextureObject::new(1))).unwrap();
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(store.occupied(), 1);
    }

    #[test]
    fn test_clear_and_drop_destroy_every_value() {
        let (codec, destroyed) = counting_codec();
        let mut store = FieldStore::new(SerdezId(1), codec, 3);
        for i in 0..3 {
            store.replace(i, Box::new(TextureObject::new(1))).unwrap();
        }

        assert_eq!(store.clear().unwrap(), 3);
        assert_eq!(destroyed.load(Ordering::SeqCst), 3);

        store.replace(1, Box::new(TextureObject::new(1))).unwrap();
        drop(store);
        assert_eq!(destroyed.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_replace_out_of_range() {
        let (codec, _) = counting_codec();
        let mut store = FieldStore::new(SerdezId(1), codec, 1);
        assert!(store.replace(5, Box::new(TextureObject::new(1))).is_err());
    }

    #[test]
    fn test_instance_field_storage_spans_domain() {
        let (codec, _) = counting_codec();
        let mut instance = PhysicalInstance::new(MemoryId(0), Rect1::from_size(8), Layout::StructureOfArrays);
        instance.ensure_field(FieldId(0), SerdezId(1), codec);

        assert_eq!(instance.field(FieldId(0)).unwrap().len(), 8);
        assert_eq!(instance.offset_of(Point1(7)), Some(7));
        assert_eq!(instance.offset_of(Point1(8)), None);
    }
}
