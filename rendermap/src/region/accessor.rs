//! Mapped regions and typed element accessors.

use super::domain::{Point1, Rect1};
use super::instance::{Layout, PhysicalInstance};
use super::privilege::Privilege;
use super::space::{FieldId, LogicalRegion};
use crate::machine::MemoryId;
use crate::runtime::RuntimeError;
use crate::serdez::CodecError;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A region requirement as mapped for a running task: the region, the
/// instance backing it and the privilege the task holds.
#[derive(Clone, Debug)]
pub struct PhysicalRegion {
    region: LogicalRegion,
    memory: MemoryId,
    layout: Layout,
    privilege: Privilege,
    fields: Vec<FieldId>,
    instance: Arc<RwLock<PhysicalInstance>>,
}

impl PhysicalRegion {
    pub(crate) fn new(
        region: LogicalRegion,
        memory: MemoryId,
        layout: Layout,
        privilege: Privilege,
        fields: Vec<FieldId>,
        instance: Arc<RwLock<PhysicalInstance>>,
    ) -> Self {
        Self {
            region,
            memory,
            layout,
            privilege,
            fields,
            instance,
        }
    }

    pub fn logical_region(&self) -> LogicalRegion {
        self.region
    }

    /// Memory holding the backing instance.
    pub fn memory(&self) -> MemoryId {
        self.memory
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// Fields the task was granted, in requirement order.
    pub fn privilege_fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// Opens a typed accessor over `fid`.
    ///
    /// Read-only holders share the instance; writers get it exclusively for
    /// the accessor's lifetime. Accessors are synchronous and must not be
    /// held across an `.await`.
    pub fn accessor<T: Any + Send + Sync>(&self, fid: FieldId) -> Result<RegionAccessor<'_, T>, RuntimeError> {
        if !self.fields.contains(&fid) {
            return Err(RuntimeError::invariant(format!(
                "{} not granted on {}",
                fid, self.region
            )));
        }
        let guard = if self.privilege.writes() {
            let guard = self
                .instance
                .write()
                .map_err(|_| RuntimeError::invariant("instance lock poisoned"))?;
            Guard::Write(guard)
        } else {
            let guard = self
                .instance
                .read()
                .map_err(|_| RuntimeError::invariant("instance lock poisoned"))?;
            Guard::Read(guard)
        };
        if !guard.has_field(fid) {
            return Err(RuntimeError::invariant(format!(
                "instance in {} has no storage for {}",
                self.memory, fid
            )));
        }
        Ok(RegionAccessor {
            guard,
            fid,
            privilege: self.privilege,
            domain: self.region.domain(),
            _marker: PhantomData,
        })
    }
}

enum Guard<'a> {
    Read(RwLockReadGuard<'a, PhysicalInstance>),
    Write(RwLockWriteGuard<'a, PhysicalInstance>),
}

impl std::ops::Deref for Guard<'_> {
    type Target = PhysicalInstance;

    fn deref(&self) -> &PhysicalInstance {
        match self {
            Guard::Read(g) => g,
            Guard::Write(g) => g,
        }
    }
}

/// Typed point access to one field of a mapped region.
pub struct RegionAccessor<'a, T> {
    guard: Guard<'a>,
    fid: FieldId,
    privilege: Privilege,
    domain: Rect1,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Any + Send + Sync> RegionAccessor<'a, T> {
    /// Domain of the mapped (sub)region.
    pub fn domain(&self) -> Rect1 {
        self.domain
    }

    fn offset(&self, p: Point1) -> Result<usize, RuntimeError> {
        if !self.domain.contains(p) {
            return Err(RuntimeError::invariant(format!(
                "point {} outside mapped domain {}",
                p, self.domain
            )));
        }
        self.guard
            .offset_of(p)
            .ok_or_else(|| RuntimeError::invariant(format!("point {} outside instance", p)))
    }

    /// Reads the element at `p`.
    pub fn read(&self, p: Point1) -> Result<&T, RuntimeError> {
        if !self.privilege.reads() {
            return Err(RuntimeError::invariant(format!(
                "read of {} under {}",
                self.fid, self.privilege
            )));
        }
        let offset = self.offset(p)?;
        let store = self
            .guard
            .field(self.fid)
            .ok_or_else(|| RuntimeError::invariant(format!("missing {}", self.fid)))?;
        let value = store.get(offset).ok_or(CodecError::Uninitialized { index: p.0 as u64 })?;
        value.downcast_ref::<T>().ok_or_else(|| {
            RuntimeError::from(CodecError::TypeMismatch {
                codec: store.codec().name().to_string(),
            })
        })
    }

    /// Writes `value` at `p`, destroying the previous element.
    pub fn write(&mut self, p: Point1, value: T) -> Result<(), RuntimeError> {
        let offset = self.offset(p)?;
        let fid = self.fid;
        let privilege = self.privilege;
        match &mut self.guard {
            Guard::Write(instance) if privilege.writes() => {
                let store = instance
                    .field_mut(fid)
                    .ok_or_else(|| RuntimeError::invariant(format!("missing {}", fid)))?;
                store.replace(offset, Box::new(value))?;
                Ok(())
            }
            _ => Err(RuntimeError::invariant(format!(
                "write of {} under {}",
                fid, privilege
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::space::{FieldSpace, FieldSpaceId, IndexSpace, IndexSpaceId, RegionTreeId};
    use crate::serdez::{Erased, SerdezId, TextureObject, TextureSerdez};

    fn region(size: i64) -> LogicalRegion {
        LogicalRegion {
            tree: RegionTreeId(1),
            index_space: IndexSpace {
                id: IndexSpaceId(1),
                domain: Rect1::from_size(size),
            },
            field_space: FieldSpace { id: FieldSpaceId(1) },
        }
    }

    fn mapped(privilege: Privilege) -> PhysicalRegion {
        let mut instance = PhysicalInstance::new(MemoryId(0), Rect1::from_size(4), Layout::StructureOfArrays);
        instance.ensure_field(FieldId(0), SerdezId(1), Arc::new(Erased(TextureSerdez::new(1))));
        PhysicalRegion::new(
            region(4),
            MemoryId(0),
            Layout::StructureOfArrays,
            privilege,
            vec![FieldId(0)],
            Arc::new(RwLock::new(instance)),
        )
    }

    #[test]
    fn test_write_then_read() {
        let pr = mapped(Privilege::ReadWrite);
        {
            let mut acc = pr.accessor::<TextureObject>(FieldId(0)).unwrap();
            acc.write(Point1(2), TextureObject::new(1)).unwrap();
        }
        let acc = pr.accessor::<TextureObject>(FieldId(0)).unwrap();
        assert_eq!(acc.read(Point1(2)).unwrap().side(), 1);
    }

    #[test]
    fn test_uninitialised_read_fails() {
        let pr = mapped(Privilege::ReadOnly);
        let acc = pr.accessor::<TextureObject>(FieldId(0)).unwrap();
        assert_eq!(
            acc.read(Point1(0)).err(),
            Some(RuntimeError::Codec(CodecError::Uninitialized { index: 0 }))
        );
    }

    #[test]
    fn test_write_under_read_only_fails() {
        let pr = mapped(Privilege::ReadOnly);
        let mut acc = pr.accessor::<TextureObject>(FieldId(0)).unwrap();
        assert!(matches!(
            acc.write(Point1(0), TextureObject::new(1)),
            Err(RuntimeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_read_under_write_discard_fails() {
        let pr = mapped(Privilege::WriteDiscard);
        let acc = pr.accessor::<TextureObject>(FieldId(0)).unwrap();
        assert!(acc.read(Point1(0)).is_err());
    }

    #[test]
    fn test_out_of_domain_and_ungranted_field() {
        let pr = mapped(Privilege::ReadWrite);
        assert!(pr.accessor::<TextureObject>(FieldId(7)).is_err());

        let acc = pr.accessor::<TextureObject>(FieldId(0)).unwrap();
        assert!(matches!(
            acc.read(Point1(4)),
            Err(RuntimeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_wrong_type_fails() {
        let pr = mapped(Privilege::ReadWrite);
        {
            let mut acc = pr.accessor::<TextureObject>(FieldId(0)).unwrap();
            acc.write(Point1(0), TextureObject::new(1)).unwrap();
        }
        let acc = pr.accessor::<u64>(FieldId(0)).unwrap();
        assert!(matches!(
            acc.read(Point1(0)),
            Err(RuntimeError::Codec(CodecError::TypeMismatch { .. }))
        ));
    }
}
