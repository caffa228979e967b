//! Handles for index spaces, field spaces, regions and partitions.
//!
//! Handles are small `Copy` values naming objects owned by the runtime's
//! region forest. Creating and destroying the objects themselves goes through
//! a task context.

use super::domain::Rect1;
use crate::serdez::SerdezId;
use std::fmt;

macro_rules! handle_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

handle_id!(
    /// Identifier of an index space.
    IndexSpaceId,
    "is"
);
handle_id!(
    /// Identifier of a field space.
    FieldSpaceId,
    "fs"
);
handle_id!(
    /// Identifier of a region tree (one per created logical region).
    RegionTreeId,
    "tree"
);
handle_id!(
    /// Identifier of an index partition.
    IndexPartitionId,
    "ip"
);

/// Identifier of a field within a field space.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field{}", self.0)
    }
}

/// An index space and its domain.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct IndexSpace {
    pub id: IndexSpaceId,
    pub domain: Rect1,
}

/// A field space handle.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct FieldSpace {
    pub id: FieldSpaceId,
}

/// Allocation record of one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    /// Size of the in-slot handle in bytes.
    pub size: usize,
    /// Codec every element of the field goes through.
    pub serdez: SerdezId,
}

/// A logical region: an index space crossed with a field space, within one
/// region tree. Subregions share their root's tree and field space.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct LogicalRegion {
    pub tree: RegionTreeId,
    pub index_space: IndexSpace,
    pub field_space: FieldSpace,
}

impl LogicalRegion {
    pub fn domain(&self) -> Rect1 {
        self.index_space.domain
    }
}

impl fmt::Display for LogicalRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region({}, {}, {})",
            self.tree, self.index_space.id, self.field_space.id
        )
    }
}

/// An index partition handle.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct IndexPartition {
    pub id: IndexPartitionId,
    pub parent: IndexSpace,
    pub color_space: Rect1,
    pub disjoint: bool,
}

/// An index partition applied to a particular region tree.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct LogicalPartition {
    pub tree: RegionTreeId,
    pub index_partition: IndexPartition,
    pub field_space: FieldSpace,
}

impl fmt::Display for LogicalPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partition({}, {}, {})",
            self.tree, self.index_partition.id, self.field_space.id
        )
    }
}
