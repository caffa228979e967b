//! Privileges, coherence modes and region requirements.

use super::space::{FieldId, LogicalPartition, LogicalRegion};
use std::fmt;

/// Access privilege a task requests on a region.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Privilege {
    ReadOnly,
    ReadWrite,
    /// Write-only; existing contents need not be preserved.
    WriteDiscard,
}

impl Privilege {
    pub fn reads(&self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub fn writes(&self) -> bool {
        matches!(self, Self::ReadWrite | Self::WriteDiscard)
    }

    /// True if holding `self` is enough to grant `other` to a child.
    pub fn subsumes(&self, other: Privilege) -> bool {
        match self {
            Self::ReadWrite => true,
            Self::ReadOnly => other == Self::ReadOnly,
            Self::WriteDiscard => other == Self::WriteDiscard,
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "READ_ONLY"),
            Self::ReadWrite => write!(f, "READ_WRITE"),
            Self::WriteDiscard => write!(f, "WRITE_DISCARD"),
        }
    }
}

/// Coherence mode of a region requirement.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Coherence {
    Exclusive,
    /// The region may be touched concurrently by other holders; sub-tasks are
    /// restricted to the holder's instance until an acquire lifts that.
    Simultaneous,
}

impl fmt::Display for Coherence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => write!(f, "EXCLUSIVE"),
            Self::Simultaneous => write!(f, "SIMULTANEOUS"),
        }
    }
}

/// What a requirement names: a region, or a partition plus a projection
/// functor resolving each index point to one of its subregions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionTarget {
    Region(LogicalRegion),
    Partition {
        partition: LogicalPartition,
        /// Projection functor id. Only the identity projection (0) exists.
        projection: u32,
    },
}

/// A task's request for access to part of a region tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionRequirement {
    pub target: RegionTarget,
    pub privilege: Privilege,
    pub coherence: Coherence,
    /// Region in the launching task from which privileges are derived.
    pub parent: LogicalRegion,
    pub fields: Vec<FieldId>,
}

impl RegionRequirement {
    pub fn region(
        region: LogicalRegion,
        privilege: Privilege,
        coherence: Coherence,
        parent: LogicalRegion,
    ) -> Self {
        Self {
            target: RegionTarget::Region(region),
            privilege,
            coherence,
            parent,
            fields: Vec::new(),
        }
    }

    pub fn partition(
        partition: LogicalPartition,
        projection: u32,
        privilege: Privilege,
        coherence: Coherence,
        parent: LogicalRegion,
    ) -> Self {
        Self {
            target: RegionTarget::Partition {
                partition,
                projection,
            },
            privilege,
            coherence,
            parent,
            fields: Vec::new(),
        }
    }

    /// Adds a field to the requirement.
    pub fn add_field(mut self, fid: FieldId) -> Self {
        if !self.fields.contains(&fid) {
            self.fields.push(fid);
        }
        self
    }

    /// Tree every access of this requirement lands in.
    pub fn tree(&self) -> super::space::RegionTreeId {
        self.parent.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_subsumption() {
        assert!(Privilege::ReadWrite.subsumes(Privilege::ReadOnly));
        assert!(Privilege::ReadWrite.subsumes(Privilege::WriteDiscard));
        assert!(Privilege::ReadOnly.subsumes(Privilege::ReadOnly));
        assert!(!Privilege::ReadOnly.subsumes(Privilege::ReadWrite));
        assert!(!Privilege::WriteDiscard.subsumes(Privilege::ReadOnly));
    }

    #[test]
    fn test_privilege_access_flags() {
        assert!(Privilege::ReadOnly.reads() && !Privilege::ReadOnly.writes());
        assert!(Privilege::WriteDiscard.writes() && !Privilege::WriteDiscard.reads());
        assert!(Privilege::ReadWrite.reads() && Privilege::ReadWrite.writes());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Privilege::WriteDiscard.to_string(), "WRITE_DISCARD");
        assert_eq!(Coherence::Simultaneous.to_string(), "SIMULTANEOUS");
    }
}
