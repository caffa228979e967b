//! The aliasing partition handed to rendering workers.

use super::coloring::DomainColoring;
use crate::region::{Point1, Rect1};
use crate::runtime::RuntimeError;

/// Splits a domain into `parts` views that each cover the whole domain.
///
/// Every worker sees every element, so the resulting partition is aliased and
/// must be created with the disjointness flag off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AliasedPartitionScheme {
    parts: i64,
}

impl AliasedPartitionScheme {
    /// Disjointness flag passed to the runtime for partitions of this scheme.
    pub const DISJOINT: bool = false;

    /// Creates the scheme. At least one part is required.
    pub fn new(parts: i64) -> Result<Self, RuntimeError> {
        if parts < 1 {
            return Err(RuntimeError::invariant(format!(
                "partition count must be at least 1, got {}",
                parts
            )));
        }
        Ok(Self { parts })
    }

    pub fn parts(&self) -> i64 {
        self.parts
    }

    /// Color space `[0, parts)`.
    pub fn color_space(&self) -> Rect1 {
        Rect1::from_size(self.parts)
    }

    /// Colors `domain` so that every color maps to all of it.
    pub fn coloring(&self, domain: Rect1) -> DomainColoring {
        let mut coloring = DomainColoring::new();
        for color in 0..self.parts {
            coloring.insert(Point1(color), domain);
        }
        coloring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_view_spans_domain() {
        let scheme = AliasedPartitionScheme::new(4).unwrap();
        let domain = Rect1::from_size(1024);
        let coloring = scheme.coloring(domain);

        assert_eq!(coloring.len(), 4);
        assert!(coloring.iter().all(|(_, rect)| rect == domain));
        assert!(coloring.covers(domain));
        assert!(!coloring.is_disjoint());
        assert_eq!(scheme.color_space(), Rect1::new(0, 3));
    }

    #[test]
    fn test_single_part() {
        let scheme = AliasedPartitionScheme::new(1).unwrap();
        let coloring = scheme.coloring(Rect1::from_size(16));
        assert_eq!(coloring.len(), 1);
        assert_eq!(coloring.get(Point1(0)), Some(&Rect1::from_size(16)));
    }

    #[test]
    fn test_more_parts_than_elements() {
        let scheme = AliasedPartitionScheme::new(8).unwrap();
        let coloring = scheme.coloring(Rect1::from_size(2));
        assert_eq!(coloring.len(), 8);
        assert!(coloring.covers(Rect1::from_size(2)));
    }

    #[test]
    fn test_zero_parts_rejected() {
        assert!(matches!(
            AliasedPartitionScheme::new(0),
            Err(RuntimeError::InvariantViolation(_))
        ));
        assert!(AliasedPartitionScheme::new(-3).is_err());
    }

    #[test]
    fn test_flag_stays_aliased() {
        assert!(!AliasedPartitionScheme::DISJOINT);
    }
}
