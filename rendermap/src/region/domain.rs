//! One-dimensional index domains.

use std::fmt;

/// A point in a 1-D index space.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Point1(pub i64);

impl fmt::Display for Point1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0)
    }
}

/// An inclusive 1-D rectangle `[lo, hi]`. Empty when `hi < lo`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Rect1 {
    pub lo: Point1,
    pub hi: Point1,
}

impl Rect1 {
    pub fn new(lo: i64, hi: i64) -> Self {
        Self {
            lo: Point1(lo),
            hi: Point1(hi),
        }
    }

    /// The rectangle `[0, size)`. Non-positive sizes give an empty rectangle.
    pub fn from_size(size: i64) -> Self {
        Self::new(0, size.saturating_sub(1))
    }

    pub fn is_empty(&self) -> bool {
        self.hi.0 < self.lo.0
    }

    /// Number of points in the rectangle.
    pub fn volume(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.hi.0 - self.lo.0) as u64 + 1
        }
    }

    pub fn contains(&self, p: Point1) -> bool {
        self.lo.0 <= p.0 && p.0 <= self.hi.0
    }

    /// True if every point of `other` lies in `self`. Empty rectangles are
    /// contained everywhere.
    pub fn contains_rect(&self, other: &Rect1) -> bool {
        other.is_empty() || (self.contains(other.lo) && self.contains(other.hi))
    }

    pub fn overlaps(&self, other: &Rect1) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.lo.0 <= other.hi.0
            && other.lo.0 <= self.hi.0
    }

    /// Zero-based offset of `p` from `lo`, if `p` is inside.
    pub fn offset_of(&self, p: Point1) -> Option<usize> {
        if self.contains(p) {
            Some((p.0 - self.lo.0) as usize)
        } else {
            None
        }
    }

    /// Iterates over all points in ascending order.
    pub fn points(&self) -> impl Iterator<Item = Point1> {
        (self.lo.0..=self.hi.0).map(Point1)
    }
}

impl fmt::Display for Rect1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lo.0, self.hi.0)
    }
}
