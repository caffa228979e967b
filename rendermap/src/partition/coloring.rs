//! Domain colorings: the color → subdomain maps partitions are built from.

use crate::region::{Point1, Rect1};
use std::collections::BTreeMap;

/// Maps each color to the rectangle of the parent domain it covers.
///
/// Colors may map to overlapping rectangles; whether they do is a property
/// checked with [`is_disjoint`](Self::is_disjoint), not an invariant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainColoring {
    colors: BTreeMap<Point1, Rect1>,
}

impl DomainColoring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `rect` to `color`, replacing any earlier assignment.
    pub fn insert(&mut self, color: Point1, rect: Rect1) {
        self.colors.insert(color, rect);
    }

    pub fn get(&self, color: Point1) -> Option<&Rect1> {
        self.colors.get(&color)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Iterates colors in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Point1, Rect1)> + '_ {
        self.colors.iter().map(|(c, r)| (*c, *r))
    }

    /// Smallest rectangle containing every color, empty if there are none.
    pub fn color_space(&self) -> Rect1 {
        match (self.colors.keys().next(), self.colors.keys().next_back()) {
            (Some(lo), Some(hi)) => Rect1 { lo: *lo, hi: *hi },
            _ => Rect1::from_size(0),
        }
    }

    /// True if no two colors share a point.
    pub fn is_disjoint(&self) -> bool {
        let mut rects: Vec<Rect1> = self.colors.values().filter(|r| !r.is_empty()).copied().collect();
        rects.sort_by_key(|r| r.lo);
        rects.windows(2).all(|w| !w[0].overlaps(&w[1]))
    }

    /// True if the union of all colors is exactly `domain`.
    pub fn covers(&self, domain: Rect1) -> bool {
        let mut rects: Vec<Rect1> = self.colors.values().filter(|r| !r.is_empty()).copied().collect();
        if domain.is_empty() {
            return rects.is_empty();
        }
        rects.sort_by_key(|r| r.lo);

        let mut next = domain.lo.0;
        for rect in rects {
            if rect.lo.0 < domain.lo.0 || rect.hi.0 > domain.hi.0 {
                return false;
            }
            if rect.lo.0 > next {
                return false;
            }
            next = next.max(rect.hi.0.saturating_add(1));
        }
        next > domain.hi.0
    }
}
