//! Integer geometry: points, rectangles and half-open ranges.

use serde::{Deserialize, Serialize};

/// A 2D integer vector (position or size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Int2 {
    pub x: i32,
    pub y: i32,
}

impl Int2 {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn add(self, other: Int2) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub const fn sub(self, other: Int2) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// An axis-aligned rectangle with its origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Int2,
    pub size: Int2,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            pos: Int2::new(x, y),
            size: Int2::new(w, h),
        }
    }

    pub const fn left(&self) -> i32 {
        self.pos.x
    }

    pub const fn right(&self) -> i32 {
        self.pos.x + self.size.x
    }

    pub const fn top(&self) -> i32 {
        self.pos.y
    }

    pub const fn bottom(&self) -> i32 {
        self.pos.y + self.size.y
    }

    pub const fn width(&self) -> i32 {
        self.size.x
    }

    pub const fn height(&self) -> i32 {
        self.size.y
    }

    pub const fn mid(&self) -> Int2 {
        Int2::new(self.pos.x + self.size.x / 2, self.pos.y + self.size.y / 2)
    }

    pub const fn is_empty(&self) -> bool {
        self.size.x <= 0 || self.size.y <= 0
    }

    /// Whether `p` lies inside the rectangle (right/bottom edges exclusive).
    pub const fn contains(&self, p: Int2) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    /// Vertical span of the rectangle.
    pub const fn y_span(&self) -> Rangei {
        Rangei::new(self.top(), self.bottom())
    }

    pub const fn moved(&self, d: Int2) -> Self {
        Self {
            pos: self.pos.add(d),
            size: self.size,
        }
    }

    /// Shrink by `d` on every side.
    pub const fn shrunk(&self, d: Int2) -> Self {
        Rect::new(
            self.pos.x + d.x,
            self.pos.y + d.y,
            self.size.x - 2 * d.x,
            self.size.y - 2 * d.y,
        )
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.left().min(other.left());
        let y0 = self.top().min(other.top());
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.left().max(other.left());
        let y0 = self.top().max(other.top());
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }
}

/// A half-open integer range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rangei {
    pub start: i32,
    pub end: i32,
}

impl Rangei {
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub const fn size(&self) -> i32 {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub const fn contains(&self, v: i32) -> bool {
        v >= self.start && v < self.end
    }

    pub const fn overlaps(&self, other: &Rangei) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn intersect(&self, other: &Rangei) -> Rangei {
        let r = Rangei::new(self.start.max(other.start), self.end.min(other.end));
        if r.is_empty() { Rangei::default() } else { r }
    }

    /// Smallest range covering both; empty ranges are ignored.
    pub fn union(&self, other: &Rangei) -> Rangei {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rangei::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_edges() {
        let r = Rect::new(10, 20, 30, 40);
        assert_eq!(r.left(), 10);
        assert_eq!(r.right(), 40);
        assert_eq!(r.top(), 20);
        assert_eq!(r.bottom(), 60);
        assert_eq!(r.mid(), Int2::new(25, 40));
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(0, 0, 10, 10);
        assert!(r.contains(Int2::new(0, 0)));
        assert!(r.contains(Int2::new(9, 9)));
        assert!(!r.contains(Int2::new(10, 5)));
        assert!(!r.contains(Int2::new(5, 10)));
    }

    #[test]
    fn rect_union_skips_empty() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.union(&Rect::default()), a);
        let b = Rect::new(20, 5, 5, 20);
        assert_eq!(a.union(&b), Rect::new(0, 0, 25, 25));
    }

    #[test]
    fn rect_intersect_disjoint_is_empty() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 5, 5);
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn range_overlap() {
        let a = Rangei::new(0, 10);
        assert!(a.overlaps(&Rangei::new(9, 12)));
        assert!(!a.overlaps(&Rangei::new(10, 12)));
        assert_eq!(a.intersect(&Rangei::new(5, 15)), Rangei::new(5, 10));
        assert!(a.intersect(&Rangei::new(10, 15)).is_empty());
    }

    #[test]
    fn range_union() {
        let a = Rangei::new(0, 10);
        assert_eq!(a.union(&Rangei::new(20, 30)), Rangei::new(0, 30));
        assert_eq!(Rangei::default().union(&a), a);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn intersect_is_within_both(a0 in -100i32..100, al in 0i32..100,
                                        b0 in -100i32..100, bl in 0i32..100) {
                let a = Rangei::new(a0, a0 + al);
                let b = Rangei::new(b0, b0 + bl);
                let i = a.intersect(&b);
                if !i.is_empty() {
                    prop_assert!(i.start >= a.start && i.end <= a.end);
                    prop_assert!(i.start >= b.start && i.end <= b.end);
                }
            }
        }
    }
}
