use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Axis-aligned rectangle in world units
///
/// All dungeon geometry (rooms, walls, hallways, exits) is rectangular, so
/// overlap and merge semantics live here.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center point of the rectangle
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// AABB overlap test. Strict inequalities: rectangles that merely share
    /// an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Minimal enclosing rectangle of two rectangles
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Point containment, inclusive of all edges
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Whether `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_bottom() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
    }

    #[test]
    fn test_center() {
        let r = Rect::new(100.0, 100.0, 50.0, 30.0);
        assert_eq!(r.center(), Vec2::new(125.0, 115.0));
    }

    #[test]
    fn test_overlaps() {
        let a = Rect::new(100.0, 100.0, 100.0, 100.0);
        let b = Rect::new(150.0, 150.0, 100.0, 100.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_overlaps_disjoint() {
        let a = Rect::new(0.0, 0.0, 50.0, 50.0);
        let b = Rect::new(100.0, 100.0, 50.0, 50.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_edge_touch_is_not_overlap() {
        let a = Rect::new(0.0, 0.0, 50.0, 50.0);
        let b = Rect::new(50.0, 0.0, 50.0, 50.0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_union() {
        let a = Rect::new(100.0, 100.0, 100.0, 100.0);
        let b = Rect::new(150.0, 150.0, 100.0, 100.0);
        assert_eq!(a.union(&b), Rect::new(100.0, 100.0, 150.0, 150.0));
    }

    #[test]
    fn test_union_contained() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inner = Rect::new(25.0, 25.0, 10.0, 10.0);
        assert_eq!(outer.union(&inner), outer);
    }

    #[test]
    fn test_contains_point() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains_point(Vec2::new(15.0, 15.0)));
        assert!(r.contains_point(Vec2::new(10.0, 10.0))); // corner inclusive
        assert!(r.contains_point(Vec2::new(30.0, 30.0)));
        assert!(!r.contains_point(Vec2::new(31.0, 15.0)));
    }

    #[test]
    fn test_contains_rect() {
        let outer = Rect::new(0.0, 0.0, 800.0, 800.0);
        assert!(outer.contains_rect(&Rect::new(100.0, 100.0, 200.0, 200.0)));
        assert!(outer.contains_rect(&outer));
        assert!(!outer.contains_rect(&Rect::new(700.0, 700.0, 200.0, 200.0)));
    }
}
