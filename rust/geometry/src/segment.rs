// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Oriented line segments and closed loops.
//!
//! Comparisons between segments are always tolerance based. Plan queries
//! (intersection) work on X/Y only and interpolate Z along `self`.

use nalgebra::{Point3, Vector3};

/// Oriented line between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl Segment {
    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn vector(&self) -> Vector3<f64> {
        self.end - self.start
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.vector().norm()
    }

    /// Unit direction, or `None` for a zero-length segment.
    pub fn direction(&self) -> Option<Vector3<f64>> {
        self.vector().try_normalize(1e-12)
    }

    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.start, &self.end)
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.end, self.start)
    }

    pub fn is_degenerate(&self, min_length: f64) -> bool {
        self.length() < min_length
    }

    /// Extends the segment by `length` at both ends along its direction.
    pub fn extended(&self, length: f64) -> Self {
        match self.direction() {
            Some(dir) if length != 0.0 => {
                let offset = dir * length;
                Self::new(self.start - offset, self.end + offset)
            }
            _ => *self,
        }
    }

    /// Point at parameter `t` (0 = start, 1 = end).
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.start + self.vector() * t
    }

    /// Parameter of the orthogonal projection of `p` on the infinite line.
    pub fn parameter_of(&self, p: &Point3<f64>) -> f64 {
        let v = self.vector();
        let len_sq = v.norm_squared();
        if len_sq < 1e-24 {
            return 0.0;
        }
        (p - self.start).dot(&v) / len_sq
    }

    /// Distance from `p` to the closest point of the bounded segment.
    pub fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        let t = self.parameter_of(p).clamp(0.0, 1.0);
        (p - self.point_at(t)).norm()
    }

    /// Distance from `p` to the infinite line through the segment.
    pub fn line_distance_to_point(&self, p: &Point3<f64>) -> f64 {
        match self.direction() {
            Some(dir) => {
                let w = p - self.start;
                (w - dir * w.dot(&dir)).norm()
            }
            None => (p - self.start).norm(),
        }
    }

    /// Same or opposite direction within `tolerance` (sine of the angle).
    pub fn is_parallel(&self, other: &Segment, tolerance: f64) -> bool {
        match (self.direction(), other.direction()) {
            (Some(a), Some(b)) => a.cross(&b).norm() <= tolerance,
            _ => false,
        }
    }

    /// Parallel, on the same line within `offset_tolerance`, and with
    /// intersecting parametric ranges. Touching ranges count as overlapping.
    pub fn is_collinear_overlapping(
        &self,
        other: &Segment,
        direction_tolerance: f64,
        offset_tolerance: f64,
    ) -> bool {
        if !self.is_parallel(other, direction_tolerance) {
            return false;
        }
        if self.line_distance_to_point(&other.start) > offset_tolerance
            || self.line_distance_to_point(&other.end) > offset_tolerance
        {
            return false;
        }

        let t0 = self.parameter_of(&other.start);
        let t1 = self.parameter_of(&other.end);
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        lo.max(0.0) <= hi.min(1.0)
    }

    /// Plan (X/Y) intersection of two bounded segments.
    ///
    /// Parallel and collinear pairs yield `None`. `tolerance` is a length that
    /// widens both segments' bounds so that touching endpoints intersect.
    pub fn intersect_plan(&self, other: &Segment, tolerance: f64) -> Option<Point3<f64>> {
        let d1 = self.vector();
        let d2 = other.vector();
        let denom = cross2(&d1, &d2);
        let len1 = d1.xy().norm();
        let len2 = d2.xy().norm();
        if len1 < 1e-12 || len2 < 1e-12 || denom.abs() < 1e-12 * len1 * len2 {
            return None;
        }

        let w = other.start - self.start;
        let t = cross2(&w, &d2) / denom;
        let u = cross2(&w, &d1) / denom;

        let eps_t = tolerance / len1;
        let eps_u = tolerance / len2;
        if t < -eps_t || t > 1.0 + eps_t || u < -eps_u || u > 1.0 + eps_u {
            return None;
        }
        Some(self.point_at(t))
    }
}

#[inline]
fn cross2(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Ordered, cyclic sequence of segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loop {
    segments: Vec<Segment>,
}

impl Loop {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn perimeter(&self) -> f64 {
        self.segments.iter().map(Segment::length).sum()
    }

    /// Every consecutive pair (last → first included) meets within `tolerance`.
    pub fn is_closed(&self, tolerance: f64) -> bool {
        let n = self.segments.len();
        if n < 2 {
            return false;
        }
        (0..n).all(|i| {
            let next = &self.segments[(i + 1) % n];
            (self.segments[i].end - next.start).norm() <= tolerance
        })
    }

    /// Start points in order.
    pub fn vertices(&self) -> Vec<Point3<f64>> {
        self.segments.iter().map(|s| s.start).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seg(a: (f64, f64), b: (f64, f64)) -> Segment {
        Segment::new(Point3::new(a.0, a.1, 0.0), Point3::new(b.0, b.1, 0.0))
    }

    #[test]
    fn test_extended() {
        let s = seg((0.0, 0.0), (2.0, 0.0)).extended(0.4);
        assert_relative_eq!(s.start, Point3::new(-0.4, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(s.end, Point3::new(2.4, 0.0, 0.0), epsilon = 1e-12);

        let degenerate = seg((1.0, 1.0), (1.0, 1.0));
        assert_eq!(degenerate.extended(0.4), degenerate);
    }

    #[test]
    fn test_distance_to_point_is_bounded() {
        let s = seg((0.0, 0.0), (4.0, 0.0));
        assert_relative_eq!(s.distance_to_point(&Point3::new(2.0, 3.0, 0.0)), 3.0);
        assert_relative_eq!(s.distance_to_point(&Point3::new(7.0, 4.0, 0.0)), 5.0);
        assert_relative_eq!(s.line_distance_to_point(&Point3::new(7.0, 4.0, 0.0)), 4.0);
    }

    #[test]
    fn test_parallel_in_either_direction() {
        let a = seg((0.0, 0.0), (4.0, 0.0));
        assert!(a.is_parallel(&seg((5.0, 1.0), (1.0, 1.0)), 1e-3));
        assert!(!a.is_parallel(&seg((0.0, 0.0), (0.0, 1.0)), 1e-3));
    }

    #[test]
    fn test_collinear_overlapping() {
        let a = seg((0.0, 0.0), (4.0, 0.0));
        assert!(a.is_collinear_overlapping(&seg((6.0, 0.005), (3.0, 0.005)), 1e-3, 0.01));
        assert!(a.is_collinear_overlapping(&seg((4.0, 0.0), (5.0, 0.0)), 1e-3, 0.01));
        // Disjoint ranges on the same line
        assert!(!a.is_collinear_overlapping(&seg((5.0, 0.0), (6.0, 0.0)), 1e-3, 0.01));
        // Parallel but offset
        assert!(!a.is_collinear_overlapping(&seg((0.0, 0.5), (4.0, 0.5)), 1e-3, 0.01));
    }

    #[test]
    fn test_intersect_plan() {
        let a = seg((0.0, 0.0), (4.0, 0.0));
        let p = a.intersect_plan(&seg((1.0, -1.0), (1.0, 1.0)), 1e-6).unwrap();
        assert_relative_eq!(p, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);

        // Touching at an endpoint
        assert!(a.intersect_plan(&seg((4.0, 0.0), (4.0, 3.0)), 1e-6).is_some());
        // Out of range
        assert!(a.intersect_plan(&seg((5.0, -1.0), (5.0, 1.0)), 1e-6).is_none());
        // Parallel
        assert!(a.intersect_plan(&seg((0.0, 1.0), (4.0, 1.0)), 1e-6).is_none());
    }

    #[test]
    fn test_loop_perimeter_and_closure() {
        let l = Loop::new(vec![
            seg((0.0, 0.0), (2.0, 0.0)),
            seg((2.0, 0.0), (2.0, 1.0)),
            seg((2.0, 1.0), (0.0, 1.0)),
            seg((0.0, 1.0), (0.0, 0.0)),
        ]);
        assert_relative_eq!(l.perimeter(), 6.0);
        assert!(l.is_closed(1e-9));

        let open = Loop::new(l.segments()[..3].to_vec());
        assert!(!open.is_closed(1e-9));
    }
}
