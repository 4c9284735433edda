// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loop reconstruction from unordered boundary segments.

use nalgebra::Point3;

use crate::segment::{Loop, Segment};

/// Orders `segments` into a closed loop.
///
/// Chaining is greedy nearest-neighbour starting from the first segment: at
/// each step the remaining segment whose start or end lies closest to the
/// current end point is appended, reversed if its end was the closer one.
/// Ties go to the first candidate found, and a start point wins over an end
/// point at equal distance.
///
/// A repair pass then walks consecutive pairs cyclically. Gaps wider than
/// `tolerance` get a closing segment; narrower non-zero gaps are closed by
/// moving the current segment's end onto the next segment's start.
///
/// A single segment is returned unchanged.
pub fn close_loop(segments: Vec<Segment>, tolerance: f64) -> Loop {
    if segments.len() < 2 {
        return Loop::new(segments);
    }

    let ordered = chain_nearest(segments);
    let n = ordered.len();
    let mut closed = Vec::with_capacity(n + 1);
    for i in 0..n {
        let mut current = ordered[i];
        let next_start = ordered[(i + 1) % n].start;
        let gap = (current.end - next_start).norm();

        if gap > tolerance {
            closed.push(current);
            closed.push(Segment::new(current.end, next_start));
        } else {
            if gap > 0.0 {
                current.end = next_start;
            }
            closed.push(current);
        }
    }
    Loop::new(closed)
}

fn chain_nearest(mut remaining: Vec<Segment>) -> Vec<Segment> {
    let mut ordered = Vec::with_capacity(remaining.len());
    ordered.push(remaining.remove(0));

    while !remaining.is_empty() {
        let last_point = ordered[ordered.len() - 1].end;
        let mut best_index = 0;
        let mut best_reversed = false;
        let mut min_distance = f64::MAX;

        for (i, candidate) in remaining.iter().enumerate() {
            let to_start = (candidate.start - last_point).norm();
            let to_end = (candidate.end - last_point).norm();
            if to_start < min_distance {
                min_distance = to_start;
                best_index = i;
                best_reversed = false;
            }
            if to_end < min_distance {
                min_distance = to_end;
                best_index = i;
                best_reversed = true;
            }
        }

        let chosen = remaining.remove(best_index);
        ordered.push(if best_reversed { chosen.reversed() } else { chosen });
    }
    ordered
}

/// Turns a polygon outline into boundary segments.
///
/// A trailing vertex equal to the first is dropped. Edges shorter than
/// `min_edge` are skipped and the next edge starts from the last kept point,
/// so short edges never become degenerate segments.
pub fn polygon_to_segments(vertices: &[Point3<f64>], min_edge: f64) -> Vec<Segment> {
    let mut points = vertices;
    if points.len() > 1 && points.first() == points.last() {
        points = &points[..points.len() - 1];
    }
    if points.len() < 2 {
        return Vec::new();
    }

    let mut segments = Vec::with_capacity(points.len());
    let mut previous = points[0];
    for i in 0..points.len() {
        let next = points[(i + 1) % points.len()];
        if (next - previous).norm() >= min_edge {
            segments.push(Segment::new(previous, next));
            previous = next;
        }
    }
    segments
}

/// Boundary of a quadrilateral given its corners in order.
pub fn quad_segments(corners: &[Point3<f64>; 4]) -> Vec<Segment> {
    (0..4)
        .map(|i| Segment::new(corners[i], corners[(i + 1) % 4]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3<f64> {
        Point3::new(x, y, 0.0)
    }

    fn rectangle(w: f64, d: f64) -> Vec<Segment> {
        quad_segments(&[p(0.0, 0.0), p(w, 0.0), p(w, d), p(0.0, d)])
    }

    #[test]
    fn test_ordered_closed_input_is_unchanged() {
        let segments = rectangle(4.0, 3.0);
        let l = close_loop(segments.clone(), 0.007);
        assert_eq!(l.segments(), segments.as_slice());
    }

    #[test]
    fn test_shuffled_and_reversed_input_keeps_perimeter() {
        let r = rectangle(4.0, 3.0);
        let shuffled = vec![r[2], r[0].reversed(), r[3], r[1].reversed()];
        let l = close_loop(shuffled, 0.007);

        assert_eq!(l.len(), 4);
        assert!(l.is_closed(1e-12));
        assert_relative_eq!(l.perimeter(), 14.0, epsilon = 1e-9);
    }

    #[test]
    fn test_large_gap_inserts_closing_segment() {
        let r = rectangle(4.0, 3.0);
        // Drop the last edge: a 3 m gap remains between (0,3) and (0,0).
        let l = close_loop(r[..3].to_vec(), 0.007);
        assert_eq!(l.len(), 4);
        assert!(l.is_closed(1e-12));
        assert_relative_eq!(l.segments()[3].start, p(0.0, 3.0));
        assert_relative_eq!(l.segments()[3].end, p(0.0, 0.0));
    }

    #[test]
    fn test_small_gap_is_snapped() {
        let mut r = rectangle(4.0, 3.0);
        r[1].start = p(4.003, 0.0);
        let l = close_loop(r, 0.007);
        assert_eq!(l.len(), 4);
        assert!(l.is_closed(1e-12));
        assert_relative_eq!(l.segments()[0].end, p(4.003, 0.0));
    }

    #[test]
    fn test_single_segment_is_returned_unchanged() {
        let s = Segment::new(p(0.0, 0.0), p(1.0, 0.0));
        let l = close_loop(vec![s], 0.007);
        assert_eq!(l.segments(), &[s]);
        assert!(!l.is_closed(0.007));
    }

    #[test]
    fn test_polygon_drops_closing_vertex_and_short_edges() {
        let outline = [
            p(0.0, 0.0),
            p(5.0, 0.0),
            p(5.0005, 0.0),
            p(5.0, 2.0),
            p(0.0, 2.0),
            p(0.0, 0.0),
        ];
        let segments = polygon_to_segments(&outline, 0.001);
        assert_eq!(segments.len(), 4);
        let l = close_loop(segments, 0.007);
        assert!(l.is_closed(1e-9));
        assert_relative_eq!(l.perimeter(), 14.0, epsilon = 1e-3);
    }
}
