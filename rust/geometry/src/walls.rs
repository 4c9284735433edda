// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Communal wall topology merging.
//!
//! Walls that bound one shared space are authored independently by every
//! adjacent room, so the same physical wall shows up several times with
//! slightly different centerlines. [`merge_communal_walls`] reduces such a
//! group to one centerline per physical wall in five stages:
//!
//! 1. extend every centerline at both ends
//! 2. merge collinear overlapping centerlines
//! 3. trim at mutual intersections and drop pieces near the centroid
//! 4. order by connectivity, bridging gaps with synthesized segments
//! 5. coalesce consecutive parallel runs
//!
//! Every output wall records the input index it takes its attributes from.
//! In a merge group the first authored member wins. Trimmed pieces keep
//! their source, and bridging segments take the source of the wall before
//! them but stay flagged as synthesized.

use std::collections::VecDeque;

use nalgebra::Point3;
use smallvec::SmallVec;

use crate::segment::Segment;
use crate::tolerance::Tolerances;

/// A centerline produced by the merger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedWall {
    pub centerline: Segment,
    /// Index of the input centerline whose attributes this wall inherits.
    pub source: usize,
    /// True for segments bridging a gap between unconnected walls.
    pub synthesized: bool,
}

impl MergedWall {
    pub fn new(centerline: Segment, source: usize) -> Self {
        Self {
            centerline,
            source,
            synthesized: false,
        }
    }
}

/// Runs the full merge pipeline over the centerlines of one space.
pub fn merge_communal_walls(centerlines: &[Segment], tol: &Tolerances) -> Vec<MergedWall> {
    let walls: Vec<MergedWall> = centerlines
        .iter()
        .enumerate()
        .map(|(i, s)| MergedWall::new(s.extended(tol.wall_extension), i))
        .collect();

    let walls = merge_overlapping(walls, tol);
    let walls = trim_interior(walls, tol);
    let walls = order_walls(walls, tol.connectivity_tolerance);
    coalesce_parallel(walls, tol)
}

/// Segment spanning the two most distant endpoints among `segments`.
///
/// Endpoints closer than `tolerance` count once. Returns `None` when fewer
/// than two distinct endpoints remain.
pub fn merge_colinear(segments: &[Segment], tolerance: f64) -> Option<Segment> {
    let mut points: Vec<Point3<f64>> = Vec::with_capacity(segments.len() * 2);
    for s in segments {
        for p in [s.start, s.end] {
            if !points.iter().any(|q| (q - p).norm() < tolerance) {
                points.push(p);
            }
        }
    }

    let mut best: Option<(usize, usize)> = None;
    let mut max_distance = 0.0;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = (points[j] - points[i]).norm();
            if d > max_distance {
                max_distance = d;
                best = Some((i, j));
            }
        }
    }
    best.map(|(i, j)| Segment::new(points[i], points[j]))
}

/// Stage 2: groups collinear overlapping walls and merges each group.
///
/// Walls are taken from the back. Each group grows by scanning the remaining
/// walls backwards and comparing against the member added last.
pub fn merge_overlapping(mut walls: Vec<MergedWall>, tol: &Tolerances) -> Vec<MergedWall> {
    let mut merged = Vec::with_capacity(walls.len());
    while let Some(seed) = walls.pop() {
        let mut group = vec![seed];
        for i in (0..walls.len()).rev() {
            let last = group[group.len() - 1].centerline;
            if last.is_collinear_overlapping(
                &walls[i].centerline,
                tol.direction_tolerance,
                tol.collinear_offset_tolerance,
            ) {
                group.push(walls.remove(i));
            }
        }
        merged.push(merge_group(&group, tol));
    }
    merged
}

/// Stage 3: splits every wall at its intersections with the others and keeps
/// the pieces farther than `interior_trim_distance` from the centroid of all
/// wall midpoints.
///
/// An end joined to another wall (an intersection within twice
/// `wall_extension` of it) is cut at that intersection. A free end is pulled
/// back by `wall_extension` to its authored position, so the stage 1
/// overshoot never survives this stage.
pub fn trim_interior(walls: Vec<MergedWall>, tol: &Tolerances) -> Vec<MergedWall> {
    if walls.is_empty() {
        return walls;
    }
    let centroid = Point3::from(
        walls
            .iter()
            .map(|w| w.centerline.midpoint().coords)
            .sum::<nalgebra::Vector3<f64>>()
            / walls.len() as f64,
    );
    let join_reach = 2.0 * tol.wall_extension + tol.connectivity_tolerance;

    let mut trimmed = Vec::with_capacity(walls.len());
    for (i, wall) in walls.iter().enumerate() {
        let line = wall.centerline;
        let mut hits: SmallVec<[(f64, Point3<f64>); 4]> = walls
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .filter_map(|(_, other)| line.intersect_plan(&other.centerline, tol.degenerate_length))
            .map(|p| (line.parameter_of(&p), p))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.dedup_by(|a, b| (a.1 - b.1).norm() < tol.degenerate_length);

        let authored = line.extended(-tol.wall_extension);
        let mut breaks: SmallVec<[Point3<f64>; 6]> = SmallVec::new();
        let start_joined = hits
            .first()
            .is_some_and(|h| (h.1 - line.start).norm() <= join_reach);
        if !start_joined {
            breaks.push(authored.start);
        }
        breaks.extend(hits.iter().map(|h| h.1));
        let end_joined = hits
            .last()
            .is_some_and(|h| (h.1 - line.end).norm() <= join_reach);
        if !end_joined {
            breaks.push(authored.end);
        }

        for pair in breaks.windows(2) {
            let piece = Segment::new(pair[0], pair[1]);
            if piece.is_degenerate(tol.degenerate_length) {
                continue;
            }
            if piece.distance_to_point(&centroid) > tol.interior_trim_distance {
                trimmed.push(MergedWall { centerline: piece, ..*wall });
            }
        }
    }
    trimmed
}

/// Stage 4: chains walls by connectivity starting from the first.
///
/// A wall with an endpoint within `tolerance` of the chain's end is appended
/// (reversed when its end matches). Failing that, a wall touching the chain's
/// start is prepended, so an open outline is walked from end to end. Only
/// when neither end connects is the wall with the endpoint nearest the
/// chain's end appended, behind a synthesized segment bridging the gap. The
/// chain is not forced closed.
pub fn order_walls(mut walls: Vec<MergedWall>, tolerance: f64) -> Vec<MergedWall> {
    if walls.len() < 2 {
        return walls;
    }

    let mut ordered = VecDeque::with_capacity(walls.len() * 2);
    ordered.push_back(walls.remove(0));

    while !walls.is_empty() {
        let Some(&last) = ordered.back() else {
            break;
        };
        let end = last.centerline.end;
        if let Some((i, reversed)) = touching(&walls, &end, tolerance, false) {
            ordered.push_back(oriented(walls.remove(i), reversed));
            continue;
        }

        let Some(start) = ordered.front().map(|w| w.centerline.start) else {
            break;
        };
        if let Some((i, reversed)) = touching(&walls, &start, tolerance, true) {
            ordered.push_front(oriented(walls.remove(i), reversed));
            continue;
        }

        let mut best = (0, false);
        let mut min_distance = f64::MAX;
        for (i, w) in walls.iter().enumerate() {
            let to_start = (w.centerline.start - end).norm();
            let to_end = (w.centerline.end - end).norm();
            if to_start < min_distance {
                min_distance = to_start;
                best = (i, false);
            }
            if to_end < min_distance {
                min_distance = to_end;
                best = (i, true);
            }
        }

        let wall = oriented(walls.remove(best.0), best.1);
        ordered.push_back(MergedWall {
            centerline: Segment::new(end, wall.centerline.start),
            source: last.source,
            synthesized: true,
        });
        ordered.push_back(wall);
    }
    ordered.into()
}

/// First wall with an endpoint within `tolerance` of `point`, and whether it
/// must be reversed. With `at_start` the wall is oriented to end at `point`.
fn touching(
    walls: &[MergedWall],
    point: &Point3<f64>,
    tolerance: f64,
    at_start: bool,
) -> Option<(usize, bool)> {
    walls.iter().enumerate().find_map(|(i, w)| {
        let starts_here = (w.centerline.start - *point).norm() < tolerance;
        let ends_here = (w.centerline.end - *point).norm() < tolerance;
        match (starts_here, ends_here) {
            (true, _) => Some((i, at_start)),
            (false, true) => Some((i, !at_start)),
            _ => None,
        }
    })
}

/// Stage 5: merges each run of consecutive parallel walls into one.
///
/// Synthesized segments never join a run of real walls, so they reach the
/// caller as separate entries.
pub fn coalesce_parallel(walls: Vec<MergedWall>, tol: &Tolerances) -> Vec<MergedWall> {
    let mut result = Vec::with_capacity(walls.len());
    let mut run: Vec<MergedWall> = Vec::new();

    for wall in walls {
        let continues = run.last().is_some_and(|last| {
            last.synthesized == wall.synthesized
                && last
                    .centerline
                    .is_parallel(&wall.centerline, tol.direction_tolerance)
        });
        if !continues && !run.is_empty() {
            result.push(merge_group(&run, tol));
            run.clear();
        }
        run.push(wall);
    }
    if !run.is_empty() {
        result.push(merge_group(&run, tol));
    }
    result
}

/// Index of the wall closest to `point`. Ties go to the first wall.
pub fn select_door_host(walls: &[Segment], point: &Point3<f64>) -> Option<usize> {
    let mut best = None;
    let mut min_distance = f64::MAX;
    for (i, wall) in walls.iter().enumerate() {
        let d = wall.distance_to_point(point);
        if d < min_distance {
            min_distance = d;
            best = Some(i);
        }
    }
    best
}

fn oriented(wall: MergedWall, reversed: bool) -> MergedWall {
    if reversed {
        MergedWall {
            centerline: wall.centerline.reversed(),
            ..wall
        }
    } else {
        wall
    }
}

fn merge_group(group: &[MergedWall], tol: &Tolerances) -> MergedWall {
    let first = group[0];
    if group.len() == 1 {
        return first;
    }
    let segments: SmallVec<[Segment; 4]> = group.iter().map(|w| w.centerline).collect();
    // Attributes come from the first authored member.
    let source = group
        .iter()
        .find(|w| !w.synthesized)
        .map_or(first.source, |w| w.source);
    MergedWall {
        centerline: merge_colinear(&segments, tol.degenerate_length).unwrap_or(first.centerline),
        source,
        synthesized: group.iter().all(|w| w.synthesized),
    }
}
