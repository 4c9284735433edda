// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outlines of placed elements through the whole kernel: placement,
//! north alignment, level matching and loop reconstruction.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use scene2cad_core::{ElementKind, NodeKey, SceneArena, SceneNode};
use scene2cad_geometry::{
    close_loop, quad_segments, world_pivot, LevelRegistry, NorthAlignment, Segment,
};

/// A building turned 30 degrees with one 10 x 6 floor slab on top of it.
fn rotated_building() -> (SceneArena, NodeKey) {
    let mut arena = SceneArena::new();
    let building = arena
        .insert(
            SceneNode::new(ElementKind::Building).with_placement(
                Vector3::new(5.0, 5.0, 0.0),
                [0.0, 0.0, 30.0],
                Vector3::zeros(),
                Vector3::zeros(),
            ),
            None,
        )
        .unwrap();
    let floor = arena
        .insert(
            SceneNode::new(ElementKind::Floor).with_placement(
                Vector3::new(0.0, 0.0, 3.0),
                [0.0; 3],
                Vector3::new(10.0, 6.0, 0.3),
                Vector3::zeros(),
            ),
            Some(building),
        )
        .unwrap();
    (arena, floor)
}

fn corners(arena: &SceneArena, key: NodeKey, north: &NorthAlignment) -> [Point3<f64>; 4] {
    [
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ]
    .map(|t| north.to_project_space(&world_pivot(arena, key, &t).unwrap()))
}

#[test]
fn north_alignment_squares_up_a_rotated_outline() {
    let (arena, floor) = rotated_building();
    let north = NorthAlignment::from_rotations([30.0]);
    let outline = close_loop(quad_segments(&corners(&arena, floor, &north)), 0.007);

    assert_eq!(outline.len(), 4);
    assert!(outline.is_closed(1e-9));
    assert_relative_eq!(outline.perimeter(), 32.0, epsilon = 1e-9);
    for s in outline.segments() {
        let v = s.vector();
        assert!(v.x.abs() < 1e-9 || v.y.abs() < 1e-9, "edge {v:?} is not axis-aligned");
    }
}

#[test]
fn shuffled_outline_keeps_its_perimeter() {
    let (arena, floor) = rotated_building();
    let north = NorthAlignment::from_rotations([30.0]);
    let c = corners(&arena, floor, &north);

    // Out of order, two edges reversed, one corner nudged by 3 mm.
    let nudged = Point3::new(c[2].x + 0.003, c[2].y, c[2].z);
    let shuffled = vec![
        Segment::new(c[3], c[0]),
        Segment::new(c[2], c[1]),
        Segment::new(c[0], c[1]),
        Segment::new(nudged, c[3]),
    ];
    let outline = close_loop(shuffled, 0.007);

    assert_eq!(outline.len(), 4);
    assert!(outline.is_closed(1e-12));
    assert_relative_eq!(outline.perimeter(), 32.0, epsilon = 0.01);
}

#[test]
fn slab_elevation_resolves_to_nearest_level() {
    let (arena, floor) = rotated_building();
    let mut levels = LevelRegistry::new(0.001);
    assert!(levels.register(0.0, "00"));
    assert!(levels.register(3.0, "01"));
    assert!(!levels.register(3.0005, "dup"));

    let top = world_pivot(&arena, floor, &Vector3::new(0.0, 0.0, 1.0)).unwrap();
    let first = levels.resolve(top.z).unwrap();
    let second = levels.resolve(top.z).unwrap();
    assert_eq!(first.0, "01");
    assert_eq!(first.0, second.0);
    assert_relative_eq!(first.1, 0.3, epsilon = 1e-9);
}
