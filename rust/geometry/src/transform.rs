// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement composition for scene nodes.
//!
//! A node maps a local point `p` into its parent's frame as
//! `position + R(p)` where `R = Rx · Ry · Rz` (degrees). World coordinates
//! come from applying that map for the node and then for every ancestor.
//!
//! Two equivalent ways to get there:
//! - [`apply_parent_transforms`] walks the arena's parent keys on demand.
//! - [`Placement`] carries the accumulated ancestor transform down a
//!   depth-first traversal so no walk is needed.

use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use scene2cad_core::{NodeKey, SceneArena, SceneNode};

use crate::error::Result;

/// Rotation of a node about its own X, Y and Z axes, applied Z first.
pub fn node_rotation(node: &SceneNode) -> Rotation3<f64> {
    let [rx, ry, rz] = node.rotation;
    Rotation3::from_axis_angle(&Vector3::x_axis(), rx.to_radians())
        * Rotation3::from_axis_angle(&Vector3::y_axis(), ry.to_radians())
        * Rotation3::from_axis_angle(&Vector3::z_axis(), rz.to_radians())
}

/// The node's local-to-parent transform as an isometry.
pub fn node_isometry(node: &SceneNode) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(node.position),
        UnitQuaternion::from_rotation_matrix(&node_rotation(node)),
    )
}

/// `position + R(point)`
pub fn apply_object_transform(node: &SceneNode, point: &Point3<f64>) -> Point3<f64> {
    Point3::from(node.position) + node_rotation(node) * point.coords
}

/// Point on the node's local box at `t ∈ [0,1]^3`, expressed in the parent frame.
///
/// The anchor is the placement origin: `pos − R(size∘anchor) + R(size∘t)`.
pub fn evaluate_pivot(node: &SceneNode, t: &Vector3<f64>) -> Point3<f64> {
    let rotation = node_rotation(node);
    let anchor = node.size.component_mul(&node.anchor);
    let pivot = node.size.component_mul(t);
    Point3::from(node.position - rotation * anchor + rotation * pivot)
}

/// Insertion point of a hosted instance, in the parent frame.
///
/// Only the anchor offset is rotated back out: `pos + R(-size∘anchor) + size∘anchor`.
pub fn instance_origin(node: &SceneNode) -> Point3<f64> {
    let anchor = node.size.component_mul(&node.anchor);
    Point3::from(node.position + node_rotation(node) * -anchor + anchor)
}

/// Applies every ancestor's transform to `point`, nearest parent first.
/// The node's own transform is not applied.
///
/// Fails with `BrokenHierarchy` when a parent key points at a node that is no
/// longer in the arena.
pub fn apply_parent_transforms(
    arena: &SceneArena,
    key: NodeKey,
    point: Point3<f64>,
) -> Result<Point3<f64>> {
    let mut point = point;
    let mut current = arena.get(key)?;
    let mut depth = 0;
    while let Some(parent_key) = current.parent() {
        depth += 1;
        let parent = arena.node(parent_key).ok_or(
            scene2cad_core::Error::BrokenHierarchy { node: key, depth },
        )?;
        point = apply_object_transform(parent, &point);
        current = parent;
    }
    Ok(point)
}

/// World coordinates of a point in the node's own local frame.
pub fn world_point(arena: &SceneArena, key: NodeKey, local: &Point3<f64>) -> Result<Point3<f64>> {
    let node = arena.get(key)?;
    apply_parent_transforms(arena, key, apply_object_transform(node, local))
}

/// World coordinates of a pivot on the node's local box.
pub fn world_pivot(arena: &SceneArena, key: NodeKey, t: &Vector3<f64>) -> Result<Point3<f64>> {
    let node = arena.get(key)?;
    apply_parent_transforms(arena, key, evaluate_pivot(node, t))
}

/// Accumulated ancestor transform handed to a node during traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Parent of the node this placement belongs to.
    pub parent: Option<NodeKey>,
    /// Parent frame to world.
    pub transform: Isometry3<f64>,
}

impl Default for Placement {
    fn default() -> Self {
        Self::root()
    }
}

impl Placement {
    /// Placement of the tree root: the parent frame is the world frame.
    pub fn root() -> Self {
        Self {
            parent: None,
            transform: Isometry3::identity(),
        }
    }

    /// Placement for the children of `node` (whose key is `key`).
    pub fn descend(&self, key: NodeKey, node: &SceneNode) -> Self {
        Self {
            parent: Some(key),
            transform: self.transform * node_isometry(node),
        }
    }

    /// Maps a point expressed in the parent frame to world coordinates.
    pub fn to_world(&self, point: &Point3<f64>) -> Point3<f64> {
        self.transform * point
    }

    pub fn world_pivot(&self, node: &SceneNode, t: &Vector3<f64>) -> Point3<f64> {
        self.to_world(&evaluate_pivot(node, t))
    }

    pub fn world_point(&self, node: &SceneNode, local: &Point3<f64>) -> Point3<f64> {
        self.to_world(&apply_object_transform(node, local))
    }

    pub fn world_instance_origin(&self, node: &SceneNode) -> Point3<f64> {
        self.to_world(&instance_origin(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scene2cad_core::ElementKind;

    fn node(kind: ElementKind, pos: [f64; 3], rot: [f64; 3]) -> SceneNode {
        SceneNode::new(kind).with_placement(
            Vector3::from(pos),
            rot,
            Vector3::new(2.0, 1.0, 3.0),
            Vector3::new(0.5, 0.5, 0.0),
        )
    }

    fn three_level_tree() -> (SceneArena, [NodeKey; 3]) {
        let mut arena = SceneArena::new();
        let a = arena
            .insert(node(ElementKind::Building, [10.0, 0.0, 0.0], [0.0, 0.0, 90.0]), None)
            .unwrap();
        let b = arena
            .insert(node(ElementKind::Apartment, [0.0, 5.0, 1.0], [0.0, 0.0, 90.0]), Some(a))
            .unwrap();
        let c = arena
            .insert(node(ElementKind::Wall, [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]), Some(b))
            .unwrap();
        (arena, [a, b, c])
    }

    #[test]
    fn test_rotation_about_z() {
        let n = node(ElementKind::Wall, [0.0, 0.0, 0.0], [0.0, 0.0, 90.0]);
        let p = apply_object_transform(&n, &Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_order_is_x_then_y_then_z_outermost_first() {
        // R = Rx(90) * Rz(90): Z acts first, X last.
        let n = node(ElementKind::Wall, [0.0, 0.0, 0.0], [90.0, 0.0, 90.0]);
        let p = apply_object_transform(&n, &Point3::new(1.0, 0.0, 0.0));
        // Rz: (1,0,0) -> (0,1,0); Rx: (0,1,0) -> (0,0,1)
        assert_relative_eq!(p, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_pivot_at_anchor_is_position() {
        let n = node(ElementKind::Wall, [3.0, 4.0, 5.0], [0.0, 0.0, 30.0]);
        let p = evaluate_pivot(&n, &n.anchor);
        assert_relative_eq!(p, Point3::new(3.0, 4.0, 5.0), epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_pivot_corners() {
        // size (2,1,3), anchor (0.5,0.5,0), no rotation
        let n = node(ElementKind::Wall, [0.0, 0.0, 0.0], [0.0; 3]);
        assert_relative_eq!(
            evaluate_pivot(&n, &Vector3::new(0.0, 0.5, 0.0)),
            Point3::new(-1.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            evaluate_pivot(&n, &Vector3::new(1.0, 1.0, 1.0)),
            Point3::new(1.0, 0.5, 3.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_instance_origin_without_rotation_is_position() {
        let n = node(ElementKind::Door, [3.0, 4.0, 5.0], [0.0; 3]);
        assert_relative_eq!(instance_origin(&n), Point3::new(3.0, 4.0, 5.0), epsilon = 1e-12);
    }

    #[test]
    fn test_instance_origin_rotates_anchor_offset() {
        // size∘anchor = (1, 0.5, 0); Rz(90) maps (-1,-0.5,0) to (0.5,-1,0)
        let n = node(ElementKind::Door, [0.0, 0.0, 0.0], [0.0, 0.0, 90.0]);
        assert_relative_eq!(instance_origin(&n), Point3::new(1.5, -0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_world_pivot_composes_ancestors() {
        let (arena, [_, _, c]) = three_level_tree();
        let wall = arena.node(c).unwrap();
        // The wall's anchor sits at its position (1,0,0) in the apartment frame.
        // Apartment: rotate 90 about Z then add (0,5,1): (0,1,0) + (0,5,1) = (0,6,1)
        // Building:  rotate 90 about Z then add (10,0,0): (-6,0,1) + (10,0,0) = (4,0,1)
        let p = world_pivot(&arena, c, &wall.anchor).unwrap();
        assert_relative_eq!(p, Point3::new(4.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_world_point_applies_own_transform_first() {
        let (arena, [a, _, _]) = three_level_tree();
        let p = world_point(&arena, a, &Point3::new(1.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(p, Point3::new(10.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_placement_matches_ancestor_walk() {
        let (arena, keys) = three_level_tree();
        let mut placement = Placement::root();
        for &key in &keys {
            let n = arena.node(key).unwrap();
            for t in [
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.5, 0.0),
                Vector3::new(0.3, 0.7, 1.0),
            ] {
                let walked = world_pivot(&arena, key, &t).unwrap();
                assert_relative_eq!(placement.world_pivot(n, &t), walked, epsilon = 1e-9);
            }
            placement = placement.descend(key, n);
        }
    }

    #[test]
    fn test_broken_hierarchy() {
        let (mut arena, [_, b, c]) = three_level_tree();
        arena.remove(b);
        let err = world_pivot(&arena, c, &Vector3::zeros()).unwrap_err();
        assert!(err.is_broken_hierarchy());
    }
}
