// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! scene2cad Geometry Kernel
//!
//! Turns a placed scene graph into world geometry for the CAD document:
//! placement composition, north alignment, level matching, loop
//! reconstruction and communal wall merging. The kernel is pure and
//! single-threaded; callers own all run state.

pub mod error;
pub mod level;
pub mod loops;
pub mod north;
pub mod segment;
pub mod tolerance;
pub mod transform;
pub mod walls;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

pub use error::{Error, Result};
pub use level::LevelRegistry;
pub use loops::{close_loop, polygon_to_segments, quad_segments};
pub use north::NorthAlignment;
pub use segment::{Loop, Segment};
pub use tolerance::Tolerances;
pub use transform::{
    apply_object_transform, apply_parent_transforms, evaluate_pivot, instance_origin, node_isometry,
    node_rotation, world_pivot, world_point, Placement,
};
pub use walls::{
    coalesce_parallel, merge_colinear, merge_communal_walls, merge_overlapping, order_walls,
    select_door_host, trim_interior, MergedWall,
};
