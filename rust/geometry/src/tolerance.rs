// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel tolerances. All lengths are in meters.

use serde::{Deserialize, Serialize};

/// Numeric tolerances used across the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Two level elevations closer than this are the same level.
    pub level_tolerance: f64,
    /// Loop gaps larger than this get a closing segment, smaller ones are snapped.
    pub loop_gap_tolerance: f64,
    /// Length added at both ends of every communal wall centerline before merging.
    pub wall_extension: f64,
    /// Trimmed wall pieces within this distance of the space centroid are interior.
    pub interior_trim_distance: f64,
    /// Endpoint distance under which two walls count as connected when ordering.
    pub connectivity_tolerance: f64,
    /// Maximum perpendicular offset between two collinear centerlines.
    pub collinear_offset_tolerance: f64,
    /// Maximum sine of the angle between two parallel directions.
    pub direction_tolerance: f64,
    /// Segments shorter than this are degenerate.
    pub degenerate_length: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            level_tolerance: 0.001,
            loop_gap_tolerance: 0.007,
            wall_extension: 0.4,
            interior_trim_distance: 1.0,
            connectivity_tolerance: 0.001,
            collinear_offset_tolerance: 0.01,
            direction_tolerance: 1e-3,
            degenerate_length: 1e-6,
        }
    }
}
