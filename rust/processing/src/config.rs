// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration loaded from environment variables.

use scene2cad_geometry::Tolerances;
use serde::{Deserialize, Serialize};

/// Settings for one run. Lengths are in meters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub tolerances: Tolerances,
    /// Wall centerlines shorter than this are dropped as degenerate.
    pub min_centerline_length: f64,
    /// Non-communal walls must be longer than this to be built.
    pub min_wall_length: f64,
    /// Polygon edges shorter than this are skipped.
    pub min_polygon_edge: f64,
    /// Room placement point offset from the space center in X and Y.
    pub room_point_offset: f64,
    /// Build walls along synthesized gap segments of communal spaces.
    pub bridge_wall_gaps: bool,
    /// Padding around facade extents for the project bounds.
    pub project_bounds_padding: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            min_centerline_length: 0.00082,
            min_wall_length: 0.1,
            min_polygon_edge: 0.001,
            room_point_offset: 0.5,
            bridge_wall_gaps: false,
            project_bounds_padding: 3.048,
        }
    }
}

impl RunConfig {
    /// Load configuration from `SCENE2CAD_*` environment variables, falling
    /// back to defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let tol = defaults.tolerances;
        Self {
            tolerances: Tolerances {
                level_tolerance: env_or("SCENE2CAD_LEVEL_TOLERANCE", tol.level_tolerance),
                loop_gap_tolerance: env_or("SCENE2CAD_LOOP_TOLERANCE", tol.loop_gap_tolerance),
                wall_extension: env_or("SCENE2CAD_WALL_EXTENSION", tol.wall_extension),
                interior_trim_distance: env_or(
                    "SCENE2CAD_INTERIOR_TRIM_DISTANCE",
                    tol.interior_trim_distance,
                ),
                connectivity_tolerance: env_or(
                    "SCENE2CAD_CONNECTIVITY_TOLERANCE",
                    tol.connectivity_tolerance,
                ),
                ..tol
            },
            min_centerline_length: env_or(
                "SCENE2CAD_MIN_CENTERLINE_LENGTH",
                defaults.min_centerline_length,
            ),
            min_wall_length: env_or("SCENE2CAD_MIN_WALL_LENGTH", defaults.min_wall_length),
            min_polygon_edge: env_or("SCENE2CAD_MIN_POLYGON_EDGE", defaults.min_polygon_edge),
            room_point_offset: env_or("SCENE2CAD_ROOM_POINT_OFFSET", defaults.room_point_offset),
            bridge_wall_gaps: env_or("SCENE2CAD_BRIDGE_WALL_GAPS", defaults.bridge_wall_gaps),
            project_bounds_padding: env_or(
                "SCENE2CAD_PROJECT_BOUNDS_PADDING",
                defaults.project_bounds_padding,
            ),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.min_wall_length, 0.1);
        assert!(!config.bridge_wall_gaps);
        assert_eq!(config.tolerances.loop_gap_tolerance, 0.007);
    }

    #[test]
    fn test_from_env_overrides_and_falls_back() {
        std::env::set_var("SCENE2CAD_BRIDGE_WALL_GAPS", "true");
        std::env::set_var("SCENE2CAD_MIN_WALL_LENGTH", "not-a-number");
        let config = RunConfig::from_env();
        std::env::remove_var("SCENE2CAD_BRIDGE_WALL_GAPS");
        std::env::remove_var("SCENE2CAD_MIN_WALL_LENGTH");

        assert!(config.bridge_wall_gaps);
        assert_eq!(config.min_wall_length, 0.1);
    }
}
