// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! North alignment of world coordinates into project space.

use nalgebra::{Point3, Rotation3, Vector3};

/// One rotation about the vertical axis through the world origin, fixed for
/// the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NorthAlignment {
    angle: f64,
    rotation: Rotation3<f64>,
}

impl Default for NorthAlignment {
    fn default() -> Self {
        Self::from_angle(0.0)
    }
}

impl NorthAlignment {
    /// Alignment rotating points by `-angle` radians about Z.
    pub fn from_angle(angle: f64) -> Self {
        Self {
            angle,
            rotation: Rotation3::from_axis_angle(&Vector3::z_axis(), -angle),
        }
    }

    /// Derives the angle to north from apartment rotations in degrees.
    ///
    /// Each rotation is reduced modulo 90°. With `m` the smallest residue the
    /// angle is `m` when `m <= 45`, otherwise `360 - (90 - m)`. No rotations
    /// gives an angle of zero.
    pub fn from_rotations<I>(rotations: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let min = rotations
            .into_iter()
            .map(|r| r.rem_euclid(90.0))
            .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |m| m.min(r))));

        let degrees = match min {
            Some(m) if m <= 45.0 => m,
            Some(m) => 360.0 - (90.0 - m),
            None => 0.0,
        };
        Self::from_angle(degrees.to_radians())
    }

    /// Angle to north in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn to_project_space(&self, world: &Point3<f64>) -> Point3<f64> {
        self.rotation * world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_minimum_residue_below_45() {
        let north = NorthAlignment::from_rotations([10.0, 100.0]);
        assert_relative_eq!(north.angle(), 10f64.to_radians());
    }

    #[test]
    fn test_residue_above_45_wraps() {
        let north = NorthAlignment::from_rotations([60.0, 150.0]);
        assert_relative_eq!(north.angle(), 330f64.to_radians());
    }

    #[test]
    fn test_negative_rotation_uses_euclidean_residue() {
        // -80 mod 90 = 10
        let north = NorthAlignment::from_rotations([-80.0, 30.0]);
        assert_relative_eq!(north.angle(), 10f64.to_radians());
    }

    #[test]
    fn test_no_rotations_is_identity() {
        let north = NorthAlignment::from_rotations(std::iter::empty());
        assert_eq!(north.angle(), 0.0);
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(north.to_project_space(&p), p);
    }

    #[test]
    fn test_rotates_clockwise_about_origin() {
        let north = NorthAlignment::from_angle(std::f64::consts::FRAC_PI_2);
        let p = north.to_project_space(&Point3::new(0.0, 1.0, 5.0));
        assert_relative_eq!(p, Point3::new(1.0, 0.0, 5.0), epsilon = 1e-12);
    }
}
