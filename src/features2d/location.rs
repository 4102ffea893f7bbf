//! Scale-space keypoints produced by the detector (spec.md §3 `Location`).
//!
//! Replaces the teacher's pixel-grid `KeyPoint` (integer `Point` + octave
//! index) with a float position/radius/angle record, since a Fast-Hessian
//! location's radius is a continuous scale derived from a kernel size, not
//! a discrete pyramid level.

use std::f32::consts::TAU;

/// A detected interest point: position, scale, and dominant orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub x: f32,
    pub y: f32,
    /// Scale, in SURF units (`kernelSize * 1.2 / 9`), not a pixel count.
    pub radius: f32,
    /// Radians, normalized to `[0, 2*PI)`.
    pub angle: f32,
}

impl Location {
    #[must_use]
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius, angle: 0.0 }
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = normalize_angle(angle);
    }
}

#[must_use]
pub fn normalize_angle(angle: f32) -> f32 {
    let a = angle % TAU;
    if a < 0.0 {
        a + TAU
    } else {
        a
    }
}

/// Coordinate convention for reporting a `Location`'s position
/// (spec.md §6). `Polar` is accepted for round-tripping but the detector
/// itself only ever produces `Cartesian` locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateSystem {
    #[default]
    Cartesian,
    Polar,
}

impl std::str::FromStr for CoordinateSystem {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "Polar" => CoordinateSystem::Polar,
            _ => CoordinateSystem::Cartesian,
        })
    }
}

impl std::fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CoordinateSystem::Cartesian => "Cartesian",
            CoordinateSystem::Polar => "Polar",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_normalizes_into_the_turn() {
        let mut loc = Location::new(0.0, 0.0, 1.0);
        loc.set_angle(-0.5);
        assert!(loc.angle >= 0.0 && loc.angle < TAU);
        loc.set_angle(TAU + 1.0);
        assert!((loc.angle - 1.0).abs() < 1e-5);
    }

    #[test]
    fn coordinate_system_round_trips_by_name() {
        use std::str::FromStr;
        assert_eq!(CoordinateSystem::from_str("Polar").unwrap(), CoordinateSystem::Polar);
        assert_eq!(CoordinateSystem::from_str("bogus").unwrap(), CoordinateSystem::Cartesian);
    }
}
