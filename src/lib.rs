//! # surf-rs
//!
//! Scale- and rotation-invariant interest point detection, pure Rust.
//!
//! A Fast-Hessian detector finds stable blob-like interest points across a
//! pseudo-pyramid of box-filter response maps built on top of an integral
//! image; an orientation estimator assigns each point a dominant gradient
//! direction; a SURF-family local descriptor then summarizes the rotated
//! neighborhood as a normalized feature vector suitable for matching.
//!
//! ## Features
//!
//! - **Core**: basic data structures (`Mat`, `Point`, `Size`, `Rect`,
//!   `Scalar`) plus the flat `FMatrix` used internally by the pipeline.
//! - **`imgproc`**: integral images with five boundary policies.
//! - **`features2d`**: the Fast-Hessian pyramid, extremum localization,
//!   location selection, orientation estimation, and the SURF descriptor.
//!
//! ## Example
//!
//! ```rust,no_run
//! use surf_rs::prelude::*;
//! use surf_rs::core::FMatrix;
//! use surf_rs::features2d::{HessianPyramidConfig, LevelStack};
//!
//! # fn main() -> surf_rs::error::Result<()> {
//! let image = FMatrix::zeros(256, 256);
//! let config = HessianPyramidConfig::default().validate();
//! let stack = LevelStack::build(&image, &config)?;
//! assert!(!stack.levels.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod features2d;
pub mod imgproc;

pub mod prelude {
    //! Convenience module that re-exports commonly used items.
    pub use crate::core::{Mat, MatDepth, Point, Point2f, Point3f, Rect, Scalar, Size};
    pub use crate::error::{Error, Result};
    pub use crate::features2d::{CoordinateSystem, Location};
    pub use crate::imgproc::{BoundaryType, IntegralImage};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_basic_workflow() {
        let mat = Mat::new(100, 100, 3, MatDepth::U8).unwrap();
        assert_eq!(mat.rows(), 100);
        assert_eq!(mat.cols(), 100);

        let p = Point::new(10, 20);
        let s = Size::new(640, 480);
        let r = Rect::new(0, 0, 100, 100);

        assert!(r.contains(p));
        assert_eq!(s.area(), 640 * 480);
    }

    #[test]
    fn test_location_default_angle() {
        let loc = Location::new(1.0, 2.0, 3.0);
        assert_eq!(loc.angle, 0.0);
    }
}
