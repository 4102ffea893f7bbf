//! End-to-end detect-and-describe entry point (spec.md §9).
//!
//! Ties the five pipeline stages together the way
//! `original_source/src/imgProc/ltiFastHessianDetection.cpp`'s top-level
//! `apply` does: build the response pyramid, localize extrema, select a
//! subset of them, estimate orientation, then describe each survivor.

use crate::core::FMatrix;
use crate::error::Result;
use crate::features2d::descriptor::{self, DescriptorConfig};
use crate::features2d::extremum::{self, ExtremumFinderConfig};
use crate::features2d::hessian::{HessianPyramidConfig, LevelStack};
use crate::features2d::location::Location;
use crate::features2d::orientation::{self, OrientationConfig};
use crate::features2d::selector::{self, LocationSelectorConfig};

/// Configuration for the full detect-and-describe pipeline (spec.md §9).
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub pyramid: HessianPyramidConfig,
    pub extremum: ExtremumFinderConfig,
    pub selector: LocationSelectorConfig,
    pub orientation: OrientationConfig,
    pub descriptor: DescriptorConfig,
}

/// A located, oriented, described interest point.
#[derive(Debug, Clone)]
pub struct InterestPoint {
    pub location: Location,
    pub descriptor: Vec<f32>,
}

/// Run the full pipeline over `src` (spec.md §9 benchmark entry point).
pub fn detect_and_describe(src: &FMatrix, config: &PipelineConfig) -> Result<Vec<InterestPoint>> {
    let pyramid_config = config.pyramid.clone().validate();
    let stack = LevelStack::build(src, &pyramid_config)?;

    let extrema = extremum::find_extrema(&stack, &config.extremum);

    let strengths: Vec<f32> = extrema.iter().map(|ex| ex.strength).collect();
    let keep = selector::select(&strengths, &config.selector);
    let mut locations: Vec<Location> = keep.into_iter().map(|i| extrema[i].location).collect();

    orientation::estimate_orientations(&stack.integral, &mut locations, &config.orientation);

    let points = describe_all(&stack.integral, locations, &config.descriptor);

    log::info!("pipeline produced {} interest points", points.len());
    Ok(points)
}

/// Describe every surviving location. Each call reads only the shared
/// (read-only) integral image and writes its own descriptor vector, so
/// behind the `parallel` feature this fans out over `rayon`'s global
/// pool (spec.md §5: "per-location descriptors are independent once the
/// integral image exists").
#[cfg(feature = "parallel")]
fn describe_all(
    integral: &crate::imgproc::IntegralImage,
    locations: Vec<Location>,
    config: &DescriptorConfig,
) -> Vec<InterestPoint> {
    use rayon::prelude::*;
    locations
        .into_par_iter()
        .map(|location| {
            let d = descriptor::describe(integral, &location, config);
            InterestPoint {
                location,
                descriptor: d,
            }
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn describe_all(
    integral: &crate::imgproc::IntegralImage,
    locations: Vec<Location>,
    config: &DescriptorConfig,
) -> Vec<InterestPoint> {
    locations
        .into_iter()
        .map(|location| {
            let d = descriptor::describe(integral, &location, config);
            InterestPoint {
                location,
                descriptor: d,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_runs_end_to_end_on_a_single_blob() {
        let mut src = FMatrix::zeros(128, 128);
        for y in 50..78 {
            for x in 50..78 {
                src.set(y, x, 220.0);
            }
        }
        let config = PipelineConfig {
            pyramid: HessianPyramidConfig {
                number_of_levels: 5,
                ..HessianPyramidConfig::default()
            },
            ..PipelineConfig::default()
        };
        let points = detect_and_describe(&src, &config).unwrap();
        for p in &points {
            assert_eq!(p.descriptor.len(), config.descriptor.descriptor_length());
        }
    }

    #[test]
    fn empty_image_is_rejected() {
        let src = FMatrix::zeros(0, 0);
        let config = PipelineConfig::default();
        assert!(detect_and_describe(&src, &config).is_err());
    }
}
