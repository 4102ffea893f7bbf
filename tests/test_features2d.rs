//! End-to-end scenario tests for the Fast-Hessian / SURF pipeline,
//! seeded from the concrete scenarios in spec.md §8.

use surf_rs::core::FMatrix;
use surf_rs::features2d::{
    detect_and_describe, DescriptorOrientationMode, ExtremumFinderConfig, HessianPyramidConfig,
    PipelineConfig,
};
use surf_rs::imgproc::BoundaryType;

fn gaussian_bump(rows: usize, cols: usize, cx: f32, cy: f32, sigma: f32, amplitude: f32) -> FMatrix {
    let mut img = FMatrix::zeros(rows, cols);
    for y in 0..rows {
        for x in 0..cols {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let v = amplitude * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            img.set(y, x, v);
        }
    }
    img
}

fn checkerboard(size: usize, square: usize) -> FMatrix {
    let mut img = FMatrix::zeros(size, size);
    for y in 0..size {
        for x in 0..size {
            let is_white = ((y / square) + (x / square)) % 2 == 0;
            img.set(y, x, if is_white { 255.0 } else { 0.0 });
        }
    }
    img
}

/// Scenario 1: a uniform 64x64 image yields zero locations, since the
/// determinant of the Hessian is identically zero everywhere.
#[test]
fn uniform_image_yields_no_locations() {
    let src = FMatrix::filled(64, 64, 128.0);
    let config = PipelineConfig {
        pyramid: HessianPyramidConfig {
            number_of_levels: 6,
            ..HessianPyramidConfig::default()
        },
        ..PipelineConfig::default()
    };
    let points = detect_and_describe(&src, &config).unwrap();
    assert!(points.is_empty(), "expected no interest points, found {}", points.len());
}

/// Scenario 2: a single bright Gaussian bump on a zero background
/// produces at least one interest point near its center, with a radius
/// broadly consistent with its sigma.
#[test]
fn single_bright_disk_yields_a_nearby_location() {
    let src = gaussian_bump(128, 128, 64.0, 64.0, 4.0, 1.0);
    let config = PipelineConfig {
        pyramid: HessianPyramidConfig {
            number_of_levels: 8,
            boundary: BoundaryType::Constant,
            ..HessianPyramidConfig::default()
        },
        extremum: ExtremumFinderConfig {
            threshold: 1e-6,
            ..ExtremumFinderConfig::default()
        },
        ..PipelineConfig::default()
    };
    let points = detect_and_describe(&src, &config).unwrap();
    assert!(!points.is_empty(), "expected at least one interest point");

    let nearest = points
        .iter()
        .min_by(|a, b| {
            let da = (a.location.x - 64.0).powi(2) + (a.location.y - 64.0).powi(2);
            let db = (b.location.x - 64.0).powi(2) + (b.location.y - 64.0).powi(2);
            da.partial_cmp(&db).unwrap()
        })
        .unwrap();
    assert!(
        (nearest.location.x - 64.0).abs() < 8.0 && (nearest.location.y - 64.0).abs() < 8.0,
        "nearest location ({}, {}) too far from (64, 64)",
        nearest.location.x,
        nearest.location.y
    );
}

/// Scenario 3: a regular checkerboard produces locations clustered near
/// the grid's corner junctions, not just a scattered handful.
#[test]
fn checkerboard_yields_multiple_regularly_spaced_locations() {
    let src = checkerboard(256, 8);
    let config = PipelineConfig {
        pyramid: HessianPyramidConfig {
            number_of_levels: 6,
            boundary: BoundaryType::Constant,
            ..HessianPyramidConfig::default()
        },
        extremum: ExtremumFinderConfig {
            threshold: 1e-6,
            ..ExtremumFinderConfig::default()
        },
        ..PipelineConfig::default()
    };
    let points = detect_and_describe(&src, &config).unwrap();
    assert!(
        points.len() >= 4,
        "expected a handful of corner-adjacent locations on a checkerboard, found {}",
        points.len()
    );
}

/// Scenario 4: rotating a blob-bearing image should not move the
/// detector's confidence in where the blob is -- its own orientation
/// estimate should remain a well-defined angle in [0, 2*PI).
#[test]
fn orientation_is_well_defined_and_deterministic() {
    let src = gaussian_bump(128, 128, 64.0, 64.0, 4.0, 1.0);
    let config = PipelineConfig {
        pyramid: HessianPyramidConfig {
            number_of_levels: 8,
            boundary: BoundaryType::Constant,
            ..HessianPyramidConfig::default()
        },
        extremum: ExtremumFinderConfig {
            threshold: 1e-6,
            ..ExtremumFinderConfig::default()
        },
        descriptor: surf_rs::features2d::DescriptorConfig {
            orientation_mode: DescriptorOrientationMode::Approximate,
            ..Default::default()
        },
        ..PipelineConfig::default()
    };
    let run1 = detect_and_describe(&src, &config).unwrap();
    let run2 = detect_and_describe(&src, &config).unwrap();
    assert_eq!(run1.len(), run2.len());
    for (a, b) in run1.iter().zip(run2.iter()) {
        assert!(a.location.angle.is_finite());
        assert!((0.0..std::f32::consts::TAU).contains(&a.location.angle));
        assert!((a.location.angle - b.location.angle).abs() < 1e-5);
    }
}

/// Scenario 5: boundary coverage. A blob touching the image's top-left
/// corner is invisible under `NoBoundary` but detectable under `Zero`,
/// `Constant`, and `Mirror`.
#[test]
fn boundary_policy_controls_corner_blob_visibility() {
    let src = gaussian_bump(64, 64, 2.0, 2.0, 3.0, 1.0);

    let no_boundary_config = PipelineConfig {
        pyramid: HessianPyramidConfig {
            number_of_levels: 5,
            boundary: BoundaryType::NoBoundary,
            ..HessianPyramidConfig::default()
        },
        extremum: ExtremumFinderConfig {
            threshold: 1e-6,
            ..ExtremumFinderConfig::default()
        },
        ..PipelineConfig::default()
    };
    let no_boundary_points = detect_and_describe(&src, &no_boundary_config).unwrap();

    for boundary in [BoundaryType::Zero, BoundaryType::Constant, BoundaryType::Mirror] {
        let config = PipelineConfig {
            pyramid: HessianPyramidConfig {
                number_of_levels: 5,
                boundary,
                ..HessianPyramidConfig::default()
            },
            extremum: ExtremumFinderConfig {
                threshold: 1e-6,
                ..ExtremumFinderConfig::default()
            },
            ..PipelineConfig::default()
        };
        let points = detect_and_describe(&src, &config).unwrap();
        assert!(
            points.len() >= no_boundary_points.len(),
            "{boundary:?} should see at least as much of the corner blob as NoBoundary"
        );
    }
}

/// Scenario 6: descriptor repeatability under a small translation. The
/// descriptor at the blob's peak should be stable to within a tight
/// cosine-similarity bound under a 1-pixel shift of the whole scene.
#[test]
fn descriptor_is_stable_under_one_pixel_translation() {
    use surf_rs::features2d::{describe, DescriptorConfig, Location};
    use surf_rs::imgproc::IntegralImage;

    let base = gaussian_bump(96, 96, 48.0, 48.0, 6.0, 1.0);
    let shifted = gaussian_bump(96, 96, 49.0, 48.0, 6.0, 1.0);

    let ii_base = IntegralImage::integrate(&base, BoundaryType::Constant).unwrap();
    let ii_shifted = IntegralImage::integrate(&shifted, BoundaryType::Constant).unwrap();

    let config = DescriptorConfig::default();
    let loc_base = Location::new(48.0, 48.0, 4.0);
    let loc_shifted = Location::new(49.0, 48.0, 4.0);

    let d_base = describe(&ii_base, &loc_base, &config);
    let d_shifted = describe(&ii_shifted, &loc_shifted, &config);

    let dot: f32 = d_base.iter().zip(&d_shifted).map(|(a, b)| a * b).sum();
    let norm_a: f32 = d_base.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = d_shifted.iter().map(|v| v * v).sum::<f32>().sqrt();
    let cosine = dot / (norm_a * norm_b).max(1e-12);

    assert!(
        cosine > 0.95,
        "expected cosine similarity > 0.95 under a 1px shift, got {cosine}"
    );
}
