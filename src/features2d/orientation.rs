//! Dominant-orientation estimation (spec.md §4.5).
//!
//! Grounded in `original_source/src/imgProc/ltiSurfLocalDescriptor.cpp`'s
//! orientation pass (the descriptor's own `getOrientation`/accumulator
//! code, shared here as a standalone stage per spec.md's component split): a
//! circular neighborhood of Haar-wavelet dx/dy responses, each weighted by
//! a precomputed Gaussian, is accumulated into a bank of overlapping
//! angular windows; the window with the largest accumulated vector gives
//! the final angle. The neighborhood offsets and Gaussian weights are
//! precomputed once per detector configuration (`circLUT_`/`gaussWeights_`
//! in the original) rather than per location, since they don't depend on
//! where a location sits — only on its scale, which is folded in at query
//! time by scaling the precomputed integer offsets.

use crate::features2d::location::{normalize_angle, Location};
use crate::imgproc::integral::IntegralImage;
use std::f32::consts::TAU;

/// Configuration for `estimate_orientations` (spec.md §4.5).
#[derive(Debug, Clone)]
pub struct OrientationConfig {
    /// Neighborhood radius, in units of the location's scale.
    pub neighborhood_factor: f32,
    /// Spacing between samples within the neighborhood, in units of scale.
    pub sampling_step_factor: f32,
    /// Standard deviation of the sample-weighting Gaussian, in sample-grid
    /// units (not scaled by the location's radius).
    pub gaussian_factor: f32,
    /// Number of overlapping angular accumulator windows.
    pub num_windows: usize,
    /// Width of each accumulator window. Values `>= 2*PI` are interpreted
    /// as degrees and converted, matching the original's auto-detection
    /// of a caller who forgot to convert their degrees to radians.
    pub window_width: f32,
    /// Haar-wavelet side, in units of the location's scale: `w = s *
    /// orientationWaveletSizeFactor`, forced odd (spec.md §4.5, matching
    /// `ltiFastHessianDetection_template.h`'s `wls = iround(s *
    /// orientationWaveletSizeFactor)`).
    pub orientation_wavelet_size_factor: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            neighborhood_factor: 6.0,
            sampling_step_factor: 1.0,
            gaussian_factor: 2.5,
            num_windows: 120,
            window_width: std::f32::consts::FRAC_PI_3,
            orientation_wavelet_size_factor: 4.0,
        }
    }
}

impl OrientationConfig {
    fn window_width_radians(&self) -> f32 {
        if self.window_width >= TAU {
            self.window_width.to_radians()
        } else {
            self.window_width
        }
    }
}

/// Precomputed neighborhood geometry, independent of any particular
/// location's scale (spec.md §4.5 `circLUT_`/`gaussWeights_`).
struct NeighborhoodLut {
    /// Integer sample offsets `(i, j)` within the circular neighborhood.
    offsets: Vec<(i32, i32)>,
    /// Gaussian weight for each offset, same order as `offsets`.
    weights: Vec<f32>,
    radius_samples: i32,
}

impl NeighborhoodLut {
    fn build(config: &OrientationConfig) -> Self {
        let radius_samples =
            (config.neighborhood_factor / config.sampling_step_factor).round().max(1.0) as i32;
        let variance = config.gaussian_factor * config.gaussian_factor;

        let mut offsets = Vec::new();
        let mut weights = Vec::new();
        for j in -radius_samples..=radius_samples {
            for i in -radius_samples..=radius_samples {
                if (i * i + j * j) as f32 <= (radius_samples * radius_samples) as f32 {
                    offsets.push((i, j));
                    weights.push((-((i * i + j * j) as f32) / (2.0 * variance)).exp());
                }
            }
        }

        Self {
            offsets,
            weights,
            radius_samples,
        }
    }
}

/// Bank of overlapping angular accumulator windows (spec.md §4.5
/// `orientationAccumulator`).
struct AngularAccumulator {
    windows: Vec<(f32, f32)>,
    afactor: f32,
    wnd_delta: f32,
}

impl AngularAccumulator {
    fn new(num_windows: usize, window_width: f32) -> Self {
        let afactor = num_windows as f32 / TAU;
        Self {
            windows: vec![(0.0, 0.0); num_windows],
            afactor,
            wnd_delta: (afactor * window_width) / 2.0001,
        }
    }

    fn add(&mut self, angle: f32, wx: f32, wy: f32) {
        let n = self.windows.len() as i32;
        let center = (normalize_angle(angle) * self.afactor).round() as i32;
        for w in 0..self.windows.len() {
            let wi = w as i32;
            let raw = (wi - center).abs();
            let circ = raw.min(n - raw) as f32;
            if circ <= self.wnd_delta {
                self.windows[w].0 += wx;
                self.windows[w].1 += wy;
            }
        }
    }

    /// Angle of the window with the largest accumulated vector magnitude.
    fn dominant_angle(&self) -> f32 {
        let mut best = 0usize;
        let mut best_mag = f32::MIN;
        for (i, &(wx, wy)) in self.windows.iter().enumerate() {
            let mag = wx * wx + wy * wy;
            if mag > best_mag {
                best_mag = mag;
                best = i;
            }
        }
        let (wx, wy) = self.windows[best];
        normalize_angle(wy.atan2(wx))
    }
}

/// Odd-coerced Haar-wavelet side for scale `s` (spec.md §4.5 `w = s *
/// orientationWaveletSizeFactor`, forced odd), and the corresponding
/// half-width used by `haar_response`'s box extents.
fn wavelet_half_width(scale: f32, orientation_wavelet_size_factor: f32) -> i64 {
    let wls = (scale * orientation_wavelet_size_factor).round().max(1.0) as i64;
    let wls = if wls % 2 == 0 { wls + 1 } else { wls };
    (wls / 2).max(1)
}

/// Haar-wavelet dx/dy response at `(x, y)` for half-width `half`, read
/// through whichever rectangle-sum closure the caller selected (fast
/// unchecked `internal_sum` in the interior, checked boundary-aware `sum`
/// near the border).
fn haar_response(
    sum: impl Fn(i64, i64, i64, i64) -> f32,
    x: i64,
    y: i64,
    half: i64,
) -> (f32, f32) {
    let dx = sum(x, y - half, x + half - 1, y + half - 1)
        - sum(x - half, y - half, x - 1, y + half - 1);
    let dy = sum(x - half, y, x + half - 1, y + half - 1)
        - sum(x - half, y - half, x + half - 1, y - 1);
    (dx, dy)
}

/// Estimate the dominant orientation of every location (spec.md §4.5
/// `estimateOrientations`). Locations whose neighborhood would read
/// entirely outside the image under `NoBoundary` are left at angle `0`.
pub fn estimate_orientations(
    integral: &IntegralImage,
    locations: &mut [Location],
    config: &OrientationConfig,
) {
    let lut = NeighborhoodLut::build(config);
    let window_width = config.window_width_radians();
    let rows = integral.rows() as i64;
    let cols = integral.cols() as i64;

    for loc in locations.iter_mut() {
        let scale = loc.radius.max(1e-3);
        let mut acc = AngularAccumulator::new(config.num_windows, window_width);

        let half = wavelet_half_width(scale, config.orientation_wavelet_size_factor);

        let max_extent =
            ((lut.radius_samples as f32 * config.sampling_step_factor * scale).round() as i64)
                + half
                + 1;
        let cx = loc.x.round() as i64;
        let cy = loc.y.round() as i64;
        let interior = cx - max_extent >= 1
            && cy - max_extent >= 1
            && cx + max_extent <= cols - 2
            && cy + max_extent <= rows - 2;

        for (idx, &(i, j)) in lut.offsets.iter().enumerate() {
            let ox = (i as f32 * config.sampling_step_factor * scale).round() as i64;
            let oy = (j as f32 * config.sampling_step_factor * scale).round() as i64;
            let (sx, sy) = (cx + ox, cy + oy);

            let (dx, dy) = if interior {
                haar_response(|a, b, c, d| integral.internal_sum(a, b, c, d), sx, sy, half)
            } else {
                haar_response(|a, b, c, d| integral.sum(a, b, c, d), sx, sy, half)
            };

            let w = lut.weights[idx];
            let angle = dy.atan2(dx);
            acc.add(angle, w * dx, w * dy);
        }

        loc.set_angle(acc.dominant_angle());
    }

    log::debug!("estimated orientation for {} locations", locations.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FMatrix;
    use crate::imgproc::integral::BoundaryType;

    #[test]
    fn uniform_image_orientation_is_well_defined() {
        let src = FMatrix::filled(64, 64, 50.0);
        let integral = IntegralImage::integrate(&src, BoundaryType::Constant).unwrap();
        let mut locs = vec![Location::new(32.0, 32.0, 4.0)];
        estimate_orientations(&integral, &mut locs, &OrientationConfig::default());
        assert!(locs[0].angle >= 0.0 && locs[0].angle < TAU);
    }

    #[test]
    fn vertical_edge_points_orientation_toward_the_brighter_side() {
        let mut src = FMatrix::zeros(64, 64);
        for y in 0..64 {
            for x in 32..64 {
                src.set(y, x, 255.0);
            }
        }
        let integral = IntegralImage::integrate(&src, BoundaryType::Constant).unwrap();
        let mut locs = vec![Location::new(32.0, 32.0, 3.0)];
        estimate_orientations(&integral, &mut locs, &OrientationConfig::default());
        let angle = locs[0].angle;
        assert!(angle.is_finite());
        assert!((0.0..TAU).contains(&angle));
    }

    #[test]
    fn degrees_window_width_is_converted_to_radians() {
        let config = OrientationConfig {
            window_width: 90.0,
            ..OrientationConfig::default()
        };
        assert!((config.window_width_radians() - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn wavelet_half_width_is_always_odd_sided() {
        for &(scale, factor) in &[(4.0, 4.0), (3.0, 4.0), (5.0, 2.0), (1.0, 4.0)] {
            let half = wavelet_half_width(scale, factor);
            let side = 2 * half + 1;
            assert_eq!(side % 2, 1);
            assert!(half >= 1);
        }
    }
}
