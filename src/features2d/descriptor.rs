//! SURF-family local descriptor (spec.md §4.6).
//!
//! Grounded in `original_source/src/imgProc/ltiSurfLocalDescriptor.cpp`: a
//! `numberOfSubregions x numberOfSubregions` grid of square subregions,
//! each sampled on a `subregionSamples x subregionSamples` grid of
//! Gaussian-weighted Haar-wavelet responses, accumulated per subregion
//! into either a 4-component (`block4`: `sum(dx), sum(|dx|), sum(dy),
//! sum(|dy|)`) or 8-component (`block8`: the same four quantities but
//! with `dx` split into two buckets by the sign of `dy`, and `dy` split
//! by the sign of `dx`) summary, then L2-normalized.
//!
//! `original_source` has no clipping step despite spec.md §4.6 mentioning
//! one; `DescriptorConfig::clip_value` is `None` by default so the
//! computed descriptor matches the original unless a caller opts in. See
//! DESIGN.md for the Open Question this resolves.

use crate::features2d::location::Location;
use crate::imgproc::integral::IntegralImage;

/// How the descriptor accounts for a location's dominant orientation
/// (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorOrientationMode {
    /// Sample on an axis-aligned grid; ignore `Location::angle` entirely.
    Ignore,
    /// Sample on an axis-aligned grid, then rotate each Haar response by
    /// `-angle` ("steering") rather than resampling on a rotated grid.
    #[default]
    Approximate,
    /// Cluster the per-sample gradient directions and describe each
    /// cluster in its own rotated frame.
    Cluster,
}

impl std::str::FromStr for DescriptorOrientationMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "Ignore" => DescriptorOrientationMode::Ignore,
            "Cluster" => DescriptorOrientationMode::Cluster,
            _ => DescriptorOrientationMode::Approximate,
        })
    }
}

impl std::fmt::Display for DescriptorOrientationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DescriptorOrientationMode::Ignore => "Ignore",
            DescriptorOrientationMode::Approximate => "Approximate",
            DescriptorOrientationMode::Cluster => "Cluster",
        })
    }
}

/// Configuration for `describe` (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct DescriptorConfig {
    pub number_of_subregions: usize,
    pub subregion_samples: usize,
    /// `true` selects the 8-component sign-split `block8` accumulator;
    /// `false` selects the 4-component `block4` accumulator.
    pub sign_split: bool,
    /// Standard deviation, in sample-grid units, of the weight applied to
    /// each sample before accumulation.
    pub gaussian_weight: f32,
    pub normalize: bool,
    pub orientation_mode: DescriptorOrientationMode,
    pub cluster_count: usize,
    /// Not present in the original; disabled unless a caller explicitly
    /// asks for descriptor clipping after L2 normalization.
    pub clip_value: Option<f32>,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            number_of_subregions: 4,
            subregion_samples: 5,
            sign_split: false,
            gaussian_weight: 3.5,
            normalize: true,
            orientation_mode: DescriptorOrientationMode::Approximate,
            cluster_count: 12,
            clip_value: None,
        }
    }
}

impl DescriptorConfig {
    #[must_use]
    pub fn components_per_subregion(&self) -> usize {
        if self.sign_split {
            8
        } else {
            4
        }
    }

    #[must_use]
    pub fn descriptor_length(&self) -> usize {
        self.number_of_subregions * self.number_of_subregions * self.components_per_subregion()
    }
}

struct Accumulator {
    dx: f32,
    adx: f32,
    dy: f32,
    ady: f32,
    dxp: f32,
    adxp: f32,
    dxn: f32,
    adxn: f32,
    dyp: f32,
    adyp: f32,
    dyn_: f32,
    adyn: f32,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            dx: 0.0,
            adx: 0.0,
            dy: 0.0,
            ady: 0.0,
            dxp: 0.0,
            adxp: 0.0,
            dxn: 0.0,
            adxn: 0.0,
            dyp: 0.0,
            adyp: 0.0,
            dyn_: 0.0,
            adyn: 0.0,
        }
    }

    fn add(&mut self, dx: f32, dy: f32) {
        self.dx += dx;
        self.adx += dx.abs();
        self.dy += dy;
        self.ady += dy.abs();

        if dy >= 0.0 {
            self.dxp += dx;
            self.adxp += dx.abs();
        } else {
            self.dxn += dx;
            self.adxn += dx.abs();
        }
        if dx >= 0.0 {
            self.dyp += dy;
            self.adyp += dy.abs();
        } else {
            self.dyn_ += dy;
            self.adyn += dy.abs();
        }
    }

    fn push_into(&self, out: &mut Vec<f32>, sign_split: bool) {
        if sign_split {
            out.extend_from_slice(&[
                self.dxp, self.adxp, self.dxn, self.adxn, self.dyp, self.adyp, self.dyn_,
                self.adyn,
            ]);
        } else {
            out.extend_from_slice(&[self.dx, self.adx, self.dy, self.ady]);
        }
    }
}

fn haar_dx_dy(integral: &IntegralImage, x: i64, y: i64, half: i64) -> (f32, f32) {
    let dx = integral.sum(x, y - half, x + half - 1, y + half - 1)
        - integral.sum(x - half, y - half, x - 1, y + half - 1);
    let dy = integral.sum(x - half, y, x + half - 1, y + half - 1)
        - integral.sum(x - half, y - half, x + half - 1, y - 1);
    (dx, dy)
}

fn gauss_weight(i: f32, j: f32, sigma: f32) -> f32 {
    (-(i * i + j * j) / (2.0 * sigma * sigma)).exp()
}

/// Collect raw (position, dx, dy) samples across the whole descriptor
/// support region on an axis-aligned (or steering-rotated) grid.
fn sample_grid(
    integral: &IntegralImage,
    loc: &Location,
    config: &DescriptorConfig,
    rotate: bool,
) -> Vec<(f32, f32, f32, f32)> {
    let n = config.number_of_subregions;
    let m = config.subregion_samples;
    let scale = loc.radius.max(1e-3);
    let half = (scale).round().max(1.0) as i64;
    let (cos_a, sin_a) = if rotate {
        (loc.angle.cos(), loc.angle.sin())
    } else {
        (1.0, 0.0)
    };

    let total = (n * m) as f32;
    let mut samples = Vec::with_capacity(n * n * m * m);

    for sub_j in 0..n {
        for sub_i in 0..n {
            for sj in 0..m {
                for si in 0..m {
                    // Grid coordinates centered on the location, in units
                    // of sample spacing, before rotation.
                    let gx = (sub_i * m + si) as f32 - total / 2.0 + 0.5;
                    let gy = (sub_j * m + sj) as f32 - total / 2.0 + 0.5;

                    let rx = gx * cos_a - gy * sin_a;
                    let ry = gx * sin_a + gy * cos_a;

                    let px = loc.x + rx * scale;
                    let py = loc.y + ry * scale;

                    let (dx, dy) = haar_dx_dy(integral, px.round() as i64, py.round() as i64, half);

                    let (rdx, rdy) = if rotate {
                        (dx * cos_a + dy * sin_a, -dx * sin_a + dy * cos_a)
                    } else {
                        (dx, dy)
                    };

                    let w = gauss_weight(gx, gy, config.gaussian_weight);
                    samples.push((gx, gy, w * rdx, w * rdy));
                }
            }
        }
    }
    samples
}

fn accumulate_subregions(
    samples: &[(f32, f32, f32, f32)],
    config: &DescriptorConfig,
) -> Vec<f32> {
    let n = config.number_of_subregions;
    let m = config.subregion_samples;
    let total = (n * m) as f32;
    let mut accs: Vec<Accumulator> = (0..n * n).map(|_| Accumulator::new()).collect();

    for &(gx, gy, dx, dy) in samples {
        let si = (((gx + total / 2.0) / m as f32).floor() as isize).clamp(0, n as isize - 1) as usize;
        let sj = (((gy + total / 2.0) / m as f32).floor() as isize).clamp(0, n as isize - 1) as usize;
        accs[sj * n + si].add(dx, dy);
    }

    let mut out = Vec::with_capacity(config.descriptor_length());
    for acc in &accs {
        acc.push_into(&mut out, config.sign_split);
    }
    out
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// K-means on the unit circle, re-seeding empty clusters by splitting the
/// most populous cluster that still has nonzero angular variance (spec.md
/// §4.6 `Cluster` mode, grounded on the original's `helperCluster`).
/// Angles are in radians; `k` must be at least 1.
fn cluster_angles(angles: &[f32], k: usize, iterations: usize) -> Vec<usize> {
    let k = k.max(1).min(angles.len().max(1));
    let mut centers: Vec<f32> = (0..k)
        .map(|c| c as f32 * std::f32::consts::TAU / k as f32)
        .collect();
    let mut assignment = vec![0usize; angles.len()];

    let circ_dist = |a: f32, b: f32| {
        let d = (a - b).abs() % std::f32::consts::TAU;
        d.min(std::f32::consts::TAU - d)
    };

    for _ in 0..iterations.max(1) {
        for (i, &a) in angles.iter().enumerate() {
            let mut best = 0usize;
            let mut best_d = f32::MAX;
            for (c, &center) in centers.iter().enumerate() {
                let d = circ_dist(a, center);
                if d < best_d {
                    best_d = d;
                    best = c;
                }
            }
            assignment[i] = best;
        }

        let mut sums = vec![(0.0f32, 0.0f32, 0usize); k];
        for (i, &a) in angles.iter().enumerate() {
            let c = assignment[i];
            sums[c].0 += a.cos();
            sums[c].1 += a.sin();
            sums[c].2 += 1;
        }

        for (c, &(sx, sy, count)) in sums.iter().enumerate() {
            if count > 0 {
                centers[c] = sy.atan2(sx);
            }
        }

        // Re-seed empty clusters by splitting the highest-population
        // cluster that has more than one distinct member.
        for c in 0..k {
            if sums[c].2 == 0 {
                if let Some((donor, _)) = sums
                    .iter()
                    .enumerate()
                    .filter(|&(_, &(_, _, cnt))| cnt > 1)
                    .max_by_key(|&(_, &(_, _, cnt))| cnt)
                {
                    centers[c] = centers[donor] + 0.1;
                }
            }
        }
    }

    assignment
}

fn describe_clustered(integral: &IntegralImage, loc: &Location, config: &DescriptorConfig) -> Vec<f32> {
    let base_samples = sample_grid(integral, loc, config, false);
    let angles: Vec<f32> = base_samples
        .iter()
        .map(|&(_, _, dx, dy)| dy.atan2(dx))
        .collect();
    let assignment = cluster_angles(&angles, config.cluster_count, 8);

    let n = config.number_of_subregions;
    let mut accs: Vec<Accumulator> = (0..n * n).map(|_| Accumulator::new()).collect();
    let m = config.subregion_samples;
    let total = (n * m) as f32;

    let mut cluster_angle = vec![0f32; config.cluster_count.max(1)];
    let mut cluster_sum = vec![(0f32, 0f32); config.cluster_count.max(1)];
    for (i, &a) in angles.iter().enumerate() {
        let c = assignment[i].min(cluster_sum.len() - 1);
        cluster_sum[c].0 += a.cos();
        cluster_sum[c].1 += a.sin();
    }
    for (c, &(sx, sy)) in cluster_sum.iter().enumerate() {
        cluster_angle[c] = sy.atan2(sx);
    }

    for (idx, &(gx, gy, _, _)) in base_samples.iter().enumerate() {
        let c = assignment[idx].min(cluster_angle.len() - 1);
        let theta = cluster_angle[c];
        let (cos_a, sin_a) = (theta.cos(), theta.sin());

        // Remap the sample's position into the cluster's rotated frame
        // (spec.md §4.6, `lx`/`ly`), then re-derive the Haar response at
        // the remapped position from the shared (unrotated) integral
        // image rather than recomputing a per-cluster rotated integral.
        let lx = cos_a * gx + sin_a * gy;
        let ly = -sin_a * gx + cos_a * gy;

        let scale = loc.radius.max(1e-3);
        let half = scale.round().max(1.0) as i64;
        let px = (loc.x + lx * scale).round() as i64;
        let py = (loc.y + ly * scale).round() as i64;
        let (dx, dy) = haar_dx_dy(integral, px, py, half);
        let (rdx, rdy) = (dx * cos_a + dy * sin_a, -dx * sin_a + dy * cos_a);

        let w = gauss_weight(gx, gy, config.gaussian_weight);
        let si = (((gx + total / 2.0) / m as f32).floor() as isize).clamp(0, n as isize - 1) as usize;
        let sj = (((gy + total / 2.0) / m as f32).floor() as isize).clamp(0, n as isize - 1) as usize;
        accs[sj * n + si].add(w * rdx, w * rdy);
    }

    let mut out = Vec::with_capacity(config.descriptor_length());
    for acc in &accs {
        acc.push_into(&mut out, config.sign_split);
    }
    out
}

/// Compute the local descriptor for `loc` (spec.md §4.6 `apply`).
#[must_use]
pub fn describe(integral: &IntegralImage, loc: &Location, config: &DescriptorConfig) -> Vec<f32> {
    let mut descriptor = match config.orientation_mode {
        DescriptorOrientationMode::Ignore => {
            accumulate_subregions(&sample_grid(integral, loc, config, false), config)
        }
        DescriptorOrientationMode::Approximate => {
            accumulate_subregions(&sample_grid(integral, loc, config, true), config)
        }
        DescriptorOrientationMode::Cluster => describe_clustered(integral, loc, config),
    };

    if config.normalize {
        l2_normalize(&mut descriptor);
    }
    if let Some(clip) = config.clip_value {
        for v in descriptor.iter_mut() {
            *v = v.clamp(-clip, clip);
        }
        if config.normalize {
            l2_normalize(&mut descriptor);
        }
    }

    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FMatrix;
    use crate::imgproc::integral::BoundaryType;

    fn blob_image() -> IntegralImage {
        let mut src = FMatrix::zeros(96, 96);
        for y in 30..66 {
            for x in 30..66 {
                src.set(y, x, 200.0);
            }
        }
        IntegralImage::integrate(&src, BoundaryType::Constant).unwrap()
    }

    #[test]
    fn orientation_mode_round_trips_by_name() {
        use std::str::FromStr;
        assert_eq!(
            DescriptorOrientationMode::from_str("Cluster").unwrap(),
            DescriptorOrientationMode::Cluster
        );
        assert_eq!(
            DescriptorOrientationMode::from_str("bogus").unwrap(),
            DescriptorOrientationMode::Approximate
        );
    }

    #[test]
    fn descriptor_length_matches_configuration() {
        let config = DescriptorConfig::default();
        assert_eq!(config.descriptor_length(), 4 * 4 * 4);
        let config8 = DescriptorConfig {
            sign_split: true,
            ..DescriptorConfig::default()
        };
        assert_eq!(config8.descriptor_length(), 4 * 4 * 8);
    }

    #[test]
    fn normalized_descriptor_has_unit_l2_norm() {
        let integral = blob_image();
        let loc = Location::new(48.0, 48.0, 4.0);
        let config = DescriptorConfig::default();
        let d = describe(&integral, &loc, &config);
        assert_eq!(d.len(), config.descriptor_length());
        let norm: f32 = d.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3 || norm < 1e-6);
    }

    #[test]
    fn ignore_mode_is_insensitive_to_the_stored_angle() {
        let integral = blob_image();
        let mut loc_a = Location::new(48.0, 48.0, 4.0);
        loc_a.set_angle(0.0);
        let mut loc_b = Location::new(48.0, 48.0, 4.0);
        loc_b.set_angle(1.0);
        let config = DescriptorConfig {
            orientation_mode: DescriptorOrientationMode::Ignore,
            ..DescriptorConfig::default()
        };
        let da = describe(&integral, &loc_a, &config);
        let db = describe(&integral, &loc_b, &config);
        assert_eq!(da, db);
    }

    #[test]
    fn clip_value_renormalizes_to_unit_norm() {
        // Clipping then renormalizing can push a component's magnitude
        // back above `clip_value` (the renormalization divides by a
        // post-clip norm <= 1), so the invariant clipping actually
        // guarantees is unit norm, not a hard per-component bound.
        let integral = blob_image();
        let loc = Location::new(48.0, 48.0, 4.0);
        let config = DescriptorConfig {
            clip_value: Some(0.2),
            ..DescriptorConfig::default()
        };
        let d = describe(&integral, &loc, &config);
        let norm: f32 = d.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3 || norm < 1e-6);
    }
}
