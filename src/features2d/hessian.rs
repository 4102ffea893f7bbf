//! Fast-Hessian response pyramid (spec.md §4.2).
//!
//! Grounded in `original_source/src/imgProc/ltiFastHessianDetection.cpp`
//! (`updateParameters`, default parameter values) and
//! `ltiFastHessianDetection_template.h` (`computeDeterminant`,
//! `computeLevels`). The box geometry, the Frobenius-ratio normalization
//! constant, and the interior/border split of the main loop are carried
//! over unchanged; only the matrix type (`FMatrix` rather than `fmatrix`
//! plus a raw integral-image functor) and error handling (`Result` instead
//! of a bool-plus-status-string) are re-architected, per Design Note §9.

use crate::core::FMatrix;
use crate::error::{Error, Result};
use crate::imgproc::integral::{BoundaryType, IntegralImage};

/// How successive kernel sizes are chosen (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelSelectionMethod {
    #[default]
    Blocks,
    Exponential,
}

impl std::str::FromStr for LevelSelectionMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "Exponential" => LevelSelectionMethod::Exponential,
            _ => LevelSelectionMethod::Blocks,
        })
    }
}

impl std::fmt::Display for LevelSelectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LevelSelectionMethod::Blocks => "Blocks",
            LevelSelectionMethod::Exponential => "Exponential",
        })
    }
}

/// Configuration for `HessianPyramid::build` (spec.md §4.2, defaults from
/// `ltiFastHessianDetection.cpp`'s `parameters` constructor).
#[derive(Debug, Clone)]
pub struct HessianPyramidConfig {
    pub number_of_levels: usize,
    pub initial_kernel_size: i32,
    pub initial_kernel_step: i32,
    pub level_group_size: usize,
    pub level_selection_method: LevelSelectionMethod,
    pub norm_power: f32,
    pub subsample_levels: bool,
    pub initial_sampling_step: i32,
    pub boundary: BoundaryType,
}

impl Default for HessianPyramidConfig {
    fn default() -> Self {
        Self {
            number_of_levels: 12,
            initial_kernel_size: 9,
            initial_kernel_step: 6,
            level_group_size: 4,
            level_selection_method: LevelSelectionMethod::Blocks,
            norm_power: 4.0,
            subsample_levels: true,
            initial_sampling_step: 2,
            boundary: BoundaryType::Constant,
        }
    }
}

impl HessianPyramidConfig {
    /// Sanitize kernel size (odd, divisible by 3) and kernel step (multiple
    /// of 6), as `updateParameters` does; never errors, per spec.md §7.
    #[must_use]
    pub fn validate(mut self) -> Self {
        self.initial_kernel_step = (self.initial_kernel_step as f32 / 6.0).round() as i32 * 6;
        self.initial_kernel_step = self.initial_kernel_step.max(6);

        let mut ks = (self.initial_kernel_size as f32 / 3.0).round() as i32 * 3;
        ks = ks.max(3);
        if ks % 2 == 0 {
            ks += 3;
        }
        self.initial_kernel_size = ks;

        self.number_of_levels = self.number_of_levels.max(3);
        self.level_group_size = self.level_group_size.max(1);
        self
    }
}

/// A response map for one kernel size. Undefined (left at zero) at cells
/// the sample grid does not visit (spec.md §3 `Level`).
#[derive(Debug, Clone)]
pub struct Level {
    pub response: FMatrix,
    pub kernel_size: i32,
    /// Scale radius in SURF units: `kernel_size * 1.2 / 9`.
    pub scale: f32,
    pub sample_step: i32,
}

/// Ordered sequence of `Level`s plus the shared integral image they were
/// computed from (spec.md §3 `LevelStack`).
#[derive(Debug)]
pub struct LevelStack {
    pub levels: Vec<Level>,
    pub integral: IntegralImage,
}

const KERNEL_TO_SCALE: f32 = 1.2 / 9.0;

impl LevelStack {
    /// Build the pseudo-pyramid: integrate `src`, then compute one
    /// response map per kernel size (spec.md §4.2, `computeLevels`).
    pub fn build(src: &FMatrix, config: &HessianPyramidConfig) -> Result<Self> {
        if src.is_empty() {
            return Err(Error::EmptyInput);
        }
        if config.number_of_levels < 3 {
            return Err(Error::InvalidParameters(
                "numberOfLevels must be >= 3 for ExtremumFinder to have a middle level".into(),
            ));
        }

        let kernel_sizes = kernel_size_progression(config);
        let sample_steps = sampling_steps(config, &kernel_sizes);

        let integral = IntegralImage::integrate(src, config.boundary)?;

        // The original passes the *previous* level's sampling step to
        // computeDeterminant for level i >= 1, and the base step for
        // level 0 -- an off-by-one quirk in ltiFastHessianDetection_
        // template.h's computeLevels, preserved here for fidelity.
        let steps: Vec<i32> = (0..kernel_sizes.len())
            .map(|i| {
                if i < 1 {
                    config.initial_sampling_step
                } else {
                    sample_steps[i - 1]
                }
            })
            .collect();

        // Each level's response map depends only on the shared (read-only)
        // integral image, so the stack can be computed with one response
        // map per rayon task instead of sequentially (spec.md §5's
        // "per-level response maps within a stack are independent").
        let responses = compute_all_levels(&kernel_sizes, &steps, &integral, config.norm_power)?;

        let levels: Vec<Level> = kernel_sizes
            .iter()
            .zip(responses)
            .enumerate()
            .map(|(i, (&ks, response))| Level {
                response,
                kernel_size: ks,
                scale: ks as f32 * KERNEL_TO_SCALE,
                sample_step: sample_steps[i],
            })
            .collect();

        log::debug!(
            "built level stack: {} levels, kernel sizes {:?}",
            levels.len(),
            kernel_sizes
        );

        Ok(Self { levels, integral })
    }
}

fn kernel_size_progression(config: &HessianPyramidConfig) -> Vec<i32> {
    let n = config.number_of_levels;
    let mut sizes = vec![0i32; n];

    match config.level_selection_method {
        LevelSelectionMethod::Blocks => {
            let mut k_size = config.initial_kernel_size;
            let mut k_step = config.initial_kernel_step;
            for (i, slot) in sizes.iter_mut().enumerate() {
                *slot = k_size;
                k_size += k_step;
                if (i + 1) % config.level_group_size == 0 {
                    k_step *= 2;
                }
            }
        }
        LevelSelectionMethod::Exponential => {
            let alpha = 2f64.powf(1.0 / config.level_group_size as f64);
            sizes[0] = config.initial_kernel_size;
            let mut k_size = config.initial_kernel_size as f64 * alpha;
            for i in 1..n {
                let mut the_size;
                loop {
                    the_size = (k_size / 3.0).round() as i32 * 3;
                    if the_size % 2 == 0 {
                        the_size += 3;
                    }
                    k_size *= alpha;
                    if the_size != sizes[i - 1] {
                        break;
                    }
                }
                sizes[i] = the_size;
            }
        }
    }
    sizes
}

fn sampling_steps(config: &HessianPyramidConfig, kernel_sizes: &[i32]) -> Vec<i32> {
    if !config.subsample_levels {
        return vec![config.initial_sampling_step; kernel_sizes.len()];
    }
    let base = kernel_sizes[0] as f32;
    kernel_sizes
        .iter()
        .map(|&ks| {
            let ratio = (ks as f32 / base).ln() / 2f32.ln();
            config.initial_sampling_step * 1.max(1i32 << ratio.round() as i32)
        })
        .collect()
}

/// Compute one response map per kernel size. Behind the `parallel`
/// feature this fans the per-level work out over `rayon`'s global pool;
/// without it, the levels are computed sequentially. Both paths produce
/// identical output, since each level reads only the shared `integral`
/// and writes its own `FMatrix`.
#[cfg(feature = "parallel")]
fn compute_all_levels(
    kernel_sizes: &[i32],
    steps: &[i32],
    integral: &IntegralImage,
    norm_power: f32,
) -> Result<Vec<FMatrix>> {
    use rayon::prelude::*;
    kernel_sizes
        .par_iter()
        .zip(steps.par_iter())
        .map(|(&ks, &step)| compute_determinant(ks, integral, step, norm_power))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn compute_all_levels(
    kernel_sizes: &[i32],
    steps: &[i32],
    integral: &IntegralImage,
    norm_power: f32,
) -> Result<Vec<FMatrix>> {
    kernel_sizes
        .iter()
        .zip(steps.iter())
        .map(|(&ks, &step)| compute_determinant(ks, integral, step, norm_power))
        .collect()
}

/// Box-filter approximation of the determinant of the Hessian for one
/// kernel size (spec.md §4.2, `computeDeterminant`). Evaluates the
/// interior with `internal_sum` and the border with the checked `sum`.
fn compute_determinant(
    kernel_size: i32,
    integral: &IntegralImage,
    sample_step: i32,
    norm_power: f32,
) -> Result<FMatrix> {
    let rows = integral.rows();
    let cols = integral.cols();
    let mut det = FMatrix::zeros(rows, cols);

    let norm = 1.0 / (kernel_size as f32).powf(norm_power);

    let h_side = (kernel_size - 1) / 2;
    let dxx1_height = (h_side + 1) / 2;
    let dxx2_width = h_side - kernel_size / 3;

    let dxy_fr = kernel_size - 2 * (kernel_size / 3);
    let dxy_ex = h_side - (dxy_fr - dxy_fr / 3) / 2;
    let dxy_in = dxy_ex - kernel_size / 3 + 1;

    const FROB_RATIO_GAUSS: f32 = 0.577_658 * 0.577_658;
    let frob_ratio = FROB_RATIO_GAUSS * ((dxx1_height * 2 + 1) as f32 * 4.5 / kernel_size as f32);

    log::trace!(
        "kernel {kernel_size}: frobRatio={frob_ratio}, step={sample_step}, norm={norm}"
    );

    let val = h_side + 1;
    let tmp = val % sample_step;
    let start_pos = if tmp != 0 { val + (sample_step - tmp) } else { val };

    let last_row = rows as i32 - h_side;
    let last_col = cols as i32 - h_side;

    let block = |x: i32, y: i32, fast: bool| -> f32 {
        let s = |x0: i64, y0: i64, x1: i64, y1: i64| -> f32 {
            if fast {
                integral.internal_sum(x0, y0, x1, y1)
            } else {
                integral.sum(x0, y0, x1, y1)
            }
        };

        let (x, y) = (x as i64, y as i64);
        let (h, dw, dh) = (h_side as i64, dxx2_width as i64, dxx1_height as i64);

        let mut dxx = s(x - h, y - dh, x + h, y + dh);
        dxx -= 3.0 * s(x - dw, y - dh, x + dw, y + dh);

        let mut dyy = s(x - dh, y - h, x + dh, y + h);
        dyy -= 3.0 * s(x - dh, y - dw, x + dh, y + dw);

        let (ex, inn) = (dxy_ex as i64, dxy_in as i64);
        let dxy = s(x - ex, y - ex, x - inn, y - inn) + s(x + inn, y + inn, x + ex, y + ex)
            - s(x - ex, y + inn, x - inn, y + ex)
            - s(x + inn, y - ex, x + ex, y - inn);

        (dxx * dyy - frob_ratio * dxy * dxy) * norm
    };

    // interior: safe for the unchecked sum
    let mut y = start_pos;
    while y < last_row {
        let mut x = start_pos;
        while x < last_col {
            det.set(y as usize, x as usize, block(x, y, true));
            x += sample_step;
        }
        y += sample_step;
    }

    // border rows/columns: bounds-checked sum under the configured policy
    if integral.boundary() == BoundaryType::NoBoundary {
        return Ok(det);
    }

    let y_top = start_pos.min(rows as i32);
    let mut y = 0;
    while y < y_top {
        let mut x = 0;
        while x < cols as i32 {
            det.set(y as usize, x as usize, block(x, y, false));
            x += sample_step;
        }
        y += sample_step;
    }

    let val = y_top.max(last_row);
    let tmp = val % sample_step;
    let start_bottom = if tmp != 0 { val + (sample_step - tmp) } else { val };
    let mut y = start_bottom;
    while y < rows as i32 {
        let mut x = 0;
        while x < cols as i32 {
            det.set(y as usize, x as usize, block(x, y, false));
            x += sample_step;
        }
        y += sample_step;
    }

    let x_left = start_pos.min(cols as i32);
    let val = x_left.max(last_col);
    let tmp = val % sample_step;
    let x_right = if tmp != 0 { val + (sample_step - tmp) } else { val };

    let mut y = start_pos;
    while y < last_row {
        let mut x = 0;
        while x < x_left {
            det.set(y as usize, x as usize, block(x, y, false));
            x += sample_step;
        }
        let mut x = x_right;
        while x < cols as i32 {
            det.set(y as usize, x as usize, block(x, y, false));
            x += sample_step;
        }
        y += sample_step;
    }

    Ok(det)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_image(rows: usize, cols: usize, value: f32) -> FMatrix {
        FMatrix::filled(rows, cols, value)
    }

    #[test]
    fn blocks_progression_matches_default_kernel_sizes() {
        let config = HessianPyramidConfig::default().validate();
        let sizes = kernel_size_progression(&config);
        // 9, 15, 21, 27, then step doubles to 12: 39, 51, 63, 75, step doubles to 24
        assert_eq!(sizes[0], 9);
        assert_eq!(sizes[1], 15);
        assert_eq!(sizes[4], 39);
    }

    #[test]
    fn uniform_image_has_zero_determinant_everywhere_sampled() {
        let src = constant_image(64, 64, 128.0);
        let config = HessianPyramidConfig {
            number_of_levels: 4,
            ..HessianPyramidConfig::default()
        }
        .validate();
        let stack = LevelStack::build(&src, &config).unwrap();
        for level in &stack.levels {
            for &v in level.response.data() {
                assert!(v.abs() < 1e-3, "expected ~0, got {v}");
            }
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let src = FMatrix::zeros(0, 0);
        let config = HessianPyramidConfig::default().validate();
        assert!(LevelStack::build(&src, &config).is_err());
    }

    #[test]
    fn too_few_levels_is_rejected() {
        let src = constant_image(16, 16, 1.0);
        let config = HessianPyramidConfig {
            number_of_levels: 2,
            ..HessianPyramidConfig::default()
        };
        assert!(LevelStack::build(&src, &config).is_err());
    }
}
