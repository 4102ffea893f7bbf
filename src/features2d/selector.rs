//! Location selection (spec.md §4.4).
//!
//! Grounded in `original_source/src/imgProc/ltiFastHessianDetection.cpp`'s
//! `locationSelectionMode` handling (`selectLocations`/`apply`). Each
//! mode ranks or thresholds the raw extrema by their underlying response
//! strength. `find_extrema` returns each candidate's discrete-maximum
//! strength alongside its `Location` (as `Extremum`); callers pull the
//! `strength` field out into its own slice before calling `select`,
//! mirroring the original's separate `values` vector argument to `apply`.

/// How candidate locations are filtered down (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationSelectionMode {
    #[default]
    All,
    Absolute,
    Relative,
    Conspicuous,
    Number,
}

impl std::str::FromStr for LocationSelectionMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "All" => LocationSelectionMode::All,
            "Absolute" => LocationSelectionMode::Absolute,
            "Relative" => LocationSelectionMode::Relative,
            "Conspicuous" => LocationSelectionMode::Conspicuous,
            "Number" => LocationSelectionMode::Number,
            // unknown names fall back to the documented default
            _ => LocationSelectionMode::Absolute,
        })
    }
}

impl std::fmt::Display for LocationSelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LocationSelectionMode::All => "All",
            LocationSelectionMode::Absolute => "Absolute",
            LocationSelectionMode::Relative => "Relative",
            LocationSelectionMode::Conspicuous => "Conspicuous",
            LocationSelectionMode::Number => "Number",
        })
    }
}

/// Configuration for `select` (spec.md §4.4).
///
/// `threshold` is overloaded by mode, exactly as in the original: an
/// absolute response cutoff for `Absolute`, a fraction of the extreme
/// value for `Relative`, a standard-deviation multiplier for
/// `Conspicuous`, and — unusually — the desired keep-`count` for `Number`
/// (truncated to the nearest integer). This dual role is a wart inherited
/// from the original rather than an idiomatic Rust design; see DESIGN.md.
#[derive(Debug, Clone)]
pub struct LocationSelectorConfig {
    pub mode: LocationSelectionMode,
    pub threshold: f32,
}

impl Default for LocationSelectorConfig {
    fn default() -> Self {
        Self {
            mode: LocationSelectionMode::All,
            threshold: 0.1,
        }
    }
}

/// Select indices into `strengths` to keep (spec.md §4.4 `apply`).
/// `strengths` holds each candidate's signed response magnitude, aligned
/// 1:1 with the `Location` list it was derived from.
#[must_use]
pub fn select(strengths: &[f32], config: &LocationSelectorConfig) -> Vec<usize> {
    if strengths.is_empty() {
        return Vec::new();
    }

    match config.mode {
        LocationSelectionMode::All => (0..strengths.len()).collect(),

        LocationSelectionMode::Absolute => strengths
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v.abs() >= config.threshold)
            .map(|(i, _)| i)
            .collect(),

        LocationSelectionMode::Relative => {
            let max_abs = strengths.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
            let cutoff = max_abs * config.threshold;
            strengths
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v.abs() >= cutoff)
                .map(|(i, _)| i)
                .collect()
        }

        LocationSelectionMode::Conspicuous => {
            let n = strengths.len() as f32;
            let mean = strengths.iter().sum::<f32>() / n;
            let variance = strengths.iter().map(|&v| (v - mean).powi(2)).sum::<f32>() / n;
            let stddev = variance.sqrt();
            let cutoff = mean.abs() + config.threshold * stddev;
            strengths
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v.abs() >= cutoff)
                .map(|(i, _)| i)
                .collect()
        }

        LocationSelectionMode::Number => {
            let count = (config.threshold.round() as usize).min(strengths.len());
            let mut ranked: Vec<usize> = (0..strengths.len()).collect();
            ranked.sort_by(|&a, &b| {
                strengths[b]
                    .abs()
                    .partial_cmp(&strengths[a].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            ranked.truncate(count);
            ranked.sort_unstable();
            ranked
        }
    }
}
