pub mod descriptor;
pub mod extremum;
pub mod genetics;
pub mod hessian;
pub mod location;
pub mod orientation;
pub mod pipeline;
pub mod selector;

pub use descriptor::{describe, DescriptorConfig, DescriptorOrientationMode};
pub use extremum::{ExtremaType, Extremum, ExtremumFinderConfig, find_extrema};
pub use genetics::{decode, encode, GeneEncoding};
pub use hessian::{HessianPyramidConfig, Level, LevelSelectionMethod, LevelStack};
pub use location::{CoordinateSystem, Location};
pub use orientation::{estimate_orientations, OrientationConfig};
pub use pipeline::{detect_and_describe, InterestPoint, PipelineConfig};
pub use selector::{LocationSelectionMode, LocationSelectorConfig, select};
