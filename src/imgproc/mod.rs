pub mod integral;

pub use integral::{BoundaryType, IntegralImage};
