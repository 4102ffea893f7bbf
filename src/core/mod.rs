pub mod fmatrix;
pub mod mat;
pub mod mat_typed;
pub mod types;

pub use fmatrix::FMatrix;
pub use mat::{Mat, MatDepth};
pub use types::*;
