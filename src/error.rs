use thiserror::Error;

/// Error conditions surfaced by the core pipeline (spec.md §7).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration out of range or self-inconsistent, e.g.
    /// `numberOfLevels < 3` leaving ExtremumFinder without a middle level.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Source image has zero area.
    #[error("Empty input image")]
    EmptyInput,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Allocation failures abort the process in Rust; this variant exists
    /// only so the enum mirrors spec.md §7 in full.
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// `internal_sum`/`internal_sum` called outside its documented safe
    /// region. Only raised in debug builds (see `IntegralImage::internal_sum`);
    /// release builds skip the check, matching the original's
    /// `#ifndef NDEBUG` dispatcher split.
    #[error("Internal precondition violated: {0}")]
    InternalPrecondition(String),
}

pub type Result<T> = std::result::Result<T, Error>;
