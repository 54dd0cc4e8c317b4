//! Error types for the path solver
//!
//! Every validation site reports a typed, recoverable error; the engine
//! never terminates the process on malformed input.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Two inputs disagree on a shared dimension
    #[error("{left} and {right} must have the same number of {dimension} ({left_len} != {right_len})")]
    ShapeMismatch {
        left: &'static str,
        right: &'static str,
        dimension: &'static str,
        left_len: usize,
        right_len: usize,
    },
    /// Inputs mix 32-bit and 64-bit floating point storage
    #[error("{left} and {right} must be the same precision")]
    PrecisionMismatch {
        left: &'static str,
        right: &'static str,
    },
    /// An operation was called in the wrong solver lifecycle stage
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("requested {requested} compute devices but only {available} are available")]
    DeviceUnavailable { requested: usize, available: usize },
    /// A worker or the backend itself failed; never retried
    #[error("solver engine failure: {0}")]
    EngineFailure(String),
    #[error("not enough samples as they have to be larger than zero")]
    NotEnoughSamples,
    #[error("weights must be finite and non-negative")]
    InvalidWeights,
    #[error("lambda_min_ratio must be in (0, 1), but is {0}")]
    InvalidLambdaMinRatio(f64),
    #[error("number of lambdas must be positive")]
    InvalidLambdaCount,
    #[error("number of folds must be at least 1")]
    InvalidFoldCount,
    #[error("number of alphas must be at least 1")]
    InvalidAlphaCount,
    #[error("stop_early_error_fraction must be in [0, 1], but is {0}")]
    InvalidStopFraction(f64),
    #[error("max_iterations must be positive")]
    InvalidMaxIterations,
    #[error("tolerance must be non-negative and finite, but is {0}")]
    InvalidTolerance(f64),
}
