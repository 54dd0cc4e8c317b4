#![doc = include_str!("../README.md")]

mod backend;
mod dataset;
mod error;
mod hyperparams;
mod metrics;
mod param_guard;
mod solver;

pub use backend::{ComputeBackend, CpuBackend};
pub use dataset::{DynDataset, Float, GlmDataset, HostMatrix, HostVector, Precision};
pub use error::{Error, Result};
pub use hyperparams::{Family, GlmParams, GlmValidParams};
pub use metrics::Regression;
pub use param_guard::ParamGuard;
pub use solver::{
    FitOutcome, GlmSolver, PathPoint, Predictions, SolverStage, ERR_OBJECTIVE, ERR_TRAIN,
    ERR_VALID,
};

/// Common imports for working with the path solver
pub mod prelude {
    pub use crate::{
        DynDataset, Error, Family, FitOutcome, Float, GlmDataset, GlmParams, GlmSolver,
        HostMatrix, HostVector, ParamGuard, PathPoint, Precision, Predictions, Regression, Result,
        SolverStage,
    };
}
