//! The solver engine
//!
//! [`GlmSolver`] owns the uploaded dataset, the fitted models and the
//! last predictions of one engine instance and walks the lifecycle
//! `Empty -> DataLoaded -> Fitted -> Predicting`. Buffers are released
//! explicitly through the idempotent `release_*` operations or
//! implicitly on drop.

mod aggregate;
mod cd;
mod driver;

pub use aggregate::{FitOutcome, PathPoint, ERR_OBJECTIVE, ERR_TRAIN, ERR_VALID};

use ndarray::{Array2, Array3, ArrayBase, ArrayView2, Data, Ix2};

use crate::backend::{ComputeBackend, CpuBackend};
use crate::dataset::{Float, GlmDataset};
use crate::error::{Error, Result};
use crate::hyperparams::{GlmParams, GlmValidParams};
use crate::param_guard::ParamGuard;

/// The lifecycle stage of a solver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStage {
    Empty,
    DataLoaded,
    Fitted,
    Predicting,
}

/// Predictions for every fitted model
///
/// Mirrors the fit layouts: one prediction row per alpha, and the whole
/// `(lambda, alpha)` grid of predictions when the fit retained the full
/// path.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions<F: Float> {
    best: Array2<F>,
    full: Option<Array3<F>>,
}

impl<F: Float> Predictions<F> {
    /// Predictions of the best model per alpha, `(n_alphas, n_rows)`
    pub fn best(&self) -> &Array2<F> {
        &self.best
    }

    /// Predictions of every retained grid point,
    /// `(n_lambdas, n_alphas, n_rows)`
    pub fn full(&self) -> Option<&Array3<F>> {
        self.full.as_ref()
    }
}

/// A pathwise elastic net solver instance
///
/// One dataset is in flight at a time: uploading over a loaded dataset
/// is rejected until [`release_data`](Self::release_data) was called.
/// Fitting requires loaded data, predicting a prior fit; both report
/// misuse as [`Error::InvalidState`].
pub struct GlmSolver<F: Float, B: ComputeBackend = CpuBackend> {
    params: GlmValidParams<F>,
    backend: B,
    source_device: usize,
    data: Option<GlmDataset<F>>,
    fit: Option<FitOutcome<F>>,
    predictions: Option<Predictions<F>>,
}

impl<F: Float> GlmSolver<F, CpuBackend> {
    /// Create a default parameter set for construction of a solver
    pub fn params() -> GlmParams<F> {
        GlmParams::new()
    }

    /// Create a solver on the CPU backend with one device per available
    /// core
    pub fn new(params: GlmParams<F>) -> Result<Self> {
        Self::with_backend(params, CpuBackend::detect()?)
    }
}

impl<F: Float, B: ComputeBackend> GlmSolver<F, B> {
    /// Create a solver on an explicit backend, verifying the
    /// hyper-parameters
    pub fn with_backend(params: GlmParams<F>, backend: B) -> Result<Self> {
        let params = params.check()?;
        Ok(GlmSolver {
            params,
            backend,
            source_device: 0,
            data: None,
            fit: None,
            predictions: None,
        })
    }

    /// Pick the device responsible for initial data placement
    pub fn with_source_device(mut self, source_device: usize) -> Result<Self> {
        if source_device >= self.backend.device_count() {
            return Err(Error::DeviceUnavailable {
                requested: source_device + 1,
                available: self.backend.device_count(),
            });
        }
        self.source_device = source_device;
        Ok(self)
    }

    pub fn hyperparams(&self) -> &GlmValidParams<F> {
        &self.params
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn source_device(&self) -> usize {
        self.source_device
    }

    /// The lifecycle stage the instance is currently in
    pub fn stage(&self) -> SolverStage {
        if self.predictions.is_some() {
            SolverStage::Predicting
        } else if self.fit.is_some() {
            SolverStage::Fitted
        } else if self.data.is_some() {
            SolverStage::DataLoaded
        } else {
            SolverStage::Empty
        }
    }

    /// Upload a dataset into the instance
    ///
    /// A loaded dataset must be released before the next upload.
    pub fn upload(&mut self, data: GlmDataset<F>) -> Result<()> {
        if self.data.is_some() {
            return Err(Error::InvalidState(
                "a dataset is already uploaded; release it first",
            ));
        }
        self.data = Some(data);
        Ok(())
    }

    /// Fit the whole `(alpha, lambda)` grid on the uploaded dataset
    ///
    /// A previous solution is released before refitting.
    pub fn fit(&mut self) -> Result<&FitOutcome<F>> {
        let data = match &self.data {
            Some(data) => data,
            None => return Err(Error::InvalidState("no dataset uploaded")),
        };
        self.predictions = None;
        self.fit = None;
        let outcome = driver::fit_path(&self.params, &self.backend, data)?;
        Ok(self.fit.insert(outcome))
    }

    /// The fit outcome, when a fit has completed
    pub fn fitted(&self) -> Option<&FitOutcome<F>> {
        self.fit.as_ref()
    }

    /// Predict with the stored models against the uploaded dataset
    ///
    /// Scores the validation matrix when one was uploaded, the training
    /// matrix otherwise.
    pub fn predict(&mut self) -> Result<&Predictions<F>> {
        let fit = match &self.fit {
            Some(fit) => fit,
            None => return Err(Error::InvalidState("no model available")),
        };
        let data = match &self.data {
            Some(data) => data,
            None => return Err(Error::InvalidState("no dataset uploaded")),
        };
        let x = match data.valid() {
            Some((vx, _)) => vx.view(),
            None => data.train_x().view(),
        };
        let predictions = predict_with(fit, x);
        Ok(self.predictions.insert(predictions))
    }

    /// Predict with the stored models against a caller matrix
    pub fn predict_matrix<D: Data<Elem = F>>(
        &mut self,
        x: &ArrayBase<D, Ix2>,
    ) -> Result<&Predictions<F>> {
        let fit = match &self.fit {
            Some(fit) => fit,
            None => return Err(Error::InvalidState("no model available")),
        };
        if x.ncols() != fit.n_features() {
            return Err(Error::ShapeMismatch {
                left: "input X",
                right: "model coefficients",
                dimension: "columns",
                left_len: x.ncols(),
                right_len: fit.n_features(),
            });
        }
        let predictions = predict_with(fit, x.view());
        Ok(self.predictions.insert(predictions))
    }

    /// Last predictions, when any were made
    pub fn predictions(&self) -> Option<&Predictions<F>> {
        self.predictions.as_ref()
    }

    /// Release the uploaded dataset; idempotent
    ///
    /// Fitted models survive, so [`predict_matrix`](Self::predict_matrix)
    /// keeps working after the data buffers are gone.
    pub fn release_data(&mut self) {
        self.data = None;
    }

    /// Release the fitted models; idempotent
    pub fn release_model(&mut self) {
        self.fit = None;
    }

    /// Release the stored predictions; idempotent
    pub fn release_predictions(&mut self) {
        self.predictions = None;
    }

    /// Release everything the instance owns; idempotent
    pub fn release(&mut self) {
        self.release_predictions();
        self.release_model();
        self.release_data();
    }
}

fn predict_with<F: Float>(fit: &FitOutcome<F>, x: ArrayView2<F>) -> Predictions<F> {
    let n_rows = x.nrows();
    let mut best = Array2::zeros((fit.n_alphas(), n_rows));
    for (a, point) in fit.best().iter().enumerate() {
        let scores = x.dot(&point.coefficients) + point.intercept;
        best.row_mut(a).assign(&scores);
    }

    let full = fit.full().map(|points| {
        let mut out = Array3::zeros((fit.n_lambdas(), fit.n_alphas(), n_rows));
        for l in 0..fit.n_lambdas() {
            for a in 0..fit.n_alphas() {
                let point = &points[l * fit.n_alphas() + a];
                let scores = x.dot(&point.coefficients) + point.intercept;
                out.slice_mut(ndarray::s![l, a, ..]).assign(&scores);
            }
        }
        out
    });

    Predictions { best, full }
}
