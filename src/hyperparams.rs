#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::dataset::Float;
use crate::error::{Error, Result};
use crate::param_guard::ParamGuard;

/// The distribution family of the fitted model
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Family {
    ElasticNet,
}

impl Default for Family {
    fn default() -> Self {
        Family::ElasticNet
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
/// A verified hyper-parameter set ready for driving a path fit
///
/// See [`GlmParams`](crate::GlmParams) for more information.
pub struct GlmValidParams<F: Float> {
    family: Family,
    with_intercept: bool,
    standardize: bool,
    lambda_min_ratio: F,
    n_lambdas: usize,
    n_folds: usize,
    n_alphas: usize,
    stop_early: bool,
    stop_early_error_fraction: F,
    max_iterations: u32,
    tolerance: F,
    retain_full_path: bool,
}

impl<F: Float> GlmValidParams<F> {
    pub fn family(&self) -> Family {
        self.family
    }

    pub fn with_intercept(&self) -> bool {
        self.with_intercept
    }

    pub fn standardize(&self) -> bool {
        self.standardize
    }

    pub fn lambda_min_ratio(&self) -> F {
        self.lambda_min_ratio
    }

    pub fn n_lambdas(&self) -> usize {
        self.n_lambdas
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    pub fn n_alphas(&self) -> usize {
        self.n_alphas
    }

    pub fn stop_early(&self) -> bool {
        self.stop_early
    }

    pub fn stop_early_error_fraction(&self) -> F {
        self.stop_early_error_fraction
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn retain_full_path(&self) -> bool {
        self.retain_full_path
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct GlmParams<F: Float>(GlmValidParams<F>);

/// A hyper-parameter set for a pathwise elastic net fit
///
/// For every grid point `(alpha, lambda)` the engine minimizes
/// ```ignore
/// 1 / (2 * n_samples) * ||y - Xw||^2_2
///     + lambda * alpha * ||w||_1
///     + 0.5 * lambda * (1 - alpha) * ||w||^2_2
/// ```
/// with the lambda sequence spaced geometrically from a data-derived
/// maximum down to `lambda_min_ratio` times that maximum and the alpha
/// grid spread evenly over `[0, 1]`.
///
/// The parameter set can be verified into a
/// [`GlmValidParams`](crate::GlmValidParams) by calling
/// [ParamGuard::check](Self::check); constructing a solver performs the
/// check implicitly and forwards any error.
///
/// # Parameters
/// | Name | Default | Purpose | Range |
/// | :--- | :--- | :--- | :--- |
/// | [with_intercept](Self::with_intercept) | `true` | Fit an intercept via centering | `false`, `true` |
/// | [standardize](Self::standardize) | `false` | Rescale columns to unit variance | `false`, `true` |
/// | [lambda_min_ratio](Self::lambda_min_ratio) | `1e-7` | Smallest lambda as a fraction of the maximum | `(0, 1)` |
/// | [n_lambdas](Self::n_lambdas) | `100` | Number of points on the lambda path | `[1, inf)` |
/// | [n_folds](Self::n_folds) | `1` | Cross-validation folds, `1` disables | `[1, inf)` |
/// | [n_alphas](Self::n_alphas) | `1` | Number of alpha grid points | `[1, inf)` |
/// | [stop_early](Self::stop_early) | `true` | Stop a kernel when validation error stalls | `false`, `true` |
/// | [stop_early_error_fraction](Self::stop_early_error_fraction) | `1.0` | Stall sensitivity, `0` never stops | `[0, 1]` |
/// | [max_iterations](Self::max_iterations) | `5000` | Iteration budget per grid point | `[1, inf)` |
/// | [tolerance](Self::tolerance) | `1e-4` | Duality gap convergence threshold | `[0, inf)` |
/// | [retain_full_path](Self::retain_full_path) | `false` | Keep every grid point, not only best per alpha | `false`, `true` |
impl<F: Float> GlmParams<F> {
    pub fn new() -> GlmParams<F> {
        Self(GlmValidParams {
            family: Family::ElasticNet,
            with_intercept: true,
            standardize: false,
            lambda_min_ratio: F::cast(1e-7),
            n_lambdas: 100,
            n_folds: 1,
            n_alphas: 1,
            stop_early: true,
            stop_early_error_fraction: F::one(),
            max_iterations: 5000,
            tolerance: F::cast(1e-4),
            retain_full_path: false,
        })
    }

    /// Set the distribution family. Only the elastic net family exists
    /// at the moment.
    pub fn family(mut self, family: Family) -> Self {
        self.0.family = family;
        self
    }

    /// Configure the engine to fit an intercept.
    /// Defaults to `true` if not set.
    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.0.with_intercept = with_intercept;
        self
    }

    /// Rescale feature columns to unit variance before fitting; fitted
    /// coefficients are mapped back to the original scale.
    /// Defaults to `false` if not set.
    pub fn standardize(mut self, standardize: bool) -> Self {
        self.0.standardize = standardize;
        self
    }

    /// Set the ratio between the smallest and the largest lambda on the
    /// path.
    ///
    /// Defaults to `1e-7` if not set
    pub fn lambda_min_ratio(mut self, lambda_min_ratio: F) -> Self {
        self.0.lambda_min_ratio = lambda_min_ratio;
        self
    }

    /// Set the number of lambda values on the path.
    ///
    /// Defaults to `100` if not set
    pub fn n_lambdas(mut self, n_lambdas: usize) -> Self {
        self.0.n_lambdas = n_lambdas;
        self
    }

    /// Set the number of cross-validation folds. A value of `1`
    /// disables cross-validation and scores against the validation pair
    /// of the dataset, or the training data when none was given.
    ///
    /// Defaults to `1` if not set
    pub fn n_folds(mut self, n_folds: usize) -> Self {
        self.0.n_folds = n_folds;
        self
    }

    /// Set the number of alpha values on the grid, spread evenly over
    /// `[0, 1]`. A single alpha is pinned at `0.5`.
    ///
    /// Defaults to `1` if not set
    pub fn n_alphas(mut self, n_alphas: usize) -> Self {
        self.0.n_alphas = n_alphas;
        self
    }

    /// Stop the inner optimization early when the validation error
    /// stops improving.
    /// Defaults to `true` if not set.
    pub fn stop_early(mut self, stop_early: bool) -> Self {
        self.0.stop_early = stop_early;
        self
    }

    /// Set the early-stopping sensitivity. A sweep counts as stalled
    /// when this fraction of the current validation error still exceeds
    /// the best error seen; `0` never stops early.
    ///
    /// Defaults to `1.0` if not set
    pub fn stop_early_error_fraction(mut self, fraction: F) -> Self {
        self.0.stop_early_error_fraction = fraction;
        self
    }

    /// Set the maximum number of iterations for a single grid point.
    ///
    /// Defaults to `5000` if not set
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.0.max_iterations = max_iterations;
        self
    }

    /// Set the duality gap threshold below which a grid point counts as
    /// converged.
    ///
    /// Defaults to `1e-4` if not set
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Keep the full `(lambda, alpha)` grid in the fit outcome instead
    /// of only the best lambda per alpha.
    /// Defaults to `false` if not set.
    pub fn retain_full_path(mut self, retain_full_path: bool) -> Self {
        self.0.retain_full_path = retain_full_path;
        self
    }
}

impl<F: Float> Default for GlmParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> ParamGuard for GlmParams<F> {
    type Checked = GlmValidParams<F>;
    type Error = Error;

    /// Validate the hyper parameters
    fn check_ref(&self) -> Result<&Self::Checked> {
        let ratio = self.0.lambda_min_ratio;
        if !ratio.is_finite() || ratio <= F::zero() || ratio >= F::one() {
            Err(Error::InvalidLambdaMinRatio(ratio.to_f64().unwrap()))
        } else if self.0.n_lambdas == 0 {
            Err(Error::InvalidLambdaCount)
        } else if self.0.n_folds == 0 {
            Err(Error::InvalidFoldCount)
        } else if self.0.n_alphas == 0 {
            Err(Error::InvalidAlphaCount)
        } else if !(F::zero()..=F::one()).contains(&self.0.stop_early_error_fraction) {
            Err(Error::InvalidStopFraction(
                self.0.stop_early_error_fraction.to_f64().unwrap(),
            ))
        } else if self.0.max_iterations == 0 {
            Err(Error::InvalidMaxIterations)
        } else if !self.0.tolerance.is_finite() || self.0.tolerance.is_negative() {
            Err(Error::InvalidTolerance(self.0.tolerance.to_f64().unwrap()))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
