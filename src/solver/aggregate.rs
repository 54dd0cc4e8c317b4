//! Result aggregation
//!
//! Collects the reduced grid points into two layouts: the full path
//! over every `(lambda, alpha)` combination, kept only on request, and
//! the best model per alpha by validation error. All read accessors
//! return the full-path slot as an `Option` that is `None` unless
//! full-path retention was requested, alongside the always-present
//! best-per-alpha slot.

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use ndarray::{s, Array1, Array2, Array3, ArrayViewMut1};

use crate::dataset::Float;

/// Index of the training loss in [`PathPoint::errors`]
pub const ERR_TRAIN: usize = 0;
/// Index of the validation loss in [`PathPoint::errors`]
pub const ERR_VALID: usize = 1;
/// Index of the penalized objective in [`PathPoint::errors`]
pub const ERR_OBJECTIVE: usize = 2;

/// Number of trailing values after the coefficients in a tensor row
const TRAILING: usize = 7;

/// A single fitted grid point
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct PathPoint<F: Float> {
    /// Coefficients on the original feature scale
    pub coefficients: Array1<F>,
    pub intercept: F,
    /// Training loss, validation loss and penalized objective, indexed
    /// by [`ERR_TRAIN`], [`ERR_VALID`] and [`ERR_OBJECTIVE`]
    pub errors: [F; 3],
    pub lambda: F,
    pub alpha: F,
    /// Realized duality gap when the kernel terminated
    pub tolerance: F,
}

/// The outcome of a path fit
///
/// Flat tensor exports preserve the row layout
/// `[coefficients.., intercept, err_train, err_valid, err_objective,
/// lambda, alpha, tolerance]`.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome<F: Float> {
    n_features: usize,
    n_lambdas: usize,
    n_alphas: usize,
    /// lambda-major: index `lambda_idx * n_alphas + alpha_idx`
    full: Option<Vec<PathPoint<F>>>,
    best: Vec<PathPoint<F>>,
}

impl<F: Float> FitOutcome<F> {
    /// Select the best lambda per alpha and optionally retain the whole
    /// grid. On equal validation error the larger lambda wins, giving
    /// the sparser model; non-finite errors never win.
    pub(crate) fn build(
        points: Vec<PathPoint<F>>,
        n_lambdas: usize,
        n_alphas: usize,
        n_features: usize,
        retain_full: bool,
    ) -> Self {
        let mut best = Vec::with_capacity(n_alphas);
        for a in 0..n_alphas {
            let mut best_idx = 0;
            let mut best_err = F::infinity();
            for l in 0..n_lambdas {
                let err = points[l * n_alphas + a].errors[ERR_VALID];
                // lambdas descend along the path, so a strict
                // comparison keeps the largest lambda on ties
                if err.is_finite() && err < best_err {
                    best_err = err;
                    best_idx = l;
                }
            }
            best.push(points[best_idx * n_alphas + a].clone());
        }

        let full = if retain_full { Some(points) } else { None };
        FitOutcome {
            n_features,
            n_lambdas,
            n_alphas,
            full,
            best,
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_lambdas(&self) -> usize {
        self.n_lambdas
    }

    pub fn n_alphas(&self) -> usize {
        self.n_alphas
    }

    pub fn has_full_path(&self) -> bool {
        self.full.is_some()
    }

    /// Best grid point per alpha, in alpha order
    pub fn best(&self) -> &[PathPoint<F>] {
        &self.best
    }

    /// Every grid point in lambda-major order, when retained
    pub fn full(&self) -> Option<&[PathPoint<F>]> {
        self.full.as_deref()
    }

    /// A single retained grid point
    pub fn point(&self, lambda_idx: usize, alpha_idx: usize) -> Option<&PathPoint<F>> {
        if lambda_idx >= self.n_lambdas || alpha_idx >= self.n_alphas {
            return None;
        }
        self.full
            .as_ref()
            .map(|points| &points[lambda_idx * self.n_alphas + alpha_idx])
    }

    /// Coefficient grids, `(n_lambdas, n_alphas, n_features)` and
    /// `(n_alphas, n_features)`
    pub fn coefficients(&self) -> (Option<Array3<F>>, Array2<F>) {
        let full = self.full.as_ref().map(|points| {
            Array3::from_shape_fn(
                (self.n_lambdas, self.n_alphas, self.n_features),
                |(l, a, j)| points[l * self.n_alphas + a].coefficients[j],
            )
        });
        let best = Array2::from_shape_fn((self.n_alphas, self.n_features), |(a, j)| {
            self.best[a].coefficients[j]
        });
        (full, best)
    }

    pub fn intercepts(&self) -> (Option<Array2<F>>, Array1<F>) {
        (
            self.full_field(|p| p.intercept),
            self.best_field(|p| p.intercept),
        )
    }

    /// Error grids, `(n_lambdas, n_alphas, 3)` and `(n_alphas, 3)`
    pub fn errors(&self) -> (Option<Array3<F>>, Array2<F>) {
        let full = self.full.as_ref().map(|points| {
            Array3::from_shape_fn((self.n_lambdas, self.n_alphas, 3), |(l, a, e)| {
                points[l * self.n_alphas + a].errors[e]
            })
        });
        let best = Array2::from_shape_fn((self.n_alphas, 3), |(a, e)| self.best[a].errors[e]);
        (full, best)
    }

    pub fn lambdas(&self) -> (Option<Array2<F>>, Array1<F>) {
        (self.full_field(|p| p.lambda), self.best_field(|p| p.lambda))
    }

    pub fn alphas(&self) -> (Option<Array2<F>>, Array1<F>) {
        (self.full_field(|p| p.alpha), self.best_field(|p| p.alpha))
    }

    pub fn tolerances(&self) -> (Option<Array2<F>>, Array1<F>) {
        (
            self.full_field(|p| p.tolerance),
            self.best_field(|p| p.tolerance),
        )
    }

    /// Flat export of the full path, `(n_lambdas, n_alphas,
    /// n_features + 7)`
    pub fn full_tensor(&self) -> Option<Array3<F>> {
        self.full.as_ref().map(|points| {
            let mut out = Array3::zeros((
                self.n_lambdas,
                self.n_alphas,
                self.n_features + TRAILING,
            ));
            for l in 0..self.n_lambdas {
                for a in 0..self.n_alphas {
                    write_row(&points[l * self.n_alphas + a], out.slice_mut(s![l, a, ..]));
                }
            }
            out
        })
    }

    /// Flat export of the best models, `(n_alphas, n_features + 7)`
    pub fn best_tensor(&self) -> Array2<F> {
        let mut out = Array2::zeros((self.n_alphas, self.n_features + TRAILING));
        for (a, point) in self.best.iter().enumerate() {
            write_row(point, out.row_mut(a));
        }
        out
    }

    fn full_field<G: Fn(&PathPoint<F>) -> F>(&self, get: G) -> Option<Array2<F>> {
        self.full.as_ref().map(|points| {
            Array2::from_shape_fn((self.n_lambdas, self.n_alphas), |(l, a)| {
                get(&points[l * self.n_alphas + a])
            })
        })
    }

    fn best_field<G: Fn(&PathPoint<F>) -> F>(&self, get: G) -> Array1<F> {
        Array1::from_shape_fn(self.n_alphas, |a| get(&self.best[a]))
    }
}

fn write_row<F: Float>(point: &PathPoint<F>, mut row: ArrayViewMut1<F>) {
    let n = point.coefficients.len();
    row.slice_mut(s![..n]).assign(&point.coefficients);
    row[n] = point.intercept;
    row[n + 1] = point.errors[ERR_TRAIN];
    row[n + 2] = point.errors[ERR_VALID];
    row[n + 3] = point.errors[ERR_OBJECTIVE];
    row[n + 4] = point.lambda;
    row[n + 5] = point.alpha;
    row[n + 6] = point.tolerance;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn point(lambda: f64, alpha: f64, valid_err: f64) -> PathPoint<f64> {
        PathPoint {
            coefficients: array![lambda, alpha],
            intercept: 0.5,
            errors: [0.1, valid_err, 0.2],
            lambda,
            alpha,
            tolerance: 1e-5,
        }
    }

    // 2 lambdas x 2 alphas, lambda-major
    fn grid(errs: [f64; 4]) -> Vec<PathPoint<f64>> {
        vec![
            point(1.0, 0.0, errs[0]),
            point(1.0, 1.0, errs[1]),
            point(0.1, 0.0, errs[2]),
            point(0.1, 1.0, errs[3]),
        ]
    }

    #[test]
    fn best_minimizes_validation_error() {
        let outcome = FitOutcome::build(grid([0.4, 0.3, 0.2, 0.5]), 2, 2, 2, false);
        assert_abs_diff_eq!(outcome.best()[0].lambda, 0.1);
        assert_abs_diff_eq!(outcome.best()[1].lambda, 1.0);
    }

    #[test]
    fn ties_prefer_the_larger_lambda() {
        let outcome = FitOutcome::build(grid([0.3, 0.3, 0.3, 0.3]), 2, 2, 2, false);
        assert_abs_diff_eq!(outcome.best()[0].lambda, 1.0);
        assert_abs_diff_eq!(outcome.best()[1].lambda, 1.0);
    }

    #[test]
    fn non_finite_errors_never_win() {
        let outcome = FitOutcome::build(grid([f64::NAN, 0.3, 0.2, f64::INFINITY]), 2, 2, 2, false);
        assert_abs_diff_eq!(outcome.best()[0].lambda, 0.1);
        assert_abs_diff_eq!(outcome.best()[1].lambda, 1.0);
    }

    #[test]
    fn full_slots_are_absent_without_retention() {
        let outcome = FitOutcome::build(grid([0.4, 0.3, 0.2, 0.5]), 2, 2, 2, false);
        assert!(!outcome.has_full_path());
        assert!(outcome.full().is_none());
        assert!(outcome.full_tensor().is_none());
        assert!(outcome.coefficients().0.is_none());
        assert!(outcome.lambdas().0.is_none());
        assert_eq!(outcome.lambdas().1.len(), 2);
        assert!(outcome.point(0, 0).is_none());
    }

    #[test]
    fn tensors_follow_the_documented_layout() {
        let outcome = FitOutcome::build(grid([0.4, 0.3, 0.2, 0.5]), 2, 2, 2, true);
        let full = outcome.full_tensor().unwrap();
        assert_eq!(full.shape(), &[2, 2, 2 + 7]);

        // row for lambda index 1, alpha index 0
        let row = full.slice(s![1_usize, 0_usize, ..]);
        assert_abs_diff_eq!(row[0], 0.1); // first coefficient
        assert_abs_diff_eq!(row[2], 0.5); // intercept
        assert_abs_diff_eq!(row[3], 0.1); // training loss
        assert_abs_diff_eq!(row[4], 0.2); // validation loss
        assert_abs_diff_eq!(row[6], 0.1); // lambda
        assert_abs_diff_eq!(row[7], 0.0); // alpha

        let best = outcome.best_tensor();
        assert_eq!(best.shape(), &[2, 2 + 7]);
    }

    #[test]
    fn best_rows_equal_their_full_path_rows() {
        let errs = [0.4, 0.3, 0.2, 0.5];
        let outcome = FitOutcome::build(grid(errs), 2, 2, 2, true);
        let full = outcome.full().unwrap();
        // alpha 0 minimized at lambda index 1, alpha 1 at lambda index 0
        assert_eq!(&outcome.best()[0], &full[1 * 2 + 0]);
        assert_eq!(&outcome.best()[1], &full[0 * 2 + 1]);
    }
}
