//! Coordinate descent kernel
//!
//! Solves a single `(alpha, lambda)` grid point on one data shard by
//! cyclic coordinate descent with soft-thresholding. Convergence is
//! certified through the duality gap; when early stopping is enabled
//! the kernel additionally watches the validation error every sweep and
//! gives up once it stalls.

use approx::{abs_diff_eq, abs_diff_ne};
use ndarray::{s, Array1, ArrayView1, ArrayView2, Axis};

use crate::dataset::Float;
use crate::metrics::Regression;

/// Consecutive stalled sweeps after which a kernel stops early
const STALL_WINDOW: u32 = 5;

pub(crate) struct CdControls<F> {
    pub tolerance: F,
    pub max_iterations: u32,
    pub stop_early: bool,
    pub stop_early_error_fraction: F,
}

pub(crate) struct CdOutcome<F> {
    pub n_steps: u32,
    pub gap: F,
    pub train_mse: F,
    pub valid_mse: F,
    pub objective: F,
}

/// Optimize one grid point, warm-starting from the coefficients in `w`
///
/// `x` and `y` are the prepared training shard, `valid_x`/`valid_y` the
/// rows the validation error is measured on (in the same column space).
/// On return `w` holds the solution for this grid point and seeds the
/// next point on the path.
#[allow(clippy::too_many_arguments)]
pub(crate) fn coordinate_descent<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<F>,
    valid_x: ArrayView2<F>,
    valid_y: ArrayView1<F>,
    w: &mut Array1<F>,
    l1_ratio: F,
    penalty: F,
    controls: &CdControls<F>,
) -> CdOutcome<F> {
    let n_samples = F::cast(x.nrows());
    let n_features = x.ncols();
    // the residuals `y - X*w`, updated as the coefficients change
    let mut r = &y - &x.dot(w);
    let norm_cols_x = x.map_axis(Axis(0), |col| col.dot(&col));
    let mut gap = F::one() + controls.tolerance;
    let d_w_tol = controls.tolerance;
    let tol = controls.tolerance * y.dot(&y);
    let mut n_steps = 0u32;
    let mut valid_mse = F::infinity();
    let mut best_valid = F::infinity();
    let mut stalled = 0u32;

    while n_steps < controls.max_iterations {
        let mut w_max = F::zero();
        let mut d_w_max = F::zero();
        for ii in 0..n_features {
            if abs_diff_eq!(norm_cols_x[ii], F::zero()) {
                continue;
            }
            let w_ii = w[ii];
            let x_slc: ArrayView1<F> = x.slice(s![.., ii]);
            if abs_diff_ne!(w_ii, F::zero()) {
                r += &(&x_slc * w_ii);
            }
            let tmp: F = x_slc.dot(&r);
            w[ii] = tmp.signum() * F::max(tmp.abs() - n_samples * l1_ratio * penalty, F::zero())
                / (norm_cols_x[ii] + n_samples * (F::one() - l1_ratio) * penalty);
            if abs_diff_ne!(w[ii], F::zero()) {
                r -= &(&x_slc * w[ii]);
            }
            let d_w_ii = (w[ii] - w_ii).abs();
            d_w_max = F::max(d_w_max, d_w_ii);
            w_max = F::max(w_max, w[ii].abs());
        }
        n_steps += 1;

        if controls.stop_early {
            valid_mse = valid_x.dot(w).mean_squared_error(valid_y);
            if controls.stop_early_error_fraction * valid_mse > best_valid {
                stalled += 1;
            } else {
                stalled = 0;
            }
            if valid_mse < best_valid {
                best_valid = valid_mse;
            }
            if stalled >= STALL_WINDOW {
                gap = duality_gap(x, y, w.view(), r.view(), l1_ratio, penalty);
                break;
            }
        }

        if n_steps == controls.max_iterations - 1
            || abs_diff_eq!(w_max, F::zero())
            || d_w_max / w_max < d_w_tol
        {
            // We've hit one potential stopping criteria
            // check duality gap for ultimate stopping criterion
            gap = duality_gap(x, y, w.view(), r.view(), l1_ratio, penalty);
            if gap < tol {
                break;
            }
        }
    }

    let train_mse = r.dot(&r) / n_samples;
    if !controls.stop_early {
        valid_mse = valid_x.dot(w).mean_squared_error(valid_y);
    }
    let wv = w.view();
    let l1_norm = wv.fold(F::zero(), |sum, w_i| sum + w_i.abs());
    let l2_norm2 = wv.dot(&wv);
    let half = F::cast(0.5);
    let objective = half * train_mse
        + penalty * (l1_ratio * l1_norm + half * (F::one() - l1_ratio) * l2_norm2);

    CdOutcome {
        n_steps,
        gap,
        train_mse,
        valid_mse,
        objective,
    }
}

fn duality_gap<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<F>,
    w: ArrayView1<F>,
    r: ArrayView1<F>,
    l1_ratio: F,
    penalty: F,
) -> F {
    let half = F::cast(0.5);
    let n_samples = F::cast(x.nrows());
    let l1_reg = l1_ratio * penalty * n_samples;
    let l2_reg = (F::one() - l1_ratio) * penalty * n_samples;
    let xta = x.t().dot(&r) - &w * l2_reg;

    let dual_norm_xta = xta.fold(F::zero(), |abs_max, &x| abs_max.max(x.abs()));
    let r_norm2 = r.dot(&r);
    let w_norm2 = w.dot(&w);
    let (const_, mut gap) = if dual_norm_xta > l1_reg {
        let const_ = l1_reg / dual_norm_xta;
        let a_norm2 = r_norm2 * const_ * const_;
        (const_, half * (r_norm2 + a_norm2))
    } else {
        (F::one(), r_norm2)
    };
    let l1_norm = w.fold(F::zero(), |sum, w_i| sum + w_i.abs());
    gap += l1_reg * l1_norm - const_ * r.dot(&y)
        + half * l2_reg * (F::one() + const_ * const_) * w_norm2;
    gap
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};

    fn controls(max_iterations: u32) -> CdControls<f64> {
        CdControls {
            tolerance: 1e-6,
            max_iterations,
            stop_early: false,
            stop_early_error_fraction: 1.0,
        }
    }

    fn solve(
        x: &Array2<f64>,
        y: &Array1<f64>,
        l1_ratio: f64,
        penalty: f64,
        max_iterations: u32,
    ) -> (Array1<f64>, CdOutcome<f64>) {
        let mut w = Array1::zeros(x.ncols());
        let out = coordinate_descent(
            x.view(),
            y.view(),
            x.view(),
            y.view(),
            &mut w,
            l1_ratio,
            penalty,
            &controls(max_iterations),
        );
        (w, out)
    }

    fn elastic_net_objective(
        x: &Array2<f64>,
        y: &Array1<f64>,
        beta: &Array1<f64>,
        alpha: f64,
        lambda: f64,
    ) -> f64 {
        let resid = y - &x.dot(beta);
        let loss = resid.dot(&resid) / (2.0 * y.len() as f64);
        let penalty: f64 = beta
            .iter()
            .map(|b| (1.0 - alpha) / 2.0 * b * b + alpha * b.abs())
            .sum();
        loss + lambda * penalty
    }

    #[test]
    fn coordinate_descent_lowers_objective() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![1.0, -1.0];
        let start = elastic_net_objective(&x, &y, &Array1::zeros(2), 0.8, 0.001);
        let (w, _) = solve(&x, &y, 0.8, 0.001, 3);
        let end = elastic_net_objective(&x, &y, &w, 0.8, 0.001);
        assert!(start > end);
    }

    #[test]
    fn lasso_toy_example_works() {
        // Known soft-thresholding values on a 1d toy problem; compare
        // against glmnet keeping in mind that it divides the penalty by
        // n_samples.
        let x = array![[-1.0], [0.0], [1.0]];
        let y = array![-1.0, 0.0, 1.0];

        let (w, out) = solve(&x, &y, 1.0, 1e-8, 1000);
        assert_abs_diff_eq!(w, array![1.0], epsilon = 1e-6);
        assert_abs_diff_eq!(out.gap, 0.0, epsilon = 1e-12);

        let (w, _) = solve(&x, &y, 1.0, 0.1, 1000);
        assert_abs_diff_eq!(w, array![0.85], epsilon = 1e-6);

        let (w, _) = solve(&x, &y, 1.0, 0.5, 1000);
        assert_abs_diff_eq!(w, array![0.25], epsilon = 1e-6);

        let (w, _) = solve(&x, &y, 1.0, 1.0, 1000);
        assert_abs_diff_eq!(w, array![0.0], epsilon = 1e-6);
    }

    #[test]
    fn elastic_net_toy_example_works() {
        let x = array![[-1.0], [0.0], [1.0]];
        let y = array![-1.0, 0.0, 1.0];

        let (w, _) = solve(&x, &y, 0.3, 0.5, 1000);
        assert_abs_diff_eq!(w, array![0.50819], epsilon = 1e-3);

        let (w, _) = solve(&x, &y, 0.5, 0.5, 1000);
        assert_abs_diff_eq!(w, array![0.45454], epsilon = 1e-3);
    }

    #[test]
    fn zero_column_stays_zero() {
        let x = array![[0.0, 1.0], [0.0, -1.0], [0.0, 0.5]];
        let y = array![1.0, -1.0, 0.5];
        let (w, _) = solve(&x, &y, 1.0, 0.01, 1000);
        assert_abs_diff_eq!(w[0], 0.0);
        assert!(w[1] > 0.0);
    }

    #[test]
    fn warm_start_reaches_the_same_solution() {
        let x = array![[-1.0, 0.3], [0.0, -0.1], [1.0, 0.8]];
        let y = array![-1.0, 0.0, 1.0];

        let (cold, _) = solve(&x, &y, 1.0, 0.1, 1000);

        let mut warm = array![0.9, 0.1];
        coordinate_descent(
            x.view(),
            y.view(),
            x.view(),
            y.view(),
            &mut warm,
            1.0,
            0.1,
            &controls(1000),
        );
        assert_abs_diff_eq!(warm, cold, epsilon = 1e-5);
    }

    #[test]
    fn training_error_matches_residuals() {
        let x = array![[-1.0], [0.0], [1.0]];
        let y = array![-1.0, 0.0, 1.0];
        let (w, out) = solve(&x, &y, 1.0, 0.5, 1000);
        let resid = &y - &x.dot(&w);
        assert_abs_diff_eq!(out.train_mse, resid.dot(&resid) / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.valid_mse, out.train_mse, epsilon = 1e-12);
    }
}
