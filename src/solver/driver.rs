//! Parameter grid driver
//!
//! Expands the hyper-parameters into an `(alpha, lambda)` grid,
//! partitions the training rows into folds, prepares one data shard per
//! fold and dispatches `(fold, alpha)` work units over the compute
//! backend. Each unit walks the whole descending lambda path so the
//! kernel can warm-start from one grid point to the next. After the
//! barrier the fold results are reduced per grid point and handed to
//! the aggregator.

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

use crate::backend::ComputeBackend;
use crate::dataset::{Float, GlmDataset};
use crate::error::{Error, Result};
use crate::hyperparams::GlmValidParams;
use crate::solver::aggregate::{FitOutcome, PathPoint};
use crate::solver::cd::{coordinate_descent, CdControls};

/// A data shard ready for the kernel: centered, optionally rescaled to
/// unit variance, with observation weights folded into the loss rows.
/// The validation rows live in the same column space, so residuals
/// against them equal original-unit residuals.
pub(crate) struct PreparedShard<F> {
    x: Array2<F>,
    y: Array1<F>,
    vx: Array2<F>,
    vy: Array1<F>,
    x_mean: Array1<F>,
    x_scale: Array1<F>,
    y_mean: F,
}

struct PathTask<F: Float> {
    alpha_idx: usize,
    shard: Arc<PreparedShard<F>>,
}

struct RawPoint<F> {
    coefficients: Array1<F>,
    intercept: F,
    lambda: F,
    train_mse: F,
    valid_mse: F,
    objective: F,
    gap: F,
}

struct TaskResult<F> {
    alpha_idx: usize,
    points: Vec<RawPoint<F>>,
}

pub(crate) fn fit_path<F: Float, B: ComputeBackend>(
    params: &GlmValidParams<F>,
    backend: &B,
    data: &GlmDataset<F>,
) -> Result<FitOutcome<F>> {
    let n_features = data.n_features();
    let n_train = data.n_train();
    let n_folds = params.n_folds().min(n_train);

    // the full-data shard drives the lambda path and doubles as the
    // holdout shard when cross-validation is off
    let (vx, vy) = match data.valid() {
        Some((vx, vy)) => (vx.view(), vy.view()),
        None => (data.train_x().view(), data.train_y().view()),
    };
    let full_shard = prepare_shard(
        data.train_x().view(),
        data.train_y().view(),
        data.weights().map(|w| w.view()),
        vx,
        vy,
        params.with_intercept(),
        params.standardize(),
    );

    let lambda_base = shard_lambda_max(&full_shard);
    let alphas = alpha_grid::<F>(params.n_alphas());

    let shards = if n_folds == 1 {
        vec![Arc::new(full_shard)]
    } else {
        fold_partition(n_train, n_folds)
            .into_iter()
            .map(|(train_rows, valid_rows)| {
                let tx = data.train_x().select(Axis(0), &train_rows);
                let ty = data.train_y().select(Axis(0), &train_rows);
                let tw = data.weights().map(|w| w.select(Axis(0), &train_rows));
                let fx = data.train_x().select(Axis(0), &valid_rows);
                let fy = data.train_y().select(Axis(0), &valid_rows);
                Arc::new(prepare_shard(
                    tx.view(),
                    ty.view(),
                    tw.as_ref().map(|w| w.view()),
                    fx.view(),
                    fy.view(),
                    params.with_intercept(),
                    params.standardize(),
                ))
            })
            .collect()
    };

    let mut tasks = Vec::with_capacity(shards.len() * alphas.len());
    for shard in &shards {
        for alpha_idx in 0..alphas.len() {
            tasks.push(PathTask {
                alpha_idx,
                shard: Arc::clone(shard),
            });
        }
    }

    let controls = CdControls {
        tolerance: params.tolerance(),
        max_iterations: params.max_iterations(),
        stop_early: params.stop_early(),
        stop_early_error_fraction: params.stop_early_error_fraction(),
    };

    let n_lambdas = params.n_lambdas();
    let lambda_min_ratio = params.lambda_min_ratio();
    let results = backend.execute(tasks, |_device, task| {
        solve_task(
            &task,
            &alphas,
            lambda_base,
            lambda_min_ratio,
            n_lambdas,
            &controls,
        )
    })?;

    let points = reduce(results, &alphas, n_lambdas, n_folds, n_features);
    Ok(FitOutcome::build(
        points,
        n_lambdas,
        alphas.len(),
        n_features,
        params.retain_full_path(),
    ))
}

/// Pure-ridge grid points keep a finite path head through this floor on
/// the mixing value
const ALPHA_FLOOR: f64 = 1e-3;

fn solve_task<F: Float>(
    task: &PathTask<F>,
    alphas: &[F],
    lambda_base: F,
    lambda_min_ratio: F,
    n_lambdas: usize,
    controls: &CdControls<F>,
) -> Result<TaskResult<F>> {
    let shard = task.shard.as_ref();
    let alpha = alphas[task.alpha_idx];
    // the path head scales inversely with alpha so that its first grid
    // point shrinks every coefficient to zero whenever alpha > 0
    let lambda_max = lambda_base / F::max(alpha, F::cast(ALPHA_FLOOR));
    let lambdas = lambda_path(lambda_max, lambda_min_ratio, n_lambdas);
    let mut w = Array1::zeros(shard.x.ncols());
    let mut points = Vec::with_capacity(lambdas.len());

    for &lambda in &lambdas {
        let out = coordinate_descent(
            shard.x.view(),
            shard.y.view(),
            shard.vx.view(),
            shard.vy.view(),
            &mut w,
            alpha,
            lambda,
            controls,
        );
        if !out.objective.is_finite() {
            return Err(Error::EngineFailure(format!(
                "non-finite objective at alpha={}, lambda={}",
                alpha, lambda
            )));
        }

        // back to the original feature scale
        let coefficients = &w / &shard.x_scale;
        let intercept = shard.y_mean - coefficients.dot(&shard.x_mean);
        points.push(RawPoint {
            coefficients,
            intercept,
            lambda,
            train_mse: out.train_mse,
            valid_mse: out.valid_mse,
            objective: out.objective,
            gap: out.gap,
        });
    }

    Ok(TaskResult {
        alpha_idx: task.alpha_idx,
        points,
    })
}

/// Mean over folds of every per-grid-point quantity, in lambda-major
/// order
fn reduce<F: Float>(
    results: Vec<TaskResult<F>>,
    alphas: &[F],
    n_lambdas: usize,
    n_folds: usize,
    n_features: usize,
) -> Vec<PathPoint<F>> {
    let n_alphas = alphas.len();
    let scale = F::one() / F::cast(n_folds);
    let mut points = Vec::with_capacity(n_lambdas * n_alphas);

    for l_idx in 0..n_lambdas {
        for (a_idx, &alpha) in alphas.iter().enumerate() {
            let mut coefficients = Array1::<F>::zeros(n_features);
            let mut intercept = F::zero();
            let mut errors = [F::zero(); 3];
            let mut tolerance = F::zero();

            for fold in 0..n_folds {
                let result = &results[fold * n_alphas + a_idx];
                debug_assert_eq!(result.alpha_idx, a_idx);
                let raw = &result.points[l_idx];
                coefficients += &raw.coefficients;
                intercept += raw.intercept;
                errors[0] += raw.train_mse;
                errors[1] += raw.valid_mse;
                errors[2] += raw.objective;
                tolerance += raw.gap;
            }

            coefficients *= scale;
            points.push(PathPoint {
                coefficients,
                intercept: intercept * scale,
                errors: [
                    errors[0] * scale,
                    errors[1] * scale,
                    errors[2] * scale,
                ],
                // the lambda grid is shared across folds
                lambda: results[a_idx].points[l_idx].lambda,
                alpha,
                tolerance: tolerance * scale,
            });
        }
    }

    points
}

/// Base of the lambda path, `max_j |x_j . y| / m` over the prepared
/// full-data shard; the head of the path for a mixing value `alpha` is
/// this base divided by `max(alpha, ALPHA_FLOOR)`
pub(crate) fn shard_lambda_max<F: Float>(shard: &PreparedShard<F>) -> F {
    let m = F::cast(shard.x.nrows());
    let lmax = shard
        .x
        .t()
        .dot(&shard.y)
        .fold(F::zero(), |acc, &g| acc.max(g.abs()))
        / m;
    if lmax > F::zero() {
        lmax
    } else {
        F::one()
    }
}

/// Geometric spacing from `lambda_max` down to
/// `lambda_max * lambda_min_ratio`
pub(crate) fn lambda_path<F: Float>(
    lambda_max: F,
    lambda_min_ratio: F,
    n_lambdas: usize,
) -> Vec<F> {
    if n_lambdas == 1 {
        return vec![lambda_max * lambda_min_ratio];
    }
    let log_max = lambda_max.ln();
    let log_min = (lambda_max * lambda_min_ratio).ln();
    (0..n_lambdas)
        .map(|i| {
            // keep the head exact so the first grid point sits at the
            // shrink-everything threshold
            if i == 0 {
                return lambda_max;
            }
            let t = F::cast(i) / F::cast(n_lambdas - 1);
            (log_max * (F::one() - t) + log_min * t).exp()
        })
        .collect()
}

/// Evenly spaced mixing values over `[0, 1]`, endpoints included; a
/// single alpha sits at the conventional elastic mix
pub(crate) fn alpha_grid<F: Float>(n_alphas: usize) -> Vec<F> {
    if n_alphas == 1 {
        return vec![F::cast(0.5)];
    }
    (0..n_alphas)
        .map(|i| F::cast(i) / F::cast(n_alphas - 1))
        .collect()
}

/// Contiguous fold blocks; block `b` validates on rows
/// `[b*n/k, (b+1)*n/k)` and trains on the rest
pub(crate) fn fold_partition(n_rows: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    (0..k)
        .map(|b| {
            let start = b * n_rows / k;
            let end = (b + 1) * n_rows / k;
            let valid = (start..end).collect();
            let train = (0..start).chain(end..n_rows).collect();
            (train, valid)
        })
        .collect()
}

pub(crate) fn prepare_shard<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<F>,
    weights: Option<ArrayView1<F>>,
    valid_x: ArrayView2<F>,
    valid_y: ArrayView1<F>,
    with_intercept: bool,
    standardize: bool,
) -> PreparedShard<F> {
    let m = F::cast(x.nrows());
    let mut x = x.to_owned();
    let mut y = y.to_owned();
    let mut vx = valid_x.to_owned();
    let mut vy = valid_y.to_owned();

    // normalized to mean one, so unit weights reproduce the unweighted
    // problem bit for bit
    let v = weights.map(|w| {
        let sum = w.sum();
        w.mapv(|wi| wi * m / sum)
    });

    let (x_mean, y_mean) = if with_intercept {
        let x_mean = match &v {
            Some(v) => x.t().dot(v) / m,
            None => x
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(x.ncols())),
        };
        let y_mean = match &v {
            Some(v) => y.dot(v) / m,
            None => y.sum() / m,
        };
        (x_mean, y_mean)
    } else {
        (Array1::zeros(x.ncols()), F::zero())
    };

    x -= &x_mean;
    y -= y_mean;
    vx -= &x_mean;
    vy -= y_mean;

    let x_scale = if standardize {
        // population variance of the centered columns
        let variance = match &v {
            Some(v) => {
                let mut acc = Array1::<F>::zeros(x.ncols());
                for (row, &vi) in x.rows().into_iter().zip(v.iter()) {
                    Zip::from(&mut acc).and(&row).for_each(|a, &e| *a += vi * e * e);
                }
                acc / m
            }
            None => x.map_axis(Axis(0), |col| col.dot(&col) / m),
        };
        // zero-variance columns are left unscaled
        let scale = variance.mapv(|var| {
            let sd = var.sqrt();
            if sd > F::zero() {
                sd
            } else {
                F::one()
            }
        });
        x /= &scale;
        vx /= &scale;
        scale
    } else {
        Array1::ones(x.ncols())
    };

    // fold the observation weights into the loss rows
    if let Some(v) = &v {
        for (mut row, &vi) in x.rows_mut().into_iter().zip(v.iter()) {
            let sq = vi.sqrt();
            row.mapv_inplace(|e| e * sq);
        }
        for (yi, &vi) in y.iter_mut().zip(v.iter()) {
            *yi *= vi.sqrt();
        }
    }

    PreparedShard {
        x,
        y,
        vx,
        vy,
        x_mean,
        x_scale,
        y_mean,
    }
}
