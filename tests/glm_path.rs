// tests/glm_path.rs

use approx::assert_abs_diff_eq;
use ndarray::{array, Array, Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

use elnet_path::{
    DynDataset, Error, GlmDataset, GlmSolver, HostMatrix, HostVector, ERR_VALID,
};

const W_TRUE: [f64; 5] = [1.5, -2.0, 0.0, 0.75, 0.0];

fn random_matrix(rows: usize, seed: u64) -> Array2<f64> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    Array::random_using((rows, W_TRUE.len()), Uniform::new(-1.0, 1.0), &mut rng)
}

fn exact_problem(rows: usize, seed: u64, intercept: f64) -> (Array2<f64>, Array1<f64>) {
    let x = random_matrix(rows, seed);
    let y = x.dot(&Array1::from(W_TRUE.to_vec())) + intercept;
    (x, y)
}

fn noisy_problem(rows: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let (x, y) = exact_problem(rows, seed, 0.3);
    let mut rng = Xoshiro256Plus::seed_from_u64(seed ^ 0xdead);
    let noise = Array::random_using(rows, Uniform::new(-0.3, 0.3), &mut rng);
    (x, y + noise)
}

#[test]
fn fit_and_predict_are_deterministic() {
    let run = || {
        let (x, y) = noisy_problem(40, 7);
        let mut solver = GlmSolver::new(
            GlmSolver::params()
                .n_alphas(3)
                .n_lambdas(10)
                .retain_full_path(true),
        )
        .unwrap();
        solver
            .upload(GlmDataset::new(x.clone(), y).unwrap())
            .unwrap();
        let best = solver.fit().unwrap().best_tensor();
        let preds = solver.predict().unwrap().best().clone();
        (best, preds)
    };

    let (best_a, preds_a) = run();
    let (best_b, preds_b) = run();
    assert_eq!(best_a, best_b);
    assert_eq!(preds_a, preds_b);
}

#[test]
fn upload_release_upload_leaves_no_state_behind() {
    let (x, y) = noisy_problem(30, 11);
    let mut solver = GlmSolver::new(GlmSolver::params().n_lambdas(8)).unwrap();

    solver
        .upload(GlmDataset::new(x.clone(), y.clone()).unwrap())
        .unwrap();
    let first = solver.fit().unwrap().best_tensor();

    solver.release();
    solver.upload(GlmDataset::new(x, y).unwrap()).unwrap();
    let second = solver.fit().unwrap().best_tensor();

    assert_eq!(first, second);
}

#[test]
fn small_lambda_lasso_approaches_least_squares() {
    let (x, y) = exact_problem(50, 3, 2.0);
    let mut solver = GlmSolver::new(
        GlmSolver::params()
            .n_alphas(3)
            .n_lambdas(40)
            .lambda_min_ratio(1e-7)
            .stop_early(false)
            .tolerance(1e-10)
            .max_iterations(20_000)
            .retain_full_path(true),
    )
    .unwrap();
    solver.upload(GlmDataset::new(x, y).unwrap()).unwrap();
    let fit = solver.fit().unwrap();

    // alpha grid is [0.0, 0.5, 1.0]; the pure-L1 path at its smallest
    // lambda reproduces the least-squares solution of the exact system
    let point = fit.point(39, 2).unwrap();
    assert_abs_diff_eq!(point.alpha, 1.0);
    assert_abs_diff_eq!(
        point.coefficients,
        Array1::from(W_TRUE.to_vec()),
        epsilon = 1e-3
    );
    assert_abs_diff_eq!(point.intercept, 2.0, epsilon = 1e-3);
}

#[test]
fn path_head_shrinks_all_coefficients_to_zero() {
    let (x, y) = noisy_problem(40, 19);
    let mut solver = GlmSolver::new(
        GlmSolver::params()
            .n_alphas(3)
            .n_lambdas(10)
            .retain_full_path(true),
    )
    .unwrap();
    solver.upload(GlmDataset::new(x, y).unwrap()).unwrap();
    let fit = solver.fit().unwrap();

    // every alpha > 0 starts from the all-zero model
    for alpha_idx in 1..3 {
        let head = fit.point(0, alpha_idx).unwrap();
        assert!(head.alpha > 0.0);
        assert_abs_diff_eq!(
            head.coefficients,
            Array1::zeros(W_TRUE.len()),
            epsilon = 1e-8
        );
    }
}

#[test]
fn column_mismatch_fails_with_shape_error() {
    // train has 5 columns, validation only 4
    let (x, y) = noisy_problem(20, 23);
    let valid_x = Array2::<f64>::zeros((10, 4));
    let valid_y = Array1::<f64>::zeros(10);

    let res = GlmDataset::new(x, y)
        .unwrap()
        .with_validation(valid_x, valid_y);
    assert!(matches!(
        res,
        Err(Error::ShapeMismatch {
            dimension: "columns",
            left_len: 5,
            right_len: 4,
            ..
        })
    ));
}

#[test]
fn best_per_alpha_matches_the_full_path() {
    let (x, y) = noisy_problem(40, 29);
    let (vx, vy) = noisy_problem(20, 31);
    let mut solver = GlmSolver::new(
        GlmSolver::params()
            .n_alphas(3)
            .n_lambdas(10)
            .retain_full_path(true),
    )
    .unwrap();
    solver
        .upload(
            GlmDataset::new(x, y)
                .unwrap()
                .with_validation(vx, vy)
                .unwrap(),
        )
        .unwrap();
    let fit = solver.fit().unwrap();

    assert_eq!(fit.best().len(), 3);
    let full = fit.full().unwrap();
    let (full_errors, _) = fit.errors();
    let full_errors = full_errors.unwrap();

    for alpha_idx in 0..3 {
        let mut best_idx = 0;
        let mut best_err = f64::INFINITY;
        for lambda_idx in 0..10 {
            let err = full_errors[[lambda_idx, alpha_idx, ERR_VALID]];
            if err < best_err {
                best_err = err;
                best_idx = lambda_idx;
            }
        }
        assert_eq!(&fit.best()[alpha_idx], &full[best_idx * 3 + alpha_idx]);
    }
}

#[test]
fn mixed_precision_inputs_are_rejected() {
    let res = DynDataset::from_host(
        HostMatrix::from(Array2::<f32>::zeros((4, 2))),
        HostVector::from(Array1::<f64>::zeros(4)),
        None,
        None,
        None,
    );
    assert!(matches!(res, Err(Error::PrecisionMismatch { .. })));
}

#[test]
fn weighted_rows_match_duplicated_rows() {
    let x = array![[1.0, 0.5], [-1.0, 0.25], [0.5, -1.0]];
    let y = array![1.0, -0.5, 0.25];
    // duplicating the first row equals giving it twice the weight
    let xd = x.select(Axis(0), &[0, 0, 1, 2]);
    let yd = y.select(Axis(0), &[0, 0, 1, 2]);

    let params = || {
        GlmSolver::params()
            .n_lambdas(10)
            .stop_early(false)
            .tolerance(1e-10)
            .max_iterations(20_000)
    };

    let mut weighted = GlmSolver::new(params()).unwrap();
    weighted
        .upload(
            GlmDataset::new(x, y)
                .unwrap()
                .with_weights(array![2.0, 1.0, 1.0])
                .unwrap(),
        )
        .unwrap();
    let weighted_fit = weighted.fit().unwrap();

    let mut duplicated = GlmSolver::new(params()).unwrap();
    duplicated
        .upload(GlmDataset::new(xd, yd).unwrap())
        .unwrap();
    let duplicated_fit = duplicated.fit().unwrap();

    let (_, weighted_best) = weighted_fit.coefficients();
    let (_, duplicated_best) = duplicated_fit.coefficients();
    assert_abs_diff_eq!(weighted_best, duplicated_best, epsilon = 1e-8);
}

#[test]
fn standardized_fit_recovers_badly_scaled_columns() {
    let mut x = random_matrix(60, 41);
    // blow the column scales apart
    x.column_mut(0).mapv_inplace(|e| e * 1000.0);
    x.column_mut(3).mapv_inplace(|e| e * 0.001);
    let w = array![0.002, -1.0, 0.0, 400.0, 1.0];
    let y = x.dot(&w) + 0.5;

    let mut solver = GlmSolver::new(
        GlmSolver::params()
            .n_alphas(3)
            .n_lambdas(40)
            .standardize(true)
            .stop_early(false)
            .tolerance(1e-12)
            .max_iterations(100_000)
            .retain_full_path(true),
    )
    .unwrap();
    solver.upload(GlmDataset::new(x, y).unwrap()).unwrap();
    let fit = solver.fit().unwrap();

    let point = fit.point(39, 2).unwrap();
    for (&found, &expected) in point.coefficients.iter().zip(w.iter()) {
        assert!(
            (found - expected).abs() <= 1e-3 * (1.0 + expected.abs()),
            "coefficient {} too far from {}",
            found,
            expected
        );
    }
    assert_abs_diff_eq!(point.intercept, 0.5, epsilon = 1e-2);
}

#[test]
fn predictions_match_manual_scores() {
    let (x, y) = noisy_problem(30, 47);
    let mut solver = GlmSolver::new(GlmSolver::params().n_alphas(2).n_lambdas(8)).unwrap();
    solver
        .upload(GlmDataset::new(x.clone(), y).unwrap())
        .unwrap();
    solver.fit().unwrap();

    let manual: Vec<Array1<f64>> = solver
        .fitted()
        .unwrap()
        .best()
        .iter()
        .map(|point| x.dot(&point.coefficients) + point.intercept)
        .collect();

    let preds = solver.predict().unwrap();
    assert_eq!(preds.best().shape(), &[2, 30]);
    assert!(preds.full().is_none());
    for (a, scores) in manual.iter().enumerate() {
        assert_abs_diff_eq!(&preds.best().row(a), &scores.view(), epsilon = 1e-12);
    }
}

#[test]
fn cross_validation_runs_and_keeps_the_grid_shape() {
    let (x, y) = noisy_problem(36, 53);
    let mut solver = GlmSolver::new(
        GlmSolver::params()
            .n_folds(4)
            .n_alphas(2)
            .n_lambdas(6)
            .retain_full_path(true),
    )
    .unwrap();
    solver.upload(GlmDataset::new(x, y).unwrap()).unwrap();
    let fit = solver.fit().unwrap();

    assert_eq!(fit.n_lambdas(), 6);
    assert_eq!(fit.n_alphas(), 2);
    assert_eq!(fit.full().unwrap().len(), 12);
    let (_, best_errors) = fit.errors();
    assert!(best_errors.iter().all(|e| e.is_finite()));
}
