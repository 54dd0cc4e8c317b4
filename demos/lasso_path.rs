use ndarray::{s, Array, Array1};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

use elnet_path::{ComputeBackend, GlmDataset, GlmSolver, Regression, Result, ERR_VALID};
use num_traits::Float;

fn main() -> Result<()> {
    // synthesize a sparse regression problem
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let x = Array::random_using((120, 20), Uniform::new(-1., 1.), &mut rng);
    let mut w = Array1::zeros(20);
    w[0] = 2.5;
    w[3] = -1.0;
    w[11] = 0.5;
    let noise = Array::random_using(120, Uniform::new(-0.1, 0.1), &mut rng);
    let y = x.dot(&w) + noise + 0.7;

    // hold the last rows out for validation
    let dataset = GlmDataset::new(
        x.slice(s![..100, ..]).to_owned(),
        y.slice(s![..100]).to_owned(),
    )?
    .with_validation(
        x.slice(s![100.., ..]).to_owned(),
        y.slice(s![100..]).to_owned(),
    )?;

    let mut solver = GlmSolver::new(
        GlmSolver::params()
            .n_alphas(5)
            .n_lambdas(50)
            .retain_full_path(true),
    )?;
    solver.upload(dataset)?;
    let fit = solver.fit()?.clone();

    println!(
        "fitted {} grid points on the {} backend",
        fit.n_lambdas() * fit.n_alphas(),
        solver.backend().label()
    );
    for point in fit.best() {
        let nonzero = point
            .coefficients
            .iter()
            .filter(|c| c.abs() > 1e-6)
            .count();
        println!(
            "alpha {:.2}: best lambda {:.5}, validation mse {:.5}, {} nonzero coefficients",
            point.alpha,
            point.lambda,
            point.errors[ERR_VALID],
            nonzero
        );
    }

    let predictions = solver.predict()?;
    println!(
        "r2 of the pure-lasso model on the held-out rows: {:.4}",
        predictions.best().row(4).r2(y.slice(s![100..]))
    );

    Ok(())
}
