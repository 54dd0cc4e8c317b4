//! Regression metrics used by the kernel and for model evaluation

use ndarray::{ArrayBase, ArrayView1, Data, Ix1};

use crate::dataset::Float;

/// Comparison metrics for continuous variables
///
/// To evaluate the accuracy of a prediction, use
/// ```ignore
/// prediction.r2(truth.view())
/// ```
pub trait Regression<F: Float> {
    /// Mean squared error between two continuous variables
    fn mean_squared_error(&self, compare_to: ArrayView1<F>) -> F;
    /// R squared coefficient, the proportion of the variance in the
    /// dependent variable that is predictable from the independent
    /// variable
    fn r2(&self, compare_to: ArrayView1<F>) -> F;
}

impl<F: Float, D: Data<Elem = F>> Regression<F> for ArrayBase<D, Ix1> {
    fn mean_squared_error(&self, compare_to: ArrayView1<F>) -> F {
        assert_eq!(self.len(), compare_to.len());

        let sum = self
            .iter()
            .zip(compare_to.iter())
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum::<F>();
        sum / F::cast(self.len())
    }

    fn r2(&self, compare_to: ArrayView1<F>) -> F {
        assert_eq!(self.len(), compare_to.len());

        let mean = compare_to.iter().copied().sum::<F>() / F::cast(compare_to.len());
        let ss_res = self
            .iter()
            .zip(compare_to.iter())
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum::<F>();
        let ss_tot = compare_to
            .iter()
            .map(|&y| (y - mean) * (y - mean))
            .sum::<F>();

        F::one() - ss_res / (ss_tot + F::cast(1e-10))
    }
}
