//! Dataset handling for the path solver
//!
//! This module implements the typed dataset consumed by the solver and
//! the precision boundary through which untyped host arrays enter it.

use ndarray::{Array1, Array2, ScalarOperand};
use num_traits::{AsPrimitive, FromPrimitive, NumAssignOps, NumCast, Signed};

use std::fmt;
use std::iter::Sum;

use crate::error::{Error, Result};

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating
/// point number and implement them for 32bit and 64bit floating points.
/// They are used in the feature matrix and, as this is a regression
/// engine, in the labels and weights as well.
pub trait Float:
    'static
    + FromPrimitive
    + num_traits::Float
    + PartialOrd
    + Sync
    + Send
    + Default
    + fmt::Display
    + fmt::Debug
    + Signed
    + Sum
    + NumAssignOps
    + AsPrimitive<usize>
    + ScalarOperand
    + approx::AbsDiffEq
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}
impl Float for f64 {}

/// The numeric mode a solver instance operates in
///
/// Exactly one of the two modes is selected by the precision of the
/// uploaded data; mixing storage precisions across inputs is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Single,
    Double,
}

/// A dataset for a single fit
///
/// Holds the training feature matrix with its label vector, an optional
/// validation pair and optional per-row observation weights. All shape
/// invariants are checked at construction:
///
/// * training X and training y agree on the number of rows,
/// * validation X and training X agree on the number of columns,
/// * validation X and validation y agree on the number of rows,
/// * weights and training X agree on the number of rows.
///
/// The memory order of the feature matrices is whatever the `ndarray`
/// arrays carry; both C and Fortran layouts are accepted.
pub struct GlmDataset<F: Float> {
    train_x: Array2<F>,
    train_y: Array1<F>,
    valid: Option<(Array2<F>, Array1<F>)>,
    weights: Option<Array1<F>>,
}

impl<F: Float> GlmDataset<F> {
    /// Create a dataset from a training matrix and its labels
    pub fn new(train_x: Array2<F>, train_y: Array1<F>) -> Result<Self> {
        if train_x.nrows() == 0 {
            return Err(Error::NotEnoughSamples);
        }
        if train_x.nrows() != train_y.len() {
            return Err(Error::ShapeMismatch {
                left: "training X",
                right: "training y",
                dimension: "rows",
                left_len: train_x.nrows(),
                right_len: train_y.len(),
            });
        }

        Ok(GlmDataset {
            train_x,
            train_y,
            valid: None,
            weights: None,
        })
    }

    /// Attach a validation pair used for model selection and early
    /// stopping
    pub fn with_validation(mut self, valid_x: Array2<F>, valid_y: Array1<F>) -> Result<Self> {
        if valid_x.ncols() != self.train_x.ncols() {
            return Err(Error::ShapeMismatch {
                left: "training X",
                right: "validation X",
                dimension: "columns",
                left_len: self.train_x.ncols(),
                right_len: valid_x.ncols(),
            });
        }
        if valid_x.nrows() == 0 {
            return Err(Error::NotEnoughSamples);
        }
        if valid_x.nrows() != valid_y.len() {
            return Err(Error::ShapeMismatch {
                left: "validation X",
                right: "validation y",
                dimension: "rows",
                left_len: valid_x.nrows(),
                right_len: valid_y.len(),
            });
        }

        self.valid = Some((valid_x, valid_y));
        Ok(self)
    }

    /// Attach per-row observation weights for the training loss
    ///
    /// Weights must be finite and non-negative; they are normalized to
    /// mean one before fitting so that unit weights reproduce the
    /// unweighted problem exactly.
    pub fn with_weights(mut self, weights: Array1<F>) -> Result<Self> {
        if weights.len() != self.train_x.nrows() {
            return Err(Error::ShapeMismatch {
                left: "training X",
                right: "weights",
                dimension: "rows",
                left_len: self.train_x.nrows(),
                right_len: weights.len(),
            });
        }
        if weights.iter().any(|w| !w.is_finite() || w.is_negative()) {
            return Err(Error::InvalidWeights);
        }
        if weights.sum() <= F::zero() {
            return Err(Error::InvalidWeights);
        }

        self.weights = Some(weights);
        Ok(self)
    }

    pub fn n_features(&self) -> usize {
        self.train_x.ncols()
    }

    pub fn n_train(&self) -> usize {
        self.train_x.nrows()
    }

    pub fn n_valid(&self) -> usize {
        self.valid.as_ref().map_or(0, |(x, _)| x.nrows())
    }

    pub fn train_x(&self) -> &Array2<F> {
        &self.train_x
    }

    pub fn train_y(&self) -> &Array1<F> {
        &self.train_y
    }

    pub fn valid(&self) -> Option<(&Array2<F>, &Array1<F>)> {
        self.valid.as_ref().map(|(x, y)| (x, y))
    }

    pub fn weights(&self) -> Option<&Array1<F>> {
        self.weights.as_ref()
    }
}

/// A host feature matrix entering the precision boundary
///
/// Callers tag the storage precision explicitly instead of the engine
/// sniffing it; `From` conversions cover the common case.
#[derive(Debug, Clone)]
pub enum HostMatrix {
    F32(Array2<f32>),
    F64(Array2<f64>),
}

impl HostMatrix {
    pub fn precision(&self) -> Precision {
        match self {
            HostMatrix::F32(_) => Precision::Single,
            HostMatrix::F64(_) => Precision::Double,
        }
    }

    pub fn nrows(&self) -> usize {
        match self {
            HostMatrix::F32(a) => a.nrows(),
            HostMatrix::F64(a) => a.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            HostMatrix::F32(a) => a.ncols(),
            HostMatrix::F64(a) => a.ncols(),
        }
    }

    fn into_f32(self, name: &'static str) -> Result<Array2<f32>> {
        match self {
            HostMatrix::F32(a) => Ok(a),
            HostMatrix::F64(_) => Err(Error::PrecisionMismatch {
                left: name,
                right: "training X",
            }),
        }
    }

    fn into_f64(self, name: &'static str) -> Result<Array2<f64>> {
        match self {
            HostMatrix::F64(a) => Ok(a),
            HostMatrix::F32(_) => Err(Error::PrecisionMismatch {
                left: name,
                right: "training X",
            }),
        }
    }
}

impl From<Array2<f32>> for HostMatrix {
    fn from(a: Array2<f32>) -> Self {
        HostMatrix::F32(a)
    }
}

impl From<Array2<f64>> for HostMatrix {
    fn from(a: Array2<f64>) -> Self {
        HostMatrix::F64(a)
    }
}

/// A host vector entering the precision boundary
#[derive(Debug, Clone)]
pub enum HostVector {
    F32(Array1<f32>),
    F64(Array1<f64>),
}

impl HostVector {
    pub fn precision(&self) -> Precision {
        match self {
            HostVector::F32(_) => Precision::Single,
            HostVector::F64(_) => Precision::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HostVector::F32(a) => a.len(),
            HostVector::F64(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_f32(self, name: &'static str) -> Result<Array1<f32>> {
        match self {
            HostVector::F32(a) => Ok(a),
            HostVector::F64(_) => Err(Error::PrecisionMismatch {
                left: name,
                right: "training X",
            }),
        }
    }

    fn into_f64(self, name: &'static str) -> Result<Array1<f64>> {
        match self {
            HostVector::F64(a) => Ok(a),
            HostVector::F32(_) => Err(Error::PrecisionMismatch {
                left: name,
                right: "training X",
            }),
        }
    }
}

impl From<Array1<f32>> for HostVector {
    fn from(a: Array1<f32>) -> Self {
        HostVector::F32(a)
    }
}

impl From<Array1<f64>> for HostVector {
    fn from(a: Array1<f64>) -> Self {
        HostVector::F64(a)
    }
}

/// A dataset whose numeric mode was selected by the uploaded data
///
/// `from_host` validates that all provided inputs agree on one storage
/// precision and on every shape invariant, then commits to a 32-bit or
/// a 64-bit typed dataset for a matching solver instance.
pub enum DynDataset {
    Single(GlmDataset<f32>),
    Double(GlmDataset<f64>),
}

impl DynDataset {
    pub fn from_host(
        train_x: HostMatrix,
        train_y: HostVector,
        valid_x: Option<HostMatrix>,
        valid_y: Option<HostVector>,
        weights: Option<HostVector>,
    ) -> Result<Self> {
        if valid_x.is_some() != valid_y.is_some() {
            return Err(Error::InvalidState(
                "validation X and validation y must be provided together",
            ));
        }

        if let Some(vx) = &valid_x {
            if train_x.precision() != vx.precision() {
                return Err(Error::PrecisionMismatch {
                    left: "training X",
                    right: "validation X",
                });
            }
        }
        if train_x.precision() != train_y.precision() {
            return Err(Error::PrecisionMismatch {
                left: "training X",
                right: "training y",
            });
        }
        if let (Some(vx), Some(vy)) = (&valid_x, &valid_y) {
            if vx.precision() != vy.precision() {
                return Err(Error::PrecisionMismatch {
                    left: "validation X",
                    right: "validation y",
                });
            }
        }
        if let Some(w) = &weights {
            if train_y.precision() != w.precision() {
                return Err(Error::PrecisionMismatch {
                    left: "training y",
                    right: "weights",
                });
            }
        }

        match train_x.precision() {
            Precision::Single => {
                let mut dataset =
                    GlmDataset::new(train_x.into_f32("training X")?, train_y.into_f32("training y")?)?;
                if let (Some(vx), Some(vy)) = (valid_x, valid_y) {
                    dataset = dataset
                        .with_validation(vx.into_f32("validation X")?, vy.into_f32("validation y")?)?;
                }
                if let Some(w) = weights {
                    dataset = dataset.with_weights(w.into_f32("weights")?)?;
                }
                Ok(DynDataset::Single(dataset))
            }
            Precision::Double => {
                let mut dataset =
                    GlmDataset::new(train_x.into_f64("training X")?, train_y.into_f64("training y")?)?;
                if let (Some(vx), Some(vy)) = (valid_x, valid_y) {
                    dataset = dataset
                        .with_validation(vx.into_f64("validation X")?, vy.into_f64("validation y")?)?;
                }
                if let Some(w) = weights {
                    dataset = dataset.with_weights(w.into_f64("weights")?)?;
                }
                Ok(DynDataset::Double(dataset))
            }
        }
    }

    pub fn precision(&self) -> Precision {
        match self {
            DynDataset::Single(_) => Precision::Single,
            DynDataset::Double(_) => Precision::Double,
        }
    }
}
