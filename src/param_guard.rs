use std::error::Error;

/// A set of hyper-parameters whose values have not been checked for
/// validity. A reference to the checked set can only be obtained after
/// checking has completed.
///
/// The validation done in `check_ref()` and `check()` is identical.
pub trait ParamGuard {
    /// The checked hyper-parameters
    type Checked;
    /// The error type returned for invalid values
    type Error: Error;

    /// Checks the hyper-parameters and returns a reference to the
    /// checked set if successful
    fn check_ref(&self) -> Result<&Self::Checked, Self::Error>;

    /// Checks the hyper-parameters and returns the checked set if
    /// successful
    fn check(self) -> Result<Self::Checked, Self::Error>;

    /// Calls `check()` and unwraps the result
    fn check_unwrap(self) -> Self::Checked
    where
        Self: Sized,
    {
        self.check().unwrap()
    }
}
