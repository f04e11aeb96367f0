//! Error types for the Differential Evolution engine.
//!
//! Every variant is a setup problem detected before (or instead of) running
//! generations. Failing objective evaluations are never errors here: they come
//! back from the evaluator as the unevaluable fitness sentinel.

use thiserror::Error;

/// Errors that abort a DE run before any generation completes.
#[derive(Debug, Error)]
pub enum DEError {
    /// The parameter space has no dimensions.
    #[error("parameter space is empty")]
    EmptyParameterSpace,

    /// Lower and upper bounds have different lengths.
    #[error("bounds mismatch: lower has {lower_len} elements, upper has {upper_len}")]
    BoundsMismatch {
        /// Length of the lower bounds array
        lower_len: usize,
        /// Length of the upper bounds array
        upper_len: usize,
    },

    /// A lower bound exceeds its corresponding upper bound, or either one is not finite.
    #[error("invalid bounds at index {index}: [{lower}, {upper}] must be finite with lower <= upper")]
    InvalidBounds {
        /// Index of the invalid bound pair
        index: usize,
        /// The lower bound value
        lower: f64,
        /// The upper bound value
        upper: f64,
    },

    /// Population size is too small (rand/1 needs three donors besides the target).
    #[error("population size ({pop_size}) must be >= 4")]
    PopulationTooSmall {
        /// The invalid population size
        pop_size: usize,
    },

    /// Mutation factor is out of valid range [0, 2].
    #[error("invalid mutation factor: {factor} (must be in [0, 2])")]
    InvalidMutationFactor {
        /// The invalid mutation factor
        factor: f64,
    },

    /// Crossover rate is out of valid range [0, 1].
    #[error("invalid crossover rate: {rate} (must be in [0, 1])")]
    InvalidCrossoverRate {
        /// The invalid crossover rate
        rate: f64,
    },

    /// The evaluator returned a different number of fitness values than vectors sent.
    #[error("evaluator returned {got} fitness values for a batch of {expected}")]
    BatchLengthMismatch {
        /// Number of vectors in the batch
        expected: usize,
        /// Number of fitness values returned
        got: usize,
    },

    /// The evaluator refused the batch (broken setup, not a bad sample).
    #[error("batch evaluation failed: {0}")]
    Evaluator(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A specialized `Result` type for DE operations.
pub type Result<T> = std::result::Result<T, DEError>;

impl DEError {
    /// Returns `true` if this is a bounds-related error.
    pub fn is_bounds_error(&self) -> bool {
        matches!(
            self,
            DEError::EmptyParameterSpace
                | DEError::BoundsMismatch { .. }
                | DEError::InvalidBounds { .. }
        )
    }

    /// Returns `true` if this is an algorithm-parameter error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DEError::PopulationTooSmall { .. }
                | DEError::InvalidMutationFactor { .. }
                | DEError::InvalidCrossoverRate { .. }
        )
    }

    /// Wrap any evaluator-side error.
    pub fn evaluator<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DEError::Evaluator(Box::new(err))
    }
}
