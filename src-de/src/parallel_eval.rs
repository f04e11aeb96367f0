use ndarray::Array1;
use rayon::prelude::*;

use crate::error::DEError;
use crate::fitness::{Direction, sanitize};

/// Parallel evaluation configuration
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Enable parallel evaluation
    pub enabled: bool,
    /// Number of threads to use (None = use rayon default)
    pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_threads: None, // Use rayon's default (typically num_cpus)
        }
    }
}

/// Evaluates one generation worth of vectors.
///
/// Implementations return one fitness per input, in input order, already in
/// the engine's minimization convention, with failed evaluations reported as
/// [`crate::UNEVALUABLE`]. An `Err` means the whole setup is broken and the run
/// must stop.
pub trait BatchEvaluator {
    fn evaluate_batch(&self, batch: &[Array1<f64>]) -> Result<Vec<f64>, DEError>;
}

/// Evaluate trials, in parallel when enabled and the batch is large enough.
///
/// Order of the returned values matches `trials`.
pub fn evaluate_trials_parallel<F>(trials: &[Array1<f64>], eval_fn: &F, config: &ParallelConfig) -> Vec<f64>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    if !config.enabled || trials.len() < 4 {
        return trials.iter().map(|trial| eval_fn(trial)).collect();
    }

    let run = || trials.par_iter().map(|trial| eval_fn(trial)).collect::<Vec<f64>>();
    match config.num_threads {
        Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                log::warn!("could not build a {}-thread pool ({}), using the global pool", n, e);
                run()
            }
        },
        None => run(),
    }
}

/// [`BatchEvaluator`] over an in-process objective closure.
///
/// The closure returns objective values in the caller's direction; they are
/// converted to minimization and NaN is mapped to the sentinel.
pub struct FnEvaluator<F> {
    func: F,
    direction: Direction,
    parallel: ParallelConfig,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    pub fn new(func: F, direction: Direction, parallel: ParallelConfig) -> Self {
        Self { func, direction, parallel }
    }
}

impl<F> BatchEvaluator for FnEvaluator<F>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    fn evaluate_batch(&self, batch: &[Array1<f64>]) -> Result<Vec<f64>, DEError> {
        let values = evaluate_trials_parallel(batch, &self.func, &self.parallel);
        Ok(values.into_iter().map(|v| sanitize(self.direction.to_internal(v))).collect())
    }
}
