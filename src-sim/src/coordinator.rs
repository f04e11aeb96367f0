use std::panic::{AssertUnwindSafe, catch_unwind};

use ndarray::Array1;
use rayon::prelude::*;
use simtune_de::{BatchEvaluator, DEError, UNEVALUABLE, sanitize};

use crate::error::{EvalError, SimError};
use crate::pipeline::Objective;

/// Default pool width: `min(4, CPU count)`.
pub fn default_workers() -> usize {
    num_cpus::get().clamp(1, 4)
}

/// Evaluates batches on a bounded worker pool.
///
/// Results keep the order of the input. Recoverable failures and worker
/// panics become [`UNEVALUABLE`]; only broken setup is returned as an error.
pub struct Coordinator<O> {
    objective: O,
    workers: usize,
}

impl<O: Objective> Coordinator<O> {
    pub fn new(objective: O, workers: usize) -> Self {
        Self { objective, workers: workers.max(1) }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    fn guarded(&self, x: &Array1<f64>) -> Result<f64, EvalError> {
        let values = x.to_vec();
        match catch_unwind(AssertUnwindSafe(|| self.objective.evaluate(&values))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(EvalError::WorkerPanicked { message })
            }
        }
    }

    fn run_all(&self, batch: &[Array1<f64>]) -> Vec<Result<f64, EvalError>> {
        if self.workers == 1 {
            return batch.iter().map(|x| self.guarded(x)).collect();
        }
        match rayon::ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => pool.install(|| batch.par_iter().map(|x| self.guarded(x)).collect()),
            Err(e) => {
                log::warn!("could not build a {}-worker pool ({}), evaluating serially", self.workers, e);
                batch.iter().map(|x| self.guarded(x)).collect()
            }
        }
    }
}

impl<O: Objective> BatchEvaluator for Coordinator<O> {
    fn evaluate_batch(&self, batch: &[Array1<f64>]) -> Result<Vec<f64>, DEError> {
        let expected = self.objective.dimension();
        if let Some(bad) = batch.iter().find(|x| x.len() != expected) {
            return Err(DEError::evaluator(SimError::DimensionMismatch { expected, got: bad.len() }));
        }

        let results = self.run_all(batch);
        let mut fitness = Vec::with_capacity(results.len());
        let mut failed = 0usize;
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(v) => fitness.push(sanitize(v)),
                Err(e) if e.is_fatal() => return Err(DEError::evaluator(e)),
                Err(e) => {
                    log::warn!("candidate {} unevaluable: {}", i, e);
                    failed += 1;
                    fitness.push(UNEVALUABLE);
                }
            }
        }
        if failed > 0 {
            log::info!("{} of {} evaluations failed", failed, batch.len());
        }
        Ok(fitness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use simtune_template::TemplateError;

    struct Scripted {
        calls: AtomicUsize,
    }

    impl Objective for Scripted {
        fn dimension(&self) -> usize {
            1
        }

        fn evaluate(&self, x: &[f64]) -> Result<f64, EvalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match x[0] as i64 {
                1 => Err(EvalError::SolverTimedOut { job: "j".into(), timeout: Duration::from_secs(1) }),
                2 => panic!("worker blew up"),
                3 => Ok(f64::NAN),
                4 => Err(EvalError::Template(TemplateError::NoPlaceholders)),
                _ => Ok(x[0] * 10.0),
            }
        }
    }

    fn batch(values: &[f64]) -> Vec<Array1<f64>> {
        values.iter().map(|&v| Array1::from(vec![v])).collect()
    }

    #[test]
    fn test_order_and_failure_mapping() {
        for workers in [1, 3] {
            let c = Coordinator::new(Scripted { calls: AtomicUsize::new(0) }, workers);
            let out = c.evaluate_batch(&batch(&[0.0, 1.0, 2.0, 3.0, 5.0, 6.0])).unwrap();
            assert_eq!(out, vec![0.0, UNEVALUABLE, UNEVALUABLE, UNEVALUABLE, 50.0, 60.0]);
            assert_eq!(c.objective().calls.load(Ordering::SeqCst), 6);
        }
    }

    #[test]
    fn test_dimension_mismatch_before_dispatch() {
        let c = Coordinator::new(Scripted { calls: AtomicUsize::new(0) }, 2);
        let mut b = batch(&[0.0, 5.0]);
        b.push(Array1::from(vec![1.0, 2.0]));
        let err = c.evaluate_batch(&b).unwrap_err();
        assert!(matches!(err, DEError::Evaluator(_)));
        assert_eq!(c.objective().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fatal_error_stops_batch() {
        let c = Coordinator::new(Scripted { calls: AtomicUsize::new(0) }, 2);
        assert!(c.evaluate_batch(&batch(&[0.0, 4.0])).is_err());
    }

    #[test]
    fn test_default_workers_bounded() {
        let w = default_workers();
        assert!((1..=4).contains(&w));
    }
}
