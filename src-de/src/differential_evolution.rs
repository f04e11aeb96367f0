use crate::{DEConfig, DEReport, DifferentialEvolution, FnEvaluator, Result};
use ndarray::Array1;

/// Convenience function for in-process objectives:
/// - `func`: objective function mapping x -> f(x), in the direction given by `config.direction`
/// - `bounds`: vector of (lower, upper) pairs
/// - `config`: DE configuration
pub fn differential_evolution<F>(func: &F, bounds: &[(f64, f64)], config: DEConfig) -> Result<DEReport>
where
	F: Fn(&Array1<f64>) -> f64 + Sync,
{
	let lower: Array1<f64> = bounds.iter().map(|&(lo, _)| lo).collect();
	let upper: Array1<f64> = bounds.iter().map(|&(_, hi)| hi).collect();
	let evaluator = FnEvaluator::new(func, config.direction, config.parallel.clone());
	let mut de = DifferentialEvolution::new(&evaluator, lower, upper);
	*de.config_mut() = config;
	de.solve()
}
