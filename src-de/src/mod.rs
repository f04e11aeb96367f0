//! Differential Evolution (DE) for expensive, failure-prone objectives
//!
//! A fixed-generation rand/1/bin optimizer over box bounds, built for objectives
//! that run an external simulation per candidate.
//!
//! Supported features:
//! - Box constraints (lower/upper bounds), hard clamp after mutation
//! - rand/1 mutation with a fixed factor F, binomial crossover with one forced dimension
//! - Uniform random initialization
//! - One batch evaluation per generation through a [`BatchEvaluator`]
//! - Unevaluable candidates carried as `+inf` fitness, never selected
//! - Minimize or maximize, with the report re-expressed in the caller's direction
//! - Per-generation callback and CSV history recording

#![allow(missing_docs)]
use std::fmt;
use std::time::Instant;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod clip_inplace;
pub mod crossover_binomial;
pub mod distinct_indices;
pub mod init_random;
pub mod mutant_rand1;

pub mod differential_evolution;
pub mod error;
pub mod fitness;
pub mod optimization_recorder;
pub mod parallel_eval;


pub use differential_evolution::differential_evolution;
pub use error::{DEError, Result};
pub use fitness::{Direction, UNEVALUABLE, is_evaluable, sanitize};
pub use optimization_recorder::{OptimizationRecord, OptimizationRecorder};
pub use parallel_eval::{BatchEvaluator, FnEvaluator, ParallelConfig};

/// Configuration for the Differential Evolution optimizer
pub struct DEConfig {
	/// Number of generations G run after initialization
	pub maxiter: usize,
	/// Population size N (absolute, not a multiple of the dimension)
	pub popsize: usize,
	/// Mutation factor F in [0, 2]
	pub mutation: f64,
	/// Crossover probability CR in [0, 1]
	pub recombination: f64,
	pub seed: Option<u64>,
	/// Direction of the caller's objective; fitness is always minimized internally
	pub direction: Direction,
	/// Log the best vector at every generation
	pub disp: bool,
	/// Optional per-generation observer, called once after initialization and once per generation
	pub callback: Option<Box<dyn FnMut(&DEIntermediate<'_>) + Send>>,
	/// Parallel evaluation configuration for closure objectives
	pub parallel: ParallelConfig,
}

impl Default for DEConfig {
	fn default() -> Self {
		Self {
			maxiter: 20,
			popsize: 10,
			mutation: 0.5,
			recombination: 0.9,
			seed: None,
			direction: Direction::default(),
			disp: false,
			callback: None,
			parallel: ParallelConfig::default(),
		}
	}
}

impl fmt::Debug for DEConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DEConfig")
			.field("maxiter", &self.maxiter)
			.field("popsize", &self.popsize)
			.field("mutation", &self.mutation)
			.field("recombination", &self.recombination)
			.field("seed", &self.seed)
			.field("direction", &self.direction)
			.field("disp", &self.disp)
			.field("callback", &self.callback.is_some())
			.field("parallel", &self.parallel)
			.finish()
	}
}

/// Fluent builder for `DEConfig` for ergonomic configuration.
pub struct DEConfigBuilder {
	cfg: DEConfig,
}
impl Default for DEConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}
impl DEConfigBuilder {
	pub fn new() -> Self {
		Self { cfg: DEConfig::default() }
	}
	pub fn maxiter(mut self, v: usize) -> Self {
		self.cfg.maxiter = v;
		self
	}
	pub fn popsize(mut self, v: usize) -> Self {
		self.cfg.popsize = v;
		self
	}
	pub fn mutation(mut self, v: f64) -> Self {
		self.cfg.mutation = v;
		self
	}
	pub fn recombination(mut self, v: f64) -> Self {
		self.cfg.recombination = v;
		self
	}
	pub fn seed(mut self, v: u64) -> Self {
		self.cfg.seed = Some(v);
		self
	}
	pub fn direction(mut self, v: Direction) -> Self {
		self.cfg.direction = v;
		self
	}
	pub fn disp(mut self, v: bool) -> Self {
		self.cfg.disp = v;
		self
	}
	pub fn callback(mut self, cb: Box<dyn FnMut(&DEIntermediate<'_>) + Send>) -> Self {
		self.cfg.callback = Some(cb);
		self
	}
	pub fn parallel(mut self, parallel: ParallelConfig) -> Self {
		self.cfg.parallel = parallel;
		self
	}
	pub fn enable_parallel(mut self, enable: bool) -> Self {
		self.cfg.parallel.enabled = enable;
		self
	}
	pub fn parallel_threads(mut self, num_threads: usize) -> Self {
		self.cfg.parallel.num_threads = Some(num_threads);
		self
	}
	pub fn build(self) -> DEConfig {
		self.cfg
	}
}

/// Result/Report of a DE optimization run
#[derive(Clone)]
pub struct DEReport {
	/// Best vector ever observed
	pub x: Array1<f64>,
	/// Best fitness ever observed, in the internal minimization convention
	pub fun: f64,
	pub direction: Direction,
	/// `false` when no candidate could ever be evaluated
	pub success: bool,
	pub message: String,
	pub nit: usize,
	pub nfev: usize,
	/// Evaluations that came back unevaluable
	pub nfail: usize,
	pub population: Array2<f64>,
	pub population_energies: Array1<f64>,
}

impl DEReport {
	/// Best objective in the caller's direction, `None` if nothing was evaluable.
	pub fn objective(&self) -> Option<f64> {
		self.direction.to_external(self.fun)
	}
}

impl fmt::Debug for DEReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DEReport")
			.field("x", &format!("len={}", self.x.len()))
			.field("fun", &self.fun)
			.field("direction", &self.direction)
			.field("success", &self.success)
			.field("message", &self.message)
			.field("nit", &self.nit)
			.field("nfev", &self.nfev)
			.field("nfail", &self.nfail)
			.field(
				"population",
				&format!("{}x{}", self.population.nrows(), self.population.ncols()),
			)
			.field("population_energies", &format!("len={}", self.population_energies.len()))
			.finish()
	}
}

/// Information passed to the callback after initialization (iter 0) and each generation
pub struct DEIntermediate<'a> {
	pub x: ArrayView1<'a, f64>,
	pub fun: f64,
	pub convergence: f64, // std of the evaluable population fitness
	pub iter: usize,
	pub accepted: usize,
	pub improved: bool,
	pub population: ArrayView2<'a, f64>,
	pub energies: ArrayView1<'a, f64>,
}

/// Differential Evolution optimizer
pub struct DifferentialEvolution<'a, E>
where
	E: BatchEvaluator + ?Sized,
{
	evaluator: &'a E,
	lower: Array1<f64>,
	upper: Array1<f64>,
	config: DEConfig,
}

impl<'a, E> DifferentialEvolution<'a, E>
where
	E: BatchEvaluator + ?Sized,
{
	/// Create a new DE optimizer evaluating through `evaluator` within bounds [lower, upper]
	pub fn new(evaluator: &'a E, lower: Array1<f64>, upper: Array1<f64>) -> Self {
		Self { evaluator, lower, upper, config: DEConfig::default() }
	}

	/// Mutable access to configuration
	pub fn config_mut(&mut self) -> &mut DEConfig {
		&mut self.config
	}

	fn validate(&self) -> Result<()> {
		let n = self.lower.len();
		if n != self.upper.len() {
			return Err(DEError::BoundsMismatch { lower_len: n, upper_len: self.upper.len() });
		}
		if n == 0 {
			return Err(DEError::EmptyParameterSpace);
		}
		for i in 0..n {
			let (lo, hi) = (self.lower[i], self.upper[i]);
			if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
				return Err(DEError::InvalidBounds { index: i, lower: lo, upper: hi });
			}
		}
		if self.config.popsize < 4 {
			return Err(DEError::PopulationTooSmall { pop_size: self.config.popsize });
		}
		let f = self.config.mutation;
		if !(0.0..=2.0).contains(&f) {
			return Err(DEError::InvalidMutationFactor { factor: f });
		}
		let cr = self.config.recombination;
		if !(0.0..=1.0).contains(&cr) {
			return Err(DEError::InvalidCrossoverRate { rate: cr });
		}
		Ok(())
	}

	fn evaluate(&self, batch: &[Array1<f64>]) -> Result<Array1<f64>> {
		let values = self.evaluator.evaluate_batch(batch)?;
		if values.len() != batch.len() {
			return Err(DEError::BatchLengthMismatch { expected: batch.len(), got: values.len() });
		}
		Ok(values.into_iter().map(sanitize).collect())
	}

	/// Run exactly `maxiter` generations and return a report
	pub fn solve(&mut self) -> Result<DEReport> {
		use clip_inplace::clip_inplace;
		use crossover_binomial::binomial_crossover;
		use fitness::{argmin, evaluable_std};
		use init_random::init_random;
		use mutant_rand1::mutant_rand1;

		self.validate()?;

		let n = self.lower.len();
		let npop = self.config.popsize;
		let f = self.config.mutation;
		let cr = self.config.recombination;
		let started = Instant::now();

		log::info!(
			"DE init: {} dimensions, population={}, generations={}, F={:.3}, CR={:.3}, direction={}",
			n,
			npop,
			self.config.maxiter,
			f,
			cr,
			self.config.direction
		);

		let mut rng: StdRng = match self.config.seed {
			Some(s) => StdRng::seed_from_u64(s),
			None => {
				let mut thread_rng = rand::rng();
				StdRng::from_rng(&mut thread_rng)
			}
		};

		// Initialization
		let mut pop = init_random(n, npop, &self.lower, &self.upper, &mut rng);
		let initial: Vec<Array1<f64>> = pop.rows().into_iter().map(|r| r.to_owned()).collect();
		let mut energies = self.evaluate(&initial)?;
		let mut nfev = npop;
		let mut nfail = energies.iter().filter(|&&e| !is_evaluable(e)).count();

		let (best_idx, mut best_f) = argmin(&energies);
		let mut best_x = pop.row(best_idx).to_owned();

		if nfail > 0 {
			log::warn!("{}/{} initial individuals could not be evaluated", nfail, npop);
		}
		log::info!("Initial best: fitness={:.6e} at index {}", best_f, best_idx);
		self.notify(&best_x, best_f, 0, 0, false, &pop, &energies, evaluable_std(&energies));

		// Generations
		for iter in 1..=self.config.maxiter {
			let mut trials = Vec::with_capacity(npop);
			for i in 0..npop {
				let mut mutant = mutant_rand1(i, &pop, f, &mut rng);
				clip_inplace(&mut mutant, &self.lower, &self.upper);
				let target = pop.row(i).to_owned();
				trials.push(binomial_crossover(&target, &mutant, cr, &mut rng));
			}

			let t_eval0 = Instant::now();
			let trial_energies = self.evaluate(&trials)?;
			let t_eval = t_eval0.elapsed();
			nfev += npop;
			let failed = trial_energies.iter().filter(|&&e| !is_evaluable(e)).count();
			nfail += failed;

			// Selection happens only once the whole batch is back
			let mut accepted = 0;
			let mut improved = false;
			for (i, trial) in trials.into_iter().enumerate() {
				let trial_energy = trial_energies[i];
				if trial_energy < energies[i] {
					energies[i] = trial_energy;
					accepted += 1;
					if trial_energy < best_f {
						best_f = trial_energy;
						best_x = trial.clone();
						improved = true;
					}
					pop.row_mut(i).assign(&trial);
				}
			}

			let convergence = evaluable_std(&energies);
			log::info!(
				"DE gen {:4}/{}  best_f={:.6e}  accepted={}/{}  failed={}  eval={:.3}s",
				iter,
				self.config.maxiter,
				best_f,
				accepted,
				npop,
				failed,
				t_eval.as_secs_f64()
			);
			if self.config.disp {
				log::info!("  best x: {:?}", best_x.to_vec());
			}
			self.notify(&best_x, best_f, iter, accepted, improved, &pop, &energies, convergence);
		}

		let success = is_evaluable(best_f);
		let message = if success {
			format!("Completed {} generations", self.config.maxiter)
		} else {
			format!("Completed {} generations without any evaluable candidate", self.config.maxiter)
		};
		log::info!("DE finished in {:.2}s: {}", started.elapsed().as_secs_f64(), message);

		Ok(DEReport {
			x: best_x,
			fun: best_f,
			direction: self.config.direction,
			success,
			message,
			nit: self.config.maxiter,
			nfev,
			nfail,
			population: pop,
			population_energies: energies,
		})
	}

	#[allow(clippy::too_many_arguments)]
	fn notify(
		&mut self,
		best_x: &Array1<f64>,
		best_f: f64,
		iter: usize,
		accepted: usize,
		improved: bool,
		pop: &Array2<f64>,
		energies: &Array1<f64>,
		convergence: f64,
	) {
		if let Some(ref mut cb) = self.config.callback {
			let intermediate = DEIntermediate {
				x: best_x.view(),
				fun: best_f,
				convergence,
				iter,
				accepted,
				improved,
				population: pop.view(),
				energies: energies.view(),
			};
			cb(&intermediate);
		}
	}
}
