//! Black-box objective evaluation through an external simulation program
//!
//! One evaluation renders the template for a vector, writes it into a fresh job
//! directory, runs the solver under a timeout, then runs a separate extraction
//! command that prints the metric. The [`Coordinator`] fans a batch out over a
//! bounded pool and plugs into the DE engine as a [`simtune_de::BatchEvaluator`].

pub mod coordinator;
pub mod error;
pub mod extract;
pub mod job;
pub mod pipeline;
pub mod process;
pub mod solver;

pub use coordinator::{Coordinator, default_workers};
pub use error::{EvalError, SimError};
pub use extract::{CommandExtractor, ExtractionStrategy, parse_metric};
pub use job::{Job, generate_job_id};
pub use pipeline::{EvaluationPipeline, Objective, PipelineSettings};
pub use process::{ProcessOutcome, ProcessSpec};
pub use solver::{CommandSolver, SimulationRunner};
