use std::path::PathBuf;
use std::time::Duration;

use simtune_template::TemplateError;

/// Why a single evaluation produced no objective value.
///
/// Everything except [`EvalError::Template`] is recoverable: the candidate is
/// marked unevaluable and the run goes on.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("cannot render input: {0}")]
    Template(#[from] TemplateError),

    #[error("cannot prepare job directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Simulation step
    #[error("failed to launch solver '{program}': {source}")]
    SolverSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solver exited with {status} for job {job}{}", excerpt_suffix(.log_excerpt))]
    SolverFailed { job: String, status: String, log_excerpt: Option<String> },

    #[error("solver timed out after {timeout:?} for job {job}")]
    SolverTimedOut { job: String, timeout: Duration },

    #[error("solver finished but produced no result artifact at {path}")]
    MissingArtifact { path: PathBuf },

    // Extraction step
    #[error("failed to launch extractor '{program}': {source}")]
    ExtractorSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extractor exited with {status}: {stderr}")]
    ExtractionFailed { status: String, stderr: String },

    #[error("extractor timed out after {timeout:?}")]
    ExtractionTimedOut { timeout: Duration },

    #[error("extractor output is not a number: {output:?}")]
    UnparseableMetric { output: String },

    #[error("extracted metric is not finite: {value}")]
    NonFiniteMetric { value: f64 },

    #[error("evaluation worker panicked: {message}")]
    WorkerPanicked { message: String },
}

fn excerpt_suffix(excerpt: &Option<String>) -> String {
    match excerpt {
        Some(text) => format!("; log: {}", text.trim()),
        None => String::new(),
    }
}

impl EvalError {
    /// Broken setup rather than a bad sample; the run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvalError::Template(_))
    }

    pub fn is_simulation_failure(&self) -> bool {
        matches!(
            self,
            EvalError::SolverSpawn { .. }
                | EvalError::SolverFailed { .. }
                | EvalError::SolverTimedOut { .. }
                | EvalError::MissingArtifact { .. }
        )
    }

    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            EvalError::ExtractorSpawn { .. }
                | EvalError::ExtractionFailed { .. }
                | EvalError::ExtractionTimedOut { .. }
                | EvalError::UnparseableMetric { .. }
                | EvalError::NonFiniteMetric { .. }
        )
    }
}

/// Errors building the evaluation pipeline or coordinator.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("cannot create result directory {path}: {source}")]
    ResultDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("vector has {got} components, the template expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}
