use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simtune_de::Direction;
use simtune_template::TemplateSource;

use crate::error::{EvalError, SimError};
use crate::extract::ExtractionStrategy;
use crate::job::Job;
use crate::solver::SimulationRunner;

/// A function of a parameter vector that may fail, in the engine's
/// minimization convention.
pub trait Objective: Send + Sync {
    fn dimension(&self) -> usize;
    fn evaluate(&self, x: &[f64]) -> Result<f64, EvalError>;
}

/// Fixed settings of every evaluation in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub result_dir: PathBuf,
    #[serde(with = "secs")]
    pub simulation_timeout: Duration,
    #[serde(with = "secs")]
    pub extraction_timeout: Duration,
    pub metric: String,
    pub target: String,
    pub direction: Direction,
    /// Keep job directories after a successful evaluation.
    pub keep_jobs: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            result_dir: PathBuf::from("result"),
            simulation_timeout: Duration::from_secs(120),
            extraction_timeout: Duration::from_secs(60),
            metric: "max_disp".to_string(),
            target: "2".to_string(),
            direction: Direction::Minimize,
            keep_jobs: true,
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let v = f64::deserialize(d)?;
        Duration::try_from_secs_f64(v).map_err(serde::de::Error::custom)
    }
}

/// render → isolated job → solver → extractor → scalar.
pub struct EvaluationPipeline {
    template: Arc<TemplateSource>,
    solver: Box<dyn SimulationRunner>,
    extractor: Box<dyn ExtractionStrategy>,
    settings: PipelineSettings,
}

impl EvaluationPipeline {
    pub fn new(
        template: Arc<TemplateSource>,
        solver: Box<dyn SimulationRunner>,
        extractor: Box<dyn ExtractionStrategy>,
        settings: PipelineSettings,
    ) -> Result<Self, SimError> {
        if settings.simulation_timeout.is_zero() || settings.extraction_timeout.is_zero() {
            return Err(SimError::InvalidSetting("timeouts must be positive".to_string()));
        }
        if settings.metric.trim().is_empty() {
            return Err(SimError::InvalidSetting("metric name is empty".to_string()));
        }
        std::fs::create_dir_all(&settings.result_dir)
            .map_err(|source| SimError::ResultDir { path: settings.result_dir.clone(), source })?;
        Ok(Self { template, solver, extractor, settings })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Objective value in the caller's direction, or the reason there is none.
    pub fn evaluate_raw(&self, x: &[f64]) -> Result<f64, EvalError> {
        let text = self.template.render(x)?;
        let job = Job::create(&self.settings.result_dir, &text)
            .map_err(|source| EvalError::Workspace { path: self.settings.result_dir.clone(), source })?;
        log::debug!("{} started with {:?}", job.id, x);

        let artifact = self.solver.run(&job, self.settings.simulation_timeout)?;
        let value = self.extractor.extract(
            &artifact,
            &self.settings.metric,
            &self.settings.target,
            self.settings.extraction_timeout,
        )?;
        log::debug!("{} {} = {:.6}", job.id, self.settings.metric, value);

        if !self.settings.keep_jobs {
            if let Err(e) = std::fs::remove_dir_all(&job.dir) {
                log::warn!("could not remove {}: {}", job.dir.display(), e);
            }
        }
        Ok(value)
    }
}

impl Objective for EvaluationPipeline {
    fn dimension(&self) -> usize {
        self.template.dimension()
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64, EvalError> {
        self.evaluate_raw(x).map(|v| self.settings.direction.to_internal(v))
    }
}
