//! Metric extraction from a solver artifact.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::process::{self, ProcessOutcome, ProcessSpec};

/// Reads one scalar metric out of a result artifact.
pub trait ExtractionStrategy: Send + Sync {
    fn extract(&self, artifact: &Path, metric: &str, target: &str, timeout: Duration) -> Result<f64, EvalError>;
}

/// Extractor run as a separate command that prints exactly one number.
///
/// `{artifact}`, `{metric}` and `{target}` in arguments are substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandExtractor {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CommandExtractor {
    fn default() -> Self {
        Self {
            program: "abaqus".to_string(),
            args: ["python", "parse_odb.py", "{artifact}", "{metric}", "{target}"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ExtractionStrategy for CommandExtractor {
    fn extract(&self, artifact: &Path, metric: &str, target: &str, timeout: Duration) -> Result<f64, EvalError> {
        let artifact_str = artifact.to_string_lossy();
        let args = self.args.iter().map(|a| {
            a.replace("{artifact}", &artifact_str).replace("{metric}", metric).replace("{target}", target)
        });
        let mut spec = ProcessSpec::new(&self.program, timeout).args(args);
        if let Some(dir) = artifact.parent() {
            spec = spec.cwd(dir);
        }

        let outcome = process::run(&spec)
            .map_err(|source| EvalError::ExtractorSpawn { program: self.program.clone(), source })?;
        match outcome {
            ProcessOutcome::TimedOut { .. } => Err(EvalError::ExtractionTimedOut { timeout }),
            ProcessOutcome::Completed { status, stdout, stderr, .. } => {
                if !status.success() {
                    return Err(EvalError::ExtractionFailed {
                        status: status.to_string(),
                        stderr: stderr.trim().to_string(),
                    });
                }
                parse_metric(&stdout)
            }
        }
    }
}

/// Parse the extractor's stdout: one real number, surrounding whitespace allowed.
pub fn parse_metric(output: &str) -> Result<f64, EvalError> {
    let text = output.trim();
    let value: f64 = text
        .parse()
        .map_err(|_| EvalError::UnparseableMetric { output: text.to_string() })?;
    if !value.is_finite() {
        return Err(EvalError::NonFiniteMetric { value });
    }
    Ok(value)
}
