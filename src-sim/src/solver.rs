//! External simulation step.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::job::Job;
use crate::process::{self, ProcessOutcome, ProcessSpec};

/// Bytes of `<job>.log` attached to a solver failure.
const LOG_EXCERPT_BYTES: u64 = 500;

/// Runs one prepared job and returns the path of its result artifact.
pub trait SimulationRunner: Send + Sync {
    fn run(&self, job: &Job, timeout: Duration) -> Result<PathBuf, EvalError>;
}

/// Solver invoked as an external command inside the job directory.
///
/// `{job}` and `{input}` in arguments are replaced with the job name and the
/// input file name. After a zero exit, `<job>.<artifact_extension>` must exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSolver {
    pub program: String,
    pub args: Vec<String>,
    pub artifact_extension: String,
}

impl Default for CommandSolver {
    fn default() -> Self {
        Self {
            program: "abaqus".to_string(),
            args: ["job={job}", "input={input}", "interactive", "cpus=1", "mp_mode=threads"]
                .into_iter()
                .map(String::from)
                .collect(),
            artifact_extension: "odb".to_string(),
        }
    }
}

impl CommandSolver {
    fn spec(&self, job: &Job, timeout: Duration) -> ProcessSpec {
        let input = format!("{}.inp", job.id);
        ProcessSpec::new(&self.program, timeout)
            .args(self.args.iter().map(|a| a.replace("{job}", &job.id).replace("{input}", &input)))
            .cwd(&job.dir)
    }
}

impl SimulationRunner for CommandSolver {
    fn run(&self, job: &Job, timeout: Duration) -> Result<PathBuf, EvalError> {
        let spec = self.spec(job, timeout);
        let outcome = process::run(&spec)
            .map_err(|source| EvalError::SolverSpawn { program: self.program.clone(), source })?;

        match outcome {
            ProcessOutcome::TimedOut { .. } => Err(EvalError::SolverTimedOut { job: job.id.clone(), timeout }),
            ProcessOutcome::Completed { status, stderr, elapsed, .. } => {
                if !status.success() {
                    if !stderr.trim().is_empty() {
                        log::debug!("{} stderr: {}", job.id, truncate(&stderr, LOG_EXCERPT_BYTES as usize));
                    }
                    return Err(EvalError::SolverFailed {
                        job: job.id.clone(),
                        status: status.to_string(),
                        log_excerpt: log_excerpt(job),
                    });
                }
                let artifact = job.file(&self.artifact_extension);
                if !artifact.is_file() {
                    return Err(EvalError::MissingArtifact { path: artifact });
                }
                log::debug!("{} solved in {:.1}s", job.id, elapsed.as_secs_f64());
                Ok(artifact)
            }
        }
    }
}

/// Start of `<job>.log`, if the solver wrote one.
fn log_excerpt(job: &Job) -> Option<String> {
    let file = std::fs::File::open(job.file("log")).ok()?;
    let mut buf = Vec::new();
    file.take(LOG_EXCERPT_BYTES).read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh_solver(script: &str) -> CommandSolver {
        CommandSolver {
            program: "sh".into(),
            args: vec!["-c".into(), script.into(), "solver".into(), "{job}".into(), "{input}".into()],
            artifact_extension: "odb".into(),
        }
    }

    #[test]
    fn test_success_returns_artifact() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path(), "deck").unwrap();
        let solver = sh_solver(r#"test -f "$2" && cp "$2" "$1.odb""#);
        let artifact = solver.run(&job, Duration::from_secs(10)).unwrap();
        assert_eq!(artifact, job.file("odb"));
        assert_eq!(std::fs::read_to_string(artifact).unwrap(), "deck");
    }

    #[test]
    fn test_nonzero_exit_attaches_log() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path(), "deck").unwrap();
        let solver = sh_solver(r#"printf 'ERROR: bad mesh' > "$1.log"; exit 2"#);
        match solver.run(&job, Duration::from_secs(10)) {
            Err(EvalError::SolverFailed { log_excerpt, .. }) => {
                assert_eq!(log_excerpt.as_deref(), Some("ERROR: bad mesh"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_artifact() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path(), "deck").unwrap();
        let solver = sh_solver("exit 0");
        assert!(matches!(solver.run(&job, Duration::from_secs(10)), Err(EvalError::MissingArtifact { .. })));
    }

    #[test]
    fn test_timeout() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path(), "deck").unwrap();
        let solver = sh_solver("exec sleep 30");
        assert!(matches!(
            solver.run(&job, Duration::from_millis(200)),
            Err(EvalError::SolverTimedOut { .. })
        ));
    }

    #[test]
    fn test_default_arguments() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path(), "deck").unwrap();
        let spec = CommandSolver::default().spec(&job, Duration::from_secs(1));
        assert_eq!(spec.program, "abaqus");
        assert_eq!(spec.args[0], format!("job={}", job.id));
        assert_eq!(spec.args[1], format!("input={}.inp", job.id));
        assert_eq!(spec.cwd.as_deref(), Some(job.dir.as_path()));
    }
}
