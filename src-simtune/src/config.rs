//! Run configuration.
//!
//! Loaded once from YAML (every key optional), overridden from the command
//! line, validated, then turned into the immutable settings each component
//! takes in its constructor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simtune_de::{DEConfig, DEConfigBuilder, Direction};
use simtune_sim::{CommandExtractor, CommandSolver, PipelineSettings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Template with `${name}` placeholders.
    pub template: PathBuf,
    /// Parameter manifest; defaults to `<template>.params.json`.
    pub manifest: Option<PathBuf>,
    pub result_dir: PathBuf,
    /// Empty the result directory before running.
    pub clean: bool,
    pub keep_jobs: bool,
    /// Directory for the per-generation history CSV.
    pub history_dir: Option<PathBuf>,

    /// Population size `N`.
    pub popsize: usize,
    /// Number of generations `G`.
    pub generations: usize,
    /// Differential weight `F`.
    pub mutation: f64,
    /// Crossover probability `CR`.
    pub crossover: f64,
    pub seed: Option<u64>,
    /// Concurrent evaluations `W`.
    pub workers: usize,

    pub direction: Direction,
    pub metric: String,
    pub target: String,
    pub simulation_timeout_secs: f64,
    pub extraction_timeout_secs: f64,

    pub solver: CommandSolver,
    pub extractor: CommandExtractor,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from(simtune_env::TEMPLATE_FILE),
            manifest: None,
            result_dir: PathBuf::from(simtune_env::RESULT_DIR),
            clean: false,
            keep_jobs: true,
            history_dir: None,
            popsize: 4,
            generations: 4,
            mutation: 0.5,
            crossover: 0.9,
            seed: None,
            workers: simtune_sim::default_workers(),
            direction: Direction::Minimize,
            metric: "max_disp".to_string(),
            target: "2".to_string(),
            simulation_timeout_secs: 120.0,
            extraction_timeout_secs: 60.0,
            solver: CommandSolver::default(),
            extractor: CommandExtractor::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.popsize < 4 {
            return invalid(format!("popsize must be >= 4, got {}", self.popsize));
        }
        if !(0.0..=2.0).contains(&self.mutation) {
            return invalid(format!("mutation must be in [0, 2], got {}", self.mutation));
        }
        if !(0.0..=1.0).contains(&self.crossover) {
            return invalid(format!("crossover must be in [0, 1], got {}", self.crossover));
        }
        if self.workers == 0 {
            return invalid("workers must be >= 1".to_string());
        }
        for (name, secs) in [
            ("simulation_timeout_secs", self.simulation_timeout_secs),
            ("extraction_timeout_secs", self.extraction_timeout_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                return invalid(format!("{} must be positive, got {}", name, secs));
            }
        }
        if self.metric.trim().is_empty() {
            return invalid("metric must not be empty".to_string());
        }
        if self.solver.program.trim().is_empty() || self.extractor.program.trim().is_empty() {
            return invalid("solver and extractor programs must be set".to_string());
        }
        Ok(())
    }

    /// Solver and extractor run inside job directories, so scripts they name
    /// relative to the project are made absolute here.
    pub fn resolve_commands(&mut self, project: &Path) {
        resolve_command(&mut self.solver.program, &mut self.solver.args, project);
        resolve_command(&mut self.extractor.program, &mut self.extractor.args, project);
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| simtune_template::TemplateManifest::sidecar_path(&self.template))
    }

    /// Engine configuration; the callback is attached by the caller.
    pub fn de_config(&self) -> DEConfig {
        let mut builder = DEConfigBuilder::new()
            .popsize(self.popsize)
            .maxiter(self.generations)
            .mutation(self.mutation)
            .recombination(self.crossover)
            .direction(self.direction)
            // batches are parallelized by the coordinator
            .enable_parallel(false);
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }

    pub fn pipeline_settings(&self, result_dir: PathBuf) -> PipelineSettings {
        PipelineSettings {
            result_dir,
            simulation_timeout: Duration::from_secs_f64(self.simulation_timeout_secs),
            extraction_timeout: Duration::from_secs_f64(self.extraction_timeout_secs),
            metric: self.metric.clone(),
            target: self.target.clone(),
            direction: self.direction,
            keep_jobs: self.keep_jobs,
        }
    }
}

/// A relative program with a directory part (`./run.sh`) or a plain argument
/// that names an existing project file is rewritten to an absolute path.
/// Arguments with `{...}` substitutions or `key=value` form are left alone.
fn resolve_command(program: &mut String, args: &mut [String], project: &Path) {
    let in_project = |s: &str| {
        let path = Path::new(s);
        if path.is_absolute() || s.contains('{') || s.contains('=') {
            return None;
        }
        let full = project.join(path);
        full.is_file().then_some(full)
    };
    if program.contains(std::path::MAIN_SEPARATOR) {
        if let Some(full) = in_project(program) {
            *program = full.to_string_lossy().into_owned();
        }
    }
    for arg in args.iter_mut() {
        if let Some(full) = in_project(arg) {
            log::debug!("resolved {} to {}", arg, full.display());
            *arg = full.to_string_lossy().into_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.popsize, 4);
        assert_eq!(cfg.generations, 4);
        assert_eq!(cfg.mutation, 0.5);
        assert_eq!(cfg.crossover, 0.9);
        assert_eq!(cfg.direction, Direction::Minimize);
        assert_eq!(cfg.metric, "max_disp");
        assert_eq!(cfg.target, "2");
        assert!(cfg.workers >= 1 && cfg.workers <= 4);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.manifest_path(), PathBuf::from("template.inp.params.json"));
    }

    #[test]
    fn test_partial_yaml() {
        let cfg = RunConfig::from_yaml(
            "popsize: 12\ngenerations: 30\ndirection: max\nmetric: max_stress\nsolver:\n  program: /opt/solver\n",
        )
        .unwrap();
        assert_eq!(cfg.popsize, 12);
        assert_eq!(cfg.generations, 30);
        assert_eq!(cfg.direction, Direction::Maximize);
        assert_eq!(cfg.metric, "max_stress");
        assert_eq!(cfg.solver.program, "/opt/solver");
        assert_eq!(cfg.solver.artifact_extension, "odb");
        assert_eq!(cfg.crossover, 0.9);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(RunConfig::from_yaml("  \n").unwrap(), RunConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(RunConfig::from_yaml("popsiz: 10\n").is_err());
    }

    #[test]
    fn test_validation() {
        let bad = |f: fn(&mut RunConfig)| {
            let mut cfg = RunConfig::default();
            f(&mut cfg);
            cfg.validate().is_err()
        };
        assert!(bad(|c| c.popsize = 3));
        assert!(bad(|c| c.mutation = 2.1));
        assert!(bad(|c| c.crossover = -0.5));
        assert!(bad(|c| c.workers = 0));
        assert!(bad(|c| c.simulation_timeout_secs = 0.0));
        assert!(bad(|c| c.extraction_timeout_secs = f64::NAN));
        assert!(bad(|c| c.metric = " ".to_string()));
    }

    #[test]
    fn test_de_config_mapping() {
        let mut cfg = RunConfig::default();
        cfg.popsize = 8;
        cfg.generations = 7;
        cfg.seed = Some(3);
        let de = cfg.de_config();
        assert_eq!(de.popsize, 8);
        assert_eq!(de.maxiter, 7);
        assert_eq!(de.seed, Some(3));
        assert!(!de.parallel.enabled);
    }

    #[test]
    fn test_resolve_commands_against_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("parse_odb.py"), "").unwrap();
        std::fs::write(dir.path().join("run.sh"), "").unwrap();
        let mut cfg = RunConfig::default();
        cfg.solver.program = "./run.sh".to_string();
        cfg.resolve_commands(dir.path());

        assert_eq!(PathBuf::from(&cfg.solver.program), dir.path().join("./run.sh"));
        assert_eq!(cfg.solver.args[0], "job={job}");
        assert_eq!(cfg.extractor.program, "abaqus");
        assert_eq!(cfg.extractor.args[0], "python");
        assert_eq!(PathBuf::from(&cfg.extractor.args[1]), dir.path().join("parse_odb.py"));
        assert_eq!(cfg.extractor.args[2], "{artifact}");
    }
}
