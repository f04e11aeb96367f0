//! Shared workflow steps used by the simtune binary
//!
//! Loading and validating the run configuration, building the problem from a
//! template and its manifest, wiring the evaluation pipeline into the engine,
//! and the two template authoring commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ndarray::Array1;
use simtune_de::{DEError, DEIntermediate, DEReport, DifferentialEvolution, Direction, OptimizationRecorder};
use simtune_env::{EnvError, clean_result_dir, get_result_dir, resolve_in_project};
use simtune_sim::{Coordinator, EvaluationPipeline, SimError};
use simtune_template::{ParameterSpace, TemplateEditor, TemplateError, TemplateManifest, TemplateSource};

use crate::cli::{MarkArgs, OptimizeArgs, ShowArgs};
use crate::config::{ConfigError, RunConfig};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Optimizer(#[from] DEError),

    #[error("cannot write history: {0}")]
    History(#[source] std::io::Error),
}

/// Configuration file (explicit, or `simtune.yaml` in the project if present),
/// then command-line overrides, then paths and command scripts resolved
/// against the project.
pub fn load_run_config(args: &OptimizeArgs, project: &Path) -> Result<RunConfig, WorkflowError> {
    let path = match &args.config {
        Some(p) => Some(resolve_in_project(project, p)),
        None => Some(project.join(simtune_env::CONFIG_FILE)).filter(|p| p.is_file()),
    };
    let mut cfg = match path {
        Some(p) => {
            log::info!("loading configuration from {}", p.display());
            RunConfig::load(&p)?
        }
        None => RunConfig::default(),
    };
    args.apply_overrides(&mut cfg);

    cfg.template = resolve_in_project(project, &cfg.template);
    cfg.manifest = cfg.manifest.as_deref().map(|m| resolve_in_project(project, m));
    cfg.result_dir = resolve_in_project(project, &cfg.result_dir);
    cfg.history_dir = cfg.history_dir.as_deref().map(|h| resolve_in_project(project, h));
    cfg.resolve_commands(project);
    cfg.validate()?;
    Ok(cfg)
}

/// Parameter space and template, checked against each other.
pub struct Problem {
    pub space: ParameterSpace,
    pub source: Arc<TemplateSource>,
}

pub fn load_problem(cfg: &RunConfig) -> Result<Problem, WorkflowError> {
    let manifest = TemplateManifest::load(&cfg.manifest_path())?;
    let space = manifest.to_space()?;
    let names = space.names().into_iter().map(String::from).collect();
    let source = Arc::new(TemplateSource::new(&cfg.template, names));
    // a missing template or a name mismatch must stop the run before any job
    source.get()?;
    log::info!(
        "{} parameters from {}: {}",
        space.count_parameters(),
        cfg.template.display(),
        space.names().join(", ")
    );
    Ok(Problem { space, source })
}

pub struct RunOutcome {
    pub names: Vec<String>,
    pub report: DEReport,
    pub elapsed: Duration,
    pub history: Option<PathBuf>,
}

impl RunOutcome {
    pub fn best_parameters(&self) -> Vec<(&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.report.x.iter().copied()).collect()
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        match self.report.objective() {
            Some(v) => out.push_str(&format!("best objective: {:.6}\n", v)),
            None => out.push_str("no evaluable solution: every evaluation failed\n"),
        }
        for (name, value) in self.best_parameters() {
            out.push_str(&format!("  {} = {:.6}\n", name, value));
        }
        out.push_str(&format!(
            "{} generations, {} evaluations ({} failed) in {:.1}s\n",
            self.report.nit,
            self.report.nfev,
            self.report.nfail,
            self.elapsed.as_secs_f64()
        ));
        if let Some(h) = &self.history {
            out.push_str(&format!("history: {}\n", h.display()));
        }
        out
    }
}

pub fn format_parameters(names: &[String], x: &[f64]) -> String {
    names.iter().zip(x).map(|(n, v)| format!("{}={:.6}", n, v)).collect::<Vec<_>>().join(", ")
}

fn progress_callback(
    names: Vec<String>,
    direction: Direction,
    mut record: Box<dyn FnMut(&DEIntermediate<'_>) + Send>,
) -> Box<dyn FnMut(&DEIntermediate<'_>) + Send> {
    Box::new(move |it: &DEIntermediate<'_>| {
        record(it);
        if it.iter == 0 || it.improved {
            let label = if it.iter == 0 { "initial best".to_string() } else { format!("gen {} new best", it.iter) };
            match direction.to_external(it.fun) {
                Some(v) => log::info!("{}: {:.6} [{}]", label, v, format_parameters(&names, &it.x.to_vec())),
                None => log::warn!("{}: nothing evaluable yet", label),
            }
        }
    })
}

pub fn optimize(cfg: &RunConfig, project: &Path) -> Result<RunOutcome, WorkflowError> {
    let started = Instant::now();
    if cfg.clean {
        clean_result_dir(&resolve_in_project(project, &cfg.result_dir))?;
    }
    let result_dir = get_result_dir(project, &cfg.result_dir)?;
    let problem = load_problem(cfg)?;
    let names: Vec<String> = problem.space.names().into_iter().map(String::from).collect();

    let pipeline = EvaluationPipeline::new(
        problem.source.clone(),
        Box::new(cfg.solver.clone()),
        Box::new(cfg.extractor.clone()),
        cfg.pipeline_settings(result_dir),
    )?;
    let coordinator = Coordinator::new(pipeline, cfg.workers);
    log::info!(
        "population {}, {} generations, {} workers, {} {} at {}",
        cfg.popsize,
        cfg.generations,
        coordinator.workers(),
        cfg.direction,
        cfg.metric,
        cfg.target
    );

    let run_name = format!("simtune_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let recorder = OptimizationRecorder::new(run_name);
    let mut de_config = cfg.de_config();
    de_config.callback = Some(progress_callback(names.clone(), cfg.direction, recorder.create_callback()));

    let (lower, upper): (Vec<f64>, Vec<f64>) = problem.space.bounds().into_iter().unzip();
    let mut de = DifferentialEvolution::new(&coordinator, Array1::from(lower), Array1::from(upper));
    *de.config_mut() = de_config;
    let report = de.solve()?;

    let history = match &cfg.history_dir {
        Some(dir) => Some(recorder.save_to_csv(dir).map_err(WorkflowError::History)?),
        None => None,
    };
    Ok(RunOutcome { names, report, elapsed: started.elapsed(), history })
}

/// Parameterize the requested sites and write the template and manifest.
pub fn mark(args: &MarkArgs, project: &Path) -> Result<TemplateManifest, WorkflowError> {
    let input = resolve_in_project(project, &args.input);
    let template = resolve_in_project(project, &args.template);
    let manifest = match &args.manifest {
        Some(m) => resolve_in_project(project, m),
        None => TemplateManifest::sidecar_path(&template),
    };

    let mut editor = TemplateEditor::load(&input)?;
    for &site in &args.sites {
        editor.parameterize(site)?;
    }
    Ok(editor.save(&template, &manifest)?)
}

/// Manifest entries formatted for the terminal; zero-valued sites are flagged.
pub fn describe_manifest(manifest: &TemplateManifest) -> String {
    let mut out = String::new();
    for e in &manifest.parameters {
        match (e.lower, e.upper) {
            (Some(lo), Some(hi)) => out.push_str(&format!(
                "  {} (line {}, field {}): {} -> bounds [{}, {}]\n",
                e.name, e.line, e.field, e.original_value, lo, hi
            )),
            _ => out.push_str(&format!(
                "  {} (line {}, field {}): {} -> no bounds suggested, set lower/upper by hand\n",
                e.name, e.line, e.field, e.original_value
            )),
        }
    }
    out
}

pub fn show(args: &ShowArgs, project: &Path) -> Result<String, WorkflowError> {
    let editor = TemplateEditor::load(&resolve_in_project(project, &args.input))?;
    Ok(editor.display(args.from, args.count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parameters() {
        let names = vec!["x1".to_string(), "x2".to_string()];
        assert_eq!(format_parameters(&names, &[1.0, -0.25]), "x1=1.000000, x2=-0.250000");
    }

    #[test]
    fn test_describe_manifest_flags_zero_sites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("try.inp"), " 1, 2.5, 0.0\n").unwrap();
        let args = MarkArgs {
            input: PathBuf::from("try.inp"),
            sites: vec!["1:2".parse().unwrap(), "1:3".parse().unwrap()],
            template: PathBuf::from("template.inp"),
            manifest: None,
        };
        let manifest = mark(&args, dir.path()).unwrap();
        let text = describe_manifest(&manifest);
        assert!(text.contains("x1 (line 1, field 2): 2.5 -> bounds [0.25, 25]"));
        assert!(text.contains("x2 (line 1, field 3): 0.0 -> no bounds suggested"));
        assert!(dir.path().join("template.inp.params.json").is_file());
    }

    #[test]
    fn test_missing_manifest_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = OptimizeArgs { template: Some(PathBuf::from("nope.inp")), ..OptimizeArgs::default() };
        let cfg = load_run_config(&args, dir.path()).unwrap();
        assert!(matches!(load_problem(&cfg), Err(WorkflowError::Template(TemplateError::Io { .. }))));
    }

    #[test]
    fn test_template_manifest_disagreement() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("t.inp"), "${x1} ${x3}\n").unwrap();
        let manifest = TemplateManifest {
            template: None,
            parameters: vec![
                simtune_template::ManifestEntry {
                    name: "x1".into(),
                    lower: Some(0.0),
                    upper: Some(1.0),
                    original_value: "0.5".into(),
                    line: 1,
                    field: 1,
                },
                simtune_template::ManifestEntry {
                    name: "x2".into(),
                    lower: Some(0.0),
                    upper: Some(1.0),
                    original_value: "0.5".into(),
                    line: 1,
                    field: 2,
                },
            ],
        };
        manifest.save(&dir.path().join("t.inp.params.json")).unwrap();
        let args = OptimizeArgs { template: Some(PathBuf::from("t.inp")), ..OptimizeArgs::default() };
        let cfg = load_run_config(&args, dir.path()).unwrap();
        assert!(matches!(
            load_problem(&cfg),
            Err(WorkflowError::Template(TemplateError::ParameterSetMismatch { .. }))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_extractor_finds_project_script() {
        use simtune_sim::ExtractionStrategy;

        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();
        // `python` stands in for the interpreter: it checks the script path and prints a value
        std::fs::write(project.join("python"), "test -f \"$1\" && echo 3.5\n").unwrap();
        std::fs::write(project.join("parse_odb.py"), "").unwrap();
        std::fs::write(project.join("simtune.yaml"), "extractor:\n  program: sh\n").unwrap();

        let cfg = load_run_config(&OptimizeArgs::default(), project).unwrap();
        let job_dir = project.join("result").join("job_1_abcd");
        std::fs::create_dir_all(&job_dir).unwrap();
        let artifact = job_dir.join("job_1_abcd.odb");
        std::fs::write(&artifact, "").unwrap();

        let value = cfg.extractor.extract(&artifact, &cfg.metric, &cfg.target, Duration::from_secs(10)).unwrap();
        assert_eq!(value, 3.5);
    }
}
