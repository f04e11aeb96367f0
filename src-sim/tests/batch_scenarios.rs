#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ndarray::Array1;
use simtune_de::{BatchEvaluator, DEConfigBuilder, DifferentialEvolution, Direction, UNEVALUABLE};
use simtune_sim::{CommandExtractor, CommandSolver, Coordinator, EvaluationPipeline, PipelineSettings};
use simtune_template::{Template, TemplateSource};

/// Copies the input deck to `<job>.odb`; decks starting with `9` hang.
fn sh_solver() -> CommandSolver {
    CommandSolver {
        program: "sh".into(),
        args: vec![
            "-c".into(),
            r#"if grep -q '^9' "$2"; then exec sleep 30; fi; cp "$2" "$1.odb""#.into(),
            "solver".into(),
            "{job}".into(),
            "{input}".into(),
        ],
        artifact_extension: "odb".into(),
    }
}

/// Evaluates the deck as `(x - 5)^2` using awk.
fn sh_extractor() -> CommandExtractor {
    CommandExtractor {
        program: "sh".into(),
        args: vec![
            "-c".into(),
            r#"awk '{ printf "%.9f\n", ($1 - 5) * ($1 - 5) }' "$1""#.into(),
            "extract".into(),
            "{artifact}".into(),
        ],
    }
}

fn coordinator(root: &Path, timeout: Duration) -> Coordinator<EvaluationPipeline> {
    let template = Template::parse("${x1}\n").unwrap();
    let settings = PipelineSettings {
        result_dir: root.join("result"),
        simulation_timeout: timeout,
        extraction_timeout: Duration::from_secs(10),
        ..PipelineSettings::default()
    };
    let pipeline = EvaluationPipeline::new(
        Arc::new(TemplateSource::preloaded(template)),
        Box::new(sh_solver()),
        Box::new(sh_extractor()),
        settings,
    )
    .unwrap();
    Coordinator::new(pipeline, 4)
}

#[test]
fn test_one_of_four_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let c = coordinator(dir.path(), Duration::from_millis(500));
    let batch: Vec<Array1<f64>> = [1.0, 9.0, 5.0, 7.0].iter().map(|&v| Array1::from(vec![v])).collect();

    let start = Instant::now();
    let out = c.evaluate_batch(&batch).unwrap();
    assert!(start.elapsed() < Duration::from_secs(20));

    assert_eq!(out.len(), 4);
    assert_eq!(out.iter().filter(|&&f| f == UNEVALUABLE).count(), 1);
    assert_eq!(out[1], UNEVALUABLE);
    assert!((out[0] - 16.0).abs() < 1e-9);
    assert!(out[2].abs() < 1e-9);
    assert!((out[3] - 4.0).abs() < 1e-9);

    // every job got its own directory
    assert_eq!(std::fs::read_dir(dir.path().join("result")).unwrap().count(), 4);
}

#[test]
fn test_short_run_through_real_processes() {
    let dir = tempfile::tempdir().unwrap();
    let c = coordinator(dir.path(), Duration::from_secs(10));
    let mut de = DifferentialEvolution::new(&c, Array1::from(vec![0.0]), Array1::from(vec![8.0]));
    *de.config_mut() = DEConfigBuilder::new()
        .seed(11)
        .popsize(4)
        .maxiter(3)
        .direction(Direction::Minimize)
        .build();
    let report = de.solve().unwrap();

    assert_eq!(report.nit, 3);
    assert_eq!(report.nfev, 16);
    assert_eq!(report.nfail, 0);
    let x = report.x[0];
    assert!((0.0..=8.0).contains(&x));
    // rendered with six digits, so the metric matches the rounded vector
    let rounded: f64 = format!("{:.6}", x).parse().unwrap();
    assert!((report.fun - (rounded - 5.0).powi(2)).abs() < 1e-6);
}
