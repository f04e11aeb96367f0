//! simtune - differential evolution tuning of external simulations
//! Command-line interface definitions
//!
//! Copyright (C) 2025 simtune developers
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use simtune_de::Direction;
use simtune_template::ParameterSite;

use crate::config::RunConfig;

#[derive(Parser, Debug)]
#[command(name = "simtune", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the optimization against the external solver.
    Optimize(OptimizeArgs),
    /// Turn numeric fields of a baseline input into template parameters.
    Mark(MarkArgs),
    /// Print numbered lines of an input, with field indices on data lines.
    Show(ShowArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct OptimizeArgs {
    /// YAML run configuration. Defaults to simtune.yaml in the project dir if present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Template file with ${name} placeholders.
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Parameter manifest (defaults to <template>.params.json).
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Population size N (>= 4).
    #[arg(long)]
    pub popsize: Option<usize>,

    /// Number of generations G.
    #[arg(short, long)]
    pub generations: Option<usize>,

    /// Differential weight F in [0, 2].
    #[arg(long)]
    pub mutation: Option<f64>,

    /// Crossover probability CR in [0, 1].
    #[arg(long)]
    pub crossover: Option<f64>,

    /// Random seed for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Concurrent evaluations.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Optimization direction: min or max.
    #[arg(long)]
    pub direction: Option<Direction>,

    /// Metric name passed to the extractor.
    #[arg(long)]
    pub metric: Option<String>,

    /// Observation target passed to the extractor (e.g. a node label).
    #[arg(long)]
    pub target: Option<String>,

    /// Simulation timeout in seconds.
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Extraction timeout in seconds.
    #[arg(long)]
    pub extraction_timeout: Option<f64>,

    /// Result directory for job folders.
    #[arg(long)]
    pub result_dir: Option<PathBuf>,

    /// Write the per-generation history CSV into this directory.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Empty the result directory before starting.
    #[arg(long)]
    pub clean: bool,

    /// Delete each job directory after a successful evaluation.
    #[arg(long)]
    pub discard_jobs: bool,
}

impl OptimizeArgs {
    /// Command-line values win over the configuration file.
    pub fn apply_overrides(&self, cfg: &mut RunConfig) {
        if let Some(v) = &self.template {
            cfg.template = v.clone();
        }
        if let Some(v) = &self.manifest {
            cfg.manifest = Some(v.clone());
        }
        if let Some(v) = self.popsize {
            cfg.popsize = v;
        }
        if let Some(v) = self.generations {
            cfg.generations = v;
        }
        if let Some(v) = self.mutation {
            cfg.mutation = v;
        }
        if let Some(v) = self.crossover {
            cfg.crossover = v;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if let Some(v) = self.workers {
            cfg.workers = v;
        }
        if let Some(v) = self.direction {
            cfg.direction = v;
        }
        if let Some(v) = &self.metric {
            cfg.metric = v.clone();
        }
        if let Some(v) = &self.target {
            cfg.target = v.clone();
        }
        if let Some(v) = self.timeout {
            cfg.simulation_timeout_secs = v;
        }
        if let Some(v) = self.extraction_timeout {
            cfg.extraction_timeout_secs = v;
        }
        if let Some(v) = &self.result_dir {
            cfg.result_dir = v.clone();
        }
        if let Some(v) = &self.history {
            cfg.history_dir = Some(v.clone());
        }
        if self.clean {
            cfg.clean = true;
        }
        if self.discard_jobs {
            cfg.keep_jobs = false;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct MarkArgs {
    /// Baseline input file.
    #[arg(short, long, default_value = simtune_env::ORIGINAL_INPUT)]
    pub input: PathBuf,

    /// Site to parameterize as LINE:FIELD (1-based); repeat for several.
    #[arg(short, long = "site", required = true)]
    pub sites: Vec<ParameterSite>,

    /// Output template.
    #[arg(short, long, default_value = simtune_env::TEMPLATE_FILE)]
    pub template: PathBuf,

    /// Output manifest (defaults to <template>.params.json).
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Input file to list.
    #[arg(short, long, default_value = simtune_env::ORIGINAL_INPUT)]
    pub input: PathBuf,

    /// First line to show (1-based).
    #[arg(short, long, default_value_t = 1)]
    pub from: usize,

    /// Number of lines to show.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optimize() {
        let cli = Cli::try_parse_from([
            "simtune",
            "optimize",
            "--template",
            "t.inp",
            "--popsize",
            "8",
            "-g",
            "10",
            "--direction",
            "max",
            "--clean",
        ])
        .unwrap();
        let Command::Optimize(args) = cli.command else { panic!("expected optimize") };
        let mut cfg = RunConfig::default();
        args.apply_overrides(&mut cfg);
        assert_eq!(cfg.template, PathBuf::from("t.inp"));
        assert_eq!(cfg.popsize, 8);
        assert_eq!(cfg.generations, 10);
        assert_eq!(cfg.direction, Direction::Maximize);
        assert!(cfg.clean);
        assert!(cfg.keep_jobs);
        assert_eq!(cfg.mutation, 0.5);
    }

    #[test]
    fn test_timeout_overrides() {
        let cli = Cli::try_parse_from([
            "simtune",
            "optimize",
            "--timeout",
            "300",
            "--extraction-timeout",
            "15.5",
        ])
        .unwrap();
        let Command::Optimize(args) = cli.command else { panic!("expected optimize") };
        let mut cfg = RunConfig::default();
        args.apply_overrides(&mut cfg);
        assert_eq!(cfg.simulation_timeout_secs, 300.0);
        assert_eq!(cfg.extraction_timeout_secs, 15.5);
    }

    #[test]
    fn test_parse_mark_sites() {
        let cli =
            Cli::try_parse_from(["simtune", "mark", "-i", "try.inp", "--site", "12:2", "--site", "14:1"]).unwrap();
        let Command::Mark(args) = cli.command else { panic!("expected mark") };
        assert_eq!(args.sites, vec![ParameterSite { line: 12, field: 2 }, ParameterSite { line: 14, field: 1 }]);
        assert_eq!(args.template, PathBuf::from("template.inp"));
    }

    #[test]
    fn test_mark_requires_site() {
        assert!(Cli::try_parse_from(["simtune", "mark"]).is_err());
        assert!(Cli::try_parse_from(["simtune", "mark", "--site", "3"]).is_err());
    }

    #[test]
    fn test_invalid_direction() {
        assert!(Cli::try_parse_from(["simtune", "optimize", "--direction", "sideways"]).is_err());
    }
}
