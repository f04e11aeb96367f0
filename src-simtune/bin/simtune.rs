//! simtune - differential evolution tuning of external simulations
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

use std::error::Error;

use clap::Parser;
use simtune::cli::{Cli, Command};
use simtune::workflow;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let project = simtune_env::get_project_dir()?;

    match cli.command {
        Command::Optimize(args) => {
            let cfg = workflow::load_run_config(&args, &project)?;
            println!("🚀 Optimizing {} ({} x {} evaluations)", cfg.template.display(), cfg.popsize, cfg.generations + 1);
            let outcome = workflow::optimize(&cfg, &project)?;
            if outcome.report.success {
                println!("✅ {}", outcome.report.message);
            } else {
                println!("⚠️ {}", outcome.report.message);
            }
            print!("{}", outcome.summary());
        }
        Command::Mark(args) => {
            let manifest = workflow::mark(&args, &project)?;
            println!("💾 Template saved with {} parameters", manifest.parameters.len());
            print!("{}", workflow::describe_manifest(&manifest));
        }
        Command::Show(args) => {
            print!("{}", workflow::show(&args, &project)?);
        }
    }
    Ok(())
}
