//! simtune - tune the parameters of an external simulation
//!
//! This crate wires the member crates into a command-line tool:
//!
//! - `simtune_de`: fixed-generation differential evolution engine
//! - `simtune_template`: parameter spaces, templates and their manifests
//! - `simtune_sim`: isolated solver jobs and the parallel batch coordinator
//! - `simtune_env`: project directory and result directory handling

pub use simtune_de as de;
pub use simtune_sim as sim;
pub use simtune_template as template;

/// Command-line interface definitions
pub mod cli;
/// YAML run configuration
pub mod config;
/// Shared workflow steps used by the binary
pub mod workflow;

pub use cli::{Cli, Command};
pub use config::{ConfigError, RunConfig};
pub use workflow::{RunOutcome, WorkflowError};
