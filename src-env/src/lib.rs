//! Environment utilities and constants for simtune

pub mod constants;
pub mod env_utils;

pub use constants::*;
pub use env_utils::{EnvError, clean_result_dir, get_project_dir, get_result_dir, resolve_in_project};
