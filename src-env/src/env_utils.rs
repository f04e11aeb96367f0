//! Environment variable utilities for simtune
//!
//! The project root is taken from `SIMTUNE_DIR` when set, otherwise the current
//! working directory. Relative paths in configuration files and on the command
//! line are resolved against it.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::constants::SIMTUNE_DIR;

/// Error type for environment and result-directory issues
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("SIMTUNE_DIR points to a non-existent directory: {0}")]
    ProjectDirNotFound(PathBuf),

    #[error("cannot determine the current directory: {0}")]
    NoCurrentDir(std::io::Error),

    #[error("failed to create result directory {path}: {source}")]
    ResultDirCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clean {path}: {source}")]
    CleanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Get the project root: `SIMTUNE_DIR` if set, else the current directory.
///
/// # Errors
///
/// Returns an error if `SIMTUNE_DIR` points to a non-existent directory or the
/// current directory cannot be read.
pub fn get_project_dir() -> Result<PathBuf, EnvError> {
    project_dir_from(env::var_os(SIMTUNE_DIR))
}

fn project_dir_from(value: Option<OsString>) -> Result<PathBuf, EnvError> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => {
            let path = PathBuf::from(v);
            if !path.is_dir() {
                return Err(EnvError::ProjectDirNotFound(path));
            }
            Ok(path)
        }
        None => env::current_dir().map_err(EnvError::NoCurrentDir),
    }
}

/// Resolve `path` against `project` unless it is already absolute.
pub fn resolve_in_project(project: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { project.join(path) }
}

/// Get the result directory, creating it if necessary.
pub fn get_result_dir(project: &Path, result_dir: &Path) -> Result<PathBuf, EnvError> {
    let dir = resolve_in_project(project, result_dir);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(|source| EnvError::ResultDirCreationFailed { path: dir.clone(), source })?;
    }
    Ok(dir)
}

/// Remove everything inside `dir`, keeping the directory itself.
///
/// Returns the number of removed entries. A missing directory counts as clean.
pub fn clean_result_dir(dir: &Path) -> Result<usize, EnvError> {
    let err = |source| EnvError::CleanFailed { path: dir.to_path_buf(), source };
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir).map_err(err)? {
        let path = entry.map_err(err)?.path();
        let result = if path.is_dir() { std::fs::remove_dir_all(&path) } else { std::fs::remove_file(&path) };
        result.map_err(|source| EnvError::CleanFailed { path: path.clone(), source })?;
        removed += 1;
    }
    log::info!("cleaned {} ({} entries removed)", dir.display(), removed);
    Ok(removed)
}
