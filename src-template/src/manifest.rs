use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::space::{Parameter, ParameterSpace};

/// One parameterized site, as written by the editor.
///
/// `lower`/`upper` are `None` when no bounds could be suggested (zero
/// original value); they must be filled in by hand before optimizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
    pub original_value: String,
    /// 1-based line number in the source file.
    pub line: usize,
    /// 1-based field index on that line.
    pub field: usize,
}

/// Sidecar describing a template's parameters, stored as JSON next to it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateManifest {
    #[serde(default)]
    pub template: Option<PathBuf>,
    pub parameters: Vec<ManifestEntry>,
}

impl TemplateManifest {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), TemplateError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| TemplateError::io(path, e))
    }

    /// Default sidecar location: `<template>.params.json`.
    pub fn sidecar_path(template: &Path) -> PathBuf {
        let mut name = template.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".params.json");
        template.with_file_name(name)
    }

    /// Build the parameter space, in manifest order.
    pub fn to_space(&self) -> Result<ParameterSpace, TemplateError> {
        let params = self
            .parameters
            .iter()
            .map(|e| match (e.lower, e.upper) {
                (Some(lower), Some(upper)) => Ok(Parameter { name: e.name.clone(), lower, upper }),
                _ => Err(TemplateError::MissingBounds {
                    name: e.name.clone(),
                    original_value: e.original_value.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        ParameterSpace::new(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, lower: Option<f64>, upper: Option<f64>) -> ManifestEntry {
        ManifestEntry {
            name: name.to_string(),
            lower,
            upper,
            original_value: "1.0".to_string(),
            line: 3,
            field: 1,
        }
    }

    #[test]
    fn test_to_space_keeps_order() {
        let m = TemplateManifest {
            template: None,
            parameters: vec![entry("x2", Some(0.0), Some(1.0)), entry("x1", Some(-1.0), Some(0.0))],
        };
        let space = m.to_space().unwrap();
        assert_eq!(space.names(), vec!["x2", "x1"]);
    }

    #[test]
    fn test_missing_bounds_rejected() {
        let m = TemplateManifest { template: None, parameters: vec![entry("x1", None, Some(1.0))] };
        assert!(matches!(m.to_space(), Err(TemplateError::MissingBounds { .. })));
    }

    #[test]
    fn test_sidecar_path() {
        let p = TemplateManifest::sidecar_path(Path::new("/tmp/model_template.inp"));
        assert_eq!(p, PathBuf::from("/tmp/model_template.inp.params.json"));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(TemplateManifest::load(&path), Err(TemplateError::Manifest(_))));
    }
}
