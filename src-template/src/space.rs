use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// One tunable parameter with its inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

/// Ordered, validated list of parameters. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    params: Vec<Parameter>,
}

impl ParameterSpace {
    /// Validate names and bounds. Empty spaces, duplicates, non-finite bounds
    /// and `lower > upper` are rejected.
    pub fn new(params: Vec<Parameter>) -> Result<Self, TemplateError> {
        if params.is_empty() {
            return Err(TemplateError::EmptyParameterSpace);
        }
        let mut seen = HashSet::new();
        for p in &params {
            if !seen.insert(p.name.as_str()) {
                return Err(TemplateError::DuplicateParameter(p.name.clone()));
            }
            if !(p.lower.is_finite() && p.upper.is_finite() && p.lower <= p.upper) {
                return Err(TemplateError::InvalidBounds {
                    name: p.name.clone(),
                    lower: p.lower,
                    upper: p.upper,
                });
            }
        }
        Ok(Self { params })
    }

    /// Build from `(name, lower, upper)` triples.
    pub fn from_triples<S: Into<String>>(
        triples: impl IntoIterator<Item = (S, f64, f64)>,
    ) -> Result<Self, TemplateError> {
        Self::new(
            triples
                .into_iter()
                .map(|(name, lower, upper)| Parameter { name: name.into(), lower, upper })
                .collect(),
        )
    }

    pub fn count_parameters(&self) -> usize {
        self.params.len()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.params.iter().map(|p| (p.lower, p.upper)).collect()
    }

    /// `true` if every component of `x` is within its range.
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.params.len()
            && x.iter().zip(&self.params).all(|(&v, p)| v >= p.lower && v <= p.upper)
    }
}
