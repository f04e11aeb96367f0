//! Fitness values and optimization direction.
//!
//! The engine always minimizes. A candidate whose objective could not be
//! computed carries [`UNEVALUABLE`], which is `+inf`: it loses every strict
//! `<` comparison against a finite value and is never picked as a new best.

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Fitness of a candidate that could not be evaluated.
pub const UNEVALUABLE: f64 = f64::INFINITY;

/// `true` when `f` is a real result rather than the sentinel.
pub fn is_evaluable(f: f64) -> bool {
    !f.is_nan() && f != UNEVALUABLE
}

/// Map NaN onto the sentinel so ordering stays total for selection.
pub fn sanitize(f: f64) -> f64 {
    if f.is_nan() { UNEVALUABLE } else { f }
}

/// Index and value of the smallest fitness; ties keep the first occurrence.
pub(crate) fn argmin(v: &Array1<f64>) -> (usize, f64) {
    let mut best_i = 0usize;
    let mut best_v = v[0];
    for (i, &val) in v.iter().enumerate() {
        if val < best_v {
            best_v = val;
            best_i = i;
        }
    }
    (best_i, best_v)
}

/// Population standard deviation over the evaluable entries only.
///
/// Returns `+inf` when nothing in the population has been evaluated.
pub(crate) fn evaluable_std(v: &Array1<f64>) -> f64 {
    let vals: Vec<f64> = v.iter().copied().filter(|&f| is_evaluable(f)).collect();
    if vals.is_empty() {
        return f64::INFINITY;
    }
    let n = vals.len() as f64;
    let mean = vals.iter().sum::<f64>() / n;
    (vals.iter().map(|f| (f - mean) * (f - mean)).sum::<f64>() / n).sqrt()
}

/// Whether the caller wants the objective minimized or maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "min", alias = "minimize")]
    Minimize,
    #[serde(rename = "max", alias = "maximize")]
    Maximize,
}

impl Direction {
    /// Objective value in the engine's minimization convention.
    pub fn to_internal(self, value: f64) -> f64 {
        match self {
            Direction::Minimize => value,
            Direction::Maximize => -value,
        }
    }

    /// Engine fitness back in the caller's convention; `None` for the sentinel.
    pub fn to_external(self, fitness: f64) -> Option<f64> {
        if !is_evaluable(fitness) {
            return None;
        }
        Some(match self {
            Direction::Minimize => fitness,
            Direction::Maximize => -fitness,
        })
    }
}

impl FromStr for Direction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "min" | "minimize" => Ok(Direction::Minimize),
            "max" | "maximize" => Ok(Direction::Maximize),
            _ => Err(format!("unknown optimization direction: {}", s)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Minimize => write!(f, "min"),
            Direction::Maximize => write!(f, "max"),
        }
    }
}
