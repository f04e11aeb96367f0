use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::DEIntermediate;

/// Records optimization progress via DE callbacks
#[derive(Debug, Clone)]
pub struct OptimizationRecorder {
    /// Run name (used for CSV filename)
    run_name: String,
    /// Shared records storage
    records: Arc<Mutex<Vec<OptimizationRecord>>>,
}

/// One row per generation; generation 0 is the initial population
#[derive(Debug, Clone)]
pub struct OptimizationRecord {
    pub iteration: usize,
    /// Best x found so far
    pub x: Vec<f64>,
    /// Best fitness so far (internal minimization convention)
    pub best_result: f64,
    /// Standard deviation of the evaluable population fitness
    pub convergence: f64,
    /// Trials accepted during this generation
    pub accepted: usize,
    /// Individuals currently holding the unevaluable sentinel
    pub unevaluable: usize,
    /// Whether this generation improved the best known result
    pub is_improvement: bool,
}

impl OptimizationRecorder {
    pub fn new(run_name: String) -> Self {
        Self { run_name, records: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Create a callback function that records optimization progress
    pub fn create_callback(&self) -> Box<dyn FnMut(&DEIntermediate<'_>) + Send> {
        let records = self.records.clone();
        Box::new(move |intermediate: &DEIntermediate<'_>| {
            let unevaluable =
                intermediate.energies.iter().filter(|&&e| !crate::is_evaluable(e)).count();
            records.lock().push(OptimizationRecord {
                iteration: intermediate.iter,
                x: intermediate.x.to_vec(),
                best_result: intermediate.fun,
                convergence: intermediate.convergence,
                accepted: intermediate.accepted,
                unevaluable,
                is_improvement: intermediate.improved,
            });
        })
    }

    /// Save all recorded generations to `<output_dir>/<run_name>.csv`
    pub fn save_to_csv(&self, output_dir: &Path) -> std::io::Result<PathBuf> {
        create_dir_all(output_dir)?;

        let filename = output_dir.join(format!("{}.csv", self.run_name));
        let mut file = File::create(&filename)?;

        let records = self.records.lock();
        if records.is_empty() {
            return Ok(filename);
        }

        let num_dimensions = records[0].x.len();
        write!(file, "iteration,")?;
        for i in 0..num_dimensions {
            write!(file, "x{},", i)?;
        }
        writeln!(file, "best_result,convergence,accepted,unevaluable,is_improvement")?;

        for record in records.iter() {
            write!(file, "{},", record.iteration)?;
            for &xi in &record.x {
                write!(file, "{:.16},", xi)?;
            }
            writeln!(
                file,
                "{:.16},{:.16},{},{},{}",
                record.best_result,
                record.convergence,
                record.accepted,
                record.unevaluable,
                record.is_improvement
            )?;
        }

        Ok(filename)
    }

    /// Get a copy of all recorded generations
    pub fn get_records(&self) -> Vec<OptimizationRecord> {
        self.records.lock().clone()
    }

    pub fn num_iterations(&self) -> usize {
        self.records.lock().len()
    }
}
