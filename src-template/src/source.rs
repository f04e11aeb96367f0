use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::TemplateError;
use crate::template::Template;

/// Template loaded on first use from a persisted file and cached for the
/// lifetime of the source.
///
/// Safe to share between workers: whichever thread asks first loads it; racing
/// loaders read the same file and the first stored result wins.
#[derive(Debug)]
pub struct TemplateSource {
    path: PathBuf,
    order: Vec<String>,
    cell: OnceLock<Template>,
}

impl TemplateSource {
    /// `order` is the parameter order of the vectors that will be rendered.
    pub fn new(path: impl Into<PathBuf>, order: Vec<String>) -> Self {
        Self { path: path.into(), order, cell: OnceLock::new() }
    }

    /// Already-parsed template, nothing to load.
    pub fn preloaded(template: Template) -> Self {
        let order = template.names().to_vec();
        let cell = OnceLock::new();
        let _ = cell.set(template);
        Self { path: PathBuf::new(), order, cell }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of values each rendered vector must carry.
    pub fn dimension(&self) -> usize {
        self.order.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Load errors are not cached; the next call retries.
    pub fn get(&self) -> Result<&Template, TemplateError> {
        if let Some(t) = self.cell.get() {
            return Ok(t);
        }
        let names: Vec<&str> = self.order.iter().map(String::as_str).collect();
        let template = Template::load(&self.path)?.aligned_to(&names)?;
        Ok(self.cell.get_or_init(|| template))
    }

    pub fn render(&self, values: &[f64]) -> Result<String, TemplateError> {
        self.get()?.render(values)
    }
}
