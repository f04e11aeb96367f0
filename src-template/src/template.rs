use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::TemplateError;

/// `${name}` placeholder, `name` made of word characters.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w+)\}").unwrap_or_else(|e| panic!("placeholder regex: {}", e))
});

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param(usize),
}

/// Parsed template: literal text interleaved with parameter slots.
///
/// Parameters are ordered by first appearance unless re-ordered with
/// [`Template::aligned_to`]. Every occurrence of a name is a substitution site.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
    names: Vec<String>,
}

impl Template {
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(text[last..whole.start()].to_string()));
            }
            let idx = match names.iter().position(|n| n == name.as_str()) {
                Some(i) => i,
                None => {
                    names.push(name.as_str().to_string());
                    names.len() - 1
                }
            };
            segments.push(Segment::Param(idx));
            last = whole.end();
        }
        if names.is_empty() {
            return Err(TemplateError::NoPlaceholders);
        }
        if last < text.len() {
            segments.push(Segment::Literal(text[last..].to_string()));
        }
        Ok(Self { segments, names })
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
        let template = Self::parse(&text)?;
        log::debug!(
            "loaded template {} with {} parameters: {}",
            path.display(),
            template.names.len(),
            template.names.join(", ")
        );
        Ok(template)
    }

    /// Re-order parameter slots to follow `order` (usually the parameter space).
    ///
    /// The two name sets must be identical.
    pub fn aligned_to(self, order: &[&str]) -> Result<Self, TemplateError> {
        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|n| !order.contains(&n.as_str()))
            .cloned()
            .collect();
        let unexpected: Vec<String> = order
            .iter()
            .filter(|o| !self.names.iter().any(|n| n == *o))
            .map(|o| o.to_string())
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() || order.len() != self.names.len() {
            return Err(TemplateError::ParameterSetMismatch { missing, unexpected });
        }

        let remap: Vec<usize> = self
            .names
            .iter()
            .map(|n| order.iter().position(|o| o == n).unwrap_or_default())
            .collect();
        let segments = self
            .segments
            .into_iter()
            .map(|s| match s {
                Segment::Param(i) => Segment::Param(remap[i]),
                lit => lit,
            })
            .collect();
        Ok(Self { segments, names: order.iter().map(|o| o.to_string()).collect() })
    }

    pub fn count_parameters(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Substitute every placeholder with its component, printed with six
    /// fractional digits. Pure: no filesystem access.
    pub fn render(&self, values: &[f64]) -> Result<String, TemplateError> {
        if values.len() != self.names.len() {
            return Err(TemplateError::ParameterCountMismatch {
                expected: self.names.len(),
                got: values.len(),
            });
        }
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Param(i) => out.push_str(&format!("{:.6}", values[*i])),
            }
        }
        Ok(out)
    }
}
