//! Non-interactive template authoring.
//!
//! A baseline input deck is loaded, numeric fields on data lines are selected by
//! `(line, field)` (both 1-based) and replaced with `${xK}` placeholders. The
//! result is a template plus its manifest.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::bounds::suggest_bounds;
use crate::error::TemplateError;
use crate::manifest::{ManifestEntry, TemplateManifest};

static DATA_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[\d.,\s\-+eE]|\$\{\w+\})+$").unwrap_or_else(|e| panic!("data line regex: {}", e))
});

/// Trailing comment: optional commas, then `*` to end of line.
static TRAILING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",*\s*\*.*$").unwrap_or_else(|e| panic!("comment regex: {}", e)));

static PLACEHOLDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").unwrap_or_else(|e| panic!("placeholder regex: {}", e)));

/// A `(line, field)` position, both 1-based. Parses from `LINE:FIELD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSite {
    pub line: usize,
    pub field: usize,
}

impl FromStr for ParameterSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (line, field) = s
            .split_once(':')
            .ok_or_else(|| format!("expected LINE:FIELD, got '{}'", s))?;
        let line: usize = line.trim().parse().map_err(|_| format!("invalid line number '{}'", line))?;
        let field: usize =
            field.trim().parse().map_err(|_| format!("invalid field number '{}'", field))?;
        if line == 0 || field == 0 {
            return Err("line and field numbers start at 1".to_string());
        }
        Ok(Self { line, field })
    }
}

impl fmt::Display for ParameterSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.field)
    }
}

pub struct TemplateEditor {
    source: Option<PathBuf>,
    lines: Vec<String>,
    trailing_newline: bool,
    entries: Vec<ManifestEntry>,
    next_index: usize,
}

impl TemplateEditor {
    pub fn from_text(text: &str) -> Self {
        Self {
            source: None,
            lines: text.lines().map(str::to_string).collect(),
            trailing_newline: text.ends_with('\n'),
            entries: Vec::new(),
            next_index: 1,
        }
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
        let mut editor = Self::from_text(&text);
        editor.source = Some(path.to_path_buf());
        log::info!("loaded {} ({} lines)", path.display(), editor.lines.len());
        Ok(editor)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// A data line holds only comma-separated numbers (or placeholders),
    /// optionally followed by a `*` comment.
    pub fn is_data_line(line: &str) -> bool {
        let code = strip_comment(line);
        !code.trim().is_empty() && DATA_LINE.is_match(code)
    }

    /// Trimmed fields of a line, comment removed. Empty trailing fields left by
    /// a final comma are dropped.
    pub fn parse_data_line(line: &str) -> Vec<String> {
        let mut fields: Vec<String> =
            field_spans(line).into_iter().map(|(s, e)| line[s..e].to_string()).collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        fields
    }

    /// Numbered listing of `count` lines starting at 1-based `from`, with
    /// field indices under each data line.
    pub fn display(&self, from: usize, count: usize) -> String {
        let start = from.max(1) - 1;
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate().skip(start).take(count) {
            out.push_str(&format!("{:4} | {}\n", i + 1, line.trim_end()));
            if Self::is_data_line(line) {
                let fields = Self::parse_data_line(line);
                let listed: Vec<String> =
                    fields.iter().enumerate().map(|(j, f)| format!("[{}] {}", j + 1, f)).collect();
                out.push_str(&format!("     | fields: {}\n", listed.join(", ")));
            }
        }
        out
    }

    /// Replace the numeric value at `site` with a fresh `${xK}` placeholder.
    ///
    /// Only the selected field changes; spacing, other fields, trailing commas
    /// and comments are kept as they were.
    pub fn parameterize(&mut self, site: ParameterSite) -> Result<&ManifestEntry, TemplateError> {
        let len = self.lines.len();
        if site.line == 0 || site.line > len {
            return Err(TemplateError::LineOutOfRange { line: site.line, len });
        }
        let line = &self.lines[site.line - 1];
        if !Self::is_data_line(line) {
            return Err(TemplateError::NotADataLine { line: site.line });
        }

        let spans: Vec<(usize, usize)> = {
            let mut spans = field_spans(line);
            while spans.last().is_some_and(|(s, e)| s == e) {
                spans.pop();
            }
            spans
        };
        if site.field == 0 || site.field > spans.len() {
            return Err(TemplateError::FieldOutOfRange {
                line: site.line,
                field: site.field,
                count: spans.len(),
            });
        }
        let (start, end) = spans[site.field - 1];
        let original = line[start..end].to_string();
        let value: f64 = original.parse().map_err(|_| TemplateError::NonNumericField {
            line: site.line,
            field: site.field,
            value: original.clone(),
        })?;

        let (prefix, suffix) = (line[..start].to_string(), line[end..].to_string());

        let name = self.fresh_name();
        self.lines[site.line - 1] = format!("{}${{{}}}{}", prefix, name, suffix);

        let (lower, upper) = match suggest_bounds(value) {
            Some((lo, hi)) => (Some(lo), Some(hi)),
            None => {
                log::warn!(
                    "{} at {} has original value {}: no bounds suggested, set them in the manifest",
                    name,
                    site,
                    original
                );
                (None, None)
            }
        };
        log::info!("parameterized {} ({} -> ${{{}}})", site, original, name);
        self.entries.push(ManifestEntry {
            name,
            lower,
            upper,
            original_value: original,
            line: site.line,
            field: site.field,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn template_text(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }

    pub fn manifest(&self, template_path: Option<PathBuf>) -> TemplateManifest {
        TemplateManifest { template: template_path, parameters: self.entries.clone() }
    }

    /// Write the template and its manifest. Fails when nothing was parameterized.
    pub fn save(&self, template_path: &Path, manifest_path: &Path) -> Result<TemplateManifest, TemplateError> {
        if self.entries.is_empty() {
            return Err(TemplateError::NoPlaceholders);
        }
        std::fs::write(template_path, self.template_text())
            .map_err(|e| TemplateError::io(template_path, e))?;
        let manifest = self.manifest(Some(template_path.to_path_buf()));
        manifest.save(manifest_path)?;
        log::info!(
            "saved template {} and manifest {}{}",
            template_path.display(),
            manifest_path.display(),
            self.source.as_ref().map(|s| format!(" (from {})", s.display())).unwrap_or_default()
        );
        Ok(manifest)
    }

    /// Next `xK` not already present in the text or the manifest.
    fn fresh_name(&mut self) -> String {
        loop {
            let candidate = format!("x{}", self.next_index);
            self.next_index += 1;
            let used_in_text = self.lines.iter().any(|l| {
                PLACEHOLDER_NAME.captures_iter(l).any(|c| c.get(1).is_some_and(|m| m.as_str() == candidate))
            });
            if !used_in_text && !self.entries.iter().any(|e| e.name == candidate) {
                return candidate;
            }
        }
    }
}

fn strip_comment(line: &str) -> &str {
    match TRAILING_COMMENT.find(line) {
        Some(m) => &line[..m.start()],
        None => line,
    }
}

/// Byte spans of the trimmed comma-separated fields of `line`, comment excluded.
fn field_spans(line: &str) -> Vec<(usize, usize)> {
    let code = strip_comment(line);
    if code.trim().is_empty() {
        return Vec::new();
    }
    let mut spans = Vec::new();
    let mut offset = 0;
    for part in code.split(',') {
        let lead = part.len() - part.trim_start().len();
        let trimmed = part.trim();
        let start = offset + lead;
        spans.push((start, start + trimmed.len()));
        offset += part.len() + 1;
    }
    spans
}
