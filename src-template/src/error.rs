use std::path::PathBuf;

/// Errors raised while loading, authoring, or rendering templates.
///
/// All of them are configuration errors: they mean the setup is broken, not
/// that a particular sample was bad.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("template has no ${{name}} placeholders")]
    NoPlaceholders,

    #[error("parameter count mismatch: template needs {expected} values, got {got}")]
    ParameterCountMismatch { expected: usize, got: usize },

    #[error("template and parameter space disagree: missing {missing:?}, unexpected {unexpected:?}")]
    ParameterSetMismatch { missing: Vec<String>, unexpected: Vec<String> },

    #[error("parameter space is empty")]
    EmptyParameterSpace,

    #[error("duplicate parameter name: {0}")]
    DuplicateParameter(String),

    #[error("invalid bounds for {name}: [{lower}, {upper}] must be finite with lower <= upper")]
    InvalidBounds { name: String, lower: f64, upper: f64 },

    #[error(
        "parameter {name} has no bounds (original value {original_value}); set lower/upper in the manifest"
    )]
    MissingBounds { name: String, original_value: String },

    #[error("line {line} is out of range (file has {len} lines)")]
    LineOutOfRange { line: usize, len: usize },

    #[error("line {line} is not a numeric data line")]
    NotADataLine { line: usize },

    #[error("field {field} is out of range on line {line} ({count} fields)")]
    FieldOutOfRange { line: usize, field: usize, count: usize },

    #[error("field {field} on line {line} is not numeric: {value:?}")]
    NonNumericField { line: usize, field: usize, value: String },
}

impl TemplateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplateError::Io { path: path.into(), source }
    }
}
