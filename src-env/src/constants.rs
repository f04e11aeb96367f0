/// Environment variable pointing at the project root (templates, manifests, results).
pub const SIMTUNE_DIR: &str = "SIMTUNE_DIR";

/// Result directory, relative to the project root.
pub const RESULT_DIR: &str = "result";

/// Baseline input deck exported from the pre-processor.
pub const ORIGINAL_INPUT: &str = "try.inp";

/// Template written by `simtune mark`.
pub const TEMPLATE_FILE: &str = "template.inp";

/// Default run configuration file name.
pub const CONFIG_FILE: &str = "simtune.yaml";
