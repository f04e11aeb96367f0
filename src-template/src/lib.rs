//! Parameter space and template model for simulation inputs
//!
//! A template is a plain-text problem description where tunable numeric fields
//! have been replaced by `${name}` placeholders. The [`ParameterSpace`] fixes the
//! order of the vector handed to [`Template::render`] and the inclusive range of
//! every component.
//!
//! - [`space`]: named parameters and their bounds
//! - [`template`]: placeholder parsing and deterministic rendering
//! - [`manifest`]: the persisted parameter list written by the authoring step
//! - [`bounds`]: default bounds suggested from an original literal value
//! - [`editor`]: non-interactive authoring of a template from a baseline input
//! - [`source`]: lazily loaded, process-wide cached template

pub mod bounds;
pub mod editor;
pub mod error;
pub mod manifest;
pub mod source;
pub mod space;
pub mod template;

pub use bounds::suggest_bounds;
pub use editor::{ParameterSite, TemplateEditor};
pub use error::TemplateError;
pub use manifest::{ManifestEntry, TemplateManifest};
pub use source::TemplateSource;
pub use space::{Parameter, ParameterSpace};
pub use template::Template;
