#![forbid(unsafe_code)]

pub mod error;
pub mod manifest;
pub mod parser;
pub mod plan;
pub mod pointer;
pub mod validate;

pub use crate::error::{ManifestError, ParseError, ValidationError, Violation};
pub use crate::manifest::{BatchManifest, ImageSource, RunSettings, DEFAULT_INSTRUCTION};
pub use crate::parser::{load_manifest_str, parse_manifest_str, ManifestFormat, ParsedManifest};
pub use crate::plan::{plan_jobs, JobSpec};
pub use crate::pointer::{JsonPointer, JsonPointerError};
pub use crate::validate::{validate_manifest, Validate};
