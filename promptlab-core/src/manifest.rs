use std::collections::BTreeMap;
use std::path::PathBuf;

/// Instruction sent with every image when the manifest does not provide one.
pub const DEFAULT_INSTRUCTION: &str =
    "Describe this image as a detailed prompt for a text-to-image model.";

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// A batch of image-to-prompt generations: every image is sent to every model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchManifest {
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,

    pub models: Vec<String>,

    pub images: Vec<ImageSource>,

    /// JSON pointer to the generated prompt inside the response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_pointer: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RunSettings>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl BatchManifest {
    pub fn instruction(&self) -> &str {
        self.instruction.as_deref().unwrap_or(DEFAULT_INSTRUCTION)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageSource {
    pub path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ImageSource {
    /// Explicit id, or the file stem of `path`.
    pub fn effective_id(&self) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
    }
}

/// Runner knobs as they appear in manifests and on the command line.
///
/// Every field is optional so layers can be merged; unset fields fall back to
/// the runner defaults.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_base_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_ratio: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl RunSettings {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merged_with(&self, overrides: &RunSettings) -> RunSettings {
        RunSettings {
            concurrency: overrides.concurrency.or(self.concurrency),
            retry_attempts: overrides.retry_attempts.or(self.retry_attempts),
            retry_delay_base_ms: overrides.retry_delay_base_ms.or(self.retry_delay_base_ms),
            jitter_ratio: overrides.jitter_ratio.or(self.jitter_ratio),
            max_delay_ms: overrides.max_delay_ms.or(self.max_delay_ms),
        }
    }
}
