use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ValidationError, Violation};
use crate::manifest::{BatchManifest, RunSettings};
use crate::pointer::JsonPointer;

pub(crate) static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-/:]+$").expect("valid"));
pub(crate) static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[!#$%&'*+.^_`|~0-9A-Za-z\-]+$").expect("valid"));

pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    pub fn validate_manifest(&mut self, m: &BatchManifest) {
        self.validate_endpoint(&m.endpoint);

        if m.models.is_empty() {
            self.push("models", "must have at least one entry");
        }
        let mut models = HashSet::new();
        for (idx, model) in m.models.iter().enumerate() {
            let path = format!("models[{idx}]");
            if !NAME_RE.is_match(model) {
                self.push(&path, "must match regex [A-Za-z0-9_.\\-/:]+");
            }
            if !models.insert(model.as_str()) {
                self.push(&path, "must be unique within the manifest");
            }
        }

        if m.images.is_empty() {
            self.push("images", "must have at least one entry");
        }
        let mut image_ids = HashSet::new();
        for (idx, image) in m.images.iter().enumerate() {
            let path = format!("images[{idx}]");
            if image.path.as_os_str().is_empty() {
                self.push(format!("{path}.path"), "must not be empty");
            }
            match image.effective_id() {
                Some(id) => {
                    if !NAME_RE.is_match(&id) {
                        self.push(format!("{path}.id"), "must match regex [A-Za-z0-9_.\\-/:]+");
                    }
                    if !image_ids.insert(id) {
                        self.push(
                            format!("{path}.id"),
                            "must be unique within the manifest (set an explicit id)",
                        );
                    }
                }
                None => self.push(
                    format!("{path}.id"),
                    "cannot be derived from the path; set an explicit id",
                ),
            }
        }

        if let Some(ptr) = &m.response_pointer {
            if let Err(e) = JsonPointer::parse(ptr) {
                self.push("responsePointer", format!("invalid json pointer: {e}"));
            }
        }

        if m.timeout_ms == 0 {
            self.push("timeoutMs", "must be a positive integer");
        }

        for name in m.headers.keys() {
            if !HEADER_RE.is_match(name) {
                self.push(format!("headers.{name}"), "not a valid HTTP header name");
            }
        }

        if let Some(settings) = &m.settings {
            self.validate_settings("settings", settings);
        }
    }

    fn validate_endpoint(&mut self, endpoint: &str) {
        match url::Url::parse(endpoint) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            Ok(u) => self.push(
                "endpoint",
                format!("unsupported URL scheme '{}' (expected http or https)", u.scheme()),
            ),
            Err(e) => self.push("endpoint", format!("must be an absolute URL: {e}")),
        }
    }

    fn validate_settings(&mut self, path: &str, s: &RunSettings) {
        if s.concurrency == Some(0) {
            self.push(format!("{path}.concurrency"), "must be a positive integer");
        }
        if let Some(ratio) = s.jitter_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                self.push(format!("{path}.jitterRatio"), "must be between 0 and 1");
            }
        }
    }

    pub(crate) fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }
}
