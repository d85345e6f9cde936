use std::path::Path;

use promptlab_core::{
    parse_manifest_str, validate_manifest, BatchManifest, ManifestFormat, ParsedManifest,
    RunSettings, ValidationError,
};

use crate::exit_codes;
use crate::output::{print_error, OutputFormat};
use crate::{OutputArgs, SettingsArgs};

/// Read and parse a manifest. On failure the error is already printed and the
/// exit code is returned.
pub fn read_manifest(path: &Path, output: &OutputArgs) -> Result<ParsedManifest, i32> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("failed to read {}: {e}", path.display()),
        );
        exit_codes::RUNTIME_ERROR
    })?;

    parse_manifest_str(&content, ManifestFormat::Auto).map_err(|e| {
        print_error(output.format, output.quiet, &e.to_string());
        exit_codes::VALIDATION_FAILED
    })
}

/// Read, parse and validate; every violation is reported before giving up.
pub fn load_manifest(path: &Path, output: &OutputArgs) -> Result<BatchManifest, i32> {
    let parsed = read_manifest(path, output)?;
    match validate_manifest(&parsed.manifest) {
        Ok(()) => Ok(parsed.manifest),
        Err(err) => {
            report_violations(&err, output);
            Err(exit_codes::VALIDATION_FAILED)
        }
    }
}

pub fn violation_lines(err: &ValidationError) -> Vec<String> {
    err.violations
        .iter()
        .map(|v| format!("{}: {}", v.path, v.message))
        .collect()
}

fn report_violations(err: &ValidationError, output: &OutputArgs) {
    if output.quiet {
        return;
    }
    let lines = violation_lines(err);
    match output.format {
        OutputFormat::Text => {
            eprintln!("error: validation failed");
            for line in &lines {
                eprintln!("- {line}");
            }
        }
        OutputFormat::Json => {
            let body = serde_json::json!({"error": "validation failed", "violations": lines});
            eprintln!("{}", serde_json::to_string(&body).unwrap_or_default());
        }
    }
}

/// Directory that relative image paths are resolved against.
pub fn base_dir(manifest_path: &Path) -> Option<&Path> {
    manifest_path.parent()
}

/// Manifest `settings`, overridden by any flags given on the command line.
pub fn layered_settings(manifest: &BatchManifest, flags: &SettingsArgs) -> RunSettings {
    manifest
        .settings
        .clone()
        .unwrap_or_default()
        .merged_with(&flags.to_settings())
}
