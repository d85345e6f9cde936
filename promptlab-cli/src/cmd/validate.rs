use std::path::Path;

use promptlab_core::validate_manifest;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

use super::manifest::{read_manifest, violation_lines};

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: String,
    jobs: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
    let parsed = match read_manifest(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let format = format!("{:?}", parsed.format);
    let jobs = parsed.manifest.images.len() * parsed.manifest.models.len();

    match validate_manifest(&parsed.manifest) {
        Ok(()) => {
            if output.format == OutputFormat::Text && !output.quiet {
                println!("ok: valid batch manifest ({format}, {jobs} jobs)");
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ValidateResult {
                        valid: true,
                        format,
                        jobs,
                        errors: vec![],
                    },
                );
            }
            exit_codes::SUCCESS
        }
        Err(err) => {
            let errors = violation_lines(&err);
            if output.format == OutputFormat::Text && !output.quiet {
                eprintln!("error: validation failed");
                for e in &errors {
                    eprintln!("- {e}");
                }
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ValidateResult {
                        valid: false,
                        format,
                        jobs,
                        errors,
                    },
                );
            }
            exit_codes::VALIDATION_FAILED
        }
    }
}
