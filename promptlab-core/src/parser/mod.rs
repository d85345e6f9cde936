use crate::error::{ManifestError, ParseError};
use crate::manifest::BatchManifest;
use crate::validate::validate_manifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub manifest: BatchManifest,
    pub format: ManifestFormat,
}

pub fn parse_manifest_str(input: &str, format: ManifestFormat) -> Result<ParsedManifest, ParseError> {
    match format {
        ManifestFormat::Json => Ok(ParsedManifest {
            manifest: serde_json::from_str::<BatchManifest>(input)?,
            format,
        }),
        ManifestFormat::Yaml => Ok(ParsedManifest {
            manifest: serde_yaml::from_str::<BatchManifest>(input)?,
            format,
        }),
        ManifestFormat::Auto => parse_manifest_auto(input),
    }
}

/// Parse with format auto-detection, then validate.
pub fn load_manifest_str(input: &str) -> Result<BatchManifest, ManifestError> {
    let parsed = parse_manifest_str(input, ManifestFormat::Auto)?;
    validate_manifest(&parsed.manifest)?;
    Ok(parsed.manifest)
}

fn parse_manifest_auto(input: &str) -> Result<ParsedManifest, ParseError> {
    // JSON always starts with `{` or `[` after trimming.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<BatchManifest>(input) {
            Ok(manifest) => Ok(ParsedManifest {
                manifest,
                format: ManifestFormat::Json,
            }),
            Err(e) => match serde_yaml::from_str::<BatchManifest>(input) {
                Ok(manifest) => Ok(ParsedManifest {
                    manifest,
                    format: ManifestFormat::Yaml,
                }),
                Err(_) => Err(ParseError::Json(e)),
            },
        };
    }

    match serde_yaml::from_str::<BatchManifest>(input) {
        Ok(manifest) => Ok(ParsedManifest {
            manifest,
            format: ManifestFormat::Yaml,
        }),
        Err(e) => {
            if let Ok(manifest) = serde_json::from_str::<BatchManifest>(input) {
                return Ok(ParsedManifest {
                    manifest,
                    format: ManifestFormat::Json,
                });
            }
            Err(ParseError::Yaml(e))
        }
    }
}
