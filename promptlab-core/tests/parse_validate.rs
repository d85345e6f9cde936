use promptlab_core::{
    load_manifest_str, parse_manifest_str, validate_manifest, ManifestError, ManifestFormat,
    DEFAULT_INSTRUCTION,
};

fn minimal_valid_yaml() -> &'static str {
    r#"
endpoint: https://api.example.com/v1/describe
models: [vision-small, vision-large]
images:
  - path: images/cat.png
  - path: images/dog.jpg
    id: doggo
"#
}

fn violation_paths(input: &str) -> Vec<String> {
    let parsed = parse_manifest_str(input, ManifestFormat::Auto).unwrap();
    let err = validate_manifest(&parsed.manifest).unwrap_err();
    err.violations.into_iter().map(|v| v.path).collect()
}

#[test]
fn parse_yaml_and_validate_ok() {
    let parsed = parse_manifest_str(minimal_valid_yaml(), ManifestFormat::Yaml).unwrap();
    validate_manifest(&parsed.manifest).unwrap();
    assert_eq!(parsed.manifest.timeout_ms, 60_000);
    assert_eq!(parsed.manifest.instruction(), DEFAULT_INSTRUCTION);
}

#[test]
fn parse_auto_detects_yaml() {
    let parsed = parse_manifest_str(minimal_valid_yaml(), ManifestFormat::Auto).unwrap();
    assert_eq!(parsed.format, ManifestFormat::Yaml);
}

#[test]
fn parse_auto_detects_json() {
    let json = r#"{ "endpoint": "https://api.example.com/x", "models": ["m1"], "images": [ { "path": "a.png" } ], "responsePointer": "/prompt", "settings": { "concurrency": 3, "retryAttempts": 0 } }"#;
    let parsed = parse_manifest_str(json, ManifestFormat::Auto).unwrap();
    assert_eq!(parsed.format, ManifestFormat::Json);
    let settings = parsed.manifest.settings.unwrap();
    assert_eq!(settings.concurrency, Some(3));
    assert_eq!(settings.retry_attempts, Some(0));
}

#[test]
fn negative_concurrency_is_a_parse_error() {
    let input = r#"
endpoint: https://api.example.com/x
models: [m1]
images: [{ path: a.png }]
settings:
  concurrency: -2
"#;
    assert!(parse_manifest_str(input, ManifestFormat::Yaml).is_err());
}

#[test]
fn unknown_settings_field_is_rejected() {
    let input = r#"
endpoint: https://api.example.com/x
models: [m1]
images: [{ path: a.png }]
settings:
  workers: 4
"#;
    assert!(parse_manifest_str(input, ManifestFormat::Yaml).is_err());
}

#[test]
fn validate_rejects_empty_models_and_images() {
    let paths = violation_paths("endpoint: https://api.example.com/x\nmodels: []\nimages: []\n");
    assert!(paths.contains(&"models".to_string()));
    assert!(paths.contains(&"images".to_string()));
}

#[test]
fn validate_rejects_bad_endpoint() {
    let paths = violation_paths("endpoint: ftp://example.com/x\nmodels: [m]\nimages: [{path: a.png}]\n");
    assert_eq!(paths, vec!["endpoint".to_string()]);

    let paths = violation_paths("endpoint: not a url\nmodels: [m]\nimages: [{path: a.png}]\n");
    assert_eq!(paths, vec!["endpoint".to_string()]);
}

#[test]
fn validate_rejects_duplicate_models_and_image_ids() {
    let input = r#"
endpoint: https://api.example.com/x
models: [m1, m1]
images:
  - path: one/cat.png
  - path: two/cat.jpg
"#;
    let paths = violation_paths(input);
    assert!(paths.contains(&"models[1]".to_string()));
    assert!(paths.contains(&"images[1].id".to_string()));
}

#[test]
fn validate_rejects_bad_pointer_timeout_headers_and_settings() {
    let input = r#"
endpoint: https://api.example.com/x
models: [m1]
images: [{ path: a.png }]
responsePointer: prompt
timeoutMs: 0
headers:
  "Bad Header": x
settings:
  concurrency: 0
  jitterRatio: 1.5
"#;
    let paths = violation_paths(input);
    for expected in [
        "responsePointer",
        "timeoutMs",
        "headers.Bad Header",
        "settings.concurrency",
        "settings.jitterRatio",
    ] {
        assert!(paths.contains(&expected.to_string()), "missing {expected}: {paths:?}");
    }
}

#[test]
fn load_manifest_reports_parse_and_validation_errors() {
    assert!(matches!(
        load_manifest_str("endpoint: [unclosed"),
        Err(ManifestError::Parse(_))
    ));
    assert!(matches!(
        load_manifest_str("endpoint: https://x.test/\nmodels: []\nimages: [{path: a.png}]\n"),
        Err(ManifestError::Validation(_))
    ));
    assert!(load_manifest_str(minimal_valid_yaml()).is_ok());
}
