mod validator;

use crate::error::ValidationError;
use crate::manifest::BatchManifest;
use validator::Validator;

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for BatchManifest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_manifest(self)
    }
}

pub fn validate_manifest(manifest: &BatchManifest) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.validate_manifest(manifest);
    v.finish()
}
