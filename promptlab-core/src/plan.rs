use std::path::{Path, PathBuf};

use crate::manifest::BatchManifest;

/// One image/model pair. `index` is the launch position within the batch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub index: usize,
    pub job_id: String,
    pub image_id: String,
    pub image_path: PathBuf,
    pub model: String,
}

/// Expand the image x model cross product, image-major.
///
/// Relative image paths are resolved against `base_dir` when given (normally
/// the directory holding the manifest).
pub fn plan_jobs(manifest: &BatchManifest, base_dir: Option<&Path>) -> Vec<JobSpec> {
    let mut jobs = Vec::with_capacity(manifest.images.len() * manifest.models.len());
    for (image_idx, image) in manifest.images.iter().enumerate() {
        let image_id = image
            .effective_id()
            .unwrap_or_else(|| format!("image{image_idx}"));
        let image_path = match base_dir {
            Some(dir) if image.path.is_relative() => dir.join(&image.path),
            _ => image.path.clone(),
        };
        for model in &manifest.models {
            jobs.push(JobSpec {
                index: jobs.len(),
                job_id: format!("{image_id}@{model}"),
                image_id: image_id.clone(),
                image_path: image_path.clone(),
                model: model.clone(),
            });
        }
    }
    jobs
}
