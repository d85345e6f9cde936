use std::path::Path;

use promptlab_core::{plan_jobs, JobSpec};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

use super::manifest::{base_dir, load_manifest};

#[derive(Serialize)]
struct PlanResult {
    total: usize,
    models: usize,
    images: usize,
    jobs: Vec<JobSpec>,
}

pub fn plan_cmd(path: &Path, output: OutputArgs) -> i32 {
    let manifest = match load_manifest(path, &output) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let jobs = plan_jobs(&manifest, base_dir(path));

    match output.format {
        OutputFormat::Json => print_result(
            output.format,
            output.quiet,
            &PlanResult {
                total: jobs.len(),
                models: manifest.models.len(),
                images: manifest.images.len(),
                jobs,
            },
        ),
        OutputFormat::Text => {
            if !output.quiet {
                println!(
                    "{} jobs ({} images x {} models)",
                    jobs.len(),
                    manifest.images.len(),
                    manifest.models.len()
                );
                for job in &jobs {
                    println!("  [{}] {}  {}", job.index, job.job_id, job.image_path.display());
                }
            }
        }
    }
    exit_codes::SUCCESS
}
