use std::path::Path;
use std::sync::Arc;

use promptlab_core::plan_jobs;
use promptlab_exec::runner::{
    EventSink, MetricsCollector, MetricsEventSink, NoOpEventSink, StderrEventSink,
};
use promptlab_exec::{
    CancellationToken, GenerationClient, HttpClient, ReqwestHttpClient, RunConfig, RunError,
    TaskError, TaskRunner,
};
use secrecy::SecretString;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{AuthArgs, EventsTarget, OutputArgs, SettingsArgs};

use super::manifest::{base_dir, layered_settings, load_manifest};
use super::progress::progress_line;

#[derive(Serialize)]
struct JobReport<'a> {
    index: usize,
    job_id: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a TaskError>,
}

#[derive(Serialize)]
struct RunReport<'a> {
    status: &'static str,
    total: usize,
    succeeded: usize,
    failed: usize,
    jobs: Vec<JobReport<'a>>,
    metrics: serde_json::Value,
}

pub async fn run_cmd(
    path: &Path,
    events: EventsTarget,
    output: OutputArgs,
    settings: SettingsArgs,
    auth: AuthArgs,
) -> i32 {
    let manifest = match load_manifest(path, &output) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let settings = layered_settings(&manifest, &settings);
    let mut config = match RunConfig::from_settings(&settings) {
        Ok(c) => c,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let api_key = match std::env::var(&auth.api_key_env) {
        Ok(v) if !v.is_empty() => Some(SecretString::from(v)),
        _ => {
            tracing::debug!(var = %auth.api_key_env, "no API key set; requests are unauthenticated");
            None
        }
    };

    let http: Arc<dyn HttpClient> = match ReqwestHttpClient::new() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let client = match GenerationClient::from_manifest(&manifest, http, api_key) {
        Ok(c) => c,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let jobs = plan_jobs(&manifest, base_dir(path));

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; cancelling run");
                cancel.cancel();
            }
        }
    });
    config = config.with_cancellation(cancel);
    if output.format == OutputFormat::Text && !output.quiet {
        config = config.with_progress(progress_line());
    }

    let base_sink: Arc<dyn EventSink> = match events {
        EventsTarget::Stderr => Arc::new(StderrEventSink),
        EventsTarget::None => Arc::new(NoOpEventSink),
    };
    let metrics = Arc::new(MetricsCollector::new());
    let runner = TaskRunner::new(config)
        .with_event_sink(Arc::new(MetricsEventSink::new(metrics.clone(), base_sink)));

    let client = &client;
    let tasks: Vec<_> = jobs
        .iter()
        .map(|job| move || async move { client.generate(job).await })
        .collect();

    let result = runner.run(&tasks).await;
    ctrl_c.abort();

    let res = match result {
        Ok(r) => r,
        Err(RunError::Cancelled) => {
            print_error(output.format, output.quiet, "run cancelled");
            return exit_codes::CANCELLED;
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let status = if res.all_succeeded() { "succeeded" } else { "partial" };
    match output.format {
        OutputFormat::Json => {
            let report = RunReport {
                status,
                total: res.total,
                succeeded: res.succeeded(),
                failed: res.failed(),
                jobs: jobs
                    .iter()
                    .zip(&res.results)
                    .map(|(job, outcome)| JobReport {
                        index: job.index,
                        job_id: &job.job_id,
                        status: if outcome.is_ok() { "ok" } else { "error" },
                        prompt: outcome.as_ref().ok().map(|p| p.prompt.as_str()),
                        error: outcome.as_ref().err(),
                    })
                    .collect(),
                metrics: metrics.get_metrics().await.to_json(),
            };
            print_result(output.format, output.quiet, &report);
        }
        OutputFormat::Text => {
            if !output.quiet {
                for (job, outcome) in jobs.iter().zip(&res.results) {
                    match outcome {
                        Ok(p) => println!("ok     {}: {}", job.job_id, p.prompt),
                        Err(e) => println!("error  {}: {e} (after {} attempts)", job.job_id, e.attempts),
                    }
                }
                println!(
                    "Run {status}: {} succeeded, {} failed, {} total",
                    res.succeeded(),
                    res.failed(),
                    res.total
                );
            }
        }
    }

    if res.all_succeeded() {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUN_FAILED
    }
}
