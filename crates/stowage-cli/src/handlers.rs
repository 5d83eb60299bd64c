//! Command handlers.

use crate::commands::{RestoreArgs, SaveArgs};
use crate::config::{self, CliConfig};
use crate::github::{JobContext, JobStatus, JobStatusClient};
use crate::outputs::{self, CACHE_HIT_STATE, CommandFile, OUTPUT_FILE_VAR};
use std::sync::Arc;
use stowage_cache::{
    CacheOrchestrator, RestoreOutcome, S3ObjectStore, SaveOutcome, SkipReason, TarArchiver,
};
use stowage_core::{CacheConfig, Error, StoreSettings};
use tracing::{info, warn};

fn orchestrator(config: &CacheConfig, settings: &StoreSettings) -> stowage_core::Result<CacheOrchestrator> {
    let store = S3ObjectStore::new(settings, &config.bucket)?;
    Ok(CacheOrchestrator::new(
        Arc::new(store),
        Arc::new(TarArchiver::default()),
    ))
}

/// Restore the cache and publish step outputs.
pub async fn restore(args: RestoreArgs, file: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Restore phase starting");
    let (config, settings) = config::resolve(&args.cache, file)?;
    let config = config.with_fail_on_miss(args.fail_on_cache_miss);

    let outcome = orchestrator(&config, &settings)?.restore(config.clone()).await?;

    outputs::write_restore_outputs(&CommandFile::from_env(OUTPUT_FILE_VAR), &outcome)?;
    if outcome.exact_match {
        outputs::save_state(CACHE_HIT_STATE, "true")?;
    }

    check_miss(&config, &outcome)?;
    Ok(())
}

/// Fail a miss when the configuration asks for it.
pub fn check_miss(config: &CacheConfig, outcome: &RestoreOutcome) -> stowage_core::Result<()> {
    if !outcome.cache_hit && config.fail_on_miss {
        return Err(Error::CacheMiss(format!(
            "{} (fail-on-cache-miss is enabled)",
            config.key
        )));
    }
    Ok(())
}

/// Whether the restore step recorded an exact hit.
pub fn already_restored(state: Option<&str>) -> bool {
    state.map(str::trim) == Some("true")
}

/// Skip reason for a job that did not succeed.
pub fn job_skip(status: &JobStatus) -> Option<SkipReason> {
    status
        .vetoes_save()
        .then(|| SkipReason::JobFailed(status.to_string()))
}

async fn current_job_status(token: Option<String>) -> JobStatus {
    match JobContext::from_env(token) {
        Some(context) => JobStatusClient::new().job_status(&context).await,
        None => {
            warn!("Missing GitHub Actions environment or token to determine job status");
            JobStatus::Unknown
        }
    }
}

fn report(outcome: &SaveOutcome) {
    match outcome {
        SaveOutcome::Saved {
            location,
            size_bytes,
            duration_ms,
        } => info!(
            location = %location,
            bytes = size_bytes,
            duration_ms,
            "Cache saved"
        ),
        SaveOutcome::Skipped { reason } => info!(reason = %reason, "Cache save skipped: {}", reason),
    }
}

/// Save the cache unless the job failed or the primary key was already restored.
pub async fn save(args: SaveArgs, file: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    if already_restored(outputs::read_state(CACHE_HIT_STATE).as_deref()) {
        report(&SaveOutcome::skipped(SkipReason::AlreadyRestored));
        return Ok(());
    }

    info!("Save phase starting");
    let (config, settings) = config::resolve(&args.cache, file)?;

    let status = current_job_status(args.github_token).await;
    if let Some(reason) = job_skip(&status) {
        report(&SaveOutcome::skipped(reason));
        return Ok(());
    }
    if status == JobStatus::Unknown {
        warn!("Job status is unknown, saving cache anyway");
    }

    let outcome = orchestrator(&config, &settings)?.save(config).await?;
    report(&outcome);
    Ok(())
}
