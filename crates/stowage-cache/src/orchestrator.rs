//! Restore and save flows.
//!
//! Restore: probe the primary key, then each restore key in order, and unpack the
//! first archive found. Save: keep the paths that exist, skip when the target is
//! already stored, otherwise encode and upload. The temporary archive is owned by
//! a [`ScratchFile`] and removed on every exit path.

use crate::keys::CacheKeyResolver;
use crate::scratch::ScratchFile;
use crate::types::{RestoreOutcome, SaveOutcome, SkipReason};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use stowage_core::{
    ArchiveCodec, ArchivePlan, CacheConfig, CacheMetadata, CompressionMethod, Error,
    ObjectLocation, ObjectStore, Result,
};
use tracing::{info, warn};

/// Sequences key resolution, transfer and packaging for one cache.
pub struct CacheOrchestrator {
    store: Arc<dyn ObjectStore>,
    codec: Arc<dyn ArchiveCodec>,
    work_dir: PathBuf,
}

impl CacheOrchestrator {
    /// Orchestrator working in the current directory.
    pub fn new(store: Arc<dyn ObjectStore>, codec: Arc<dyn ArchiveCodec>) -> Self {
        Self {
            store,
            codec,
            work_dir: PathBuf::from("."),
        }
    }

    /// Directory holding the temporary archive, resolving relative paths and receiving restores.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    fn resolver(config: &CacheConfig) -> CacheKeyResolver {
        CacheKeyResolver::new(
            config.key_prefix.clone(),
            config.repository.clone(),
            config.git_ref.clone(),
            config.compression_method,
        )
    }

    fn scratch_archive(&self, method: CompressionMethod) -> ScratchFile {
        ScratchFile::new(self.work_dir.join(method.archive_file_name()))
    }

    /// Restore the first matching cache entry into the working directory.
    ///
    /// A miss is `Ok` with `cache_hit == false`; the caller decides whether that fails the job.
    pub async fn restore(&self, config: CacheConfig) -> Result<RestoreOutcome> {
        let start = Instant::now();
        config.validate()?;

        let candidates = Self::resolver(&config).candidates(&config.key, &config.restore_keys)?;
        info!(key = %config.key, "Looking for cache with key: {}", config.key);

        for (index, (key, location)) in candidates.into_iter().enumerate() {
            if index == 1 {
                info!("Exact key not found, trying restore keys");
            }
            info!(key, location = %location, "Trying cache key: {}", key);

            if self.store.exists(&location).await? {
                info!(key, "Cache hit found for key: {}", key);
                self.fetch_and_unpack(&location, config.compression_method)
                    .await?;
                info!("Cache restored successfully");
                return Ok(RestoreOutcome::hit(
                    &config.key,
                    key,
                    location,
                    start.elapsed().as_millis() as u64,
                ));
            }
        }

        info!(key = %config.key, "Cache not found");
        Ok(RestoreOutcome::miss(
            &config.key,
            start.elapsed().as_millis() as u64,
        ))
    }

    async fn fetch_and_unpack(
        &self,
        location: &ObjectLocation,
        method: CompressionMethod,
    ) -> Result<()> {
        let archive = self.scratch_archive(method);
        self.store.download(location, archive.path()).await?;

        let codec = Arc::clone(&self.codec);
        let path = archive.path().to_path_buf();
        let destination = self.work_dir.clone();
        tokio::task::spawn_blocking(move || codec.decode(&path, method, Some(&destination)))
            .await
            .map_err(|e| Error::Internal(format!("Archive extraction task failed: {}", e)))?
    }

    /// Archive the configured paths and upload them unless already stored.
    pub async fn save(&self, config: CacheConfig) -> Result<SaveOutcome> {
        let start = Instant::now();
        config.validate()?;
        info!(key = %config.key, "Saving cache with key: {}", config.key);

        let (valid, missing) = validate_paths(&self.work_dir, &config.path_bufs()).await;
        if !missing.is_empty() {
            let missing: Vec<_> = missing.iter().map(|p| p.display().to_string()).collect();
            warn!("Some cache paths do not exist: {}", missing.join(", "));
        }
        if valid.is_empty() {
            warn!("No valid cache paths found, skipping cache save");
            return Ok(SaveOutcome::skipped(SkipReason::NoValidPaths));
        }

        let location = Self::resolver(&config).resolve(&config.key)?;
        info!(location = %location, "Cache location: {}", location);

        if self.store.exists(&location).await? {
            info!("Cache already exists for key {}, skipping save", config.key);
            return Ok(SaveOutcome::skipped(SkipReason::AlreadyExists));
        }

        let plan = ArchivePlan::new(valid, config.compression_level, config.compression_method)?;
        let archive = self.scratch_archive(plan.method);

        let codec = Arc::clone(&self.codec);
        let output = archive.path().to_path_buf();
        tokio::task::spawn_blocking(move || codec.encode(&plan, &output))
            .await
            .map_err(|e| Error::Internal(format!("Archive creation task failed: {}", e)))??;

        let size_bytes = tokio::fs::metadata(archive.path()).await?.len();
        let metadata = CacheMetadata::now(&config.repository, &config.git_ref, &config.key);
        self.store
            .upload(&location, archive.path(), Some(&metadata))
            .await?;

        info!(location = %location, bytes = size_bytes, "Cache saved successfully");
        Ok(SaveOutcome::Saved {
            location,
            size_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Split `paths` into those that exist (relative to `base`) and those that do not.
pub async fn validate_paths(base: &Path, paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut valid = Vec::new();
    let mut missing = Vec::new();

    for path in paths {
        if path.as_os_str().is_empty() {
            continue;
        }
        let resolved = if path.is_absolute() {
            path.clone()
        } else {
            base.join(path)
        };
        if tokio::fs::metadata(&resolved).await.is_ok() {
            valid.push(path.clone());
        } else {
            missing.push(path.clone());
        }
    }

    (valid, missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_paths_splits_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("present")).unwrap();
        std::fs::write(dir.path().join("file.txt"), b"x").unwrap();

        let (valid, missing) = validate_paths(
            dir.path(),
            &[
                PathBuf::from("present"),
                PathBuf::from("absent"),
                PathBuf::from("file.txt"),
                dir.path().join("present"),
            ],
        )
        .await;

        assert_eq!(
            valid,
            vec![
                PathBuf::from("present"),
                PathBuf::from("file.txt"),
                dir.path().join("present")
            ]
        );
        assert_eq!(missing, vec![PathBuf::from("absent")]);
    }
}
