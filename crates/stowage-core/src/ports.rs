//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the cache engine and its
//! storage and packaging adapters.

use crate::cache::{ArchivePlan, CacheMetadata, CompressionMethod, ObjectLocation};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Remote object store holding cache archives.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether an object exists. A clean not-found is `Ok(false)`.
    async fn exists(&self, location: &ObjectLocation) -> Result<bool>;

    /// Download an object into a local file.
    ///
    /// On failure the local file may be partially written and must be discarded.
    async fn download(&self, location: &ObjectLocation, local_path: &Path) -> Result<()>;

    /// Upload a local file, attaching optional metadata. Never retried here.
    async fn upload(
        &self,
        location: &ObjectLocation,
        local_path: &Path,
        metadata: Option<&CacheMetadata>,
    ) -> Result<()>;
}

/// Packs paths into a compressed archive and back.
///
/// Implementations are synchronous; async callers run them on a blocking thread.
pub trait ArchiveCodec: Send + Sync {
    /// Pack and compress `plan.paths` into `output`.
    fn encode(&self, plan: &ArchivePlan, output: &Path) -> Result<()>;

    /// Unpack `archive` into `destination`, or the working directory when unset.
    fn decode(
        &self,
        archive: &Path,
        method: CompressionMethod,
        destination: Option<&Path>,
    ) -> Result<()>;
}
