//! Explicit configuration for cache operations.
//!
//! Everything an operation needs is carried here and passed by value;
//! nothing in the engine reads the process environment.

use crate::cache::{
    CompressionMethod, DEFAULT_COMPRESSION_LEVEL, validate_compression_level,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Key prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "github-actions-cache";
/// Size of one ranged read during multipart download.
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;
/// Maximum number of ranged reads in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Inputs of a single restore or save operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Primary cache key.
    pub key: String,
    /// Paths to archive or restore.
    pub paths: Vec<String>,
    /// Fallback keys tried in order when the primary key misses.
    #[serde(default)]
    pub restore_keys: Vec<String>,
    /// Target bucket.
    pub bucket: String,
    /// Leading segment of every object location.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Compression level (1-9).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Compression method.
    #[serde(default)]
    pub compression_method: CompressionMethod,
    /// Treat a restore miss as a failure.
    #[serde(default)]
    pub fail_on_miss: bool,
    /// Full repository identifier, e.g. `owner/name`.
    pub repository: String,
    /// Branch or tag name.
    #[serde(rename = "ref")]
    pub git_ref: String,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

impl CacheConfig {
    /// Create a config with defaults for everything but the identifying fields.
    pub fn new(
        key: impl Into<String>,
        paths: Vec<String>,
        bucket: impl Into<String>,
        repository: impl Into<String>,
        git_ref: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            paths,
            restore_keys: vec![],
            bucket: bucket.into(),
            key_prefix: default_key_prefix(),
            compression_level: default_compression_level(),
            compression_method: CompressionMethod::default(),
            fail_on_miss: false,
            repository: repository.into(),
            git_ref: git_ref.into(),
        }
    }

    /// Set the restore keys.
    pub fn with_restore_keys(mut self, restore_keys: Vec<String>) -> Self {
        self.restore_keys = restore_keys;
        self
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the compression method and level.
    pub fn with_compression(mut self, method: CompressionMethod, level: u32) -> Self {
        self.compression_method = method;
        self.compression_level = level;
        self
    }

    /// Enable or disable failing on a restore miss.
    pub fn with_fail_on_miss(mut self, fail: bool) -> Self {
        self.fail_on_miss = fail;
        self
    }

    /// Paths as file-system paths.
    pub fn path_bufs(&self) -> Vec<PathBuf> {
        self.paths.iter().map(PathBuf::from).collect()
    }

    /// Check every field an operation relies on.
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(Error::Configuration("key must not be empty".to_string()));
        }
        if self.paths.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::Configuration(
                "At least one path must be specified".to_string(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(Error::Configuration("bucket must not be empty".to_string()));
        }
        if self.repository.trim().is_empty() {
            return Err(Error::Configuration(
                "repository must not be empty".to_string(),
            ));
        }
        if self.git_ref.trim().is_empty() {
            return Err(Error::Configuration("ref must not be empty".to_string()));
        }
        validate_compression_level(self.compression_level)?;
        Ok(())
    }
}

/// Static credentials for the object store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Connection and transfer settings for the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub credentials: StoreCredentials,
    pub region: String,
    /// Custom endpoint for S3-compatible stores; implies path-style addressing.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Bytes per ranged read.
    #[serde(default = "default_part_size")]
    pub part_size: u64,
    /// Ranged reads in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_part_size() -> u64 {
    DEFAULT_PART_SIZE
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl StoreSettings {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            credentials: StoreCredentials {
                access_key_id: access_key_id.into(),
                secret_access_key: secret_access_key.into(),
            },
            region: region.into(),
            endpoint_url: None,
            part_size: default_part_size(),
            concurrency: default_concurrency(),
        }
    }

    /// Point the client at a custom endpoint.
    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Set the multipart download part size and parallelism.
    pub fn with_transfer(mut self, part_size: u64, concurrency: usize) -> Self {
        self.part_size = part_size;
        self.concurrency = concurrency;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.credentials.access_key_id.is_empty() || self.credentials.secret_access_key.is_empty()
        {
            return Err(Error::Configuration(
                "store credentials must not be empty".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(Error::Configuration("region must not be empty".to_string()));
        }
        if self.part_size == 0 {
            return Err(Error::Configuration("part size must be positive".to_string()));
        }
        if self.concurrency == 0 {
            return Err(Error::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split a newline-separated input into trimmed, non-empty entries.
pub fn parse_multiline(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
