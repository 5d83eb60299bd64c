//! Cache types.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Lowest accepted compression level.
pub const MIN_COMPRESSION_LEVEL: u32 = 1;
/// Highest accepted compression level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;
/// Level used when none is configured.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Compression applied to the tar container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    #[default]
    Gzip,
    Zstd,
}

impl CompressionMethod {
    /// File extension of an archive produced with this method.
    pub fn extension(self) -> &'static str {
        match self {
            CompressionMethod::Gzip => "tar.gz",
            CompressionMethod::Zstd => "tar.zst",
        }
    }

    /// Name of the local temporary archive for this method.
    pub fn archive_file_name(self) -> String {
        format!("cache.{}", self.extension())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompressionMethod::Gzip => "gzip",
            CompressionMethod::Zstd => "zstd",
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "gzip" => Ok(CompressionMethod::Gzip),
            "zstd" => Ok(CompressionMethod::Zstd),
            other => Err(Error::Configuration(format!(
                "compression-method must be either `gzip` or `zstd`, got `{}`",
                other
            ))),
        }
    }
}

/// Check that a compression level lies in the accepted range.
pub fn validate_compression_level(level: u32) -> Result<u32> {
    if (MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&level) {
        Ok(level)
    } else {
        Err(Error::Configuration(format!(
            "compression-level must be between {} and {}, got {}",
            MIN_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL, level
        )))
    }
}

/// Fully qualified key of a cache archive inside the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectLocation(String);

impl ObjectLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectLocation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What to pack into an archive and how to compress it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePlan {
    pub paths: Vec<PathBuf>,
    pub compression_level: u32,
    pub method: CompressionMethod,
}

impl ArchivePlan {
    /// Build a plan, rejecting an empty path set or an out-of-range level.
    pub fn new(paths: Vec<PathBuf>, compression_level: u32, method: CompressionMethod) -> Result<Self> {
        let plan = Self {
            paths,
            compression_level,
            method,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(Error::Archive(
                "No paths provided for archive creation".to_string(),
            ));
        }
        validate_compression_level(self.compression_level)?;
        Ok(())
    }
}

/// A byte range of a remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferRange {
    pub offset: u64,
    pub length: u64,
}

impl TransferRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Value for an HTTP `Range` header (inclusive bounds).
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.offset, self.end() - 1)
    }
}

/// Informational metadata attached to an uploaded archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub repository: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub key: String,
    pub created: String,
}

impl CacheMetadata {
    /// Metadata stamped with the current time.
    pub fn now(repository: &str, git_ref: &str, key: &str) -> Self {
        Self::at(repository, git_ref, key, Utc::now())
    }

    pub fn at(repository: &str, git_ref: &str, key: &str, created: DateTime<Utc>) -> Self {
        Self {
            repository: repository.to_string(),
            git_ref: git_ref.to_string(),
            key: key.to_string(),
            created: created.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Flatten into store-level string pairs.
    pub fn to_map(&self) -> HashMap<String, String> {
        HashMap::from([
            ("repository".to_string(), self.repository.clone()),
            ("ref".to_string(), self.git_ref.clone()),
            ("key".to_string(), self.key.clone()),
            ("created".to_string(), self.created.clone()),
        ])
    }
}
