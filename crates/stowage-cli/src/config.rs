//! CLI configuration management.
//!
//! A YAML defaults file supplies store and compression settings; flags and
//! `INPUT_*` variables always win over it.

use crate::commands::CacheArgs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stowage_core::config::parse_multiline;
use stowage_core::{CacheConfig, CompressionMethod, Error, Result, StoreSettings};

/// Defaults loaded from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub bucket: Option<String>,
    pub key_prefix: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub compression_method: Option<CompressionMethod>,
    pub compression_level: Option<u32>,
    /// Multipart download part size in bytes.
    pub part_size: Option<u64>,
    /// Ranged reads in flight at once.
    pub concurrency: Option<usize>,
}

impl CliConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the empty configuration; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Configuration(format!("Invalid config {}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Get the configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "stowage", "stowage")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }
}

/// Pick the first non-blank value.
fn pick(flag: &Option<String>, file: &Option<String>) -> Option<String> {
    flag.iter()
        .chain(file.iter())
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Merge command-line inputs over file defaults.
pub fn resolve(args: &CacheArgs, file: &CliConfig) -> Result<(CacheConfig, StoreSettings)> {
    let bucket = pick(&args.s3_bucket, &file.bucket)
        .ok_or_else(|| Error::Configuration("s3-bucket is required".to_string()))?;
    let region = pick(&args.aws_region, &file.region)
        .ok_or_else(|| Error::Configuration("aws-region is required".to_string()))?;

    let method = match args.compression_method.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.parse()?,
        _ => file.compression_method.unwrap_or_default(),
    };
    let level = args
        .compression_level
        .or(file.compression_level)
        .unwrap_or(stowage_core::DEFAULT_COMPRESSION_LEVEL);

    let mut config = CacheConfig::new(
        args.key.trim(),
        parse_multiline(&args.path),
        bucket,
        args.repository.trim(),
        args.git_ref.trim(),
    )
    .with_restore_keys(parse_multiline(&args.restore_keys))
    .with_compression(method, level);

    if let Some(prefix) = pick(&args.s3_prefix, &file.key_prefix) {
        config = config.with_key_prefix(prefix);
    }

    let mut settings = StoreSettings::new(
        args.aws_access_key_id.trim(),
        args.aws_secret_access_key.trim(),
        region,
    );
    if let Some(endpoint) = pick(&args.s3_endpoint, &file.endpoint_url) {
        settings = settings.with_endpoint(endpoint);
    }
    let part_size = file.part_size.unwrap_or(settings.part_size);
    let concurrency = file.concurrency.unwrap_or(settings.concurrency);
    settings = settings.with_transfer(part_size, concurrency);

    config.validate()?;
    settings.validate()?;
    Ok((config, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CacheArgs {
        CacheArgs {
            key: " deps-v1 ".into(),
            path: "target\n\n  ~/.cargo/registry  \n".into(),
            restore_keys: "deps-\n".into(),
            aws_access_key_id: "id".into(),
            aws_secret_access_key: "secret".into(),
            aws_region: None,
            s3_bucket: Some("flag-bucket".into()),
            s3_prefix: None,
            compression_level: None,
            compression_method: None,
            s3_endpoint: None,
            repository: "owner/repo".into(),
            git_ref: "main".into(),
        }
    }

    fn file() -> CliConfig {
        CliConfig::parse(
            "bucket: file-bucket\nregion: eu-west-1\nkey_prefix: ci\ncompression_method: zstd\npart_size: 1048576\n",
        )
        .unwrap()
    }

    #[test]
    fn test_flags_win_over_file() {
        let (config, settings) = resolve(&args(), &file()).unwrap();
        assert_eq!(config.bucket, "flag-bucket");
        assert_eq!(config.key, "deps-v1");
        assert_eq!(config.paths, vec!["target", "~/.cargo/registry"]);
        assert_eq!(config.restore_keys, vec!["deps-"]);
        assert_eq!(config.key_prefix, "ci");
        assert_eq!(config.compression_method, CompressionMethod::Zstd);
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.part_size, 1024 * 1024);
        assert_eq!(settings.concurrency, stowage_core::config::DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_defaults_without_file() {
        let mut args = args();
        args.aws_region = Some("us-east-1".into());
        let (config, settings) = resolve(&args, &CliConfig::default()).unwrap();
        assert_eq!(config.key_prefix, "github-actions-cache");
        assert_eq!(config.compression_level, 6);
        assert_eq!(config.compression_method, CompressionMethod::Gzip);
        assert_eq!(settings.endpoint_url, None);
        assert_eq!(settings.part_size, stowage_core::config::DEFAULT_PART_SIZE);
        assert_eq!(settings.concurrency, stowage_core::config::DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_transfer_tuning_from_file() {
        let file = CliConfig {
            concurrency: Some(3),
            ..file()
        };
        let (_, settings) = resolve(&args(), &file).unwrap();
        assert_eq!(settings.part_size, 1024 * 1024);
        assert_eq!(settings.concurrency, 3);
    }

    #[test]
    fn test_missing_bucket_and_region() {
        let mut args = args();
        args.s3_bucket = Some("  ".into());
        assert!(matches!(
            resolve(&args, &file()),
            Ok((ref config, _)) if config.bucket == "file-bucket"
        ));
        assert!(matches!(
            resolve(&args, &CliConfig::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut bad_method = args();
        bad_method.compression_method = Some("brotli".into());
        assert!(matches!(resolve(&bad_method, &file()), Err(Error::Configuration(_))));

        let mut bad_level = args();
        bad_level.compression_level = Some(12);
        assert!(matches!(resolve(&bad_level, &file()), Err(Error::Configuration(_))));

        let mut no_repo = args();
        no_repo.repository = String::new();
        assert!(matches!(resolve(&no_repo, &file()), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stowage.yaml");
        std::fs::write(&path, "endpoint_url: http://localhost:9000\nconcurrency: 2\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.concurrency, Some(2));
        assert_eq!(config.bucket, None);
    }
}
