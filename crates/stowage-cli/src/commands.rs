//! CLI command definitions.

use clap::{ArgAction, Args, Subcommand, ValueEnum};

#[derive(Subcommand)]
pub enum Commands {
    /// Restore a cache entry into the working directory
    Restore(RestoreArgs),

    /// Archive paths and save them under the cache key
    Save(SaveArgs),
}

/// Inputs shared by restore and save.
#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    /// Primary cache key
    #[arg(long, env = "INPUT_KEY")]
    pub key: String,

    /// Paths to cache, one per line
    #[arg(long, env = "INPUT_PATH")]
    pub path: String,

    /// Fallback keys, one per line, tried in order
    #[arg(long, env = "INPUT_RESTORE_KEYS", default_value = "")]
    pub restore_keys: String,

    /// Access key ID for the object store
    #[arg(long, env = "INPUT_AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: String,

    /// Secret access key for the object store
    #[arg(long, env = "INPUT_AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: String,

    /// Store region
    #[arg(long, env = "INPUT_AWS_REGION")]
    pub aws_region: Option<String>,

    /// Bucket holding cache archives
    #[arg(long, env = "INPUT_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Location prefix inside the bucket
    #[arg(long, env = "INPUT_S3_PREFIX")]
    pub s3_prefix: Option<String>,

    /// Compression level (1-9)
    #[arg(long, env = "INPUT_COMPRESSION_LEVEL")]
    pub compression_level: Option<u32>,

    /// Compression method (gzip or zstd)
    #[arg(long, env = "INPUT_COMPRESSION_METHOD")]
    pub compression_method: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[arg(long, env = "INPUT_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY", default_value = "")]
    pub repository: String,

    /// Branch or tag name
    #[arg(long = "ref", env = "GITHUB_REF_NAME", default_value = "")]
    pub git_ref: String,
}

#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Fail when no cache entry matches
    #[arg(
        long,
        env = "INPUT_FAIL_ON_CACHE_MISS",
        default_value_t = false,
        action = ArgAction::Set
    )]
    pub fail_on_cache_miss: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Token for the job status lookup
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
