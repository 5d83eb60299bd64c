//! S3-backed CI cache engine for stowage.
//!
//! Resolves cache keys to object locations, moves archives to and from the
//! object store, and packs local paths into compressed tar archives.

pub mod archiver;
pub mod compression;
pub mod keys;
pub mod orchestrator;
pub mod scratch;
pub mod store;
pub mod transfer;
pub mod types;

pub use archiver::TarArchiver;
pub use keys::{CacheKeyResolver, resolve};
pub use orchestrator::CacheOrchestrator;
pub use scratch::ScratchFile;
pub use store::S3ObjectStore;
pub use types::{RestoreOutcome, SaveOutcome, SkipReason};
