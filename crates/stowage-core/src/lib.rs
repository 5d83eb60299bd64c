//! Stowage Core
//!
//! Core domain types, traits, and error handling for the stowage CI cache.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used by the cache engine and the command-line front end.

pub mod cache;
pub mod config;
pub mod error;
pub mod ports;

pub use cache::*;
pub use config::{CacheConfig, StoreCredentials, StoreSettings};
pub use error::{Error, Result};
pub use ports::{ArchiveCodec, ObjectStore};
