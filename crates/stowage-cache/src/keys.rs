//! Cache key to object location resolution.

use stowage_core::{CompressionMethod, Error, ObjectLocation, Result};

/// Short repository name: the segment after the final `/`, or the whole identifier.
pub fn repo_short_name(repository: &str) -> &str {
    match repository.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name,
        _ => repository,
    }
}

/// Resolve a cache key to its canonical object location.
///
/// The location is `{prefix}/{repo}/{ref}/{key}.{ext}`. The key is an opaque
/// segment and is never split or rewritten.
pub fn resolve(
    prefix: &str,
    repository: &str,
    git_ref: &str,
    key: &str,
    method: CompressionMethod,
) -> Result<ObjectLocation> {
    if repository.is_empty() {
        return Err(Error::Configuration(
            "repository must not be empty when resolving a cache location".to_string(),
        ));
    }

    Ok(ObjectLocation::new(format!(
        "{}/{}/{}/{}.{}",
        prefix,
        repo_short_name(repository),
        git_ref,
        key,
        method.extension()
    )))
}

/// Resolves keys against one fixed prefix/repository/ref/method.
#[derive(Debug, Clone)]
pub struct CacheKeyResolver {
    prefix: String,
    repository: String,
    git_ref: String,
    method: CompressionMethod,
}

impl CacheKeyResolver {
    pub fn new(
        prefix: impl Into<String>,
        repository: impl Into<String>,
        git_ref: impl Into<String>,
        method: CompressionMethod,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            repository: repository.into(),
            git_ref: git_ref.into(),
            method,
        }
    }

    pub fn resolve(&self, key: &str) -> Result<ObjectLocation> {
        resolve(&self.prefix, &self.repository, &self.git_ref, key, self.method)
    }

    /// Resolve the primary key followed by each restore key, in order.
    pub fn candidates<'a>(
        &self,
        key: &'a str,
        restore_keys: &'a [String],
    ) -> Result<Vec<(&'a str, ObjectLocation)>> {
        std::iter::once(key)
            .chain(restore_keys.iter().map(String::as_str))
            .map(|k| Ok((k, self.resolve(k)?)))
            .collect()
    }
}
