//! Cache error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The key function could not turn the parameters into a key. This is a
    /// configuration defect in the cache, not a data problem.
    #[error("cache key derivation failed: {0}")]
    KeyDerivation(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::KeyDerivation(e.to_string())
    }
}
