//! Data source error types.

use std::fmt;
use std::sync::Arc;

use rowsource_cache::CacheError;
use thiserror::Error;

/// Errors returned synchronously by coordinator operations.
///
/// Fetch failures are not among them: those are recorded as row state.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("no tokio runtime available to run fetches")]
    NoRuntime,

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// A failed `getRows` call, kept as row state and shown to the user.
///
/// Cheap to clone so the read surface can hand it out.
#[derive(Clone)]
pub struct FetchError(Arc<anyhow::Error>);

impl FetchError {
    pub fn new(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }

    /// A failure carrying only a message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::new(anyhow::Error::msg(message))
    }

    /// The message shown in the error indicator.
    pub fn message(&self) -> String {
        format!("{:#}", self.0)
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl fmt::Debug for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FetchError({:#})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_message_includes_context_chain() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("connection reset"));
        let err = err.context("loading children").unwrap_err();
        let fetch_error = FetchError::from(err);
        assert_eq!(fetch_error.message(), "loading children: connection reset");
        assert_eq!(fetch_error.clone().to_string(), fetch_error.message());
    }
}
