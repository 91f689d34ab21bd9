//! Resolver error types.

use thiserror::Error;

use crate::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The parent chain came back to a resource it already visited.
    #[error("resource parent chain loops back to '{0}'")]
    CyclicResource(ResourceId),

    #[error("unknown event property: {0}")]
    UnknownProperty(String),
}
