//! Rowsource Kernel - Fetch coordination for server-side rows.
//!
//! This crate contains:
//! - The host-supplied [`DataSource`] trait
//! - The loaded row tree and per-row loading/error state
//! - The [`FetchCoordinator`], which issues fetches, consults the response
//!   cache and discards results that went stale while in flight

pub mod fetch;
pub mod tree;

mod config;
mod coordinator;
mod error;
mod source;
mod state;

pub use config::DataSourceConfig;
pub use coordinator::FetchCoordinator;
pub use error::{DataSourceError, FetchError};
pub use fetch::{ChildrenQueue, FetchTicket};
pub use source::DataSource;
pub use state::{DataSourceState, RowFetchState};
pub use tree::{RowNode, RowTree};
