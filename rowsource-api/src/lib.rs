//! Rowsource API - Shared types for the server-side row data source.

mod event;
mod key;
mod params;

pub use event::*;
pub use key::*;
pub use params::*;
