//! Rowsource Cache - Pluggable response cache for `getRows` requests.
//!
//! A [`ResponseCache`] maps a key derived from [`GetRowsParams`] to the
//! response the host returned for them. [`MemoryCache`] is the built-in
//! implementation; hosts can supply their own and swap it in through a
//! [`CacheSlot`].
//!
//! [`GetRowsParams`]: rowsource_api::GetRowsParams

mod cache;
mod error;
mod memory;
mod slot;

pub use cache::{CacheKey, ResponseCache, default_cache_key};
pub use error::CacheError;
pub use memory::{DEFAULT_TTL, MemoryCache};
pub use slot::{CacheHandle, CacheSlot};
