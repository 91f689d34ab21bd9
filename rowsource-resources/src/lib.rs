//! Rowsource Resources - Hierarchical resolution of per-event properties.
//!
//! Events belong to resources, and resources form a forest. A property an
//! event leaves unset (draggable, resizable, read-only) is taken from the
//! nearest resource that sets it, walking child to parent, and finally from
//! the component defaults.

mod error;
mod lookup;
mod model;
mod resolve;

pub use error::ResolveError;
pub use lookup::ResourceLookup;
pub use model::{
    EventId, EventSide, Resizable, Resource, ResourceId, SchedulerDefaults, SchedulerEvent,
};
pub use resolve::{EventProperty, EventPropertyResolver, PropertyValue, resolve_property};
