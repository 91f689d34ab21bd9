//! Event property resolution through the resource hierarchy.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    EventId, EventSide, Resource, ResourceId, ResourceLookup, ResolveError, SchedulerDefaults,
    SchedulerEvent,
};

/// Resolve a property, first defined value wins:
///
/// 1. `value_in_event`
/// 2. `value_in_resource` for the event's resource, then its parent, and so on
/// 3. `value_in_state`
///
/// A resource id missing from `lookup` ends the walk as if the chain ended
/// there. A chain that revisits a resource fails with
/// [`ResolveError::CyclicResource`].
pub fn resolve_property<'a, T>(
    lookup: &'a ResourceLookup,
    resource_id: Option<&'a str>,
    value_in_event: Option<T>,
    value_in_resource: impl Fn(&Resource) -> Option<T>,
    value_in_state: T,
) -> Result<T, ResolveError> {
    if let Some(value) = value_in_event {
        return Ok(value);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = resource_id;

    while let Some(id) = current {
        if !visited.insert(id) {
            return Err(ResolveError::CyclicResource(id.to_string()));
        }
        let Some(resource) = lookup.get(id) else {
            tracing::trace!(id, "resource not found, ending parent walk");
            break;
        };
        if let Some(value) = value_in_resource(resource) {
            return Ok(value);
        }
        current = lookup.parent_of(id);
    }

    Ok(value_in_state)
}

/// A property that can be asked of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventProperty {
    ReadOnly,
    Draggable,
    Resizable(EventSide),
    Color,
}

impl FromStr for EventProperty {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readOnly" => Ok(EventProperty::ReadOnly),
            "draggable" => Ok(EventProperty::Draggable),
            "resizableStart" => Ok(EventProperty::Resizable(EventSide::Start)),
            "resizableEnd" => Ok(EventProperty::Resizable(EventSide::End)),
            "color" => Ok(EventProperty::Color),
            other => Err(ResolveError::UnknownProperty(other.to_string())),
        }
    }
}

/// A resolved property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Color(String),
}

/// Answers per-event behaviour questions for rendering code.
///
/// Unknown events are never an error: flags resolve to `false` and the
/// colour to the component default.
#[derive(Debug, Clone, Default)]
pub struct EventPropertyResolver {
    lookup: ResourceLookup,
    events: HashMap<EventId, SchedulerEvent>,
    defaults: SchedulerDefaults,
}

impl EventPropertyResolver {
    pub fn new(
        resources: impl IntoIterator<Item = Resource>,
        events: impl IntoIterator<Item = SchedulerEvent>,
        defaults: SchedulerDefaults,
    ) -> Self {
        let mut resolver = Self {
            lookup: ResourceLookup::new(resources),
            events: HashMap::new(),
            defaults,
        };
        resolver.set_events(events);
        resolver
    }

    /// Replace the resource forest and rebuild its lookups.
    pub fn set_resources(&mut self, resources: impl IntoIterator<Item = Resource>) {
        self.lookup = ResourceLookup::new(resources);
    }

    pub fn set_events(&mut self, events: impl IntoIterator<Item = SchedulerEvent>) {
        self.events = events
            .into_iter()
            .map(|event| (event.id.clone(), event))
            .collect();
    }

    /// Add or replace one event.
    pub fn upsert_event(&mut self, event: SchedulerEvent) {
        self.events.insert(event.id.clone(), event);
    }

    pub fn set_defaults(&mut self, defaults: SchedulerDefaults) {
        self.defaults = defaults;
    }

    pub fn event(&self, id: &str) -> Option<&SchedulerEvent> {
        self.events.get(id)
    }

    pub fn lookup(&self) -> &ResourceLookup {
        &self.lookup
    }

    pub fn defaults(&self) -> &SchedulerDefaults {
        &self.defaults
    }

    pub fn is_read_only(&self, id: &str) -> Result<bool, ResolveError> {
        let Some(event) = self.event(id) else {
            return Ok(false);
        };
        if self.defaults.read_only {
            return Ok(true);
        }

        resolve_property(
            &self.lookup,
            event.resource.as_deref(),
            event.read_only,
            |resource| resource.are_events_read_only,
            false,
        )
    }

    /// Read-only events and events whose dates cannot be written back are
    /// never draggable.
    pub fn is_draggable(&self, id: &str) -> Result<bool, ResolveError> {
        if self.is_read_only(id)? {
            return Ok(false);
        }
        if self.defaults.start_locked || self.defaults.end_locked {
            return Ok(false);
        }
        let Some(event) = self.event(id) else {
            return Ok(false);
        };

        resolve_property(
            &self.lookup,
            event.resource.as_deref(),
            event.draggable,
            |resource| resource.are_events_draggable,
            self.defaults.are_events_draggable,
        )
    }

    pub fn is_resizable(&self, id: &str, side: EventSide) -> Result<bool, ResolveError> {
        if self.is_read_only(id)? {
            return Ok(false);
        }
        if self.defaults.is_locked(side) {
            return Ok(false);
        }
        let Some(event) = self.event(id) else {
            return Ok(false);
        };

        resolve_property(
            &self.lookup,
            event.resource.as_deref(),
            event.resizable.map(|r| r.allows(side)),
            |resource| resource.are_events_resizable.map(|r| r.allows(side)),
            self.defaults.are_events_resizable.allows(side),
        )
    }

    /// Event colour, else the colour of the event's own resource, else the
    /// default. Only the direct resource is consulted.
    pub fn color(&self, id: &str) -> &str {
        let Some(event) = self.event(id) else {
            return &self.defaults.event_color;
        };
        if let Some(color) = &event.color {
            return color;
        }

        event
            .resource
            .as_deref()
            .and_then(|resource| self.lookup.get(resource))
            .and_then(|resource| resource.event_color.as_deref())
            .unwrap_or(self.defaults.event_color.as_str())
    }

    /// Resolve `property` for the event `id`.
    pub fn resolve(&self, property: EventProperty, id: &str) -> Result<PropertyValue, ResolveError> {
        let value = match property {
            EventProperty::ReadOnly => PropertyValue::Bool(self.is_read_only(id)?),
            EventProperty::Draggable => PropertyValue::Bool(self.is_draggable(id)?),
            EventProperty::Resizable(side) => PropertyValue::Bool(self.is_resizable(id, side)?),
            EventProperty::Color => PropertyValue::Color(self.color(id).to_string()),
        };
        Ok(value)
    }

    /// Resolve a property given by name (`readOnly`, `draggable`,
    /// `resizableStart`, `resizableEnd`, `color`).
    pub fn resolve_named(&self, property: &str, id: &str) -> Result<PropertyValue, ResolveError> {
        self.resolve(property.parse()?, id)
    }

    /// Ancestors of a resource, nearest first, stopping at a missing id.
    pub fn resource_chain(&self, id: &str) -> Result<Vec<ResourceId>, ResolveError> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.lookup.parent_of(id);

        while let Some(parent) = current {
            if parent == id || !visited.insert(parent) {
                return Err(ResolveError::CyclicResource(parent.to_string()));
            }
            if !self.lookup.contains(parent) {
                break;
            }
            chain.push(parent.to_string());
            current = self.lookup.parent_of(parent);
        }

        Ok(chain)
    }
}
