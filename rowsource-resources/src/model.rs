//! Resources, events and component-level defaults.

use serde::{Deserialize, Serialize};

pub type ResourceId = String;
pub type EventId = String;

/// One edge of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSide {
    Start,
    End,
}

/// Whether events can be resized: on both sides, on neither, or on one side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resizable {
    Flag(bool),
    Side(EventSide),
}

impl Resizable {
    /// Whether `side` may be resized. Naming a single side forbids the other.
    pub fn allows(self, side: EventSide) -> bool {
        match self {
            Resizable::Flag(flag) => flag,
            Resizable::Side(only) => only == side,
        }
    }
}

impl Default for Resizable {
    fn default() -> Self {
        Resizable::Flag(false)
    }
}

impl From<bool> for Resizable {
    fn from(flag: bool) -> Self {
        Resizable::Flag(flag)
    }
}

/// A node in the resource forest.
///
/// The parent can be given by reference (`parent`) or by nesting the resource
/// under `children`. Unset overrides defer to the parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub are_events_draggable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub are_events_resizable: Option<Resizable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub are_events_read_only: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Resource>,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ResourceId>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// A scheduled event. Unset properties are resolved through its resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerEvent {
    pub id: EventId,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resizable: Option<Resizable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SchedulerEvent {
    pub fn new(id: impl Into<EventId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn on_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// Component-level values used when neither the event nor any resource
/// sets a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerDefaults {
    /// Makes every event read-only, whatever the events or resources say.
    pub read_only: bool,

    pub are_events_draggable: bool,

    pub are_events_resizable: Resizable,

    pub event_color: String,

    /// The event start cannot be written back (mapped without a setter).
    pub start_locked: bool,

    /// The event end cannot be written back.
    pub end_locked: bool,
}

impl Default for SchedulerDefaults {
    fn default() -> Self {
        Self {
            read_only: false,
            are_events_draggable: false,
            are_events_resizable: Resizable::default(),
            event_color: "jade".to_string(),
            start_locked: false,
            end_locked: false,
        }
    }
}

impl SchedulerDefaults {
    pub fn is_locked(&self, side: EventSide) -> bool {
        match side {
            EventSide::Start => self.start_locked,
            EventSide::End => self.end_locked,
        }
    }
}
