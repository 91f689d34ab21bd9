//! Integration tests for event property resolution.

use rowsource_resources::{
    EventProperty, EventPropertyResolver, EventSide, PropertyValue, Resizable, Resource,
    ResolveError, SchedulerDefaults, SchedulerEvent,
};

/// org ─ team ─ alice
///     └ room
fn resources() -> Vec<Resource> {
    let mut org = Resource::new("org");
    org.are_events_draggable = Some(false);
    org.are_events_resizable = Some(Resizable::Side(EventSide::End));
    org.event_color = Some("indigo".to_string());

    let mut team = Resource::new("team");
    team.children = vec![Resource::new("alice")];

    let mut room = Resource::new("room");
    room.are_events_draggable = Some(true);
    room.are_events_read_only = Some(true);

    org.children = vec![team, room];
    vec![org]
}

fn defaults() -> SchedulerDefaults {
    SchedulerDefaults {
        are_events_draggable: true,
        are_events_resizable: Resizable::Flag(true),
        ..Default::default()
    }
}

fn resolver(events: Vec<SchedulerEvent>) -> EventPropertyResolver {
    EventPropertyResolver::new(resources(), events, defaults())
}

#[test]
fn test_event_value_beats_ancestors_and_default() {
    let mut event = SchedulerEvent::new("standup").on_resource("alice");
    event.draggable = Some(false);

    // An ancestor that allows dragging does not override the event
    let mut resources = resources();
    resources[0].are_events_draggable = Some(true);
    let resolver = EventPropertyResolver::new(resources, vec![event], defaults());

    assert_eq!(resolver.is_draggable("standup"), Ok(false));
}

#[test]
fn test_nearest_ancestor_override_wins() {
    // alice and team set nothing; org (grandparent) forbids dragging
    let resolver = resolver(vec![SchedulerEvent::new("review").on_resource("alice")]);
    assert_eq!(resolver.is_draggable("review"), Ok(false));

    let resolver = resolver_with_team_override();
    assert_eq!(resolver.is_draggable("review"), Ok(true));
}

fn resolver_with_team_override() -> EventPropertyResolver {
    let mut resources = resources();
    resources[0].children[0].are_events_draggable = Some(true);
    EventPropertyResolver::new(
        resources,
        vec![SchedulerEvent::new("review").on_resource("alice")],
        defaults(),
    )
}

#[test]
fn test_default_applies_without_overrides() {
    let resolver = resolver(vec![SchedulerEvent::new("lunch")]);
    assert_eq!(resolver.is_draggable("lunch"), Ok(true));
    assert_eq!(resolver.is_resizable("lunch", EventSide::Start), Ok(true));
    assert_eq!(resolver.color("lunch"), "jade");
}

#[test]
fn test_read_only_resource_blocks_dragging() {
    let resolver = resolver(vec![SchedulerEvent::new("booking").on_resource("room")]);
    assert_eq!(resolver.is_read_only("booking"), Ok(true));
    assert_eq!(resolver.is_draggable("booking"), Ok(false));
    assert_eq!(resolver.is_resizable("booking", EventSide::End), Ok(false));
}

#[test]
fn test_event_can_opt_out_of_read_only() {
    let mut event = SchedulerEvent::new("booking").on_resource("room");
    event.read_only = Some(false);
    let resolver = resolver(vec![event]);

    assert_eq!(resolver.is_read_only("booking"), Ok(false));
    assert_eq!(resolver.is_draggable("booking"), Ok(true));
}

#[test]
fn test_global_read_only_wins() {
    let mut event = SchedulerEvent::new("standup");
    event.read_only = Some(false);
    event.draggable = Some(true);

    let defaults = SchedulerDefaults {
        read_only: true,
        ..defaults()
    };
    let resolver = EventPropertyResolver::new(resources(), vec![event], defaults);
    assert_eq!(resolver.is_read_only("standup"), Ok(true));
    assert_eq!(resolver.is_draggable("standup"), Ok(false));
}

#[test]
fn test_resizable_side_restriction() {
    let resolver = resolver(vec![SchedulerEvent::new("review").on_resource("alice")]);
    assert_eq!(resolver.is_resizable("review", EventSide::End), Ok(true));
    assert_eq!(resolver.is_resizable("review", EventSide::Start), Ok(false));

    let mut event = SchedulerEvent::new("review").on_resource("alice");
    event.resizable = Some(Resizable::Side(EventSide::Start));
    let resolver = self::resolver(vec![event]);
    assert_eq!(resolver.is_resizable("review", EventSide::Start), Ok(true));
    assert_eq!(resolver.is_resizable("review", EventSide::End), Ok(false));
}

#[test]
fn test_locked_dates() {
    let defaults = SchedulerDefaults {
        start_locked: true,
        ..defaults()
    };
    let resolver = EventPropertyResolver::new(
        resources(),
        vec![SchedulerEvent::new("lunch")],
        defaults,
    );
    assert_eq!(resolver.is_draggable("lunch"), Ok(false));
    assert_eq!(resolver.is_resizable("lunch", EventSide::Start), Ok(false));
    assert_eq!(resolver.is_resizable("lunch", EventSide::End), Ok(true));
}

#[test]
fn test_color_uses_direct_resource_only() {
    let mut colored = SchedulerEvent::new("colored").on_resource("org");
    colored.color = Some("amber".to_string());

    let resolver = resolver(vec![
        colored,
        SchedulerEvent::new("org-event").on_resource("org"),
        SchedulerEvent::new("team-event").on_resource("team"),
    ]);

    assert_eq!(resolver.color("colored"), "amber");
    assert_eq!(resolver.color("org-event"), "indigo");
    assert_eq!(resolver.color("team-event"), "jade");
}

#[test]
fn test_unknown_event_and_resource() {
    let resolver = resolver(vec![SchedulerEvent::new("orphan").on_resource("deleted")]);

    assert_eq!(resolver.is_read_only("missing"), Ok(false));
    assert_eq!(resolver.is_draggable("missing"), Ok(false));
    assert_eq!(resolver.color("missing"), "jade");

    // A resource that no longer exists is no override
    assert_eq!(resolver.is_draggable("orphan"), Ok(true));
}

#[test]
fn test_cyclic_resources_fail_fast() {
    let resources = vec![
        Resource::new("a").with_parent("b"),
        Resource::new("b").with_parent("a"),
    ];
    let resolver = EventPropertyResolver::new(
        resources,
        vec![SchedulerEvent::new("loop").on_resource("a")],
        defaults(),
    );

    assert_eq!(
        resolver.is_draggable("loop"),
        Err(ResolveError::CyclicResource("a".to_string()))
    );
    assert!(resolver.resource_chain("a").is_err());
}

#[test]
fn test_resource_chain() {
    let resolver = resolver(vec![]);
    assert_eq!(resolver.resource_chain("alice"), Ok(vec!["team".to_string(), "org".to_string()]));
    assert_eq!(resolver.resource_chain("org"), Ok(vec![]));
}

#[test]
fn test_resolve_by_property() {
    let resolver = resolver(vec![SchedulerEvent::new("review").on_resource("alice")]);

    assert_eq!(
        resolver.resolve(EventProperty::Draggable, "review"),
        Ok(PropertyValue::Bool(false))
    );
    assert_eq!(
        resolver.resolve_named("resizableEnd", "review"),
        Ok(PropertyValue::Bool(true))
    );
    assert_eq!(
        resolver.resolve_named("color", "review"),
        Ok(PropertyValue::Color("jade".to_string()))
    );
    assert!(matches!(
        resolver.resolve_named("title", "review"),
        Err(ResolveError::UnknownProperty(_))
    ));
}

#[test]
fn test_replacing_events_and_resources() {
    let mut resolver = resolver(vec![]);
    assert_eq!(resolver.is_draggable("late"), Ok(false));

    resolver.upsert_event(SchedulerEvent::new("late").on_resource("room"));
    assert_eq!(resolver.is_read_only("late"), Ok(true));

    resolver.set_resources(vec![Resource::new("room")]);
    assert_eq!(resolver.is_read_only("late"), Ok(false));
    assert_eq!(resolver.lookup().len(), 1);
}

#[test]
fn test_from_json() {
    let resources: Vec<Resource> = serde_json::from_str(
        r#"[{ "id": "org", "areEventsResizable": "start",
              "children": [{ "id": "team" }] }]"#,
    )
    .unwrap();
    let event: SchedulerEvent =
        serde_json::from_str(r#"{ "id": "e1", "resource": "team" }"#).unwrap();
    let defaults: SchedulerDefaults = serde_json::from_str(r#"{ "areEventsResizable": true }"#).unwrap();

    let resolver = EventPropertyResolver::new(resources, vec![event], defaults);
    assert_eq!(resolver.is_resizable("e1", EventSide::Start), Ok(true));
    assert_eq!(resolver.is_resizable("e1", EventSide::End), Ok(false));
}
