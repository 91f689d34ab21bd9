//! Flattened resource lookups.

use std::collections::HashMap;

use crate::{Resource, ResourceId};

/// Id → resource and id → parent maps built once from a resource forest.
#[derive(Debug, Clone, Default)]
pub struct ResourceLookup {
    resources: HashMap<ResourceId, Resource>,
    parents: HashMap<ResourceId, ResourceId>,
    /// Ids in depth-first order of the input.
    order: Vec<ResourceId>,
}

impl ResourceLookup {
    /// Flatten `resources`. Nested children get their parent from the
    /// nesting unless they name one. Repeated ids keep the first resource.
    pub fn new(resources: impl IntoIterator<Item = Resource>) -> Self {
        let mut lookup = Self::default();

        let mut stack: Vec<(Resource, Option<ResourceId>)> = resources
            .into_iter()
            .map(|resource| (resource, None))
            .collect();
        stack.reverse();

        while let Some((mut resource, nested_in)) = stack.pop() {
            if lookup.resources.contains_key(&resource.id) {
                tracing::warn!(id = %resource.id, "ignoring duplicate resource id");
                continue;
            }

            let children = std::mem::take(&mut resource.children);
            for child in children.into_iter().rev() {
                stack.push((child, Some(resource.id.clone())));
            }

            if let Some(parent) = resource.parent.clone().or(nested_in) {
                lookup.parents.insert(resource.id.clone(), parent);
            }
            lookup.order.push(resource.id.clone());
            lookup.resources.insert(resource.id.clone(), resource);
        }

        lookup
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Resource ids in input order, parents before their nested children.
    pub fn ids(&self) -> &[ResourceId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_children_get_parent() {
        let mut team = Resource::new("team");
        team.children = vec![Resource::new("alice"), Resource::new("bob")];
        let lookup = ResourceLookup::new(vec![team, Resource::new("room")]);

        assert_eq!(lookup.len(), 4);
        assert_eq!(lookup.ids(), &["team", "alice", "bob", "room"]);
        assert_eq!(lookup.parent_of("alice"), Some("team"));
        assert_eq!(lookup.parent_of("team"), None);
        assert!(lookup.get("team").unwrap().children.is_empty());
    }

    #[test]
    fn test_parent_reference() {
        let lookup = ResourceLookup::new(vec![
            Resource::new("alice").with_parent("team"),
            Resource::new("team"),
        ]);
        assert_eq!(lookup.parent_of("alice"), Some("team"));
    }

    #[test]
    fn test_explicit_parent_wins_over_nesting() {
        let mut team = Resource::new("team");
        team.children = vec![Resource::new("alice").with_parent("other")];
        let lookup = ResourceLookup::new(vec![team]);
        assert_eq!(lookup.parent_of("alice"), Some("other"));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut first = Resource::new("a");
        first.title = "first".to_string();
        let mut second = Resource::new("a");
        second.title = "second".to_string();

        let lookup = ResourceLookup::new(vec![first, second]);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get("a").unwrap().title, "first");
    }
}
