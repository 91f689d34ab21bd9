//! Row tree - the loaded rows, arranged by group key path.

use std::collections::HashMap;

use rowsource_api::{GetRowsResponse, GroupKey, ROW_COUNT_UNKNOWN, Row, RowId};

use crate::DataSource;

/// A loaded row and its place in the tree.
#[derive(Debug, Clone)]
pub struct RowNode {
    pub id: RowId,

    /// The record as the host returned it.
    pub row: Row,

    /// Parent group, `None` at the top level.
    pub parent: Option<RowId>,

    /// Group key path of this node: ancestors' keys followed by its own.
    /// Sent as `groupKeys` when fetching its children.
    pub path: Vec<GroupKey>,

    /// 0 for top-level rows.
    pub depth: usize,

    /// Loaded children, in server order.
    pub children: Vec<RowId>,

    /// Children count reported by the host (`-1` if unknown).
    pub children_count: i64,

    pub has_children: bool,

    /// Whether the children have been loaded at least once.
    pub children_fetched: bool,

    pub expanded: bool,
}

impl RowNode {
    pub fn is_group(&self) -> bool {
        self.has_children
    }
}

/// The rows currently loaded.
#[derive(Debug)]
pub struct RowTree {
    nodes: HashMap<RowId, RowNode>,
    top_level: Vec<RowId>,
    row_count: i64,
}

impl RowTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            top_level: Vec::new(),
            row_count: ROW_COUNT_UNKNOWN,
        }
    }

    /// Replace everything with a fresh top level.
    ///
    /// Returns the ids that are no longer present.
    pub fn replace_top_level(
        &mut self,
        response: GetRowsResponse,
        source: &dyn DataSource,
    ) -> Vec<RowId> {
        let previous: Vec<RowId> = self.nodes.keys().cloned().collect();
        self.nodes.clear();

        self.top_level = self.insert_rows(None, &[], 0, response.rows, source);
        self.row_count = response.row_count;

        previous
            .into_iter()
            .filter(|id| !self.nodes.contains_key(id))
            .collect()
    }

    /// Replace the children of `parent`, dropping its previous descendants.
    ///
    /// The parent is marked fetched and expanded. Returns the ids that are no
    /// longer present. Does nothing if `parent` is not loaded.
    pub fn set_children(
        &mut self,
        parent: &RowId,
        rows: Vec<Row>,
        source: &dyn DataSource,
    ) -> Vec<RowId> {
        let Some(node) = self.nodes.get(parent) else {
            return Vec::new();
        };
        let path = node.path.clone();
        let depth = node.depth + 1;

        let previous = self.remove_descendants(parent);
        let children = self.insert_rows(Some(parent), &path, depth, rows, source);

        if let Some(node) = self.nodes.get_mut(parent) {
            node.children = children;
            node.children_fetched = true;
            node.expanded = true;
        }

        previous
            .into_iter()
            .filter(|id| !self.nodes.contains_key(id))
            .collect()
    }

    fn insert_rows(
        &mut self,
        parent: Option<&RowId>,
        parent_path: &[GroupKey],
        depth: usize,
        rows: Vec<Row>,
        source: &dyn DataSource,
    ) -> Vec<RowId> {
        let mut ids = Vec::with_capacity(rows.len());

        for row in rows {
            let Some(id) = source.get_row_id(&row) else {
                tracing::warn!("skipping row without an id");
                continue;
            };
            if self.nodes.contains_key(&id) {
                tracing::warn!(%id, "skipping duplicate row id");
                continue;
            }

            let mut path = parent_path.to_vec();
            path.push(source.get_group_key(&row).unwrap_or_else(|| id.clone()));

            let node = RowNode {
                id: id.clone(),
                parent: parent.cloned(),
                path,
                depth,
                children: Vec::new(),
                children_count: source.get_children_count(&row),
                has_children: source.has_children(&row),
                children_fetched: false,
                expanded: false,
                row,
            };
            self.nodes.insert(id.clone(), node);
            ids.push(id);
        }

        ids
    }

    /// Remove every descendant of `id` (not `id` itself).
    fn remove_descendants(&mut self, id: &RowId) -> Vec<RowId> {
        let mut removed = Vec::new();
        let mut stack = match self.nodes.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return removed,
        };

        while let Some(child) = stack.pop() {
            if let Some(node) = self.nodes.remove(&child) {
                stack.extend(node.children);
                removed.push(child);
            }
        }

        removed
    }

    /// Get a node by id.
    pub fn node(&self, id: &RowId) -> Option<&RowNode> {
        self.nodes.get(id)
    }

    /// Get a row record by id.
    pub fn row(&self, id: &RowId) -> Option<&Row> {
        self.nodes.get(id).map(|node| &node.row)
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Group key path to request the children of `id` with.
    pub fn group_keys_for(&self, id: &RowId) -> Option<Vec<GroupKey>> {
        self.nodes.get(id).map(|node| node.path.clone())
    }

    pub fn top_level(&self) -> &[RowId] {
        &self.top_level
    }

    /// Loaded children of `id`; empty if none or unknown.
    pub fn children(&self, id: &RowId) -> &[RowId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Set the expansion flag. Returns false if the row is not loaded.
    pub fn set_expanded(&mut self, id: &RowId, expanded: bool) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Row count of the top level as reported by the server.
    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    /// Number of loaded rows at every depth.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids in display order: each expanded group is followed by its children.
    pub fn visible_rows(&self) -> Vec<RowId> {
        let mut out = Vec::new();
        let mut stack: Vec<&RowId> = self.top_level.iter().rev().collect();

        while let Some(id) = stack.pop() {
            out.push(id.clone());
            if let Some(node) = self.nodes.get(id) {
                if node.expanded {
                    stack.extend(node.children.iter().rev());
                }
            }
        }

        out
    }
}

impl Default for RowTree {
    fn default() -> Self {
        Self::new()
    }
}
