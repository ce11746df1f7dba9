//! Work breakdown structure: the authoritative outline tree and the
//! derived parent -> children cache the engine consults during summary
//! aggregation.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// One node of the authoritative outline tree. The tree owns structure
/// only; task data stays in the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub task_id: TaskId,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn leaf(task_id: TaskId) -> Self {
        Self {
            task_id,
            children: Vec::new(),
        }
    }

    pub fn group(task_id: TaskId, children: Vec<OutlineNode>) -> Self {
        Self { task_id, children }
    }
}

/// Cached ordered child lists for summary tasks, keyed by the summary's
/// task id. Derived entirely from the outline; `rebuild` is the only way
/// the cache changes.
#[derive(Debug, Default, Clone)]
pub struct WbsCache {
    children: FxHashMap<TaskId, Vec<TaskId>>,
}

impl WbsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the outline depth-first and replace every cached child list
    /// with the outline's current children, recursing into nested groups.
    /// A missing outline is a no-op, not an error: the engine may run
    /// against a project that is not fully loaded yet.
    pub fn rebuild(&mut self, outline: Option<&OutlineNode>) {
        let Some(root) = outline else {
            return;
        };
        let mut fresh: FxHashMap<TaskId, Vec<TaskId>> = FxHashMap::default();
        Self::walk(root, &mut fresh);
        self.children = fresh;
    }

    fn walk(node: &OutlineNode, into: &mut FxHashMap<TaskId, Vec<TaskId>>) {
        if node.children.is_empty() {
            return;
        }
        into.insert(
            node.task_id,
            node.children.iter().map(|c| c.task_id).collect(),
        );
        for child in &node.children {
            Self::walk(child, into);
        }
    }

    pub fn children_of(&self, id: TaskId) -> &[TaskId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: TaskId) -> bool {
        !self.children_of(id).is_empty()
    }

    /// Summary ids in bottom-up order (children before parents), derived
    /// from the outline walk order. Used by summary aggregation so nested
    /// groups fold correctly.
    pub fn summaries_bottom_up(&self, outline: Option<&OutlineNode>) -> Vec<TaskId> {
        let mut out = Vec::new();
        if let Some(root) = outline {
            Self::post_order(root, &mut out);
        }
        out
    }

    fn post_order(node: &OutlineNode, out: &mut Vec<TaskId>) {
        for child in &node.children {
            Self::post_order(child, out);
        }
        if !node.children.is_empty() {
            out.push(node.task_id);
        }
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }
}
