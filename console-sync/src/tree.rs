//! Tree indexing for hierarchical entities (collections, facets)
//!
//! Converts a flat list of records, each naming its parent, into a rooted
//! tree, and lists the nodes a given node may be moved under.
//!
//! # 规则
//!
//! - 每条记录恰好出现一次 (包括存在环的记录，环中首条记录挂到根下)
//! - 子节点保持输入顺序
//! - 根节点 id = 顶层记录的父 id (该 id 不在输入集中时)
//! - 顶层记录指向多个不同的缺失父 id 时，根节点 id 未知

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use shared::Translatable;

/// Path label used for the root move target
pub const ROOT_TARGET_PATH: &str = "root";
/// Separator between labels in a move-target path
pub const PATH_SEPARATOR: &str = " / ";

/// A record that knows its place in a hierarchy
pub trait TreeRecord {
    fn id(&self) -> &str;

    /// Parent id; `None` for top-level records
    fn parent_id(&self) -> Option<&str>;

    /// Display label used in move-target paths
    fn label(&self) -> &str;
}

impl TreeRecord for Value {
    fn id(&self) -> &str {
        self.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    fn parent_id(&self) -> Option<&str> {
        self.get("parent")
            .and_then(|p| p.get("id"))
            .or_else(|| self.get("parentId"))
            .and_then(Value::as_str)
    }

    fn label(&self) -> &str {
        self.get("name")
            .and_then(Value::as_str)
            .unwrap_or_else(|| TreeRecord::id(self))
    }
}

/// Translatable records expose `parentId` as a field and their label via the
/// first translation carrying a `name`
impl TreeRecord for Translatable {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.fields
            .get("parent")
            .and_then(|p| p.get("id"))
            .or_else(|| self.fields.get("parentId"))
            .and_then(Value::as_str)
    }

    fn label(&self) -> &str {
        self.fields
            .get("name")
            .or_else(|| self.translations.iter().find_map(|t| t.fields.get("name")))
            .and_then(Value::as_str)
            .unwrap_or(self.id.as_str())
    }
}

/// 树节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    pub entity: T,
    /// UI expansion state, carried across rebuilds by [`to_tree_with_state`]
    pub expanded: bool,
    pub children: Vec<TreeNode<T>>,
}

impl<T: TreeRecord> TreeNode<T> {
    pub fn id(&self) -> &str {
        self.entity.id()
    }

    /// Whether `id` is this node or one of its descendants
    pub fn contains(&self, id: &str) -> bool {
        self.id() == id || self.children.iter().any(|child| child.contains(id))
    }
}

/// 根节点 (不对应任何输入记录)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootNode<T> {
    /// Server-side id of the root, when the input reveals it
    pub id: Option<String>,
    pub children: Vec<TreeNode<T>>,
}

/// Where a node sits inside a [`RootNode`]
#[derive(Debug)]
pub struct NodeLocation<'a, T> {
    pub node: &'a TreeNode<T>,
    /// Parent node id. A top-level node reports the root id only when its
    /// record names the root as parent
    pub parent_id: Option<&'a str>,
    /// Position among siblings
    pub index: usize,
    pub sibling_count: usize,
}

/// An eligible destination for "move to"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveTarget {
    pub path: String,
    pub id: String,
}

impl<T> Default for RootNode<T> {
    fn default() -> Self {
        Self {
            id: None,
            children: Vec::new(),
        }
    }
}

impl<T: TreeRecord> RootNode<T> {
    /// Number of nodes, root excluded
    pub fn len(&self) -> usize {
        fn count<T>(nodes: &[TreeNode<T>]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.children)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Node ids in depth-first pre-order
    pub fn flatten_ids(&self) -> Vec<String> {
        fn walk<T: TreeRecord>(nodes: &[TreeNode<T>], out: &mut Vec<String>) {
            for node in nodes {
                out.push(node.id().to_string());
                walk(&node.children, out);
            }
        }
        let mut out = Vec::with_capacity(self.len());
        walk(&self.children, &mut out);
        out
    }

    pub fn find(&self, id: &str) -> Option<NodeLocation<'_, T>> {
        fn search<'a, T: TreeRecord>(
            nodes: &'a [TreeNode<T>],
            parent_id: &'a str,
            id: &str,
        ) -> Option<NodeLocation<'a, T>> {
            for (index, node) in nodes.iter().enumerate() {
                if node.id() == id {
                    return Some(NodeLocation {
                        node,
                        parent_id: Some(parent_id),
                        index,
                        sibling_count: nodes.len(),
                    });
                }
                if let Some(found) = search(&node.children, node.id(), id) {
                    return Some(found);
                }
            }
            None
        }

        for (index, node) in self.children.iter().enumerate() {
            if node.id() == id {
                let parent_id = self
                    .id
                    .as_deref()
                    .filter(|root| node.entity.parent_id() == Some(*root));
                return Some(NodeLocation {
                    node,
                    parent_id,
                    index,
                    sibling_count: self.children.len(),
                });
            }
            if let Some(found) = search(&node.children, node.id(), id) {
                return Some(found);
            }
        }
        None
    }

    /// Toggle the expansion flag of one node; returns false if absent
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> bool {
        fn walk<T: TreeRecord>(nodes: &mut [TreeNode<T>], id: &str, expanded: bool) -> bool {
            for node in nodes {
                if node.id() == id {
                    node.expanded = expanded;
                    return true;
                }
                if walk(&mut node.children, id, expanded) {
                    return true;
                }
            }
            false
        }
        walk(&mut self.children, id, expanded)
    }

    /// Ids of every expanded node
    pub fn expanded_ids(&self) -> HashSet<String> {
        fn walk<T: TreeRecord>(nodes: &[TreeNode<T>], out: &mut HashSet<String>) {
            for node in nodes {
                if node.expanded {
                    out.insert(node.id().to_string());
                }
                walk(&node.children, out);
            }
        }
        let mut out = HashSet::new();
        walk(&self.children, &mut out);
        out
    }
}

/// Build a tree from a flat list; every node starts collapsed
pub fn to_tree<T: TreeRecord>(records: Vec<T>) -> RootNode<T> {
    build(records, &HashSet::new())
}

/// Build a tree, keeping the expansion state of nodes present in `previous`
pub fn to_tree_with_state<T: TreeRecord>(records: Vec<T>, previous: &RootNode<T>) -> RootNode<T> {
    build(records, &previous.expanded_ids())
}

fn build<T: TreeRecord>(records: Vec<T>, expanded: &HashSet<String>) -> RootNode<T> {
    let index: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id().to_string(), i))
        .collect();

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut top_level = Vec::new();
    let mut root_id: Option<String> = None;
    let mut ambiguous_root = false;

    for (i, record) in records.iter().enumerate() {
        match record.parent_id() {
            Some(parent) => match index.get(parent) {
                Some(&p) if p != i => children_of[p].push(i),
                Some(_) => top_level.push(i),
                None => {
                    match root_id.as_deref() {
                        None => root_id = Some(parent.to_string()),
                        Some(known) if known != parent => ambiguous_root = true,
                        Some(_) => {}
                    }
                    top_level.push(i);
                }
            },
            None => top_level.push(i),
        }
    }

    if ambiguous_root {
        tracing::debug!("Top-level records name different missing parents, root id unknown");
        root_id = None;
    }

    let total = records.len();
    let mut slots: Vec<Option<T>> = records.into_iter().map(Some).collect();
    let mut placed = vec![false; total];
    let mut ctx = Assembly {
        slots: &mut slots,
        children_of: &children_of,
        placed: &mut placed,
        expanded,
    };

    let mut children: Vec<TreeNode<T>> = top_level
        .into_iter()
        .filter_map(|i| ctx.assemble(i))
        .collect();

    // Records unreachable from the top level form a parent cycle
    for i in 0..total {
        if let Some(node) = ctx.assemble(i) {
            tracing::warn!(id = %node.id(), "Parent cycle detected, attaching record to root");
            children.push(node);
        }
    }

    RootNode {
        id: root_id,
        children,
    }
}

struct Assembly<'a, T> {
    slots: &'a mut [Option<T>],
    children_of: &'a [Vec<usize>],
    placed: &'a mut [bool],
    expanded: &'a HashSet<String>,
}

impl<T: TreeRecord> Assembly<'_, T> {
    fn assemble(&mut self, i: usize) -> Option<TreeNode<T>> {
        if self.placed[i] {
            return None;
        }
        self.placed[i] = true;
        let entity = self.slots[i].take()?;
        let mut children = Vec::with_capacity(self.children_of[i].len());
        for &child in &self.children_of[i] {
            if let Some(node) = self.assemble(child) {
                children.push(node);
            }
        }
        let expanded = self.expanded.contains(entity.id());
        Some(TreeNode {
            entity,
            expanded,
            children,
        })
    }
}

/// Destinations `exclude_id` may be moved under
///
/// Depth-first; skips the node itself with its subtree and its current
/// parent. The root is offered (as `"root"`) only when its id is known.
pub fn list_move_targets<T: TreeRecord>(tree: &RootNode<T>, exclude_id: &str) -> Vec<MoveTarget> {
    let current_parent = tree.find(exclude_id).and_then(|loc| loc.parent_id);
    let mut targets = Vec::new();

    if let Some(root_id) = tree.id.as_deref()
        && current_parent != Some(root_id)
    {
        targets.push(MoveTarget {
            path: ROOT_TARGET_PATH.to_string(),
            id: root_id.to_string(),
        });
    }

    fn visit<'a, T: TreeRecord>(
        node: &'a TreeNode<T>,
        ancestors: &mut Vec<&'a str>,
        exclude_id: &str,
        current_parent: Option<&str>,
        targets: &mut Vec<MoveTarget>,
    ) {
        if node.id() == exclude_id {
            return;
        }
        ancestors.push(node.entity.label());
        if current_parent != Some(node.id()) {
            targets.push(MoveTarget {
                path: ancestors.join(PATH_SEPARATOR),
                id: node.id().to_string(),
            });
        }
        for child in &node.children {
            visit(child, ancestors, exclude_id, current_parent, targets);
        }
        ancestors.pop();
    }

    let mut ancestors = Vec::new();
    for node in &tree.children {
        visit(node, &mut ancestors, exclude_id, current_parent, &mut targets);
    }
    targets
}
