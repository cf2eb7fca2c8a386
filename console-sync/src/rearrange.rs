//! Rearrange gestures on a [`RootNode`] tree
//!
//! Gestures only compute a [`RearrangeCommand`]; the tree itself is never
//! mutated. Commands are published on [`RearrangeEvents`] for the screen to
//! persist, after which the list is refreshed and the tree rebuilt.

use shared::RearrangeCommand;
use tokio::sync::broadcast;

use crate::error::RearrangeError;
use crate::inspector::Inspector;
use crate::tree::{MoveTarget, RootNode, TreeRecord};

/// Drop container for drag-and-drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropContainer<'a> {
    /// Top level of the tree
    Root,
    /// Children list of the node with this id
    Node(&'a str),
}

/// Drag `entity_id` into `container` at `drop_index`
///
/// Fails when the container is the root and its id is unknown, when the
/// container node is not in the tree, or when it lies inside the dragged
/// node's own subtree.
pub fn drop_into<T: TreeRecord>(
    tree: &RootNode<T>,
    entity_id: &str,
    container: DropContainer<'_>,
    drop_index: usize,
) -> Result<RearrangeCommand, RearrangeError> {
    let dragged = tree
        .find(entity_id)
        .ok_or_else(|| RearrangeError::UnknownEntity(entity_id.to_string()))?
        .node;
    let parent_id = match container {
        DropContainer::Root => tree.id.as_deref().ok_or(RearrangeError::UnknownDropTarget)?,
        DropContainer::Node(id) => {
            tree.find(id).ok_or(RearrangeError::UnknownDropTarget)?;
            if dragged.contains(id) {
                tracing::debug!(entity_id, target = id, "Rejected drop into own subtree");
                return Err(RearrangeError::InvalidDropTarget(id.to_string()));
            }
            id
        }
    };
    Ok(RearrangeCommand::new(entity_id, parent_id, drop_index as i64))
}

/// Move one position up among siblings; `None` when already first or when
/// the parent has no addressable id
pub fn move_up<T: TreeRecord>(
    tree: &RootNode<T>,
    entity_id: &str,
) -> Result<Option<RearrangeCommand>, RearrangeError> {
    shift(tree, entity_id, -1)
}

/// Move one position down among siblings; `None` when already last or when
/// the parent has no addressable id
pub fn move_down<T: TreeRecord>(
    tree: &RootNode<T>,
    entity_id: &str,
) -> Result<Option<RearrangeCommand>, RearrangeError> {
    shift(tree, entity_id, 1)
}

fn shift<T: TreeRecord>(
    tree: &RootNode<T>,
    entity_id: &str,
    delta: i64,
) -> Result<Option<RearrangeCommand>, RearrangeError> {
    let loc = tree
        .find(entity_id)
        .ok_or_else(|| RearrangeError::UnknownEntity(entity_id.to_string()))?;

    let Some(parent_id) = loc.parent_id else {
        tracing::debug!(entity_id, "Parent id unknown, ignoring reorder");
        return Ok(None);
    };

    let at_edge = match delta {
        d if d < 0 => loc.index == 0,
        _ => loc.index + 1 >= loc.sibling_count,
    };
    if at_edge {
        return Ok(None);
    }
    Ok(Some(RearrangeCommand::shifted(
        entity_id, parent_id, loc.index, delta,
    )))
}

/// "Move to" picker selection: become the first child of `target`
pub fn move_to(entity_id: &str, target: &MoveTarget) -> RearrangeCommand {
    RearrangeCommand::new(entity_id, target.id.clone(), 0)
}

/// Broadcast channel of rearrange commands emitted by a tree screen
#[derive(Debug, Clone)]
pub struct RearrangeEvents {
    tx: broadcast::Sender<RearrangeCommand>,
    inspector: Inspector,
}

impl RearrangeEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            inspector: Inspector::disabled(),
        }
    }

    pub fn with_inspector(mut self, inspector: Inspector) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RearrangeCommand> {
        self.tx.subscribe()
    }

    /// Publish a command; returns the number of subscribers reached
    pub fn emit(&self, command: RearrangeCommand) -> usize {
        tracing::info!(
            entity_id = %command.entity_id,
            parent_id = %command.new_parent_id,
            index = command.new_index,
            "Rearrange requested"
        );
        self.inspector.record("rearrange", "emit", || {
            serde_json::to_value(&command).unwrap_or_default()
        });
        match self.tx.send(command) {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!("Rearrange command dropped: no subscribers");
                0
            }
        }
    }
}

impl Default for RearrangeEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{list_move_targets, to_tree};
    use serde_json::{Value, json};

    fn tree() -> RootNode<Value> {
        to_tree(vec![
            json!({ "id": "2", "parent": { "id": "1" }, "name": "A" }),
            json!({ "id": "3", "parent": { "id": "1" }, "name": "B" }),
            json!({ "id": "4", "parent": { "id": "2" }, "name": "A1" }),
            json!({ "id": "5", "parent": { "id": "2" }, "name": "A2" }),
            json!({ "id": "6", "parent": { "id": "2" }, "name": "A3" }),
        ])
    }

    #[test]
    fn test_drop_into_node() {
        let cmd = drop_into(&tree(), "6", DropContainer::Node("3"), 0).unwrap();
        assert_eq!(cmd, RearrangeCommand::new("6", "3", 0));
    }

    #[test]
    fn test_drop_into_root() {
        let cmd = drop_into(&tree(), "4", DropContainer::Root, 2).unwrap();
        assert_eq!(cmd, RearrangeCommand::new("4", "1", 2));
    }

    #[test]
    fn test_drop_into_root_without_id_fails() {
        let tree = to_tree(vec![json!({ "id": "a", "name": "A" })]);
        assert_eq!(
            drop_into(&tree, "a", DropContainer::Root, 0),
            Err(RearrangeError::UnknownDropTarget)
        );
        assert_eq!(
            drop_into(&tree, "a", DropContainer::Node("ghost"), 0),
            Err(RearrangeError::UnknownDropTarget)
        );
    }

    #[test]
    fn test_drop_into_own_subtree_is_rejected() {
        let tree = tree();
        assert_eq!(
            drop_into(&tree, "2", DropContainer::Node("4"), 0),
            Err(RearrangeError::InvalidDropTarget("4".into()))
        );
        assert_eq!(
            drop_into(&tree, "2", DropContainer::Node("2"), 0),
            Err(RearrangeError::InvalidDropTarget("2".into()))
        );
        // A sibling subtree is fine
        assert_eq!(
            drop_into(&tree, "2", DropContainer::Node("3"), 0),
            Ok(RearrangeCommand::new("2", "3", 0))
        );
    }

    #[test]
    fn test_distinct_missing_parents_disable_root_moves() {
        let tree = to_tree(vec![
            json!({ "id": "a", "parent": { "id": "x" }, "name": "A" }),
            json!({ "id": "b", "parent": { "id": "y" }, "name": "B" }),
            json!({ "id": "c", "parent": { "id": "y" }, "name": "C" }),
        ]);
        assert_eq!(move_up(&tree, "c").unwrap(), None);
        assert_eq!(move_down(&tree, "b").unwrap(), None);
        assert_eq!(
            drop_into(&tree, "c", DropContainer::Root, 0),
            Err(RearrangeError::UnknownDropTarget)
        );
        assert_eq!(
            drop_into(&tree, "c", DropContainer::Node("a"), 0),
            Ok(RearrangeCommand::new("c", "a", 0))
        );
    }

    #[test]
    fn test_move_up_and_down() {
        let tree = tree();
        // Middle child of A
        assert_eq!(
            move_up(&tree, "5").unwrap(),
            Some(RearrangeCommand::new("5", "2", 0))
        );
        assert_eq!(
            move_down(&tree, "5").unwrap(),
            Some(RearrangeCommand::new("5", "2", 2))
        );
    }

    #[test]
    fn test_move_at_edges_is_noop() {
        let tree = tree();
        assert_eq!(move_up(&tree, "4").unwrap(), None);
        assert_eq!(move_down(&tree, "6").unwrap(), None);
        // Raw shift rule on the first child still yields -1
        assert_eq!(RearrangeCommand::shifted("4", "2", 0, -1).new_index, -1);
    }

    #[test]
    fn test_top_level_reorder_uses_root_id() {
        assert_eq!(
            move_down(&tree(), "2").unwrap(),
            Some(RearrangeCommand::new("2", "1", 1))
        );

        let parentless = to_tree(vec![json!({ "id": "a" }), json!({ "id": "b" })]);
        assert_eq!(move_up(&parentless, "b").unwrap(), None);
    }

    #[test]
    fn test_unknown_entity() {
        assert_eq!(
            move_up(&tree(), "zz"),
            Err(RearrangeError::UnknownEntity("zz".into()))
        );
    }

    #[test]
    fn test_move_to_target() {
        let tree = tree();
        let targets = list_move_targets(&tree, "6");
        let b = targets.iter().find(|t| t.path == "B").unwrap();
        assert_eq!(move_to("6", b), RearrangeCommand::new("6", "3", 0));
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let events = RearrangeEvents::default();
        let mut rx = events.subscribe();

        let cmd = move_down(&tree(), "4").unwrap().unwrap();
        assert_eq!(events.emit(cmd.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), cmd);
    }
}
