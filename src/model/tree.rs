use std::ops::{Index, IndexMut};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::common::geometry::Vec2;
use crate::host::{SurfaceId, WorkspaceId};
use crate::layout_engine::error::ConsistencyError;
use crate::layout_engine::graph::ContainerKind;

slotmap::new_key_type! {
    /// Stable identity for a node. Remains valid while the node moves across
    /// containers and workspaces.
    pub struct NodeId;
}

/// One tiling node: a leaf wrapping a host surface, or a group holding an
/// ordered list of children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Owning group, `None` for workspace roots. Non-owning; the store owns
    /// every node.
    pub parent: Option<NodeId>,
    pub payload: NodePayload,
    /// Last computed geometry. Authoritative for leaves once handed to the
    /// host; working values for groups during propagation.
    pub position: Vec2,
    pub size: Vec2,
    /// Share of the parent's main-axis space. Meaningful only under a split
    /// group; the sum over a group's children is conserved across
    /// insert/remove.
    pub size_ratio: f64,
    pub workspace: WorkspaceId,
}

impl Node {
    pub fn new_leaf(surface: SurfaceId, workspace: WorkspaceId) -> Self {
        Node {
            parent: None,
            payload: NodePayload::Surface(surface),
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            size_ratio: 1.0,
            workspace,
        }
    }

    pub fn new_group(kind: ContainerKind, workspace: WorkspaceId) -> Self {
        Node {
            parent: None,
            payload: NodePayload::Group(GroupNode::new(kind)),
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            size_ratio: 1.0,
            workspace,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.payload, NodePayload::Group(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.payload, NodePayload::Surface(_))
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        match self.payload {
            NodePayload::Surface(surface) => Some(surface),
            NodePayload::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match &self.payload {
            NodePayload::Group(group) => Some(group),
            NodePayload::Surface(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupNode> {
        match &mut self.payload {
            NodePayload::Group(group) => Some(group),
            NodePayload::Surface(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePayload {
    Surface(SurfaceId),
    Group(GroupNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub kind: ContainerKind,
    pub children: Vec<NodeId>,
    /// Child on the focus path downward. Mutually exclusive in meaning with
    /// `group_focused`.
    pub focused_child: Option<NodeId>,
    /// The group itself, not a descendant, is the focus target.
    pub group_focused: bool,
}

impl GroupNode {
    pub fn new(kind: ContainerKind) -> Self {
        GroupNode {
            kind,
            children: Vec::new(),
            focused_child: None,
            group_focused: false,
        }
    }
}

/// Arena owning all nodes across all workspaces, plus a surface lookup index.
///
/// Every relation between nodes is an id lookup into this store; nothing
/// holds references. Removal never cascades: unlinking children first is the
/// caller's job, and the store refuses to remove a node that is still
/// attached to a parent.
#[derive(Default, Serialize, Deserialize)]
pub struct NodeStore {
    nodes: SlotMap<NodeId, Node>,
    by_surface: FxHashMap<SurfaceId, NodeId>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        let surface = node.surface();
        let id = self.nodes.insert(node);
        if let Some(surface) = surface {
            let previous = self.by_surface.insert(surface, id);
            debug_assert!(
                previous.is_none(),
                "surface {surface:?} was already tiled as {previous:?}"
            );
        }
        id
    }

    /// Removes a node. Fails if the node is still linked to a parent; callers
    /// must unlink first.
    pub fn remove(&mut self, id: NodeId) -> Result<Node, ConsistencyError> {
        if let Some(parent) = self.nodes.get(id).and_then(|n| n.parent) {
            return Err(ConsistencyError::StillLinked { node: id, parent });
        }
        let Some(node) = self.nodes.remove(id) else {
            return Err(ConsistencyError::MissingNode(id));
        };
        if let Some(surface) = node.surface()
            && self.by_surface.get(&surface) == Some(&id)
        {
            self.by_surface.remove(&surface);
        }
        Ok(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn find_by_surface(&self, surface: SurfaceId) -> Option<NodeId> {
        self.by_surface.get(&surface).copied()
    }

    pub fn root_of_workspace(&self, workspace: WorkspaceId) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| {
                node.workspace == workspace && node.parent.is_none() && node.is_group()
            })
            .map(|(id, _)| id)
    }

    pub fn count_in_workspace(&self, workspace: WorkspaceId) -> usize {
        self.nodes.iter().filter(|(_, node)| node.workspace == workspace).count()
    }

    /// Iterator over a node and all its ancestors, root last.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = self.nodes.contains_key(id).then_some(id);
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| self.nodes.get(n).and_then(|nd| nd.parent));
            node
        })
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .and_then(|n| n.as_group())
            .map(|g| g.children.as_slice())
            .unwrap_or(&[])
    }

    /// Links `child` into `parent`'s list at `at` (clamped; `None` appends).
    /// Insertion always targets an existing group id and never the child
    /// itself, which keeps the forest acyclic by construction.
    #[track_caller]
    pub fn attach_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        at: Option<usize>,
    ) -> Result<(), ConsistencyError> {
        if parent == child {
            return Err(ConsistencyError::OwnChild(child));
        }
        if !self.nodes.contains_key(child) {
            return Err(ConsistencyError::MissingNode(child));
        }
        debug_assert!(
            !self.ancestors(parent).any(|a| a == child),
            "attaching {child:?} under {parent:?} would create a cycle"
        );
        let Some(group) = self.nodes.get_mut(parent).and_then(|n| n.as_group_mut()) else {
            return Err(ConsistencyError::NotAGroup(parent));
        };
        let at = at.unwrap_or(group.children.len()).min(group.children.len());
        group.children.insert(at, child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Exchanges the payloads of two nodes while preserving both identities,
    /// then repairs child parent links and the surface index.
    pub fn swap_payload(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let Some([node_a, node_b]) = self.nodes.get_disjoint_mut([a, b]) else {
            return;
        };
        std::mem::swap(&mut node_a.payload, &mut node_b.payload);
        self.fix_payload_links(a);
        self.fix_payload_links(b);
    }

    fn fix_payload_links(&mut self, id: NodeId) {
        match &self.nodes[id].payload {
            NodePayload::Surface(surface) => {
                self.by_surface.insert(*surface, id);
            }
            NodePayload::Group(group) => {
                for child in group.children.clone() {
                    if let Some(node) = self.nodes.get_mut(child) {
                        node.parent = Some(id);
                    }
                }
            }
        }
    }

    /// Replaces the surface held by a leaf, keeping the node in place.
    pub fn set_leaf_surface(&mut self, id: NodeId, surface: SurfaceId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let NodePayload::Surface(old) = node.payload else {
            return false;
        };
        node.payload = NodePayload::Surface(surface);
        if self.by_surface.get(&old) == Some(&id) {
            self.by_surface.remove(&old);
        }
        self.by_surface.insert(surface, id);
        true
    }
}

impl Index<NodeId> for NodeStore {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index]
    }
}

impl IndexMut<NodeId> for NodeStore {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.nodes[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WS: WorkspaceId = WorkspaceId::new(1);

    fn sid(raw: u64) -> SurfaceId {
        SurfaceId::new(raw)
    }

    /// Builds a store with a root group holding two leaves.
    fn store_with_root() -> (NodeStore, NodeId, NodeId, NodeId) {
        let mut store = NodeStore::new();
        let root = store.insert(Node::new_group(ContainerKind::SplitH, WS));
        let a = store.insert(Node::new_leaf(sid(1), WS));
        let b = store.insert(Node::new_leaf(sid(2), WS));
        store.attach_child(root, a, None).unwrap();
        store.attach_child(root, b, None).unwrap();
        (store, root, a, b)
    }

    #[test]
    fn insert_and_find_by_surface() {
        let (store, _, a, b) = store_with_root();
        assert_eq!(store.find_by_surface(sid(1)), Some(a));
        assert_eq!(store.find_by_surface(sid(2)), Some(b));
        assert_eq!(store.find_by_surface(sid(3)), None);
    }

    #[test]
    fn root_of_workspace_requires_parentless_group() {
        let (store, root, a, _) = store_with_root();
        assert_eq!(store.root_of_workspace(WS), Some(root));
        assert_eq!(store.root_of_workspace(WorkspaceId::new(2)), None);
        assert_ne!(store.root_of_workspace(WS), Some(a));
    }

    #[test]
    fn count_in_workspace() {
        let (mut store, _, _, _) = store_with_root();
        assert_eq!(store.count_in_workspace(WS), 3);
        let other = WorkspaceId::new(7);
        store.insert(Node::new_group(ContainerKind::SplitV, other));
        assert_eq!(store.count_in_workspace(other), 1);
        assert_eq!(store.count_in_workspace(WS), 3);
    }

    #[test]
    fn remove_refuses_linked_nodes() {
        let (mut store, root, a, _) = store_with_root();
        assert_eq!(
            store.remove(a),
            Err(ConsistencyError::StillLinked { node: a, parent: root })
        );
        store.get_mut(a).unwrap().parent = None;
        assert!(store.remove(a).is_ok());
        assert_eq!(store.find_by_surface(sid(1)), None);
    }

    #[test]
    fn remove_does_not_cascade() {
        let (mut store, root, a, b) = store_with_root();
        store.get_mut(root).unwrap().as_group_mut().unwrap().children.clear();
        store.get_mut(a).unwrap().parent = None;
        store.get_mut(b).unwrap().parent = None;
        store.remove(root).unwrap();
        assert!(store.contains(a));
        assert!(store.contains(b));
    }

    #[test]
    fn remove_missing_node_is_an_error() {
        let mut store = NodeStore::new();
        let id = store.insert(Node::new_group(ContainerKind::SplitH, WS));
        store.remove(id).unwrap();
        assert_eq!(store.remove(id), Err(ConsistencyError::MissingNode(id)));
    }

    #[test]
    fn ancestors_walk_to_the_root() {
        let (mut store, root, a, _) = store_with_root();
        let inner = store.insert(Node::new_group(ContainerKind::SplitV, WS));
        store.attach_child(root, inner, None).unwrap();
        let leaf = store.insert(Node::new_leaf(sid(9), WS));
        store.attach_child(inner, leaf, None).unwrap();

        let chain: Vec<_> = store.ancestors(leaf).collect();
        assert_eq!(chain, vec![leaf, inner, root]);
        let chain: Vec<_> = store.ancestors(a).collect();
        assert_eq!(chain, vec![a, root]);
    }

    #[test]
    fn attach_child_positions() {
        let (mut store, root, a, b) = store_with_root();
        let c = store.insert(Node::new_leaf(sid(3), WS));
        store.attach_child(root, c, Some(1)).unwrap();
        assert_eq!(store.children_of(root), &[a, c, b]);
        assert_eq!(store[c].parent, Some(root));
    }

    #[test]
    fn attach_child_rejects_self_and_non_groups() {
        let (mut store, root, a, _) = store_with_root();
        assert_eq!(
            store.attach_child(root, root, None),
            Err(ConsistencyError::OwnChild(root))
        );
        let c = store.insert(Node::new_leaf(sid(3), WS));
        assert_eq!(
            store.attach_child(a, c, None),
            Err(ConsistencyError::NotAGroup(a))
        );
    }

    #[test]
    fn swap_payload_preserves_identity_and_fixes_links() {
        let (mut store, root, a, b) = store_with_root();
        let inner = store.insert(Node::new_group(ContainerKind::SplitV, WS));
        store.attach_child(root, inner, None).unwrap();
        let leaf = store.insert(Node::new_leaf(sid(9), WS));
        store.attach_child(inner, leaf, None).unwrap();

        store.swap_payload(a, inner);

        // `a` is now the vertical group and owns the grandchild.
        assert_eq!(store.children_of(a), &[leaf]);
        assert_eq!(store[leaf].parent, Some(a));
        // `inner` is now the leaf and the surface index follows it.
        assert_eq!(store[inner].surface(), Some(sid(1)));
        assert_eq!(store.find_by_surface(sid(1)), Some(inner));
        // Identities and slots are untouched.
        assert_eq!(store.children_of(root), &[a, b, inner]);
    }

    #[test]
    fn set_leaf_surface_rekeys_the_index() {
        let (mut store, _, a, _) = store_with_root();
        assert!(store.set_leaf_surface(a, sid(42)));
        assert_eq!(store.find_by_surface(sid(42)), Some(a));
        assert_eq!(store.find_by_surface(sid(1)), None);
        assert_eq!(store[a].surface(), Some(sid(42)));
    }
}
