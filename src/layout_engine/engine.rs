use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::error::ConsistencyError;
use super::graph::{ContainerKind, Direction, Orientation};
use crate::common::config::LayoutSettings;
use crate::common::geometry::{Vec2, sticks};
use crate::host::{Host, SurfaceId, WorkspaceId};
use crate::model::tree::{GroupNode, Node, NodeId, NodePayload, NodeStore};

/// Dispatcher commands exposed to the host. Argument parsing is host glue;
/// these carry already-typed values.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    MakeGroup(ContainerKind),
    MakeOppositeGroup,
    ShiftFocus(Direction),
    ShiftWindow { direction: Direction, once: bool },
    RaiseFocus,
    ToggleSplit,
    DebugDump,
}

/// Host lifecycle notifications.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    SurfaceAdded { workspace: WorkspaceId, surface: SurfaceId },
    SurfaceRemoved(SurfaceId),
    SurfaceFocused(SurfaceId),
    FullscreenChanged { surface: SurfaceId, fullscreen: bool },
    DragBegan,
    ResizeDelta { workspace: WorkspaceId, delta: Vec2 },
}

/// Which half of the surface a resize drag grabbed, captured on the first
/// delta after a drag begins and reused for the rest of the drag.
#[derive(Debug, Clone, Copy, Default)]
struct DragFlags {
    started: bool,
    x_extent: bool,
    y_extent: bool,
}

/// The tiling layout engine. Owns the node tree for every workspace and keeps
/// geometry and focus state consistent across mutations. All host
/// collaboration goes through the injected `Host`.
pub struct LayoutEngine<H> {
    host: H,
    nodes: NodeStore,
    settings: LayoutSettings,
    drag: DragFlags,
}

impl<H: Host> LayoutEngine<H> {
    pub fn new(host: H, settings: LayoutSettings) -> Self {
        for issue in settings.validate() {
            warn!("layout settings: {issue}");
        }
        LayoutEngine {
            host,
            nodes: NodeStore::new(),
            settings,
            drag: DragFlags::default(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn set_layout_settings(&mut self, settings: &LayoutSettings) {
        for issue in settings.validate() {
            warn!("layout settings: {issue}");
        }
        self.settings = settings.clone();
    }

    /// Drops every node, e.g. when the host switches the engine off.
    pub fn clear(&mut self) {
        self.nodes = NodeStore::new();
        self.drag = DragFlags::default();
    }

    pub fn handle_event(&mut self, event: LayoutEvent) {
        match event {
            LayoutEvent::SurfaceAdded { workspace, surface } => {
                self.insert_surface(workspace, surface)
            }
            LayoutEvent::SurfaceRemoved(surface) => self.remove_surface(surface),
            LayoutEvent::SurfaceFocused(surface) => {
                if let Some(node) = self.nodes.find_by_surface(surface) {
                    self.mark_focused(node);
                }
            }
            LayoutEvent::FullscreenChanged { surface, fullscreen } => {
                self.on_fullscreen_change(surface, fullscreen)
            }
            LayoutEvent::DragBegan => self.begin_drag(),
            LayoutEvent::ResizeDelta { workspace, delta } => self.resize_active(workspace, delta),
        }
    }

    pub fn handle_command(&mut self, workspace: WorkspaceId, command: LayoutCommand) {
        match command {
            LayoutCommand::MakeGroup(kind) => self.make_group_on(workspace, kind),
            LayoutCommand::MakeOppositeGroup => self.make_opposite_group_on(workspace),
            LayoutCommand::ShiftFocus(direction) => self.shift_focus(workspace, direction),
            LayoutCommand::ShiftWindow { direction, once } => {
                self.shift_window(workspace, direction, once)
            }
            LayoutCommand::RaiseFocus => self.raise_focus(workspace),
            LayoutCommand::ToggleSplit => self.toggle_split(workspace),
            LayoutCommand::DebugDump => {
                match self.debug_dump(workspace) {
                    Some(dump) => info!("workspace {workspace:?} nodes:\n{dump}"),
                    None => info!("workspace {workspace:?} has no nodes"),
                }
            }
        }
    }

    // ---- queries ----

    pub fn is_tiled(&self, surface: SurfaceId) -> bool {
        self.nodes.find_by_surface(surface).is_some()
    }

    pub fn workspace_node_count(&self, workspace: WorkspaceId) -> usize {
        self.nodes.count_in_workspace(workspace)
    }

    /// Effective focus target of a workspace, if it holds any nodes.
    pub fn workspace_focused_node(&self, workspace: WorkspaceId) -> Option<NodeId> {
        let root = self.nodes.root_of_workspace(workspace)?;
        Some(self.focused_node(root))
    }

    /// Surface the host should focus next, e.g. after a removal.
    pub fn next_focus_candidate(&self, workspace: WorkspaceId) -> Option<SurfaceId> {
        let node = self.workspace_focused_node(workspace)?;
        self.nodes[node].surface()
    }

    /// Whether the surface sits inside a group that is itself the current
    /// focus target. Hosts use this to render group selection.
    pub fn selection_contains(&self, workspace: WorkspaceId, surface: SurfaceId) -> bool {
        let Some(root) = self.nodes.root_of_workspace(workspace) else {
            return false;
        };
        if self.nodes[root].as_group().is_none_or(|g| g.focused_child.is_none()) {
            return false;
        }
        let focused = self.focused_node(root);
        if !self.nodes[focused].is_group() {
            return false;
        }
        let Some(node) = self.nodes.find_by_surface(surface) else {
            return false;
        };
        node != focused && self.nodes.ancestors(node).any(|a| a == focused)
    }

    // ---- focus state machine ----

    /// Resolves the focus chain below `node`. Leaves and self-focused or
    /// chainless groups terminate the walk.
    pub fn focused_node(&self, node: NodeId) -> NodeId {
        match &self.nodes[node].payload {
            NodePayload::Surface(_) => node,
            NodePayload::Group(group) => {
                if group.group_focused {
                    return node;
                }
                match group.focused_child {
                    Some(child) if self.nodes.contains(child) => self.focused_node(child),
                    _ => node,
                }
            }
        }
    }

    /// Rewrites the focus chain from the workspace root down to `node`.
    ///
    /// Only the previous focus target gets a decoration refresh; the host
    /// refreshes the new target through its own focus-change path, so
    /// refreshing it here would be a double refresh.
    pub fn mark_focused(&mut self, node: NodeId) {
        if !self.nodes.contains(node) {
            return;
        }
        let Some(root) = self.nodes.ancestors(node).last() else {
            return;
        };
        let old_focus = self.focused_node(root);

        if let Some(group) = self.nodes[node].as_group_mut() {
            group.group_focused = true;
            group.focused_child = None;
        }

        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            if let Some(group) = self.nodes.get_mut(parent).and_then(|n| n.as_group_mut()) {
                group.focused_child = Some(current);
                group.group_focused = false;
            }
            current = parent;
        }

        self.refresh_decorations(old_focus);
    }

    /// Marks `node` focused and hands input focus to the host. Groups take
    /// focus as a whole and get raised to keep z-order consistent with tree
    /// order.
    pub fn focus_node(&mut self, node: NodeId) {
        self.mark_focused(node);
        match self.nodes[node].surface() {
            Some(surface) => self.host.focus_surface(Some(surface)),
            None => {
                self.host.focus_surface(None);
                self.raise_to_top(node);
            }
        }
    }

    pub fn raise_to_top(&mut self, node: NodeId) {
        match &self.nodes[node].payload {
            NodePayload::Surface(surface) => self.host.raise_surface(*surface),
            NodePayload::Group(group) => {
                for child in group.children.clone() {
                    self.raise_to_top(child);
                }
            }
        }
    }

    fn refresh_decorations(&mut self, node: NodeId) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        match &n.payload {
            NodePayload::Surface(surface) => {
                if self.host.is_mapped(*surface) {
                    self.host.refresh_decorations(*surface);
                }
            }
            NodePayload::Group(group) => {
                for child in group.children.clone() {
                    self.refresh_decorations(child);
                }
            }
        }
    }

    // ---- geometry propagation ----

    /// Recomputes geometry for `node` and all descendants from its current
    /// rectangle, handing final rectangles to the host at the leaves. `force`
    /// asks the host to skip animation; propagation only forwards it.
    pub fn recalc(&mut self, node: NodeId, force: bool) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        if n.is_leaf() {
            self.apply_surface_geometry(node, force);
            return;
        }
        let (position, size) = (n.position, n.size);
        let has_parent = n.parent.is_some();
        let (kind, children) = match &n.payload {
            NodePayload::Group(group) => (group.kind, group.children.clone()),
            NodePayload::Surface(_) => return,
        };

        // A nested group down to one child renders visually contracted, so
        // the extra container stays noticeable while it exists.
        if children.len() == 1 && has_parent {
            let child = children[0];
            if child == node {
                self.report(ConsistencyError::OwnChild(node));
                return;
            }

            let gaps = self.settings.gaps;
            let distort_out = (gaps.inner.min(gaps.outer) - 1.0).max(0.0);
            let distort_in = gaps.inner * 2.0;

            let c = &mut self.nodes[child];
            match kind {
                ContainerKind::SplitH => {
                    c.position = Vec2::new(position.x - distort_out, position.y);
                    c.size = Vec2::new(size.x - distort_in, size.y);
                }
                ContainerKind::SplitV => {
                    c.position = Vec2::new(position.x, position.y - distort_out);
                    c.size = Vec2::new(size.x, size.y - distort_in);
                }
                ContainerKind::Tabbed => {
                    c.position = position;
                    c.size = size;
                }
            }
            self.recalc(child, force);
            return;
        }

        let constraint = match kind.orientation() {
            Some(Orientation::Horizontal) => size.x,
            Some(Orientation::Vertical) => size.y,
            None => 0.0,
        };
        let ratio_mul = if kind.is_tabbed() || children.is_empty() {
            0.0
        } else {
            constraint / children.len() as f64
        };

        let mut offset = 0.0;
        for child in &children {
            let child = *child;
            // Evicting a stale leaf restructures this group mid-pass and
            // recalculates the survivors itself; this pass must not clobber
            // that geometry with stale ratios.
            if self.nodes.children_of(node) != children {
                return;
            }
            {
                let c = &mut self.nodes[child];
                match kind {
                    ContainerKind::SplitH => {
                        c.position = Vec2::new(position.x + offset, position.y);
                        c.size = Vec2::new(c.size_ratio * ratio_mul, size.y);
                        offset += c.size.x;
                    }
                    ContainerKind::SplitV => {
                        c.position = Vec2::new(position.x, position.y + offset);
                        c.size = Vec2::new(size.x, c.size_ratio * ratio_mul);
                        offset += c.size.y;
                    }
                    ContainerKind::Tabbed => {
                        // Children overlay the whole rectangle. Tab bar
                        // rendering is a documented gap, not handled here.
                        c.position = position;
                        c.size = size;
                    }
                }
            }
            self.recalc(child, force);
        }
    }

    /// Re-derives a workspace root rectangle from the monitor's usable area
    /// and propagates it, e.g. after the host changed outputs or reserved
    /// regions.
    pub fn recalc_workspace(&mut self, workspace: WorkspaceId, force: bool) {
        let Some(root) = self.nodes.root_of_workspace(workspace) else {
            return;
        };
        let Some(monitor) = self.host.monitor_for_workspace(workspace) else {
            self.report(ConsistencyError::Orphaned { node: root, workspace });
            return;
        };
        let usable = monitor.usable();
        {
            let node = &mut self.nodes[root];
            node.position = usable.origin;
            node.size = usable.size;
        }
        self.recalc(root, force);
    }

    /// Hands a leaf's computed rectangle to the host, adjusted for border and
    /// gaps. Stale surfaces are evicted instead of placed.
    fn apply_surface_geometry(&mut self, node: NodeId, force: bool) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        let Some(surface) = n.surface() else {
            return;
        };
        let (position, size, workspace) = (n.position, n.size, n.workspace);

        let Some(monitor) = self.host.monitor_for_workspace(workspace) else {
            self.report(ConsistencyError::Orphaned { node, workspace });
            return;
        };

        if !self.host.is_valid(surface) || !self.host.is_mapped(surface) {
            self.report(ConsistencyError::StaleSurface { node, surface });
            self.remove_surface(surface);
            return;
        }

        let usable = monitor.usable();
        let display_left = sticks(position.x, usable.origin.x);
        let display_top = sticks(position.y, usable.origin.y);
        let display_right = sticks(position.x + size.x, usable.max().x);
        let display_bottom = sticks(position.y + size.y, usable.max().y);

        let only_node = self
            .nodes
            .root_of_workspace(workspace)
            .map(|root| {
                let children = self.nodes.children_of(root);
                children.len() == 1 && self.nodes[children[0]].is_leaf()
            })
            .unwrap_or(false);

        if (self.settings.no_gaps_when_only && only_node) || self.host.is_fullscreen(surface) {
            self.host.apply_geometry(surface, position, size, force);
            return;
        }

        let gaps = self.settings.gaps;
        let offset_top_left = Vec2::new(
            if display_left { gaps.outer } else { gaps.inner },
            if display_top { gaps.outer } else { gaps.inner },
        );
        let offset_bottom_right = Vec2::new(
            if display_right { gaps.outer } else { gaps.inner },
            if display_bottom { gaps.outer } else { gaps.inner },
        );

        let border = Vec2::splat(self.settings.border_size);
        let calc_pos = position + border + offset_top_left;
        let calc_size = size - border * 2.0 - offset_top_left - offset_bottom_right;

        self.host.apply_geometry(surface, calc_pos, calc_size, force);
    }

    // ---- tree mutation ----

    /// Opens a new leaf next to the current focus of its workspace, creating
    /// the workspace root first if none exists.
    pub fn insert_surface(&mut self, workspace: WorkspaceId, surface: SurfaceId) {
        if let Some(existing) = self.nodes.find_by_surface(surface) {
            warn!("surface {surface:?} is already tiled as {existing:?}");
            return;
        }

        let (opening_into, opening_after) = match self.nodes.root_of_workspace(workspace) {
            Some(root) => {
                let focused = self.focused_node(root);
                if self.nodes[focused].is_group() {
                    (focused, None)
                } else {
                    match self.nodes[focused].parent {
                        Some(parent) => (parent, Some(focused)),
                        None => (root, None),
                    }
                }
            }
            None => {
                let Some(monitor) = self.host.monitor_for_workspace(workspace) else {
                    warn!("no monitor for workspace {workspace:?}, dropping surface {surface:?}");
                    return;
                };
                let usable = monitor.usable();
                let mut root = Node::new_group(ContainerKind::SplitH, workspace);
                root.position = usable.origin;
                root.size = usable.size;
                (self.nodes.insert(root), None)
            }
        };

        if self.nodes[opening_into].workspace != workspace {
            warn!(
                "container {opening_into:?} is on workspace {:?}, opening surface from {workspace:?} into it",
                self.nodes[opening_into].workspace
            );
        }

        let node = self.nodes.insert(Node::new_leaf(surface, workspace));
        let at = opening_after.and_then(|after| {
            self.nodes
                .children_of(opening_into)
                .iter()
                .position(|&c| c == after)
                .map(|idx| idx + 1)
        });
        if let Err(err) = self.nodes.attach_child(opening_into, node, at) {
            self.report(err);
            let _ = self.nodes.remove(node);
            return;
        }
        debug!("opened surface {surface:?} as {node:?} after {opening_after:?} in {opening_into:?}");

        self.mark_focused(node);
        self.recalc(opening_into, false);
    }

    /// Removes the leaf holding `surface`, cleaning up the parent chain and
    /// collapsing any container left degenerate by the removal.
    pub fn remove_surface(&mut self, surface: SurfaceId) {
        let Some(node) = self.nodes.find_by_surface(surface) else {
            debug!("surface {surface:?} is not tiled, nothing to remove");
            return;
        };
        debug!("removing {node:?} (surface {surface:?})");

        let parent = self.remove_from_parent_recursive(node);
        if let Err(err) = self.nodes.remove(node) {
            self.report(err);
            return;
        }

        let Some(parent) = parent else {
            return;
        };
        self.recalc(parent, false);

        let lone_group_child = {
            let children = self.nodes.children_of(parent);
            children.len() == 1 && self.nodes[children[0]].is_group()
        };
        if lone_group_child {
            let mut target = Some(parent);
            while let Some(current) = target {
                if !self.swallow_groups(current) {
                    break;
                }
                target = self.nodes[current].parent;
            }
            if target != Some(parent)
                && let Some(target) = target
            {
                self.recalc(target, false);
            }
        }
    }

    /// Unlinks `node` from its parent, walking upward to drop ancestors the
    /// unlink leaves empty. The vacated ratio is redistributed across the
    /// remaining siblings so their sum is conserved. Returns the shallowest
    /// surviving ancestor, or `None` when the walk reached the workspace
    /// root. The root itself always survives, even empty.
    fn remove_from_parent_recursive(&mut self, node: NodeId) -> Option<NodeId> {
        let mut current = node;

        loop {
            let Some(parent) = self.nodes[current].parent else {
                return None;
            };
            let child = current;
            current = parent;

            let child_ratio = self.nodes[child].size_ratio;
            let remaining = {
                let Some(group) = self.nodes.get_mut(current).and_then(|n| n.as_group_mut())
                else {
                    self.report(ConsistencyError::NotAGroup(current));
                    return None;
                };
                let Some(idx) = group.children.iter().position(|&c| c == child) else {
                    self.report(ConsistencyError::MissingChild { parent: current, child });
                    return None;
                };

                // Focus must land on a geometrically adjacent sibling, not an
                // arbitrary one.
                if group.children.len() > 2 {
                    group.focused_child = Some(if idx == 0 {
                        group.children[1]
                    } else {
                        group.children[idx - 1]
                    });
                }
                group.children.remove(idx);
                group.group_focused = false;
                match group.children.len() {
                    0 => group.focused_child = None,
                    1 => group.focused_child = Some(group.children[0]),
                    _ => {}
                }
                group.children.clone()
            };

            self.nodes[child].parent = None;
            if child != node
                && let Err(err) = self.nodes.remove(child)
            {
                self.report(err);
            }

            if !remaining.is_empty() {
                let splitmod = -((1.0 - child_ratio) / remaining.len() as f64);
                for sibling in remaining {
                    self.nodes[sibling].size_ratio += splitmod;
                }
                return Some(current);
            }
            // This level is empty now; the walk continues and removes it too,
            // unless it is the workspace root.
        }
    }

    /// Collapses a single-child group by giving `into` its grandchild's
    /// content in place, preserving `into`'s identity and parent slot. Never
    /// leaves a workspace root holding a bare leaf. Returns whether anything
    /// was collapsed.
    pub fn swallow_groups(&mut self, into: NodeId) -> bool {
        let child = {
            let Some(group) = self.nodes.get(into).and_then(|n| n.as_group()) else {
                return false;
            };
            if group.children.len() != 1 {
                return false;
            }
            group.children[0]
        };
        if !self.nodes.contains(child) {
            return false;
        }
        if self.nodes[into].parent.is_none() && !self.nodes[child].is_group() {
            return false;
        }

        debug!("swallowing {child:?} into {into:?}");
        self.nodes.swap_payload(into, child);
        // The old single-entry group now lives on `child` and points back at
        // it; detach before dropping the orphan.
        self.nodes[child].parent = None;
        if let Err(err) = self.nodes.remove(child) {
            self.report(err);
        }
        true
    }

    /// Wraps `node` in a new single-child group occupying its old slot.
    /// Returns the node's new id inside the wrapper; the wrapper keeps
    /// `node`'s old identity.
    pub fn into_group(&mut self, node: NodeId, kind: ContainerKind) -> NodeId {
        let workspace = self.nodes[node].workspace;
        let inner = self.nodes.insert(Node::new_group(kind, workspace));
        self.nodes[inner].parent = Some(node);
        self.nodes.swap_payload(node, inner);
        self.nodes[node].payload = NodePayload::Group(GroupNode {
            kind,
            children: vec![inner],
            focused_child: Some(inner),
            group_focused: false,
        });
        self.recalc(node, false);
        inner
    }

    /// Turns the focused node of a workspace into a group of the given kind.
    /// A single-child split parent is simply retagged instead of nesting
    /// another level.
    pub fn make_group_on(&mut self, workspace: WorkspaceId, kind: ContainerKind) {
        let Some(node) = self.workspace_focused_node(workspace) else {
            return;
        };
        if let Some(parent) = self.nodes[node].parent
            && let Some(group) = self.nodes[parent].as_group()
            && group.children.len() == 1
            && !group.kind.is_tabbed()
        {
            if let Some(group) = self.nodes[parent].as_group_mut() {
                group.kind = kind;
            }
            self.recalc(parent, false);
            return;
        }
        self.into_group(node, kind);
    }

    /// Like `make_group_on`, with the orientation perpendicular to the
    /// focused node's parent.
    pub fn make_opposite_group_on(&mut self, workspace: WorkspaceId) {
        let Some(node) = self.workspace_focused_node(workspace) else {
            return;
        };
        match self.nodes[node].parent {
            None => {
                self.into_group(node, ContainerKind::SplitH);
            }
            Some(parent) => {
                let Some(group) = self.nodes[parent].as_group() else {
                    self.report(ConsistencyError::NotAGroup(parent));
                    return;
                };
                let kind = group.kind.transposed();
                if group.children.len() == 1 {
                    if let Some(group) = self.nodes[parent].as_group_mut() {
                        group.kind = kind;
                    }
                    self.recalc(parent, false);
                } else {
                    self.into_group(node, kind);
                }
            }
        }
    }

    /// Flips the focused node's parent between horizontal and vertical
    /// splitting. Tabbed parents are left alone.
    pub fn toggle_split(&mut self, workspace: WorkspaceId) {
        let Some(node) = self.workspace_focused_node(workspace) else {
            return;
        };
        let Some(parent) = self.nodes[node].parent else {
            return;
        };
        let Some(group) = self.nodes[parent].as_group_mut() else {
            return;
        };
        match group.kind {
            ContainerKind::SplitH => group.kind = ContainerKind::SplitV,
            ContainerKind::SplitV => group.kind = ContainerKind::SplitH,
            ContainerKind::Tabbed => return,
        }
        self.recalc(parent, false);
    }

    // ---- directional shift ----

    /// Moves focus one step in `direction`, crossing container boundaries.
    pub fn shift_focus(&mut self, workspace: WorkspaceId, direction: Direction) {
        let Some(node) = self.workspace_focused_node(workspace) else {
            return;
        };
        debug!("shift focus {direction:?} from {node:?}");
        let Some(target) = self.shift_or_get_focus(node, direction, false, false) else {
            return;
        };
        self.focus_node(target);

        if self.settings.focus_expands_vertical {
            self.expand_focused_vertical(target);
        }
    }

    /// Re-weights a vertical split so the freshly focused child dominates.
    /// The ratio sum over the container stays conserved.
    fn expand_focused_vertical(&mut self, target: NodeId) {
        const SPLIT_RATIO: f64 = 0.1;

        let Some(parent) = self.nodes[target].parent else {
            return;
        };
        let Some(group) = self.nodes[parent].as_group() else {
            return;
        };
        if group.kind != ContainerKind::SplitV {
            return;
        }
        let children = group.children.clone();
        let count = children.len() as f64;
        for child in children {
            self.nodes[child].size_ratio = if child == target {
                (1.0 - SPLIT_RATIO * (count - 1.0)) * count
            } else {
                SPLIT_RATIO * count
            };
        }
        self.recalc(parent, false);
    }

    /// Moves the focused node one step in `direction`. `once` limits the move
    /// to breaking out of a single container level.
    pub fn shift_window(&mut self, workspace: WorkspaceId, direction: Direction, once: bool) {
        let Some(node) = self.workspace_focused_node(workspace) else {
            return;
        };
        debug!("shift window {direction:?} (once: {once}) from {node:?}");
        self.shift_or_get_focus(node, direction, true, once);
    }

    /// Focuses the parent group of the current focus target.
    pub fn raise_focus(&mut self, workspace: WorkspaceId) {
        let Some(node) = self.workspace_focused_node(workspace) else {
            return;
        };
        if let Some(parent) = self.nodes[node].parent
            && self.nodes[parent].parent.is_some()
        {
            self.focus_node(parent);
            self.refresh_decorations(parent);
        }
    }

    /// The unified boundary-crossing traversal behind focus and window
    /// movement. With `shift` false it only resolves the neighbor in
    /// `direction` and returns it; with `shift` true it relocates `node`
    /// there and returns `None`.
    fn shift_or_get_focus(
        &mut self,
        node: NodeId,
        direction: Direction,
        shift: bool,
        once: bool,
    ) -> Option<NodeId> {
        let forward = direction.is_forward();
        let mut break_origin = node;
        let mut break_parent = self.nodes[break_origin].parent?;
        let mut has_broken_once = false;

        // Break upward until a container oriented along the movement axis
        // where the origin is not on the boundary edge facing the move.
        loop {
            let Some(group) = self.nodes[break_parent].as_group() else {
                self.report(ConsistencyError::NotAGroup(break_parent));
                return None;
            };
            let kind = group.kind;
            let first = group.children.first().copied();
            let last = group.children.last().copied();
            let child_count = group.children.len();
            let holds_node = group.children.contains(&node);

            if kind.matches(direction) {
                if once && shift && has_broken_once {
                    break;
                }
                if break_origin != node {
                    has_broken_once = true;
                }
                let at_edge = if forward {
                    last == Some(break_origin)
                } else {
                    first == Some(break_origin)
                };
                if (has_broken_once && once && shift) || !at_edge {
                    break;
                }
            }

            match self.nodes[break_parent].parent {
                None => {
                    // Movement would exit the workspace root.
                    if !shift {
                        return None;
                    }
                    // Nothing to gain from wrapping a root that already has
                    // the right orientation.
                    if kind.matches(direction) {
                        break;
                    }
                    let axis_kind = ContainerKind::from_orientation(direction.orientation());
                    if !kind.is_tabbed() && child_count == 2 && holds_node {
                        if let Some(group) = self.nodes[break_parent].as_group_mut() {
                            group.kind = axis_kind;
                        }
                    } else {
                        // Interpose a wrapper between the root and its
                        // current content; the root keeps its identity.
                        let (workspace, position, size) = {
                            let n = &self.nodes[break_parent];
                            (n.workspace, n.position, n.size)
                        };
                        let mut wrapped = Node::new_group(axis_kind, workspace);
                        wrapped.position = position;
                        wrapped.size = size;
                        let wrapped = self.nodes.insert(wrapped);
                        self.nodes[wrapped].parent = Some(break_parent);
                        self.nodes.swap_payload(break_parent, wrapped);
                        self.nodes[break_parent].payload = NodePayload::Group(GroupNode {
                            kind: axis_kind,
                            children: vec![wrapped],
                            focused_child: Some(wrapped),
                            group_focused: false,
                        });
                        break_origin = wrapped;
                    }
                    break;
                }
                Some(grandparent) => {
                    break_origin = break_parent;
                    break_parent = grandparent;
                }
            }
        }

        // Resolve the neighbor and the insertion point next to it.
        let parent_children: Vec<NodeId> = self.nodes.children_of(break_parent).to_vec();
        let Some(origin_idx) = parent_children.iter().position(|&c| c == break_origin) else {
            self.report(ConsistencyError::MissingChild {
                parent: break_parent,
                child: break_origin,
            });
            return None;
        };

        let mut target_group = break_parent;
        let insert_idx;

        if origin_idx == 0 && !forward {
            if !shift {
                return None;
            }
            insert_idx = 0;
        } else if origin_idx == parent_children.len() - 1 && forward {
            if !shift {
                return None;
            }
            insert_idx = parent_children.len();
        } else {
            let mut iter_idx = if forward { origin_idx + 1 } else { origin_idx - 1 };
            let neighbor = parent_children[iter_idx];

            if self.nodes[neighbor].is_leaf() || (shift && once && has_broken_once) {
                if !shift {
                    return Some(neighbor);
                }
                insert_idx = if Some(target_group) == self.nodes[node].parent {
                    if forward { iter_idx + 1 } else { iter_idx }
                } else if forward {
                    iter_idx
                } else {
                    iter_idx + 1
                };
            } else {
                // Descend into neighboring groups until a leaf: along the
                // movement axis enter at the near edge, across it follow
                // wherever focus already points.
                let mut current_children = parent_children;
                loop {
                    target_group = current_children[iter_idx];
                    let Some(group) = self.nodes[target_group].as_group() else {
                        self.report(ConsistencyError::NotAGroup(target_group));
                        return None;
                    };
                    if group.children.is_empty() {
                        return None;
                    }

                    let mut shift_after = false;
                    if group.kind.matches(direction) {
                        if forward {
                            iter_idx = 0;
                        } else {
                            iter_idx = group.children.len() - 1;
                            shift_after = true;
                        }
                    } else if let Some(focused) = group.focused_child
                        && let Some(idx) = group.children.iter().position(|&c| c == focused)
                    {
                        iter_idx = idx;
                        shift_after = true;
                    } else {
                        iter_idx = 0;
                    }

                    if shift && once {
                        insert_idx = if shift_after { iter_idx + 1 } else { iter_idx };
                        break;
                    }

                    let entered = group.children[iter_idx];
                    if self.nodes[entered].is_leaf() {
                        if shift {
                            insert_idx = if shift_after { iter_idx + 1 } else { iter_idx };
                            break;
                        }
                        return Some(entered);
                    }
                    current_children = group.children.clone();
                }
            }
        }

        // Apply the move.
        if Some(target_group) == self.nodes[node].parent {
            // Reorder within the same container.
            let Some(group) = self.nodes[target_group].as_group_mut() else {
                return None;
            };
            let Some(old_idx) = group.children.iter().position(|&c| c == node) else {
                self.report(ConsistencyError::MissingChild { parent: target_group, child: node });
                return None;
            };
            group.children.remove(old_idx);
            let at = if insert_idx > old_idx { insert_idx - 1 } else { insert_idx };
            group.children.insert(at, node);
            self.recalc(target_group, false);
        } else {
            // Insert into the destination first so the resolved index stays
            // valid, then unlink from the old spot.
            if let Some(group) = self.nodes[target_group].as_group_mut() {
                let at = insert_idx.min(group.children.len());
                group.children.insert(at, node);
            }
            let old_parent = self.remove_from_parent_recursive(node);
            self.nodes[node].parent = Some(target_group);
            self.nodes[node].size_ratio = 1.0;

            if let Some(old_parent) = old_parent {
                self.recalc(old_parent, false);
            }
            self.recalc(target_group, false);

            // Collapse any degenerate ancestor the move left above the
            // destination.
            let mut target_parent = self.nodes[target_group].parent;
            while let Some(current) = target_parent {
                if !self.swallow_groups(current) {
                    break;
                }
                target_parent = self.nodes[current].parent;
            }

            self.mark_focused(node);

            if let Some(target_parent) = target_parent
                && target_parent != target_group
            {
                self.recalc(target_parent, false);
            }
        }

        None
    }

    // ---- interactive resize ----

    /// Resets drag state; the next resize delta re-captures the grab extents.
    pub fn begin_drag(&mut self) {
        self.drag = DragFlags::default();
    }

    /// Applies one resize-drag delta to the focused node of a workspace.
    pub fn resize_active(&mut self, workspace: WorkspaceId, delta: Vec2) {
        let Some(node) = self.workspace_focused_node(workspace) else {
            return;
        };
        self.resize_node(node, delta);
    }

    /// Applies one resize-drag delta to the node holding `surface`.
    pub fn resize_surface(&mut self, surface: SurfaceId, delta: Vec2) {
        let Some(node) = self.nodes.find_by_surface(surface) else {
            return;
        };
        self.resize_node(node, delta);
    }

    fn resize_node(&mut self, node: NodeId, delta: Vec2) {
        let (position, size, workspace) = {
            let n = &self.nodes[node];
            (n.position, n.size, n.workspace)
        };

        if !self.drag.started {
            match self.host.pointer_position() {
                Some(pointer) => {
                    let offset = pointer - position;
                    self.drag = DragFlags {
                        started: true,
                        x_extent: offset.x > size.x / 2.0,
                        y_extent: offset.y > size.y / 2.0,
                    };
                    debug!(
                        "drag extents captured: x {}, y {}",
                        self.drag.x_extent, self.drag.y_extent
                    );
                }
                None => {
                    self.drag = DragFlags {
                        started: false,
                        x_extent: delta.x > 0.0,
                        y_extent: delta.y > 0.0,
                    };
                }
            }
        }

        let Some(monitor) = self.host.monitor_for_workspace(workspace) else {
            self.report(ConsistencyError::Orphaned { node, workspace });
            return;
        };
        let usable = monitor.usable();

        // A node pinned to the display edge on both sides of an axis cannot
        // resize along that axis.
        let mut allowed = delta;
        if sticks(position.x, usable.origin.x) && sticks(position.x + size.x, usable.max().x) {
            allowed.x = 0.0;
        }
        if sticks(position.y, usable.origin.y) && sticks(position.y + size.y, usable.max().y) {
            allowed.y = 0.0;
        }

        let inner_node = self.resize_break(node, None);
        let Some(inner_parent) = self.nodes[inner_node].parent else {
            return;
        };
        let inner_kind = match self.nodes[inner_parent].as_group() {
            Some(group) => group.kind,
            None => return,
        };
        let outer_node = self.resize_break(inner_node, Some(inner_kind));
        debug!("resize: inner {inner_node:?}, outer {outer_node:?}");

        let force = !self.settings.animate_manual_resizes;

        self.adjust_resize_pair(inner_parent, inner_node, allowed);
        self.recalc(inner_parent, force);

        if outer_node != inner_node
            && let Some(outer_parent) = self.nodes[outer_node].parent
        {
            self.adjust_resize_pair(outer_parent, outer_node, allowed);
            self.recalc(outer_parent, force);
        }
    }

    /// Climbs while the parent is tabbed, matches `skip_kind`, or has the
    /// dragged edge on its own boundary. The returned node's parent is the
    /// container whose ratios the drag adjusts.
    fn resize_break(&self, from: NodeId, skip_kind: Option<ContainerKind>) -> NodeId {
        let mut current = from;
        while let Some(parent) = self.nodes[current].parent {
            let Some(group) = self.nodes[parent].as_group() else {
                break;
            };
            let first = group.children.first().copied();
            let last = group.children.last().copied();
            let climb = if Some(group.kind) == skip_kind {
                true
            } else {
                match group.kind {
                    // Tabbed groups do not exist as far as resizing cares.
                    ContainerKind::Tabbed => true,
                    ContainerKind::SplitH => {
                        (self.drag.x_extent && last == Some(current))
                            || (!self.drag.x_extent && first == Some(current))
                    }
                    ContainerKind::SplitV => {
                        (self.drag.y_extent && last == Some(current))
                            || (!self.drag.y_extent && first == Some(current))
                    }
                }
            };
            if !climb {
                break;
            }
            current = parent;
        }
        current
    }

    /// Converts the pixel delta into a ratio delta and transfers it between
    /// `node` and its neighbor on the dragged side. One gains what the other
    /// loses, so the group's ratio sum is conserved.
    fn adjust_resize_pair(&mut self, parent: NodeId, node: NodeId, allowed: Vec2) {
        let (kind, children) = {
            let Some(group) = self.nodes[parent].as_group() else {
                return;
            };
            (group.kind, group.children.clone())
        };
        let parent_size = self.nodes[parent].size;
        let Some(idx) = children.iter().position(|&c| c == node) else {
            self.report(ConsistencyError::MissingChild { parent, child: node });
            return;
        };

        let (mut ratio_mod, extent) = match kind {
            ContainerKind::SplitH => {
                if parent_size.x <= 0.0 {
                    return;
                }
                (allowed.x * children.len() as f64 / parent_size.x, self.drag.x_extent)
            }
            ContainerKind::SplitV => {
                if parent_size.y <= 0.0 {
                    return;
                }
                (allowed.y * children.len() as f64 / parent_size.y, self.drag.y_extent)
            }
            ContainerKind::Tabbed => return,
        };

        let neighbor_idx = if extent {
            // The dragged edge is the container's own edge; nothing to trade.
            if idx + 1 >= children.len() {
                return;
            }
            idx + 1
        } else {
            if idx == 0 {
                return;
            }
            ratio_mod = -ratio_mod;
            idx - 1
        };

        let neighbor = children[neighbor_idx];
        self.nodes[node].size_ratio += ratio_mod;
        self.nodes[neighbor].size_ratio -= ratio_mod;
    }

    // ---- host lifecycle glue ----

    /// Restores tiled geometry when a surface leaves fullscreen; hands it the
    /// full monitor rectangle when it enters.
    pub fn on_fullscreen_change(&mut self, surface: SurfaceId, fullscreen: bool) {
        let Some(node) = self.nodes.find_by_surface(surface) else {
            return;
        };
        if fullscreen {
            let workspace = self.nodes[node].workspace;
            let Some(monitor) = self.host.monitor_for_workspace(workspace) else {
                self.report(ConsistencyError::Orphaned { node, workspace });
                return;
            };
            self.host.apply_geometry(surface, monitor.position, monitor.size, true);
            self.host.raise_surface(surface);
        } else {
            self.apply_surface_geometry(node, true);
        }
    }

    /// Swaps the surface handle held by a leaf, e.g. window replacement.
    pub fn replace_surface(&mut self, from: SurfaceId, to: SurfaceId) {
        let Some(node) = self.nodes.find_by_surface(from) else {
            return;
        };
        if self.nodes.set_leaf_surface(node, to) {
            self.apply_surface_geometry(node, false);
        }
    }

    // ---- diagnostics ----

    /// Renders a workspace tree as indented text: node kind, id, orientation
    /// or surface tag, and size ratio per node.
    pub fn debug_dump(&self, workspace: WorkspaceId) -> Option<String> {
        let root = self.nodes.root_of_workspace(workspace)?;
        let tree = self.dump_node(root);
        let mut out = String::new();
        ascii_tree::write_tree(&mut out, &tree).ok()?;
        Some(out)
    }

    fn dump_node(&self, node: NodeId) -> ascii_tree::Tree {
        let n = &self.nodes[node];
        match &n.payload {
            NodePayload::Surface(surface) => ascii_tree::Tree::Leaf(vec![format!(
                "window({node:?}) [surface {}] size ratio: {}",
                surface.raw(),
                n.size_ratio
            )]),
            NodePayload::Group(group) => {
                let tag = match group.kind {
                    ContainerKind::SplitH => "splith",
                    ContainerKind::SplitV => "splitv",
                    ContainerKind::Tabbed => "tabs",
                };
                ascii_tree::Tree::Node(
                    format!("group({node:?}) [{tag}] size ratio: {}", n.size_ratio),
                    group.children.iter().map(|&child| self.dump_node(child)).collect(),
                )
            }
        }
    }

    fn report(&mut self, err: ConsistencyError) {
        error!("{err}");
        self.host.notify_error(&err.to_string());
    }
}
