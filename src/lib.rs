//! An i3-style tiling layout engine.
//!
//! Surfaces live in a tree of nested split and tabbed containers, one root
//! group per workspace. The engine owns the tree topology, ratio-based
//! geometry propagation, focus tracking, and the directional algorithms that
//! move focus and nodes across container boundaries. The hosting compositor
//! stays in charge of rendering and input; it drives the engine through
//! [`layout_engine::LayoutEvent`]s and dispatcher
//! [`layout_engine::LayoutCommand`]s, and receives computed rectangles back
//! through the injected [`host::Host`] implementation.

pub mod common;
pub mod host;
pub mod layout_engine;
pub mod model;

pub use common::config::{GapSettings, LayoutSettings};
pub use common::geometry::{Rect, Vec2};
pub use host::{Host, MonitorInfo, SurfaceId, WorkspaceId};
pub use layout_engine::{
    ConsistencyError, ContainerKind, Direction, LayoutCommand, LayoutEngine, LayoutEvent,
    Orientation,
};
pub use model::tree::{GroupNode, Node, NodeId, NodePayload, NodeStore};
