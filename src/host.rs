//! Collaborator contract towards the compositor hosting the engine.
//!
//! The engine never owns surfaces. It computes rectangles for them, asks the
//! host to apply those rectangles, and queries the host for the little
//! environment state it needs. Everything else (rendering, input, workspace
//! enumeration) stays on the host side.

use serde::{Deserialize, Serialize};

use crate::common::geometry::{Rect, Vec2};

/// Opaque handle to a host-owned surface. The engine only compares and
/// forwards these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub const fn new(raw: u64) -> Self {
        SurfaceId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Identifies one logical workspace. Each workspace holds at most one root
/// group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(u32);

impl WorkspaceId {
    pub const fn new(raw: u32) -> Self {
        WorkspaceId(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Geometry of the output a workspace is shown on, including the regions
/// reserved for bars and docks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub position: Vec2,
    pub size: Vec2,
    pub reserved_top_left: Vec2,
    pub reserved_bottom_right: Vec2,
}

impl MonitorInfo {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        MonitorInfo {
            position,
            size,
            ..Default::default()
        }
    }

    /// The area tiled nodes may occupy.
    pub fn usable(&self) -> Rect {
        Rect::new(
            self.position + self.reserved_top_left,
            self.size - self.reserved_top_left - self.reserved_bottom_right,
        )
    }
}

/// Host callbacks and queries consumed by the engine. Injected at
/// construction; the engine holds no global handles.
pub trait Host {
    /// Applies a computed rectangle to a surface. `force` requests an
    /// immediate jump instead of an animated transition.
    fn apply_geometry(&mut self, surface: SurfaceId, position: Vec2, size: Vec2, force: bool);

    fn is_valid(&self, surface: SurfaceId) -> bool;
    fn is_mapped(&self, surface: SurfaceId) -> bool;
    fn is_fullscreen(&self, surface: SurfaceId) -> bool;

    fn raise_surface(&mut self, surface: SurfaceId);

    /// `None` means the engine focused a container rather than a surface.
    fn focus_surface(&mut self, surface: Option<SurfaceId>);

    fn refresh_decorations(&mut self, surface: SurfaceId);

    fn monitor_for_workspace(&self, workspace: WorkspaceId) -> Option<MonitorInfo>;

    /// Current pointer position, used to decide which half of a surface a
    /// resize drag grabbed. Hosts without pointer state may return `None`;
    /// the drag edge is then inferred from the delta sign.
    fn pointer_position(&self) -> Option<Vec2> {
        None
    }

    /// User-visible channel for consistency errors, shown in addition to the
    /// log entry.
    fn notify_error(&mut self, message: &str);
}
