use thiserror::Error;

use crate::host::{SurfaceId, WorkspaceId};
use crate::model::tree::NodeId;

/// Structural consistency errors. These indicate a prior invariant violation;
/// operations report them through the diagnostic channel and degrade instead
/// of corrupting further state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("group {0:?} has become its own child")]
    OwnChild(NodeId),

    #[error("node {child:?} is missing from the child list of {parent:?}")]
    MissingChild { parent: NodeId, child: NodeId },

    #[error("node {0:?} is not a group and cannot hold children")]
    NotAGroup(NodeId),

    #[error("node {0:?} does not exist in the store")]
    MissingNode(NodeId),

    #[error("cannot remove node {node:?}: still linked to parent {parent:?}")]
    StillLinked { node: NodeId, parent: NodeId },

    #[error("node {node:?} has no monitor for workspace {workspace:?}")]
    Orphaned { node: NodeId, workspace: WorkspaceId },

    #[error("leaf {node:?} holds surface {surface:?} that is no longer valid or mapped")]
    StaleSurface { node: NodeId, surface: SurfaceId },
}
