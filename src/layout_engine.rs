pub mod engine;
pub mod error;
pub mod graph;

pub use engine::{LayoutCommand, LayoutEngine, LayoutEvent};
pub use error::ConsistencyError;
pub use graph::{ContainerKind, Direction, Orientation};
