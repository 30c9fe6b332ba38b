use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Whether movement advances towards the end of a child list.
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::Right | Direction::Down)
    }
}

/// How a group partitions its rectangle among children.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    #[default]
    SplitH,
    SplitV,
    Tabbed,
}

impl ContainerKind {
    pub fn from_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => ContainerKind::SplitH,
            Orientation::Vertical => ContainerKind::SplitV,
        }
    }

    /// Main axis of the split. Tabbed groups overlay their children and have
    /// no main axis.
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            ContainerKind::SplitH => Some(Orientation::Horizontal),
            ContainerKind::SplitV => Some(Orientation::Vertical),
            ContainerKind::Tabbed => None,
        }
    }

    pub fn is_tabbed(self) -> bool {
        matches!(self, ContainerKind::Tabbed)
    }

    /// Whether directional movement can travel along this container. Tab
    /// order is not directional, so tabbed groups never match.
    pub fn matches(self, direction: Direction) -> bool {
        self.orientation() == Some(direction.orientation())
    }

    /// The split with the perpendicular axis. Tabbed groups transpose to a
    /// horizontal split.
    pub fn transposed(self) -> Self {
        match self {
            ContainerKind::SplitH => ContainerKind::SplitV,
            ContainerKind::SplitV | ContainerKind::Tabbed => ContainerKind::SplitH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod direction_operations {
        use super::*;

        #[test]
        fn direction_orientation() {
            assert_eq!(Direction::Left.orientation(), Orientation::Horizontal);
            assert_eq!(Direction::Right.orientation(), Orientation::Horizontal);
            assert_eq!(Direction::Up.orientation(), Orientation::Vertical);
            assert_eq!(Direction::Down.orientation(), Orientation::Vertical);
        }

        #[test]
        fn direction_opposite() {
            assert_eq!(Direction::Left.opposite(), Direction::Right);
            assert_eq!(Direction::Right.opposite(), Direction::Left);
            assert_eq!(Direction::Up.opposite(), Direction::Down);
            assert_eq!(Direction::Down.opposite(), Direction::Up);
        }

        #[test]
        fn direction_is_forward() {
            assert!(!Direction::Left.is_forward());
            assert!(Direction::Right.is_forward());
            assert!(!Direction::Up.is_forward());
            assert!(Direction::Down.is_forward());
        }
    }

    mod container_kind_operations {
        use super::*;

        #[test]
        fn container_orientation() {
            assert_eq!(ContainerKind::SplitH.orientation(), Some(Orientation::Horizontal));
            assert_eq!(ContainerKind::SplitV.orientation(), Some(Orientation::Vertical));
            assert_eq!(ContainerKind::Tabbed.orientation(), None);
        }

        #[test]
        fn tabbed_never_matches_a_direction() {
            for direction in [Direction::Left, Direction::Right, Direction::Up, Direction::Down] {
                assert!(!ContainerKind::Tabbed.matches(direction));
            }
        }

        #[test]
        fn split_matches_its_axis() {
            assert!(ContainerKind::SplitH.matches(Direction::Left));
            assert!(ContainerKind::SplitH.matches(Direction::Right));
            assert!(!ContainerKind::SplitH.matches(Direction::Down));
            assert!(ContainerKind::SplitV.matches(Direction::Up));
            assert!(!ContainerKind::SplitV.matches(Direction::Left));
        }

        #[test]
        fn transposed() {
            assert_eq!(ContainerKind::SplitH.transposed(), ContainerKind::SplitV);
            assert_eq!(ContainerKind::SplitV.transposed(), ContainerKind::SplitH);
            assert_eq!(ContainerKind::Tabbed.transposed(), ContainerKind::SplitH);
        }
    }
}
