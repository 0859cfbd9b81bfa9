use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod environment;
pub mod map;
pub mod placement;

pub use config::{ConfigError, WorldConfig};
pub use environment::{Action, Observation, Transition, WorldError, WorldSnapshot, WumpusWorld};
pub use placement::{AllowDuplicates, Layout, PlacementStrategy, RejectDuplicates};

/// A `(row, col)` coordinate on the board.
///
/// Coordinates are signed so that a removed entity can sit at the off-board
/// [`GridPosition::REMOVED`] sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: i32,
    pub col: i32,
}

impl GridPosition {
    /// Where a slain wumpus is parked for the rest of the world's lifetime.
    pub const REMOVED: GridPosition = GridPosition { row: -10, col: -10 };

    /// The agent's starting cell.
    pub const ORIGIN: GridPosition = GridPosition { row: 0, col: 0 };

    pub const fn new(row: i32, col: i32) -> Self {
        GridPosition { row, col }
    }

    /// Returns the manhattan distance between two positions.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u64 {
        u64::from(self.row.abs_diff(other.row)) + u64::from(self.col.abs_diff(other.col))
    }

    /// Returns the neighbouring position one step in `direction`. The result may be off-board.
    pub fn offset(&self, direction: Direction) -> GridPosition {
        let (dr, dc) = direction.delta();
        GridPosition {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Checks if the position lies on a `size × size` board.
    #[inline]
    pub fn is_on_board(&self, size: usize) -> bool {
        let within = |v: i32| usize::try_from(v).is_ok_and(|v| v < size);
        within(self.row) && within(self.col)
    }
}

/// One of the four grid directions used for both movement and shooting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Right,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Right,
        Direction::Left,
    ];

    /// Row/col delta of a single step.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Right => (0, 1),
            Direction::Left => (0, -1),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
        }
    }
}

/// What occupies a cell, as far as a renderer is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Agent,
    Wumpus,
    Gold,
    Pit,
}
