//! Where the wumpus, the gold and the pits go when a world is built.

use std::collections::HashSet;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    GridPosition,
    config::{ConfigError, WorldConfig},
};

/// Errors raised by a [`PlacementStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{needed} entities need distinct cells but the board only has {available}")]
    NotEnoughCells { needed: usize, available: usize },
}

/// Errors raised while loading or checking a fixed [`Layout`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout map is empty")]
    Empty,
    #[error("layout must be square: row {row} has {found} cells, expected {expected}")]
    NotSquare {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown layout token '{token}' at ({row}, {col})")]
    UnknownToken {
        token: String,
        row: usize,
        col: usize,
    },
    #[error("layout has no {0}")]
    Missing(&'static str),
    #[error("layout has more than one {0}")]
    Duplicate(&'static str),
    #[error("{entity} at ({}, {}) is off a board of size {size}", .position.row, .position.col)]
    OffBoard {
        entity: &'static str,
        position: GridPosition,
        size: usize,
    },
}

/// Positions drawn once per world and kept across resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub wumpus: GridPosition,
    pub gold: GridPosition,
    pub pits: Vec<GridPosition>,
}

impl Layout {
    /// Checks every entity sits on a `size × size` board.
    pub fn validate(&self, size: usize) -> Result<(), LayoutError> {
        let entities = [("wumpus", &self.wumpus), ("gold", &self.gold)]
            .into_iter()
            .chain(self.pits.iter().map(|pit| ("pit", pit)));
        for (entity, position) in entities {
            if !position.is_on_board(size) {
                return Err(LayoutError::OffBoard {
                    entity,
                    position: *position,
                    size,
                });
            }
        }
        Ok(())
    }
}

/// Decides where entities start when a world is constructed.
pub trait PlacementStrategy {
    fn place(&self, config: &WorldConfig, rng: &mut dyn RngCore) -> Result<Layout, PlacementError>;
}

/// Draws every entity independently and uniformly over the board. Entities may share a cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowDuplicates;

impl PlacementStrategy for AllowDuplicates {
    fn place(&self, config: &WorldConfig, rng: &mut dyn RngCore) -> Result<Layout, PlacementError> {
        config.validate()?;
        let size = config.size as i32;
        let wumpus = random_cell(size, rng);
        let gold = random_cell(size, rng);
        let pits = (0..config.hazard_count)
            .map(|_| random_cell(size, &mut *rng))
            .collect();
        let layout = Layout { wumpus, gold, pits };
        trace!(?layout, "placed entities allowing shared cells");
        Ok(layout)
    }
}

/// Draws entities in the same order as [`AllowDuplicates`] but redraws any cell already taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectDuplicates;

impl PlacementStrategy for RejectDuplicates {
    fn place(&self, config: &WorldConfig, rng: &mut dyn RngCore) -> Result<Layout, PlacementError> {
        config.validate()?;
        let needed = config.hazard_count.saturating_add(2);
        let available = config.cell_count();
        if needed > available {
            return Err(PlacementError::NotEnoughCells { needed, available });
        }

        let size = config.size as i32;
        let mut occupied: HashSet<GridPosition> = HashSet::with_capacity(needed);
        let mut draw = |rng: &mut dyn RngCore| loop {
            let cell = random_cell(size, rng);
            if occupied.insert(cell) {
                return cell;
            }
        };

        let wumpus = draw(&mut *rng);
        let gold = draw(&mut *rng);
        let pits = (0..config.hazard_count).map(|_| draw(&mut *rng)).collect();
        let layout = Layout { wumpus, gold, pits };
        trace!(?layout, "placed entities on distinct cells");
        Ok(layout)
    }
}

fn random_cell(size: i32, rng: &mut dyn RngCore) -> GridPosition {
    GridPosition::new(rng.random_range(0..size), rng.random_range(0..size))
}

/// Loads a fixed layout from a text map.
///
/// Each line is a board row of whitespace-separated tokens: `.` empty, `W` wumpus,
/// `G` gold, `P` pit. The map must be square and hold exactly one wumpus and one gold.
/// Returns the board size alongside the layout.
pub fn parse_layout(map_string: &str) -> Result<(usize, Layout), LayoutError> {
    let lines: Vec<&str> = map_string
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return Err(LayoutError::Empty);
    }

    let size = lines.len();
    let mut wumpus = None;
    let mut gold = None;
    let mut pits = Vec::new();

    for (row, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != size {
            return Err(LayoutError::NotSquare {
                row,
                expected: size,
                found: tokens.len(),
            });
        }
        for (col, token) in tokens.iter().enumerate() {
            let pos = GridPosition::new(row as i32, col as i32);
            match *token {
                "." => {}
                "W" => {
                    if wumpus.replace(pos).is_some() {
                        return Err(LayoutError::Duplicate("wumpus"));
                    }
                }
                "G" => {
                    if gold.replace(pos).is_some() {
                        return Err(LayoutError::Duplicate("gold"));
                    }
                }
                "P" => pits.push(pos),
                unknown => {
                    return Err(LayoutError::UnknownToken {
                        token: unknown.to_string(),
                        row,
                        col,
                    });
                }
            }
        }
    }

    let layout = Layout {
        wumpus: wumpus.ok_or(LayoutError::Missing("wumpus"))?,
        gold: gold.ok_or(LayoutError::Missing("gold"))?,
        pits,
    };
    Ok((size, layout))
}
