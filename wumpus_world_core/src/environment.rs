use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Direction, Entity, GridPosition,
    config::{ConfigError, WorldConfig},
    map::Grid,
    placement::{AllowDuplicates, Layout, LayoutError, PlacementError, PlacementStrategy},
};

/// Reward for any step that does not end the episode.
pub const STEP_REWARD: i32 = -1;
/// Reward for walking into a pit or a live wumpus.
pub const DEATH_REWARD: i32 = -10;
/// Reward for reaching the gold.
pub const GOLD_REWARD: i32 = 10;

/// Errors surfaced by [`WumpusWorld`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("episode has terminated; call reset() before stepping again")]
    EpisodeTerminated,
    #[error("action {0} is outside the valid range 0..8")]
    InvalidAction(i64),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// The eight discrete actions available to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Move(Direction),
    /// Spend an arrow along the half-line in the given direction.
    Shoot(Direction),
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; 8] = [
        Action::Move(Direction::Up),
        Action::Move(Direction::Down),
        Action::Move(Direction::Right),
        Action::Move(Direction::Left),
        Action::Shoot(Direction::Up),
        Action::Shoot(Direction::Down),
        Action::Shoot(Direction::Right),
        Action::Shoot(Direction::Left),
    ];

    /// The action's index in `0..8`.
    pub fn index(self) -> usize {
        let (base, direction) = match self {
            Action::Move(d) => (0, d),
            Action::Shoot(d) => (4, d),
        };
        let offset = match direction {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Right => 2,
            Direction::Left => 3,
        };
        base + offset
    }
}

impl TryFrom<i64> for Action {
    type Error = WorldError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Action::ALL.get(i).copied())
            .ok_or(WorldError::InvalidAction(value))
    }
}

/// What the agent perceives after a reset or a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub row: usize,
    pub col: usize,
    /// A pit is within one step.
    pub breeze: bool,
    /// The wumpus is within one step.
    pub stench: bool,
    /// Arrows left.
    pub charges: u32,
}

impl Observation {
    /// Flattens the observation into `(row, col, breeze, stench, charges)`.
    pub fn as_tuple(&self) -> (usize, usize, u8, u8, u32) {
        (
            self.row,
            self.col,
            u8::from(self.breeze),
            u8::from(self.stench),
            self.charges,
        )
    }
}

/// Per-step auxiliary information. Currently carries nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {}

/// Outcome of a single [`WumpusWorld::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub observation: Observation,
    pub reward: i32,
    pub terminated: bool,
    pub info: StepInfo,
}

/// Cardinalities of the discrete observation tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub rows: usize,
    pub cols: usize,
    pub breeze: usize,
    pub stench: usize,
    pub charges: usize,
}

/// Provides a read-only view of the world for renderers.
#[derive(Debug, Clone, Copy)]
pub struct WorldSnapshot<'a> {
    pub size: usize,
    pub agent: GridPosition,
    pub wumpus: GridPosition,
    pub gold: GridPosition,
    pub pits: &'a [GridPosition],
    pub charges: u32,
    pub terminated: bool,
}

impl WorldSnapshot<'_> {
    /// Returns the entity drawn at a cell. Overlaps resolve as agent, wumpus, gold, pit.
    pub fn entity_at(&self, row: usize, col: usize) -> Option<Entity> {
        let (Ok(row), Ok(col)) = (i32::try_from(row), i32::try_from(col)) else {
            return None;
        };
        let cell = GridPosition::new(row, col);
        if cell == self.agent {
            Some(Entity::Agent)
        } else if cell == self.wumpus {
            Some(Entity::Wumpus)
        } else if cell == self.gold {
            Some(Entity::Gold)
        } else if self.pits.contains(&cell) {
            Some(Entity::Pit)
        } else {
            None
        }
    }

    /// Builds a grid holding the drawn entity of every cell.
    pub fn to_grid(&self) -> Grid<Option<Entity>> {
        Grid::from_generator(self.size, self.size, |row, col| self.entity_at(row, col))
    }
}

/// The Wumpus world state machine.
///
/// Entity positions are drawn once at construction. [`WumpusWorld::reset`] only
/// restores the agent, its arrows and the episode flag, so a slain wumpus stays
/// slain until the world is rebuilt.
#[derive(Debug, Clone)]
pub struct WumpusWorld {
    config: WorldConfig,
    agent: GridPosition,
    charges: u32,
    wumpus: GridPosition,
    gold: GridPosition,
    pits: Vec<GridPosition>,
    terminated: bool,
}

impl WumpusWorld {
    /// Creates a world with entities drawn independently from `rng`.
    pub fn new<R: RngCore>(config: WorldConfig, rng: &mut R) -> Result<Self, WorldError> {
        Self::with_strategy(config, &AllowDuplicates, rng)
    }

    /// Creates a world seeded from a `u64`.
    pub fn from_seed(config: WorldConfig, seed: u64) -> Result<Self, WorldError> {
        Self::new(config, &mut StdRng::seed_from_u64(seed))
    }

    /// Creates a world whose entities are placed by `strategy`.
    pub fn with_strategy<S, R>(
        config: WorldConfig,
        strategy: &S,
        rng: &mut R,
    ) -> Result<Self, WorldError>
    where
        S: PlacementStrategy + ?Sized,
        R: RngCore,
    {
        config.validate()?;
        let layout = strategy.place(&config, rng)?;
        Self::with_layout(config, layout)
    }

    /// Creates a world from fixed entity positions.
    ///
    /// The layout's pit count replaces `config.hazard_count`.
    pub fn with_layout(mut config: WorldConfig, layout: Layout) -> Result<Self, WorldError> {
        config.validate()?;
        layout.validate(config.size)?;
        config.hazard_count = layout.pits.len();

        info!(
            size = config.size,
            pits = config.hazard_count,
            max_charges = config.max_charges,
            wumpus = ?layout.wumpus,
            gold = ?layout.gold,
            "built wumpus world"
        );

        Ok(WumpusWorld {
            config,
            agent: GridPosition::ORIGIN,
            charges: config.max_charges,
            wumpus: layout.wumpus,
            gold: layout.gold,
            pits: layout.pits,
            terminated: false,
        })
    }

    /// Starts a new episode and returns its first observation.
    pub fn reset(&mut self) -> Observation {
        self.agent = GridPosition::ORIGIN;
        self.charges = self.config.max_charges;
        self.terminated = false;
        debug!(wumpus_alive = self.is_wumpus_alive(), "episode reset");
        self.observe()
    }

    /// Applies one action and scores the result.
    pub fn step(&mut self, action: Action) -> Result<Transition, WorldError> {
        if self.terminated {
            return Err(WorldError::EpisodeTerminated);
        }

        match action {
            Action::Move(direction) => self.move_agent(direction),
            Action::Shoot(direction) => self.shoot(direction),
        }

        let reward = self.score();
        let observation = self.observe();
        debug!(
            ?action,
            reward,
            terminated = self.terminated,
            row = observation.row,
            col = observation.col,
            "step"
        );
        if self.terminated {
            info!(reward, agent = ?self.agent, "episode terminated");
        }

        Ok(Transition {
            observation,
            reward,
            terminated: self.terminated,
            info: StepInfo::default(),
        })
    }

    /// Like [`WumpusWorld::step`] but takes the raw action index.
    ///
    /// A terminated episode is reported before an out-of-range action.
    pub fn step_index(&mut self, action: i64) -> Result<Transition, WorldError> {
        if self.terminated {
            return Err(WorldError::EpisodeTerminated);
        }
        self.step(Action::try_from(action)?)
    }

    /// Reads the agent's sensors.
    pub fn observe(&self) -> Observation {
        let stench = self.agent.manhattan_distance(&self.wumpus) <= 1;
        let breeze = self
            .pits
            .iter()
            .any(|pit| self.agent.manhattan_distance(pit) <= 1);
        Observation {
            // The agent never leaves the board, so both coordinates are non-negative.
            row: self.agent.row as usize,
            col: self.agent.col as usize,
            breeze,
            stench,
            charges: self.charges,
        }
    }

    fn move_agent(&mut self, direction: Direction) {
        let target = self.agent.offset(direction);
        if target.is_on_board(self.config.size) {
            self.agent = target;
        }
    }

    fn shoot(&mut self, direction: Direction) {
        if self.charges == 0 {
            return;
        }
        self.charges -= 1;

        let (agent, wumpus) = (self.agent, self.wumpus);
        let hit = match direction {
            Direction::Up => wumpus.col == agent.col && wumpus.row < agent.row,
            Direction::Down => wumpus.col == agent.col && wumpus.row > agent.row,
            Direction::Right => wumpus.row == agent.row && wumpus.col > agent.col,
            Direction::Left => wumpus.row == agent.row && wumpus.col < agent.col,
        };
        if hit {
            info!(?direction, wumpus = ?wumpus, "arrow killed the wumpus");
            self.wumpus = GridPosition::REMOVED;
        }
    }

    fn score(&mut self) -> i32 {
        if self.agent == self.wumpus || self.pits.contains(&self.agent) {
            self.terminated = true;
            DEATH_REWARD
        } else if self.agent == self.gold {
            self.terminated = true;
            GOLD_REWARD
        } else {
            STEP_REWARD
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }
    pub fn size(&self) -> usize {
        self.config.size
    }
    pub fn agent(&self) -> GridPosition {
        self.agent
    }
    pub fn wumpus(&self) -> GridPosition {
        self.wumpus
    }
    pub fn gold(&self) -> GridPosition {
        self.gold
    }
    pub fn pits(&self) -> &[GridPosition] {
        &self.pits
    }
    pub fn charges(&self) -> u32 {
        self.charges
    }
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
    pub fn is_wumpus_alive(&self) -> bool {
        self.wumpus != GridPosition::REMOVED
    }

    /// Number of discrete actions.
    pub fn action_count(&self) -> usize {
        Action::ALL.len()
    }

    pub fn observation_space(&self) -> ObservationSpace {
        ObservationSpace {
            rows: self.config.size,
            cols: self.config.size,
            breeze: 2,
            stench: 2,
            charges: self.config.max_charges as usize + 1,
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot<'_> {
        WorldSnapshot {
            size: self.config.size,
            agent: self.agent,
            wumpus: self.wumpus,
            gold: self.gold,
            pits: &self.pits,
            charges: self.charges,
            terminated: self.terminated,
        }
    }
}
