use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Direction,
    environment::{Action, Observation, WorldError, WumpusWorld},
};

/// Trait defining the behavior of an agent.
/// Policies only ever see the agent's [`Observation`], never the hidden entity positions.
pub trait Policy {
    /// Chooses the next action.
    /// `&mut self` allows the policy to keep memory between steps.
    fn act(&mut self, observation: &Observation) -> Action;

    /// Called at the start of each episode to drop per-episode memory.
    fn reset(&mut self) {}
}

/// A baseline that picks uniformly among all eight actions.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _observation: &Observation) -> Action {
        Action::ALL[self.rng.random_range(0..Action::ALL.len())]
    }
}

/// A baseline that reacts to its senses.
///
/// Fires in a random direction while it smells the wumpus and has arrows, backs out
/// of a cell with a breeze, and otherwise wanders.
#[derive(Debug)]
pub struct CautiousPolicy {
    rng: StdRng,
    last_move: Option<Direction>,
}

impl CautiousPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            last_move: None,
        }
    }

    fn random_direction(&mut self) -> Direction {
        Direction::ALL[self.rng.random_range(0..Direction::ALL.len())]
    }
}

impl Policy for CautiousPolicy {
    fn act(&mut self, observation: &Observation) -> Action {
        if observation.stench && observation.charges > 0 {
            return Action::Shoot(self.random_direction());
        }

        match self.last_move.take() {
            // Retreats are not remembered, so the next cell is explored afresh.
            Some(last) if observation.breeze => Action::Move(last.opposite()),
            _ => {
                let direction = self.random_direction();
                self.last_move = Some(direction);
                Action::Move(direction)
            }
        }
    }

    fn reset(&mut self) {
        self.last_move = None;
    }
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    FoundGold,
    Died,
    /// The step cap ran out first.
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub steps: usize,
    pub total_reward: i64,
    pub outcome: Outcome,
}

/// Resets `world` and plays `policy` until the episode ends or `max_steps` is reached.
pub fn run_episode<P>(
    world: &mut WumpusWorld,
    policy: &mut P,
    max_steps: usize,
) -> Result<EpisodeSummary, WorldError>
where
    P: Policy + ?Sized,
{
    let mut observation = world.reset();
    policy.reset();
    let mut total_reward = 0i64;

    for step in 1..=max_steps {
        let action = policy.act(&observation);
        let transition = world.step(action)?;
        total_reward += i64::from(transition.reward);
        observation = transition.observation;

        if transition.terminated {
            let outcome = if transition.reward > 0 {
                Outcome::FoundGold
            } else {
                Outcome::Died
            };
            debug!(steps = step, total_reward, ?outcome, "episode finished");
            return Ok(EpisodeSummary {
                steps: step,
                total_reward,
                outcome,
            });
        }
    }

    debug!(steps = max_steps, total_reward, "episode truncated");
    Ok(EpisodeSummary {
        steps: max_steps,
        total_reward,
        outcome: Outcome::Truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridPosition, WorldConfig, placement::Layout};
    use std::collections::VecDeque;

    /// Replays a fixed list of actions, then stands against the top wall.
    struct Scripted(VecDeque<Action>);

    impl Policy for Scripted {
        fn act(&mut self, _observation: &Observation) -> Action {
            self.0.pop_front().unwrap_or(Action::Move(Direction::Up))
        }
    }

    fn world(wumpus: (i32, i32), gold: (i32, i32), pits: &[(i32, i32)]) -> WumpusWorld {
        let layout = Layout {
            wumpus: GridPosition::new(wumpus.0, wumpus.1),
            gold: GridPosition::new(gold.0, gold.1),
            pits: pits.iter().map(|&(r, c)| GridPosition::new(r, c)).collect(),
        };
        WumpusWorld::with_layout(WorldConfig::default(), layout).unwrap()
    }

    fn obs(breeze: bool, stench: bool, charges: u32) -> Observation {
        Observation {
            row: 1,
            col: 1,
            breeze,
            stench,
            charges,
        }
    }

    #[test]
    fn scripted_walk_finds_gold() {
        let mut w = world((3, 3), (1, 1), &[]);
        let mut policy = Scripted(
            [Action::Move(Direction::Right), Action::Move(Direction::Down)]
                .into_iter()
                .collect(),
        );
        let summary = run_episode(&mut w, &mut policy, 10).unwrap();
        assert_eq!(
            summary,
            EpisodeSummary {
                steps: 2,
                total_reward: 9,
                outcome: Outcome::FoundGold
            }
        );
    }

    #[test]
    fn falling_into_a_pit_ends_the_run() {
        let mut w = world((3, 3), (2, 2), &[(1, 0)]);
        let mut policy = Scripted([Action::Move(Direction::Down)].into_iter().collect());
        let summary = run_episode(&mut w, &mut policy, 10).unwrap();
        assert_eq!(summary.outcome, Outcome::Died);
        assert_eq!(summary.total_reward, -10);
    }

    #[test]
    fn step_cap_truncates() {
        let mut w = world((3, 3), (2, 2), &[]);
        let mut policy = Scripted(VecDeque::new());
        let summary = run_episode(&mut w, &mut policy, 5).unwrap();
        assert_eq!(summary.outcome, Outcome::Truncated);
        assert_eq!(summary.steps, 5);
        assert_eq!(summary.total_reward, -5);
        assert!(!w.is_terminated());
    }

    #[test]
    fn run_episode_resets_a_finished_world() {
        let mut w = world((3, 3), (0, 1), &[]);
        w.step(Action::Move(Direction::Right)).unwrap();
        assert!(w.is_terminated());
        let summary = run_episode(&mut w, &mut Scripted(VecDeque::new()), 1).unwrap();
        assert_eq!(summary.outcome, Outcome::Truncated);
    }

    #[test]
    fn random_policy_is_seeded() {
        let observation = obs(false, false, 1);
        let mut a = RandomPolicy::new(7);
        let mut b = RandomPolicy::new(7);
        let xs: Vec<_> = (0..32).map(|_| a.act(&observation)).collect();
        let ys: Vec<_> = (0..32).map(|_| b.act(&observation)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn cautious_policy_shoots_on_stench() {
        let mut policy = CautiousPolicy::new(1);
        assert!(matches!(policy.act(&obs(false, true, 1)), Action::Shoot(_)));
        assert!(matches!(policy.act(&obs(false, true, 0)), Action::Move(_)));
    }

    #[test]
    fn cautious_policy_backs_out_of_a_breeze() {
        let mut policy = CautiousPolicy::new(2);
        let Action::Move(first) = policy.act(&obs(false, false, 0)) else {
            panic!("expected a move");
        };
        assert_eq!(
            policy.act(&obs(true, false, 0)),
            Action::Move(first.opposite())
        );
        policy.reset();
        assert!(policy.last_move.is_none());
    }

    #[test]
    fn baselines_finish_episodes_on_random_worlds() {
        for seed in 0..20 {
            let mut w = WumpusWorld::from_seed(WorldConfig::default(), seed).unwrap();
            let mut policy = CautiousPolicy::new(seed);
            let summary = run_episode(&mut w, &mut policy, 200).unwrap();
            assert!(summary.steps >= 1 && summary.steps <= 200);
            assert_eq!(summary.outcome == Outcome::Truncated, !w.is_terminated());
        }
    }
}
