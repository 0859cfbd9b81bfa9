use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use wumpus_world_core::{
    Action, GridPosition, RejectDuplicates, WorldConfig, WumpusWorld,
    environment::{DEATH_REWARD, GOLD_REWARD, STEP_REWARD},
};

fn arb_config() -> impl Strategy<Value = WorldConfig> {
    (1usize..8, 0usize..6, 0u32..4).prop_map(|(size, pits, charges)| {
        WorldConfig::default()
            .with_size(size)
            .with_hazard_count(pits)
            .with_max_charges(charges)
    })
}

proptest! {
    #[test]
    fn construction_starts_every_episode_the_same(config in arb_config(), seed in any::<u64>()) {
        let mut world = WumpusWorld::from_seed(config, seed).unwrap();
        prop_assert_eq!(world.agent(), GridPosition::ORIGIN);
        prop_assert!(!world.is_terminated());
        prop_assert_eq!(world.charges(), config.max_charges);
        prop_assert!(world.wumpus().is_on_board(config.size));
        prop_assert!(world.gold().is_on_board(config.size));
        prop_assert_eq!(world.pits().len(), config.hazard_count);
        prop_assert_eq!(world.reset(), world.observe());
    }

    #[test]
    fn steps_preserve_world_invariants(
        config in arb_config(),
        seed in any::<u64>(),
        actions in prop::collection::vec(0i64..8, 0..64),
    ) {
        let mut world = WumpusWorld::from_seed(config, seed).unwrap();
        for raw in actions {
            if world.is_terminated() {
                world.reset();
            }
            let action = Action::try_from(raw).unwrap();
            let (charges_before, wumpus_before) = (world.charges(), world.wumpus());
            let t = world.step(action).unwrap();

            let agent = world.agent();
            prop_assert!(agent.is_on_board(config.size));
            prop_assert!(world.charges() <= config.max_charges);
            let wumpus = world.wumpus();
            prop_assert!(wumpus.is_on_board(config.size) || wumpus == GridPosition::REMOVED);

            match action {
                Action::Shoot(_) if charges_before == 0 => {
                    prop_assert_eq!(world.charges(), 0);
                    prop_assert_eq!(wumpus, wumpus_before);
                }
                Action::Shoot(_) => prop_assert_eq!(world.charges(), charges_before - 1),
                Action::Move(_) => {
                    prop_assert_eq!(world.charges(), charges_before);
                    prop_assert_eq!(wumpus, wumpus_before);
                }
            }

            let near_pit = world.pits().iter().any(|p| agent.manhattan_distance(p) <= 1);
            prop_assert_eq!(t.observation.breeze, near_pit);
            prop_assert_eq!(t.observation.stench, agent.manhattan_distance(&wumpus) <= 1);
            prop_assert_eq!(t.observation.charges, world.charges());

            let dead = agent == wumpus || world.pits().contains(&agent);
            let expected = if dead {
                (DEATH_REWARD, true)
            } else if agent == world.gold() {
                (GOLD_REWARD, true)
            } else {
                (STEP_REWARD, false)
            };
            prop_assert_eq!((t.reward, t.terminated), expected);
            prop_assert_eq!(world.is_terminated(), t.terminated);
        }
    }

    #[test]
    fn terminated_world_refuses_steps(config in arb_config(), seed in any::<u64>(), raw in 0i64..8) {
        let mut world = WumpusWorld::from_seed(config, seed).unwrap();
        let mut guard = 0;
        // Walk down then right until something ends the episode or we give up.
        while !world.is_terminated() && guard < 2 * config.size + 2 {
            let raw_move = if guard % 2 == 0 { 1 } else { 2 };
            world.step_index(raw_move).unwrap();
            guard += 1;
        }
        if world.is_terminated() {
            let agent = world.agent();
            prop_assert!(world.step_index(raw).is_err());
            prop_assert_eq!(world.agent(), agent);
            world.reset();
            prop_assert!(world.step_index(raw).is_ok());
        }
    }

    #[test]
    fn out_of_range_actions_are_rejected(raw in prop_oneof![i64::MIN..0, 8i64..i64::MAX]) {
        let mut world = WumpusWorld::from_seed(WorldConfig::default(), 0).unwrap();
        let before = world.observe();
        prop_assert!(world.step_index(raw).is_err());
        prop_assert_eq!(world.observe(), before);
    }

    #[test]
    fn distinct_placement_never_overlaps(size in 2usize..7, seed in any::<u64>()) {
        let pits = size * size - 2;
        let config = WorldConfig::default().with_size(size).with_hazard_count(pits);
        let world = WumpusWorld::with_strategy(config, &RejectDuplicates, &mut StdRng::seed_from_u64(seed)).unwrap();
        let mut cells = vec![world.wumpus(), world.gold()];
        cells.extend_from_slice(world.pits());
        cells.sort_by_key(|p| (p.row, p.col));
        cells.dedup();
        prop_assert_eq!(cells.len(), size * size);
    }
}
