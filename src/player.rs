use std::collections::HashSet;

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

use crate::core::{random_fleet, Coord, Ruleset, ShipPlacement, ShotOutcome, BOARD_SIZE};

/// Decision making for a client seat: where the fleet goes and where to
/// shoot next. Implementations only see their own shot results.
pub trait Player: Send {
    /// Produce a complete fleet for `ruleset`.
    fn place_fleet(
        &mut self,
        rng: &mut SmallRng,
        ruleset: &Ruleset,
    ) -> anyhow::Result<Vec<ShipPlacement>>;

    /// Choose the next target, or `None` once every cell has been tried.
    fn select_target(&mut self, rng: &mut SmallRng) -> Option<Coord>;

    /// Inform the player of the result of its last shot.
    fn handle_shot_result(&mut self, _coord: Coord, _outcome: ShotOutcome) {}

    /// Inform the player of an opponent shot against its board.
    fn handle_opponent_shot(&mut self, _coord: Coord, _outcome: ShotOutcome) {}
}

/// Hunt/target bot: fires at a checkerboard pattern until it hits, then
/// works the neighbours of every hit until the ship sinks.
#[derive(Debug, Default)]
pub struct AiPlayer {
    tried: HashSet<Coord>,
    targets: Vec<Coord>,
}

impl AiPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shots fired so far.
    pub fn shots(&self) -> usize {
        self.tried.len()
    }

    fn untried(&self, parity_only: bool) -> Vec<Coord> {
        (0..BOARD_SIZE)
            .flat_map(|y| (0..BOARD_SIZE).map(move |x| Coord::new(x, y)))
            .filter(|c| !self.tried.contains(c))
            .filter(|c| !parity_only || (c.x + c.y) % 2 == 0)
            .collect()
    }

    fn neighbours(coord: Coord) -> impl Iterator<Item = Coord> {
        let Coord { x, y } = coord;
        [
            x.checked_sub(1).map(|x| Coord::new(x, y)),
            Some(Coord::new(x.saturating_add(1), y)),
            y.checked_sub(1).map(|y| Coord::new(x, y)),
            Some(Coord::new(x, y.saturating_add(1))),
        ]
        .into_iter()
        .flatten()
        .filter(Coord::in_bounds)
    }
}

impl Player for AiPlayer {
    fn place_fleet(
        &mut self,
        rng: &mut SmallRng,
        ruleset: &Ruleset,
    ) -> anyhow::Result<Vec<ShipPlacement>> {
        random_fleet(rng, ruleset)
            .ok_or_else(|| anyhow::anyhow!("could not find a legal placement for {:?}", ruleset.lengths()))
    }

    fn select_target(&mut self, rng: &mut SmallRng) -> Option<Coord> {
        while let Some(coord) = self.targets.pop() {
            if self.tried.insert(coord) {
                return Some(coord);
            }
        }
        let mut pool = self.untried(true);
        if pool.is_empty() {
            pool = self.untried(false);
        }
        let coord = *pool.choose(rng)?;
        self.tried.insert(coord);
        Some(coord)
    }

    fn handle_shot_result(&mut self, coord: Coord, outcome: ShotOutcome) {
        self.tried.insert(coord);
        match outcome {
            ShotOutcome::Hit { sunk: Some(_) } => self.targets.clear(),
            ShotOutcome::Hit { sunk: None } => {
                let fresh: Vec<Coord> = Self::neighbours(coord)
                    .filter(|c| !self.tried.contains(c))
                    .collect();
                self.targets.extend(fresh);
            }
            ShotOutcome::Miss => {}
        }
    }
}
