//! Fleet placement validation.
//!
//! Validation is pure: a proposed fleet is checked against the ruleset and
//! the board geometry without touching any board, so a rejected layout can
//! never leave a half-placed fleet behind. Only a [`ValidatedFleet`] can be
//! committed to a [`Board`](crate::core::board::Board).

use std::collections::HashSet;

use rand::Rng;

use crate::core::common::{Coord, GameError};
use crate::core::config::{Ruleset, BOARD_SIZE};
use crate::core::ship::{Orientation, ShipPlacement};

/// Attempts per ship before a random layout is restarted from scratch.
const PLACEMENT_ATTEMPTS: usize = 100;
/// Full restarts before giving up on a random layout.
const LAYOUT_ROUNDS: usize = 100;

/// Coordinate sets that passed validation, indexed by ship id (ruleset order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFleet {
    ships: Vec<Vec<Coord>>,
}

impl ValidatedFleet {
    pub fn ships(&self) -> &[Vec<Coord>] {
        &self.ships
    }
}

/// Check a proposed fleet against `ruleset`.
///
/// Ships of equal length are matched to ruleset entries in proposal order.
pub fn validate_fleet(
    ruleset: &Ruleset,
    fleet: &[ShipPlacement],
) -> Result<ValidatedFleet, GameError> {
    let mut expected = ruleset.lengths();
    let mut actual: Vec<u8> = fleet.iter().map(|s| s.length).collect();
    expected.sort_unstable();
    actual.sort_unstable();
    if expected != actual {
        return Err(GameError::FleetSizeMismatch { expected, actual });
    }

    for (i, ship) in fleet.iter().enumerate() {
        if let Some(coord) = ship.coords.iter().find(|c| !c.in_bounds()) {
            return Err(GameError::OutOfBounds(*coord));
        }
        if !is_straight_run(ship) {
            return Err(GameError::NonContiguous { ship: i });
        }
    }

    let mut occupied = HashSet::new();
    for coord in fleet.iter().flat_map(|s| s.coords.iter()) {
        if !occupied.insert(*coord) {
            return Err(GameError::Overlap(*coord));
        }
    }

    let mut used = vec![false; fleet.len()];
    let mut ships = Vec::with_capacity(ruleset.len());
    for def in ruleset.ships() {
        let idx = fleet
            .iter()
            .enumerate()
            .position(|(i, s)| !used[i] && s.length == def.length())
            .ok_or_else(|| {
                GameError::Inconsistent(format!("no proposed ship left for length {}", def.length()))
            })?;
        used[idx] = true;
        ships.push(fleet[idx].coords.clone());
    }
    Ok(ValidatedFleet { ships })
}

/// Coordinates must form a gap-free line of exactly `length` cells along the
/// declared axis. Callers have already checked bounds.
fn is_straight_run(ship: &ShipPlacement) -> bool {
    if ship.coords.len() != ship.length as usize {
        return false;
    }
    let (fixed, mut varying): (Vec<u8>, Vec<u8>) = match ship.orientation {
        Orientation::Horizontal => ship.coords.iter().map(|c| (c.y, c.x)).unzip(),
        Orientation::Vertical => ship.coords.iter().map(|c| (c.x, c.y)).unzip(),
    };
    if fixed.windows(2).any(|w| w[0] != w[1]) {
        return false;
    }
    varying.sort_unstable();
    varying.windows(2).all(|w| w[1] == w[0] + 1)
}

/// Generate a random valid fleet for `ruleset`, in ruleset order.
///
/// Returns `None` if no layout was found, which only happens for rulesets
/// that barely fit the board.
pub fn random_fleet<R: Rng + ?Sized>(rng: &mut R, ruleset: &Ruleset) -> Option<Vec<ShipPlacement>> {
    'round: for _ in 0..LAYOUT_ROUNDS {
        let mut occupied: HashSet<Coord> = HashSet::new();
        let mut fleet = Vec::with_capacity(ruleset.len());
        for def in ruleset.ships() {
            let len = def.length();
            let mut placed = None;
            for _ in 0..PLACEMENT_ATTEMPTS {
                let orientation = if rng.random() {
                    Orientation::Horizontal
                } else {
                    Orientation::Vertical
                };
                let (max_x, max_y) = match orientation {
                    Orientation::Horizontal => (BOARD_SIZE.saturating_sub(len), BOARD_SIZE - 1),
                    Orientation::Vertical => (BOARD_SIZE - 1, BOARD_SIZE.saturating_sub(len)),
                };
                let origin = Coord::new(rng.random_range(0..=max_x), rng.random_range(0..=max_y));
                let candidate = ShipPlacement::new(len, origin, orientation);
                if candidate.coords.iter().all(|c| c.in_bounds() && !occupied.contains(c)) {
                    placed = Some(candidate);
                    break;
                }
            }
            match placed {
                Some(ship) => {
                    occupied.extend(ship.coords.iter().copied());
                    fleet.push(ship);
                }
                None => continue 'round,
            }
        }
        return Some(fleet);
    }
    None
}
