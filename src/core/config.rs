use core::str::FromStr;

use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: u8 = 10;

/// Upper bound on the total ship cells of a ruleset; keeps random fleets placeable.
pub const MAX_FLEET_CELLS: usize = (BOARD_SIZE as usize * BOARD_SIZE as usize) / 2;

/// Ship class: display name and length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipDef {
    name: String,
    length: u8,
}

impl ShipDef {
    pub fn new(name: impl Into<String>, length: u8) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length(&self) -> u8 {
        self.length
    }
}

/// Errors raised while building a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("ruleset must contain at least one ship")]
    EmptyRuleset,
    #[error("ship length {0} must be between 1 and {max}", max = BOARD_SIZE)]
    InvalidLength(u8),
    #[error("fleet occupies {cells} cells, at most {max} allowed")]
    TooManyCells { cells: usize, max: usize },
    #[error("cannot parse ship length {0:?}")]
    Parse(String),
}

/// Ordered list of ships every player must place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    ships: Vec<ShipDef>,
}

impl Ruleset {
    /// Carrier, Battleship, Cruiser, Submarine, Destroyer.
    pub fn standard() -> Self {
        Self {
            ships: vec![
                ShipDef::new("Carrier", 5),
                ShipDef::new("Battleship", 4),
                ShipDef::new("Cruiser", 3),
                ShipDef::new("Submarine", 3),
                ShipDef::new("Destroyer", 2),
            ],
        }
    }

    /// Build a ruleset from ship lengths, naming ships after their class.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self, ConfigError> {
        if lengths.is_empty() {
            return Err(ConfigError::EmptyRuleset);
        }
        let mut ships = Vec::with_capacity(lengths.len());
        let mut threes = 0;
        for &length in lengths {
            if length == 0 || length > BOARD_SIZE {
                return Err(ConfigError::InvalidLength(length));
            }
            let name = match length {
                5 => "Carrier",
                4 => "Battleship",
                3 => {
                    threes += 1;
                    if threes == 1 {
                        "Cruiser"
                    } else {
                        "Submarine"
                    }
                }
                2 => "Destroyer",
                _ => "Patrol Boat",
            };
            ships.push(ShipDef::new(name, length));
        }
        let cells: usize = lengths.iter().map(|&l| l as usize).sum();
        if cells > MAX_FLEET_CELLS {
            return Err(ConfigError::TooManyCells {
                cells,
                max: MAX_FLEET_CELLS,
            });
        }
        Ok(Self { ships })
    }

    pub fn ships(&self) -> &[ShipDef] {
        &self.ships
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Ship lengths in ruleset order.
    pub fn lengths(&self) -> Vec<u8> {
        self.ships.iter().map(ShipDef::length).collect()
    }

    /// Total number of ship cells in a complete fleet.
    pub fn total_cells(&self) -> usize {
        self.ships.iter().map(|s| s.length as usize).sum()
    }

    /// Name of the ship with the given id, if it exists.
    pub fn ship_name(&self, id: usize) -> Option<&str> {
        self.ships.get(id).map(ShipDef::name)
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::standard()
    }
}

impl FromStr for Ruleset {
    type Err = ConfigError;

    /// Parses a comma separated list of lengths, e.g. `5,4,3,3,2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lengths = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u8>().map_err(|_| ConfigError::Parse(part.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_lengths(&lengths)
    }
}

/// Who moves first once both fleets are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FirstTurn {
    /// The player who opened the room always shoots first.
    #[default]
    Slot1,
    /// A fair coin drawn from the registry's RNG when the room is created.
    CoinFlip,
}

/// Per-room game rules, shared by every room a registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameRules {
    pub ruleset: Ruleset,
    pub first_turn: FirstTurn,
    /// House rule: a hit grants the attacker another shot.
    pub hit_again: bool,
}

impl GameRules {
    pub fn with_ruleset(ruleset: Ruleset) -> Self {
        Self {
            ruleset,
            ..Self::default()
        }
    }
}
