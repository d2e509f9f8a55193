//! Unit types and ownership.
//!
//! Every unit belongs to exactly one player and occupies exactly one area.
//! Players are identified by their colour name, which is also what goes
//! over the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A player, identified by colour (`"yellow"`, `"red"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Player(String);

impl Player {
    pub fn new(id: impl Into<String>) -> Self {
        Player(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Player {
    fn from(s: &str) -> Self {
        Player(s.to_string())
    }
}

/// The type of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Footman,
    Horse,
    Ship,
    Catapult,
}

impl UnitType {
    pub const ALL: [UnitType; 4] = [
        UnitType::Footman,
        UnitType::Horse,
        UnitType::Ship,
        UnitType::Catapult,
    ];

    /// Returns the lowercase name used in board files and messages.
    pub const fn name(self) -> &'static str {
        match self {
            UnitType::Footman => "footman",
            UnitType::Horse => "horse",
            UnitType::Ship => "ship",
            UnitType::Catapult => "catapult",
        }
    }

    /// Parses a unit type from its lowercase name.
    pub fn from_name(s: &str) -> Option<UnitType> {
        UnitType::ALL.into_iter().find(|t| t.name() == s)
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A unit on the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub player: Player,
}

impl Unit {
    pub fn new(unit_type: UnitType, player: impl Into<Player>) -> Self {
        Unit {
            unit_type,
            player: player.into(),
        }
    }
}
