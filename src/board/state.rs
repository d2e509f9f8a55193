//! Mutable game position.
//!
//! Holds everything that changes between rounds: who controls each area,
//! which unit stands where, siege progress, and the round/season pointer.
//! Per-area data lives in `Vec`s indexed by `AreaId`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::area::AreaId;
use super::map::BoardMap;
use super::unit::{Player, Unit};

/// The season of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Winter → Spring → Summer → Fall → Winter.
    pub const fn next(self) -> Season {
        match self {
            Season::Winter => Season::Spring,
            Season::Spring => Season::Summer,
            Season::Summer => Season::Fall,
            Season::Fall => Season::Winter,
        }
    }

    pub const fn is_winter(self) -> bool {
        matches!(self, Season::Winter)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Board position at the start of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    map: Arc<BoardMap>,
    pub round: u32,
    pub season: Season,
    control: Vec<Option<Player>>,
    units: Vec<Option<Unit>>,
    siege: Vec<u8>,
}

impl BoardState {
    /// Creates an empty position on `map`: round 1, Winter, nothing placed.
    pub fn new(map: Arc<BoardMap>) -> Self {
        let n = map.len();
        BoardState {
            map,
            round: 1,
            season: Season::Winter,
            control: vec![None; n],
            units: vec![None; n],
            siege: vec![0; n],
        }
    }

    pub fn map(&self) -> &BoardMap {
        &self.map
    }

    pub fn shared_map(&self) -> &Arc<BoardMap> {
        &self.map
    }

    pub fn control(&self, id: AreaId) -> Option<&Player> {
        self.control[id.index()].as_ref()
    }

    pub fn is_controlled(&self, id: AreaId) -> bool {
        self.control[id.index()].is_some()
    }

    pub fn set_control(&mut self, id: AreaId, player: Option<Player>) {
        self.control[id.index()] = player;
    }

    /// The player an order from `id` must belong to: the controlling
    /// player, or for uncontrolled areas the owner of the unit there.
    pub fn controller(&self, id: AreaId) -> Option<&Player> {
        self.control(id)
            .or_else(|| self.unit(id).map(|u| &u.player))
    }

    pub fn unit(&self, id: AreaId) -> Option<&Unit> {
        self.units[id.index()].as_ref()
    }

    pub fn set_unit(&mut self, id: AreaId, unit: Option<Unit>) {
        self.units[id.index()] = unit;
    }

    pub fn take_unit(&mut self, id: AreaId) -> Option<Unit> {
        self.units[id.index()].take()
    }

    /// Places a unit. Returns false if the area is already occupied.
    pub fn place_unit(&mut self, id: AreaId, unit: Unit) -> bool {
        let slot = &mut self.units[id.index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(unit);
        true
    }

    pub fn siege_count(&self, id: AreaId) -> u8 {
        self.siege[id.index()]
    }

    pub fn set_siege_count(&mut self, id: AreaId, count: u8) {
        self.siege[id.index()] = count;
    }

    /// Number of castles controlled by `player`.
    pub fn castle_count(&self, player: &Player) -> usize {
        self.map
            .areas()
            .iter()
            .filter(|a| a.castle && self.control(a.id) == Some(player))
            .count()
    }

    /// Iterates over all placed units.
    pub fn units(&self) -> impl Iterator<Item = (AreaId, &Unit)> + '_ {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(i, u)| u.as_ref().map(|u| (AreaId(i as u16), u)))
    }

    /// Moves to the next round and season.
    pub fn advance(&mut self) {
        self.round += 1;
        self.season = self.season.next();
    }
}
