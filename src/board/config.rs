//! Board description files.
//!
//! A board is described in JSON as a list of areas and a list of neighbor
//! relations between area names. Relations are undirected: the builder adds
//! the reverse edge itself.
//!
//! ```json
//! {
//!   "name": "demo",
//!   "winningCastleCount": 3,
//!   "areas": [
//!     { "name": "Hermannia", "homePlayer": "yellow", "castle": true,
//!       "unit": { "type": "footman", "player": "yellow" } },
//!     { "name": "Nordmeer", "sea": true }
//!   ],
//!   "neighbors": [
//!     { "areas": ["Hermannia", "Nordmeer"] }
//!   ]
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::map::{BoardMap, TopologyError};
use super::state::BoardState;
use super::unit::{Player, Unit, UnitType};

fn default_winning_castle_count() -> usize {
    5
}

/// A complete board description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardConfig {
    pub name: String,
    /// A player wins by controlling more castles than this.
    #[serde(default = "default_winning_castle_count")]
    pub winning_castle_count: usize,
    pub areas: Vec<AreaConfig>,
    #[serde(default)]
    pub neighbors: Vec<NeighborConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_player: Option<Player>,
    #[serde(default)]
    pub forest: bool,
    #[serde(default)]
    pub castle: bool,
    #[serde(default)]
    pub sea: bool,
    /// Unit standing in the area when the game starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborConfig {
    pub areas: [String; 2],
    #[serde(default)]
    pub river: bool,
    #[serde(default)]
    pub cliffs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danger_zone: Option<String>,
}

impl BoardConfig {
    pub fn new(name: impl Into<String>, winning_castle_count: usize) -> Self {
        BoardConfig {
            name: name.into(),
            winning_castle_count,
            areas: Vec::new(),
            neighbors: Vec::new(),
        }
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn area(mut self, area: AreaConfig) -> Self {
        self.areas.push(area);
        self
    }

    pub fn neighbor(mut self, neighbor: NeighborConfig) -> Self {
        self.neighbors.push(neighbor);
        self
    }

    /// Builds the shared topology and the opening position.
    ///
    /// Home areas start controlled by their home player.
    pub fn build(&self) -> Result<BoardState, TopologyError> {
        let map = Arc::new(BoardMap::from_config(self)?);
        let mut state = BoardState::new(Arc::clone(&map));

        for (area, cfg) in map.areas().iter().zip(&self.areas) {
            if let Some(home) = &cfg.home_player {
                state.set_control(area.id, Some(home.clone()));
            }
            if let Some(unit) = &cfg.unit {
                let fits = match unit.unit_type {
                    UnitType::Ship => map.is_sailable(area.id),
                    _ => !area.sea,
                };
                if !fits {
                    return Err(TopologyError::MisplacedUnit {
                        area: area.name.clone(),
                        unit_type: unit.unit_type,
                    });
                }
                state.set_unit(area.id, Some(unit.clone()));
            }
        }

        Ok(state)
    }
}

impl AreaConfig {
    pub fn land(name: impl Into<String>) -> Self {
        AreaConfig {
            name: name.into(),
            nation: None,
            home_player: None,
            forest: false,
            castle: false,
            sea: false,
            unit: None,
        }
    }

    pub fn sea(name: impl Into<String>) -> Self {
        AreaConfig {
            sea: true,
            ..AreaConfig::land(name)
        }
    }

    pub fn forest(mut self) -> Self {
        self.forest = true;
        self
    }

    pub fn castle(mut self) -> Self {
        self.castle = true;
        self
    }

    pub fn nation(mut self, nation: impl Into<String>) -> Self {
        self.nation = Some(nation.into());
        self
    }

    pub fn home(mut self, player: impl Into<Player>) -> Self {
        self.home_player = Some(player.into());
        self
    }

    pub fn with_unit(mut self, unit_type: UnitType, player: impl Into<Player>) -> Self {
        self.unit = Some(Unit::new(unit_type, player));
        self
    }
}

impl NeighborConfig {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        NeighborConfig {
            areas: [a.into(), b.into()],
            river: false,
            cliffs: false,
            danger_zone: None,
        }
    }

    pub fn river(mut self) -> Self {
        self.river = true;
        self
    }

    pub fn cliffs(mut self) -> Self {
        self.cliffs = true;
        self
    }

    pub fn danger_zone(mut self, name: impl Into<String>) -> Self {
        self.danger_zone = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_BOARD: &str = r#"{
        "name": "small",
        "winningCastleCount": 1,
        "areas": [
            { "name": "Burg", "homePlayer": "yellow", "castle": true,
              "unit": { "type": "footman", "player": "yellow" } },
            { "name": "Wald", "forest": true },
            { "name": "See", "sea": true, "unit": { "type": "ship", "player": "yellow" } }
        ],
        "neighbors": [
            { "areas": ["Burg", "Wald"], "river": true },
            { "areas": ["Burg", "See"] }
        ]
    }"#;

    #[test]
    fn parses_and_builds_json_board() {
        let config = BoardConfig::from_json(SMALL_BOARD).unwrap();
        assert_eq!(config.winning_castle_count, 1);

        let state = config.build().unwrap();
        let burg = state.map().id("Burg").unwrap();
        let wald = state.map().id("Wald").unwrap();
        assert_eq!(state.control(burg), Some(&Player::from("yellow")));
        assert_eq!(state.control(wald), None);
        assert_eq!(state.unit(burg).unwrap().unit_type, UnitType::Footman);
    }

    #[test]
    fn missing_winning_count_uses_default() {
        let config =
            BoardConfig::from_json(r#"{ "name": "x", "areas": [{ "name": "A" }] }"#).unwrap();
        assert_eq!(config.winning_castle_count, 5);
        assert!(config.neighbors.is_empty());
    }

    #[test]
    fn land_unit_at_sea_is_rejected() {
        let config = BoardConfig::new("bad", 1)
            .area(AreaConfig::sea("See").with_unit(UnitType::Footman, "red"));
        assert_eq!(
            config.build().unwrap_err(),
            TopologyError::MisplacedUnit {
                area: "See".to_string(),
                unit_type: UnitType::Footman,
            }
        );
    }

    #[test]
    fn ship_inland_is_rejected() {
        let config = BoardConfig::new("bad", 1)
            .area(AreaConfig::land("A").with_unit(UnitType::Ship, "red"))
            .area(AreaConfig::land("B"))
            .neighbor(NeighborConfig::new("A", "B"));
        assert!(matches!(
            config.build(),
            Err(TopologyError::MisplacedUnit { .. })
        ));
    }
}
