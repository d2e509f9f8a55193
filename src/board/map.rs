//! Read-only board topology.
//!
//! A `BoardMap` is built once per game from a `BoardConfig` and shared
//! between rounds behind an `Arc`. Areas are stored in a `Vec` indexed by
//! `AreaId`, so lookups never hash except for name resolution.

use std::collections::HashMap;

use thiserror::Error;

use super::area::{Area, AreaId, Neighbor};
use super::config::BoardConfig;
use super::unit::{Player, UnitType};

/// Errors in a board description. Fatal before any round starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("board has no areas")]
    Empty,

    #[error("board has too many areas ({0})")]
    TooManyAreas(usize),

    #[error("duplicate area '{0}'")]
    DuplicateArea(String),

    #[error("neighbor references unknown area '{0}'")]
    UnknownArea(String),

    #[error("area '{0}' cannot neighbor itself")]
    SelfNeighbor(String),

    #[error("sea area '{area}' cannot have a {feature}")]
    SeaTerrain { area: String, feature: &'static str },

    #[error("a {unit_type} cannot start in '{area}'")]
    MisplacedUnit { area: String, unit_type: UnitType },
}

/// The static graph of areas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardMap {
    name: String,
    areas: Vec<Area>,
    index: HashMap<String, AreaId>,
    players: Vec<Player>,
    winning_castle_count: usize,
}

impl BoardMap {
    /// Builds the topology, creating both directions of every relation.
    pub fn from_config(config: &BoardConfig) -> Result<Self, TopologyError> {
        if config.areas.is_empty() {
            return Err(TopologyError::Empty);
        }
        if config.areas.len() > u16::MAX as usize {
            return Err(TopologyError::TooManyAreas(config.areas.len()));
        }

        let mut areas = Vec::with_capacity(config.areas.len());
        let mut index = HashMap::with_capacity(config.areas.len());

        for (i, cfg) in config.areas.iter().enumerate() {
            let id = AreaId(i as u16);
            if index.insert(cfg.name.clone(), id).is_some() {
                return Err(TopologyError::DuplicateArea(cfg.name.clone()));
            }
            if cfg.sea && cfg.castle {
                return Err(TopologyError::SeaTerrain {
                    area: cfg.name.clone(),
                    feature: "castle",
                });
            }
            if cfg.sea && cfg.forest {
                return Err(TopologyError::SeaTerrain {
                    area: cfg.name.clone(),
                    feature: "forest",
                });
            }
            areas.push(Area {
                id,
                name: cfg.name.clone(),
                nation: cfg.nation.clone(),
                home: cfg.home_player.clone(),
                forest: cfg.forest,
                castle: cfg.castle,
                sea: cfg.sea,
                neighbors: Vec::new(),
            });
        }

        for edge in &config.neighbors {
            let [a_name, b_name] = &edge.areas;
            let a = *index
                .get(a_name)
                .ok_or_else(|| TopologyError::UnknownArea(a_name.clone()))?;
            let b = *index
                .get(b_name)
                .ok_or_else(|| TopologyError::UnknownArea(b_name.clone()))?;
            if a == b {
                return Err(TopologyError::SelfNeighbor(a_name.clone()));
            }

            let across_water = edge.river || areas[a.index()].sea || areas[b.index()].sea;
            let relation = |to: AreaId| Neighbor {
                area: to,
                across_water,
                cliffs: edge.cliffs,
                danger_zone: edge.danger_zone.clone(),
            };
            areas[a.index()].neighbors.push(relation(b));
            areas[b.index()].neighbors.push(relation(a));
        }

        let mut players: Vec<Player> = areas.iter().filter_map(|a| a.home.clone()).collect();
        players.sort();
        players.dedup();

        Ok(BoardMap {
            name: config.name.clone(),
            areas,
            index,
            players,
            winning_castle_count: config.winning_castle_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn area(&self, id: AreaId) -> &Area {
        &self.areas[id.index()]
    }

    /// Resolves an area name.
    pub fn id(&self, name: &str) -> Option<AreaId> {
        self.index.get(name).copied()
    }

    pub fn name_of(&self, id: AreaId) -> &str {
        &self.areas[id.index()].name
    }

    pub fn ids(&self) -> impl Iterator<Item = AreaId> + '_ {
        self.areas.iter().map(|a| a.id)
    }

    pub fn is_adjacent(&self, from: AreaId, to: AreaId) -> bool {
        self.area(from).is_adjacent(to)
    }

    pub fn neighbor(&self, from: AreaId, to: AreaId) -> Option<&Neighbor> {
        self.area(from).neighbor(to)
    }

    /// True for sea areas and for land with a sea neighbor.
    pub fn is_sailable(&self, id: AreaId) -> bool {
        let area = self.area(id);
        area.sea || self.is_coast(id)
    }

    /// True for land areas with at least one sea neighbor.
    pub fn is_coast(&self, id: AreaId) -> bool {
        let area = self.area(id);
        !area.sea && area.neighbors.iter().any(|n| self.area(n.area).sea)
    }

    /// Factions on this board: every player owning a home area, sorted.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn winning_castle_count(&self) -> usize {
        self.winning_castle_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::config::{AreaConfig, NeighborConfig};

    fn coast_board() -> BoardConfig {
        BoardConfig::new("coast", 2)
            .area(AreaConfig::land("Inland").home("red"))
            .area(AreaConfig::land("Hafen").home("yellow").castle())
            .area(AreaConfig::sea("Meer"))
            .area(AreaConfig::land("Fels"))
            .neighbor(NeighborConfig::new("Inland", "Hafen").river())
            .neighbor(NeighborConfig::new("Hafen", "Meer"))
            .neighbor(NeighborConfig::new("Meer", "Fels").cliffs())
    }

    #[test]
    fn edges_are_symmetric() {
        let map = BoardMap::from_config(&coast_board()).unwrap();
        let inland = map.id("Inland").unwrap();
        let hafen = map.id("Hafen").unwrap();
        assert!(map.is_adjacent(inland, hafen));
        assert!(map.is_adjacent(hafen, inland));
        assert!(map.neighbor(hafen, inland).unwrap().across_water);
    }

    #[test]
    fn sea_relations_are_across_water() {
        let map = BoardMap::from_config(&coast_board()).unwrap();
        let hafen = map.id("Hafen").unwrap();
        let meer = map.id("Meer").unwrap();
        assert!(map.neighbor(meer, hafen).unwrap().across_water);
    }

    #[test]
    fn coast_and_sailable() {
        let map = BoardMap::from_config(&coast_board()).unwrap();
        let inland = map.id("Inland").unwrap();
        let hafen = map.id("Hafen").unwrap();
        let meer = map.id("Meer").unwrap();
        let fels = map.id("Fels").unwrap();
        assert!(!map.is_sailable(inland));
        assert!(map.is_coast(hafen));
        assert!(map.is_sailable(meer));
        assert!(!map.is_coast(meer));
        // cliffs still make a coast, ships just cannot land there
        assert!(map.is_coast(fels));
        assert!(map.area(meer).sailing_neighbor(fels).is_none());
    }

    #[test]
    fn players_come_from_home_areas() {
        let map = BoardMap::from_config(&coast_board()).unwrap();
        assert_eq!(map.players(), &[Player::from("red"), Player::from("yellow")]);
    }

    #[test]
    fn unknown_neighbor_is_topology_error() {
        let config = coast_board().neighbor(NeighborConfig::new("Inland", "Atlantis"));
        assert_eq!(
            BoardMap::from_config(&config).unwrap_err(),
            TopologyError::UnknownArea("Atlantis".to_string())
        );
    }

    #[test]
    fn sea_castle_is_topology_error() {
        let config = BoardConfig::new("bad", 1).area(AreaConfig::sea("Meer").castle());
        assert!(matches!(
            BoardMap::from_config(&config),
            Err(TopologyError::SeaTerrain { feature: "castle", .. })
        ));
    }

    #[test]
    fn duplicate_and_self_edges_rejected() {
        let dup = BoardConfig::new("dup", 1)
            .area(AreaConfig::land("A"))
            .area(AreaConfig::land("A"));
        assert_eq!(
            BoardMap::from_config(&dup).unwrap_err(),
            TopologyError::DuplicateArea("A".to_string())
        );

        let selfie = BoardConfig::new("self", 1)
            .area(AreaConfig::land("A"))
            .neighbor(NeighborConfig::new("A", "A"));
        assert_eq!(
            BoardMap::from_config(&selfie).unwrap_err(),
            TopologyError::SelfNeighbor("A".to_string())
        );

        assert_eq!(
            BoardMap::from_config(&BoardConfig::new("none", 1)).unwrap_err(),
            TopologyError::Empty
        );
    }
}
