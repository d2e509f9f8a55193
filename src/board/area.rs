//! Areas and the adjacency records between them.

use super::unit::Player;

/// Index of an area within its board. Ids follow the order areas were
/// declared in the board description, which also fixes resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AreaId(pub u16);

impl AreaId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One adjacency relation from an area to a neighbor.
///
/// Two areas may be joined by more than one relation, e.g. a safe road and
/// a shortcut through a danger zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub area: AreaId,
    /// Set for rivers and for any relation touching a sea area.
    pub across_water: bool,
    /// Ships cannot pass cliffs.
    pub cliffs: bool,
    pub danger_zone: Option<String>,
}

/// Static description of an area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    pub id: AreaId,
    pub name: String,
    pub nation: Option<String>,
    /// The player this area originally belongs to.
    pub home: Option<Player>,
    pub forest: bool,
    pub castle: bool,
    pub sea: bool,
    pub neighbors: Vec<Neighbor>,
}

impl Area {
    /// Returns the relation to `to`, preferring one without a danger zone.
    pub fn neighbor(&self, to: AreaId) -> Option<&Neighbor> {
        let mut found: Option<&Neighbor> = None;
        for n in self.neighbors.iter().filter(|n| n.area == to) {
            match found {
                Some(f) if f.danger_zone.is_none() => {}
                _ => found = Some(n),
            }
        }
        found
    }

    /// Returns the relation a ship would use to reach `to`: cliffs excluded,
    /// danger zones avoided where possible.
    pub fn sailing_neighbor(&self, to: AreaId) -> Option<&Neighbor> {
        let mut found: Option<&Neighbor> = None;
        for n in self.neighbors.iter().filter(|n| n.area == to && !n.cliffs) {
            match found {
                Some(f) if f.danger_zone.is_none() => {}
                _ => found = Some(n),
            }
        }
        found
    }

    pub fn is_adjacent(&self, to: AreaId) -> bool {
        self.neighbors.iter().any(|n| n.area == to)
    }
}
