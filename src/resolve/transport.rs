//! Transport chains.
//!
//! A land unit can be carried across the sea by a chain of its owner's ships,
//! each holding a Transport order. The chain starts at the sea area named in
//! the move's `via`, continues through adjacent transporting ships and ends
//! at a ship next to the destination.

use crate::board::{AreaId, BoardMap};

/// A usable chain of transporting ships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPath {
    pub ships: Vec<AreaId>,
    /// Whether any ship on the chain is under attack this round.
    pub attacked: bool,
    pub danger_zones: Vec<String>,
}

impl TransportPath {
    /// Unattacked chains first, then fewest danger zones, then shortest.
    fn rank(&self) -> (bool, usize, usize, &[AreaId]) {
        (self.attacked, self.danger_zones.len(), self.ships.len(), &self.ships)
    }
}

struct Search<'a, T, A> {
    map: &'a BoardMap,
    to: AreaId,
    is_transport: T,
    is_attacked: A,
    best: Option<TransportPath>,
}

impl<T, A> Search<'_, T, A>
where
    T: Fn(AreaId) -> bool,
    A: Fn(AreaId) -> bool,
{
    fn walk(&mut self, current: AreaId, ships: &mut Vec<AreaId>, dangers: &mut Vec<String>) {
        if let Some(landing) = self.map.area(current).sailing_neighbor(self.to) {
            let mut danger_zones = dangers.clone();
            danger_zones.extend(landing.danger_zone.clone());
            let candidate = TransportPath {
                ships: ships.clone(),
                attacked: ships.iter().any(|&s| (self.is_attacked)(s)),
                danger_zones,
            };
            let better = match &self.best {
                Some(best) => candidate.rank() < best.rank(),
                None => true,
            };
            if better {
                self.best = Some(candidate);
            }
        }

        let map = self.map;
        let area = map.area(current);
        for n in &area.neighbors {
            let next = n.area;
            if ships.contains(&next) || !map.area(next).sea || !(self.is_transport)(next) {
                continue;
            }
            let Some(relation) = area.sailing_neighbor(next) else {
                continue;
            };
            let pushed_danger = relation.danger_zone.is_some();
            dangers.extend(relation.danger_zone.clone());
            ships.push(next);
            self.walk(next, ships, dangers);
            ships.pop();
            if pushed_danger {
                dangers.pop();
            }
        }
    }
}

/// Finds the best chain carrying a unit from `from` to `to` that starts at
/// `via`. `is_transport` tells whether a sea area holds a transporting ship
/// of the moving player; `is_attacked` whether that ship is under attack.
pub fn find_transport_path<T, A>(
    map: &BoardMap,
    from: AreaId,
    to: AreaId,
    via: AreaId,
    is_transport: T,
    is_attacked: A,
) -> Option<TransportPath>
where
    T: Fn(AreaId) -> bool,
    A: Fn(AreaId) -> bool,
{
    if !map.area(via).sea || !is_transport(via) {
        return None;
    }
    let boarding = map.neighbor(from, via)?;

    let mut dangers: Vec<String> = boarding.danger_zone.iter().cloned().collect();
    let mut ships = vec![via];
    let mut search = Search {
        map,
        to,
        is_transport,
        is_attacked,
        best: None,
    };
    search.walk(via, &mut ships, &mut dangers);
    search.best
}
