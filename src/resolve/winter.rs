//! Winter rounds: builds and repositioning inside one's own territory.
//!
//! No dice are rolled. Builds are placed first. Moves then go through in
//! passes: a move into an empty area happens at once, a move into an area
//! whose unit stays fails, and moves that only block each other in a ring
//! all happen together.

use std::collections::BTreeMap;

use tracing::debug;

use super::outcome::{OrderStatus, Resolution, ResolvedOrder, RoundResult};
use crate::board::{AreaId, BoardState, Order, OrderType, Player, Unit};

pub(crate) fn resolve_winter(state: &BoardState, orders: &[Order]) -> Resolution {
    let mut state = state.clone();
    let mut status: Vec<Option<OrderStatus>> = vec![None; orders.len()];

    for (i, order) in orders.iter().enumerate() {
        if order.order_type != OrderType::Build {
            continue;
        }
        let placed = order
            .build
            .is_some_and(|t| state.place_unit(order.from, Unit::new(t, order.player.clone())));
        status[i] = Some(if placed {
            OrderStatus::Succeeded
        } else {
            OrderStatus::Failed
        });
    }

    let mut pending: Vec<usize> = orders
        .iter()
        .enumerate()
        .filter(|(_, o)| o.is_move() && o.to.is_some() && state.unit(o.from).is_some())
        .map(|(i, _)| i)
        .collect();
    for (i, order) in orders.iter().enumerate() {
        if order.is_move() && !pending.contains(&i) {
            status[i] = Some(OrderStatus::Failed);
        }
    }

    while !pending.is_empty() {
        let mut progressed = false;

        for &i in &pending.clone() {
            let (from, Some(to)) = (orders[i].from, orders[i].to) else {
                continue;
            };
            if state.unit(to).is_none() {
                let unit = state.take_unit(from);
                state.set_unit(to, unit);
                status[i] = Some(OrderStatus::Succeeded);
            } else if !pending.iter().any(|&j| orders[j].from == to) {
                status[i] = Some(OrderStatus::Failed);
            } else {
                continue;
            }
            pending.retain(|&j| j != i);
            progressed = true;
        }

        if progressed {
            continue;
        }

        match find_ring(orders, &pending) {
            Some(ring) => {
                debug!(len = ring.len(), "rotating winter move ring");
                let lifted: Vec<(AreaId, Option<Unit>)> = ring
                    .iter()
                    .filter_map(|&i| Some((orders[i].to?, state.take_unit(orders[i].from))))
                    .collect();
                for (to, unit) in lifted {
                    state.set_unit(to, unit);
                }
                for &i in &ring {
                    status[i] = Some(OrderStatus::Succeeded);
                }
                pending.retain(|j| !ring.contains(j));
            }
            None => {
                for &i in &pending {
                    status[i] = Some(OrderStatus::Failed);
                }
                pending.clear();
            }
        }
    }

    let map = state.shared_map().clone();
    let mut resolved: BTreeMap<Player, Vec<ResolvedOrder>> = BTreeMap::new();
    for (i, order) in orders.iter().enumerate() {
        resolved
            .entry(order.player.clone())
            .or_default()
            .push(ResolvedOrder {
                order: order.to_spec(&map),
                status: status[i].unwrap_or(OrderStatus::Succeeded),
            });
    }

    let result = RoundResult {
        round: state.round,
        season: state.season,
        orders: resolved,
        battles: BTreeMap::new(),
        winner: None,
    };
    Resolution { state, result }
}

/// A ring of pending moves, each into the area the next one leaves.
fn find_ring(orders: &[Order], pending: &[usize]) -> Option<Vec<usize>> {
    let next = |i: usize| {
        let to = orders[i].to?;
        pending.iter().copied().find(|&j| orders[j].from == to)
    };
    for &start in pending {
        let mut chain = vec![start];
        let mut current = start;
        while let Some(n) = next(current) {
            if let Some(pos) = chain.iter().position(|&c| c == n) {
                return Some(chain.split_off(pos));
            }
            chain.push(n);
            current = n;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AreaConfig, BoardConfig, NeighborConfig, UnitType};

    fn state() -> BoardState {
        BoardConfig::new("t", 5)
            .area(AreaConfig::land("A").home("red").with_unit(UnitType::Footman, "red"))
            .area(AreaConfig::land("B").home("red").with_unit(UnitType::Horse, "red"))
            .area(AreaConfig::land("C").home("red"))
            .neighbor(NeighborConfig::new("A", "B"))
            .neighbor(NeighborConfig::new("B", "C"))
            .build()
            .unwrap()
    }

    #[test]
    fn swap_rotates_both_units() {
        let orders = vec![
            Order::move_to("red", AreaId(0), AreaId(1)),
            Order::move_to("red", AreaId(1), AreaId(0)),
        ];
        let res = resolve_winter(&state(), &orders);
        assert_eq!(res.state.unit(AreaId(0)).unwrap().unit_type, UnitType::Horse);
        assert_eq!(res.state.unit(AreaId(1)).unwrap().unit_type, UnitType::Footman);
        let red = Player::from("red");
        assert_eq!(res.result.status_of(&red, "A"), Some(OrderStatus::Succeeded));
        assert_eq!(res.result.status_of(&red, "B"), Some(OrderStatus::Succeeded));
    }

    #[test]
    fn chain_follows_vacated_area() {
        let orders = vec![
            Order::move_to("red", AreaId(0), AreaId(1)),
            Order::move_to("red", AreaId(1), AreaId(2)),
        ];
        let res = resolve_winter(&state(), &orders);
        assert!(res.state.unit(AreaId(0)).is_none());
        assert_eq!(res.state.unit(AreaId(2)).unwrap().unit_type, UnitType::Horse);
    }

    #[test]
    fn move_into_staying_unit_fails() {
        let orders = vec![Order::move_to("red", AreaId(0), AreaId(1))];
        let res = resolve_winter(&state(), &orders);
        assert_eq!(
            res.result.status_of(&Player::from("red"), "A"),
            Some(OrderStatus::Failed)
        );
        assert_eq!(res.state.unit(AreaId(0)).unwrap().unit_type, UnitType::Footman);
    }

    #[test]
    fn build_on_occupied_area_fails() {
        let orders = vec![
            Order::build("red", AreaId(0), UnitType::Catapult),
            Order::build("red", AreaId(2), UnitType::Catapult),
        ];
        let res = resolve_winter(&state(), &orders);
        let red = Player::from("red");
        assert_eq!(res.result.status_of(&red, "A"), Some(OrderStatus::Failed));
        assert_eq!(res.result.status_of(&red, "C"), Some(OrderStatus::Succeeded));
        assert_eq!(res.state.unit(AreaId(2)).unwrap().unit_type, UnitType::Catapult);
    }
}
