//! Checks over one player's complete submission.

use std::collections::HashSet;

use super::Rejection;
use crate::board::{AreaId, BoardState, Order, OrderType};
use crate::resolve::find_transport_path;

/// Checks that a player's orders fit together: one order per area, no two
/// moves into the same area, no move into one's own unit unless that unit
/// leaves, and a ship chain for every transported move. Each order must
/// already have passed `validate_order`.
pub fn validate_order_set(orders: &[Order], state: &BoardState) -> Result<(), Rejection> {
    let map = state.map();
    let name = |id: AreaId| map.name_of(id).to_string();

    let mut from = HashSet::new();
    for order in orders {
        if !from.insert(order.from) {
            return Err(Rejection::DuplicateOrder(name(order.from)));
        }
    }

    let moving_from: HashSet<AreaId> = orders.iter().filter(|o| o.is_move()).map(|o| o.from).collect();
    let builds: HashSet<AreaId> = orders
        .iter()
        .filter(|o| o.order_type == OrderType::Build)
        .map(|o| o.from)
        .collect();

    let mut destinations = HashSet::new();
    for order in orders.iter().filter(|o| o.is_move()) {
        for dest in order.to.into_iter().chain(order.second_to) {
            if !destinations.insert(dest) {
                return Err(Rejection::DuplicateDestination(name(dest)));
            }
            if builds.contains(&dest) {
                return Err(Rejection::MoveIntoBuild(name(dest)));
            }
            let own_unit = state.unit(dest).is_some_and(|u| u.player == order.player);
            if own_unit && dest != order.from && !moving_from.contains(&dest) {
                return Err(Rejection::BlockedByOwnUnit(name(dest)));
            }
        }
    }

    let transports: HashSet<AreaId> = orders
        .iter()
        .filter(|o| o.order_type == OrderType::Transport)
        .map(|o| o.from)
        .collect();
    for order in orders.iter().filter(|o| o.is_move()) {
        let (Some(via), Some(to)) = (order.via, order.to) else {
            continue;
        };
        let chain = find_transport_path(
            map,
            order.from,
            to,
            via,
            |area| transports.contains(&area),
            |_| false,
        );
        if chain.is_none() {
            return Err(Rejection::NoTransportChain {
                from: name(order.from),
                to: name(to),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AreaConfig, BoardConfig, NeighborConfig, Season, UnitType};

    // Heim (red footman) - See (red ship) - Insel
    //   |
    // Acker (red horse) - Wiese
    fn state() -> BoardState {
        let mut state = BoardConfig::new("t", 3)
            .area(AreaConfig::land("Heim").home("red").with_unit(UnitType::Footman, "red"))
            .area(AreaConfig::sea("See").with_unit(UnitType::Ship, "red"))
            .area(AreaConfig::land("Insel"))
            .area(AreaConfig::land("Acker").home("red").with_unit(UnitType::Horse, "red"))
            .area(AreaConfig::land("Wiese").home("red"))
            .neighbor(NeighborConfig::new("Heim", "See"))
            .neighbor(NeighborConfig::new("See", "Insel"))
            .neighbor(NeighborConfig::new("Heim", "Acker"))
            .neighbor(NeighborConfig::new("Acker", "Wiese"))
            .build()
            .unwrap();
        state.season = Season::Spring;
        state
    }

    const HEIM: AreaId = AreaId(0);
    const SEE: AreaId = AreaId(1);
    const INSEL: AreaId = AreaId(2);
    const ACKER: AreaId = AreaId(3);
    const WIESE: AreaId = AreaId(4);

    #[test]
    fn one_order_per_area() {
        let orders = vec![Order::besiege("red", HEIM), Order::move_to("red", HEIM, ACKER)];
        assert_eq!(
            validate_order_set(&orders, &state()),
            Err(Rejection::DuplicateOrder("Heim".into()))
        );
    }

    #[test]
    fn own_unit_must_leave_first() {
        let blocked = vec![Order::move_to("red", HEIM, ACKER)];
        assert_eq!(
            validate_order_set(&blocked, &state()),
            Err(Rejection::BlockedByOwnUnit("Acker".into()))
        );
        let chain = vec![
            Order::move_to("red", HEIM, ACKER),
            Order::move_to("red", ACKER, WIESE),
        ];
        assert_eq!(validate_order_set(&chain, &state()), Ok(()));
    }

    #[test]
    fn second_destination_counts_as_destination() {
        let orders = vec![
            Order::move_to("red", ACKER, WIESE).with_second_to(ACKER),
            Order::move_to("red", HEIM, ACKER),
        ];
        assert_eq!(
            validate_order_set(&orders, &state()),
            Err(Rejection::DuplicateDestination("Acker".into()))
        );
    }

    #[test]
    fn transported_move_needs_own_ships() {
        let without = vec![Order::move_to("red", HEIM, INSEL).with_via(SEE)];
        assert!(matches!(
            validate_order_set(&without, &state()),
            Err(Rejection::NoTransportChain { .. })
        ));
        let with = vec![
            Order::move_to("red", HEIM, INSEL).with_via(SEE),
            Order::transport("red", SEE),
        ];
        assert_eq!(validate_order_set(&with, &state()), Ok(()));
    }

    #[test]
    fn no_move_into_own_build() {
        let mut state = state();
        state.season = Season::Winter;
        state.take_unit(ACKER);
        let orders = vec![
            Order::build("red", ACKER, UnitType::Catapult),
            Order::move_to("red", HEIM, ACKER),
        ];
        assert_eq!(
            validate_order_set(&orders, &state),
            Err(Rejection::MoveIntoBuild("Acker".into()))
        );
    }
}
