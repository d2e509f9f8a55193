//! Order validation.
//!
//! `validate_order` decides whether a single order is legal for the current
//! season and position. It never looks at other orders; the checks that need
//! a player's whole submission live in `order_set`.

pub mod order_set;

use thiserror::Error;

use crate::board::{AreaId, BoardMap, BoardState, Order, OrderSpec, OrderType, Player, Season, UnitType};

pub use order_set::validate_order_set;

/// Why an order was refused. Sent back to the submitting player only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("unknown area '{0}'")]
    UnknownArea(String),

    #[error("{player} does not control {area}")]
    NotControlled { player: Player, area: String },

    #[error("no unit of yours in {0}")]
    NoUnit(String),

    #[error("{order_type} orders are not allowed in {season}")]
    WrongSeason { order_type: OrderType, season: Season },

    #[error("order from {0} needs a destination")]
    MissingDestination(String),

    #[error("{from} is not adjacent to {to}")]
    NotAdjacent { from: String, to: String },

    #[error("ships cannot sail to {0}")]
    NotSailable(String),

    #[error("land units cannot enter the sea at {0}")]
    SeaForLandUnit(String),

    #[error("cliffs block ships between {from} and {to}")]
    Cliffs { from: String, to: String },

    #[error("only horses can move twice")]
    SecondDestinationNotHorse,

    #[error("{second} is not adjacent to {to}")]
    SecondDestinationNotAdjacent { to: String, second: String },

    #[error("support orders cannot have a second destination")]
    SupportSecondDestination,

    #[error("{0} orders cannot have a destination")]
    UnexpectedDestination(OrderType),

    #[error("{0} cannot be besieged")]
    NotBesiegeable(String),

    #[error("ships cannot besiege")]
    ShipBesiege,

    #[error("only ships at sea can transport")]
    NotTransportShip,

    #[error("transport from {from} must start at an adjacent sea area, not {via}")]
    InvalidVia { from: String, via: String },

    #[error("transported units can only land on the coast, not at {0}")]
    NotCoastal(String),

    #[error("winter moves must stay inside your territory, {0} is not yours")]
    WinterMoveOutsideTerritory(String),

    #[error("winter moves cannot be combined with a build")]
    WinterMoveWithBuild,

    #[error("winter moves go one step over land")]
    WinterMultiStep,

    #[error("cannot build in occupied area {0}")]
    BuildOccupied(String),

    #[error("build order in {0} has no unit type")]
    MissingUnitType(String),

    #[error("ships can only be built on the coast, not at {0}")]
    ShipNotOnCoast(String),

    #[error("invalid order type")]
    InvalidOrderType,

    #[error("more than one order for {0}")]
    DuplicateOrder(String),

    #[error("more than one move into {0}")]
    DuplicateDestination(String),

    #[error("your unit in {0} does not move away")]
    BlockedByOwnUnit(String),

    #[error("cannot move into {0} while building there")]
    MoveIntoBuild(String),

    #[error("no chain of your transporting ships from {from} to {to}")]
    NoTransportChain { from: String, to: String },
}

/// Resolves the area names of a wire order and stamps it with `player`.
pub fn bind_order(spec: &OrderSpec, player: &Player, map: &BoardMap) -> Result<Order, Rejection> {
    let lookup = |name: &str| map.id(name).ok_or_else(|| Rejection::UnknownArea(name.to_string()));
    let optional = |name: &Option<String>| name.as_deref().map(lookup).transpose();

    Ok(Order {
        order_type: spec.order_type,
        player: player.clone(),
        from: lookup(&spec.from)?,
        to: optional(&spec.to)?,
        second_to: optional(&spec.second_to)?,
        via: optional(&spec.via)?,
        build: spec.build,
    })
}

/// Checks one order against the position and the season.
pub fn validate_order(order: &Order, season: Season, state: &BoardState) -> Result<(), Rejection> {
    let map = state.map();
    let name = |id: AreaId| map.name_of(id).to_string();

    if state.controller(order.from) != Some(&order.player) {
        return Err(Rejection::NotControlled {
            player: order.player.clone(),
            area: name(order.from),
        });
    }

    let allowed = match order.order_type {
        OrderType::Move => true,
        OrderType::Build => season.is_winter(),
        _ => !season.is_winter(),
    };
    if !allowed {
        return Err(Rejection::WrongSeason {
            order_type: order.order_type,
            season,
        });
    }

    if order.order_type == OrderType::Build {
        return validate_build(order, state);
    }

    let unit_type = match state.unit(order.from) {
        Some(unit) if unit.player == order.player => unit.unit_type,
        _ => return Err(Rejection::NoUnit(name(order.from))),
    };
    if order.build.is_some() {
        return Err(if order.is_move() && season.is_winter() {
            Rejection::WinterMoveWithBuild
        } else {
            Rejection::InvalidOrderType
        });
    }

    match order.order_type {
        OrderType::Move if season.is_winter() => validate_winter_move(order, unit_type, state),
        OrderType::Move => validate_move(order, unit_type, state),
        OrderType::Support => {
            if order.second_to.is_some() {
                return Err(Rejection::SupportSecondDestination);
            }
            if order.via.is_some() {
                return Err(Rejection::InvalidOrderType);
            }
            let to = order.to.ok_or_else(|| Rejection::MissingDestination(name(order.from)))?;
            check_step(map, order.from, to, unit_type)
        }
        OrderType::Besiege => {
            no_destination(order)?;
            let area = map.area(order.from);
            if !area.castle || state.is_controlled(order.from) {
                return Err(Rejection::NotBesiegeable(name(order.from)));
            }
            if unit_type == UnitType::Ship {
                return Err(Rejection::ShipBesiege);
            }
            Ok(())
        }
        OrderType::Transport => {
            no_destination(order)?;
            if unit_type != UnitType::Ship || !map.area(order.from).sea {
                return Err(Rejection::NotTransportShip);
            }
            Ok(())
        }
        OrderType::Build => Err(Rejection::InvalidOrderType),
    }
}

fn no_destination(order: &Order) -> Result<(), Rejection> {
    if order.to.is_some() || order.second_to.is_some() || order.via.is_some() {
        return Err(Rejection::UnexpectedDestination(order.order_type));
    }
    Ok(())
}

/// Adjacency and the sailing rule for one step from `from` to `to`.
fn check_step(map: &BoardMap, from: AreaId, to: AreaId, unit_type: UnitType) -> Result<(), Rejection> {
    let name = |id: AreaId| map.name_of(id).to_string();
    if !map.is_adjacent(from, to) {
        return Err(Rejection::NotAdjacent {
            from: name(from),
            to: name(to),
        });
    }
    if unit_type == UnitType::Ship {
        if !map.is_sailable(to) {
            return Err(Rejection::NotSailable(name(to)));
        }
        if map.area(from).sailing_neighbor(to).is_none() {
            return Err(Rejection::Cliffs {
                from: name(from),
                to: name(to),
            });
        }
    } else if map.area(to).sea {
        return Err(Rejection::SeaForLandUnit(name(to)));
    }
    Ok(())
}

fn validate_move(order: &Order, unit_type: UnitType, state: &BoardState) -> Result<(), Rejection> {
    let map = state.map();
    let name = |id: AreaId| map.name_of(id).to_string();
    let to = order.to.ok_or_else(|| Rejection::MissingDestination(name(order.from)))?;

    if let Some(via) = order.via {
        if unit_type == UnitType::Ship {
            return Err(Rejection::InvalidOrderType);
        }
        if order.second_to.is_some() {
            return Err(Rejection::SecondDestinationNotHorse);
        }
        if !map.area(via).sea || !map.is_adjacent(order.from, via) {
            return Err(Rejection::InvalidVia {
                from: name(order.from),
                via: name(via),
            });
        }
        if map.area(to).sea || !map.is_coast(to) || to == order.from {
            return Err(Rejection::NotCoastal(name(to)));
        }
        return Ok(());
    }

    check_step(map, order.from, to, unit_type)?;

    if let Some(second) = order.second_to {
        if unit_type != UnitType::Horse {
            return Err(Rejection::SecondDestinationNotHorse);
        }
        if !map.is_adjacent(to, second) {
            return Err(Rejection::SecondDestinationNotAdjacent {
                to: name(to),
                second: name(second),
            });
        }
        if map.area(second).sea {
            return Err(Rejection::SeaForLandUnit(name(second)));
        }
    }
    Ok(())
}

fn validate_winter_move(order: &Order, unit_type: UnitType, state: &BoardState) -> Result<(), Rejection> {
    let map = state.map();
    let to = order
        .to
        .ok_or_else(|| Rejection::MissingDestination(map.name_of(order.from).to_string()))?;
    if order.second_to.is_some() || order.via.is_some() {
        return Err(Rejection::WinterMultiStep);
    }
    check_step(map, order.from, to, unit_type)?;
    if state.control(to) != Some(&order.player) {
        return Err(Rejection::WinterMoveOutsideTerritory(map.name_of(to).to_string()));
    }
    Ok(())
}

fn validate_build(order: &Order, state: &BoardState) -> Result<(), Rejection> {
    let map = state.map();
    let name = map.name_of(order.from).to_string();
    if order.to.is_some() || order.second_to.is_some() || order.via.is_some() {
        return Err(Rejection::UnexpectedDestination(OrderType::Build));
    }
    if state.control(order.from) != Some(&order.player) {
        return Err(Rejection::NotControlled {
            player: order.player.clone(),
            area: name,
        });
    }
    if state.unit(order.from).is_some() {
        return Err(Rejection::BuildOccupied(name));
    }
    match order.build {
        None => Err(Rejection::MissingUnitType(name)),
        Some(UnitType::Ship) if !map.is_coast(order.from) => Err(Rejection::ShipNotOnCoast(name)),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AreaConfig, BoardConfig, NeighborConfig};

    // Burg (castle, red) - Feld (red) - Wald (neutral castle)
    //   |                     |
    // Meer (sea, red ship)  Kueste (red, coast)
    fn state(season: Season) -> BoardState {
        let mut state = BoardConfig::new("t", 3)
            .area(
                AreaConfig::land("Burg")
                    .castle()
                    .home("red")
                    .with_unit(UnitType::Footman, "red"),
            )
            .area(AreaConfig::land("Feld").home("red").with_unit(UnitType::Horse, "red"))
            .area(AreaConfig::land("Wald").castle().forest())
            .area(AreaConfig::sea("Meer").with_unit(UnitType::Ship, "red"))
            .area(AreaConfig::land("Kueste").home("red"))
            .area(AreaConfig::land("Hof").home("blue"))
            .neighbor(NeighborConfig::new("Burg", "Feld"))
            .neighbor(NeighborConfig::new("Feld", "Wald"))
            .neighbor(NeighborConfig::new("Burg", "Meer"))
            .neighbor(NeighborConfig::new("Meer", "Kueste").cliffs())
            .neighbor(NeighborConfig::new("Feld", "Kueste"))
            .neighbor(NeighborConfig::new("Wald", "Hof"))
            .build()
            .unwrap();
        state.season = season;
        state
    }

    const BURG: AreaId = AreaId(0);
    const FELD: AreaId = AreaId(1);
    const WALD: AreaId = AreaId(2);
    const MEER: AreaId = AreaId(3);
    const KUESTE: AreaId = AreaId(4);
    const HOF: AreaId = AreaId(5);

    fn check(order: Order, season: Season) -> Result<(), Rejection> {
        validate_order(&order, season, &state(season))
    }

    #[test]
    fn only_controller_may_order() {
        let err = check(Order::move_to("blue", BURG, FELD), Season::Spring).unwrap_err();
        assert!(matches!(err, Rejection::NotControlled { .. }));
    }

    #[test]
    fn sea_is_controlled_by_its_ship() {
        assert_eq!(check(Order::transport("red", MEER), Season::Spring), Ok(()));
        let err = check(Order::transport("blue", MEER), Season::Spring).unwrap_err();
        assert!(matches!(err, Rejection::NotControlled { .. }));
    }

    #[test]
    fn season_gate() {
        assert!(matches!(
            check(Order::besiege("red", BURG), Season::Winter),
            Err(Rejection::WrongSeason { .. })
        ));
        assert!(matches!(
            check(Order::build("red", KUESTE, UnitType::Footman), Season::Fall),
            Err(Rejection::WrongSeason { .. })
        ));
        assert_eq!(check(Order::build("red", KUESTE, UnitType::Footman), Season::Winter), Ok(()));
    }

    #[test]
    fn moves_need_adjacency() {
        assert_eq!(check(Order::move_to("red", BURG, FELD), Season::Spring), Ok(()));
        assert!(matches!(
            check(Order::move_to("red", BURG, WALD), Season::Spring),
            Err(Rejection::NotAdjacent { .. })
        ));
    }

    #[test]
    fn sailing_rule() {
        assert_eq!(
            check(Order::move_to("red", BURG, MEER), Season::Spring),
            Err(Rejection::SeaForLandUnit("Meer".into()))
        );
        assert_eq!(check(Order::move_to("red", MEER, BURG), Season::Spring), Ok(()));
        assert!(matches!(
            check(Order::move_to("red", MEER, KUESTE), Season::Spring),
            Err(Rejection::Cliffs { .. })
        ));
    }

    #[test]
    fn second_destination_only_for_horses() {
        let horse = Order::move_to("red", FELD, WALD).with_second_to(HOF);
        assert_eq!(check(horse, Season::Spring), Ok(()));
        let footman = Order::move_to("red", BURG, FELD).with_second_to(WALD);
        assert_eq!(check(footman, Season::Spring), Err(Rejection::SecondDestinationNotHorse));
        let far = Order::move_to("red", FELD, WALD).with_second_to(BURG);
        assert!(matches!(
            check(far, Season::Spring),
            Err(Rejection::SecondDestinationNotAdjacent { .. })
        ));
    }

    #[test]
    fn support_never_moves_twice() {
        let support = Order::support("red", FELD, WALD).with_second_to(HOF);
        assert_eq!(check(support, Season::Summer), Err(Rejection::SupportSecondDestination));
        assert_eq!(check(Order::support("red", FELD, WALD), Season::Summer), Ok(()));
    }

    #[test]
    fn besiege_needs_uncontrolled_castle() {
        assert_eq!(
            check(Order::besiege("red", BURG), Season::Spring),
            Err(Rejection::NotBesiegeable("Burg".into()))
        );
        let mut state = state(Season::Spring);
        state.set_control(BURG, None);
        assert_eq!(validate_order(&Order::besiege("red", BURG), Season::Spring, &state), Ok(()));
        assert_eq!(
            validate_order(&Order::besiege("red", FELD), Season::Spring, &state),
            Err(Rejection::NotBesiegeable("Feld".into()))
        );
    }

    #[test]
    fn transport_only_by_ships() {
        assert_eq!(check(Order::transport("red", BURG), Season::Spring), Err(Rejection::NotTransportShip));
        let mut transport = Order::transport("red", MEER);
        transport.to = Some(BURG);
        assert_eq!(
            check(transport, Season::Spring),
            Err(Rejection::UnexpectedDestination(OrderType::Transport))
        );
    }

    #[test]
    fn winter_moves_stay_home() {
        assert_eq!(check(Order::move_to("red", BURG, FELD), Season::Winter), Ok(()));
        assert_eq!(
            check(Order::move_to("red", FELD, WALD), Season::Winter),
            Err(Rejection::WinterMoveOutsideTerritory("Wald".into()))
        );
        let mut with_build = Order::move_to("red", BURG, FELD);
        with_build.build = Some(UnitType::Horse);
        assert_eq!(check(with_build, Season::Winter), Err(Rejection::WinterMoveWithBuild));
    }

    #[test]
    fn build_rules() {
        assert_eq!(
            check(Order::build("red", BURG, UnitType::Horse), Season::Winter),
            Err(Rejection::BuildOccupied("Burg".into()))
        );
        let mut untyped = Order::build("red", KUESTE, UnitType::Horse);
        untyped.build = None;
        assert_eq!(check(untyped, Season::Winter), Err(Rejection::MissingUnitType("Kueste".into())));
        assert_eq!(check(Order::build("red", KUESTE, UnitType::Ship), Season::Winter), Ok(()));
        assert!(matches!(
            check(Order::build("blue", KUESTE, UnitType::Horse), Season::Winter),
            Err(Rejection::NotControlled { .. })
        ));
    }

    #[test]
    fn ships_build_only_on_coast() {
        let mut state = state(Season::Winter);
        state.take_unit(FELD);
        assert_eq!(
            validate_order(&Order::build("red", FELD, UnitType::Ship), Season::Winter, &state),
            Err(Rejection::ShipNotOnCoast("Feld".into()))
        );
    }

    #[test]
    fn transported_move_checks_via_and_landing() {
        let ok = Order::move_to("red", BURG, KUESTE).with_via(MEER);
        assert_eq!(check(ok, Season::Spring), Ok(()));
        let inland = Order::move_to("red", BURG, WALD).with_via(MEER);
        assert_eq!(check(inland, Season::Spring), Err(Rejection::NotCoastal("Wald".into())));
        let bad_via = Order::move_to("red", FELD, KUESTE).with_via(MEER);
        assert!(matches!(check(bad_via, Season::Spring), Err(Rejection::InvalidVia { .. })));
    }

    #[test]
    fn binding_rejects_unknown_names() {
        let state = state(Season::Spring);
        let spec = OrderSpec::new(OrderType::Move, "Burg").to("Nirgendwo");
        assert_eq!(
            bind_order(&spec, &Player::from("red"), state.map()),
            Err(Rejection::UnknownArea("Nirgendwo".into()))
        );
        let spec = OrderSpec::new(OrderType::Move, "Burg").to("Feld");
        let order = bind_order(&spec, &Player::from("red"), state.map()).unwrap();
        assert_eq!(order, Order::move_to("red", BURG, FELD));
    }
}
