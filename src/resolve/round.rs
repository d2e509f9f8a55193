//! Round resolution entry point.
//!
//! `RoundResolver` holds one round's validated orders and any support
//! answers collected so far. Each call to `run` resolves the round from the
//! start; when a support order could go to more than one battler and the
//! supporting player has not said which, the pass stops before rolling for
//! that battle and returns the open queries. Feed the answers back with
//! `answer` and call `run` again: with the dice rewound to the start of the
//! round, everything up to the suspended battle replays identically.

use std::collections::BTreeMap;

use thiserror::Error;

use super::dice::DiceRoller;
use super::movement::Movement;
use super::outcome::Resolution;
use super::rules::CombatRules;
use super::winter::resolve_winter;
use crate::board::{AreaId, BoardState, Order, Player};

/// Internal inconsistencies found while resolving. The round is aborted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("battle at {0} has no results")]
    EmptyBattle(String),

    #[error("tie at {area} did not break after {rerolls} re-rolls")]
    UnbreakableTie { area: String, rerolls: u32 },

    #[error("resolution stalled with {0} unresolved moves")]
    Stalled(usize),
}

/// Identifies one support decision: the support order's area and the
/// battle it could join, named by key area and position among the battles
/// fought there this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SupportKey {
    pub supporter: AreaId,
    pub battle_area: AreaId,
    pub nth: usize,
}

/// A question for a supporting player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportQuery {
    pub key: SupportKey,
    pub player: Player,
    /// Area of the supporting unit.
    pub from: AreaId,
    /// Target of the support order.
    pub to: AreaId,
    pub battlers: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Done(Box<Resolution>),
    NeedSupport(Vec<SupportQuery>),
}

#[derive(Debug, Clone)]
pub struct RoundResolver {
    rules: CombatRules,
    orders: Vec<Order>,
    answers: BTreeMap<SupportKey, Option<Player>>,
}

impl RoundResolver {
    /// Orders are sorted by area, so submission order never matters.
    pub fn new(rules: CombatRules, mut orders: Vec<Order>) -> Self {
        orders.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.player.cmp(&b.player)));
        RoundResolver {
            rules,
            orders,
            answers: BTreeMap::new(),
        }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Records a support decision. `None` withholds the support.
    pub fn answer(&mut self, key: SupportKey, supported: Option<Player>) {
        self.answers.insert(key, supported);
    }

    pub fn run(&self, state: &BoardState, dice: &mut dyn DiceRoller) -> Result<Step, ResolveError> {
        if state.season.is_winter() {
            return Ok(Step::Done(Box::new(resolve_winter(state, &self.orders))));
        }
        dice.start_round(state.round);
        Movement::new(&self.rules, state, &self.orders, &self.answers, dice).resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AreaConfig, BoardConfig, NeighborConfig, Season, UnitType};
    use crate::resolve::dice::FixedDice;
    use crate::resolve::outcome::OrderStatus;

    fn board() -> BoardState {
        let mut state = BoardConfig::new("t", 5)
            .area(AreaConfig::land("A").home("red").with_unit(UnitType::Footman, "red"))
            .area(AreaConfig::land("B").home("red"))
            .neighbor(NeighborConfig::new("A", "B"))
            .build()
            .unwrap();
        state.season = Season::Spring;
        state
    }

    #[test]
    fn orders_sorted_by_area() {
        let resolver = RoundResolver::new(
            CombatRules::default(),
            vec![
                Order::besiege("red", AreaId(3)),
                Order::move_to("red", AreaId(1), AreaId(2)),
            ],
        );
        assert_eq!(resolver.orders()[0].from, AreaId(1));
    }

    #[test]
    fn move_into_own_empty_area_succeeds() {
        let state = board();
        let resolver = RoundResolver::new(
            CombatRules::default(),
            vec![Order::move_to("red", AreaId(0), AreaId(1))],
        );
        let Step::Done(res) = resolver.run(&state, &mut FixedDice::constant(1)).unwrap() else {
            panic!("expected a finished round");
        };
        assert_eq!(
            res.result.status_of(&Player::from("red"), "A"),
            Some(OrderStatus::Succeeded)
        );
        assert!(res.state.unit(AreaId(0)).is_none());
        assert!(res.state.unit(AreaId(1)).is_some());
        assert_eq!(res.result.battle_count(), 0);
    }

    #[test]
    fn winter_rounds_skip_dice() {
        let mut state = board();
        state.season = Season::Winter;
        let resolver = RoundResolver::new(
            CombatRules::default(),
            vec![Order::build("red", AreaId(1), UnitType::Horse)],
        );
        let Step::Done(res) = resolver.run(&state, &mut FixedDice::constant(1)).unwrap() else {
            panic!("expected a finished round");
        };
        assert_eq!(res.state.unit(AreaId(1)).unwrap().unit_type, UnitType::Horse);
    }
}
