//! Round results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::battle::Battle;
use crate::board::{BoardState, OrderSpec, Player, Season};

/// Final status of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Succeeded,
    Failed,
    /// The ordering unit was destroyed in battle.
    ContestedAndLost,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOrder {
    #[serde(flatten)]
    pub order: OrderSpec,
    pub status: OrderStatus,
}

/// Everything that happened in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round: u32,
    pub season: Season,
    pub orders: BTreeMap<Player, Vec<ResolvedOrder>>,
    /// Battles keyed by area name, in the order they were fought.
    pub battles: BTreeMap<String, Vec<Battle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Player>,
}

impl RoundResult {
    /// Status of the order `player` gave from the area named `from`.
    pub fn status_of(&self, player: &Player, from: &str) -> Option<OrderStatus> {
        self.orders
            .get(player)?
            .iter()
            .find(|o| o.order.from == from)
            .map(|o| o.status)
    }

    pub fn battles_at(&self, area: &str) -> &[Battle] {
        self.battles.get(area).map_or(&[], Vec::as_slice)
    }

    pub fn battle_count(&self) -> usize {
        self.battles.values().map(Vec::len).sum()
    }
}

/// A finished round: the position afterwards and what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub state: BoardState,
    pub result: RoundResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::OrderType;

    #[test]
    fn status_lookup_by_area_name() {
        let mut orders = BTreeMap::new();
        let red = Player::from("red");
        orders.insert(
            red.clone(),
            vec![ResolvedOrder {
                order: OrderSpec::new(OrderType::Besiege, "Burg"),
                status: OrderStatus::Succeeded,
            }],
        );
        let result = RoundResult {
            round: 2,
            season: Season::Spring,
            orders,
            battles: BTreeMap::new(),
            winner: None,
        };
        assert_eq!(result.status_of(&red, "Burg"), Some(OrderStatus::Succeeded));
        assert_eq!(result.status_of(&red, "Wald"), None);
        assert!(result.battles_at("Burg").is_empty());
        assert_eq!(result.battle_count(), 0);
    }

    #[test]
    fn resolved_order_flattens_spec() {
        let resolved = ResolvedOrder {
            order: OrderSpec::new(OrderType::Move, "A").to("B"),
            status: OrderStatus::ContestedAndLost,
        };
        let json = serde_json::to_string(&resolved).unwrap();
        assert_eq!(
            json,
            r#"{"type":"move","from":"A","to":"B","status":"contestedAndLost"}"#
        );
    }
}
