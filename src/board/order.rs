//! Orders.
//!
//! Players write orders against area names (`OrderSpec`); once bound to a
//! board they become `Order`s referring to `AreaId`s. Orders exist only for
//! the round they were submitted in.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::area::AreaId;
use super::map::BoardMap;
use super::unit::{Player, UnitType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Move,
    Support,
    Besiege,
    Transport,
    Build,
}

impl OrderType {
    pub const fn name(self) -> &'static str {
        match self {
            OrderType::Move => "move",
            OrderType::Support => "support",
            OrderType::Besiege => "besiege",
            OrderType::Transport => "transport",
            OrderType::Build => "build",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An order as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSpec {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<UnitType>,
    /// Stamped by the server; whatever the client sends is overwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<Player>,
}

impl OrderSpec {
    pub fn new(order_type: OrderType, from: impl Into<String>) -> Self {
        OrderSpec {
            order_type,
            from: from.into(),
            to: None,
            second_to: None,
            via: None,
            build: None,
            player: None,
        }
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn second_to(mut self, to: impl Into<String>) -> Self {
        self.second_to = Some(to.into());
        self
    }

    pub fn via(mut self, via: impl Into<String>) -> Self {
        self.via = Some(via.into());
        self
    }

    pub fn build(mut self, unit_type: UnitType) -> Self {
        self.build = Some(unit_type);
        self
    }
}

/// An order bound to a board.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Order {
    pub order_type: OrderType,
    pub player: Player,
    pub from: AreaId,
    pub to: Option<AreaId>,
    pub second_to: Option<AreaId>,
    /// First sea area of a transport chain.
    pub via: Option<AreaId>,
    pub build: Option<UnitType>,
}

impl Order {
    fn bare(order_type: OrderType, player: impl Into<Player>, from: AreaId) -> Self {
        Order {
            order_type,
            player: player.into(),
            from,
            to: None,
            second_to: None,
            via: None,
            build: None,
        }
    }

    pub fn move_to(player: impl Into<Player>, from: AreaId, to: AreaId) -> Self {
        Order {
            to: Some(to),
            ..Order::bare(OrderType::Move, player, from)
        }
    }

    pub fn support(player: impl Into<Player>, from: AreaId, to: AreaId) -> Self {
        Order {
            to: Some(to),
            ..Order::bare(OrderType::Support, player, from)
        }
    }

    pub fn besiege(player: impl Into<Player>, from: AreaId) -> Self {
        Order::bare(OrderType::Besiege, player, from)
    }

    pub fn transport(player: impl Into<Player>, from: AreaId) -> Self {
        Order::bare(OrderType::Transport, player, from)
    }

    pub fn build(player: impl Into<Player>, from: AreaId, unit_type: UnitType) -> Self {
        Order {
            build: Some(unit_type),
            ..Order::bare(OrderType::Build, player, from)
        }
    }

    pub fn with_second_to(mut self, second_to: AreaId) -> Self {
        self.second_to = Some(second_to);
        self
    }

    pub fn with_via(mut self, via: AreaId) -> Self {
        self.via = Some(via);
        self
    }

    pub fn is_move(&self) -> bool {
        self.order_type == OrderType::Move
    }

    /// Converts back to area names, e.g. for round results.
    pub fn to_spec(&self, map: &BoardMap) -> OrderSpec {
        let name = |id: AreaId| map.name_of(id).to_string();
        OrderSpec {
            order_type: self.order_type,
            from: name(self.from),
            to: self.to.map(name),
            second_to: self.second_to.map(name),
            via: self.via.map(name),
            build: self.build,
            player: Some(self.player.clone()),
        }
    }
}
