//! Message vocabulary between players and a session.
//!
//! Every message is a JSON object tagged by `"type"`. Field names are
//! camelCase on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{OrderSpec, Player, Season};
use crate::resolve::RoundResult;

/// Messages a player sends to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// The player's complete order set for this round.
    SubmitOrders { orders: Vec<OrderSpec> },

    /// Answer to an `AskSupport`. `player` is the battler to support, or
    /// null to withhold the support.
    GiveSupport {
        from: String,
        to: String,
        #[serde(default)]
        player: Option<Player>,
    },

    Quit,

    /// Vote to remove another player.
    Kick { player: Player },
}

impl ClientMessage {
    /// Wire tags accepted from clients.
    pub const TYPES: [&'static str; 4] = ["submitOrders", "giveSupport", "quit", "kick"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaveReason {
    Quit,
    Kicked,
}

/// Messages the session sends to players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    GameStarted {
        players: Vec<Player>,
        season: Season,
        round: u32,
    },

    /// Asks the owner of the support order in `from` which battler it joins.
    AskSupport {
        from: String,
        to: String,
        battlers: Vec<Player>,
    },

    SupportGiven {
        from: String,
        to: String,
        #[serde(rename = "supportingPlayer")]
        supporting_player: Player,
        #[serde(rename = "supportedPlayer")]
        supported_player: Option<Player>,
    },

    OrdersConfirmation { player: Player },

    /// Every player's orders, sent once all are confirmed and before the
    /// round resolves.
    OrdersReceived {
        orders: BTreeMap<Player, Vec<OrderSpec>>,
    },

    RoundResult(RoundResult),

    PlayerLeft { player: Player, reason: LeaveReason },

    Winner { winner: Player },

    Error { error: String },
}

impl ServerMessage {
    pub fn error(message: impl ToString) -> Self {
        ServerMessage::Error {
            error: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::OrderType;

    #[test]
    fn ask_support_shape() {
        let msg = ServerMessage::AskSupport {
            from: "Wald".into(),
            to: "Burg".into(),
            battlers: vec![Player::from("red"), Player::from("green")],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"askSupport","from":"Wald","to":"Burg","battlers":["red","green"]}"#
        );
    }

    #[test]
    fn support_given_uses_camel_case() {
        let msg = ServerMessage::SupportGiven {
            from: "Wald".into(),
            to: "Burg".into(),
            supporting_player: Player::from("yellow"),
            supported_player: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["supportingPlayer"], "yellow");
        assert!(value["supportedPlayer"].is_null());
    }

    #[test]
    fn round_result_is_inlined() {
        let msg = ServerMessage::RoundResult(RoundResult {
            round: 3,
            season: Season::Summer,
            orders: BTreeMap::new(),
            battles: BTreeMap::new(),
            winner: None,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "roundResult");
        assert_eq!(value["round"], 3);
        assert_eq!(value["season"], "summer");
    }

    #[test]
    fn orders_received_groups_by_player() {
        let mut orders = BTreeMap::new();
        orders.insert(
            Player::from("red"),
            vec![OrderSpec::new(OrderType::Move, "Wald").to("Burg")],
        );
        let value = serde_json::to_value(ServerMessage::OrdersReceived { orders }).unwrap();
        assert_eq!(value["type"], "ordersReceived");
        assert_eq!(value["orders"]["red"][0]["to"], "Burg");
    }

    #[test]
    fn give_support_player_may_be_missing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"giveSupport","from":"A","to":"B"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::GiveSupport {
                from: "A".into(),
                to: "B".into(),
                player: None
            }
        );
    }
}
