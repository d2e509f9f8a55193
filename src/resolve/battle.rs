//! Battle records.
//!
//! A `Battle` lists one `BattleResult` per participant; each result keeps
//! the modifiers that produced its total so clients can show the breakdown.

use serde::{Deserialize, Serialize};

use crate::board::Player;

/// Source of a bonus or penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierType {
    Dice,
    Unit,
    Forest,
    Castle,
    Water,
    Surprise,
    Support,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    #[serde(rename = "type")]
    pub modifier_type: ModifierType,
    pub value: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supporting_player: Option<Player>,
}

impl Modifier {
    pub fn new(modifier_type: ModifierType, value: i32) -> Self {
        Modifier {
            modifier_type,
            value,
            supporting_player: None,
        }
    }

    pub fn support(from: Player, value: i32) -> Self {
        Modifier {
            modifier_type: ModifierType::Support,
            value,
            supporting_player: Some(from),
        }
    }
}

/// One participant's side of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResult {
    pub player: Player,
    pub total: i32,
    pub parts: Vec<Modifier>,
    /// Area the participant fought from.
    pub from: String,
    #[serde(default)]
    pub defending: bool,
}

impl BattleResult {
    pub fn new(player: Player, from: String, defending: bool, parts: Vec<Modifier>) -> Self {
        let total = parts.iter().map(|m| m.value).sum();
        BattleResult {
            player,
            total,
            parts,
            from,
            defending,
        }
    }

    /// Replaces the dice roll and recomputes the total.
    pub fn reroll(&mut self, value: i32) {
        match self
            .parts
            .iter_mut()
            .find(|m| m.modifier_type == ModifierType::Dice)
        {
            Some(dice) => dice.value = value,
            None => self.parts.push(Modifier::new(ModifierType::Dice, value)),
        }
        self.total = self.parts.iter().map(|m| m.value).sum();
    }
}

/// A battle, or a danger zone crossing recorded as a one-sided battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    /// The contested area, or both areas of a border battle.
    pub areas: Vec<String>,
    pub results: Vec<BattleResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danger_zone: Option<String>,
}

impl Battle {
    pub fn is_border(&self) -> bool {
        self.areas.len() == 2
    }

    /// Indices of the results sharing the highest total.
    pub fn leaders(&self) -> Vec<usize> {
        leaders(&self.results)
    }
}

pub(crate) fn leaders(results: &[BattleResult]) -> Vec<usize> {
    let Some(max) = results.iter().map(|r| r.total).max() else {
        return Vec::new();
    };
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.total == max)
        .map(|(i, _)| i)
        .collect()
}
