//! Combat modifier table.
//!
//! All bonuses, penalties and thresholds live in `CombatRules` so a session
//! can load them from its config file. The defaults reproduce the board game:
//! with them, a footman attacking across water into an uncontrolled forest
//! castle nets -2 before the dice.

use serde::{Deserialize, Serialize};

use super::battle::{Modifier, ModifierType};
use crate::board::{AreaId, BoardMap, Player, UnitType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombatRules {
    pub footman_bonus: i32,
    /// Applies only when a catapult attacks a castle.
    pub catapult_castle_bonus: i32,
    pub forest_penalty: i32,
    pub castle_penalty: i32,
    pub water_penalty: i32,
    /// For attacks coming through a danger zone.
    pub surprise_bonus: i32,
    pub support_bonus: i32,
    /// Total an attacker needs to take an empty uncontrolled area.
    pub conquer_threshold: i32,
    /// Lowest roll that survives a danger zone.
    pub danger_zone_threshold: i32,
    pub dice_sides: u8,
    pub max_rerolls: u32,
    /// Rounds of siege before a castle changes hands.
    pub siege_rounds: u8,
}

impl Default for CombatRules {
    fn default() -> Self {
        CombatRules {
            footman_bonus: 1,
            catapult_castle_bonus: 1,
            forest_penalty: -1,
            castle_penalty: -1,
            water_penalty: -1,
            surprise_bonus: 1,
            support_bonus: 1,
            conquer_threshold: 4,
            danger_zone_threshold: 3,
            dice_sides: 6,
            max_rerolls: 32,
            siege_rounds: 2,
        }
    }
}

/// An attacking leg as seen by the modifier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attack {
    pub unit: UnitType,
    pub from: AreaId,
    pub to: AreaId,
    pub transported: bool,
    /// Came through a danger zone.
    pub surprise: bool,
}

/// Whether forest, castle and water penalties count against an attacker:
/// either the area is uncontrolled and this is its only attacker, or it is
/// controlled and defended and the fight is not a border battle.
pub fn terrain_applies(controlled: bool, defended: bool, sole_attacker: bool, border: bool) -> bool {
    (!controlled && sole_attacker) || (controlled && defended && !border)
}

impl CombatRules {
    pub fn unit_modifier(&self, unit: UnitType, attacking_castle: bool) -> Option<Modifier> {
        let value = match unit {
            UnitType::Footman => self.footman_bonus,
            UnitType::Catapult if attacking_castle => self.catapult_castle_bonus,
            _ => 0,
        };
        (value != 0).then(|| Modifier::new(ModifierType::Unit, value))
    }

    /// Modifiers of an attacker, dice and support excluded.
    pub fn attack_modifiers(&self, map: &BoardMap, attack: &Attack, terrain: bool) -> Vec<Modifier> {
        let dest = map.area(attack.to);
        let mut mods = Vec::new();

        if attack.surprise && self.surprise_bonus != 0 {
            mods.push(Modifier::new(ModifierType::Surprise, self.surprise_bonus));
        }

        if terrain {
            if dest.forest {
                mods.push(Modifier::new(ModifierType::Forest, self.forest_penalty));
            }
            if dest.castle {
                mods.push(Modifier::new(ModifierType::Castle, self.castle_penalty));
            }
            let across_water = attack.transported
                || map
                    .neighbor(attack.from, attack.to)
                    .map_or(true, |n| n.across_water);
            if across_water {
                mods.push(Modifier::new(ModifierType::Water, self.water_penalty));
            }
        }

        mods.extend(self.unit_modifier(attack.unit, dest.castle));
        mods
    }

    /// Modifiers of a defending unit, dice and support excluded.
    pub fn defense_modifiers(&self, unit: UnitType) -> Vec<Modifier> {
        self.unit_modifier(unit, false).into_iter().collect()
    }

    pub fn support_modifier(&self, from: Player) -> Modifier {
        Modifier::support(from, self.support_bonus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AreaConfig, BoardConfig, NeighborConfig};

    fn sum(mods: &[Modifier]) -> i32 {
        mods.iter().map(|m| m.value).sum()
    }

    fn map() -> BoardMap {
        let config = BoardConfig::new("t", 3)
            .area(AreaConfig::land("area1").home("yellow"))
            .area(AreaConfig::land("area2").forest().castle())
            .area(AreaConfig::land("area3"))
            .neighbor(NeighborConfig::new("area1", "area2").river())
            .neighbor(NeighborConfig::new("area3", "area2"));
        BoardMap::from_config(&config).unwrap()
    }

    #[test]
    fn footman_across_water_into_forest_castle_is_minus_two() {
        let map = map();
        let attack = Attack {
            unit: UnitType::Footman,
            from: AreaId(0),
            to: AreaId(1),
            transported: false,
            surprise: false,
        };
        let terrain = terrain_applies(false, false, true, false);
        let mods = CombatRules::default().attack_modifiers(&map, &attack, terrain);
        assert_eq!(sum(&mods), -2);
    }

    #[test]
    fn catapult_bonus_only_against_castles() {
        let rules = CombatRules::default();
        assert_eq!(rules.unit_modifier(UnitType::Catapult, true).unwrap().value, 1);
        assert!(rules.unit_modifier(UnitType::Catapult, false).is_none());
        assert!(rules.unit_modifier(UnitType::Horse, true).is_none());
        assert_eq!(rules.defense_modifiers(UnitType::Footman).len(), 1);
        assert!(rules.defense_modifiers(UnitType::Catapult).is_empty());
    }

    #[test]
    fn terrain_skipped_in_border_battles_and_crowds() {
        assert!(terrain_applies(false, false, true, false));
        assert!(!terrain_applies(false, false, false, false));
        assert!(terrain_applies(true, true, false, false));
        assert!(!terrain_applies(true, true, true, true));
        assert!(!terrain_applies(true, false, true, false));
    }

    #[test]
    fn surprise_and_dry_land() {
        let map = map();
        let attack = Attack {
            unit: UnitType::Horse,
            from: AreaId(2),
            to: AreaId(1),
            transported: false,
            surprise: true,
        };
        let mods = CombatRules::default().attack_modifiers(&map, &attack, true);
        // surprise +1, forest -1, castle -1, no water
        assert_eq!(sum(&mods), -1);
        assert!(mods.iter().all(|m| m.modifier_type != ModifierType::Water));
    }

    #[test]
    fn partial_rules_config_fills_defaults() {
        let rules: CombatRules = serde_json::from_str(r#"{ "conquerThreshold": 5 }"#).unwrap();
        assert_eq!(rules.conquer_threshold, 5);
        assert_eq!(rules.dice_sides, 6);
    }
}
