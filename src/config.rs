//! Session configuration.
//!
//! Loaded from JSON; every field is optional and falls back to the default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::Season;
use crate::resolve::CombatRules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Seed for the dice. Rolls for a round depend only on this and the
    /// round number.
    pub seed: u64,
    /// How long a supporting player may take to answer `askSupport`.
    pub support_timeout_secs: u64,
    pub starting_season: Season,
    pub min_players: usize,
    pub rules: CombatRules,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            seed: 0,
            support_timeout_secs: 60,
            starting_season: Season::Winter,
            min_players: 2,
            rules: CombatRules::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn support_timeout(&self) -> Duration {
        Duration::from_secs(self.support_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(SessionConfig::from_json("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn nested_rules_override() {
        let config = SessionConfig::from_json(
            r#"{ "seed": 7, "startingSeason": "spring", "rules": { "supportBonus": 2 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.starting_season, Season::Spring);
        assert_eq!(config.rules.support_bonus, 2);
        assert_eq!(config.rules.footman_bonus, 1);
        assert_eq!(config.support_timeout(), Duration::from_secs(60));
    }
}
