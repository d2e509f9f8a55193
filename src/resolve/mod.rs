//! Round resolution.
//!
//! Turns one round's validated orders into a new board state and a
//! `RoundResult`: order statuses, battles with every modifier, and the
//! winner if one emerged.

pub mod battle;
pub mod dice;
mod movement;
pub mod outcome;
pub mod round;
pub mod rules;
pub mod transport;
mod winter;

pub use battle::{Battle, BattleResult, Modifier, ModifierType};
pub use dice::{DiceRoller, FixedDice, SeededDice};
pub use outcome::{OrderStatus, Resolution, ResolvedOrder, RoundResult};
pub use round::{ResolveError, RoundResolver, Step, SupportKey, SupportQuery};
pub use rules::CombatRules;
pub use transport::{find_transport_path, TransportPath};
