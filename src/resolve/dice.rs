//! Dice.
//!
//! Every roll in a round comes from one `DiceRoller`. `start_round` is called
//! at the beginning of each resolution pass, so a pass that is re-run after a
//! support answer sees exactly the same rolls as before.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait DiceRoller: Send {
    /// Rewinds to the first roll of `round`.
    fn start_round(&mut self, round: u32);

    /// Rolls one die with `sides` faces, returning 1..=sides.
    fn roll(&mut self, sides: u8) -> i32;
}

/// Reproducible dice: the stream for a round depends only on the session
/// seed and the round number.
#[derive(Debug, Clone)]
pub struct SeededDice {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        SeededDice {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn round_seed(&self, round: u32) -> u64 {
        self.seed ^ u64::from(round).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }
}

impl DiceRoller for SeededDice {
    fn start_round(&mut self, round: u32) {
        self.rng = ChaCha8Rng::seed_from_u64(self.round_seed(round));
    }

    fn roll(&mut self, sides: u8) -> i32 {
        self.rng.gen_range(1..=i32::from(sides.max(1)))
    }
}

/// Scripted dice for tests: returns the given values in order and starts
/// over from the first value once they run out.
#[derive(Debug, Clone)]
pub struct FixedDice {
    rolls: Vec<i32>,
    cursor: usize,
}

impl FixedDice {
    pub fn new(rolls: impl Into<Vec<i32>>) -> Self {
        let mut rolls = rolls.into();
        if rolls.is_empty() {
            rolls.push(1);
        }
        FixedDice { rolls, cursor: 0 }
    }

    pub fn constant(value: i32) -> Self {
        FixedDice::new(vec![value])
    }
}

impl DiceRoller for FixedDice {
    fn start_round(&mut self, _round: u32) {
        self.cursor = 0;
    }

    fn roll(&mut self, _sides: u8) -> i32 {
        let value = self.rolls[self.cursor % self.rolls.len()];
        self.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(dice: &mut dyn DiceRoller, n: usize) -> Vec<i32> {
        (0..n).map(|_| dice.roll(6)).collect()
    }

    #[test]
    fn seeded_dice_repeat_per_round() {
        let mut dice = SeededDice::new(42);
        dice.start_round(3);
        let first = draw(&mut dice, 20);
        dice.start_round(3);
        assert_eq!(draw(&mut dice, 20), first);
        assert!(first.iter().all(|&r| (1..=6).contains(&r)));
    }

    #[test]
    fn rounds_get_different_streams() {
        let mut dice = SeededDice::new(42);
        dice.start_round(1);
        let one = draw(&mut dice, 20);
        dice.start_round(2);
        assert_ne!(draw(&mut dice, 20), one);
    }

    #[test]
    fn fixed_dice_cycle_and_rewind() {
        let mut dice = FixedDice::new(vec![6, 2]);
        dice.start_round(1);
        assert_eq!(draw(&mut dice, 3), vec![6, 2, 6]);
        dice.start_round(1);
        assert_eq!(dice.roll(6), 6);
        assert_eq!(FixedDice::constant(4).roll(6), 4);
    }
}
