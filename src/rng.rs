//! Random sources for battle rolls

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Source of uniform rolls in `[0, 1)`.
pub trait RandomSource {
    fn roll(&mut self) -> f64;
}

/// Seeded generator kept in the application state.
///
/// It serializes with the rest of the state, so a debug snapshot replays the
/// same damage and heal rolls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleRng(ChaCha8Rng);

impl BattleRng {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_time() -> Self {
        Self::seeded(seed_from_time())
    }
}

impl Default for BattleRng {
    fn default() -> Self {
        Self::from_time()
    }
}

impl RandomSource for BattleRng {
    fn roll(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Fixed sequence of rolls; yields `0.0` once exhausted.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRolls {
    rolls: VecDeque<f64>,
}

impl ScriptedRolls {
    pub fn new(rolls: impl IntoIterator<Item = f64>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RandomSource for ScriptedRolls {
    fn roll(&mut self) -> f64 {
        let roll = self.rolls.pop_front().unwrap_or(0.0);
        // keep the half-open range even for hand-written scripts
        roll.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

fn seed_from_time() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_secs() << 32) ^ now.subsec_nanos() as u64
}
