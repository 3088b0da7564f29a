//! Scripted RNGs so random character selection is repeatable in tests.

use parley_core::rng::DeterministicRng;

/// Always yields the lower bound, so a random pick lands on the first
/// character of a scenario.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// Replays `picks` in order, wrapping around at the end. Each value is
/// clamped into the requested range.
#[derive(Debug)]
pub struct SequenceRng {
    picks: Vec<u32>,
    cursor: usize,
}

impl SequenceRng {
    /// Scripts the picks to hand out.
    #[must_use]
    pub fn new(picks: Vec<u32>) -> Self {
        Self { picks, cursor: 0 }
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if self.picks.is_empty() {
            return min;
        }
        let pick = self.picks[self.cursor % self.picks.len()];
        self.cursor += 1;
        pick.clamp(min, max)
    }
}
