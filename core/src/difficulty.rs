//! Sliding-window difficulty adjuster (§3, §4.4).
//!
//! Holds the current target plus a bounded window of recent block
//! timestamps. Every `adjustment_period` blocks the target is rescaled by
//! the ratio of actual to expected elapsed time, clamped to `[1/4, 4]`, and
//! the target itself is clamped to the valid `[1, hash_space_max]` range.

use std::collections::VecDeque;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pow::{bits_from_target, difficulty_from_target, target_from_bits};

const MIN_RATIO_NUM: u64 = 1;
const MIN_RATIO_DEN: u64 = 4;
const MAX_RATIO_NUM: u64 = 4;
const MAX_RATIO_DEN: u64 = 1;

fn hash_space_max() -> BigUint {
    (BigUint::one() << 256u32) - BigUint::one()
}

/// A snapshot of adjuster state suitable for persistence and restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjusterState {
    pub target_hex: String,
    pub total_blocks: u64,
    pub recent_timestamps_ms: Vec<u64>,
}

/// Tracks chain difficulty and rescales it on a fixed block-count cadence.
pub struct DifficultyAdjuster {
    target: BigUint,
    recent_timestamps: VecDeque<u64>,
    total_blocks: u64,
    target_block_time_ms: u64,
    adjustment_period: u64,
}

impl DifficultyAdjuster {
    /// Creates an adjuster starting at `initial_target`, targeting
    /// `target_block_time_ms` per block and rescaling every
    /// `adjustment_period` blocks.
    pub fn new(initial_target: BigUint, target_block_time_ms: u64, adjustment_period: u64) -> Self {
        Self {
            target: initial_target,
            recent_timestamps: VecDeque::with_capacity(adjustment_period as usize),
            total_blocks: 0,
            target_block_time_ms,
            adjustment_period,
        }
    }

    /// Current difficulty target as a big integer.
    pub fn target(&self) -> &BigUint {
        &self.target
    }

    /// Current target encoded as the compact `bits` field carried in block headers.
    pub fn bits(&self) -> u32 {
        bits_from_target(&self.target)
    }

    /// Current target as lowercase hex, for persistence and status display.
    pub fn target_hex(&self) -> String {
        hex::encode(self.target.to_bytes_be())
    }

    /// Leading-zero-equivalent difficulty integer for status display.
    pub fn difficulty(&self) -> u64 {
        difficulty_from_target(&self.target)
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn adjustment_period(&self) -> u64 {
        self.adjustment_period
    }

    pub fn blocks_until_adjust(&self) -> u64 {
        self.adjustment_period - (self.total_blocks % self.adjustment_period)
    }

    /// Records a newly accepted block's timestamp (own or peer) and rescales
    /// the target if this block closes an adjustment window.
    pub fn record_block(&mut self, timestamp_ms: u64) -> Result<()> {
        self.recent_timestamps.push_back(timestamp_ms);
        while self.recent_timestamps.len() as u64 > self.adjustment_period {
            self.recent_timestamps.pop_front();
        }
        self.total_blocks += 1;

        if self.total_blocks % self.adjustment_period == 0 && self.recent_timestamps.len() >= 2 {
            self.rescale()?;
        }
        Ok(())
    }

    fn rescale(&mut self) -> Result<()> {
        let oldest = *self.recent_timestamps.front().unwrap();
        let newest = *self.recent_timestamps.back().unwrap();
        let actual = newest.saturating_sub(oldest).max(1);
        let expected = self
            .target_block_time_ms
            .saturating_mul(self.recent_timestamps.len() as u64 - 1)
            .max(1);

        // new_target = old_target * actual / expected, clamped to [1/4, 4]x
        let (ratio_num, ratio_den) = clamp_ratio(actual, expected);
        let mut new_target = (&self.target * ratio_num) / ratio_den;

        if new_target.is_zero() {
            new_target = BigUint::one();
        }
        let max = hash_space_max();
        if new_target > max {
            new_target = max;
        }
        self.target = new_target;
        Ok(())
    }

    /// Restores state persisted across a restart.
    pub fn restore(&mut self, state: AdjusterState) -> Result<()> {
        let bytes = hex::decode(&state.target_hex)
            .map_err(|e| Error::ConfigInvalid(format!("bad difficulty_target hex: {e}")))?;
        self.target = BigUint::from_bytes_be(&bytes);
        self.total_blocks = state.total_blocks;
        self.recent_timestamps = state.recent_timestamps_ms.into();
        while self.recent_timestamps.len() as u64 > self.adjustment_period {
            self.recent_timestamps.pop_front();
        }
        Ok(())
    }

    /// Snapshot of current state for persistence.
    pub fn snapshot(&self) -> AdjusterState {
        AdjusterState {
            target_hex: self.target_hex(),
            total_blocks: self.total_blocks,
            recent_timestamps_ms: self.recent_timestamps.iter().copied().collect(),
        }
    }
}

/// Clamps `actual/expected` to `[1/4, 4]`, returning an integer
/// numerator/denominator pair to avoid floating point in consensus math.
fn clamp_ratio(actual: u64, expected: u64) -> (u64, u64) {
    // actual/expected < 1/4  =>  4*actual < expected
    if actual.saturating_mul(MIN_RATIO_DEN) < expected.saturating_mul(MIN_RATIO_NUM) {
        return (MIN_RATIO_NUM, MIN_RATIO_DEN);
    }
    // actual/expected > 4/1  =>  actual > 4*expected
    if actual > expected.saturating_mul(MAX_RATIO_NUM) / MAX_RATIO_DEN {
        return (MAX_RATIO_NUM, MAX_RATIO_DEN);
    }
    (actual, expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjuster(period: u64) -> DifficultyAdjuster {
        let initial = BigUint::one() << 240u32;
        DifficultyAdjuster::new(initial, 1000, period)
    }

    #[test]
    fn restore_reflects_persisted_state() {
        let mut adj = adjuster(4);
        let target = BigUint::from(12345u32);
        adj.restore(AdjusterState {
            target_hex: hex::encode(target.to_bytes_be()),
            total_blocks: 7,
            recent_timestamps_ms: vec![1, 2, 3],
        })
        .unwrap();
        assert_eq!(adj.target(), &target);
        assert_eq!(adj.total_blocks(), 7);
    }

    #[test]
    fn fast_blocks_raise_difficulty_within_bound() {
        let mut adj = adjuster(4);
        let before = adj.target().clone();
        // 4 blocks spaced 250ms apart against a 1000ms target -> 4x too fast
        for i in 0..4u64 {
            adj.record_block(i * 250).unwrap();
        }
        let after = adj.target().clone();
        assert!(after < before, "target should shrink (difficulty up) when blocks arrive too fast");
        // bounded by 1/4 clamp: after >= before / 4
        assert!(after >= &before / 4u32);
    }

    #[test]
    fn slow_blocks_lower_difficulty_within_bound() {
        let mut adj = adjuster(4);
        let before = adj.target().clone();
        for i in 0..4u64 {
            adj.record_block(i * 8000).unwrap();
        }
        let after = adj.target().clone();
        assert!(after > before, "target should grow (difficulty down) when blocks arrive too slowly");
        assert!(after <= &before * 4u32);
    }

    #[test]
    fn holds_steady_near_target_pace() {
        let mut adj = adjuster(4);
        let before = adj.target().clone();
        for i in 0..4u64 {
            adj.record_block(i * 1000).unwrap();
        }
        let after = adj.target().clone();
        assert_eq!(after, before);
    }

    #[test]
    fn no_rescale_before_period_closes() {
        let mut adj = adjuster(4);
        let before = adj.target().clone();
        adj.record_block(0).unwrap();
        adj.record_block(10).unwrap();
        assert_eq!(adj.target(), &before);
    }
}
