//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SimRng instances derived from the
//! batch master seed and the simulation index.
//!
//! Each simulation index gets its own RNG stream, seeded from
//! (master_seed XOR mixed sim index). This means:
//!   - A simulation replays identically no matter which worker runs it.
//!   - Sharding and thread count never change any draw.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::collections::BTreeMap;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// A deterministic RNG stream for one simulation index.
pub struct SimRng {
    pub sim: u64,
    inner: Pcg64Mcg,
}

impl SimRng {
    /// The stream for simulation `sim` under `master_seed`.
    /// Rejected attempts keep drawing from this same stream.
    pub fn for_sim(master_seed: u64, sim: u64) -> Self {
        let derived_seed = master_seed ^ (sim.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA));
        Self {
            sim,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// A stream not tied to a simulation, e.g. for criteria shuffling.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            sim: u64::MAX,
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Uniform index into a slice of length `len`.
    pub fn index(&mut self, len: usize) -> usize {
        self.next_u64_below(len as u64) as usize
    }

    /// Pick a key with probability proportional to its weight.
    /// Returns None when every weight is zero or the map is empty.
    pub fn weighted_pick<'a>(&mut self, weights: &'a BTreeMap<String, u64>) -> Option<&'a str> {
        let total: u64 = weights.values().sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.next_u64_below(total);
        for (key, &weight) in weights {
            if roll < weight {
                return Some(key.as_str());
            }
            roll -= weight;
        }
        None
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}
