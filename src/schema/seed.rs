//! Seed description for the initial lattice.

use serde::{Deserialize, Serialize};

/// How generation zero is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seed {
    /// RNG seed for the random fill.
    pub rng_seed: u64,
    /// Each cell is live with probability `1 / density_divisor`.
    /// Zero disables the random fill.
    pub density_divisor: u32,
    /// Cells forced live after the random fill, as `(x, y)`.
    pub cells: Vec<(usize, usize)>,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            rng_seed: 24,
            density_divisor: 5,
            cells: vec![(4, 4), (4, 5), (4, 6), (5, 6), (5, 7)],
        }
    }
}
