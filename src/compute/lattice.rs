//! Host-side lattice representation.
//!
//! Cells are stored as `u32` 0/1 values, row-major, so a lattice can be
//! copied to and from device storage buffers without conversion.

use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::schema::Seed;

/// Square boolean lattice in host memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    side: usize,
    cells: Vec<u32>,
}

impl Lattice {
    /// All-dead lattice of the given side length.
    pub fn dead(side: usize) -> Self {
        Self {
            side,
            cells: vec![0; side * side],
        }
    }

    /// Wrap raw cells. Returns `None` if `cells.len() != side * side`.
    pub fn from_cells(side: usize, cells: Vec<u32>) -> Option<Self> {
        if cells.len() != side * side {
            return None;
        }
        Some(Self { side, cells })
    }

    /// Generate the initial lattice from a seed.
    ///
    /// Each cell is live with probability `1 / density_divisor`, drawn from an
    /// RNG seeded with `seed.rng_seed`. The explicit seed cells are then set
    /// live; cells outside the lattice are ignored.
    pub fn from_seed(seed: &Seed, side: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed.rng_seed);
        let mut lattice = Self::dead(side);

        if seed.density_divisor > 0 {
            for cell in &mut lattice.cells {
                *cell = u32::from(rng.gen_range(0..seed.density_divisor) == 0);
            }
        }

        for &(x, y) in &seed.cells {
            if x < side && y < side {
                lattice.set(x, y, true);
            }
        }

        lattice
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Row-major cell values.
    #[inline]
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Size of the lattice in bytes as stored on the device.
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        (self.cells.len() * std::mem::size_of::<u32>()) as u64
    }

    /// Whether the cell at column `x`, row `y` is live.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.side + x] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, live: bool) {
        self.cells[y * self.side + x] = u32::from(live);
    }

    /// Number of live cells.
    pub fn live_cells(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.side.max(1)) {
            for &cell in row {
                f.write_str(if cell != 0 { "+" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_cells_are_live() {
        let seed = Seed {
            rng_seed: 7,
            density_divisor: 0,
            cells: vec![(4, 4), (4, 5), (4, 6), (5, 6), (5, 7)],
        };
        let lattice = Lattice::from_seed(&seed, 24);

        assert_eq!(lattice.live_cells(), 5);
        assert!(lattice.get(4, 4));
        assert!(lattice.get(5, 7));
        // (x, y) maps to index y * side + x
        assert_eq!(lattice.cells()[7 * 24 + 5], 1);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let seed = Seed::default();
        let a = Lattice::from_seed(&seed, 24);
        let b = Lattice::from_seed(&seed, 24);
        assert_eq!(a, b);

        let other = Seed {
            rng_seed: seed.rng_seed + 1,
            ..seed
        };
        assert_ne!(a, Lattice::from_seed(&other, 24));
    }

    #[test]
    fn test_seed_density_is_roughly_one_in_five() {
        let seed = Seed {
            cells: Vec::new(),
            ..Seed::default()
        };
        let lattice = Lattice::from_seed(&seed, 100);
        let live = lattice.live_cells();

        assert!((1500..2500).contains(&live), "live cells: {}", live);
    }

    #[test]
    fn test_out_of_range_seed_cells_ignored() {
        let seed = Seed {
            rng_seed: 0,
            density_divisor: 0,
            cells: vec![(4, 4), (1, 1)],
        };
        let lattice = Lattice::from_seed(&seed, 3);
        assert_eq!(lattice.live_cells(), 1);
        assert!(lattice.get(1, 1));
    }

    #[test]
    fn test_from_cells_checks_length() {
        assert!(Lattice::from_cells(2, vec![0, 1, 0]).is_none());
        let lattice = Lattice::from_cells(2, vec![0, 1, 1, 0]).unwrap();
        assert_eq!(lattice.to_string(), ".+\n+.\n");
        assert_eq!(lattice.size_bytes(), 16);
    }
}
