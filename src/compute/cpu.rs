//! Host reference device.
//!
//! Runs Conway's B3/S23 rule over host memory with the same buffer and
//! dispatch semantics as the GPU device. Cells outside the lattice count as
//! dead. Work is split into the partition's tiles, one rayon task per band of
//! tile rows.

use rayon::prelude::*;

use super::{ComputeError, Lattice, LatticeDevice, PartitionDescriptor};

/// Handle to a host-resident lattice buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuBuffer {
    id: usize,
    side: usize,
}

impl CpuBuffer {
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }
}

/// One dispatch as seen by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRecord {
    pub source: usize,
    pub destination: usize,
    pub partition: PartitionDescriptor,
}

/// Host reference device.
#[derive(Debug, Default)]
pub struct CpuDevice {
    buffers: Vec<Vec<u32>>,
    dispatches: Vec<DispatchRecord>,
    syncs: usize,
}

impl CpuDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dispatch issued so far, in submission order.
    pub fn dispatches(&self) -> &[DispatchRecord] {
        &self.dispatches
    }

    /// Number of explicit synchronisations requested.
    pub fn syncs(&self) -> usize {
        self.syncs
    }

    fn check_side(buffer: &CpuBuffer, side: usize) -> Result<(), ComputeError> {
        if buffer.side != side {
            return Err(ComputeError::SideMismatch {
                expected: buffer.side,
                actual: side,
            });
        }
        Ok(())
    }
}

impl LatticeDevice for CpuDevice {
    type Buffer = CpuBuffer;

    fn create_buffer(&mut self, side: usize, _label: &str) -> Result<CpuBuffer, ComputeError> {
        self.buffers.push(vec![0; side * side]);
        Ok(CpuBuffer {
            id: self.buffers.len() - 1,
            side,
        })
    }

    fn write_buffer(&mut self, buffer: &CpuBuffer, lattice: &Lattice) -> Result<(), ComputeError> {
        Self::check_side(buffer, lattice.side())?;
        self.buffers[buffer.id].copy_from_slice(lattice.cells());
        Ok(())
    }

    fn dispatch(
        &mut self,
        source: &CpuBuffer,
        destination: &CpuBuffer,
        partition: &PartitionDescriptor,
    ) -> Result<(), ComputeError> {
        let side = source.side;
        Self::check_side(destination, side)?;
        if partition.side as usize != side {
            return Err(ComputeError::PartitionMismatch {
                partition: partition.side,
                store: side,
            });
        }

        let next = step(&self.buffers[source.id], side, partition);
        self.buffers[destination.id] = next;
        self.dispatches.push(DispatchRecord {
            source: source.id,
            destination: destination.id,
            partition: *partition,
        });
        Ok(())
    }

    fn synchronize(&mut self) -> Result<(), ComputeError> {
        self.syncs += 1;
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &CpuBuffer, side: usize) -> Result<Lattice, ComputeError> {
        Self::check_side(buffer, side)?;
        let cells = self.buffers[buffer.id].clone();
        Lattice::from_cells(side, cells).ok_or(ComputeError::SideMismatch {
            expected: side,
            actual: buffer.side,
        })
    }
}

/// One B3/S23 generation, evaluated tile by tile.
fn step(source: &[u32], side: usize, partition: &PartitionDescriptor) -> Vec<u32> {
    let mut next = vec![0u32; side * side];
    let tile = partition.tile() as usize;
    let extent = partition.global_extent as usize;
    if side == 0 {
        return next;
    }

    next.par_chunks_mut(side * tile)
        .enumerate()
        .for_each(|(item_y, band)| {
            for item_x in 0..extent {
                for ty in 0..tile {
                    let y = item_y * tile + ty;
                    for tx in 0..tile {
                        let x = item_x * tile + tx;
                        let live = source[y * side + x] != 0;
                        let n = live_neighbours(source, side, x, y);
                        band[ty * side + x] = u32::from(n == 3 || (live && n == 2));
                    }
                }
            }
        });

    next
}

fn live_neighbours(cells: &[u32], side: usize, x: usize, y: usize) -> u32 {
    let mut count = 0;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= side as i64 || ny >= side as i64 {
                continue;
            }
            count += cells[ny as usize * side + nx as usize];
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::partition;

    fn lattice_with(side: usize, live: &[(usize, usize)]) -> Lattice {
        let mut lattice = Lattice::dead(side);
        for &(x, y) in live {
            lattice.set(x, y, true);
        }
        lattice
    }

    fn run_steps(lattice: &Lattice, level: u8, steps: usize) -> Lattice {
        let side = lattice.side();
        let mut device = CpuDevice::new();
        let a = device.create_buffer(side, "a").unwrap();
        let b = device.create_buffer(side, "b").unwrap();
        device.write_buffer(&a, lattice).unwrap();
        let p = partition(side as u32, level).unwrap();

        let (mut src, mut dst) = (a, b);
        for _ in 0..steps {
            device.dispatch(&src, &dst, &p).unwrap();
            std::mem::swap(&mut src, &mut dst);
        }
        device.read_buffer(&src, side).unwrap()
    }

    #[test]
    fn test_blinker_oscillates() {
        let horizontal = lattice_with(5, &[(1, 2), (2, 2), (3, 2)]);
        let vertical = lattice_with(5, &[(2, 1), (2, 2), (2, 3)]);

        assert_eq!(run_steps(&horizontal, 1, 1), vertical);
        assert_eq!(run_steps(&horizontal, 1, 2), horizontal);
    }

    #[test]
    fn test_block_is_still_life() {
        let block = lattice_with(4, &[(1, 1), (2, 1), (1, 2), (2, 2)]);
        assert_eq!(run_steps(&block, 2, 5), block);
    }

    #[test]
    fn test_partition_does_not_change_result() {
        let seed = crate::schema::Seed::default();
        let initial = Lattice::from_seed(&seed, 24);
        let reference = run_steps(&initial, 1, 8);

        for level in 2..=6 {
            assert_eq!(run_steps(&initial, level, 8), reference, "level {}", level);
        }
    }

    #[test]
    fn test_single_dead_cell_stays_dead() {
        let dead = Lattice::dead(1);
        for level in 1..=6 {
            assert_eq!(run_steps(&dead, level, 17), dead);
        }
    }

    #[test]
    fn test_lone_cell_dies() {
        let lone = lattice_with(1, &[(0, 0)]);
        assert_eq!(run_steps(&lone, 1, 1), Lattice::dead(1));
    }

    #[test]
    fn test_dispatch_records_buffers() {
        let mut device = CpuDevice::new();
        let a = device.create_buffer(4, "a").unwrap();
        let b = device.create_buffer(4, "b").unwrap();
        let p = partition(4, 3).unwrap();

        device.dispatch(&a, &b, &p).unwrap();
        device.dispatch(&b, &a, &p).unwrap();

        let records = device.dispatches();
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].source, records[0].destination), (a.id(), b.id()));
        assert_eq!((records[1].source, records[1].destination), (b.id(), a.id()));
    }

    #[test]
    fn test_dispatch_rejects_foreign_partition() {
        let mut device = CpuDevice::new();
        let a = device.create_buffer(4, "a").unwrap();
        let b = device.create_buffer(4, "b").unwrap();
        let p = partition(8, 1).unwrap();

        assert!(matches!(
            device.dispatch(&a, &b, &p),
            Err(ComputeError::PartitionMismatch { .. })
        ));
    }
}
