//! Work partitioning - maps a concurrency level to a dispatch shape.

/// Lowest accepted concurrency level.
pub const MIN_CONCURRENCY: u8 = 1;
/// Highest accepted concurrency level.
pub const MAX_CONCURRENCY: u8 = 6;
/// Upper bound on the workgroup edge so `group * group` stays within the
/// default device limit of 256 invocations per workgroup.
pub const MAX_GROUP_EXTENT: u32 = 8;

/// Lattice-side denominators indexed by `level - 1`. For a side of 24 these
/// select global extents 24, 12, 8, 4, 2, 1.
const DENOMINATORS: [u32; 6] = [1, 2, 3, 6, 12, 24];

/// Square dispatch shape: global and group extent, equal in x and y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionDescriptor {
    /// Lattice side length the shape was derived for.
    pub side: u32,
    /// Work items per dimension.
    pub global_extent: u32,
    /// Work items per workgroup per dimension.
    pub group_extent: u32,
}

impl PartitionDescriptor {
    /// Workgroups to dispatch per dimension.
    #[inline]
    pub fn workgroups(&self) -> u32 {
        self.global_extent / self.group_extent
    }

    /// Cells per work item per dimension.
    #[inline]
    pub fn tile(&self) -> u32 {
        self.side / self.global_extent
    }
}

/// Partitioning errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    #[error("Concurrency level {level} is outside [1, 6]")]
    LevelOutOfRange { level: u8 },

    #[error("Lattice side must be non-zero")]
    EmptyLattice,
}

/// Compute the dispatch shape for `level` on a lattice of side `side`.
///
/// The global extent is the largest divisor of `side` not exceeding
/// `side / denominator` (at least 1). The group extent is the largest divisor
/// of the global extent not exceeding [`MAX_GROUP_EXTENT`], so it always tiles
/// the global extent and never exceeds it.
pub fn partition(side: u32, level: u8) -> Result<PartitionDescriptor, PartitionError> {
    if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&level) {
        return Err(PartitionError::LevelOutOfRange { level });
    }
    if side == 0 {
        return Err(PartitionError::EmptyLattice);
    }

    let denominator = DENOMINATORS[usize::from(level - 1)];
    let global_extent = largest_divisor_at_most(side, side / denominator);
    let group_extent = largest_divisor_at_most(global_extent, MAX_GROUP_EXTENT);

    let descriptor = PartitionDescriptor {
        side,
        global_extent,
        group_extent,
    };
    log::debug!(
        "Partition level {}: global {}x{}, group {}x{}, tile {}",
        level,
        global_extent,
        global_extent,
        group_extent,
        group_extent,
        descriptor.tile()
    );
    Ok(descriptor)
}

/// Largest `d` with `d | n` and `d <= limit`, or 1 when `limit < 1`.
fn largest_divisor_at_most(n: u32, limit: u32) -> u32 {
    (1..=limit.min(n)).rev().find(|d| n % d == 0).unwrap_or(1)
}
