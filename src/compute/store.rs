//! Double-buffered grid store.
//!
//! Owns the two device lattices and the role assignment saying which one the
//! next dispatch reads. The host may only read the buffer that was the
//! destination of the last completed tick.

use super::{ComputeError, Lattice, LatticeDevice};

/// One of the two physical buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    A,
    B,
}

impl BufferSlot {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            BufferSlot::A => BufferSlot::B,
            BufferSlot::B => BufferSlot::A,
        }
    }
}

/// Which buffer is the source for the next dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleAssignment {
    /// A is read, B is written.
    #[default]
    ASource,
    /// B is read, A is written.
    BSource,
}

impl RoleAssignment {
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            RoleAssignment::ASource => RoleAssignment::BSource,
            RoleAssignment::BSource => RoleAssignment::ASource,
        }
    }

    #[inline]
    pub fn source(self) -> BufferSlot {
        match self {
            RoleAssignment::ASource => BufferSlot::A,
            RoleAssignment::BSource => BufferSlot::B,
        }
    }

    #[inline]
    pub fn destination(self) -> BufferSlot {
        self.source().other()
    }
}

/// Buffers bound for a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickBinding {
    pub tick: u64,
    pub source: BufferSlot,
    pub destination: BufferSlot,
}

/// Two equally sized device lattices plus their role assignment.
pub struct GridStore<D: LatticeDevice> {
    side: usize,
    buffer_a: D::Buffer,
    buffer_b: D::Buffer,
    roles: RoleAssignment,
    readable: Option<BufferSlot>,
}

impl<D: LatticeDevice> GridStore<D> {
    /// Allocate both buffers on `device`.
    pub fn new(device: &mut D, side: usize) -> Result<Self, ComputeError> {
        let buffer_a = device.create_buffer(side, "Generation A")?;
        let buffer_b = device.create_buffer(side, "Generation B")?;
        Ok(Self {
            side,
            buffer_a,
            buffer_b,
            roles: RoleAssignment::default(),
            readable: None,
        })
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn roles(&self) -> RoleAssignment {
        self.roles
    }

    /// Write the initial generation into buffer A and reset roles so the next
    /// tick reads it.
    pub fn upload(&mut self, device: &mut D, lattice: &Lattice) -> Result<(), ComputeError> {
        if lattice.side() != self.side {
            return Err(ComputeError::SideMismatch {
                expected: self.side,
                actual: lattice.side(),
            });
        }
        device.write_buffer(&self.buffer_a, lattice)?;
        self.roles = RoleAssignment::ASource;
        self.readable = None;
        log::debug!(
            "Uploaded {}x{} lattice ({} live)",
            self.side,
            self.side,
            lattice.live_cells()
        );
        Ok(())
    }

    /// Bindings for `tick`, taken from the current role assignment. Starting
    /// from an upload, even dispatches read A and write B and odd dispatches
    /// read B and write A. A cancelled tick still flips the roles, so after a
    /// cancel the roles follow the dispatch count rather than `tick`.
    pub fn bind_for_tick(&self, tick: u64) -> TickBinding {
        TickBinding {
            tick,
            source: self.roles.source(),
            destination: self.roles.destination(),
        }
    }

    /// Record that the dispatch for `binding` has been issued: its destination
    /// becomes the readable generation and roles flip for the next tick.
    pub fn complete_tick(&mut self, binding: TickBinding) {
        self.readable = Some(binding.destination);
        self.roles = self.roles.toggled();
    }

    /// Buffer holding the most recently completed generation, if any tick has
    /// completed since the last upload.
    #[inline]
    pub fn current_readable(&self) -> Option<BufferSlot> {
        self.readable
    }

    /// Device buffer for a slot.
    #[inline]
    pub fn buffer(&self, slot: BufferSlot) -> &D::Buffer {
        match slot {
            BufferSlot::A => &self.buffer_a,
            BufferSlot::B => &self.buffer_b,
        }
    }
}
