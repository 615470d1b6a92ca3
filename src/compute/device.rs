//! Device abstraction the grid store and scheduler drive.

use super::{Lattice, PartitionDescriptor, PartitionError};

/// Errors raised while storing, dispatching or reading generations.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Device operation failed: {0}")]
    Device(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Lattice side {actual} does not match store side {expected}")]
    SideMismatch { expected: usize, actual: usize },

    #[error("Partition was derived for side {partition}, store side is {store}")]
    PartitionMismatch { partition: u32, store: usize },

    #[error("No generation has been completed yet")]
    NothingReadable,

    #[error("Renderer failed: {0}")]
    Render(#[from] std::io::Error),

    #[error(transparent)]
    Partition(#[from] PartitionError),
}

/// A compute device holding lattice buffers and executing the transition
/// kernel over them.
///
/// Submission order is execution order: a dispatch reading a buffer observes
/// every earlier write to it without the host calling [`synchronize`].
///
/// [`synchronize`]: LatticeDevice::synchronize
pub trait LatticeDevice {
    /// Device-resident lattice buffer.
    type Buffer;

    /// Allocate an uninitialised buffer for a lattice of side `side`.
    fn create_buffer(&mut self, side: usize, label: &str) -> Result<Self::Buffer, ComputeError>;

    /// Copy a host lattice into `buffer`.
    fn write_buffer(&mut self, buffer: &Self::Buffer, lattice: &Lattice)
    -> Result<(), ComputeError>;

    /// Enqueue one transition from `source` into `destination` over `partition`.
    fn dispatch(
        &mut self,
        source: &Self::Buffer,
        destination: &Self::Buffer,
        partition: &PartitionDescriptor,
    ) -> Result<(), ComputeError>;

    /// Block until every enqueued operation has finished.
    fn synchronize(&mut self) -> Result<(), ComputeError>;

    /// Copy `buffer` back into host memory. Waits for pending work on it.
    fn read_buffer(&mut self, buffer: &Self::Buffer, side: usize) -> Result<Lattice, ComputeError>;
}
