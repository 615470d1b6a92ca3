//! Lattice Life - double-buffered Game of Life on a GPU compute device.
//!
//! The host owns the device, two lattice buffers and a tick loop. Each tick
//! dispatches an external WGSL transition kernel from one buffer into the
//! other and swaps their roles. Interactive runs read every generation back
//! and draw it in the terminal; headless runs only enqueue dispatches.
//!
//! # Architecture
//!
//! - `schema`: Run configuration and seeding
//! - `compute`: Lattice, partitioner, grid store, tick scheduler and devices
//! - `render`: Frame sinks for interactive runs
//!
//! # Example
//!
//! ```rust
//! use lattice_life::{
//!     compute::{CpuDevice, Lattice, RunMode, TickScheduler, partition},
//!     render::NullSink,
//!     schema::Seed,
//! };
//!
//! let initial = Lattice::from_seed(&Seed::default(), 24);
//! let shape = partition(24, 3).unwrap();
//! let mut scheduler = TickScheduler::new(
//!     CpuDevice::new(),
//!     &initial,
//!     shape,
//!     RunMode::Headless { tick_final: 99 },
//! )
//! .unwrap();
//!
//! let summary = scheduler.run(&mut NullSink).unwrap();
//! assert_eq!(summary.dispatches, 100);
//! ```

pub mod compute;
pub mod render;
pub mod schema;

// Re-export commonly used types
pub use compute::{Lattice, RunMode, RunSummary, TickScheduler};
pub use schema::{RunConfig, Seed};

/// Any error that ends a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] schema::ConfigError),

    #[error(transparent)]
    Gpu(#[from] compute::gpu::GpuError),

    #[error(transparent)]
    Compute(#[from] compute::ComputeError),

    #[error(transparent)]
    Partition(#[from] compute::PartitionError),

    #[error("Couldn't initialise terminal: {0}")]
    Terminal(#[from] std::io::Error),
}
