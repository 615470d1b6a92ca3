//! Compute module - lattice storage, partitioning and the tick loop.

mod cpu;
mod device;
mod lattice;
mod partition;
mod scheduler;
mod store;

pub mod gpu;

pub use cpu::*;
pub use device::*;
pub use lattice::*;
pub use partition::*;
pub use scheduler::*;
pub use store::*;
