//! Presentation sinks for interactive runs.

mod terminal;

pub use terminal::TerminalRenderer;

use std::io;

use crate::compute::Lattice;

/// Receives completed generations and reports whether the user asked to quit.
pub trait FrameSink {
    /// Non-blocking check for a quit request.
    fn quit_requested(&mut self) -> io::Result<bool>;

    /// Draw one generation.
    fn draw(&mut self, lattice: &Lattice, tick: u64) -> io::Result<()>;
}

/// Sink that never draws and never quits. Used for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn quit_requested(&mut self) -> io::Result<bool> {
        Ok(false)
    }

    fn draw(&mut self, _lattice: &Lattice, _tick: u64) -> io::Result<()> {
        Ok(())
    }
}
