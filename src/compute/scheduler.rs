//! Tick scheduler - drives dispatches against the grid store.
//!
//! Each tick dispatches the transition kernel, flips buffer roles and, in
//! interactive mode only, waits for the device, reads the new generation back,
//! polls for cancellation and hands the frame to a [`FrameSink`]. Headless
//! runs enqueue dispatches back to back and rely on the device queue for
//! ordering.

use std::thread;
use std::time::{Duration, Instant};

use super::{ComputeError, GridStore, Lattice, LatticeDevice, PartitionDescriptor};
use crate::render::FrameSink;

/// How the loop is driven and when it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Render every generation; runs until the sink reports a quit request.
    Interactive { frame_delay: Duration },
    /// No readback or rendering; runs exactly `tick_final + 1` ticks.
    Headless { tick_final: u64 },
}

impl RunMode {
    /// Whether the loop must stop before executing `tick`.
    #[inline]
    pub fn horizon_reached(&self, tick: u64) -> bool {
        match *self {
            RunMode::Interactive { .. } => false,
            RunMode::Headless { tick_final } => tick > tick_final,
        }
    }

    #[inline]
    pub fn is_interactive(&self) -> bool {
        matches!(self, RunMode::Interactive { .. })
    }
}

/// Scheduler state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Dispatching,
    RoleSwapped,
    Syncing,
    Reading,
    Rendered,
    Stopped,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The frame sink reported a quit request.
    Cancelled,
    /// A headless run reached its tick horizon.
    HorizonReached,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Value of the tick counter when the loop stopped.
    pub ticks: u64,
    /// Dispatches issued during the run.
    pub dispatches: u64,
    pub elapsed: Duration,
    pub stop: StopReason,
}

impl RunSummary {
    /// Dispatch throughput over the run.
    pub fn dispatches_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.dispatches as f64 / secs
        } else {
            0.0
        }
    }
}

/// Single-threaded host loop owning the device, the grid store and the
/// partition.
pub struct TickScheduler<D: LatticeDevice> {
    device: D,
    store: GridStore<D>,
    partition: PartitionDescriptor,
    mode: RunMode,
    tick: u64,
    dispatches: u64,
    state: SchedulerState,
    last_frame: Option<Lattice>,
}

impl<D: LatticeDevice> TickScheduler<D> {
    /// Allocate the buffer pair on `device` and upload `initial` into A.
    pub fn new(
        mut device: D,
        initial: &Lattice,
        partition: PartitionDescriptor,
        mode: RunMode,
    ) -> Result<Self, ComputeError> {
        let side = initial.side();
        if partition.side as usize != side {
            return Err(ComputeError::PartitionMismatch {
                partition: partition.side,
                store: side,
            });
        }

        let mut store = GridStore::new(&mut device, side)?;
        store.upload(&mut device, initial)?;

        Ok(Self {
            device,
            store,
            partition,
            mode,
            tick: 0,
            dispatches: 0,
            state: SchedulerState::Idle,
            last_frame: None,
        })
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }

    #[inline]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    #[inline]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    #[inline]
    pub fn partition(&self) -> &PartitionDescriptor {
        &self.partition
    }

    #[inline]
    pub fn store(&self) -> &GridStore<D> {
        &self.store
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Last generation read back in interactive mode.
    #[inline]
    pub fn last_frame(&self) -> Option<&Lattice> {
        self.last_frame.as_ref()
    }

    /// Run until the mode's termination condition holds.
    ///
    /// A device or renderer failure stops the loop and is returned as is.
    pub fn run<S: FrameSink>(&mut self, sink: &mut S) -> Result<RunSummary, ComputeError> {
        log::info!(
            "Starting {} run: {}x{} lattice, global {}, group {}",
            if self.mode.is_interactive() {
                "interactive"
            } else {
                "headless"
            },
            self.store.side(),
            self.store.side(),
            self.partition.global_extent,
            self.partition.group_extent
        );

        let start = Instant::now();
        let dispatches_before = self.dispatches;
        let outcome = self.drive(sink);
        self.state = SchedulerState::Stopped;
        let stop = outcome?;

        let summary = RunSummary {
            ticks: self.tick,
            dispatches: self.dispatches - dispatches_before,
            elapsed: start.elapsed(),
            stop,
        };
        log::info!(
            "Run stopped ({:?}) after {} ticks, {:.1} dispatches/s",
            summary.stop,
            summary.ticks,
            summary.dispatches_per_second()
        );
        Ok(summary)
    }

    fn drive<S: FrameSink>(&mut self, sink: &mut S) -> Result<StopReason, ComputeError> {
        loop {
            if self.mode.horizon_reached(self.tick) {
                // Drain the queue so late device errors surface here.
                self.device.synchronize()?;
                return Ok(StopReason::HorizonReached);
            }
            if let Some(reason) = self.step(sink)? {
                return Ok(reason);
            }
        }
    }

    /// Execute one tick. Returns the stop reason if the sink asked to quit.
    pub fn step<S: FrameSink>(&mut self, sink: &mut S) -> Result<Option<StopReason>, ComputeError> {
        self.transition(SchedulerState::Dispatching);
        let binding = self.store.bind_for_tick(self.tick);
        self.device.dispatch(
            self.store.buffer(binding.source),
            self.store.buffer(binding.destination),
            &self.partition,
        )?;
        self.dispatches += 1;

        self.store.complete_tick(binding);
        self.transition(SchedulerState::RoleSwapped);

        if let RunMode::Interactive { frame_delay } = self.mode {
            self.transition(SchedulerState::Syncing);
            self.device.synchronize()?;

            self.transition(SchedulerState::Reading);
            let readable = self
                .store
                .current_readable()
                .ok_or(ComputeError::NothingReadable)?;
            let frame = self
                .device
                .read_buffer(self.store.buffer(readable), self.store.side())?;

            if sink.quit_requested()? {
                self.last_frame = Some(frame);
                return Ok(Some(StopReason::Cancelled));
            }

            sink.draw(&frame, self.tick)?;
            self.last_frame = Some(frame);
            self.transition(SchedulerState::Rendered);

            if !frame_delay.is_zero() {
                thread::sleep(frame_delay);
            }
        }

        self.tick += 1;
        Ok(None)
    }

    /// Wait for the device and read the current generation. Before the first
    /// tick this is the uploaded initial generation.
    pub fn snapshot(&mut self) -> Result<Lattice, ComputeError> {
        self.device.synchronize()?;
        let slot = self
            .store
            .current_readable()
            .unwrap_or(self.store.roles().source());
        self.device
            .read_buffer(self.store.buffer(slot), self.store.side())
    }

    fn transition(&mut self, next: SchedulerState) {
        log::trace!("tick {}: {:?} -> {:?}", self.tick, self.state, next);
        self.state = next;
    }
}
