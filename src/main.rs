//! Lattice Life CLI - run the simulation interactively or headless.

use std::path::PathBuf;

use clap::Parser;

use lattice_life::{
    Error,
    compute::{
        CpuDevice, Lattice, LatticeDevice, MAX_CONCURRENCY, MIN_CONCURRENCY, PartitionDescriptor,
        RunMode, RunSummary, StopReason, TickScheduler,
        gpu::{CompiledProgram, GpuDevice, resolve_device},
        partition,
    },
    render::{NullSink, TerminalRenderer},
    schema::RunConfig,
};

#[derive(clap::Parser, Debug)]
#[command(name = "lattice-life")]
#[command(about = "Game of Life on a GPU compute device")]
struct Args {
    /// Disable rendering and run headless for tick_final + 1 ticks.
    #[arg(short = 'o')]
    headless: bool,

    /// Concurrency level on [1,6]. Higher levels dispatch fewer work items.
    #[arg(short = 'n', allow_negative_numbers = true)]
    concurrency: Option<i64>,

    /// Last tick of a headless run.
    #[arg(short = 't', long = "ticks")]
    tick_final: Option<u64>,

    /// WGSL transition kernel.
    #[arg(short, long)]
    kernel: Option<PathBuf>,

    /// Kernel entry point.
    #[arg(short, long)]
    entry: Option<String>,

    /// Lattice side length.
    #[arg(short, long)]
    side: Option<usize>,

    /// RNG seed for the initial lattice.
    #[arg(long)]
    seed: Option<u64>,

    /// Delay between rendered frames in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// JSON configuration file. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print an example configuration and exit.
    #[arg(long)]
    example: bool,

    /// Run on the host reference device instead of a GPU.
    #[arg(long)]
    cpu: bool,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if args.example {
        print_example_config();
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let config = load_config(args)?;
    config.validate()?;

    let initial = Lattice::from_seed(&config.seed, config.side);
    let shape = partition(config.side as u32, config.concurrency)?;
    let mode = config.run_mode();

    let (summary, last) = if args.cpu {
        execute(CpuDevice::new(), &initial, shape, mode)?
    } else {
        let resolved = pollster::block_on(resolve_device())?;
        let program = CompiledProgram::build(&resolved, &config.kernel_path, &config.entry_point)?;
        execute(GpuDevice::new(resolved, program), &initial, shape, mode)?
    };

    println!("Lattice Life");
    println!("============");
    println!("Grid: {}x{}", config.side, config.side);
    println!(
        "Partition: global {}x{}, group {}x{}",
        shape.global_extent, shape.global_extent, shape.group_extent, shape.group_extent
    );
    println!(
        "Stopped: {}",
        match summary.stop {
            StopReason::Cancelled => "cancelled",
            StopReason::HorizonReached => "tick horizon reached",
        }
    );
    println!("Ticks: {}", summary.ticks);
    println!(
        "Time: {:.2}s ({:.1} dispatches/s)",
        summary.elapsed.as_secs_f32(),
        summary.dispatches_per_second()
    );
    println!(
        "Live cells: {} -> {}",
        initial.live_cells(),
        last.live_cells()
    );
    Ok(())
}

fn execute<D: LatticeDevice>(
    device: D,
    initial: &Lattice,
    shape: PartitionDescriptor,
    mode: RunMode,
) -> Result<(RunSummary, Lattice), Error> {
    let mut scheduler = TickScheduler::new(device, initial, shape, mode)?;

    let summary = match mode {
        RunMode::Interactive { .. } => {
            let mut renderer = TerminalRenderer::new()?;
            scheduler.run(&mut renderer)?
        }
        RunMode::Headless { .. } => scheduler.run(&mut NullSink)?,
    };

    let last = match scheduler.last_frame() {
        Some(frame) => frame.clone(),
        None => scheduler.snapshot()?,
    };
    Ok((summary, last))
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(args: &Args) -> Result<RunConfig, Error> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };

    if args.headless {
        config.render = false;
    }
    if let Some(level) = args.concurrency {
        match concurrency_level(level) {
            Some(level) => config.concurrency = level,
            None => log::warn!(
                "Kernel count must be on [1,6], got {}; using {}",
                level,
                config.concurrency
            ),
        }
    }
    if let Some(tick_final) = args.tick_final {
        config.tick_final = tick_final;
    }
    if let Some(kernel) = &args.kernel {
        config.kernel_path = kernel.clone();
    }
    if let Some(entry) = &args.entry {
        config.entry_point = entry.clone();
    }
    if let Some(side) = args.side {
        config.side = side;
    }
    if let Some(seed) = args.seed {
        config.seed.rng_seed = seed;
    }
    if let Some(delay) = args.delay_ms {
        config.frame_delay_ms = delay;
    }

    Ok(config)
}

/// Command-line concurrency level, if it is on [1,6].
fn concurrency_level(level: i64) -> Option<u8> {
    u8::try_from(level)
        .ok()
        .filter(|level| (MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(level))
}

fn print_example_config() {
    let config = RunConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serialising config: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_level_range() {
        assert_eq!(concurrency_level(1), Some(1));
        assert_eq!(concurrency_level(6), Some(6));
        assert_eq!(concurrency_level(0), None);
        assert_eq!(concurrency_level(7), None);
        assert_eq!(concurrency_level(-3), None);
        assert_eq!(concurrency_level(262), None);
    }

    #[test]
    fn test_out_of_range_flag_keeps_configured_level() {
        let args = Args::parse_from(["lattice-life", "-o", "-n", "-1"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.concurrency, RunConfig::default().concurrency);
        assert!(!config.render);

        let args = Args::parse_from(["lattice-life", "-n", "5", "-t", "9"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.tick_final, 9);
    }
}
