//! Benchmarks for headless tick throughput on the host reference device.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use lattice_life::{
    compute::{CpuDevice, Lattice, RunMode, TickScheduler, partition},
    render::NullSink,
    schema::Seed,
};

fn bench_headless_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("headless_run");

    for side in [24, 96, 384] {
        let initial = Lattice::from_seed(&Seed::default(), side);
        let shape = partition(side as u32, 3).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", side, side)),
            &side,
            |b, _| {
                b.iter(|| {
                    let mut scheduler = TickScheduler::new(
                        CpuDevice::new(),
                        &initial,
                        shape,
                        RunMode::Headless { tick_final: 99 },
                    )
                    .unwrap();
                    scheduler.run(&mut NullSink).unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_concurrency_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrency_level");
    let side = 96;
    let initial = Lattice::from_seed(&Seed::default(), side);

    for level in 1..=6u8 {
        let shape = partition(side as u32, level).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, _| {
            b.iter(|| {
                let mut scheduler = TickScheduler::new(
                    CpuDevice::new(),
                    &initial,
                    shape,
                    RunMode::Headless { tick_final: 49 },
                )
                .unwrap();
                scheduler.run(&mut NullSink).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_headless_run, bench_concurrency_levels);
criterion_main!(benches);
