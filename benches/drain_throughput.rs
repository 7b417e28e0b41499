use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use rillflow::{Emit, Scheduler, Stream, map_element};

const BATCH_SIZES: &[usize] = &[64, 256, 1024];

async fn drain_batch(batch: usize) {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    let y: Stream<i64> = Stream::new("y");
    let z: Stream<i64> = Stream::new("z");
    map_element(&sched, |v| Emit::one(v + 1), &x, &y);
    map_element(
        &sched,
        |v| if v % 2 == 0 { Emit::suppress() } else { Emit::one(v) },
        &y,
        &z,
    );

    x.extend(0..batch as i64);
    sched.run().await.expect("drain");
}

fn drain_throughput(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("scheduler_drain");

    for &batch in BATCH_SIZES {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &size| {
            b.to_async(&runtime).iter(|| drain_batch(size));
        });
    }

    group.finish();
}

criterion_group!(benches, drain_throughput);
criterion_main!(benches);
