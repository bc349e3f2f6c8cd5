use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sycl_core::native::sim::SimRuntime;
use sycl_core::{AccessMode, Buffer, Context, IndexExpr, Program, Queue, Range};

fn setup() -> (Arc<SimRuntime>, Context, Queue) {
    let sim = Arc::new(SimRuntime::new());
    let ctx = Context::new(sim.clone(), &sim.devices()).expect("context");
    let queue = Queue::new(&ctx, sim.devices()[0]).expect("queue");
    (sim, ctx, queue)
}

/// Generate, compile and link one kernel with `n` buffer parameters.
fn bench_build(c: &mut Criterion) {
    let (_sim, ctx, _queue) = setup();
    let mut group = c.benchmark_group("build");

    for n in [1usize, 4, 16] {
        let buffers: Vec<Buffer<f32>> = (0..n)
            .map(|_| Buffer::new(&ctx, Range::new([64])).expect("buffer"))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &buffers, |b, buffers| {
            b.iter(|| {
                let mut program = Program::new(&ctx);
                program
                    .build_with(
                        "touch",
                        |src| {
                            for buf in buffers {
                                let acc = buf.get_access(AccessMode::Write)?;
                                acc.at(src, IndexExpr::global_id(0))?.assign(src, 0);
                            }
                            Ok(())
                        },
                        "",
                    )
                    .expect("build");
                black_box(program)
            })
        });
    }
    group.finish();
}

/// Submit a command group whose kernel is already in the queue's cache.
fn bench_submit_cached(c: &mut Criterion) {
    let (_sim, ctx, queue) = setup();
    let buf = Buffer::<i32>::new(&ctx, Range::new([256])).expect("buffer");
    let record = |queue: &Queue| {
        queue
            .submit(|cgh| {
                cgh.single_task_with("bump", |src| {
                    let acc = buf.get_access(AccessMode::ReadWrite)?;
                    acc.at(src, IndexExpr::global_id(0))?.assign(src, 1);
                    Ok(())
                })
            })
            .expect("submit")
    };
    record(&queue);

    c.bench_function("submit_cached", |b| {
        b.iter(|| {
            black_box(record(&queue));
            queue.wait().expect("wait");
        })
    });
}

criterion_group!(benches, bench_build, bench_submit_cached);
criterion_main!(benches);
