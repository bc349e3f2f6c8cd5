//! Touches the process-wide settings, so everything runs in one test.

use std::sync::Arc;

use sycl_core::config::{self, RuntimeConfig};
use sycl_core::native::sim::{SimOp, SimRuntime};
use sycl_core::{Context, Queue};

fn submit_twice(queue: &Queue) {
    for _ in 0..2 {
        queue
            .submit(|cgh| {
                cgh.single_task_with("tick", |src| {
                    src.statement("return;");
                    Ok(())
                })
            })
            .unwrap();
    }
}

#[test]
fn settings_apply_until_reset() {
    assert_eq!(config::current(), RuntimeConfig::default());

    let sim = Arc::new(SimRuntime::new());
    let ctx = Context::new(sim.clone(), &sim.devices()).unwrap();
    let queue = Queue::new(&ctx, sim.devices()[0]).unwrap();

    config::init(RuntimeConfig::from_lookup(|key| match key {
        "SYCL_KERNEL_CACHE" => Some("0".into()),
        "SYCL_LINK_OPTIONS" => Some("-cl-kernel-arg-info".into()),
        _ => None,
    }));
    submit_twice(&queue);
    assert_eq!(sim.calls(SimOp::Compile), 2);
    assert_eq!(queue.cached_kernels(), 0);

    config::reset();
    assert!(config::current().cache_kernels);
    sim.reset_calls();
    submit_twice(&queue);
    assert_eq!(sim.calls(SimOp::Compile), 1);
    assert_eq!(queue.cached_kernels(), 1);
}
