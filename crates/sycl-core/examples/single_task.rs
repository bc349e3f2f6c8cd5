// examples/single_task.rs
//
// Builds a one-work-item kernel from a functor, runs it through a queue and
// prints the generated source plus program info.
// CLI: --n <elements> (default 16), --no-cache

use std::env;
use std::sync::Arc;

use sycl_core::config::{self, RuntimeConfig};
use sycl_core::info;
use sycl_core::native::sim::SimRuntime;
use sycl_core::{
    AccessMode, Buffer, ClError, Context, ExceptionList, KernelFunctor, KernelSource, Program, Queue, Range, Result,
};

#[cfg(feature = "metrics")]
use sycl_core::summary;

struct Scale<'a> {
    data: &'a Buffer<f32>,
    n: usize,
}

impl KernelFunctor for Scale<'_> {
    const NAME: &'static str = "scale";

    fn define(&self, src: &mut KernelSource) -> Result<()> {
        let acc = self.data.get_access(AccessMode::ReadWrite)?;
        for i in 0..self.n {
            let elem = acc.at(src, i)?;
            src.statement(format!("{elem} *= 2.0f;"));
        }
        Ok(())
    }
}

fn parse_args() -> (usize, bool) {
    let mut n = 16;
    let mut cache = true;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--n" => {
                if let Some(v) = args.next().and_then(|s| s.parse().ok()) {
                    n = v;
                }
            }
            "--no-cache" => cache = false,
            other => eprintln!("ignoring unknown argument {other}"),
        }
    }
    (n.max(1), cache)
}

fn main() -> std::result::Result<(), ClError> {
    let (n, cache) = parse_args();

    // 1) settings
    config::init(RuntimeConfig { cache_kernels: cache, ..RuntimeConfig::from_env() });

    // 2) runtime, context, queue
    let sim = Arc::new(SimRuntime::new());
    let ctx = Context::new(sim.clone(), &sim.devices())?.with_async_handler(Arc::new(|errors: ExceptionList| {
        for e in errors {
            eprintln!("async error: {e}");
        }
    }));
    let queue = Queue::new(&ctx, sim.devices()[0])?;

    // 3) host data
    let host: Vec<f32> = (0..n).map(|i| i as f32).collect();
    let data = Buffer::from_slice(&ctx, &host, Range::new([n]))?;

    // 4) explicit build
    let functor = Scale { data: &data, n };
    let mut program = Program::new(&ctx);
    program.build(&functor, "")?;
    let kernel = program.get_kernel::<Scale>();
    if let Some(src) = kernel.source() {
        println!("{}", src.text());
    }
    println!(
        "program: {} kernel(s) {:?}, {} device(s)",
        program.get_info::<info::program::NumKernels>()?,
        program.get_info::<info::program::KernelNames>()?,
        program.get_info::<info::program::NumDevices>()?,
    );

    // 5) run it directly, then twice through submit
    kernel.enqueue_task(&queue)?.wait()?;
    for _ in 0..2 {
        let group = queue.submit(|cgh| cgh.single_task(&functor))?;
        group.wait()?;
    }
    queue.wait_and_throw()?;
    println!("cached kernels on queue: {}", queue.cached_kernels());

    // 6) read back
    let out = data.read(&queue)?;
    println!("scale OK, {} elements, first = {}", out.len(), out[0]);

    // 7) reports
    #[cfg(feature = "metrics")]
    print!("{}", summary());

    Ok(())
}
