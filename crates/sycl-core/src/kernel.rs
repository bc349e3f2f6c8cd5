//! Native kernels and their enqueue path.

use std::sync::{Arc, Mutex};
#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::buffer::{Buffer, Element};
use crate::error::{Result, check};
use crate::event::Event;
use crate::info::{self, KernelParam};
use crate::kernel_source::{ArgBinding, KernelSource};
use crate::native::{NativeApi, RawHandle};
use crate::queue::Queue;
use crate::refc::{EventKind, KernelKind, Refc};

/// A native kernel, optionally paired with the generated source it was built
/// from. With a source, every enqueue binds the source's resources first.
///
/// Native arguments live on the native kernel, so clones serialise their
/// bind-and-enqueue on a shared lock. Wrappers made separately with
/// [`from_raw`](Self::from_raw) over one native kernel do not share it.
#[derive(Debug, Clone)]
pub struct Kernel {
    handle: Refc<KernelKind>,
    name: String,
    /// Non-owning; the native kernel keeps its program and context alive.
    context: RawHandle,
    program: RawHandle,
    source: Option<Arc<KernelSource>>,
    launch: Arc<Mutex<()>>,
}

impl Kernel {
    /// Wraps an existing native kernel, taking a reference of its own.
    pub fn from_raw(api: Arc<dyn NativeApi>, raw: RawHandle) -> Result<Self> {
        Self::introspect(Refc::retain(api, raw)?, None)
    }

    /// Takes over a kernel fresh from a native create call.
    pub(crate) fn adopt(api: Arc<dyn NativeApi>, raw: RawHandle, source: Option<Arc<KernelSource>>) -> Result<Self> {
        Self::introspect(Refc::adopt(api, raw), source)
    }

    fn introspect(handle: Refc<KernelKind>, source: Option<Arc<KernelSource>>) -> Result<Self> {
        let api = handle.api().as_ref();
        let raw = handle.get();
        let name = check(info::kernel::FunctionName::query(api, raw), None)?;
        let context = check(info::kernel::Context::query(api, raw), None)?;
        let program = check(info::kernel::Program::query(api, raw), Some(context))?;
        Ok(Kernel { handle, name, context, program, source, launch: Arc::default() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<&KernelSource> {
        self.source.as_deref()
    }

    #[inline]
    pub fn raw(&self) -> RawHandle {
        self.handle.get()
    }

    pub fn api(&self) -> &Arc<dyn NativeApi> {
        self.handle.api()
    }

    pub fn context(&self) -> RawHandle {
        self.context
    }

    pub fn program(&self) -> RawHandle {
        self.program
    }

    pub fn get_info<P: KernelParam>(&self) -> Result<P::Output> {
        check(P::query(self.api().as_ref(), self.raw()), Some(self.context))
    }

    /// Same native kernel, with no source attached.
    pub(crate) fn without_source(&self) -> Kernel {
        self.with_source(None)
    }

    pub(crate) fn with_source(&self, source: Option<Arc<KernelSource>>) -> Kernel {
        Kernel {
            handle: self.handle.clone(),
            name: self.name.clone(),
            context: self.context,
            program: self.program,
            source,
            launch: Arc::clone(&self.launch),
        }
    }

    pub fn set_arg_buffer<T: Element, const D: usize>(&self, index: u32, buffer: &Buffer<T, D>) -> Result<()> {
        check(self.api().set_kernel_arg_mem(self.raw(), index, buffer.mem()), Some(self.context))
    }

    /// Reserves `bytes` of local memory for argument `index`.
    pub fn set_arg_local(&self, index: u32, bytes: usize) -> Result<()> {
        check(self.api().set_kernel_arg_local(self.raw(), index, bytes), Some(self.context))
    }

    fn bind(&self, source: &KernelSource) -> Result<()> {
        for (index, binding) in source.bindings() {
            let status = match binding {
                ArgBinding::Mem(mem) => self.api().set_kernel_arg_mem(self.raw(), index, mem.get()),
                ArgBinding::Local { bytes } => self.api().set_kernel_arg_local(self.raw(), index, *bytes),
            };
            check(status, Some(self.context))?;
        }
        Ok(())
    }

    /// Runs the kernel as a single work-item on `queue`.
    ///
    /// The native dependency list is always empty; a non-success status is
    /// returned as is, nothing is retried.
    pub fn enqueue_task(&self, queue: &Queue) -> Result<Event> {
        let _launch = self.launch.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(source) = &self.source {
            self.bind(source)?;
        }
        #[cfg(feature = "metrics")]
        let start = Instant::now();
        let raw = check(self.api().enqueue_task(queue.raw(), self.raw()), Some(self.context))?;
        #[cfg(feature = "metrics")]
        {
            crate::metrics::record("enqueue_task", start);
            crate::metrics::ENQUEUES.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        log::trace!("enqueued `{}` on {:?} -> event {raw:?}", self.name, queue.raw());
        let event = Event::from_refc(Refc::<EventKind>::adopt(self.api().clone(), raw));
        queue.track(event.clone());
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::event::ExecStatus;
    use crate::native::sim::{SimArg, SimRuntime};
    use crate::native::status;
    use crate::range::Range;

    const SRC: &str = "__kernel void fill(__global int* out, __local int* tmp) {\n}\n";

    fn setup() -> (Arc<SimRuntime>, Context, Queue, RawHandle) {
        let sim = Arc::new(SimRuntime::new());
        let ctx = Context::new(sim.clone(), &sim.devices()).unwrap();
        let queue = Queue::new(&ctx, sim.devices()[0]).unwrap();
        let prog = sim.create_program_with_source(ctx.raw(), SRC).unwrap();
        sim.compile_program(prog, &[], "").unwrap();
        let exe = sim.link_program(ctx.raw(), &[], "", &[prog]).unwrap();
        sim.release(crate::native::ObjectKind::Program, prog).unwrap();
        let raw = sim.create_kernel(exe, "fill").unwrap();
        sim.release(crate::native::ObjectKind::Program, exe).unwrap();
        (sim, ctx, queue, raw)
    }

    #[test]
    fn from_raw_introspects_and_retains() {
        let (sim, ctx, _queue, raw) = setup();
        let kernel = Kernel::from_raw(sim.clone(), raw).unwrap();
        assert_eq!(kernel.name(), "fill");
        assert_eq!(kernel.context(), ctx.raw());
        assert_eq!(sim.refcount(raw), Some(2));
        assert_eq!(kernel.get_info::<info::kernel::NumArgs>().unwrap(), 2);
        drop(kernel);
        assert_eq!(sim.refcount(raw), Some(1));
    }

    #[test]
    fn missing_arguments_fail_the_enqueue() {
        let (sim, ctx, queue, raw) = setup();
        let kernel = Kernel::adopt(sim.clone(), raw, None).unwrap();
        let buf = Buffer::<i32>::new(&ctx, Range::new([4])).unwrap();
        kernel.set_arg_buffer(0, &buf).unwrap();
        let err = kernel.enqueue_task(&queue).unwrap_err();
        assert_eq!(err.status(), Some(status::INVALID_KERNEL_ARGS));

        kernel.set_arg_local(1, 64).unwrap();
        let event = kernel.enqueue_task(&queue).unwrap();
        assert_eq!(event.status(), Ok(ExecStatus::Complete));
        assert_eq!(sim.kernel_arg(raw, 0), Some(SimArg::Mem(buf.mem())));
        assert_eq!(sim.kernel_arg(raw, 1), Some(SimArg::Local(64)));
    }

    #[test]
    fn dropping_the_last_kernel_releases_the_program() {
        let (sim, _ctx, _queue, raw) = setup();
        let kernel = Kernel::adopt(sim.clone(), raw, None).unwrap();
        let program = kernel.program();
        assert!(sim.is_live(program));
        drop(kernel);
        assert!(!sim.is_live(raw));
        assert!(!sim.is_live(program));
    }
}
