//! Command queues.
//!
//! A queue owns the native command queue, the events of everything enqueued
//! through it, the asynchronous errors collected from those events, and a
//! cache of kernels built by earlier command groups.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::command_group::{CommandGroup, Handler, ScopeGuard};
use crate::config;
use crate::context::Context;
use crate::error::{AsyncHandler, ExceptionList, Result, check, raise, report_async};
use crate::event::{Event, ExecStatus};
use crate::kernel::Kernel;
use crate::kernel_source::KernelSource;
use crate::native::{DeviceId, NativeApi, RawHandle};
use crate::program::Program;
use crate::refc::{QueueKind, Refc};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

struct QueueInner {
    context: Context,
    handle: Refc<QueueKind>,
    device: DeviceId,
    handler: Option<AsyncHandler>,
    pending: Mutex<Vec<Event>>,
    exceptions: Mutex<ExceptionList>,
    /// Keyed by generated source text with parameters renamed by position.
    kernels: Mutex<HashMap<String, Kernel>>,
}

/// Clones share one native queue and its pending state.
#[derive(Clone)]
pub struct Queue(Arc<QueueInner>);

impl Queue {
    /// Queue on `device`; asynchronous errors go to the context's handler, if any.
    pub fn new(context: &Context, device: DeviceId) -> Result<Self> {
        Self::create(context, device, None)
    }

    /// Queue whose asynchronous errors go to `handler`.
    pub fn with_handler(context: &Context, device: DeviceId, handler: AsyncHandler) -> Result<Self> {
        Self::create(context, device, Some(handler))
    }

    fn create(context: &Context, device: DeviceId, handler: Option<AsyncHandler>) -> Result<Self> {
        let raw = check(context.api().create_queue(context.raw(), device), Some(context.raw()))?;
        log::debug!("created queue {raw:?} on {device:?}");
        Ok(Queue(Arc::new(QueueInner {
            context: context.clone(),
            handle: Refc::adopt(context.api().clone(), raw),
            device,
            handler,
            pending: Mutex::new(Vec::new()),
            exceptions: Mutex::new(ExceptionList::new()),
            kernels: Mutex::new(HashMap::new()),
        })))
    }

    #[inline]
    pub fn raw(&self) -> RawHandle {
        self.0.handle.get()
    }

    #[inline]
    pub fn api(&self) -> &Arc<dyn NativeApi> {
        self.0.handle.api()
    }

    pub fn context(&self) -> &Context {
        &self.0.context
    }

    pub fn device(&self) -> DeviceId {
        self.0.device
    }

    /// Records a command group with `record`, then enqueues its kernels in order.
    ///
    /// Nothing is enqueued when `record` fails. Several threads may submit to
    /// one queue; cached kernels bind and enqueue one launch at a time.
    pub fn submit<F>(&self, record: F) -> Result<CommandGroup>
    where
        F: FnOnce(&mut Handler<'_>) -> Result<()>,
    {
        let recorded = {
            let _scope = ScopeGuard::enter();
            let mut cgh = Handler::new(self);
            record(&mut cgh)?;
            cgh.into_recorded()
        };
        let events = recorded
            .iter()
            .map(|kernel| kernel.enqueue_task(self))
            .collect::<Result<Vec<_>>>()?;
        Ok(CommandGroup::new(events))
    }

    /// Built kernel for `source`, reusing an earlier build of the same text.
    pub(crate) fn kernel_for(&self, source: KernelSource) -> Result<Kernel> {
        let cfg = config::current();
        let key = source.cache_key();
        if cfg.cache_kernels {
            if let Some(cached) = lock(&self.0.kernels).get(&key) {
                log::trace!("kernel cache hit for `{}`", source.name());
                return Ok(cached.with_source(Some(Arc::new(source))));
            }
        }
        let name = source.name().to_owned();
        let mut program = Program::with_devices(&self.0.context, &[self.0.device])?;
        program.compile_source(source, &cfg.compile_options)?;
        program.link(&cfg.link_options)?;
        let kernel = program.try_get_kernel(&name)?;
        if cfg.cache_kernels {
            // the cached copy must not keep the command group's buffers alive
            lock(&self.0.kernels).insert(key, kernel.without_source());
        }
        Ok(kernel)
    }

    /// Keeps `event` until it finishes; finished events are swept on every call.
    pub(crate) fn track(&self, event: Event) {
        let mut pending = lock(&self.0.pending);
        let mut exceptions = lock(&self.0.exceptions);
        pending.retain(|earlier| !self.settle(earlier, &mut exceptions));
        pending.push(event);
    }

    /// Records a failed event as an asynchronous error; true once `event` is done.
    fn settle(&self, event: &Event, exceptions: &mut ExceptionList) -> bool {
        match event.status() {
            Ok(ExecStatus::Complete) => true,
            Ok(ExecStatus::Failed(code)) => {
                exceptions.push(raise(code, Some(self.0.context.raw())));
                true
            }
            Ok(_) => false,
            Err(e) => {
                exceptions.push(e);
                true
            }
        }
    }

    /// Events enqueued through this queue that have not been seen finished.
    pub fn pending_events(&self) -> usize {
        lock(&self.0.pending).len()
    }

    /// Number of kernels held by the cache.
    pub fn cached_kernels(&self) -> usize {
        lock(&self.0.kernels).len()
    }

    pub fn clear_kernel_cache(&self) {
        lock(&self.0.kernels).clear();
    }

    /// Blocks until every enqueued command finished; failed commands become
    /// asynchronous errors, delivered by [`throw_asynchronous`](Self::throw_asynchronous).
    pub fn wait(&self) -> Result<()> {
        check(self.api().finish(self.raw()), Some(self.0.context.raw()))?;
        let pending = std::mem::take(&mut *lock(&self.0.pending));
        let mut exceptions = lock(&self.0.exceptions);
        for event in &pending {
            self.settle(event, &mut exceptions);
        }
        Ok(())
    }

    /// Hands collected asynchronous errors to the queue's handler, else the
    /// context's, else the default handler which only traces them.
    pub fn throw_asynchronous(&self) {
        let list = lock(&self.0.exceptions).take();
        let handler = self.0.handler.as_ref().or(self.0.context.async_handler());
        report_async(handler, list);
    }

    pub fn wait_and_throw(&self) -> Result<()> {
        self.wait()?;
        self.throw_asynchronous();
        Ok(())
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("raw", &self.raw())
            .field("device", &self.0.device)
            .field("pending", &lock(&self.0.pending).len())
            .field("exceptions", &lock(&self.0.exceptions).len())
            .finish()
    }
}
