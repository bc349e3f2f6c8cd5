//! Command groups: the kernels one `Queue::submit` records and enqueues.
//!
//! While a command group is being recorded the current thread is inside a
//! command-group scope. Local accessors can only be created there.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::error::Result;
use crate::event::Event;
use crate::kernel::Kernel;
use crate::kernel_source::{KernelFunctor, KernelSource};
use crate::queue::Queue;

thread_local! {
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// True while a command group is being recorded on this thread.
pub fn in_scope() -> bool {
    SCOPE_DEPTH.with(|d| d.get() > 0)
}

/// Marks the current thread as recording until dropped.
pub(crate) struct ScopeGuard {
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    pub(crate) fn enter() -> Self {
        SCOPE_DEPTH.with(|d| d.set(d.get() + 1));
        ScopeGuard { _not_send: PhantomData }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Records kernels for one command group.
pub struct Handler<'q> {
    queue: &'q Queue,
    recorded: Vec<Kernel>,
}

impl<'q> Handler<'q> {
    pub(crate) fn new(queue: &'q Queue) -> Self {
        Handler { queue, recorded: Vec::new() }
    }

    pub fn queue(&self) -> &'q Queue {
        self.queue
    }

    /// Generates, builds and records `functor` as a single work-item kernel.
    pub fn single_task<F: KernelFunctor>(&mut self, functor: &F) -> Result<()> {
        let source = KernelSource::generate(functor)?;
        self.record_source(source)
    }

    /// Same as [`single_task`](Self::single_task) for a closure body.
    pub fn single_task_with<B>(&mut self, name: &str, body: B) -> Result<()>
    where
        B: FnOnce(&mut KernelSource) -> Result<()>,
    {
        let source = KernelSource::generate_with(name, body)?;
        self.record_source(source)
    }

    /// Records an already built kernel; its arguments are whatever was bound.
    pub fn enqueue(&mut self, kernel: &Kernel) {
        self.recorded.push(kernel.clone());
    }

    fn record_source(&mut self, source: KernelSource) -> Result<()> {
        let kernel = self.queue.kernel_for(source)?;
        self.recorded.push(kernel);
        Ok(())
    }

    pub(crate) fn into_recorded(self) -> Vec<Kernel> {
        self.recorded
    }
}

/// Events of a submitted command group, in enqueue order.
#[derive(Debug, Clone, Default)]
pub struct CommandGroup {
    events: Vec<Event>,
}

impl CommandGroup {
    pub(crate) fn new(events: Vec<Event>) -> Self {
        CommandGroup { events }
    }

    /// Event of the last kernel; already complete for an empty group.
    pub fn kernel_event(&self) -> Event {
        self.events.last().cloned().unwrap_or_default()
    }

    /// Event of the first command.
    pub fn start_event(&self) -> Event {
        self.events.first().cloned().unwrap_or_default()
    }

    /// Event that completes once every command of the group has.
    pub fn complete_event(&self) -> Event {
        // in-order queue: the last command finishes last
        self.events.last().cloned().unwrap_or_default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn wait(&self) -> Result<()> {
        Event::wait_all(&self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_nests_and_unwinds() {
        assert!(!in_scope());
        {
            let _outer = ScopeGuard::enter();
            {
                let _inner = ScopeGuard::enter();
                assert!(in_scope());
            }
            assert!(in_scope());
        }
        assert!(!in_scope());
    }

    #[test]
    fn scope_is_per_thread() {
        let _guard = ScopeGuard::enter();
        let other = std::thread::spawn(in_scope).join().unwrap();
        assert!(!other);
        assert!(in_scope());
    }

    #[test]
    fn empty_group_events_are_complete() {
        let group = CommandGroup::default();
        assert_eq!(group.kernel_event().raw(), None);
        assert!(group.wait().is_ok());
    }
}
