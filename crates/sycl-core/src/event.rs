//! Completion handles for enqueued commands.

use crate::error::{Result, check};
use crate::native::{EXEC_COMPLETE, EXEC_QUEUED, EXEC_RUNNING, EXEC_SUBMITTED, RawHandle, Status};
use crate::refc::{EventKind, Refc};

/// Execution status of the command behind an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Queued,
    Submitted,
    Running,
    Complete,
    /// The command terminated abnormally with this native status.
    Failed(Status),
}

impl ExecStatus {
    fn from_native(code: Status) -> Self {
        match code {
            EXEC_COMPLETE => ExecStatus::Complete,
            EXEC_RUNNING => ExecStatus::Running,
            EXEC_SUBMITTED => ExecStatus::Submitted,
            EXEC_QUEUED => ExecStatus::Queued,
            failed => ExecStatus::Failed(failed),
        }
    }
}

/// An event outlives the command group that produced it.
#[derive(Debug, Clone, Default)]
pub struct Event {
    handle: Option<Refc<EventKind>>,
}

impl Event {
    pub(crate) fn from_refc(handle: Refc<EventKind>) -> Self {
        Event { handle: Some(handle) }
    }

    /// An event with no native command behind it; it is always complete.
    pub fn completed() -> Self {
        Event { handle: None }
    }

    pub fn raw(&self) -> Option<RawHandle> {
        self.handle.as_ref().map(Refc::get)
    }

    pub fn status(&self) -> Result<ExecStatus> {
        match &self.handle {
            Some(h) => check(h.api().event_status(h.get()), None).map(ExecStatus::from_native),
            None => Ok(ExecStatus::Complete),
        }
    }

    /// Blocks until the command finished.
    pub fn wait(&self) -> Result<()> {
        Self::wait_all(std::slice::from_ref(self))
    }

    /// Blocks until every event finished.
    pub fn wait_all(events: &[Event]) -> Result<()> {
        let handles: Vec<&Refc<EventKind>> = events.iter().filter_map(|e| e.handle.as_ref()).collect();
        let Some(first) = handles.first() else {
            return Ok(());
        };
        let raws: Vec<RawHandle> = handles.iter().map(|h| h.get()).collect();
        check(first.api().wait_for_events(&raws), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_event_is_complete() {
        let event = Event::completed();
        assert_eq!(event.status(), Ok(ExecStatus::Complete));
        assert_eq!(event.wait(), Ok(()));
        assert_eq!(event.raw(), None);
    }

    #[test]
    fn negative_status_means_failure() {
        assert_eq!(ExecStatus::from_native(-5), ExecStatus::Failed(-5));
        assert_eq!(ExecStatus::from_native(EXEC_RUNNING), ExecStatus::Running);
    }
}
