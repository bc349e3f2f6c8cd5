//! Native context plus the devices and async handler bound to it.

use std::fmt;
use std::sync::Arc;

use crate::error::{AsyncHandler, Result, check};
use crate::native::{DeviceId, NativeApi, RawHandle};
use crate::refc::{ContextKind, Refc};

#[derive(Clone)]
pub struct Context {
    handle: Refc<ContextKind>,
    devices: Arc<[DeviceId]>,
    async_handler: Option<AsyncHandler>,
}

impl Context {
    /// Creates a native context spanning `devices`.
    pub fn new(api: Arc<dyn NativeApi>, devices: &[DeviceId]) -> Result<Self> {
        let raw = check(api.create_context(devices), None)?;
        log::debug!("created context {raw:?} for {} device(s)", devices.len());
        Ok(Context {
            handle: Refc::adopt(api, raw),
            devices: devices.into(),
            async_handler: None,
        })
    }

    /// Wraps an existing native context, taking a reference of its own.
    pub fn from_raw(api: Arc<dyn NativeApi>, raw: RawHandle) -> Result<Self> {
        let handle = Refc::<ContextKind>::retain(api, raw)?;
        let devices = check(handle.api().context_devices(raw), Some(raw))?;
        Ok(Context {
            handle,
            devices: devices.into(),
            async_handler: None,
        })
    }

    /// Handler used by queues on this context that have none of their own.
    pub fn with_async_handler(mut self, handler: AsyncHandler) -> Self {
        self.async_handler = Some(handler);
        self
    }

    #[inline]
    pub fn raw(&self) -> RawHandle {
        self.handle.get()
    }

    #[inline]
    pub fn api(&self) -> &Arc<dyn NativeApi> {
        self.handle.api()
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn async_handler(&self) -> Option<&AsyncHandler> {
        self.async_handler.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("raw", &self.raw())
            .field("devices", &self.devices)
            .field("async_handler", &self.async_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::sim::{SimOp, SimRuntime};
    use crate::native::status;

    #[test]
    fn from_raw_queries_devices_and_holds_a_reference() {
        let sim = Arc::new(SimRuntime::with_devices(2));
        let ctx = Context::new(sim.clone(), &sim.devices()).unwrap();
        let again = Context::from_raw(sim.clone(), ctx.raw()).unwrap();
        assert_eq!(again.devices(), sim.devices().as_slice());
        assert_eq!(sim.refcount(ctx.raw()), Some(2));
        drop(ctx);
        assert_eq!(sim.refcount(again.raw()), Some(1));
    }

    #[test]
    fn creation_failure_is_reported() {
        let sim = Arc::new(SimRuntime::new());
        sim.fail_next(SimOp::CreateContext, status::OUT_OF_HOST_MEMORY);
        let err = Context::new(sim.clone(), &sim.devices()).unwrap_err();
        assert_eq!(err.status(), Some(status::OUT_OF_HOST_MEMORY));
    }
}
