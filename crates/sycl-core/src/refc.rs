//! Reference-counted native handles.
//!
//! A [`Refc`] pairs a native handle with the API that owns it. Clones share
//! one atomic count; the native release call runs exactly once, when the last
//! clone drops.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::error::{Result, check};
use crate::native::{NativeApi, ObjectKind, RawHandle};

/// Sealed trait pattern for handle kinds
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the kind of native object a handle refers to
pub trait Kind: sealed::Sealed + fmt::Debug + Send + Sync + 'static {
    const OBJECT: ObjectKind;
}

macro_rules! handle_kind {
    ($(#[$doc:meta] $name:ident => $object:ident),* $(,)?) => {$(
        #[$doc]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;
        impl sealed::Sealed for $name {}
        impl Kind for $name {
            const OBJECT: ObjectKind = ObjectKind::$object;
        }
    )*};
}

handle_kind! {
    /// Native context
    ContextKind => Context,
    /// Native command queue
    QueueKind => Queue,
    /// Native memory object
    MemKind => Mem,
    /// Native program
    ProgramKind => Program,
    /// Native kernel
    KernelKind => Kernel,
    /// Native event
    EventKind => Event,
}

struct Shared {
    raw: RawHandle,
    kind: ObjectKind,
    api: Arc<dyn NativeApi>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        #[cfg(feature = "metrics")]
        let start = Instant::now();
        log::trace!("release {} {:?}", self.kind.as_str(), self.raw);
        if let Err(code) = self.api.release(self.kind, self.raw) {
            log::warn!(
                "releasing {} {:?} failed: {}",
                self.kind.as_str(),
                self.raw,
                crate::native::status::name(code)
            );
        }
        #[cfg(feature = "metrics")]
        {
            crate::metrics::record("release", start);
            crate::metrics::RELEASES.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }
}

/// Shared ownership of one native reference.
pub struct Refc<K: Kind> {
    shared: Arc<Shared>,
    _kind: PhantomData<K>,
}

impl<K: Kind> Refc<K> {
    /// Takes over the reference a native create call returned.
    pub fn adopt(api: Arc<dyn NativeApi>, raw: RawHandle) -> Self {
        Refc {
            shared: Arc::new(Shared { raw, kind: K::OBJECT, api }),
            _kind: PhantomData,
        }
    }

    /// Acquires a new reference through the native retain call.
    ///
    /// When the retain fails nothing is owned, so nothing will be released.
    pub fn retain(api: Arc<dyn NativeApi>, raw: RawHandle) -> Result<Self> {
        log::trace!("retain {} {:?}", K::OBJECT.as_str(), raw);
        check(api.retain(K::OBJECT, raw), None)?;
        #[cfg(feature = "metrics")]
        crate::metrics::RETAINS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(Self::adopt(api, raw))
    }

    #[inline]
    pub fn get(&self) -> RawHandle {
        self.shared.raw
    }

    #[inline]
    pub fn api(&self) -> &Arc<dyn NativeApi> {
        &self.shared.api
    }

    /// Number of live clones sharing this reference.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.shared)
    }
}

impl<K: Kind> Clone for Refc<K> {
    fn clone(&self) -> Self {
        Refc {
            shared: Arc::clone(&self.shared),
            _kind: PhantomData,
        }
    }
}

impl<K: Kind> PartialEq for Refc<K> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<K: Kind> Eq for Refc<K> {}

impl<K: Kind> fmt::Debug for Refc<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refc")
            .field("kind", &K::OBJECT)
            .field("raw", &self.shared.raw)
            .field("holders", &self.holders())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::sim::{SimOp, SimRuntime};
    use crate::native::status;

    fn context(sim: &Arc<SimRuntime>) -> RawHandle {
        sim.create_context(&sim.devices()).unwrap()
    }

    #[test]
    fn last_clone_releases_once() {
        let sim = Arc::new(SimRuntime::new());
        let raw = context(&sim);
        let handle = Refc::<ContextKind>::adopt(sim.clone(), raw);
        let copies: Vec<_> = (0..5).map(|_| handle.clone()).collect();
        assert_eq!(handle.holders(), 6);
        drop(handle);
        drop(copies);
        assert_eq!(sim.calls(SimOp::Release), 1);
        assert_eq!(sim.destroy_count(raw), 1);
    }

    #[test]
    fn failed_retain_never_releases() {
        let sim = Arc::new(SimRuntime::new());
        let raw = context(&sim);
        sim.fail_next(SimOp::Retain, status::OUT_OF_RESOURCES);
        let err = Refc::<ContextKind>::retain(sim.clone(), raw).unwrap_err();
        assert_eq!(err.status(), Some(status::OUT_OF_RESOURCES));
        assert_eq!(sim.calls(SimOp::Release), 0);
        assert_eq!(sim.refcount(raw), Some(1));
    }

    #[test]
    fn retained_handle_gives_back_its_reference() {
        let sim = Arc::new(SimRuntime::new());
        let raw = context(&sim);
        {
            let held = Refc::<ContextKind>::retain(sim.clone(), raw).unwrap();
            assert_eq!(sim.refcount(held.get()), Some(2));
        }
        assert_eq!(sim.refcount(raw), Some(1));
    }

    #[test]
    fn wrong_kind_is_rejected_by_the_runtime() {
        let sim = Arc::new(SimRuntime::new());
        let raw = context(&sim);
        assert!(Refc::<ProgramKind>::retain(sim.clone(), raw).is_err());
    }
}
