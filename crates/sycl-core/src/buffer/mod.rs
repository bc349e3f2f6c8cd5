//! Typed device buffers.

mod element;

pub use element::Element;

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::accessor::{AccessMode, AccessTarget, Accessor};
use crate::context::Context;
use crate::error::{Result, check, raise};
use crate::native::{MEM_COPY_HOST_PTR, MEM_READ_WRITE, RawHandle, status};
use crate::queue::Queue;
use crate::range::{Id, Range};
use crate::refc::{MemKind, Refc};

static NEXT_BUFFER_ID: AtomicUsize = AtomicUsize::new(0);

/// Device storage of `range.size()` elements of `T`.
pub struct Buffer<T: Element, const D: usize = 1> {
    mem: Refc<MemKind>,
    range: Range<D>,
    id: usize,
    context: RawHandle,
    _elem: PhantomData<T>,
}

impl<T: Element, const D: usize> Buffer<T, D> {
    /// Allocates zero-initialised storage.
    pub fn new(context: &Context, range: impl Into<Range<D>>) -> Result<Self> {
        Self::create(context, range.into(), None)
    }

    /// Allocates storage initialised from `data`, which must fill `range` exactly.
    pub fn from_slice(context: &Context, data: &[T], range: impl Into<Range<D>>) -> Result<Self> {
        let range = range.into();
        if range.checked_size() != Some(data.len()) {
            return Err(raise(status::INVALID_BUFFER_SIZE, Some(context.raw())));
        }
        Self::create(context, range, Some(bytemuck::cast_slice(data)))
    }

    fn create(context: &Context, range: Range<D>, host: Option<&[u8]>) -> Result<Self> {
        let Some(bytes) = range.checked_bytes(std::mem::size_of::<T>()) else {
            return Err(raise(status::INVALID_BUFFER_SIZE, Some(context.raw())));
        };
        let flags = match host {
            Some(_) => MEM_READ_WRITE | MEM_COPY_HOST_PTR,
            None => MEM_READ_WRITE,
        };
        let raw = check(
            context.api().create_buffer(context.raw(), flags, bytes, host),
            Some(context.raw()),
        )?;
        let id = NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("buffer _sycl_buf{id}: {bytes} bytes of {} as {raw:?}", T::CL_TYPE);
        Ok(Buffer {
            mem: Refc::adopt(context.api().clone(), raw),
            range,
            id,
            context: context.raw(),
            _elem: PhantomData,
        })
    }

    #[inline]
    pub fn range(&self) -> Range<D> {
        self.range
    }

    /// Number of elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.range.size()
    }

    pub fn byte_size(&self) -> usize {
        self.size() * std::mem::size_of::<T>()
    }

    /// Native memory object.
    #[inline]
    pub fn mem(&self) -> RawHandle {
        self.mem.get()
    }

    pub(crate) fn mem_refc(&self) -> &Refc<MemKind> {
        &self.mem
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Name the buffer goes by in generated kernel source.
    pub fn resource_name(&self) -> String {
        format!("_sycl_buf{}", self.id)
    }

    /// Whole-buffer accessor on the global target.
    pub fn get_access(&self, mode: AccessMode) -> Result<Accessor<'_, T, D>> {
        Accessor::new(self, mode, AccessTarget::GlobalBuffer)
    }

    /// Blocking read of the whole buffer.
    pub fn read(&self, queue: &Queue) -> Result<Vec<T>> {
        let mut out = vec![T::zeroed(); self.size()];
        self.read_at(queue, Id::ZERO, &mut out)?;
        Ok(out)
    }

    /// Blocking read of `dst.len()` elements starting at `at`.
    pub fn read_at(&self, queue: &Queue, at: Id<D>, dst: &mut [T]) -> Result<()> {
        let offset = self.range.linearize(at) * std::mem::size_of::<T>();
        check(
            queue
                .api()
                .enqueue_read_buffer(queue.raw(), self.mem(), offset, bytemuck::cast_slice_mut(dst)),
            Some(self.context),
        )
    }

    /// Blocking write of the whole buffer; `src` must fill it exactly.
    pub fn write(&self, queue: &Queue, src: &[T]) -> Result<()> {
        if src.len() != self.size() {
            return Err(raise(status::INVALID_BUFFER_SIZE, Some(self.context)));
        }
        self.write_at(queue, Id::ZERO, src)
    }

    /// Blocking write of `src` starting at `at`.
    pub fn write_at(&self, queue: &Queue, at: Id<D>, src: &[T]) -> Result<()> {
        let offset = self.range.linearize(at) * std::mem::size_of::<T>();
        check(
            queue
                .api()
                .enqueue_write_buffer(queue.raw(), self.mem(), offset, bytemuck::cast_slice(src)),
            Some(self.context),
        )
    }
}

impl<T: Element, const D: usize> fmt::Debug for Buffer<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.resource_name())
            .field("elem", &T::CL_TYPE)
            .field("range", &self.range)
            .field("mem", &self.mem())
            .finish()
    }
}
