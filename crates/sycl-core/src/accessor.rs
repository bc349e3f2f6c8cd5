//! Capability-scoped views over buffers and local scratch memory.
//!
//! One accessor type covers every mode and target; the combination is data,
//! checked when the accessor is created and again when it is used. Indexing
//! never touches memory: it registers the viewed resource with the kernel
//! source being generated and returns a symbolic element.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::buffer::{Buffer, Element};
use crate::command_group;
use crate::error::{ErrorCode, Result, raise, report_code};
use crate::kernel_source::{ArgBinding, ElementRef, IndexExpr, KernelSource, Resource, ResourceId};
use crate::native::{RawHandle, status};
use crate::queue::Queue;
use crate::range::{Id, Range};

static NEXT_LOCAL_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
    DiscardWrite,
    Atomic,
}

impl AccessMode {
    pub fn can_read(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite | AccessMode::Atomic)
    }

    pub fn can_write(self) -> bool {
        !matches!(self, AccessMode::Read)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessTarget {
    GlobalBuffer,
    ConstantBuffer,
    Local,
    HostBuffer,
}

impl AccessTarget {
    fn address_space(self) -> Option<&'static str> {
        match self {
            AccessTarget::GlobalBuffer => Some("__global"),
            AccessTarget::ConstantBuffer => Some("__constant"),
            AccessTarget::Local => Some("__local"),
            AccessTarget::HostBuffer => None,
        }
    }
}

enum Binding<'a, T: Element, const D: usize> {
    Buffer(&'a Buffer<T, D>),
    Local { id: usize },
}

/// View of `range` elements starting at `offset`.
pub struct Accessor<'a, T: Element, const D: usize = 1> {
    binding: Binding<'a, T, D>,
    mode: AccessMode,
    target: AccessTarget,
    offset: Id<D>,
    range: Range<D>,
}

impl<'a, T: Element, const D: usize> Accessor<'a, T, D> {
    /// Views the whole buffer.
    pub fn new(buffer: &'a Buffer<T, D>, mode: AccessMode, target: AccessTarget) -> Result<Self> {
        Self::with_region(buffer, mode, target, Id::ZERO, buffer.range())
    }

    /// Views `range` elements of the buffer starting at `offset`; the rest of
    /// the buffer is left alone.
    pub fn with_region(
        buffer: &'a Buffer<T, D>,
        mode: AccessMode,
        target: AccessTarget,
        offset: Id<D>,
        range: Range<D>,
    ) -> Result<Self> {
        match target {
            AccessTarget::Local => {
                return Err(report_code(
                    ErrorCode::InvalidAccessorTarget,
                    "buffers cannot be accessed through the local target",
                    None,
                ));
            }
            AccessTarget::ConstantBuffer if mode != AccessMode::Read => {
                return Err(report_code(
                    ErrorCode::InvalidAccessorTarget,
                    format!("constant buffers are read-only, got {mode:?}"),
                    None,
                ));
            }
            AccessTarget::HostBuffer if mode == AccessMode::Atomic => {
                return Err(report_code(
                    ErrorCode::InvalidAccessorTarget,
                    "atomic access is device-only",
                    None,
                ));
            }
            _ => {}
        }
        if !buffer.range().contains_region(offset, range) {
            return Err(report_code(
                ErrorCode::AccessorOutOfBounds,
                format!(
                    "offset {offset} + range {range} exceeds {} of range {}",
                    buffer.resource_name(),
                    buffer.range()
                ),
                None,
            ));
        }
        Ok(Accessor {
            binding: Binding::Buffer(buffer),
            mode,
            target,
            offset,
            range,
        })
    }

    /// Local scratch allocation of `range` elements; only valid while a
    /// command group is being recorded on this thread.
    pub fn local(range: impl Into<Range<D>>, mode: AccessMode) -> Result<Self> {
        let range = range.into();
        if !command_group::in_scope() {
            return Err(report_code(
                ErrorCode::LocalAccessorOutsideCommandGroup,
                format!("local allocation of {range} elements"),
                None,
            ));
        }
        if range.checked_bytes(std::mem::size_of::<T>()).is_none() {
            log::debug!("local allocation of {range} elements overflows its byte size");
            return Err(raise(status::INVALID_BUFFER_SIZE, None));
        }
        let id = NEXT_LOCAL_ID.fetch_add(1, Ordering::Relaxed);
        Ok(Accessor {
            binding: Binding::Local { id },
            mode,
            target: AccessTarget::Local,
            offset: Id::ZERO,
            range,
        })
    }

    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    #[inline]
    pub fn target(&self) -> AccessTarget {
        self.target
    }

    /// Number of elements this accessor may touch.
    pub fn get_size(&self) -> usize {
        self.range.size()
    }

    pub fn range(&self) -> Range<D> {
        self.range
    }

    pub fn offset(&self) -> Id<D> {
        self.offset
    }

    pub fn is_local(&self) -> bool {
        matches!(self.binding, Binding::Local { .. })
    }

    /// Native memory object behind a buffer accessor.
    pub fn mem(&self) -> Option<RawHandle> {
        match &self.binding {
            Binding::Buffer(buf) => Some(buf.mem()),
            Binding::Local { .. } => None,
        }
    }

    /// Bytes a local allocation needs as a kernel argument; 0 for buffers.
    pub fn argument_size(&self) -> usize {
        match self.binding {
            Binding::Buffer(_) => 0,
            Binding::Local { .. } => std::mem::size_of::<T>().saturating_mul(self.range.size()),
        }
    }

    /// Name of the viewed resource in generated source.
    pub fn resource_name(&self) -> String {
        match &self.binding {
            Binding::Buffer(buf) => buf.resource_name(),
            Binding::Local { id } => format!("_sycl_local{id}"),
        }
    }

    /// Symbolic element at linear `index`, counted row-major through the
    /// accessor's region. A literal index past the region is rejected.
    pub fn at(&self, src: &mut KernelSource, index: impl Into<IndexExpr>) -> Result<ElementRef> {
        let index = index.into();
        if let Some(linear) = index.literal() {
            if linear >= self.range.size() {
                return Err(report_code(
                    ErrorCode::AccessorOutOfBounds,
                    format!("index {linear} outside range {} of {}", self.range, self.resource_name()),
                    None,
                ));
            }
        }
        let index = match &self.binding {
            Binding::Buffer(buf) => self.region_index(buf.range(), index),
            Binding::Local { .. } => index,
        };
        self.element(src, index)
    }

    /// Maps a linear position inside the region onto the buffer's linear space.
    fn region_index(&self, full: Range<D>, index: IndexExpr) -> IndexExpr {
        let base = full.linearize(self.offset);
        // rows of the region are whole rows of the buffer
        if (1..D).all(|d| self.range.0[d] == full.0[d]) {
            return index.offset_by(base);
        }
        let region = self.range.strides();
        if let Some(linear) = index.literal() {
            let mut rest = linear;
            let mut id = [0; D];
            for (d, stride) in region.iter().enumerate() {
                id[d] = rest / stride;
                rest %= stride;
            }
            return IndexExpr::from(full.linearize(self.offset.offset_by(Id(id))));
        }
        let buffer = full.strides();
        let terms: Vec<String> = (0..D)
            .filter(|&d| self.range.0[d] > 1)
            .map(|d| {
                let mut term = format!("({index})");
                if region[d] > 1 {
                    term.push_str(&format!(" / {}", region[d]));
                }
                if d > 0 {
                    term.push_str(&format!(" % {}", self.range.0[d]));
                }
                if buffer[d] > 1 {
                    term.push_str(&format!(" * {}", buffer[d]));
                }
                term
            })
            .collect();
        if terms.is_empty() {
            return IndexExpr::from(base);
        }
        IndexExpr::raw(terms.join(" + ")).offset_by(base)
    }

    /// Symbolic element at `id` within the accessor's region.
    pub fn at_id(&self, src: &mut KernelSource, id: Id<D>) -> Result<ElementRef> {
        let linear = match &self.binding {
            Binding::Buffer(buf) => buf.range().linearize(self.offset.offset_by(id)),
            Binding::Local { .. } => self.range.linearize(id),
        };
        self.element(src, IndexExpr::from(linear))
    }

    fn element(&self, src: &mut KernelSource, index: IndexExpr) -> Result<ElementRef> {
        if self.is_local() && !command_group::in_scope() {
            return Err(report_code(
                ErrorCode::LocalAccessorOutsideCommandGroup,
                format!("{} used after its command group", self.resource_name()),
                None,
            ));
        }
        if self.mode == AccessMode::Read {
            // open question: value or reference semantics for read indexing
            return Err(report_code(
                ErrorCode::UnsupportedOperation,
                format!("element indexing on read accessor {}", self.resource_name()),
                None,
            ));
        }
        let Some(space) = self.target.address_space() else {
            return Err(report_code(
                ErrorCode::InvalidAccessorTarget,
                "host accessors cannot be used in kernel source",
                None,
            ));
        };
        let name = self.resource_name();
        let volatile = if self.mode == AccessMode::Atomic { "volatile " } else { "" };
        let (id, binding) = match &self.binding {
            Binding::Buffer(buf) => (ResourceId::Buffer(buf.id()), ArgBinding::Mem(buf.mem_refc().clone())),
            Binding::Local { id } => (ResourceId::Local(*id), ArgBinding::Local { bytes: self.argument_size() }),
        };
        src.register(Resource {
            id,
            decl: format!("{volatile}{space} {}* {name}", T::CL_TYPE),
            name: name.clone(),
            binding,
        });
        Ok(ElementRef::new(format!("{name}[{index}]"), self.mode == AccessMode::Atomic))
    }

    /// Reads the accessor's region on the host.
    pub fn read_host(&self, queue: &Queue) -> Result<Vec<T>> {
        let buf = self.host_buffer()?;
        if !self.mode.can_read() {
            return Err(report_code(
                ErrorCode::UnsupportedOperation,
                format!("reading through a {:?} accessor", self.mode),
                None,
            ));
        }
        let all = buf.read(queue)?;
        Ok(self
            .range
            .ids()
            .map(|id| all[buf.range().linearize(self.offset.offset_by(id))])
            .collect())
    }

    /// Overwrites the accessor's region from the host; the rest of the buffer is kept.
    pub fn write_host(&self, queue: &Queue, data: &[T]) -> Result<()> {
        let buf = self.host_buffer()?;
        if !self.mode.can_write() || data.len() != self.range.size() {
            return Err(report_code(
                ErrorCode::UnsupportedOperation,
                format!("writing {} elements through a {:?} accessor of {}", data.len(), self.mode, self.range),
                None,
            ));
        }
        let mut all = if self.mode == AccessMode::DiscardWrite && self.range == buf.range() {
            vec![T::zeroed(); buf.size()]
        } else {
            buf.read(queue)?
        };
        for (id, value) in self.range.ids().zip(data) {
            all[buf.range().linearize(self.offset.offset_by(id))] = *value;
        }
        buf.write(queue, &all)
    }

    fn host_buffer(&self) -> Result<&'a Buffer<T, D>> {
        match (&self.binding, self.target) {
            (Binding::Buffer(buf), AccessTarget::HostBuffer) => Ok(*buf),
            _ => Err(report_code(
                ErrorCode::InvalidAccessorTarget,
                "host data needs a host_buffer accessor",
                None,
            )),
        }
    }
}

impl<T: Element, const D: usize> fmt::Debug for Accessor<'_, T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("resource", &self.resource_name())
            .field("mode", &self.mode)
            .field("target", &self.target)
            .field("offset", &self.offset)
            .field("range", &self.range)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::native::sim::SimRuntime;
    use std::sync::Arc;

    fn context() -> Context {
        let sim = Arc::new(SimRuntime::new());
        Context::new(sim.clone(), &sim.devices()).unwrap()
    }

    #[test]
    fn region_size_reflects_the_restriction() {
        let ctx = context();
        let buf = Buffer::<f32, 2>::new(&ctx, Range::new([8, 8])).unwrap();
        let acc = Accessor::with_region(
            &buf,
            AccessMode::Write,
            AccessTarget::GlobalBuffer,
            Id([2, 2]),
            Range([3, 4]),
        )
        .unwrap();
        assert_eq!(acc.get_size(), 12);
        assert_eq!(buf.get_access(AccessMode::Write).unwrap().get_size(), 64);
    }

    #[test]
    fn region_outside_the_buffer_is_rejected() {
        let ctx = context();
        let buf = Buffer::<i32>::new(&ctx, Range::new([10])).unwrap();
        let err = Accessor::with_region(&buf, AccessMode::Write, AccessTarget::GlobalBuffer, Id([8]), Range([3]))
            .unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::AccessorOutOfBounds));
    }

    #[test]
    fn write_index_registers_and_folds_offset() {
        let ctx = context();
        let buf = Buffer::<f32>::new(&ctx, Range::new([16])).unwrap();
        let acc =
            Accessor::with_region(&buf, AccessMode::Write, AccessTarget::GlobalBuffer, Id([4]), Range([8])).unwrap();
        let mut src = KernelSource::new("k").unwrap();
        let elem = acc.at(&mut src, IndexExpr::global_id(0)).unwrap();
        let name = buf.resource_name();
        assert_eq!(elem.expr(), format!("{name}[4 + get_global_id(0)]"));
        elem.assign(&mut src, "1.0f");
        assert_eq!(
            src.text(),
            format!("__kernel void k(__global float* {name}) {{\n\t{name}[4 + get_global_id(0)] = 1.0f;\n}}\n")
        );
    }

    #[test]
    fn read_indexing_is_unsupported() {
        let ctx = context();
        let buf = Buffer::<f32>::new(&ctx, Range::new([4])).unwrap();
        let acc = buf.get_access(AccessMode::Read).unwrap();
        let mut src = KernelSource::new("k").unwrap();
        let err = acc.at(&mut src, 0usize).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::UnsupportedOperation));
        assert_eq!(src.parameters().count(), 0);
    }

    #[test]
    fn local_accessor_needs_a_command_group() {
        let err = Accessor::<f32>::local(Range::new([32]), AccessMode::ReadWrite).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::LocalAccessorOutsideCommandGroup));
    }

    #[test]
    fn local_accessor_expires_with_its_scope() {
        let scratch = {
            let _scope = command_group::ScopeGuard::enter();
            Accessor::<f32>::local(Range::new([4]), AccessMode::ReadWrite).unwrap()
        };
        let mut src = KernelSource::new("late").unwrap();
        let err = scratch.at(&mut src, 0usize).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::LocalAccessorOutsideCommandGroup));
        let err = scratch.at_id(&mut src, Id([1])).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::LocalAccessorOutsideCommandGroup));
        assert_eq!(src.parameters().count(), 0);
    }

    #[test]
    fn oversized_local_allocation_is_rejected() {
        let _scope = command_group::ScopeGuard::enter();
        let err = Accessor::<u32>::local(Range::new([usize::MAX / 2]), AccessMode::ReadWrite).unwrap_err();
        assert_eq!(err.status(), Some(status::INVALID_BUFFER_SIZE));
        let err = Accessor::<u8, 2>::local(Range::new([usize::MAX, 2]), AccessMode::ReadWrite).unwrap_err();
        assert_eq!(err.status(), Some(status::INVALID_BUFFER_SIZE));
    }

    #[test]
    fn linear_index_in_a_narrow_region_follows_region_rows() {
        let ctx = context();
        let buf = Buffer::<f32, 2>::new(&ctx, Range::new([8, 8])).unwrap();
        let acc = Accessor::with_region(
            &buf,
            AccessMode::Write,
            AccessTarget::GlobalBuffer,
            Id([2, 2]),
            Range([3, 4]),
        )
        .unwrap();
        let name = buf.resource_name();
        let mut src = KernelSource::new("k").unwrap();
        // fifth element of the region starts its second row
        let linear = acc.at(&mut src, 4usize).unwrap();
        let by_id = acc.at_id(&mut src, Id([1, 0])).unwrap();
        assert_eq!(linear.expr(), format!("{name}[26]"));
        assert_eq!(linear.expr(), by_id.expr());
        assert_eq!(acc.at(&mut src, 11usize).unwrap().expr(), format!("{name}[37]"));

        let symbolic = acc.at(&mut src, IndexExpr::global_id(0)).unwrap();
        assert_eq!(
            symbolic.expr(),
            format!("{name}[18 + (get_global_id(0)) / 4 * 8 + (get_global_id(0)) % 4]")
        );
    }

    #[test]
    fn linear_index_past_the_region_is_rejected() {
        let ctx = context();
        let buf = Buffer::<i32, 2>::new(&ctx, Range::new([4, 4])).unwrap();
        let acc =
            Accessor::with_region(&buf, AccessMode::Write, AccessTarget::GlobalBuffer, Id([1, 1]), Range([2, 2]))
                .unwrap();
        let mut src = KernelSource::new("k").unwrap();
        let err = acc.at(&mut src, 4usize).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::AccessorOutOfBounds));
    }

    #[test]
    fn full_width_region_keeps_a_flat_offset() {
        let ctx = context();
        let buf = Buffer::<i32, 2>::new(&ctx, Range::new([4, 4])).unwrap();
        let acc =
            Accessor::with_region(&buf, AccessMode::Write, AccessTarget::GlobalBuffer, Id([1, 0]), Range([2, 4]))
                .unwrap();
        let mut src = KernelSource::new("k").unwrap();
        let name = buf.resource_name();
        assert_eq!(acc.at(&mut src, 5usize).unwrap().expr(), format!("{name}[4 + 5]"));
        assert_eq!(
            acc.at(&mut src, IndexExpr::global_id(0)).unwrap().expr(),
            format!("{name}[4 + get_global_id(0)]")
        );
    }

    #[test]
    fn invalid_target_combinations() {
        let ctx = context();
        let buf = Buffer::<u32>::new(&ctx, Range::new([4])).unwrap();
        for (mode, target) in [
            (AccessMode::Write, AccessTarget::Local),
            (AccessMode::Write, AccessTarget::ConstantBuffer),
            (AccessMode::Atomic, AccessTarget::HostBuffer),
        ] {
            let err = Accessor::new(&buf, mode, target).unwrap_err();
            assert_eq!(err.error_code(), Some(ErrorCode::InvalidAccessorTarget));
        }
        let host = Accessor::new(&buf, AccessMode::Write, AccessTarget::HostBuffer).unwrap();
        let mut src = KernelSource::new("k").unwrap();
        assert_eq!(
            host.at(&mut src, 0usize).unwrap_err().error_code(),
            Some(ErrorCode::InvalidAccessorTarget)
        );
    }

    #[test]
    fn atomic_accessor_declares_volatile_parameter() {
        let ctx = context();
        let buf = Buffer::<i32>::new(&ctx, Range::new([1])).unwrap();
        let acc = buf.get_access(AccessMode::Atomic).unwrap();
        let mut src = KernelSource::new("count").unwrap();
        acc.at(&mut src, 0usize).unwrap().fetch_add(&mut src, 1).unwrap();
        assert!(src.text().starts_with(&format!(
            "__kernel void count(volatile __global int* {})",
            buf.resource_name()
        )));
    }
}
