//! The native compute API boundary.
//!
//! Every call the binding makes into the compute runtime goes through
//! [`NativeApi`]. Handles are opaque [`RawHandle`] values owned by the runtime;
//! the binding only ever holds them through [`crate::refc::Refc`].
//!
//! Two runtimes implement the trait: [`sim::SimRuntime`], an in-process
//! simulation used by tests and examples, and `opencl::OpenClApi`
//! (feature `opencl`), which forwards to the OpenCL C API via `opencl3`.

#[cfg(feature = "opencl")]
pub mod opencl;
pub mod sim;
pub mod status;

use std::fmt;

/// Native status code (`cl_int`).
pub type Status = i32;

/// Memory object flags (`cl_mem_flags`).
pub type MemFlags = u64;

pub const MEM_READ_WRITE: MemFlags = 1 << 0;
pub const MEM_WRITE_ONLY: MemFlags = 1 << 1;
pub const MEM_READ_ONLY: MemFlags = 1 << 2;
pub const MEM_COPY_HOST_PTR: MemFlags = 1 << 5;

/// Event execution statuses (`CL_COMPLETE` .. `CL_QUEUED`).
pub const EXEC_COMPLETE: Status = 0;
pub const EXEC_RUNNING: Status = 1;
pub const EXEC_SUBMITTED: Status = 2;
pub const EXEC_QUEUED: Status = 3;

/// Opaque native object handle.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(pub usize);

impl RawHandle {
    pub const NULL: RawHandle = RawHandle(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Device identifier. Devices are not reference counted by this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

/// Kinds of reference-counted native objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Context,
    Queue,
    Mem,
    Program,
    Kernel,
    Event,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Context => "context",
            ObjectKind::Queue => "queue",
            ObjectKind::Mem => "mem",
            ObjectKind::Program => "program",
            ObjectKind::Kernel => "kernel",
            ObjectKind::Event => "event",
        }
    }
}

/// `clGetProgramInfo` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramInfo {
    ReferenceCount,
    Context,
    NumDevices,
    Devices,
    Source,
    /// Per-device binary lengths, in device order.
    BinarySizes,
    /// All device binaries concatenated into one buffer, in device order.
    Binaries,
    NumKernels,
    /// Semicolon separated kernel names.
    KernelNames,
}

/// `clGetProgramBuildInfo` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildInfo {
    Status,
    Options,
    Log,
}

/// `clGetKernelInfo` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelInfo {
    FunctionName,
    NumArgs,
    ReferenceCount,
    Context,
    Program,
}

/// Untyped result of a native info query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoValue {
    Int(i64),
    Uint(u64),
    Sizes(Vec<usize>),
    Str(String),
    Bytes(Vec<u8>),
    Handle(RawHandle),
    Devices(Vec<DeviceId>),
}

impl InfoValue {
    pub fn into_uint(self) -> Result<u64, Status> {
        match self {
            InfoValue::Uint(v) => Ok(v),
            InfoValue::Int(v) if v >= 0 => Ok(v as u64),
            _ => Err(status::INVALID_VALUE),
        }
    }

    pub fn into_int(self) -> Result<i64, Status> {
        match self {
            InfoValue::Int(v) => Ok(v),
            InfoValue::Uint(v) => i64::try_from(v).map_err(|_| status::INVALID_VALUE),
            _ => Err(status::INVALID_VALUE),
        }
    }

    pub fn into_string(self) -> Result<String, Status> {
        match self {
            InfoValue::Str(s) => Ok(s),
            _ => Err(status::INVALID_VALUE),
        }
    }

    pub fn into_sizes(self) -> Result<Vec<usize>, Status> {
        match self {
            InfoValue::Sizes(v) => Ok(v),
            _ => Err(status::INVALID_VALUE),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, Status> {
        match self {
            InfoValue::Bytes(v) => Ok(v),
            _ => Err(status::INVALID_VALUE),
        }
    }

    pub fn into_handle(self) -> Result<RawHandle, Status> {
        match self {
            InfoValue::Handle(h) => Ok(h),
            _ => Err(status::INVALID_VALUE),
        }
    }

    pub fn into_devices(self) -> Result<Vec<DeviceId>, Status> {
        match self {
            InfoValue::Devices(v) => Ok(v),
            _ => Err(status::INVALID_VALUE),
        }
    }
}

/// Entry points of the native compute runtime consumed by this crate.
///
/// Every method maps onto one native call and returns the raw status on
/// failure. Translation into [`crate::ClError`] happens at the call site.
pub trait NativeApi: fmt::Debug + Send + Sync {
    fn retain(&self, kind: ObjectKind, handle: RawHandle) -> Result<(), Status>;
    fn release(&self, kind: ObjectKind, handle: RawHandle) -> Result<(), Status>;

    fn create_context(&self, devices: &[DeviceId]) -> Result<RawHandle, Status>;
    fn context_devices(&self, context: RawHandle) -> Result<Vec<DeviceId>, Status>;
    fn create_queue(&self, context: RawHandle, device: DeviceId) -> Result<RawHandle, Status>;

    fn create_buffer(
        &self,
        context: RawHandle,
        flags: MemFlags,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<RawHandle, Status>;
    /// Blocking read of `dst.len()` bytes starting at `offset`.
    fn enqueue_read_buffer(
        &self,
        queue: RawHandle,
        mem: RawHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<(), Status>;
    /// Blocking write of `src` starting at `offset`.
    fn enqueue_write_buffer(
        &self,
        queue: RawHandle,
        mem: RawHandle,
        offset: usize,
        src: &[u8],
    ) -> Result<(), Status>;

    fn create_program_with_source(&self, context: RawHandle, source: &str) -> Result<RawHandle, Status>;
    fn compile_program(&self, program: RawHandle, devices: &[DeviceId], options: &str) -> Result<(), Status>;
    fn link_program(
        &self,
        context: RawHandle,
        devices: &[DeviceId],
        options: &str,
        inputs: &[RawHandle],
    ) -> Result<RawHandle, Status>;
    fn program_info(&self, program: RawHandle, param: ProgramInfo) -> Result<InfoValue, Status>;
    fn program_build_info(
        &self,
        program: RawHandle,
        device: DeviceId,
        param: BuildInfo,
    ) -> Result<InfoValue, Status>;

    fn create_kernel(&self, program: RawHandle, name: &str) -> Result<RawHandle, Status>;
    fn create_kernels_in_program(&self, program: RawHandle) -> Result<Vec<RawHandle>, Status>;
    fn kernel_info(&self, kernel: RawHandle, param: KernelInfo) -> Result<InfoValue, Status>;
    fn set_kernel_arg_mem(&self, kernel: RawHandle, index: u32, mem: RawHandle) -> Result<(), Status>;
    fn set_kernel_arg_local(&self, kernel: RawHandle, index: u32, size: usize) -> Result<(), Status>;

    /// Enqueues a single work-item execution; the event wait list is always empty.
    fn enqueue_task(&self, queue: RawHandle, kernel: RawHandle) -> Result<RawHandle, Status>;
    fn wait_for_events(&self, events: &[RawHandle]) -> Result<(), Status>;
    /// Command execution status of an event; negative values are error codes.
    fn event_status(&self, event: RawHandle) -> Result<Status, Status>;
    fn finish(&self, queue: RawHandle) -> Result<(), Status>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_value_conversions_reject_mismatched_forms() {
        assert_eq!(InfoValue::Uint(3).into_uint(), Ok(3));
        assert_eq!(InfoValue::Int(7).into_uint(), Ok(7));
        assert_eq!(InfoValue::Int(-1).into_uint(), Err(status::INVALID_VALUE));
        assert_eq!(
            InfoValue::Str("x".into()).into_handle(),
            Err(status::INVALID_VALUE)
        );
        assert_eq!(
            InfoValue::Sizes(vec![1, 2]).into_sizes(),
            Ok(vec![1, 2])
        );
    }

    #[test]
    fn raw_handle_debug_is_hex() {
        assert_eq!(format!("{:?}", RawHandle(255)), "0xff");
        assert!(RawHandle::NULL.is_null());
    }

    #[test]
    fn default_handle_is_null() {
        assert_eq!(RawHandle::default(), RawHandle::NULL);
        assert!(RawHandle::default().is_null());
    }
}
