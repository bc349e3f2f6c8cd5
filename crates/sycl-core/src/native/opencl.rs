//! OpenCL runtime through the raw entry points `opencl3` re-exports.
//!
//! Handles cross the boundary as integers; reference counting stays with the
//! caller, so nothing here wraps a handle in an owning `opencl3` type.

use std::ffi::{CString, c_void};
use std::ptr;

use opencl3::command_queue as cq;
use opencl3::context::context as ctx;
use opencl3::event as ev;
use opencl3::kernel as kn;
use opencl3::memory as mem;
use opencl3::program as pg;
use opencl3::types::{CL_BLOCKING, cl_device_id, cl_event, cl_mem, cl_program};

use super::{
    BuildInfo, DeviceId, InfoValue, KernelInfo, MemFlags, NativeApi, ObjectKind, ProgramInfo, RawHandle,
    Status, status,
};

/// Every `cl_*` object handle is a `*mut c_void` underneath.
#[inline]
fn ptr_of(h: RawHandle) -> *mut c_void {
    h.0 as *mut c_void
}

#[inline]
fn handle_of(p: *mut c_void) -> RawHandle {
    RawHandle(p as usize)
}

fn device_ids(devices: &[DeviceId]) -> Vec<cl_device_id> {
    devices.iter().map(|d| d.0 as cl_device_id).collect()
}

fn c_string(s: &str) -> Result<CString, Status> {
    CString::new(s).map_err(|_| status::INVALID_VALUE)
}

/// Forwards every call to the installed OpenCL ICD.
#[derive(Debug, Default)]
pub struct OpenClApi;

impl OpenClApi {
    pub fn new() -> Self {
        OpenClApi
    }

    /// Every device of every platform, in platform order.
    pub fn all_devices(&self) -> Result<Vec<DeviceId>, Status> {
        let mut out = Vec::new();
        for platform in opencl3::platform::get_platforms().map_err(|e| e.0)? {
            let ids = platform
                .get_devices(opencl3::device::CL_DEVICE_TYPE_ALL)
                .map_err(|e| e.0)?;
            out.extend(ids.into_iter().map(|d| DeviceId(d as usize)));
        }
        Ok(out)
    }
}

impl NativeApi for OpenClApi {
    fn retain(&self, kind: ObjectKind, h: RawHandle) -> Result<(), Status> {
        match kind {
            ObjectKind::Context => ctx::retain_context(ptr_of(h)),
            ObjectKind::Queue => cq::retain_command_queue(ptr_of(h)),
            ObjectKind::Mem => mem::retain_mem_object(ptr_of(h)),
            ObjectKind::Program => pg::retain_program(ptr_of(h)),
            ObjectKind::Kernel => kn::retain_kernel(ptr_of(h)),
            ObjectKind::Event => ev::retain_event(ptr_of(h)),
        }
    }

    fn release(&self, kind: ObjectKind, h: RawHandle) -> Result<(), Status> {
        match kind {
            ObjectKind::Context => ctx::release_context(ptr_of(h)),
            ObjectKind::Queue => cq::release_command_queue(ptr_of(h)),
            ObjectKind::Mem => mem::release_mem_object(ptr_of(h)),
            ObjectKind::Program => pg::release_program(ptr_of(h)),
            ObjectKind::Kernel => kn::release_kernel(ptr_of(h)),
            ObjectKind::Event => ev::release_event(ptr_of(h)),
        }
    }

    fn create_context(&self, devices: &[DeviceId]) -> Result<RawHandle, Status> {
        let ids = device_ids(devices);
        ctx::create_context(&ids, ptr::null(), None, ptr::null_mut()).map(handle_of)
    }

    fn context_devices(&self, context: RawHandle) -> Result<Vec<DeviceId>, Status> {
        let info = ctx::get_context_info(ptr_of(context), ctx::CL_CONTEXT_DEVICES)?;
        Ok(info.to_vec_intptr().into_iter().map(|d| DeviceId(d as usize)).collect())
    }

    fn create_queue(&self, context: RawHandle, device: DeviceId) -> Result<RawHandle, Status> {
        cq::create_command_queue(ptr_of(context), device.0 as cl_device_id, 0).map(handle_of)
    }

    fn create_buffer(
        &self,
        context: RawHandle,
        flags: MemFlags,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<RawHandle, Status> {
        // CL_MEM_COPY_HOST_PTR copies during the call; the runtime never writes through it.
        let host = match host_data {
            Some(data) if data.len() == size => data.as_ptr() as *mut c_void,
            Some(_) => return Err(status::INVALID_BUFFER_SIZE),
            None => ptr::null_mut(),
        };
        mem::create_buffer(ptr_of(context), flags, size, host).map(handle_of)
    }

    fn enqueue_read_buffer(
        &self,
        queue: RawHandle,
        buffer: RawHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<(), Status> {
        let event: cl_event = cq::enqueue_read_buffer(
            ptr_of(queue),
            ptr_of(buffer),
            CL_BLOCKING,
            offset,
            dst.len(),
            dst.as_mut_ptr() as *mut c_void,
            0,
            ptr::null(),
        )?;
        ev::release_event(event)
    }

    fn enqueue_write_buffer(
        &self,
        queue: RawHandle,
        buffer: RawHandle,
        offset: usize,
        src: &[u8],
    ) -> Result<(), Status> {
        let event: cl_event = cq::enqueue_write_buffer(
            ptr_of(queue),
            ptr_of(buffer),
            CL_BLOCKING,
            offset,
            src.len(),
            src.as_ptr() as *const c_void,
            0,
            ptr::null(),
        )?;
        ev::release_event(event)
    }

    fn create_program_with_source(&self, context: RawHandle, source: &str) -> Result<RawHandle, Status> {
        pg::create_program_with_source(ptr_of(context), &[source]).map(handle_of)
    }

    fn compile_program(&self, program: RawHandle, devices: &[DeviceId], options: &str) -> Result<(), Status> {
        let options = c_string(options)?;
        pg::compile_program(
            ptr_of(program),
            &device_ids(devices),
            &options,
            &[],
            &[],
            None,
            ptr::null_mut(),
        )
    }

    fn link_program(
        &self,
        context: RawHandle,
        devices: &[DeviceId],
        options: &str,
        inputs: &[RawHandle],
    ) -> Result<RawHandle, Status> {
        let options = c_string(options)?;
        let inputs: Vec<cl_program> = inputs.iter().map(|&h| ptr_of(h)).collect();
        pg::link_program(
            ptr_of(context),
            &device_ids(devices),
            &options,
            &inputs,
            None,
            ptr::null_mut(),
        )
        .map(handle_of)
    }

    fn program_info(&self, program: RawHandle, param: ProgramInfo) -> Result<InfoValue, Status> {
        let name = match param {
            ProgramInfo::ReferenceCount => pg::CL_PROGRAM_REFERENCE_COUNT,
            ProgramInfo::Context => pg::CL_PROGRAM_CONTEXT,
            ProgramInfo::NumDevices => pg::CL_PROGRAM_NUM_DEVICES,
            ProgramInfo::Devices => pg::CL_PROGRAM_DEVICES,
            ProgramInfo::Source => pg::CL_PROGRAM_SOURCE,
            ProgramInfo::BinarySizes => pg::CL_PROGRAM_BINARY_SIZES,
            ProgramInfo::Binaries => pg::CL_PROGRAM_BINARIES,
            ProgramInfo::NumKernels => pg::CL_PROGRAM_NUM_KERNELS,
            ProgramInfo::KernelNames => pg::CL_PROGRAM_KERNEL_NAMES,
        };
        let info = pg::get_program_info(ptr_of(program), name)?;
        Ok(match param {
            ProgramInfo::ReferenceCount | ProgramInfo::NumDevices => InfoValue::Uint(info.to_uint() as u64),
            ProgramInfo::NumKernels => InfoValue::Uint(info.to_size() as u64),
            ProgramInfo::Context => InfoValue::Handle(RawHandle(info.to_ptr() as usize)),
            ProgramInfo::Devices => {
                InfoValue::Devices(info.to_vec_intptr().into_iter().map(|d| DeviceId(d as usize)).collect())
            }
            ProgramInfo::Source | ProgramInfo::KernelNames => InfoValue::Str(String::from(info)),
            ProgramInfo::BinarySizes => InfoValue::Sizes(info.to_vec_size()),
            ProgramInfo::Binaries => InfoValue::Bytes(info.to_vec_vec_uchar().concat()),
        })
    }

    fn program_build_info(
        &self,
        program: RawHandle,
        device: DeviceId,
        param: BuildInfo,
    ) -> Result<InfoValue, Status> {
        let name = match param {
            BuildInfo::Status => pg::CL_PROGRAM_BUILD_STATUS,
            BuildInfo::Options => pg::CL_PROGRAM_BUILD_OPTIONS,
            BuildInfo::Log => pg::CL_PROGRAM_BUILD_LOG,
        };
        let info = pg::get_program_build_info(ptr_of(program), device.0 as cl_device_id, name)?;
        Ok(match param {
            BuildInfo::Status => InfoValue::Int(info.to_int() as i64),
            BuildInfo::Options | BuildInfo::Log => InfoValue::Str(String::from(info)),
        })
    }

    fn create_kernel(&self, program: RawHandle, name: &str) -> Result<RawHandle, Status> {
        let name = c_string(name).map_err(|_| status::INVALID_KERNEL_NAME)?;
        kn::create_kernel(ptr_of(program), &name).map(handle_of)
    }

    fn create_kernels_in_program(&self, program: RawHandle) -> Result<Vec<RawHandle>, Status> {
        let kernels = kn::create_kernels_in_program(ptr_of(program))?;
        Ok(kernels.into_iter().map(handle_of).collect())
    }

    fn kernel_info(&self, kernel: RawHandle, param: KernelInfo) -> Result<InfoValue, Status> {
        let name = match param {
            KernelInfo::FunctionName => kn::CL_KERNEL_FUNCTION_NAME,
            KernelInfo::NumArgs => kn::CL_KERNEL_NUM_ARGS,
            KernelInfo::ReferenceCount => kn::CL_KERNEL_REFERENCE_COUNT,
            KernelInfo::Context => kn::CL_KERNEL_CONTEXT,
            KernelInfo::Program => kn::CL_KERNEL_PROGRAM,
        };
        let info = kn::get_kernel_info(ptr_of(kernel), name)?;
        Ok(match param {
            KernelInfo::FunctionName => InfoValue::Str(String::from(info)),
            KernelInfo::NumArgs | KernelInfo::ReferenceCount => InfoValue::Uint(info.to_uint() as u64),
            KernelInfo::Context | KernelInfo::Program => InfoValue::Handle(RawHandle(info.to_ptr() as usize)),
        })
    }

    fn set_kernel_arg_mem(&self, kernel: RawHandle, index: u32, buffer: RawHandle) -> Result<(), Status> {
        let value: cl_mem = ptr_of(buffer);
        kn::set_kernel_arg(
            ptr_of(kernel),
            index,
            std::mem::size_of::<cl_mem>(),
            &value as *const cl_mem as *const c_void,
        )
    }

    fn set_kernel_arg_local(&self, kernel: RawHandle, index: u32, size: usize) -> Result<(), Status> {
        kn::set_kernel_arg(ptr_of(kernel), index, size, ptr::null())
    }

    fn enqueue_task(&self, queue: RawHandle, kernel: RawHandle) -> Result<RawHandle, Status> {
        cq::enqueue_task(ptr_of(queue), ptr_of(kernel), 0, ptr::null()).map(handle_of)
    }

    fn wait_for_events(&self, events: &[RawHandle]) -> Result<(), Status> {
        let events: Vec<cl_event> = events.iter().map(|&h| ptr_of(h)).collect();
        ev::wait_for_events(&events)
    }

    fn event_status(&self, event: RawHandle) -> Result<Status, Status> {
        let info = ev::get_event_info(ptr_of(event), ev::CL_EVENT_COMMAND_EXECUTION_STATUS)?;
        Ok(info.to_int())
    }

    fn finish(&self, queue: RawHandle) -> Result<(), Status> {
        cq::finish(ptr_of(queue))
    }
}
