//! In-process simulation of the native compute runtime.
//!
//! `SimRuntime` keeps real reference counts, validates compile and link
//! inputs, produces build logs and per-device binaries, and checks kernel
//! arguments before accepting an enqueue. Kernels are never executed: an
//! enqueued task completes immediately unless a failure was injected.
//!
//! Objects hold the implicit references the native API specifies: a kernel
//! keeps its program alive, programs, queues and buffers keep their context
//! alive, and events keep their queue alive.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{
    BuildInfo, DeviceId, EXEC_COMPLETE, InfoValue, KernelInfo, MemFlags, NativeApi, ObjectKind,
    ProgramInfo, RawHandle, Status, status,
};

const BUILD_SUCCESS: i64 = 0;
const BUILD_NONE: i64 = -1;
const BUILD_ERROR: i64 = -2;

/// Native entry points that can be counted and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    Retain,
    Release,
    CreateContext,
    CreateQueue,
    CreateBuffer,
    ReadBuffer,
    WriteBuffer,
    CreateProgram,
    Compile,
    Link,
    CreateKernel,
    SetArg,
    EnqueueTask,
    WaitEvents,
    Finish,
    Info,
}

/// A kernel argument as recorded by the simulated runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimArg {
    Mem(RawHandle),
    Local(usize),
}

#[derive(Debug)]
struct Object {
    kind: ObjectKind,
    refs: u32,
    parent: Option<RawHandle>,
    body: Body,
}

#[derive(Debug)]
enum Body {
    Context { devices: Vec<DeviceId> },
    Queue { context: RawHandle },
    Mem { data: Vec<u8> },
    Program(ProgramBody),
    Kernel { program: RawHandle, name: String, num_args: u32, args: BTreeMap<u32, SimArg> },
    Event { status: Status },
}

#[derive(Debug, Default)]
struct ProgramBody {
    context: RawHandle,
    devices: Vec<DeviceId>,
    source: String,
    kernels: Vec<KernelDecl>,
    compiled: bool,
    executable: bool,
    options: String,
    log: String,
    build_status: i64,
}

#[derive(Debug, Clone)]
struct KernelDecl {
    name: String,
    num_args: u32,
}

#[derive(Debug, Default)]
struct SimState {
    next_id: usize,
    devices: Vec<DeviceId>,
    objects: HashMap<RawHandle, Object>,
    calls: HashMap<SimOp, usize>,
    destroyed: Vec<(ObjectKind, RawHandle)>,
    fail_next: HashMap<SimOp, Status>,
    fail_execution: Option<Status>,
    launches: Vec<(RawHandle, Vec<SimArg>)>,
}

/// Simulated native runtime.
#[derive(Debug)]
pub struct SimRuntime {
    state: Mutex<SimState>,
}

impl Default for SimRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRuntime {
    /// A runtime exposing a single device.
    pub fn new() -> Self {
        Self::with_devices(1)
    }

    /// A runtime exposing `count` devices, numbered from 1.
    pub fn with_devices(count: usize) -> Self {
        let state = SimState {
            next_id: 0x100,
            devices: (1..=count).map(DeviceId).collect(),
            ..Default::default()
        };
        SimRuntime { state: Mutex::new(state) }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // a panic while holding the lock leaves the bookkeeping usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn devices(&self) -> Vec<DeviceId> {
        self.lock().devices.clone()
    }

    /// Number of calls made to `op` so far.
    pub fn calls(&self, op: SimOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    /// Makes the next call to `op` fail with `code`.
    pub fn fail_next(&self, op: SimOp, code: Status) {
        self.lock().fail_next.insert(op, code);
    }

    /// Makes the next enqueued command complete with the (negative) status `code`.
    pub fn fail_next_execution(&self, code: Status) {
        self.lock().fail_execution = Some(code);
    }

    /// Current native reference count, `None` once the object is destroyed.
    pub fn refcount(&self, handle: RawHandle) -> Option<u32> {
        self.lock().objects.get(&handle).map(|o| o.refs)
    }

    pub fn is_live(&self, handle: RawHandle) -> bool {
        self.lock().objects.contains_key(&handle)
    }

    pub fn live_objects(&self, kind: ObjectKind) -> usize {
        self.lock().objects.values().filter(|o| o.kind == kind).count()
    }

    /// How many times `handle` was destroyed (0 or 1 for a well-behaved client).
    pub fn destroy_count(&self, handle: RawHandle) -> usize {
        self.lock().destroyed.iter().filter(|(_, h)| *h == handle).count()
    }

    pub fn kernel_arg(&self, kernel: RawHandle, index: u32) -> Option<SimArg> {
        match &self.lock().objects.get(&kernel)?.body {
            Body::Kernel { args, .. } => args.get(&index).copied(),
            _ => None,
        }
    }

    /// Every successful `enqueue_task`, with the arguments bound at that moment.
    pub fn launches(&self) -> Vec<(RawHandle, Vec<SimArg>)> {
        self.lock().launches.clone()
    }

    pub fn buffer_contents(&self, mem: RawHandle) -> Option<Vec<u8>> {
        match &self.lock().objects.get(&mem)?.body {
            Body::Mem { data } => Some(data.clone()),
            _ => None,
        }
    }
}

impl SimState {
    /// Counts the call and consumes an injected failure for `op`.
    fn enter(&mut self, op: SimOp) -> Result<(), Status> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.fail_next.remove(&op) {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    fn insert(&mut self, kind: ObjectKind, parent: Option<RawHandle>, body: Body) -> RawHandle {
        self.next_id += 0x10;
        let handle = RawHandle(self.next_id);
        if let Some(p) = parent {
            if let Some(obj) = self.objects.get_mut(&p) {
                obj.refs += 1;
            }
        }
        self.objects.insert(handle, Object { kind, refs: 1, parent, body });
        handle
    }

    fn object(&self, handle: RawHandle, kind: ObjectKind) -> Result<&Object, Status> {
        match self.objects.get(&handle) {
            Some(obj) if obj.kind == kind => Ok(obj),
            _ => Err(invalid_status(kind)),
        }
    }

    fn object_mut(&mut self, handle: RawHandle, kind: ObjectKind) -> Result<&mut Object, Status> {
        match self.objects.get_mut(&handle) {
            Some(obj) if obj.kind == kind => Ok(obj),
            _ => Err(invalid_status(kind)),
        }
    }

    fn context_devices(&self, context: RawHandle) -> Result<&[DeviceId], Status> {
        match &self.object(context, ObjectKind::Context)?.body {
            Body::Context { devices } => Ok(devices),
            _ => Err(status::INVALID_CONTEXT),
        }
    }

    fn program(&self, handle: RawHandle) -> Result<&ProgramBody, Status> {
        match &self.object(handle, ObjectKind::Program)?.body {
            Body::Program(p) => Ok(p),
            _ => Err(status::INVALID_PROGRAM),
        }
    }

    fn program_mut(&mut self, handle: RawHandle) -> Result<&mut ProgramBody, Status> {
        match &mut self.object_mut(handle, ObjectKind::Program)?.body {
            Body::Program(p) => Ok(p),
            _ => Err(status::INVALID_PROGRAM),
        }
    }

    fn mem_data(&mut self, handle: RawHandle) -> Result<&mut Vec<u8>, Status> {
        match &mut self.object_mut(handle, ObjectKind::Mem)?.body {
            Body::Mem { data } => Ok(data),
            _ => Err(status::INVALID_MEM_OBJECT),
        }
    }

    /// Drops one reference; destroys the object and releases its parent at zero.
    fn release(&mut self, handle: RawHandle) {
        let mut next = Some(handle);
        while let Some(h) = next.take() {
            let Some(obj) = self.objects.get_mut(&h) else { break };
            obj.refs -= 1;
            if obj.refs == 0 {
                if let Some(obj) = self.objects.remove(&h) {
                    self.destroyed.push((obj.kind, h));
                    next = obj.parent;
                }
            }
        }
    }
}

fn invalid_status(kind: ObjectKind) -> Status {
    match kind {
        ObjectKind::Context => status::INVALID_CONTEXT,
        ObjectKind::Queue => status::INVALID_COMMAND_QUEUE,
        ObjectKind::Mem => status::INVALID_MEM_OBJECT,
        ObjectKind::Program => status::INVALID_PROGRAM,
        ObjectKind::Kernel => status::INVALID_KERNEL,
        ObjectKind::Event => status::INVALID_EVENT,
    }
}

/// Finds every `__kernel void name(params)` declaration in `source`.
fn scan_kernels(source: &str) -> Vec<KernelDecl> {
    const MARKER: &str = "__kernel void ";
    let mut found = Vec::new();
    let mut rest = source;
    while let Some(pos) = rest.find(MARKER) {
        rest = &rest[pos + MARKER.len()..];
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let after = rest[name.len()..].trim_start();
        let Some(params) = after.strip_prefix('(').and_then(|p| p.split(')').next()) else {
            continue;
        };
        let params = params.trim();
        let num_args = if params.is_empty() || params == "void" {
            0
        } else {
            params.split(',').count() as u32
        };
        if !name.is_empty() {
            found.push(KernelDecl { name, num_args });
        }
    }
    found
}

/// Lines carrying an `#error` directive become compile diagnostics.
fn diagnose(source: &str) -> Option<String> {
    let errors: Vec<String> = source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            line.trim_start()
                .strip_prefix("#error")
                .map(|msg| format!("<source>:{}: error: {}", i + 1, msg.trim()))
        })
        .collect();
    (!errors.is_empty()).then(|| errors.join("\n"))
}

fn binary_for(program: &ProgramBody, device_index: usize) -> Vec<u8> {
    if !program.compiled {
        return Vec::new();
    }
    let names: Vec<&str> = program.kernels.iter().map(|k| k.name.as_str()).collect();
    format!("simbin{}:{}", "#".repeat(device_index + 1), names.join(";")).into_bytes()
}

impl NativeApi for SimRuntime {
    fn retain(&self, kind: ObjectKind, handle: RawHandle) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::Retain)?;
        st.object_mut(handle, kind)?.refs += 1;
        Ok(())
    }

    fn release(&self, kind: ObjectKind, handle: RawHandle) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::Release)?;
        st.object(handle, kind)?;
        st.release(handle);
        Ok(())
    }

    fn create_context(&self, devices: &[DeviceId]) -> Result<RawHandle, Status> {
        let mut st = self.lock();
        st.enter(SimOp::CreateContext)?;
        if devices.is_empty() {
            return Err(status::INVALID_VALUE);
        }
        if devices.iter().any(|d| !st.devices.contains(d)) {
            return Err(status::INVALID_DEVICE);
        }
        Ok(st.insert(ObjectKind::Context, None, Body::Context { devices: devices.to_vec() }))
    }

    fn context_devices(&self, context: RawHandle) -> Result<Vec<DeviceId>, Status> {
        let mut st = self.lock();
        st.enter(SimOp::Info)?;
        st.context_devices(context).map(<[DeviceId]>::to_vec)
    }

    fn create_queue(&self, context: RawHandle, device: DeviceId) -> Result<RawHandle, Status> {
        let mut st = self.lock();
        st.enter(SimOp::CreateQueue)?;
        if !st.context_devices(context)?.contains(&device) {
            return Err(status::INVALID_DEVICE);
        }
        Ok(st.insert(ObjectKind::Queue, Some(context), Body::Queue { context }))
    }

    fn create_buffer(
        &self,
        context: RawHandle,
        _flags: MemFlags,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<RawHandle, Status> {
        let mut st = self.lock();
        st.enter(SimOp::CreateBuffer)?;
        st.context_devices(context)?;
        if size == 0 {
            return Err(status::INVALID_BUFFER_SIZE);
        }
        let data = match host_data {
            Some(bytes) if bytes.len() != size => return Err(status::INVALID_VALUE),
            Some(bytes) => bytes.to_vec(),
            None => vec![0; size],
        };
        Ok(st.insert(ObjectKind::Mem, Some(context), Body::Mem { data }))
    }

    fn enqueue_read_buffer(
        &self,
        queue: RawHandle,
        mem: RawHandle,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::ReadBuffer)?;
        st.object(queue, ObjectKind::Queue)?;
        let data = st.mem_data(mem)?;
        let end = offset.checked_add(dst.len()).ok_or(status::INVALID_VALUE)?;
        let src = data.get(offset..end).ok_or(status::INVALID_VALUE)?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn enqueue_write_buffer(
        &self,
        queue: RawHandle,
        mem: RawHandle,
        offset: usize,
        src: &[u8],
    ) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::WriteBuffer)?;
        st.object(queue, ObjectKind::Queue)?;
        let data = st.mem_data(mem)?;
        let end = offset.checked_add(src.len()).ok_or(status::INVALID_VALUE)?;
        data.get_mut(offset..end)
            .ok_or(status::INVALID_VALUE)?
            .copy_from_slice(src);
        Ok(())
    }

    fn create_program_with_source(&self, context: RawHandle, source: &str) -> Result<RawHandle, Status> {
        let mut st = self.lock();
        st.enter(SimOp::CreateProgram)?;
        let devices = st.context_devices(context)?.to_vec();
        if source.is_empty() {
            return Err(status::INVALID_VALUE);
        }
        let body = ProgramBody {
            context,
            devices,
            source: source.to_owned(),
            build_status: BUILD_NONE,
            ..Default::default()
        };
        Ok(st.insert(ObjectKind::Program, Some(context), Body::Program(body)))
    }

    fn compile_program(&self, program: RawHandle, devices: &[DeviceId], options: &str) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::Compile)?;
        let context = st.program(program)?.context;
        let known = st.context_devices(context)?.to_vec();
        if devices.iter().any(|d| !known.contains(d)) {
            return Err(status::INVALID_DEVICE);
        }
        let p = st.program_mut(program)?;
        if p.source.is_empty() || p.executable {
            return Err(status::INVALID_OPERATION);
        }
        if !devices.is_empty() {
            p.devices = devices.to_vec();
        }
        p.options = options.to_owned();
        match diagnose(&p.source) {
            Some(log) => {
                p.log = log;
                p.build_status = BUILD_ERROR;
                p.compiled = false;
                Err(status::COMPILE_PROGRAM_FAILURE)
            }
            None => {
                p.kernels = scan_kernels(&p.source);
                p.log.clear();
                p.build_status = BUILD_SUCCESS;
                p.compiled = true;
                Ok(())
            }
        }
    }

    fn link_program(
        &self,
        context: RawHandle,
        devices: &[DeviceId],
        options: &str,
        inputs: &[RawHandle],
    ) -> Result<RawHandle, Status> {
        let mut st = self.lock();
        st.enter(SimOp::Link)?;
        let known = st.context_devices(context)?.to_vec();
        if inputs.is_empty() {
            return Err(status::INVALID_VALUE);
        }
        if devices.iter().any(|d| !known.contains(d)) {
            return Err(status::INVALID_DEVICE);
        }
        let mut kernels: Vec<KernelDecl> = Vec::new();
        let mut sources = Vec::with_capacity(inputs.len());
        for &input in inputs {
            let p = st.program(input)?;
            if !p.compiled {
                return Err(status::INVALID_PROGRAM);
            }
            if p.context != context {
                return Err(status::INVALID_CONTEXT);
            }
            for k in &p.kernels {
                if kernels.iter().any(|existing| existing.name == k.name) {
                    return Err(status::LINK_PROGRAM_FAILURE);
                }
                kernels.push(k.clone());
            }
            sources.push(p.source.clone());
        }
        let body = ProgramBody {
            context,
            devices: if devices.is_empty() { known } else { devices.to_vec() },
            source: sources.join("\n"),
            kernels,
            compiled: true,
            executable: true,
            options: options.to_owned(),
            log: String::new(),
            build_status: BUILD_SUCCESS,
        };
        Ok(st.insert(ObjectKind::Program, Some(context), Body::Program(body)))
    }

    fn program_info(&self, program: RawHandle, param: ProgramInfo) -> Result<InfoValue, Status> {
        let mut st = self.lock();
        st.enter(SimOp::Info)?;
        let refs = st.object(program, ObjectKind::Program)?.refs;
        let p = st.program(program)?;
        let value = match param {
            ProgramInfo::ReferenceCount => InfoValue::Uint(refs as u64),
            ProgramInfo::Context => InfoValue::Handle(p.context),
            ProgramInfo::NumDevices => InfoValue::Uint(p.devices.len() as u64),
            ProgramInfo::Devices => InfoValue::Devices(p.devices.clone()),
            ProgramInfo::Source => InfoValue::Str(p.source.clone()),
            ProgramInfo::BinarySizes => InfoValue::Sizes(
                (0..p.devices.len()).map(|i| binary_for(p, i).len()).collect(),
            ),
            ProgramInfo::Binaries => InfoValue::Bytes(
                (0..p.devices.len()).flat_map(|i| binary_for(p, i)).collect(),
            ),
            ProgramInfo::NumKernels | ProgramInfo::KernelNames if !p.executable => {
                return Err(status::INVALID_PROGRAM_EXECUTABLE);
            }
            ProgramInfo::NumKernels => InfoValue::Uint(p.kernels.len() as u64),
            ProgramInfo::KernelNames => InfoValue::Str(
                p.kernels.iter().map(|k| k.name.as_str()).collect::<Vec<_>>().join(";"),
            ),
        };
        Ok(value)
    }

    fn program_build_info(
        &self,
        program: RawHandle,
        device: DeviceId,
        param: BuildInfo,
    ) -> Result<InfoValue, Status> {
        let mut st = self.lock();
        st.enter(SimOp::Info)?;
        let p = st.program(program)?;
        if !p.devices.contains(&device) {
            return Err(status::INVALID_DEVICE);
        }
        Ok(match param {
            BuildInfo::Status => InfoValue::Int(p.build_status),
            BuildInfo::Options => InfoValue::Str(p.options.clone()),
            BuildInfo::Log => InfoValue::Str(p.log.clone()),
        })
    }

    fn create_kernel(&self, program: RawHandle, name: &str) -> Result<RawHandle, Status> {
        let mut st = self.lock();
        st.enter(SimOp::CreateKernel)?;
        let p = st.program(program)?;
        if !p.executable {
            return Err(status::INVALID_PROGRAM_EXECUTABLE);
        }
        let decl = p
            .kernels
            .iter()
            .find(|k| k.name == name)
            .cloned()
            .ok_or(status::INVALID_KERNEL_NAME)?;
        let body = Body::Kernel {
            program,
            name: decl.name,
            num_args: decl.num_args,
            args: BTreeMap::new(),
        };
        Ok(st.insert(ObjectKind::Kernel, Some(program), body))
    }

    fn create_kernels_in_program(&self, program: RawHandle) -> Result<Vec<RawHandle>, Status> {
        let mut st = self.lock();
        st.enter(SimOp::CreateKernel)?;
        let decls = {
            let p = st.program(program)?;
            if !p.executable {
                return Err(status::INVALID_PROGRAM_EXECUTABLE);
            }
            p.kernels.clone()
        };
        Ok(decls
            .into_iter()
            .map(|decl| {
                let body = Body::Kernel {
                    program,
                    name: decl.name,
                    num_args: decl.num_args,
                    args: BTreeMap::new(),
                };
                st.insert(ObjectKind::Kernel, Some(program), body)
            })
            .collect())
    }

    fn kernel_info(&self, kernel: RawHandle, param: KernelInfo) -> Result<InfoValue, Status> {
        let mut st = self.lock();
        st.enter(SimOp::Info)?;
        let obj = st.object(kernel, ObjectKind::Kernel)?;
        let Body::Kernel { program, name, num_args, .. } = &obj.body else {
            return Err(status::INVALID_KERNEL);
        };
        Ok(match param {
            KernelInfo::FunctionName => InfoValue::Str(name.clone()),
            KernelInfo::NumArgs => InfoValue::Uint(*num_args as u64),
            KernelInfo::ReferenceCount => InfoValue::Uint(obj.refs as u64),
            KernelInfo::Program => InfoValue::Handle(*program),
            KernelInfo::Context => InfoValue::Handle(st.program(*program)?.context),
        })
    }

    fn set_kernel_arg_mem(&self, kernel: RawHandle, index: u32, mem: RawHandle) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::SetArg)?;
        st.object(mem, ObjectKind::Mem)?;
        set_arg(&mut st, kernel, index, SimArg::Mem(mem))
    }

    fn set_kernel_arg_local(&self, kernel: RawHandle, index: u32, size: usize) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::SetArg)?;
        if size == 0 {
            return Err(status::INVALID_ARG_SIZE);
        }
        set_arg(&mut st, kernel, index, SimArg::Local(size))
    }

    fn enqueue_task(&self, queue: RawHandle, kernel: RawHandle) -> Result<RawHandle, Status> {
        let mut st = self.lock();
        st.enter(SimOp::EnqueueTask)?;
        let queue_context = match &st.object(queue, ObjectKind::Queue)?.body {
            Body::Queue { context } => *context,
            _ => return Err(status::INVALID_COMMAND_QUEUE),
        };
        let Body::Kernel { program, num_args, args, .. } = &st.object(kernel, ObjectKind::Kernel)?.body else {
            return Err(status::INVALID_KERNEL);
        };
        let p = st.program(*program)?;
        if !p.executable {
            return Err(status::INVALID_PROGRAM_EXECUTABLE);
        }
        if p.context != queue_context {
            return Err(status::INVALID_CONTEXT);
        }
        if (0..*num_args).any(|i| !args.contains_key(&i)) {
            return Err(status::INVALID_KERNEL_ARGS);
        }
        let bound: Vec<SimArg> = args.values().copied().collect();
        st.launches.push((kernel, bound));
        let exec = st.fail_execution.take().unwrap_or(EXEC_COMPLETE);
        Ok(st.insert(ObjectKind::Event, Some(queue), Body::Event { status: exec }))
    }

    fn wait_for_events(&self, events: &[RawHandle]) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::WaitEvents)?;
        if events.is_empty() {
            return Err(status::INVALID_VALUE);
        }
        let mut failed = false;
        for &event in events {
            if let Body::Event { status: exec } = st.object(event, ObjectKind::Event)?.body {
                failed |= exec < 0;
            }
        }
        if failed {
            Err(status::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST)
        } else {
            Ok(())
        }
    }

    fn event_status(&self, event: RawHandle) -> Result<Status, Status> {
        let mut st = self.lock();
        st.enter(SimOp::Info)?;
        match st.object(event, ObjectKind::Event)?.body {
            Body::Event { status: exec } => Ok(exec),
            _ => Err(status::INVALID_EVENT),
        }
    }

    fn finish(&self, queue: RawHandle) -> Result<(), Status> {
        let mut st = self.lock();
        st.enter(SimOp::Finish)?;
        st.object(queue, ObjectKind::Queue).map(|_| ())
    }
}

fn set_arg(st: &mut SimState, kernel: RawHandle, index: u32, arg: SimArg) -> Result<(), Status> {
    match &mut st.object_mut(kernel, ObjectKind::Kernel)?.body {
        Body::Kernel { num_args, args, .. } => {
            if index >= *num_args {
                return Err(status::INVALID_ARG_INDEX);
            }
            args.insert(index, arg);
            Ok(())
        }
        _ => Err(status::INVALID_KERNEL),
    }
}
