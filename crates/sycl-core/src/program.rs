//! Program build pipeline.
//!
//! A [`Program`] collects compiled units, one per kernel name, and links them
//! into a single executable. Kernels become available once linked.
//!
//! ```text
//! Unlinked --compile--> Compiling --ok--> Compiled --link--> Linked
//!                           |                                  |
//!                           +--error: back to previous state   +--compile: Compiled, relink refused
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::context::Context;
use crate::error::{ClError, ErrorCode, Result, check, raise, report_code};
use crate::info::{self, ProgramParam};
use crate::kernel::Kernel;
use crate::kernel_source::{KernelFunctor, KernelSource};
use crate::native::{BuildInfo, DeviceId, RawHandle, status};
use crate::refc::{KernelKind, ProgramKind, Refc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Unlinked,
    Compiling,
    Compiled,
    Linked,
}

#[derive(Debug, Clone)]
struct Unit {
    object: Refc<ProgramKind>,
    source: Option<Arc<KernelSource>>,
}

#[derive(Debug)]
pub struct Program {
    context: Context,
    devices: Vec<DeviceId>,
    state: BuildState,
    /// A unit was compiled after the executable was linked.
    dirty: bool,
    units: BTreeMap<String, Unit>,
    executable: Option<Refc<ProgramKind>>,
    kernels: BTreeMap<String, Kernel>,
}

impl Program {
    /// Empty program for every device of `context`.
    pub fn new(context: &Context) -> Self {
        Self::empty(context, context.devices().to_vec())
    }

    /// Empty program for a subset of the context's devices.
    pub fn with_devices(context: &Context, devices: &[DeviceId]) -> Result<Self> {
        if devices.is_empty() || devices.iter().any(|d| !context.devices().contains(d)) {
            return Err(raise(status::INVALID_DEVICE, Some(context.raw())));
        }
        Ok(Self::empty(context, devices.to_vec()))
    }

    fn empty(context: &Context, devices: Vec<DeviceId>) -> Self {
        Program {
            context: context.clone(),
            devices,
            state: BuildState::Unlinked,
            dirty: false,
            units: BTreeMap::new(),
            executable: None,
            kernels: BTreeMap::new(),
        }
    }

    /// Wraps an existing native executable; the program is linked at once and
    /// holds one kernel per kernel the native program defines.
    pub fn from_raw(context: &Context, raw: RawHandle) -> Result<Self> {
        let exe = Refc::<ProgramKind>::retain(context.api().clone(), raw)?;
        let devices = check(info::program::Devices::query(context.api().as_ref(), raw), Some(context.raw()))?;
        let mut program = Self::empty(context, devices);
        program.kernels = program.kernels_in(&exe)?;
        program.executable = Some(exe);
        program.state = BuildState::Linked;
        Ok(program)
    }

    /// Links the compiled units of every program in `programs` into a new,
    /// already linked program on the first program's context and devices.
    pub fn link_programs(programs: &[Program], options: &str) -> Result<Self> {
        let Some(first) = programs.first() else {
            return Err(report_code(ErrorCode::EmptyProgramList, "link_programs", None));
        };
        let mut linked = Self::empty(&first.context, first.devices.clone());
        let mut inputs = Vec::new();
        for program in programs {
            for (name, unit) in &program.units {
                inputs.push(unit.object.get());
                linked.units.insert(name.clone(), unit.clone());
            }
        }
        linked.link_inputs(&inputs, options)?;
        Ok(linked)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn is_linked(&self) -> bool {
        self.executable.is_some()
    }

    /// Native executable, once linked.
    pub fn raw(&self) -> Option<RawHandle> {
        self.executable.as_ref().map(Refc::get)
    }

    /// Generates `functor`'s source and compiles it under `F::NAME`.
    pub fn compile<F: KernelFunctor>(&mut self, functor: &F, options: &str) -> Result<()> {
        self.compile_source(KernelSource::generate(functor)?, options)
    }

    /// Same as [`compile`](Self::compile) for a closure body.
    pub fn compile_with<B>(&mut self, name: &str, body: B, options: &str) -> Result<()>
    where
        B: FnOnce(&mut KernelSource) -> Result<()>,
    {
        self.compile_source(KernelSource::generate_with(name, body)?, options)
    }

    pub fn compile_from_kernel_name<F: KernelFunctor + Default>(&mut self, options: &str) -> Result<()> {
        self.compile(&F::default(), options)
    }

    /// Compiles generated source into a unit registered under the source's name.
    ///
    /// On failure the state reverts and the error carries the build log.
    pub fn compile_source(&mut self, source: KernelSource, options: &str) -> Result<()> {
        let previous = self.state;
        self.state = BuildState::Compiling;
        match self.compile_unit(source, options) {
            Ok(()) => {
                self.state = BuildState::Compiled;
                self.dirty = self.executable.is_some();
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    fn compile_unit(&mut self, source: KernelSource, options: &str) -> Result<()> {
        #[cfg(feature = "metrics")]
        let start = Instant::now();
        let ctx = self.context.raw();
        let api = self.context.api();
        let raw = check(api.create_program_with_source(ctx, &source.text()), Some(ctx))?;
        let object = Refc::<ProgramKind>::adopt(api.clone(), raw);
        if let Err(code) = api.compile_program(raw, &self.devices, options) {
            let error = ClError::Build {
                kernel: source.name().to_owned(),
                code,
                log: self.collect_log(raw),
            };
            log::debug!("SYCL_ERROR:: {error}");
            return Err(error);
        }
        #[cfg(feature = "metrics")]
        crate::metrics::record("compile", start);
        log::debug!("compiled kernel `{}` as {raw:?}", source.name());
        let name = source.name().to_owned();
        let unit = Unit { object, source: Some(Arc::new(source)) };
        if self.units.insert(name.clone(), unit).is_some() {
            log::debug!("kernel `{name}` compiled again, replacing the earlier unit");
        }
        Ok(())
    }

    fn collect_log(&self, raw: RawHandle) -> String {
        let api = self.context.api();
        self.devices
            .iter()
            .filter_map(|&d| api.program_build_info(raw, d, BuildInfo::Log).ok()?.into_string().ok())
            .filter(|log| !log.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Links every compiled unit and creates their kernels.
    ///
    /// Linking again without an intervening compile does nothing. Linking
    /// again after one is refused with [`ErrorCode::RelinkAfterCompile`]; the
    /// existing executable and kernels stay usable.
    pub fn link(&mut self, options: &str) -> Result<()> {
        if self.executable.is_some() {
            if !self.dirty {
                log::trace!("program {:?} already linked", self.raw());
                return Ok(());
            }
            return Err(report_code(
                ErrorCode::RelinkAfterCompile,
                format!("program {:?}", self.raw()),
                Some(self.context.raw()),
            ));
        }
        let inputs: Vec<RawHandle> = self.units.values().map(|u| u.object.get()).collect();
        self.link_inputs(&inputs, options)
    }

    fn link_inputs(&mut self, inputs: &[RawHandle], options: &str) -> Result<()> {
        let ctx = self.context.raw();
        if inputs.is_empty() {
            return Err(report_code(ErrorCode::NothingToLink, "link", Some(ctx)));
        }
        #[cfg(feature = "metrics")]
        let start = Instant::now();
        let api = self.context.api();
        let raw = check(api.link_program(ctx, &self.devices, options, inputs), Some(ctx))?;
        let exe = Refc::<ProgramKind>::adopt(api.clone(), raw);
        let mut kernels = BTreeMap::new();
        for (name, unit) in &self.units {
            let k = check(api.create_kernel(raw, name), Some(ctx))?;
            kernels.insert(name.clone(), Kernel::adopt(api.clone(), k, unit.source.clone())?);
        }
        #[cfg(feature = "metrics")]
        crate::metrics::record("link", start);
        log::debug!("linked {} unit(s) into {raw:?}", inputs.len());
        self.kernels = kernels;
        self.executable = Some(exe);
        self.state = BuildState::Linked;
        self.dirty = false;
        Ok(())
    }

    fn kernels_in(&self, exe: &Refc<ProgramKind>) -> Result<BTreeMap<String, Kernel>> {
        let ctx = self.context.raw();
        let raws = check(exe.api().create_kernels_in_program(exe.get()), Some(ctx))?;
        // adopt every handle first so a failure releases all of them
        let adopted: Vec<Refc<KernelKind>> =
            raws.into_iter().map(|k| Refc::adopt(exe.api().clone(), k)).collect();
        let mut kernels = BTreeMap::new();
        for handle in adopted {
            let kernel = Kernel::from_raw(exe.api().clone(), handle.get())?;
            kernels.insert(kernel.name().to_owned(), kernel);
        }
        Ok(kernels)
    }

    /// `compile` followed by `link`.
    ///
    /// `options` reach the compiler only; the link step always runs with
    /// empty options. Call [`compile`](Self::compile) and [`link`](Self::link)
    /// separately to pass link options.
    pub fn build<F: KernelFunctor>(&mut self, functor: &F, options: &str) -> Result<()> {
        self.compile(functor, options)?;
        self.link("")
    }

    /// [`build`](Self::build) for a closure body; `options` are compile options.
    pub fn build_with<B>(&mut self, name: &str, body: B, options: &str) -> Result<()>
    where
        B: FnOnce(&mut KernelSource) -> Result<()>,
    {
        self.compile_with(name, body, options)?;
        self.link("")
    }

    /// Builds `F::default()`; `options` are compile options, as for [`build`](Self::build).
    pub fn build_from_kernel_name<F: KernelFunctor + Default>(&mut self, options: &str) -> Result<()> {
        self.compile_from_kernel_name::<F>(options)?;
        self.link("")
    }

    /// Kernel registered under `F::NAME`.
    ///
    /// # Panics
    ///
    /// If `F` was never built into this program.
    pub fn get_kernel<F: KernelFunctor>(&self) -> Kernel {
        self.get_kernel_by_name(F::NAME)
    }

    /// # Panics
    ///
    /// If no kernel is registered under `name`.
    pub fn get_kernel_by_name(&self, name: &str) -> Kernel {
        match self.kernels.get(name) {
            Some(kernel) => kernel.clone(),
            None => panic!("kernel `{name}` is not built into program {:?}", self.raw()),
        }
    }

    pub fn try_get_kernel(&self, name: &str) -> Result<Kernel> {
        self.kernels.get(name).cloned().ok_or_else(|| {
            report_code(
                ErrorCode::InvalidKernelName,
                format!("`{name}` in program {:?}", self.raw()),
                Some(self.context.raw()),
            )
        })
    }

    /// Names of the kernels available after linking.
    pub fn kernel_names(&self) -> impl Iterator<Item = &str> {
        self.kernels.keys().map(String::as_str)
    }

    fn executable(&self) -> Result<&Refc<ProgramKind>> {
        self.executable.as_ref().ok_or_else(|| {
            report_code(ErrorCode::ProgramNotBuilt, format!("{:?}", self.state), Some(self.context.raw()))
        })
    }

    /// Typed native info query on the linked executable.
    pub fn get_info<P: ProgramParam>(&self) -> Result<P::Output> {
        let exe = self.executable()?;
        check(P::query(exe.api().as_ref(), exe.get()), Some(self.context.raw()))
    }

    pub fn binaries(&self) -> Result<Vec<Vec<u8>>> {
        self.get_info::<info::program::Binaries>()
    }

    pub fn binary_sizes(&self) -> Result<Vec<usize>> {
        self.get_info::<info::program::BinarySizes>()
    }

    /// Options the executable was linked with, as reported for the first device.
    pub fn build_options(&self) -> Result<String> {
        let exe = self.executable()?;
        let Some(&device) = self.devices.first() else {
            return Err(raise(status::INVALID_DEVICE, Some(self.context.raw())));
        };
        let value = check(
            exe.api().program_build_info(exe.get(), device, BuildInfo::Options),
            Some(self.context.raw()),
        )?;
        check(value.into_string(), Some(self.context.raw()))
    }

    /// Build log of the executable across all devices.
    pub fn build_log(&self) -> Result<String> {
        Ok(self.collect_log(self.executable()?.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::sim::{SimOp, SimRuntime};
    use crate::native::NativeApi;

    struct Noop;

    impl KernelFunctor for Noop {
        const NAME: &'static str = "noop";

        fn define(&self, src: &mut KernelSource) -> Result<()> {
            src.statement("return;");
            Ok(())
        }
    }

    fn context() -> (Arc<SimRuntime>, Context) {
        let sim = Arc::new(SimRuntime::with_devices(2));
        let ctx = Context::new(sim.clone(), &sim.devices()).unwrap();
        (sim, ctx)
    }

    #[test]
    fn states_follow_the_pipeline() {
        let (_sim, ctx) = context();
        let mut program = Program::new(&ctx);
        assert_eq!(program.state(), BuildState::Unlinked);
        program.compile(&Noop, "").unwrap();
        assert_eq!(program.state(), BuildState::Compiled);
        assert!(!program.is_linked());
        program.link("").unwrap();
        assert_eq!(program.state(), BuildState::Linked);
        assert_eq!(program.kernel_names().collect::<Vec<_>>(), ["noop"]);
    }

    #[test]
    fn failed_compile_reverts_state_and_carries_log() {
        let (sim, ctx) = context();
        let mut program = Program::new(&ctx);
        let err = program
            .compile_with("broken", |src| {
                src.statement("#error missing semicolon");
                Ok(())
            }, "-Werror")
            .unwrap_err();
        assert_eq!(program.state(), BuildState::Unlinked);
        match err {
            ClError::Build { kernel, code, log } => {
                assert_eq!(kernel, "broken");
                assert_eq!(code, status::COMPILE_PROGRAM_FAILURE);
                assert!(log.contains("error: missing semicolon"));
            }
            other => panic!("expected a build error, got {other:?}"),
        }
        assert_eq!(sim.live_objects(crate::native::ObjectKind::Program), 0);
    }

    #[test]
    fn info_needs_an_executable() {
        let (_sim, ctx) = context();
        let mut program = Program::new(&ctx);
        let err = program.binaries().unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ProgramNotBuilt));
        program.build(&Noop, "").unwrap();
        assert_eq!(program.binaries().unwrap().len(), 2);
        assert_eq!(program.get_info::<info::program::NumDevices>().unwrap(), 2);
    }

    #[test]
    fn subset_devices_must_belong_to_the_context() {
        let (_sim, ctx) = context();
        assert!(Program::with_devices(&ctx, &[DeviceId(2)]).is_ok());
        let err = Program::with_devices(&ctx, &[DeviceId(9)]).unwrap_err();
        assert_eq!(err.status(), Some(status::INVALID_DEVICE));
    }

    #[test]
    fn from_raw_is_linked_with_every_kernel() {
        let (sim, ctx) = context();
        let prog = sim
            .create_program_with_source(ctx.raw(), "__kernel void x() {\n}\n__kernel void y() {\n}\n")
            .unwrap();
        sim.compile_program(prog, &[], "").unwrap();
        let exe = sim.link_program(ctx.raw(), &[], "", &[prog]).unwrap();
        let program = Program::from_raw(&ctx, exe).unwrap();
        assert!(program.is_linked());
        assert_eq!(program.kernel_names().collect::<Vec<_>>(), ["x", "y"]);
        sim.reset_calls();
        assert!(program.try_get_kernel("y").is_ok());
        assert_eq!(sim.calls(SimOp::CreateKernel), 0);
    }
}
