use std::sync::Arc;

use sycl_core::native::sim::{SimOp, SimRuntime};
use sycl_core::native::status;
use sycl_core::{
    AccessMode, Buffer, BuildState, ClError, Context, ErrorCode, IndexExpr, KernelFunctor, KernelSource, Program,
    Queue, Range, Result,
};

struct FillA<'a> {
    out: &'a Buffer<i32>,
}

impl KernelFunctor for FillA<'_> {
    const NAME: &'static str = "fill_a";

    fn define(&self, src: &mut KernelSource) -> Result<()> {
        let out = self.out.get_access(AccessMode::Write)?;
        out.at(src, IndexExpr::global_id(0))?.assign(src, 1);
        Ok(())
    }
}

struct FillB<'a> {
    out: &'a Buffer<i32>,
}

impl KernelFunctor for FillB<'_> {
    const NAME: &'static str = "fill_b";

    fn define(&self, src: &mut KernelSource) -> Result<()> {
        let out = self.out.get_access(AccessMode::Write)?;
        out.at(src, IndexExpr::global_id(0))?.assign(src, 2);
        Ok(())
    }
}

#[derive(Default)]
struct Idle;

impl KernelFunctor for Idle {
    const NAME: &'static str = "idle";

    fn define(&self, _src: &mut KernelSource) -> Result<()> {
        Ok(())
    }
}

fn setup() -> (Arc<SimRuntime>, Context, Buffer<i32>) {
    let sim = Arc::new(SimRuntime::new());
    let ctx = Context::new(sim.clone(), &sim.devices()).unwrap();
    let buf = Buffer::new(&ctx, Range::new([8])).unwrap();
    (sim, ctx, buf)
}

#[test]
#[should_panic(expected = "kernel `fill_a` is not built")]
fn get_kernel_before_build_panics() {
    let (_sim, ctx, _buf) = setup();
    let program = Program::new(&ctx);
    let _ = program.get_kernel::<FillA>();
}

#[test]
fn try_get_kernel_reports_unknown_names() {
    let (_sim, ctx, _buf) = setup();
    let program = Program::new(&ctx);
    let err = program.try_get_kernel("fill_a").unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::InvalidKernelName));
}

#[test]
fn built_kernel_carries_the_registered_name() {
    let (_sim, ctx, buf) = setup();
    let mut program = Program::new(&ctx);
    program.build(&FillA { out: &buf }, "").unwrap();
    let kernel = program.get_kernel::<FillA>();
    assert_eq!(kernel.name(), FillA::NAME);
    assert_eq!(kernel.program(), program.raw().unwrap());
    assert_eq!(kernel.context(), ctx.raw());
}

#[test]
fn two_functors_give_two_distinct_kernels() {
    let (_sim, ctx, buf) = setup();
    let mut program = Program::new(&ctx);
    program.compile(&FillA { out: &buf }, "").unwrap();
    program.compile(&FillB { out: &buf }, "").unwrap();
    program.link("").unwrap();
    let a = program.get_kernel::<FillA>();
    let b = program.get_kernel::<FillB>();
    assert_ne!(a.raw(), b.raw());
    assert_eq!((a.name(), b.name()), ("fill_a", "fill_b"));
}

#[test]
fn relinking_without_compile_is_idempotent() {
    let (sim, ctx, buf) = setup();
    let mut program = Program::new(&ctx);
    program.build(&FillA { out: &buf }, "").unwrap();
    let first = program.get_kernel::<FillA>().raw();
    program.link("").unwrap();
    program.link("-cl-opt-disable").unwrap();
    assert_eq!(sim.calls(SimOp::Link), 1);
    assert_eq!(program.get_kernel::<FillA>().raw(), first);
}

#[test]
fn relinking_after_compile_is_refused() {
    let (sim, ctx, buf) = setup();
    let mut program = Program::new(&ctx);
    program.build(&FillA { out: &buf }, "").unwrap();
    program.compile(&FillB { out: &buf }, "").unwrap();
    assert_eq!(program.state(), BuildState::Compiled);
    let err = program.link("").unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::RelinkAfterCompile));
    assert_eq!(sim.calls(SimOp::Link), 1);
    // the earlier executable is untouched
    assert!(program.is_linked());
    assert_eq!(program.get_kernel::<FillA>().name(), "fill_a");
    assert!(program.try_get_kernel("fill_b").is_err());
}

#[test]
fn empty_program_has_nothing_to_link() {
    let (sim, ctx, _buf) = setup();
    let mut program = Program::new(&ctx);
    let err = program.link("").unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::NothingToLink));
    assert_eq!(sim.calls(SimOp::Link), 0);
    assert_eq!(program.state(), BuildState::Unlinked);
}

#[test]
fn compile_failure_surfaces_the_build_log() {
    let (_sim, ctx, _buf) = setup();
    let mut program = Program::new(&ctx);
    let err = program
        .build_with(
            "broken",
            |src| {
                src.statement("int x = 1;");
                src.statement("#error unknown identifier `y`");
                Ok(())
            },
            "",
        )
        .unwrap_err();
    let ClError::Build { kernel, code, log } = &err else {
        panic!("expected a build error, got {err:?}");
    };
    assert_eq!(kernel, "broken");
    assert_eq!(*code, status::COMPILE_PROGRAM_FAILURE);
    assert!(log.contains("<source>:3: error: unknown identifier `y`"), "{log}");
    assert!(err.to_string().contains("CL_COMPILE_PROGRAM_FAILURE"));
}

#[test]
fn link_programs_combines_compiled_units() {
    let (sim, ctx, buf) = setup();
    let mut left = Program::new(&ctx);
    left.compile(&FillA { out: &buf }, "").unwrap();
    let mut right = Program::new(&ctx);
    right.compile(&FillB { out: &buf }, "").unwrap();

    let both = Program::link_programs(&[left, right], "").unwrap();
    assert!(both.is_linked());
    assert_eq!(both.state(), BuildState::Linked);
    assert_eq!(both.kernel_names().collect::<Vec<_>>(), ["fill_a", "fill_b"]);
    assert_eq!(sim.calls(SimOp::Link), 1);

    let queue = Queue::new(&ctx, sim.devices()[0]).unwrap();
    both.get_kernel::<FillB>().enqueue_task(&queue).unwrap().wait().unwrap();
}

#[test]
fn link_programs_needs_at_least_one_program() {
    let err = Program::link_programs(&[], "").unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::EmptyProgramList));
}

#[test]
fn duplicate_kernel_names_fail_the_native_link() {
    let (_sim, ctx, buf) = setup();
    let mut first = Program::new(&ctx);
    first.compile(&FillA { out: &buf }, "").unwrap();
    let mut second = Program::new(&ctx);
    second.compile(&FillA { out: &buf }, "").unwrap();
    let err = Program::link_programs(&[first, second], "").unwrap_err();
    assert_eq!(err.status(), Some(status::LINK_PROGRAM_FAILURE));
}

#[test]
fn build_from_kernel_name_constructs_the_functor() {
    let (_sim, ctx, _buf) = setup();
    let mut program = Program::new(&ctx);
    program.build_from_kernel_name::<Idle>("-DIDLE").unwrap();
    assert_eq!(program.get_kernel::<Idle>().name(), "idle");
    assert_eq!(program.build_options().unwrap(), "");
    assert_eq!(program.kernel_names().count(), 1);
}

#[test]
fn program_from_raw_handle_is_linked_at_once() {
    let (sim, ctx, buf) = setup();
    let mut built = Program::new(&ctx);
    built.build(&FillA { out: &buf }, "").unwrap();
    let raw = built.raw().unwrap();

    let wrapped = Program::from_raw(&ctx, raw).unwrap();
    assert!(wrapped.is_linked());
    // two holders plus one implicit reference per kernel
    assert_eq!(sim.refcount(raw), Some(4));
    let kernel = wrapped.get_kernel_by_name("fill_a");
    assert!(kernel.source().is_none());
    drop(built);
    assert!(sim.is_live(raw));
}

#[test]
fn kernel_enqueue_binds_generated_arguments() {
    let (sim, ctx, buf) = setup();
    let queue = Queue::new(&ctx, sim.devices()[0]).unwrap();
    let mut program = Program::new(&ctx);
    program.build(&FillA { out: &buf }, "").unwrap();
    let kernel = program.get_kernel::<FillA>();
    let event = kernel.enqueue_task(&queue).unwrap();
    event.wait().unwrap();
    assert_eq!(
        sim.kernel_arg(kernel.raw(), 0),
        Some(sycl_core::native::sim::SimArg::Mem(buf.mem()))
    );
}

#[test]
fn enqueue_failure_is_reported_synchronously() {
    let (sim, ctx, buf) = setup();
    let queue = Queue::new(&ctx, sim.devices()[0]).unwrap();
    let mut program = Program::new(&ctx);
    program.build(&FillA { out: &buf }, "").unwrap();
    sim.fail_next(SimOp::EnqueueTask, status::OUT_OF_RESOURCES);
    let err = program.get_kernel::<FillA>().enqueue_task(&queue).unwrap_err();
    assert_eq!(err.status(), Some(status::OUT_OF_RESOURCES));
    assert_eq!(err.context(), Some(ctx.raw()));
    assert_eq!(sim.calls(SimOp::EnqueueTask), 1);
}

#[test]
fn build_options_reach_the_compiler_but_not_the_linker() {
    let (_sim, ctx, buf) = setup();
    let mut program = Program::new(&ctx);
    program.build(&FillA { out: &buf }, "-DFAST").unwrap();
    assert_eq!(program.build_options().unwrap(), "");

    let mut split = Program::new(&ctx);
    split.compile(&FillA { out: &buf }, "-DFAST").unwrap();
    split.link("-cl-denorms-are-zero").unwrap();
    assert_eq!(split.build_options().unwrap(), "-cl-denorms-are-zero");

    let mut closure = Program::new(&ctx);
    let body = |src: &mut KernelSource| -> Result<()> {
        let out = buf.get_access(AccessMode::Write)?;
        out.at(src, IndexExpr::global_id(0))?.assign(src, 3);
        Ok(())
    };
    closure.build_with("fill_c", body, "-DFAST").unwrap();
    assert_eq!(closure.build_options().unwrap(), "");
}
