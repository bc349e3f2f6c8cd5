//! Buffers, accessors, programs and kernels on top of an OpenCL-style
//! native compute API.
//!
//! Kernels are described in code: a [`KernelFunctor`] writes its body into a
//! [`KernelSource`], indexing accessors along the way. Each accessor it
//! touches becomes a kernel parameter. A [`Program`] compiles and links the
//! generated source; a [`Queue`] runs the resulting [`Kernel`]s and collects
//! errors raised while they execute.
//!
//! Every native call goes through [`native::NativeApi`]. The in-process
//! [`native::sim::SimRuntime`] needs no driver; with feature `opencl`,
//! `native::opencl::OpenClApi` talks to the installed OpenCL runtime.

pub mod accessor;
pub mod buffer;
pub mod command_group;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod info;
pub mod kernel;
pub mod kernel_source;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod native;
pub mod program;
pub mod queue;
pub mod range;
pub mod refc;

pub use accessor::{AccessMode, AccessTarget, Accessor};
pub use buffer::{Buffer, Element};
pub use command_group::{CommandGroup, Handler};
pub use config::RuntimeConfig;
pub use context::Context;
pub use error::{AsyncHandler, ClError, ErrorCode, ExceptionList, Result, report, report_async, report_code};
pub use event::{Event, ExecStatus};
pub use kernel::Kernel;
pub use kernel_source::{ElementRef, IndexExpr, KernelFunctor, KernelSource};
#[cfg(feature = "metrics")]
pub use metrics::summary;
pub use program::{BuildState, Program};
pub use queue::Queue;
pub use range::{Id, Range};
pub use refc::Refc;
