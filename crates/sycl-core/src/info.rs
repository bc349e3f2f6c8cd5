//! Typed get-info parameters.
//!
//! Each marker type names one native info query and the Rust type its answer
//! converts to, so `program.get_info::<info::program::Devices>()` returns a
//! `Vec<DeviceId>` without the caller touching [`InfoValue`](crate::native::InfoValue).

use crate::native::{DeviceId, KernelInfo, NativeApi, ProgramInfo, RawHandle, Status, status};

/// A program info query with a typed result.
pub trait ProgramParam {
    type Output;

    fn query(api: &dyn NativeApi, program: RawHandle) -> Result<Self::Output, Status>;
}

/// A kernel info query with a typed result.
pub trait KernelParam {
    type Output;

    fn query(api: &dyn NativeApi, kernel: RawHandle) -> Result<Self::Output, Status>;
}

fn to_u32(v: u64) -> Result<u32, Status> {
    u32::try_from(v).map_err(|_| status::INVALID_VALUE)
}

fn to_usize(v: u64) -> Result<usize, Status> {
    usize::try_from(v).map_err(|_| status::INVALID_VALUE)
}

macro_rules! info_param {
    ($trait:ident, $call:ident, $param:path, $name:ident -> $out:ty, |$v:ident| $conv:expr) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl $crate::info::$trait for $name {
            type Output = $out;

            fn query(
                api: &dyn $crate::native::NativeApi,
                raw: $crate::native::RawHandle,
            ) -> Result<$out, $crate::native::Status> {
                let $v: $crate::native::InfoValue = api.$call(raw, $param)?;
                $conv
            }
        }
    };
}

pub mod program {
    use super::*;

    info_param!(ProgramParam, program_info, ProgramInfo::ReferenceCount, ReferenceCount -> u32,
        |v| to_u32(v.into_uint()?));
    info_param!(ProgramParam, program_info, ProgramInfo::Context, Context -> RawHandle,
        |v| v.into_handle());
    info_param!(ProgramParam, program_info, ProgramInfo::NumDevices, NumDevices -> u32,
        |v| to_u32(v.into_uint()?));
    info_param!(ProgramParam, program_info, ProgramInfo::Devices, Devices -> Vec<DeviceId>,
        |v| v.into_devices());
    info_param!(ProgramParam, program_info, ProgramInfo::Source, Source -> String,
        |v| v.into_string());
    info_param!(ProgramParam, program_info, ProgramInfo::BinarySizes, BinarySizes -> Vec<usize>,
        |v| v.into_sizes());
    info_param!(ProgramParam, program_info, ProgramInfo::NumKernels, NumKernels -> usize,
        |v| to_usize(v.into_uint()?));
    info_param!(ProgramParam, program_info, ProgramInfo::KernelNames, KernelNames -> Vec<String>,
        |v| Ok(split_names(&v.into_string()?)));

    /// One binary per device, in device order.
    ///
    /// The native call fills a single shared byte buffer; it is sliced using
    /// the sizes reported by [`BinarySizes`].
    #[derive(Debug, Clone, Copy)]
    pub struct Binaries;

    impl ProgramParam for Binaries {
        type Output = Vec<Vec<u8>>;

        fn query(api: &dyn NativeApi, raw: RawHandle) -> Result<Vec<Vec<u8>>, Status> {
            let sizes = BinarySizes::query(api, raw)?;
            let bytes = api.program_info(raw, ProgramInfo::Binaries)?.into_bytes()?;
            if sizes.iter().sum::<usize>() != bytes.len() {
                return Err(status::INVALID_BINARY);
            }
            let mut rest = bytes.as_slice();
            Ok(sizes
                .into_iter()
                .map(|n| {
                    let (head, tail) = rest.split_at(n);
                    rest = tail;
                    head.to_vec()
                })
                .collect())
        }
    }

    fn split_names(joined: &str) -> Vec<String> {
        joined
            .split(';')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

pub mod kernel {
    use super::*;

    info_param!(KernelParam, kernel_info, KernelInfo::FunctionName, FunctionName -> String,
        |v| v.into_string());
    info_param!(KernelParam, kernel_info, KernelInfo::NumArgs, NumArgs -> u32,
        |v| to_u32(v.into_uint()?));
    info_param!(KernelParam, kernel_info, KernelInfo::ReferenceCount, ReferenceCount -> u32,
        |v| to_u32(v.into_uint()?));
    info_param!(KernelParam, kernel_info, KernelInfo::Context, Context -> RawHandle,
        |v| v.into_handle());
    info_param!(KernelParam, kernel_info, KernelInfo::Program, Program -> RawHandle,
        |v| v.into_handle());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::sim::SimRuntime;

    fn executable(sim: &SimRuntime) -> RawHandle {
        let ctx = sim.create_context(&sim.devices()).unwrap();
        let prog = sim
            .create_program_with_source(ctx, "__kernel void a(__global int* x) {\n}\n__kernel void b() {\n}\n")
            .unwrap();
        sim.compile_program(prog, &[], "").unwrap();
        sim.link_program(ctx, &[], "", &[prog]).unwrap()
    }

    #[test]
    fn binaries_are_sliced_per_device() {
        let sim = SimRuntime::with_devices(3);
        let exe = executable(&sim);
        let sizes = program::BinarySizes::query(&sim, exe).unwrap();
        let blobs = program::Binaries::query(&sim, exe).unwrap();
        assert_eq!(blobs.len(), 3);
        assert_eq!(blobs.iter().map(Vec::len).collect::<Vec<_>>(), sizes);
        assert_ne!(blobs[0], blobs[1]);
    }

    #[test]
    fn kernel_names_are_split() {
        let sim = SimRuntime::new();
        let exe = executable(&sim);
        assert_eq!(program::KernelNames::query(&sim, exe).unwrap(), ["a", "b"]);
        assert_eq!(program::NumKernels::query(&sim, exe).unwrap(), 2);
        let k = sim.create_kernel(exe, "a").unwrap();
        assert_eq!(kernel::NumArgs::query(&sim, k).unwrap(), 1);
        assert_eq!(kernel::Program::query(&sim, k).unwrap(), exe);
    }
}
