//! Native status codes (subset of the OpenCL 1.2 `cl_int` error table).

use super::Status;

pub const SUCCESS: Status = 0;
pub const DEVICE_NOT_FOUND: Status = -1;
pub const DEVICE_NOT_AVAILABLE: Status = -2;
pub const COMPILER_NOT_AVAILABLE: Status = -3;
pub const MEM_OBJECT_ALLOCATION_FAILURE: Status = -4;
pub const OUT_OF_RESOURCES: Status = -5;
pub const OUT_OF_HOST_MEMORY: Status = -6;
pub const BUILD_PROGRAM_FAILURE: Status = -11;
pub const COMPILE_PROGRAM_FAILURE: Status = -15;
pub const LINKER_NOT_AVAILABLE: Status = -16;
pub const LINK_PROGRAM_FAILURE: Status = -17;
pub const EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST: Status = -14;
pub const INVALID_VALUE: Status = -30;
pub const INVALID_DEVICE: Status = -33;
pub const INVALID_CONTEXT: Status = -34;
pub const INVALID_COMMAND_QUEUE: Status = -36;
pub const INVALID_MEM_OBJECT: Status = -38;
pub const INVALID_BINARY: Status = -42;
pub const INVALID_BUILD_OPTIONS: Status = -43;
pub const INVALID_PROGRAM: Status = -44;
pub const INVALID_PROGRAM_EXECUTABLE: Status = -45;
pub const INVALID_KERNEL_NAME: Status = -46;
pub const INVALID_KERNEL: Status = -48;
pub const INVALID_ARG_INDEX: Status = -49;
pub const INVALID_ARG_VALUE: Status = -50;
pub const INVALID_ARG_SIZE: Status = -51;
pub const INVALID_KERNEL_ARGS: Status = -52;
pub const INVALID_EVENT: Status = -58;
pub const INVALID_OPERATION: Status = -59;
pub const INVALID_BUFFER_SIZE: Status = -61;

/// Symbolic name of a status code, `"CL_UNKNOWN_ERROR"` for codes outside the table.
pub fn name(code: Status) -> &'static str {
    match code {
        SUCCESS => "CL_SUCCESS",
        DEVICE_NOT_FOUND => "CL_DEVICE_NOT_FOUND",
        DEVICE_NOT_AVAILABLE => "CL_DEVICE_NOT_AVAILABLE",
        COMPILER_NOT_AVAILABLE => "CL_COMPILER_NOT_AVAILABLE",
        MEM_OBJECT_ALLOCATION_FAILURE => "CL_MEM_OBJECT_ALLOCATION_FAILURE",
        OUT_OF_RESOURCES => "CL_OUT_OF_RESOURCES",
        OUT_OF_HOST_MEMORY => "CL_OUT_OF_HOST_MEMORY",
        BUILD_PROGRAM_FAILURE => "CL_BUILD_PROGRAM_FAILURE",
        EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST => "CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST",
        COMPILE_PROGRAM_FAILURE => "CL_COMPILE_PROGRAM_FAILURE",
        LINKER_NOT_AVAILABLE => "CL_LINKER_NOT_AVAILABLE",
        LINK_PROGRAM_FAILURE => "CL_LINK_PROGRAM_FAILURE",
        INVALID_VALUE => "CL_INVALID_VALUE",
        INVALID_DEVICE => "CL_INVALID_DEVICE",
        INVALID_CONTEXT => "CL_INVALID_CONTEXT",
        INVALID_COMMAND_QUEUE => "CL_INVALID_COMMAND_QUEUE",
        INVALID_MEM_OBJECT => "CL_INVALID_MEM_OBJECT",
        INVALID_BINARY => "CL_INVALID_BINARY",
        INVALID_BUILD_OPTIONS => "CL_INVALID_BUILD_OPTIONS",
        INVALID_PROGRAM => "CL_INVALID_PROGRAM",
        INVALID_PROGRAM_EXECUTABLE => "CL_INVALID_PROGRAM_EXECUTABLE",
        INVALID_KERNEL_NAME => "CL_INVALID_KERNEL_NAME",
        INVALID_KERNEL => "CL_INVALID_KERNEL",
        INVALID_ARG_INDEX => "CL_INVALID_ARG_INDEX",
        INVALID_ARG_VALUE => "CL_INVALID_ARG_VALUE",
        INVALID_ARG_SIZE => "CL_INVALID_ARG_SIZE",
        INVALID_KERNEL_ARGS => "CL_INVALID_KERNEL_ARGS",
        INVALID_EVENT => "CL_INVALID_EVENT",
        INVALID_OPERATION => "CL_INVALID_OPERATION",
        INVALID_BUFFER_SIZE => "CL_INVALID_BUFFER_SIZE",
        _ => "CL_UNKNOWN_ERROR",
    }
}
