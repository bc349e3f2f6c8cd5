//! Synchronous and asynchronous error reporting.
//!
//! Native calls return a raw [`Status`]; anything but success becomes a
//! [`ClError::Api`] on the spot. Contract violations that have no native
//! status use the [`ErrorCode`] table instead. Errors raised while a queue
//! executes are collected into an [`ExceptionList`] and handed to the queue's
//! [`AsyncHandler`]. Without a handler they are dropped after an optional
//! debug trace and never reach the caller.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config;
use crate::native::{RawHandle, Status, status};

pub type Result<T, E = ClError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClError {
    /// A native call returned a non-success status.
    #[error("native call failed with {} ({code})", status_label(.code))]
    Api { code: Status, context: Option<RawHandle> },

    /// A contract violation detected by the binding itself.
    #[error("{code}: {detail}")]
    Spec { code: ErrorCode, detail: String, context: Option<RawHandle> },

    /// Compiling generated kernel source failed; `log` holds the build log.
    #[error("compiling kernel `{kernel}` failed with {} ({code})\n{log}", status_label(.code))]
    Build { kernel: String, code: Status, log: String },
}

fn status_label(code: &Status) -> &'static str {
    status::name(*code)
}

impl ClError {
    /// Native status carried by the error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            ClError::Api { code, .. } | ClError::Build { code, .. } => Some(*code),
            ClError::Spec { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ClError::Spec { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Context the error originated from, when known.
    pub fn context(&self) -> Option<RawHandle> {
        match self {
            ClError::Api { context, .. } | ClError::Spec { context, .. } => *context,
            ClError::Build { .. } => None,
        }
    }
}

#[cfg(feature = "opencl")]
impl From<opencl3::error_codes::ClError> for ClError {
    fn from(e: opencl3::error_codes::ClError) -> Self {
        raise(e.0, None)
    }
}

/// Errors the binding reports without a native status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidKernelName,
    AccessorOutOfBounds,
    LocalAccessorOutsideCommandGroup,
    InvalidAccessorTarget,
    UnsupportedOperation,
    RelinkAfterCompile,
    NothingToLink,
    EmptyProgramList,
    ProgramNotBuilt,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::InvalidKernelName,
        ErrorCode::AccessorOutOfBounds,
        ErrorCode::LocalAccessorOutsideCommandGroup,
        ErrorCode::InvalidAccessorTarget,
        ErrorCode::UnsupportedOperation,
        ErrorCode::RelinkAfterCompile,
        ErrorCode::NothingToLink,
        ErrorCode::EmptyProgramList,
        ErrorCode::ProgramNotBuilt,
    ];

    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::InvalidKernelName => "no kernel registered under this name",
            ErrorCode::AccessorOutOfBounds => "accessor region exceeds the buffer range",
            ErrorCode::LocalAccessorOutsideCommandGroup => {
                "local accessor created outside a command group"
            }
            ErrorCode::InvalidAccessorTarget => "access target not valid for this use",
            ErrorCode::UnsupportedOperation => "operation not supported",
            ErrorCode::RelinkAfterCompile => "program already linked and compiled again since",
            ErrorCode::NothingToLink => "no compiled kernels to link",
            ErrorCode::EmptyProgramList => "cannot link an empty list of programs",
            ErrorCode::ProgramNotBuilt => "program has no linked executable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Synchronous reporting: `Ok` on success, otherwise the traced error.
pub fn report(code: Status, context: Option<RawHandle>) -> Result<()> {
    if code == status::SUCCESS {
        Ok(())
    } else {
        Err(raise(code, context))
    }
}

/// Synchronous reporting of a binding-level contract violation.
pub fn report_code(code: ErrorCode, detail: impl Into<String>, context: Option<RawHandle>) -> ClError {
    let error = ClError::Spec { code, detail: detail.into(), context };
    log::debug!("SYCL_ERROR:: {error}");
    error
}

pub(crate) fn raise(code: Status, context: Option<RawHandle>) -> ClError {
    let error = ClError::Api { code, context };
    log::debug!("SYCL_ERROR:: {error}");
    error
}

/// Maps the raw status of a native call result.
pub(crate) fn check<T>(result: Result<T, Status>, context: Option<RawHandle>) -> Result<T> {
    result.map_err(|code| raise(code, context))
}

/// Ordered errors collected during queue execution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExceptionList {
    errors: Vec<ClError>,
}

impl ExceptionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ClError) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClError> {
        self.errors.iter()
    }

    pub(crate) fn take(&mut self) -> ExceptionList {
        std::mem::take(self)
    }
}

impl IntoIterator for ExceptionList {
    type Item = ClError;
    type IntoIter = std::vec::IntoIter<ClError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ExceptionList {
    type Item = &'a ClError;
    type IntoIter = std::slice::Iter<'a, ClError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl FromIterator<ClError> for ExceptionList {
    fn from_iter<I: IntoIterator<Item = ClError>>(iter: I) -> Self {
        ExceptionList { errors: iter.into_iter().collect() }
    }
}

/// User-supplied receiver of asynchronous errors.
pub type AsyncHandler = Arc<dyn Fn(ExceptionList) + Send + Sync>;

/// Used when no handler was registered: the errors are only traced.
pub fn default_async_handler(list: ExceptionList) {
    if !config::current().trace_async_errors {
        return;
    }
    log::debug!("Number of asynchronous errors during queue execution: {}", list.len());
    for e in &list {
        log::debug!("SYCL_ERROR:: {e}");
    }
}

/// Delivers `list` to `handler`, or to [`default_async_handler`] when there is none.
pub fn report_async(handler: Option<&AsyncHandler>, list: ExceptionList) {
    if list.is_empty() {
        return;
    }
    match handler {
        Some(handler) => handler(list),
        None => default_async_handler(list),
    }
}
