//! Process-wide runtime settings.
//!
//! Set once at start-up with [`init`], read with [`current`], and restored to
//! the defaults with [`reset`]. Nothing else in the crate keeps global state
//! besides the resource-name counters.

use std::sync::RwLock;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Trace asynchronous errors that reach no handler.
    pub trace_async_errors: bool,
    /// Options passed when a command group compiles a kernel.
    pub compile_options: String,
    /// Options passed when a command group links a kernel.
    pub link_options: String,
    /// Reuse kernels compiled by earlier command groups on the same queue.
    pub cache_kernels: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            trace_async_errors: true,
            compile_options: String::new(),
            link_options: String::new(),
            cache_kernels: true,
        }
    }
}

impl RuntimeConfig {
    /// Reads `SYCL_TRACE_ASYNC`, `SYCL_COMPILE_OPTIONS`, `SYCL_LINK_OPTIONS`
    /// and `SYCL_KERNEL_CACHE`; unset variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = RuntimeConfig::default();
        if let Some(v) = lookup("SYCL_TRACE_ASYNC") {
            cfg.trace_async_errors = parse_flag(&v).unwrap_or(cfg.trace_async_errors);
        }
        if let Some(v) = lookup("SYCL_COMPILE_OPTIONS") {
            cfg.compile_options = v;
        }
        if let Some(v) = lookup("SYCL_LINK_OPTIONS") {
            cfg.link_options = v;
        }
        if let Some(v) = lookup("SYCL_KERNEL_CACHE") {
            cfg.cache_kernels = parse_flag(&v).unwrap_or(cfg.cache_kernels);
        }
        cfg
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

static CONFIG: Lazy<RwLock<RuntimeConfig>> = Lazy::new(|| RwLock::new(RuntimeConfig::default()));

/// Replaces the process-wide settings.
pub fn init(config: RuntimeConfig) {
    log::debug!("runtime config: {config:?}");
    *CONFIG.write().unwrap_or_else(|p| p.into_inner()) = config;
}

/// Snapshot of the current settings.
pub fn current() -> RuntimeConfig {
    CONFIG.read().unwrap_or_else(|p| p.into_inner()).clone()
}

/// Restores the defaults.
pub fn reset() {
    init(RuntimeConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_overrides_defaults() {
        let cfg = RuntimeConfig::from_lookup(|key| match key {
            "SYCL_TRACE_ASYNC" => Some("off".into()),
            "SYCL_COMPILE_OPTIONS" => Some("-cl-fast-relaxed-math".into()),
            "SYCL_KERNEL_CACHE" => Some("maybe".into()),
            _ => None,
        });
        assert!(!cfg.trace_async_errors);
        assert_eq!(cfg.compile_options, "-cl-fast-relaxed-math");
        assert_eq!(cfg.link_options, "");
        // unparsable flags keep the default
        assert!(cfg.cache_kernels);
    }

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(""), None);
    }
}
