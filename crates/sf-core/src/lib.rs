//! Shared primitives used across Stillframe crates.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Result alias used across the workspace.
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error type carried by every fallible operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub code: &'static str,
    pub message: String,
}

impl EngineError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for EngineError {}

/// Shared toggle controlling how chatty the diagnostic sink is.
///
/// Cloning hands out another handle to the same flag, so the controller can
/// flip verbosity at runtime while the installed sink keeps reading it.
#[derive(Debug, Clone)]
pub struct VerbosityHandle(Arc<AtomicBool>);

impl VerbosityHandle {
    pub fn new(verbose: bool) -> Self {
        Self(Arc::new(AtomicBool::new(verbose)))
    }

    pub fn set(&self, verbose: bool) {
        self.0.store(verbose, Ordering::Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Leveled diagnostic sink behind the `log` facade.
///
/// Errors always pass through; warn/info/debug records are dropped unless the
/// verbosity toggle is on.
#[derive(Debug)]
pub struct DiagnosticSink {
    name: &'static str,
    verbosity: VerbosityHandle,
}

impl DiagnosticSink {
    pub fn new(name: &'static str, verbosity: VerbosityHandle) -> Self {
        Self { name, verbosity }
    }

    /// Installs the sink as the global logger and returns the verbosity handle.
    pub fn install(name: &'static str) -> EngineResult<VerbosityHandle> {
        let handle = VerbosityHandle::new(false);
        let sink = Self::new(name, handle.clone());
        log::set_boxed_logger(Box::new(sink)).map_err(|error| {
            EngineError::new(
                "diag.sink_install_failed",
                format!("failed to install diagnostic sink: {error}"),
            )
        })?;
        log::set_max_level(log::LevelFilter::Debug);
        Ok(handle)
    }

    fn passes(&self, level: log::Level) -> bool {
        level == log::Level::Error || self.verbosity.is_verbose()
    }
}

impl log::Log for DiagnosticSink {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.passes(metadata.level())
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.passes(record.level()) {
            return;
        }
        eprintln!("[{}] {} {}", self.name, record.level(), record.args());
    }

    fn flush(&self) {}
}
