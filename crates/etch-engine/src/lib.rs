//! Shared host/VM contracts.
//!
//! This crate exists so both:
//! - the state backends (Rust)
//! - the host runner and any embedded engine (Rust)
//!
//! can share one authoritative definition of the storage-observer protocol
//! and the script-facing argument view without depending on each other.

use std::fmt;

/// Outcome of a storage-observer call.
///
/// `Error` and `BufferTooSmall` are expected, recoverable results; callers
/// branch on them rather than treating them as failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IoStatus {
    Ok,
    Error,
    BufferTooSmall,
}

impl IoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IoStatus::Ok => "ok",
            IoStatus::Error => "error",
            IoStatus::BufferTooSmall => "buffer-too-small",
        }
    }
}

impl fmt::Display for IoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage backend the executing VM persists script state through.
///
/// The VM calls these synchronously on its own thread; implementations are
/// exclusively owned by one executing session and need no locking.
pub trait IoObserver {
    /// True if `key` is present. No side effects.
    fn exists(&self, key: &str) -> bool;

    /// Copies the value stored under `key` into `buf`.
    ///
    /// `*size` is the capacity of `buf` on input and the actual stored
    /// length on output when the key is present:
    /// - absent key: returns `Error` and leaves `*size` untouched;
    /// - capacity < stored length: returns `BufferTooSmall`, sets `*size`
    ///   to the stored length and leaves `buf` untouched, so the caller can
    ///   retry with a large enough buffer;
    /// - otherwise: copies into `buf[..len]`, sets `*size = len`, returns
    ///   `Ok`.
    ///
    /// `buf` must hold at least `*size` bytes.
    fn read(&self, key: &str, buf: &mut [u8], size: &mut u64) -> IoStatus;

    /// Stores `data` under `key`, overwriting any previous value. Always
    /// returns `Ok`, for any key and any length including zero.
    fn write(&mut self, key: &str, data: &[u8]) -> IoStatus;
}

/// Read-only view of the script-visible argument list.
///
/// Element 0 is always the program name; built once at process start and
/// passed down explicitly (there is no process-global argument state).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptArgs {
    args: Vec<String>,
}

impl ScriptArgs {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    pub fn count(&self) -> usize {
        self.args.len()
    }

    pub fn get(&self, index: usize) -> Result<&str, ArgIndexError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or(ArgIndexError {
                index,
                count: self.args.len(),
            })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }
}

/// Script argument index outside `[0, count)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArgIndexError {
    pub index: usize,
    pub count: usize,
}

impl fmt::Display for ArgIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "script argument index {} out of range (argument count {})",
            self.index, self.count
        )
    }
}

impl std::error::Error for ArgIndexError {}

/// Result of executing one script function.
#[derive(Clone, Debug, Default)]
pub struct ExecOutcome {
    pub success: bool,
    /// Console output collected by the engine, printed to stdout by the host.
    pub console: String,
    /// Error text collected by the engine, surfaced unmodified on stderr.
    pub error: String,
}

/// The external compiler/VM pair, seen from the host.
///
/// The host does not interpret compile or execution errors; it surfaces them
/// and picks the process exit code.
pub trait ScriptEngine {
    type Script;

    /// Compiles `source`; on failure returns the collected error lines.
    fn compile(&self, source: &str) -> Result<Self::Script, Vec<String>>;

    /// Runs `func` from `script` against `observer` and `args`.
    fn execute(
        &self,
        script: &Self::Script,
        func: &str,
        observer: &mut dyn IoObserver,
        args: &ScriptArgs,
    ) -> ExecOutcome;
}
