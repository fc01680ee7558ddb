//! Session orchestration for the etch host runner.
//!
//! A session brackets one script execution: compile, hydrate the state
//! store, execute the requested function against it, flush the store. The
//! compiler/VM pair sits behind [`ScriptEngine`]; this crate ships
//! [`OpScriptEngine`] as the reference engine.

use std::path::{Path, PathBuf};

use anyhow::Result;

use etch_engine::{ScriptArgs, ScriptEngine};
use etch_state::JsonStateMap;

pub mod ops;

pub use ops::{OpScript, OpScriptEngine};

#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Path of the persistent state document; `None` runs a pure in-memory
    /// session.
    pub state_file: Option<PathBuf>,
    /// Script function to invoke.
    pub func: String,
}

/// Flat report of one session, for the host to render and map to an exit
/// code.
#[derive(Clone, Debug, Default)]
pub struct SessionReport {
    /// Non-empty when compilation failed; nothing was executed.
    pub compile_errors: Vec<String>,
    pub success: bool,
    pub console: String,
    pub error: String,
}

/// Reads the script source, treating an unreadable or missing file as empty
/// source. The run then proceeds and fails with an unknown-function
/// execution error.
pub fn read_script_source(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Runs one session: compile, load state, execute, save state.
///
/// Compile failures are reported, not raised. The store is flushed after
/// execution whether or not the script succeeded; state-file format errors
/// on load and I/O errors on save are fatal.
pub fn run_session<E: ScriptEngine>(
    engine: &E,
    source: &str,
    config: &RunnerConfig,
    args: &ScriptArgs,
) -> Result<SessionReport> {
    let script = match engine.compile(source) {
        Ok(script) => script,
        Err(errors) => {
            return Ok(SessionReport {
                compile_errors: errors,
                ..SessionReport::default()
            })
        }
    };

    let mut state = JsonStateMap::default();
    if let Some(path) = &config.state_file {
        state.load_from_file(path)?;
    }

    let outcome = engine.execute(&script, &config.func, &mut state, args);

    if let Some(path) = &config.state_file {
        state.save_to_file(path)?;
    }

    Ok(SessionReport {
        compile_errors: Vec::new(),
        success: outcome.success,
        console: outcome.console,
        error: outcome.error,
    })
}
