//! Shared helpers for etch host runners.

use etch_engine::ScriptArgs;

/// Literal token separating host-tool arguments from script-visible ones.
pub const SCRIPT_ARG_SEPARATOR: &str = "--";

/// Splits a raw process argument vector into host and script sub-vectors.
///
/// The program name (element 0) is duplicated into both lists so each
/// downstream parser behaves as a self-contained CLI parser. Elements after
/// index 0 go to the host list until the first literal `--`, which is
/// dropped; everything after it, including any further `--` tokens, goes to
/// the script list. Total over any input; with no separator the host list is
/// the full input and the script list holds only the program name.
pub fn partition_args(args: &[String]) -> (Vec<String>, Vec<String>) {
    let mut host: Vec<String> = Vec::new();
    let mut script: Vec<String> = Vec::new();

    let Some(program) = args.first() else {
        return (host, script);
    };
    host.push(program.clone());
    script.push(program.clone());

    let mut in_script = false;
    for arg in &args[1..] {
        if !in_script && arg == SCRIPT_ARG_SEPARATOR {
            in_script = true;
            continue;
        }
        if in_script {
            script.push(arg.clone());
        } else {
            host.push(arg.clone());
        }
    }

    (host, script)
}

/// Partitions and wraps the script sub-vector in its read-only view.
pub fn partition_script_args(args: &[String]) -> (Vec<String>, ScriptArgs) {
    let (host, script) = partition_args(args);
    (host, ScriptArgs::new(script))
}
