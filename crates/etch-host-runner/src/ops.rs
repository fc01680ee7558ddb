//! Minimal line-oriented reference engine.
//!
//! Op scripts exist to drive the storage-observer and argument contracts end
//! to end without a language implementation behind the [`ScriptEngine`]
//! seam. A script is a set of `fn <name>` blocks; each block is a flat list
//! of ops:
//!
//! ```text
//! # persist a greeting, then echo the first script argument
//! fn main
//!   set greeting hello
//!   get greeting
//!   argc
//!   arg 1
//! ```
//!
//! `get` performs the two-phase read protocol: probe with capacity 0,
//! reallocate to the reported length, retry.

use std::collections::BTreeMap;

use etch_engine::{ExecOutcome, IoObserver, IoStatus, ScriptArgs, ScriptEngine};

#[derive(Clone, Debug)]
enum Op {
    Print(String),
    Set { key: String, value: String },
    Get { key: String },
    Has { key: String },
    Argc,
    Arg { index: usize },
    Fail(String),
}

/// A compiled op script: named function blocks.
#[derive(Clone, Debug, Default)]
pub struct OpScript {
    functions: BTreeMap<String, Vec<Op>>,
}

impl OpScript {
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OpScriptEngine;

fn split_op(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (line, ""),
    }
}

impl ScriptEngine for OpScriptEngine {
    type Script = OpScript;

    fn compile(&self, source: &str) -> Result<OpScript, Vec<String>> {
        let mut errors: Vec<String> = Vec::new();
        let mut functions: BTreeMap<String, Vec<Op>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for (idx, raw) in source.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (op, rest) = split_op(line);
            if op == "fn" {
                if rest.is_empty() || rest.split_whitespace().count() != 1 {
                    errors.push(format!("line {lineno}: `fn` needs a single function name"));
                    current = None;
                    continue;
                }
                if functions.contains_key(rest) {
                    errors.push(format!("line {lineno}: duplicate function `{rest}`"));
                    current = None;
                    continue;
                }
                functions.insert(rest.to_string(), Vec::new());
                current = Some(rest.to_string());
                continue;
            }

            let Some(func) = &current else {
                errors.push(format!("line {lineno}: op outside a `fn` block"));
                continue;
            };

            let parsed = match op {
                "print" => Ok(Op::Print(rest.to_string())),
                "fail" => Ok(Op::Fail(rest.to_string())),
                "argc" => {
                    if rest.is_empty() {
                        Ok(Op::Argc)
                    } else {
                        Err(format!("line {lineno}: `argc` takes no operand"))
                    }
                }
                "arg" => rest
                    .parse::<usize>()
                    .map(|index| Op::Arg { index })
                    .map_err(|_| format!("line {lineno}: `arg` needs a non-negative index")),
                "set" => {
                    let (key, value) = split_op(rest);
                    if key.is_empty() {
                        Err(format!("line {lineno}: `set` needs a key"))
                    } else {
                        Ok(Op::Set {
                            key: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                }
                "get" | "has" => {
                    if rest.is_empty() || rest.split_whitespace().count() != 1 {
                        Err(format!("line {lineno}: `{op}` needs a single key"))
                    } else if op == "get" {
                        Ok(Op::Get {
                            key: rest.to_string(),
                        })
                    } else {
                        Ok(Op::Has {
                            key: rest.to_string(),
                        })
                    }
                }
                other => Err(format!("line {lineno}: unknown op `{other}`")),
            };

            match parsed {
                Ok(parsed) => {
                    if let Some(ops) = functions.get_mut(func) {
                        ops.push(parsed);
                    }
                }
                Err(message) => errors.push(message),
            }
        }

        if errors.is_empty() {
            Ok(OpScript { functions })
        } else {
            Err(errors)
        }
    }

    fn execute(
        &self,
        script: &OpScript,
        func: &str,
        observer: &mut dyn IoObserver,
        args: &ScriptArgs,
    ) -> ExecOutcome {
        let Some(ops) = script.functions.get(func) else {
            return ExecOutcome {
                success: false,
                console: String::new(),
                error: format!("unknown function: {func}"),
            };
        };

        let mut console = String::new();
        for op in ops {
            match op {
                Op::Print(text) => {
                    console.push_str(text);
                    console.push('\n');
                }
                Op::Set { key, value } => {
                    observer.write(key, value.as_bytes());
                }
                Op::Get { key } => match read_value(observer, key) {
                    Ok(raw) => {
                        console.push_str(&String::from_utf8_lossy(&raw));
                        console.push('\n');
                    }
                    Err(error) => {
                        return ExecOutcome {
                            success: false,
                            console,
                            error,
                        }
                    }
                },
                Op::Has { key } => {
                    console.push_str(if observer.exists(key) { "true" } else { "false" });
                    console.push('\n');
                }
                Op::Argc => {
                    console.push_str(&args.count().to_string());
                    console.push('\n');
                }
                Op::Arg { index } => match args.get(*index) {
                    Ok(value) => {
                        console.push_str(value);
                        console.push('\n');
                    }
                    Err(err) => {
                        return ExecOutcome {
                            success: false,
                            console,
                            error: err.to_string(),
                        }
                    }
                },
                Op::Fail(text) => {
                    return ExecOutcome {
                        success: false,
                        console,
                        error: text.clone(),
                    }
                }
            }
        }

        ExecOutcome {
            success: true,
            console,
            error: String::new(),
        }
    }
}

/// Two-phase read: probe with capacity 0 to learn the stored length, then
/// retry with an exactly-sized buffer.
fn read_value(observer: &dyn IoObserver, key: &str) -> Result<Vec<u8>, String> {
    let mut size = 0u64;
    match observer.read(key, &mut [], &mut size) {
        IoStatus::Ok => Ok(Vec::new()),
        IoStatus::BufferTooSmall => {
            let mut buf = vec![0u8; size as usize];
            match observer.read(key, &mut buf, &mut size) {
                IoStatus::Ok => {
                    buf.truncate(size as usize);
                    Ok(buf)
                }
                status => Err(format!("state read failed for key `{key}`: {status}")),
            }
        }
        IoStatus::Error => {
            if observer.exists(key) {
                Err(format!("state value for key `{key}` is not readable"))
            } else {
                Err(format!("unknown state key: {key}"))
            }
        }
    }
}
