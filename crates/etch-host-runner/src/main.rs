use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use etch_host_runner::{read_script_source, run_session, OpScriptEngine, RunnerConfig};
use etch_runner_common::partition_script_args;

#[derive(Parser)]
#[command(name = "etch-host-runner")]
#[command(about = "Runs an etch script with persistent key/value state.", long_about = None)]
#[command(override_usage = "etch-host-runner [OPTIONS] <SCRIPT> -- [SCRIPT_ARGS]...")]
struct Cli {
    /// Persistent state document (a JSON object of hex-encoded values).
    /// Loaded before the run, saved after it.
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Script function to invoke.
    #[arg(long, default_value = "main")]
    func: String,

    /// Script file to run.
    script: PathBuf,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    // Everything after the first `--` belongs to the script, not to clap.
    let raw: Vec<String> = std::env::args().collect();
    let (host_args, script_args) = partition_script_args(&raw);

    let cli = match Cli::try_parse_from(&host_args) {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            err.print()?;
            // clap exits 2 on bad arguments; the host contract is exit 1.
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            return Ok(ExitCode::from(code));
        }
    };

    let source = read_script_source(&cli.script);
    let config = RunnerConfig {
        state_file: cli.state_file,
        func: cli.func,
    };

    let report = run_session(&OpScriptEngine, &source, &config, &script_args)?;

    if !report.compile_errors.is_empty() {
        eprintln!("failed to compile:");
        for line in &report.compile_errors {
            eprintln!("{line}");
        }
        return Ok(ExitCode::from(1));
    }

    if !report.console.is_empty() {
        print!("{}", report.console);
    }
    if !report.success && !report.error.is_empty() {
        eprintln!("{}", report.error);
    }

    Ok(ExitCode::from(if report.success { 0 } else { 1 }))
}
