//! quantpull CLI - download one quantization of a model from Hugging Face.
//!
//! This binary is a thin front end over the `quantpull` library: it parses
//! arguments, sets up logging and prints results.

mod commands;
mod error;
mod output;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use quantpull::logging;

use commands::fetch::{self, FetchArgs};
use output::ConsoleOutput;

/// Download a specific quantization of a model from Hugging Face.
///
/// Lists the files of REPO_ID, picks the first one whose name contains
/// QUANTIZATION (case-insensitive) and downloads it, resuming any partial
/// download left by an earlier run.
#[derive(Debug, Parser)]
#[command(name = "quantpull", version)]
struct Cli {
    /// Repository id, e.g. TheBloke/Llama-2-7B-GGUF
    repo_id: String,

    /// Quantization tag to look for, e.g. Q4_K_M
    quantization: String,

    /// Directory to save the file into
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Branch, tag or commit to download from [default: main]
    #[arg(long)]
    revision: Option<String>,

    /// Hub endpoint [default: https://huggingface.co]
    #[arg(long, env = "HF_ENDPOINT")]
    endpoint: Option<String>,

    /// HTTP timeout in seconds [default: 300]
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Fail instead of picking the first file when several match
    #[arg(long)]
    strict: bool,

    /// Resolve the file without downloading it
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl From<Cli> for FetchArgs {
    fn from(cli: Cli) -> Self {
        Self {
            repo_id: cli.repo_id,
            quantization: cli.quantization,
            output: cli.output,
            revision: cli.revision,
            endpoint: cli.endpoint,
            timeout: cli.timeout,
            strict: cli.strict,
            dry_run: cli.dry_run,
            show_progress: !cli.no_progress,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let _logging = logging::init_logging(cli.verbose);
    let out = ConsoleOutput;
    let args = FetchArgs::from(cli);

    match fetch::run(&args, &out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            fetch::report_error(&out, &e);
            e.exit_code()
        }
    }
}
