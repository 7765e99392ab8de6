use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use codescan_cli::commands::{
    batch_command, compare_command, history_command, info_command, init_command,
    layout_command, list_backends_command, scan_command, BatchOptions, InitOptions,
    LayoutOptions, ScanOptions,
};
use codescan_cli::parse_offset_arg;
use codescan_core::analysis::AnalysisError;
use codescan_core::logging::{init_tracing, LogOptions};

/// Post-processing of native code-scanner output: region maps, packing
/// verdicts and alien-code detection.
///
/// This CLI is a thin wrapper around `codescan-core`; all substantive logic
/// lives in the library.
#[derive(Parser, Debug)]
#[command(name = "codescan", version, about = "Code-scanner region analysis", long_about = None)]
struct Cli {
    /// Log debug output to stderr (`RUST_LOG` overrides).
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a codescan workspace (`.codescan/` with config, database
    /// and recordings directory).
    Init {
        /// Workspace root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional workspace name. Derived from the root directory if omitted.
        #[arg(long)]
        name: Option<String>,

        /// Scanner backend to configure (see `codescan backends`).
        #[arg(long)]
        backend: Option<String>,

        /// Write the config as YAML instead of JSON.
        #[arg(long, default_value_t = false)]
        yaml: bool,
    },

    /// Show workspace configuration and stored result counts.
    Info {
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Scan a file (or a byte window of it) and print the packing verdict.
    Scan {
        /// File to scan.
        path: PathBuf,

        #[arg(long, default_value = ".")]
        root: String,

        /// Window start offset (decimal or 0x hex). `0`/`0` scans the whole file.
        #[arg(long, default_value = "0", value_parser = parse_offset_arg)]
        start: u64,

        /// Window end offset (exclusive).
        #[arg(long, default_value = "0", value_parser = parse_offset_arg)]
        end: u64,

        /// Ask the scanner for its aggressive mode.
        #[arg(long, default_value_t = false)]
        aggressive: bool,

        /// Override the configured scanner backend.
        #[arg(long)]
        backend: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// Do not store the result in the workspace database.
        #[arg(long, default_value_t = false)]
        no_record: bool,
    },

    /// Compare scanner code against the executable sections of the header.
    Compare {
        path: PathBuf,

        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        backend: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(long, default_value_t = false)]
        no_record: bool,
    },

    /// Emit colour-map layout data (JSON) for plotting a scan.
    Layout {
        path: PathBuf,

        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long, default_value = "0", value_parser = parse_offset_arg)]
        start: u64,

        #[arg(long, default_value = "0", value_parser = parse_offset_arg)]
        end: u64,

        #[arg(long)]
        backend: Option<String>,

        /// Plot confirmed and alien code from a header comparison.
        #[arg(long, default_value_t = false)]
        alien: bool,

        /// Output file. Defaults to `reports/<file>.json` in a workspace, stdout otherwise.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Scan every file in a directory tree, continuing past per-file errors.
    Batch {
        dir: PathBuf,

        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        backend: Option<String>,

        /// Scan at most this many bytes per file (default from config, 2 MiB).
        #[arg(long, value_parser = parse_offset_arg)]
        max_window: Option<u64>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List stored scans and comparisons.
    History {
        #[arg(long, default_value = ".")]
        root: String,

        /// Only show results for this file.
        #[arg(long)]
        path: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List available scanner backends.
    Backends {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Init { root, name, backend, yaml } => {
            init_command(&root, InitOptions { name, backend, yaml })
        }
        Command::Info { root, json } => info_command(&root, json),
        Command::Scan { path, root, start, end, aggressive, backend, json, no_record } => {
            scan_command(ScanOptions {
                root,
                path,
                start,
                end,
                aggressive,
                backend,
                json,
                no_record,
            })
        }
        Command::Compare { path, root, backend, json, no_record } => {
            compare_command(&root, &path, backend.as_deref(), json, no_record)
        }
        Command::Layout { path, root, start, end, backend, alien, output } => {
            layout_command(LayoutOptions { root, path, start, end, backend, alien, output })
        }
        Command::Batch { dir, root, backend, max_window, json } => {
            batch_command(BatchOptions { root, dir, backend, max_window, json })
        }
        Command::History { root, path, json } => history_command(&root, path.as_deref(), json),
        Command::Backends { json } => list_backends_command(json),
    }
}

/// Caller mistakes exit with 2, every other failure with 1.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    let invalid_input = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<AnalysisError>())
        .any(AnalysisError::is_invalid_input);
    if invalid_input {
        2
    } else {
        1
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogOptions { verbose: cli.verbose, json: cli.log_json });

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}
