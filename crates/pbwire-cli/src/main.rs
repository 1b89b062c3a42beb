/// pbwire command-line tool: inspect and validate raw tag/value wire-format
/// payloads without a schema.
///
/// # Command overview
///
/// ```text
/// pbwire <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print the field tree of a payload
///   validate   Walk a payload and check it is well-formed
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log decoder events (limit pushes, refills) to stderr
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                     |
/// |------|---------------------------------------------|
/// | 0    | Success                                     |
/// | 1    | Error (I/O failure, malformed input, etc.)  |
///
/// All error details are written to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_inspect;
mod cmd_validate;
mod input;

use input::DecoderArgs;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pbwire", version, about = "Schema-less wire-format inspector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decoder events to stderr (debug level; `RUST_LOG` overrides).
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print every field, descending into nested messages.
    Inspect(InspectArgs),
    /// Skip through every field and report whether the payload is well-formed.
    Validate(ValidateArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `pbwire inspect`.
///
/// ```text
/// ┌───────────────┬──────────────────────────────────────────────────────┐
/// │ Flag          │ Effect                                               │
/// ├───────────────┼──────────────────────────────────────────────────────┤
/// │ --json        │ Print the field tree as JSON                         │
/// │ --max-depth N │ Stop descending into nested messages below depth N   │
/// │ --hex         │ Show length-delimited payloads as hex, never as text │
/// └───────────────┴──────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the payload to inspect.
    pub file: PathBuf,

    /// Print the field tree as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Maximum nesting depth to descend into.
    #[arg(long, default_value_t = 8)]
    pub max_depth: u32,

    /// Render length-delimited payloads as hex.
    #[arg(long)]
    pub hex: bool,

    #[command(flatten)]
    pub decoder: DecoderArgs,
}

/// Arguments for `pbwire validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the payload to validate.
    pub file: PathBuf,

    #[command(flatten)]
    pub decoder: DecoderArgs,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
