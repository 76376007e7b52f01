use anyhow::Result;
use clap::Parser;
use symgen::commands::{generate_symbols_command, GenerateArgs};
use symgen_core::services::generate::default_jobs;

/// Generate breakpad symbol files for a binary and all of its shared-library
/// dependencies.
///
/// This CLI is a thin wrapper around `symgen-core` (exposed in code as
/// `symgen_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "symgen",
    version,
    about = "Generates breakpad symbols for a binary and its dependency closure",
    long_about = None
)]
struct Cli {
    /// The build output directory; dependencies outside it are ignored and
    /// `dump_syms` is expected to live inside it.
    #[arg(long)]
    build_dir: String,

    /// The directory where to write the symbol files.
    #[arg(long)]
    symbols_dir: String,

    /// The path of the binary to generate symbols for.
    #[arg(long)]
    binary: String,

    /// Clear the symbols directory before writing new symbols.
    #[arg(long, default_value_t = false)]
    clear: bool,

    /// Number of parallel extraction tasks to run.
    #[arg(short = 'j', long, default_value_t = default_jobs())]
    jobs: usize,

    /// Print verbose status output (per-binary skip/extract messages).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Emit a JSON summary of per-binary outcomes instead of a one-line
    /// count.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Per-binary progress goes through the logger; -v opts into it.
    let default_level = if cli.verbose { "info" } else { "error" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    generate_symbols_command(&GenerateArgs {
        build_dir: cli.build_dir,
        symbols_dir: cli.symbols_dir,
        binary: cli.binary,
        clear: cli.clear,
        jobs: cli.jobs,
        json: cli.json,
    })
}
