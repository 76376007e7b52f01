use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Result};

use symgen_core::deps::host_resolver;
use symgen_core::fsutil::is_executable_file;
use symgen_core::model::ExtractionOutcome;
use symgen_core::services::dump::DumpSyms;
use symgen_core::services::generate::{generate_symbols, GenerateOptions};

use crate::canonicalize_or_current;

/// Validated inputs for a symbol-generation run.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub build_dir: String,
    pub symbols_dir: String,
    pub binary: String,
    pub clear: bool,
    pub jobs: usize,
    pub json: bool,
}

/// Compute the dependency closure of the root binary and generate breakpad
/// symbols for every member. Closure errors are fatal; per-binary
/// extraction problems are not.
pub fn generate_symbols_command(args: &GenerateArgs) -> Result<()> {
    let build_dir = canonicalize_or_current(&args.build_dir)?;
    let symbols_dir = canonicalize_or_current(&args.symbols_dir)?;

    let binary = PathBuf::from(&args.binary);
    if !is_executable_file(&binary) {
        bail!("Cannot access binary {}", binary.display());
    }

    if args.clear {
        // Best effort; a missing or busy symbols dir is not worth failing
        // over before any work has started.
        let _ = fs::remove_dir_all(&symbols_dir);
    }

    if DumpSyms::locate(&build_dir).is_none() {
        bail!("Cannot find dump_syms in {}", build_dir.display());
    }

    let resolver = host_resolver(&build_dir)?;
    let closure = resolver.closure(&binary)?;

    let options = GenerateOptions { build_dir, symbols_dir, jobs: args.jobs };
    let reports = generate_symbols(&options, &closure);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        let extracted =
            reports.iter().filter(|r| r.outcome == ExtractionOutcome::Extracted).count();
        let skipped = reports.iter().filter(|r| r.outcome.is_skip()).count();
        let failed = reports.len() - extracted - skipped;
        println!(
            "Processed {} binaries: {} extracted, {} skipped, {} failed",
            reports.len(),
            extracted,
            skipped,
            failed
        );
    }

    Ok(())
}
