//! The concurrent extraction pipeline.
//!
//! The full closure set is loaded into a shared work queue up front and a
//! fixed pool of workers drains it. Output paths are content-addressed by
//! binary identity, so correctness does not depend on worker ordering;
//! the existence check on the canonical path is the only dedup mechanism
//! needed within one run, since the closure walk already guarantees each
//! binary appears at most once.

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;

use log::{error, info};

use crate::fsutil::ensure_dir;
use crate::model::{BinaryIdentity, BinaryReport, ExtractionOutcome};
use crate::services::dump::DumpSyms;

/// Batch-level knobs for symbol generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Build output directory; also where `dump_syms` is expected to live.
    pub build_dir: PathBuf,
    /// Root of the content-addressed symbol tree.
    pub symbols_dir: PathBuf,
    /// Worker count; clamped to at least one.
    pub jobs: usize,
}

/// Default worker count: one per detected CPU.
pub fn default_jobs() -> usize {
    num_cpus::get()
}

/// Run the extraction pipeline over `binaries` and report how each one
/// was disposed of. Per-binary failures are logged and recorded, never
/// propagated; the batch always runs to completion.
pub fn generate_symbols(
    options: &GenerateOptions,
    binaries: &BTreeSet<PathBuf>,
) -> Vec<BinaryReport> {
    let (work_tx, work_rx) = crossbeam_channel::unbounded();
    for binary in binaries {
        let _ = work_tx.send(binary.clone());
    }
    drop(work_tx);

    let (report_tx, report_rx) = crossbeam_channel::unbounded();
    let jobs = options.jobs.max(1);
    thread::scope(|scope| {
        for _ in 0..jobs {
            let work_rx = work_rx.clone();
            let report_tx = report_tx.clone();
            scope.spawn(move || {
                // Each worker locates the tool for itself; a missing tool
                // is a per-binary skip, not a batch abort.
                let dump_syms = DumpSyms::locate(&options.build_dir);
                for binary in work_rx {
                    let outcome = process_binary(options, dump_syms.as_ref(), &binary);
                    match &outcome {
                        ExtractionOutcome::Extracted => {
                            info!("Generated symbols for {}", binary.display());
                        }
                        ExtractionOutcome::Failed { reason } => {
                            error!("Failed on {}: {reason}", binary.display());
                        }
                        skip => info!("Skipping {} ({skip})", binary.display()),
                    }
                    let _ = report_tx.send(BinaryReport { binary, outcome });
                }
            });
        }
        drop(report_tx);
    });

    let mut reports: Vec<BinaryReport> = report_rx.try_iter().collect();
    reports.sort_by(|a, b| a.binary.cmp(&b.binary));
    reports
}

/// The per-binary probing sequence, short-circuiting at the first
/// applicable condition.
fn process_binary(
    options: &GenerateOptions,
    dump_syms: Option<&DumpSyms>,
    binary: &Path,
) -> ExtractionOutcome {
    let Some(dump_syms) = dump_syms else {
        return ExtractionOutcome::SkippedNoTool;
    };
    let Some(identity) = dump_syms.identify(binary) else {
        return ExtractionOutcome::SkippedUnidentifiable;
    };

    // Existing output at the content-addressed path is trusted as-is and
    // never revalidated or overwritten.
    let output_path = identity.symbol_file_path(&options.symbols_dir);
    if output_path.is_file() {
        return ExtractionOutcome::SkippedExisting;
    }

    // A pre-baked symbol file next to the binary with the exact same
    // identity can stand in for a fresh dump.
    if let Some(sibling) = find_local_symbol_file(binary, &identity) {
        return match install_local_copy(&sibling, &output_path) {
            Ok(()) => ExtractionOutcome::SkippedLocalCopy,
            Err(reason) => ExtractionOutcome::Failed { reason },
        };
    }

    if let Some(dir) = output_path.parent() {
        if let Err(e) = ensure_dir(dir) {
            return ExtractionOutcome::Failed {
                reason: format!("failed to create {}: {e}", dir.display()),
            };
        }
    }
    match dump_syms.dump_to_file(binary, &output_path) {
        Ok(()) => ExtractionOutcome::Extracted,
        Err(reason) => ExtractionOutcome::Failed { reason },
    }
}

/// Look for `<binary>.breakpad*` siblings whose first line parses to the
/// same identity as the binary itself. Candidates are visited in name
/// order; only the header line of each is read.
fn find_local_symbol_file(binary: &Path, identity: &BinaryIdentity) -> Option<PathBuf> {
    let dir = binary.parent()?;
    let prefix = format!("{}.breakpad", binary.file_name()?.to_string_lossy());
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates.into_iter().find(|candidate| {
        first_line(candidate)
            .and_then(|line| BinaryIdentity::from_header_line(&line))
            .as_ref()
            == Some(identity)
    })
}

fn first_line(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).ok()?;
    Some(line)
}

fn install_local_copy(sibling: &Path, output_path: &Path) -> Result<(), String> {
    if let Some(dir) = output_path.parent() {
        ensure_dir(dir).map_err(|e| format!("failed to create {}: {e}", dir.display()))?;
    }
    fs::copy(sibling, output_path).map_err(|e| {
        format!("failed to copy {} to {}: {e}", sibling.display(), output_path.display())
    })?;
    Ok(())
}
