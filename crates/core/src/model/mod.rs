use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The identity `dump_syms` reports for one binary, taken from the
/// `MODULE <platform> <arch> <hash> <name>` header line of a symbol dump.
///
/// Two identities are equal iff all four fields match; this is the dedup
/// key for "has this exact build already been symbolized".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinaryIdentity {
    pub platform: String,
    pub arch: String,
    pub debug_hash: String,
    pub module_name: String,
}

impl BinaryIdentity {
    /// Parse a `MODULE` header line.
    ///
    /// The line must be exactly five space-delimited fields led by the
    /// literal tag `MODULE`; the module name takes the remainder of the
    /// line, so names containing spaces survive. Anything else is `None`.
    pub fn from_header_line(line: &str) -> Option<Self> {
        let mut fields = line.trim().splitn(5, ' ');
        let tag = fields.next()?;
        if tag != "MODULE" {
            return None;
        }
        let platform = fields.next()?;
        let arch = fields.next()?;
        let debug_hash = fields.next()?;
        let module_name = fields.next()?;
        if platform.is_empty() || arch.is_empty() || debug_hash.is_empty() || module_name.is_empty()
        {
            return None;
        }
        Some(Self {
            platform: platform.to_string(),
            arch: arch.to_string(),
            debug_hash: debug_hash.to_string(),
            module_name: module_name.to_string(),
        })
    }

    /// Canonical, content-addressed location of this identity's symbol
    /// file: `<symbols_dir>/<name>/<hash>/<name>.sym`.
    ///
    /// If a file already exists there it is assumed correct and is never
    /// overwritten.
    pub fn symbol_file_path(&self, symbols_dir: &Path) -> PathBuf {
        symbols_dir
            .join(&self.module_name)
            .join(&self.debug_hash)
            .join(format!("{}.sym", self.module_name))
    }
}

/// Terminal state of the extraction pipeline for one binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Symbols were dumped and written to the canonical output path.
    Extracted,
    /// The canonical output file already existed; trusted unconditionally.
    SkippedExisting,
    /// A pre-baked `<binary>.breakpad*` sibling with a matching identity
    /// was copied to the canonical output path.
    SkippedLocalCopy,
    /// No `dump_syms` executable could be located in the build directory.
    SkippedNoTool,
    /// `dump_syms -i` failed or produced an unparseable header.
    SkippedUnidentifiable,
    /// Dumping or writing failed; non-fatal for the batch.
    Failed { reason: String },
}

impl ExtractionOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::SkippedExisting
                | Self::SkippedLocalCopy
                | Self::SkippedNoTool
                | Self::SkippedUnidentifiable
        )
    }
}

impl fmt::Display for ExtractionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted => write!(f, "symbols generated"),
            Self::SkippedExisting => write!(f, "symbol file already found"),
            Self::SkippedLocalCopy => write!(f, "found local symbol file"),
            Self::SkippedNoTool => write!(f, "could not locate dump_syms executable"),
            Self::SkippedUnidentifiable => write!(f, "could not obtain binary information"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// One binary's path paired with how the pipeline disposed of it; the
/// batch summary is a list of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryReport {
    pub binary: PathBuf,
    pub outcome: ExtractionOutcome,
}
