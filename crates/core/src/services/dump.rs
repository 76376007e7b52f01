//! Wrapper around the external `dump_syms` tool.
//!
//! The tool lives in the build output directory alongside the binaries it
//! describes. It is driven in two modes: identify (`-i`, only the MODULE
//! header is read) and full dump (`-r`, breakpad text streamed verbatim to
//! the output file — the content itself is never interpreted here).

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::fsutil::is_executable_file;
use crate::model::BinaryIdentity;

const DUMP_SYMS: &str = "dump_syms";

/// Handle on a located `dump_syms` executable.
pub struct DumpSyms {
    path: PathBuf,
}

impl DumpSyms {
    /// Look for `dump_syms` inside the build directory. `None` when it is
    /// missing or not executable; callers decide whether that is fatal
    /// (startup) or a per-binary skip (worker).
    pub fn locate(build_dir: &Path) -> Option<Self> {
        let path = match std::env::var_os("SYMGEN_DUMP_SYMS") {
            Some(override_path) => PathBuf::from(override_path),
            None => build_dir.join(DUMP_SYMS),
        };
        is_executable_file(&path).then_some(Self { path })
    }

    /// `dump_syms -i <binary>`: parse the first stdout line as the MODULE
    /// header. Any failure — spawn error, non-zero exit, unparseable
    /// header — collapses to `None`; the caller records the binary as
    /// unidentifiable rather than failing the batch.
    pub fn identify(&self, binary: &Path) -> Option<BinaryIdentity> {
        let output = Command::new(&self.path).arg("-i").arg(binary).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        BinaryIdentity::from_header_line(stdout.lines().next()?)
    }

    /// `dump_syms -r <binary>` with stdout redirected straight into
    /// `output_path`. The parent directory must already exist.
    pub fn dump_to_file(&self, binary: &Path, output_path: &Path) -> Result<(), String> {
        let file = File::create(output_path)
            .map_err(|e| format!("failed to create {}: {e}", output_path.display()))?;
        let status = Command::new(&self.path)
            .arg("-r")
            .arg(binary)
            .stdout(Stdio::from(file))
            .status()
            .map_err(|e| format!("failed to spawn {}: {e}", self.path.display()))?;
        if !status.success() {
            return Err(format!("{} -r exited with {status}", DUMP_SYMS));
        }
        Ok(())
    }
}
