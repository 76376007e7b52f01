//! dyld load-path resolution.
//!
//! Mach-O binaries record dependency paths with loader-relative markers
//! that the dynamic linker substitutes at load time. This module performs
//! the same substitution for one binary in isolation: rpath stacking
//! across the load chain is intentionally not modeled, every dylib must
//! carry all the rpaths it needs on its own.

use std::path::{Path, PathBuf};

use crate::fsutil::is_executable_file;

pub const LOADER_PATH: &str = "@loader_path";
pub const EXECUTABLE_PATH: &str = "@executable_path";
pub const RPATH: &str = "@rpath";

/// Resolve one dependency path token.
///
/// `@loader_path` and `@executable_path` are replaced literally and
/// unconditionally (both may appear). If the result still contains
/// `@rpath`, the run paths are probed in order and the first substitution
/// naming an executable regular file wins; `None` means the token could
/// not be resolved against any run path, which callers must treat as
/// "dependency not found" rather than silently dropping it.
///
/// A token without `@rpath` is returned as the literal substitution with
/// no filesystem probe; existence is the caller's concern.
pub fn resolve_dyld_path(
    token: &str,
    exe_dir: &Path,
    loader_dir: &Path,
    rpaths: &[PathBuf],
) -> Option<PathBuf> {
    let substituted = substitute_markers(token, exe_dir, loader_dir);
    if !substituted.contains(RPATH) {
        return Some(PathBuf::from(substituted));
    }
    rpaths
        .iter()
        .map(|rpath| PathBuf::from(substituted.replace(RPATH, &rpath.to_string_lossy())))
        .find(|candidate| is_executable_file(candidate))
}

/// Replace the loader- and executable-relative markers in `token`.
///
/// Also used when collecting `LC_RPATH` entries, which may themselves be
/// recorded relative to the loader or the executable.
pub fn substitute_markers(token: &str, exe_dir: &Path, loader_dir: &Path) -> String {
    token
        .replace(LOADER_PATH, &loader_dir.to_string_lossy())
        .replace(EXECUTABLE_PATH, &exe_dir.to_string_lossy())
}
