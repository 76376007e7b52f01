//! Small filesystem helpers shared by the resolvers and the extraction
//! pipeline. None of these touch anything outside the paths they are given.

use std::io;
use std::path::{Component, Path, PathBuf};

/// True if `path` names a regular file the current user may execute.
///
/// This is the probe used both for `@rpath` candidate selection and for
/// deciding whether a resolved dependency is a real shared object.
#[cfg(unix)]
pub fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

/// Turn `path` into an absolute path without resolving symlinks.
///
/// Relative paths are joined onto the current working directory. Symlinks
/// are deliberately left alone: the loader dir is the only place where the
/// real (symlink-resolved) location matters, and that is handled by the
/// caller via `canonicalize`.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Lexically normalize a path: collapse `.` components and fold `..` onto
/// the preceding component where one exists. No filesystem access.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Only pop a real component; keep leading `..` on relative
                // paths and never pop past the root.
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if popped {
                    out.pop();
                } else if !matches!(out.components().next_back(), Some(Component::RootDir)) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `mkdir -p` that tolerates two workers racing to create the same
/// directory: losing the race is a success, any other error is not.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}
