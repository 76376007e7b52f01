//! Dependency-closure computation.
//!
//! Each supported platform's dynamic-linking model is wrapped in a
//! [`DependencyResolver`]; the host's resolver is selected once at startup
//! and drives the closure walk. Dependencies resolving outside the build
//! output tree (system libraries) are not this tool's responsibility and
//! are dropped.

pub mod linux;
pub mod macos;
pub mod resolve;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use linux::LinuxResolver;
pub use macos::MacResolver;

use crate::fsutil::is_executable_file;

#[derive(Debug, Error)]
pub enum ClosureError {
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
    #[error("Failed to inspect {binary}: {reason}")]
    Inspect { binary: PathBuf, reason: String },
    #[error(
        "Failed to resolve {token} (exe_dir {exe_dir}, loader_dir {loader_dir}, rpaths {rpaths})"
    )]
    UnresolvedDependency {
        token: String,
        exe_dir: String,
        loader_dir: String,
        rpaths: String,
    },
    #[error("Cannot access root binary {0}")]
    BadRoot(PathBuf),
}

/// Strategy for one platform's shared-library loading model.
///
/// Implementations share one contract: `direct_dependencies` returns the
/// absolute, deduplicated paths of a binary's directly linked shared
/// objects (minus any self-identifying record), already filtered to the
/// build output tree; `closure` returns the full transitive set including
/// the root.
pub trait DependencyResolver: Send + Sync {
    fn direct_dependencies(
        &self,
        binary: &Path,
        exe_dir: &Path,
    ) -> Result<Vec<PathBuf>, ClosureError>;

    fn closure(&self, root: &Path) -> Result<BTreeSet<PathBuf>, ClosureError>;

    fn name(&self) -> &'static str;
}

/// Select the resolver for the detected host platform.
///
/// Done exactly once at startup; an unsupported host is fatal, there is no
/// degraded mode.
pub fn host_resolver(build_dir: &Path) -> Result<Box<dyn DependencyResolver>, ClosureError> {
    if cfg!(target_os = "linux") {
        Ok(Box::new(LinuxResolver::new(build_dir)))
    } else if cfg!(target_os = "macos") {
        Ok(Box::new(MacResolver::new(build_dir)))
    } else {
        Err(ClosureError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }
}

/// Keep only dependencies this tool is responsible for: executable files
/// whose directory sits under the build output tree. Order-preserving,
/// first occurrence wins.
pub(crate) fn retain_build_tree_deps(deps: Vec<PathBuf>, build_dir: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    deps.into_iter()
        .filter(|dep| {
            is_executable_file(dep)
                && dep.parent().is_some_and(|dir| dir.starts_with(build_dir))
        })
        .filter(|dep| seen.insert(dep.clone()))
        .collect()
}
