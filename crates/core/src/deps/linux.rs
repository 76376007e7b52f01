//! ELF dependency discovery via the dynamic linker.
//!
//! `ldd` already reports the full transitive dependency set in one pass,
//! so the closure here is a single inspection of the root binary.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;

use super::{retain_build_tree_deps, ClosureError, DependencyResolver};
use crate::fsutil::absolutize;

/// Resolver for the ELF/dynamic-linker loading model.
pub struct LinuxResolver {
    build_dir: PathBuf,
    ldd_path: PathBuf,
    dep_line: Regex,
}

impl LinuxResolver {
    pub fn new(build_dir: &Path) -> Self {
        Self::with_tool_path(build_dir, default_ldd_path())
    }

    /// Use an explicit `ldd` (or stand-in) path; tests feed fake scripts
    /// through here.
    pub fn with_tool_path(build_dir: &Path, ldd_path: PathBuf) -> Self {
        Self {
            build_dir: build_dir.to_path_buf(),
            ldd_path,
            dep_line: Regex::new(r"^\t.* => (.+) \(.*\)$").unwrap(),
        }
    }

    /// Extract resolved library paths from `ldd` output.
    ///
    /// Lines without a resolved path (the vdso pseudo-entry, "not found"
    /// markers) are silently skipped, matching the long-standing behavior
    /// of the dependency scan this replaces.
    fn parse_ldd_output(&self, output: &str) -> Vec<PathBuf> {
        output
            .lines()
            .filter_map(|line| self.dep_line.captures(line))
            .map(|caps| PathBuf::from(&caps[1]))
            .collect()
    }
}

impl DependencyResolver for LinuxResolver {
    fn direct_dependencies(
        &self,
        binary: &Path,
        _exe_dir: &Path,
    ) -> Result<Vec<PathBuf>, ClosureError> {
        let output = Command::new(&self.ldd_path).arg(binary).output().map_err(|e| {
            ClosureError::Inspect {
                binary: binary.to_path_buf(),
                reason: format!("failed to spawn {}: {e}", self.ldd_path.display()),
            }
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut deps = Vec::new();
        for dep in self.parse_ldd_output(&stdout) {
            let abs = absolutize(&dep).map_err(|e| ClosureError::Inspect {
                binary: binary.to_path_buf(),
                reason: format!("cannot absolutize {}: {e}", dep.display()),
            })?;
            deps.push(abs);
        }
        Ok(retain_build_tree_deps(deps, &self.build_dir))
    }

    fn closure(&self, root: &Path) -> Result<BTreeSet<PathBuf>, ClosureError> {
        let root = absolutize(root).map_err(|_| ClosureError::BadRoot(root.to_path_buf()))?;
        let exe_dir = root.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut closure: BTreeSet<PathBuf> =
            self.direct_dependencies(&root, &exe_dir)?.into_iter().collect();
        closure.insert(root);
        Ok(closure)
    }

    fn name(&self) -> &'static str {
        "linux"
    }
}

fn default_ldd_path() -> PathBuf {
    std::env::var_os("SYMGEN_LDD").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("ldd"))
}
