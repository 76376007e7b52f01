//! Mach-O dependency discovery via `otool` load-command dumps.
//!
//! Unlike `ldd`, one inspection only yields *direct* links, so the closure
//! is an explicit breadth-first walk with a visited set. Each binary's
//! run-path context is built fresh from its own `LC_RPATH` entries and
//! discarded afterwards; rpaths never stack across the load chain.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;

use super::resolve::{resolve_dyld_path, substitute_markers};
use super::{retain_build_tree_deps, ClosureError, DependencyResolver};
use crate::fsutil::{absolutize, normalize};

/// Resolver for the Mach-O/dyld loading model.
pub struct MacResolver {
    build_dir: PathBuf,
    otool_path: PathBuf,
    rpath_entry: Regex,
    id_entry: Regex,
    linked_lib: Regex,
}

/// Per-binary dyld search context, consumed by path resolution for that
/// binary's direct dependencies only.
struct RunPathContext {
    exe_dir: PathBuf,
    loader_dir: PathBuf,
    rpaths: Vec<PathBuf>,
    /// The binary's own `LC_ID_DYLIB` record; `otool -L` repeats it as the
    /// first linked-library line and it must not count as a dependency.
    dylib_id: Option<String>,
}

impl MacResolver {
    pub fn new(build_dir: &Path) -> Self {
        Self::with_tool_path(build_dir, default_otool_path())
    }

    /// Use an explicit `otool` (or stand-in) path; tests feed fake scripts
    /// through here.
    pub fn with_tool_path(build_dir: &Path, otool_path: PathBuf) -> Self {
        Self {
            build_dir: build_dir.to_path_buf(),
            otool_path,
            rpath_entry: Regex::new(r"^ *path (.*) \(offset .*\)$").unwrap(),
            id_entry: Regex::new(r"^ *name (.*) \(offset .*\)$").unwrap(),
            linked_lib: Regex::new(r"^\t(.*) \(compatibility .*\)$").unwrap(),
        }
    }

    fn run_otool(&self, flag: &str, binary: &Path) -> Result<String, ClosureError> {
        let output =
            Command::new(&self.otool_path).arg(flag).arg(binary).output().map_err(|e| {
                ClosureError::Inspect {
                    binary: binary.to_path_buf(),
                    reason: format!("failed to spawn {}: {e}", self.otool_path.display()),
                }
            })?;
        if !output.status.success() {
            return Err(ClosureError::Inspect {
                binary: binary.to_path_buf(),
                reason: format!("otool {flag} exited with {}", output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Build the run-path context from a binary's `otool -l` load-command
    /// dump. `LC_RPATH` path values sit two lines below the `cmd` line and
    /// may themselves be loader- or executable-relative.
    fn run_path_context(
        &self,
        binary: &Path,
        exe_dir: &Path,
    ) -> Result<RunPathContext, ClosureError> {
        // The real (symlink-resolved) location matters twice: rpaths are
        // relative to it, and a bare "foo.dylib" in the current directory
        // must not make "@loader_path/foo" expand to "/foo".
        let loader_dir = binary
            .canonicalize()
            .ok()
            .and_then(|real| real.parent().map(Path::to_path_buf))
            .ok_or_else(|| ClosureError::Inspect {
                binary: binary.to_path_buf(),
                reason: "cannot resolve real location".to_string(),
            })?;

        let load_commands = self.run_otool("-l", binary)?;
        let lines: Vec<&str> = load_commands.lines().collect();
        let mut rpaths = Vec::new();
        let mut dylib_id = None;
        for (idx, line) in lines.iter().enumerate() {
            let value_line = match lines.get(idx + 2) {
                Some(value) => *value,
                None => continue,
            };
            if line.contains("cmd LC_RPATH") {
                if let Some(caps) = self.rpath_entry.captures(value_line) {
                    rpaths.push(PathBuf::from(substitute_markers(
                        &caps[1],
                        exe_dir,
                        &loader_dir,
                    )));
                }
            } else if line.contains("cmd LC_ID_DYLIB") {
                if let Some(caps) = self.id_entry.captures(value_line) {
                    dylib_id = Some(caps[1].to_string());
                }
            }
        }

        Ok(RunPathContext {
            exe_dir: exe_dir.to_path_buf(),
            loader_dir,
            rpaths,
            dylib_id,
        })
    }

    fn linked_library_tokens(&self, binary: &Path) -> Result<Vec<String>, ClosureError> {
        let listing = self.run_otool("-L", binary)?;
        Ok(listing
            .lines()
            .filter_map(|line| self.linked_lib.captures(line))
            .map(|caps| caps[1].to_string())
            .collect())
    }
}

impl DependencyResolver for MacResolver {
    fn direct_dependencies(
        &self,
        binary: &Path,
        exe_dir: &Path,
    ) -> Result<Vec<PathBuf>, ClosureError> {
        let ctx = self.run_path_context(binary, exe_dir)?;
        let mut deps = Vec::new();
        for token in self.linked_library_tokens(binary)? {
            if ctx.dylib_id.as_deref() == Some(token.as_str()) {
                continue;
            }
            // An unresolved @rpath means a dylib shipped without a run
            // path it needs; aborting beats silently shipping an
            // incomplete closure.
            let resolved =
                resolve_dyld_path(&token, &ctx.exe_dir, &ctx.loader_dir, &ctx.rpaths)
                    .ok_or_else(|| ClosureError::UnresolvedDependency {
                        token: token.clone(),
                        exe_dir: ctx.exe_dir.display().to_string(),
                        loader_dir: ctx.loader_dir.display().to_string(),
                        rpaths: ctx
                            .rpaths
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })?;
            deps.push(normalize(&resolved));
        }
        Ok(retain_build_tree_deps(deps, &self.build_dir))
    }

    fn closure(&self, root: &Path) -> Result<BTreeSet<PathBuf>, ClosureError> {
        let root = absolutize(root).map_err(|_| ClosureError::BadRoot(root.to_path_buf()))?;
        let exe_dir = root.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut visited: BTreeSet<PathBuf> = BTreeSet::from([root.clone()]);
        let mut queue: VecDeque<PathBuf> = VecDeque::from([root]);
        while let Some(binary) = queue.pop_front() {
            for dep in self.direct_dependencies(&binary, &exe_dir)? {
                if visited.insert(dep.clone()) {
                    queue.push_back(dep);
                }
            }
        }
        Ok(visited)
    }

    fn name(&self) -> &'static str {
        "macos"
    }
}

fn default_otool_path() -> PathBuf {
    std::env::var_os("SYMGEN_OTOOL").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("otool"))
}
