//! symgen-core
//!
//! Core library for generating breakpad symbol files for a binary and the
//! transitive closure of its shared-library dependencies.
//!
//! This crate defines the binary-identity model, the platform-specific
//! dependency-closure resolvers (ELF/`ldd` and Mach-O/`otool`), and the
//! concurrent extraction pipeline that drives the external `dump_syms`
//! tool.
//!
//! The goal is to keep all substantive logic here so it is fully testable
//! and reusable from multiple frontends (CLI, build-system hooks, etc.).

pub mod deps;
pub mod fsutil;
pub mod model;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
