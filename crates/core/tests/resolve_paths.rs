use std::fs;
use std::path::{Path, PathBuf};

use symgen_core::deps::resolve::resolve_dyld_path;
use tempfile::tempdir;

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[test]
fn literal_token_passes_through_untouched() {
    let result = resolve_dyld_path(
        "/usr/lib/libSystem.B.dylib",
        Path::new("/app"),
        Path::new("/app/Frameworks"),
        &[],
    );
    // No @rpath marker: the literal comes back even though nothing exists
    // at that path.
    assert_eq!(result, Some(PathBuf::from("/usr/lib/libSystem.B.dylib")));
}

#[test]
fn loader_and_executable_markers_substitute_independently() {
    let result = resolve_dyld_path(
        "@loader_path/../@executable_path-shaped/lib.dylib",
        Path::new("/exe"),
        Path::new("/loader"),
        &[],
    );
    assert_eq!(result, Some(PathBuf::from("/loader/..//exe-shaped/lib.dylib")));

    let result =
        resolve_dyld_path("@executable_path/lib.dylib", Path::new("/exe"), Path::new("/loader"), &[]);
    assert_eq!(result, Some(PathBuf::from("/exe/lib.dylib")));
}

#[cfg(unix)]
#[test]
fn rpath_probe_returns_first_matching_directory() {
    let temp = tempdir().expect("tempdir");
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();
    // The dylib exists (and is executable) only under `second`.
    let lib = second.join("libfoo.dylib");
    fs::write(&lib, b"lib").unwrap();
    make_executable(&lib);

    let rpaths = vec![first.clone(), second.clone()];
    let result =
        resolve_dyld_path("@rpath/libfoo.dylib", Path::new("/exe"), Path::new("/loader"), &rpaths);
    assert_eq!(result, Some(lib.clone()));

    // Order sensitivity: planting a match earlier in the list changes the
    // winner.
    let shadow = first.join("libfoo.dylib");
    fs::write(&shadow, b"lib").unwrap();
    make_executable(&shadow);
    let result =
        resolve_dyld_path("@rpath/libfoo.dylib", Path::new("/exe"), Path::new("/loader"), &rpaths);
    assert_eq!(result, Some(shadow));
}

#[cfg(unix)]
#[test]
fn rpath_probe_skips_non_executable_candidates() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join("rp");
    fs::create_dir_all(&dir).unwrap();
    let lib = dir.join("libbar.dylib");
    fs::write(&lib, b"lib").unwrap();
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(&lib, fs::Permissions::from_mode(0o644)).unwrap();

    let result = resolve_dyld_path(
        "@rpath/libbar.dylib",
        Path::new("/exe"),
        Path::new("/loader"),
        &[dir],
    );
    assert_eq!(result, None);
}

#[test]
fn unresolved_rpath_reports_not_found() {
    let temp = tempdir().expect("tempdir");
    let result = resolve_dyld_path(
        "@rpath/libmissing.dylib",
        Path::new("/exe"),
        Path::new("/loader"),
        &[temp.path().to_path_buf(), temp.path().join("also-empty")],
    );
    assert_eq!(result, None);
}

#[cfg(unix)]
#[test]
fn markers_substitute_before_rpath_probe() {
    let temp = tempdir().expect("tempdir");
    let loader = temp.path().join("loader");
    let rp = loader.join("rpaths");
    fs::create_dir_all(&rp).unwrap();
    let lib = rp.join("libdeep.dylib");
    fs::write(&lib, b"lib").unwrap();
    make_executable(&lib);

    // The rpath list entry was already loader-substituted at collection
    // time; the token still needs its own @rpath expansion.
    let result =
        resolve_dyld_path("@rpath/libdeep.dylib", Path::new("/exe"), &loader, &[rp.clone()]);
    assert_eq!(result, Some(lib));
}
