#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use symgen_core::deps::{ClosureError, DependencyResolver, MacResolver};
use tempfile::tempdir;

fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

/// A stand-in `otool` that replays canned per-binary fixtures: `-l <bin>`
/// cats `<data>/<basename>.l`, `-L <bin>` cats `<data>/<basename>.L`.
fn fake_otool(dir: &Path) -> PathBuf {
    let data = dir.join("otool-data");
    fs::create_dir_all(&data).expect("create data dir");
    let script = dir.join("fake-otool");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\n\
             flag=\"$1\"\n\
             name=$(basename \"$2\")\n\
             case \"$flag\" in\n\
               -l) exec cat \"{data}/$name.l\" ;;\n\
               -L) exec cat \"{data}/$name.L\" ;;\n\
             esac\n\
             exit 1\n",
            data = data.display()
        ),
    )
    .expect("write script");
    make_executable(&script);
    script
}

fn write_fixture(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join("otool-data").join(name), contents).expect("write fixture");
}

fn rpath_stanza(path: &str) -> String {
    format!(
        "Load command 7\n\
         \x20         cmd LC_RPATH\n\
         \x20     cmdsize 32\n\
         \x20        path {path} (offset 12)\n"
    )
}

fn id_stanza(name: &str) -> String {
    format!(
        "Load command 2\n\
         \x20         cmd LC_ID_DYLIB\n\
         \x20     cmdsize 48\n\
         \x20        name {name} (offset 24)\n"
    )
}

fn linked_line(token: &str) -> String {
    format!("\t{token} (compatibility version 1.0.0, current version 1.0.0)\n")
}

#[test]
fn breadth_first_walk_reaches_transitive_deps() {
    let temp = tempdir().expect("tempdir");
    // Loader dirs come back symlink-resolved; keep every expectation in
    // canonical space.
    let root = temp.path().canonicalize().expect("canonicalize");
    let build_dir = root.join("build");
    fs::create_dir_all(&build_dir).unwrap();

    let app = build_dir.join("app");
    let lib_a = build_dir.join("libA.dylib");
    let lib_b = build_dir.join("libB.dylib");
    for bin in [&app, &lib_a, &lib_b] {
        fs::write(bin, b"bin").unwrap();
        make_executable(bin);
    }

    let otool = fake_otool(&root);
    write_fixture(&root, "app.l", &rpath_stanza("@executable_path/."));
    write_fixture(
        &root,
        "app.L",
        &format!(
            "{}:\n{}{}",
            app.display(),
            linked_line("@rpath/libA.dylib"),
            linked_line("/usr/lib/libSystem.B.dylib")
        ),
    );
    write_fixture(
        &root,
        "libA.dylib.l",
        &format!("{}{}", id_stanza("@rpath/libA.dylib"), rpath_stanza("@loader_path/.")),
    );
    write_fixture(
        &root,
        "libA.dylib.L",
        &format!(
            "{}:\n{}{}",
            lib_a.display(),
            linked_line("@rpath/libA.dylib"),
            linked_line("@loader_path/libB.dylib")
        ),
    );
    // libB carries no LC_RPATH at all: its only dylib-shaped line is its
    // own LC_ID_DYLIB, which must be excluded before resolution or the
    // walk would abort on an unresolvable @rpath.
    write_fixture(&root, "libB.dylib.l", &id_stanza("@rpath/libB.dylib"));
    write_fixture(
        &root,
        "libB.dylib.L",
        &format!(
            "{}:\n{}{}",
            lib_b.display(),
            linked_line("@rpath/libB.dylib"),
            linked_line("/usr/lib/libSystem.B.dylib")
        ),
    );

    let resolver = MacResolver::with_tool_path(&build_dir, otool);
    let closure = resolver.closure(&app).expect("closure");

    assert!(closure.contains(&app), "closure must contain the root binary");
    assert!(closure.contains(&lib_a));
    assert!(closure.contains(&lib_b), "transitive dep must be discovered");
    // libSystem resolves outside the build tree and is excluded.
    assert_eq!(closure.len(), 3);

    assert_eq!(resolver.closure(&app).expect("closure again"), closure);
}

#[test]
fn unresolved_rpath_token_is_fatal() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().canonicalize().expect("canonicalize");
    let build_dir = root.join("build");
    let empty = root.join("empty");
    fs::create_dir_all(&build_dir).unwrap();
    fs::create_dir_all(&empty).unwrap();

    let app = build_dir.join("app");
    fs::write(&app, b"bin").unwrap();
    make_executable(&app);

    let otool = fake_otool(&root);
    write_fixture(&root, "app.l", &rpath_stanza(empty.to_str().unwrap()));
    write_fixture(
        &root,
        "app.L",
        &format!("{}:\n{}", app.display(), linked_line("@rpath/libmissing.dylib")),
    );

    let resolver = MacResolver::with_tool_path(&build_dir, otool);
    let err = resolver.closure(&app).unwrap_err();
    assert!(
        matches!(err, ClosureError::UnresolvedDependency { .. }),
        "unexpected error: {err}"
    );
    assert!(err.to_string().contains("@rpath/libmissing.dylib"));
}

#[test]
fn direct_dependencies_use_rpaths_in_declared_order() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().canonicalize().expect("canonicalize");
    let build_dir = root.join("build");
    let preferred = build_dir.join("preferred");
    let fallback = build_dir.join("fallback");
    fs::create_dir_all(&preferred).unwrap();
    fs::create_dir_all(&fallback).unwrap();

    let app = build_dir.join("app");
    fs::write(&app, b"bin").unwrap();
    make_executable(&app);
    for dir in [&preferred, &fallback] {
        let lib = dir.join("libdup.dylib");
        fs::write(&lib, b"lib").unwrap();
        make_executable(&lib);
    }

    let otool = fake_otool(&root);
    write_fixture(
        &root,
        "app.l",
        &format!(
            "{}{}",
            rpath_stanza(preferred.to_str().unwrap()),
            rpath_stanza(fallback.to_str().unwrap())
        ),
    );
    write_fixture(
        &root,
        "app.L",
        &format!("{}:\n{}", app.display(), linked_line("@rpath/libdup.dylib")),
    );

    let resolver = MacResolver::with_tool_path(&build_dir, otool);
    let exe_dir = app.parent().unwrap();
    let deps = resolver.direct_dependencies(&app, exe_dir).expect("deps");
    assert_eq!(deps, vec![preferred.join("libdup.dylib")]);
}

#[test]
fn otool_failure_surfaces_as_inspect_error() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().canonicalize().expect("canonicalize");
    let build_dir = root.join("build");
    fs::create_dir_all(&build_dir).unwrap();
    let app = build_dir.join("app");
    fs::write(&app, b"bin").unwrap();
    make_executable(&app);

    // No fixtures written: the fake otool's cat fails, exiting non-zero.
    let otool = fake_otool(&root);
    let resolver = MacResolver::with_tool_path(&build_dir, otool);
    let err = resolver.closure(&app).unwrap_err();
    assert!(matches!(err, ClosureError::Inspect { .. }), "unexpected error: {err}");
}
