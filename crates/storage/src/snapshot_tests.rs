// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use weft_core::ContextSeed;
use yare::parameterized;

fn sample_ctx() -> Context {
    let ctx = Context::new(ContextSeed::default());
    ctx.set("add.result", 2);
    ctx.set("label", "x");
    ctx.set_current_unit("div", UnitKind::Job);
    ctx
}

#[test]
fn capture_copies_the_context_state() {
    let snapshot = ContextSnapshot::capture(&sample_ctx(), RunStatus::Running);
    assert_eq!(snapshot.status, RunStatus::Running);
    assert_eq!(snapshot.current_unit.as_deref(), Some("div"));
    assert_eq!(snapshot.current_unit_kind, Some(UnitKind::Job));
    assert_eq!(snapshot.data.get("add.result"), Some(&json!(2)));
    assert_eq!(snapshot.data.get("label"), Some(&json!("x")));
}

#[parameterized(
    running = { RunStatus::Running },
    finished = { RunStatus::Finished },
)]
fn write_then_load_round_trips(status: RunStatus) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.dat");

    let snapshot = ContextSnapshot::capture(&sample_ctx(), status);
    write_snapshot(&FsSnapshotWriter, &path, &snapshot).unwrap();

    let loaded = load_snapshot(&path).unwrap().unwrap();
    assert_eq!(loaded.status, status);
    assert_eq!(loaded.current_unit.as_deref(), Some("div"));
    assert_eq!(loaded.current_unit_kind, Some(UnitKind::Job));
    assert_eq!(loaded.data, snapshot.data);
}

#[test]
fn missing_artifact_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_snapshot(&dir.path().join("absent.dat"))
        .unwrap()
        .is_none());
}

#[test]
fn rewrite_replaces_the_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.dat");

    let ctx = sample_ctx();
    write_snapshot(
        &FsSnapshotWriter,
        &path,
        &ContextSnapshot::capture(&ctx, RunStatus::Running),
    )
    .unwrap();

    ctx.set("extra", true);
    ctx.set_current_unit("next", UnitKind::Job);
    write_snapshot(
        &FsSnapshotWriter,
        &path,
        &ContextSnapshot::capture(&ctx, RunStatus::Finished),
    )
    .unwrap();

    let loaded = load_snapshot(&path).unwrap().unwrap();
    assert_eq!(loaded.status, RunStatus::Finished);
    assert_eq!(loaded.current_unit.as_deref(), Some("next"));
    assert_eq!(loaded.data.get("extra"), Some(&json!(true)));
}

#[test]
fn no_tmp_file_survives_a_successful_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.dat");
    write_snapshot(
        &FsSnapshotWriter,
        &path,
        &ContextSnapshot::capture(&sample_ctx(), RunStatus::Running),
    )
    .unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

/// Writer that fails at the rename step, simulating a crash between the
/// tmp write and publication.
struct RenameFails;

impl SnapshotWriter for RenameFails {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), SnapshotError> {
        FsSnapshotWriter.write_tmp(path, data)
    }

    fn fsync_file(&self, path: &Path) -> Result<(), SnapshotError> {
        FsSnapshotWriter.fsync_file(path)
    }

    fn rename(&self, _from: &Path, _to: &Path) -> Result<(), SnapshotError> {
        Err(SnapshotError::Io(std::io::Error::other("injected")))
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), SnapshotError> {
        FsSnapshotWriter.fsync_dir(path)
    }
}

#[test]
fn failed_publication_leaves_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.dat");
    let snapshot = ContextSnapshot::capture(&sample_ctx(), RunStatus::Running);

    assert!(write_snapshot(&RenameFails, &path, &snapshot).is_err());
    assert!(!path.exists());
    assert!(load_snapshot(&path).unwrap().is_none());
}
