use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;
use common::command_file;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let file = command_file(&["create, 1, , 100, SGD, 3, 2024-01-15"]);

    let mut cmd = Command::new(cargo_bin!("loanbook"));
    cmd.arg(file.path()).arg("--db-path").arg("some_db");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."))
        .stdout(predicate::str::contains("1,1,100,100,SGD,3,2024-01-15,due"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let file = command_file(&["create, 1, , 100, SGD, 3, 2024-01-15"]);

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("loanbook"));
    cmd.arg(file.path()).arg("--db-path").arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back").not());
}
