use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

const EARN: &str = r#"{"op":"create_order","alias":"o1","client":"c1","freelancer":"f1","service":"s1","package":"premium","price":"100000"}
{"op":"accept","order":"o1","caller":"f1"}
{"op":"attach_file","order":"o1","caller":"f1","file":"out.zip"}
{"op":"submit_work","order":"o1","caller":"f1"}
{"op":"approve","order":"o1","caller":"c1"}
"#;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let mut script = tempfile::NamedTempFile::new().unwrap();
    write!(script, "{EARN}").unwrap();

    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay").arg(script.path()).arg("--db-path").arg("some_db");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("f1,100000,100000,0,100000"))
        .stderr(predicate::str::contains("falling back to in-memory storage"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_state_survives_restart() {
    let mut first = tempfile::NamedTempFile::new().unwrap();
    write!(first, "{EARN}").unwrap();
    let mut second = tempfile::NamedTempFile::new().unwrap();
    writeln!(second, "# nothing to do, just report").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ledger_db");

    Command::new(cargo_bin!("gigledger"))
        .arg("replay")
        .arg(first.path())
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("falling back").not());

    Command::new(cargo_bin!("gigledger"))
        .arg("replay")
        .arg(second.path())
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("f1,100000,100000,0,100000"));
}
