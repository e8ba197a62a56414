use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

const HEADER: &str = "freelancer,total_earnings,wallet_balance,pending_withdrawal,available_balance";

const EARN: &str = r#"{"op":"create_order","alias":"o1","client":"c1","freelancer":"f1","service":"s1","package":"basic","price":"500000"}
{"op":"accept","order":"o1","caller":"f1"}
{"op":"attach_file","order":"o1","caller":"f1","file":"out.zip"}
{"op":"submit_work","order":"o1","caller":"f1"}
{"op":"approve","order":"o1","caller":"c1"}
"#;

fn script(lines: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{lines}").unwrap();
    file
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay").arg("tests/fixtures/withdrawal.jsonl");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(HEADER))
        .stdout(predicate::str::contains("freelancer-1,500000,293000,0,293000"));

    Ok(())
}

#[test]
fn test_cli_pending_before_holding_window() {
    let file = script(&format!(
        "{EARN}{}\n",
        r#"{"op":"request_withdrawal","alias":"w1","freelancer":"f1","amount":"200000","bank_name":"B","account_number":"1","account_holder":"H"}"#
    ));

    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay").arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("f1,500000,500000,207000,293000"));
}

#[test]
fn test_cli_rejected_commands_are_logged_not_fatal() {
    let file = script(&format!(
        "{EARN}{}\n{}\n",
        r#"{"op":"request_withdrawal","alias":"w1","freelancer":"f1","amount":"600000","bank_name":"B","account_number":"1","account_holder":"H"}"#,
        r#"{"op":"teleport"}"#
    ));

    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay").arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("f1,500000,500000,0,500000"))
        .stderr(predicate::str::contains("INSUFFICIENT_BALANCE"))
        .stderr(predicate::str::contains("line 7"));
}

#[test]
fn test_cli_config_file_and_holding_window_override() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    write!(config, r#"{{"admin_fee":"5000"}}"#).unwrap();
    let file = script(&format!(
        "{EARN}{}\n{}\n{}\n",
        r#"{"op":"request_withdrawal","alias":"w1","freelancer":"f1","amount":"100000","bank_name":"B","account_number":"1","account_holder":"H"}"#,
        r#"{"op":"advance","secs":60}"#,
        r#"{"op":"sweep"}"#
    ));

    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay")
        .arg(file.path())
        .arg("--config")
        .arg(config.path())
        .arg("--holding-window-secs")
        .arg("60");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("f1,500000,395000,0,395000"));
}

#[test]
fn test_cli_oversized_holding_window_fails() {
    let file = script(EARN);

    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay")
        .arg(file.path())
        .arg("--holding-window-secs")
        .arg("10000000000000000");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("holding_window_secs"));
}

#[test]
fn test_cli_oversized_advance_is_rejected() {
    let file = script(&format!(
        "{EARN}{}\n{}\n",
        r#"{"op":"advance","secs":18446744073709551615}"#,
        r#"{"op":"sweep"}"#
    ));

    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay").arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("f1,500000,500000,0,500000"))
        .stderr(predicate::str::contains("VALIDATION_ERROR"));
}

#[test]
fn test_cli_invalid_config_fails() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    write!(config, r#"{{"platform_fee_rate":"1.5"}}"#).unwrap();
    let file = script(EARN);

    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay").arg(file.path()).arg("--config").arg(config.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("platform_fee_rate"));
}

#[test]
fn test_cli_missing_script_fails() {
    let mut cmd = Command::new(cargo_bin!("gigledger"));
    cmd.arg("replay").arg("tests/fixtures/does-not-exist.jsonl");

    cmd.assert().failure();
}
