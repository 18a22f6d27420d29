use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const STATEMENT: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102

<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><CURDEF>USD
<BANKACCTFROM><BANKID>021000021<ACCTID>998877<ACCTTYPE>CHECKING</BANKACCTFROM>
<BANKTRANLIST><DTSTART>20240101<DTEND>20240131
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20240105<TRNAMT>-35.20<FITID>F1<NAME>CORNER MARKET</STMTTRN>
<STMTTRN><TRNTYPE>CREDIT<DTPOSTED>20240115<TRNAMT>1200.00<FITID>F2<NAME>ACME PAYROLL</STMTTRN>
</BANKTRANLIST><LEDGERBAL><BALAMT>1664.80<DTASOF>20240131</LEDGERBAL></STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>
";

struct Env {
    home: TempDir,
    data: PathBuf,
}

impl Env {
    fn new() -> Self {
        let home = tempfile::tempdir().unwrap();
        let data = home.path().join("data");
        Self { home, data }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("ledger-import").unwrap();
        cmd.env("HOME", self.home.path())
            .env_remove("RUST_LOG")
            .arg("--data-dir")
            .arg(&self.data);
        cmd
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn setup(&self) {
        self.cmd().arg("init").assert().success();
        self.cmd()
            .args(["accounts", "add", "Checking", "--type", "checking", "--balance", "500.00"])
            .assert()
            .success();
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_commands_require_init() {
    let env = Env::new();
    env.cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run `ledger-import init` first"));
}

#[test]
fn test_init_and_status() {
    let env = Env::new();
    env.setup();
    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Accounts: 1"))
        .stdout(predicate::str::contains("Transactions: 0"));
}

#[test]
fn test_review_json_summary() {
    let env = Env::new();
    env.setup();
    let file = env.write("jan.ofx", STATEMENT);

    let output = env
        .cmd()
        .args(["review", path_arg(&file), "--account", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["total"], 2);
    assert_eq!(value["summary"]["new"], 2);
    assert_eq!(value["bankAccountId"], "998877");
    assert_eq!(value["transactions"][0]["amount"], "35.20");
    assert_eq!(value["transactions"][1]["direction"], "credit");
}

#[test]
fn test_import_twice_is_idempotent() {
    let env = Env::new();
    env.setup();
    let file = env.write("jan.qfx", STATEMENT);

    env.cmd()
        .args(["import", path_arg(&file), "--account", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 imported, 0 duplicates skipped, balance change 1,164.80"));

    env.cmd()
        .args(["import", path_arg(&file), "--account", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 imported, 2 duplicates skipped, balance change 0.00"));

    env.cmd()
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1,664.80"));
}

#[test]
fn test_commit_request_from_stdin() {
    let env = Env::new();
    env.setup();
    let request = r#"{
        "accountId": 1,
        "transactions": [
            {"externalId": "C1", "date": "2024-02-01", "amount": "40.00",
             "direction": "debit", "description": "Fuel"}
        ],
        "adjustBalance": true
    }"#;

    env.cmd()
        .args(["commit", "-", "--json"])
        .write_stdin(request)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"balanceChange\": \"-40.00\""));

    env.cmd()
        .args(["commit", "-"])
        .write_stdin(request)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 imported, 1 duplicates skipped"));
}

#[test]
fn test_commit_rejects_unknown_account() {
    let env = Env::new();
    env.setup();
    let request = r#"{"accountId": 42, "transactions": [], "adjustBalance": true}"#;
    env.cmd()
        .args(["commit", "-"])
        .write_stdin(request)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown account: 42"));
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let env = Env::new();
    env.setup();
    let file = env.write("jan.csv", STATEMENT);
    env.cmd()
        .args(["review", path_arg(&file), "--account", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn test_rules_add_and_list() {
    let env = Env::new();
    env.setup();
    env.cmd()
        .args(["rules", "add", "MARKET", "--category", "Groceries"])
        .assert()
        .success();
    env.cmd()
        .args(["rules", "add", "X", "--category", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category: Nope"));
    env.cmd()
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Groceries"));
}
