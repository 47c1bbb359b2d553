use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TOKEN: &str = "\
class Token {
  var owner: address
  var balances: mapping<address, uint256>

  event Transfer(from: address indexed, to: address indexed, amount: uint256)

  method setBalance(a: address, v: uint256)
    modifies this
  {
    balances[a] := v;
  }

  method balanceOf(who: address) returns (uint256) {
    return balances[who];
  }
}
";

fn fixture(source: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.dfy");
    fs::write(&path, source).unwrap();
    (dir, path)
}

fn veriyul(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("veriyul").unwrap();
    cmd.current_dir(dir).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_selectors() {
    let (dir, path) = fixture(TOKEN);
    veriyul(dir.path())
        .arg("selectors")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("setBalance(address,uint256) -> 0x"))
        .stdout(predicate::str::contains("balanceOf(address) -> 0x70a08231"));
}

#[test]
fn test_abi_compact() {
    let (dir, path) = fixture(TOKEN);
    veriyul(dir.path())
        .args(["abi", "--compact"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            r#"[{"type":"constructor","inputs":[],"stateMutability":"nonpayable"}"#,
        ))
        .stdout(predicate::str::contains(r#""name":"Transfer""#));
}

#[test]
fn test_compile_yul_only_writes_artifacts() {
    let (dir, path) = fixture(TOKEN);
    let out = dir.path().join("out");
    veriyul(dir.path())
        .args(["compile", "--skip-verification", "--yul-only", "-o"])
        .arg(&out)
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCESS:"))
        .stdout(predicate::str::contains("Compiled Token"));

    let yul = fs::read_to_string(out.join("Token.yul")).unwrap();
    assert!(yul.starts_with("object \"Token\" {"));
    assert!(out.join("Token.abi.json").is_file());
    assert!(!out.join("Token.bin").exists());
}

#[test]
fn test_compile_default_output_dir() {
    let (dir, path) = fixture(TOKEN);
    veriyul(dir.path())
        .args(["compile", "--skip-verification", "--yul-only"])
        .arg(&path)
        .assert()
        .success();
    assert!(dir.path().join("build").join("Token.yul").is_file());
}

#[test]
fn test_compile_json_report() {
    let (dir, path) = fixture(TOKEN);
    veriyul(dir.path())
        .args(["compile", "--skip-verification", "--yul-only", "--json"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success": true"#))
        .stdout(predicate::str::contains(r#""contract_name": "Token""#))
        .stdout(predicate::str::contains(r#""bytecode": null"#));
}

#[test]
fn test_config_file() {
    let (dir, path) = fixture(TOKEN);
    let config = dir.path().join("veriyul.json");
    fs::write(&config, r#"{"verify": false, "mode": "yul-only"}"#).unwrap();
    veriyul(dir.path())
        .arg("compile")
        .arg("--config")
        .arg(&config)
        .arg(&path)
        .assert()
        .success();
    assert!(dir.path().join("build").join("Token.abi.json").is_file());
}

#[test]
fn test_constructor_as_method_fails() {
    let (dir, path) = fixture("class Bad {\n  method constructor() { }\n}\n");
    veriyul(dir.path())
        .args(["compile", "--skip-verification", "--yul-only"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAILED:"))
        .stdout(predicate::str::contains("constructor cannot be declared as a method"));
    assert!(!dir.path().join("build").exists());
}

#[test]
fn test_missing_verifier_blocks_compile() {
    let (dir, path) = fixture(TOKEN);
    veriyul(dir.path())
        .args(["compile", "--yul-only", "--dafny"])
        .arg(dir.path().join("no-such-dafny"))
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("dafny not found"));
    assert!(!dir.path().join("build").exists());
}

#[test]
fn test_allow_unverified_continues() {
    let (dir, path) = fixture(TOKEN);
    veriyul(dir.path())
        .args(["compile", "--yul-only", "--allow-unverified", "--dafny"])
        .arg(dir.path().join("no-such-dafny"))
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("WARNING:"));
    assert!(dir.path().join("build").join("Token.yul").is_file());
}

#[test]
fn test_conflicting_modes_rejected() {
    let (dir, path) = fixture(TOKEN);
    veriyul(dir.path())
        .args(["compile", "--verify-only", "--skip-verification"])
        .arg(&path)
        .assert()
        .code(2);
}

#[test]
fn test_inspect() {
    let (dir, path) = fixture(TOKEN);
    veriyul(dir.path())
        .arg("inspect")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Contract Token"))
        .stdout(predicate::str::contains("slot 1 : mapping<address, uint256>"))
        .stdout(predicate::str::contains("balanceOf(address)"))
        .stdout(predicate::str::contains("public view 0x70a08231"));
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    veriyul(dir.path())
        .args(["selectors", "absent.dfy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read absent.dfy"));
}
