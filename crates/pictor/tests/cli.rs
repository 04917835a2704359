use assert_cmd::Command; // Bring Command into scope
use predicates::prelude::*; // Bring predicate traits into scope
use std::fs;
use tempfile::TempDir;

#[test]
fn test_ping_command() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("pictor")?;

    cmd.arg("--ping");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pong"));

    Ok(())
}

#[test]
fn test_no_args_prints_hint() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("pictor")?;

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pictor serve"))
        .stdout(predicate::str::contains("pong").not());

    Ok(())
}

#[test]
fn test_config_command_prints_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("pictor.json");
    fs::write(&path, r#"{"contentNegotiateImages": false, "storage": {"type": "filesystem"}}"#)?;

    let mut cmd = Command::cargo_bin("pictor")?;
    cmd.arg("config").arg("--config").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"contentNegotiateImages\": false"))
        .stdout(predicate::str::contains("\"filesystem\""));

    Ok(())
}

#[test]
fn test_missing_config_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = Command::cargo_bin("pictor")?;
    cmd.arg("config").arg("--config").arg(dir.path().join("absent.json"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));

    Ok(())
}

#[test]
fn test_serve_rejects_invalid_address() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("pictor")?;
    cmd.arg("serve").arg("--listen").arg("not-an-address");

    cmd.assert().failure();

    Ok(())
}
