//! CLI tests for the `ba` binary

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{NamedTempFile, TempDir};

/// `ba` command with logs kept inside a scratch directory
fn ba(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ba").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .current_dir(home.path());
    cmd
}

#[test]
fn test_classify_json_output() {
    let home = TempDir::new().unwrap();
    ba(&home)
        .args(["classify", "Génère des user stories", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"intent\": \"generate_stories\""))
        .stdout(predicate::str::contains("\"confidence\": 1.0"));
}

#[test]
fn test_classify_rejects_blank_text() {
    let home = TempDir::new().unwrap();
    ba(&home).args(["classify", "   "]).assert().failure();
}

#[test]
fn test_narrate_steps_file() {
    let home = TempDir::new().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"tool": "generate_stories", "result": {{"created": 4}}, "meta": {{"feature": "Paiement"}}, "duration": 2300}}]"#
    )
    .unwrap();

    ba(&home)
        .arg("narrate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("- generate_stories [feature:Paiement] : 4 créé(s) (2.3 s)"))
        .stdout(predicate::str::contains("Total : 4 créé(s), 0 mis à jour, 0 supprimé(s)."));
}

#[test]
fn test_narrate_rejects_non_array() {
    let home = TempDir::new().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"steps": []}}"#).unwrap();

    ba(&home).arg("narrate").arg(file.path()).assert().failure();
}

#[test]
fn test_chat_single_message() {
    let home = TempDir::new().unwrap();
    ba(&home)
        .args(["chat", "--message", "Supprime la story US-3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cette action demande votre confirmation : delete_item."));
}

#[test]
fn test_config_narrator_cap_applies() {
    let home = TempDir::new().unwrap();
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "narrator:\n  max-highlights: 1").unwrap();
    let mut steps = NamedTempFile::new().unwrap();
    write!(
        steps,
        r#"[{{"tool": "a", "result": {{"updated": 1}}}}, {{"tool": "b", "result": {{"updated": 2}}}}]"#
    )
    .unwrap();

    ba(&home)
        .arg("--config")
        .arg(config.path())
        .arg("narrate")
        .arg(steps.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("- a : 1 mis à jour"))
        .stdout(predicate::str::contains("- b").not())
        .stdout(predicate::str::contains("Total : 0 créé(s), 3 mis à jour, 0 supprimé(s)."));
}

#[test]
fn test_invalid_config_fails() {
    let home = TempDir::new().unwrap();
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "policy:\n  clarify-below: 2.0").unwrap();

    ba(&home)
        .arg("-c")
        .arg(config.path())
        .args(["classify", "liste les features"])
        .assert()
        .failure();
}
