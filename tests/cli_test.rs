/// CLI binary integration tests using assert_cmd
///
/// These tests invoke the actual binary and verify command-line behavior
mod common;

use std::process::Command;

use assert_cmd::prelude::*;
use common::{ClaudeConversationBuilder, ExportDirBuilder, markdown_files, realistic_chatgpt_export, vault_dir};
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ai-history-importer"));
    // Keep the developer's own settings file out of the way
    let no_home = std::env::temp_dir().join("ai-history-importer-cli-test-home");
    cmd.env_remove("AI_HISTORY_IMPORTER_CONFIG")
        .env_remove("RUST_LOG")
        .env("HOME", &no_home)
        .env("XDG_CONFIG_HOME", no_home.join(".config"));
    cmd
}

#[test]
fn test_cli_import_chatgpt() {
    let export = realistic_chatgpt_export();
    let vault = vault_dir();

    cli()
        .args(["import", "chatgpt", "--export-dir"])
        .arg(export.path())
        .arg("--vault")
        .arg(vault.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported: 2"))
        .stdout(predicate::str::contains("Skipped: 0"))
        .stdout(predicate::str::contains("Errors: 0"));

    assert_eq!(markdown_files(vault.path()).len(), 2);
    assert!(vault.path().join(".ai-history-importer/state.json").exists());

    // Second run: the state file marks both conversations unchanged
    cli()
        .args(["import", "chatgpt", "--export-dir"])
        .arg(export.path())
        .arg("--vault")
        .arg(vault.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported: 0"))
        .stdout(predicate::str::contains("Skipped: 2"));
}

#[test]
fn test_cli_import_no_state_and_notes_dir() {
    let export = realistic_chatgpt_export();
    let vault = vault_dir();

    cli()
        .args(["import", "chatgpt", "--no-state", "--notes-dir", "Inbox/GPT", "--export-dir"])
        .arg(export.path())
        .arg("--vault")
        .arg(vault.path())
        .assert()
        .success();

    assert!(!vault.path().join(".ai-history-importer").exists());
    assert_eq!(
        markdown_files(vault.path()),
        vec!["Inbox/GPT/Rust help-conv-bbb.md", "Inbox/GPT/Trip planning-conv-aaa.md"]
    );
}

#[test]
fn test_cli_import_uses_settings_file() {
    let export = ExportDirBuilder::new()
        .with_conversations(&[ClaudeConversationBuilder::new("claude-1111aaaa")
            .name("Configured")
            .text("human", "hi")
            .build()])
        .build();
    let vault = vault_dir();
    let config_dir = tempfile::TempDir::new().unwrap();
    let config_path = config_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!("vault = {:?}\n\n[claude]\nnotes_directory = \"Claude notes\"\n", vault.path()),
    )
    .unwrap();

    cli()
        .env("AI_HISTORY_IMPORTER_CONFIG", &config_path)
        .args(["import", "claude", "--export-dir"])
        .arg(export.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported: 1"));

    assert_eq!(markdown_files(vault.path()), vec!["Claude notes/Configured-claude-1.md"]);
}

#[test]
fn test_cli_parse_prints_json() {
    let export = realistic_chatgpt_export();

    let output = cli().args(["parse", "chatgpt", "--export-dir"]).arg(export.path()).output().unwrap();
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["importKey"], "chatgpt:conv-aaaa1111");
    assert_eq!(records[0]["messages"][0]["role"], "user");
}

#[test]
fn test_cli_stats() {
    let export = realistic_chatgpt_export();

    cli()
        .args(["stats", "chatgpt", "--export-dir"])
        .arg(export.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ChatGPT Export Statistics"))
        .stdout(predicate::str::contains("Conversations: 2"))
        .stdout(predicate::str::contains("Messages: 4"))
        .stdout(predicate::str::contains("Resolved: 1"))
        .stdout(predicate::str::contains("Unresolved: 1"))
        .stdout(predicate::str::contains("Oldest conversation: Nov 14, 2023"));
}

#[test]
fn test_cli_missing_conversations_file_fails() {
    let export = ExportDirBuilder::new().build();
    let vault = vault_dir();

    cli()
        .args(["import", "claude", "--export-dir"])
        .arg(export.path())
        .arg("--vault")
        .arg(vault.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read Claude export"));
}

#[test]
fn test_cli_import_requires_vault() {
    let export = realistic_chatgpt_export();
    let config_dir = tempfile::TempDir::new().unwrap();
    let config_path = config_dir.path().join("config.toml");
    std::fs::write(&config_path, "").unwrap();

    cli()
        .env("AI_HISTORY_IMPORTER_CONFIG", &config_path)
        .args(["import", "chatgpt", "--export-dir"])
        .arg(export.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No vault given"));
}

#[test]
fn test_cli_help_flag() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Import ChatGPT and Claude conversation exports"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("stats"));
}

#[test]
fn test_cli_unknown_format_is_rejected() {
    cli().args(["parse", "gemini", "--export-dir", "x"]).assert().failure();
}
