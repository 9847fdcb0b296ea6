use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tally-{nanos}-{name}"))
}

fn run(store_dir: &Path, args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_tally");
    Command::new(exe)
        .args(args)
        .env("TALLY_STORE_DIR", store_dir)
        .env("TALLY_CONFIG_PATH", store_dir.join("config.json"))
        .env_remove("TALLY_LOG")
        .output()
        .expect("failed to run tally")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stored_tasks(store_dir: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(store_dir.join("tasks.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn add_task(store_dir: &Path, title: &str) -> String {
    let output = run(store_dir, &["task", "add", title, "--json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    value["id"].as_str().unwrap().to_string()
}

#[test]
fn add_command_persists_active_task() {
    let dir = temp_path("cli-task-add");
    let output = run(&dir, &["task", "add", "Buy milk", "-d", "2 litres"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Added task: Buy milk"));

    let stored = stored_tasks(&dir);
    std::fs::remove_dir_all(&dir).ok();

    let id = stored["activeIds"][0].as_str().unwrap();
    assert_eq!(stored["trashedIds"], serde_json::json!([]));
    assert_eq!(stored["records"][id]["title"], "Buy milk");
    assert_eq!(stored["records"][id]["description"], "2 litres");
    assert_eq!(stored["records"][id]["completed"], false);
    assert!(stored["records"][id]["createdAt"].is_string());
}

#[test]
fn add_command_rejects_blank_title() {
    let dir = temp_path("cli-task-blank");
    let output = run(&dir, &["task", "add", "   "]);
    let exists = dir.join("tasks.json").exists();
    std::fs::remove_dir_all(&dir).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - title is required"));
    assert!(!exists);
}

#[test]
fn consecutive_adds_get_distinct_ids() {
    let dir = temp_path("cli-task-ids");
    let first = add_task(&dir, "one");
    let second = add_task(&dir, "two");
    let stored = stored_tasks(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert_ne!(first, second);
    assert_eq!(stored["activeIds"], serde_json::json!([first, second]));
}

#[test]
fn toggle_command_flips_completion() {
    let dir = temp_path("cli-task-toggle");
    let id = add_task(&dir, "Buy milk");

    let first = run(&dir, &["task", "toggle", &id]);
    let after_first = stored_tasks(&dir);
    let second = run(&dir, &["task", "toggle", &id]);
    let after_second = stored_tasks(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(stdout(&first).contains("Completed task: Buy milk"));
    assert_eq!(after_first["records"][&id]["completed"], true);
    assert!(stdout(&second).contains("Reopened task: Buy milk"));
    assert_eq!(after_second["records"][&id]["completed"], false);
}

#[test]
fn edit_command_updates_named_fields_only() {
    let dir = temp_path("cli-task-edit");
    let id = add_task(&dir, "old");
    run(&dir, &["task", "toggle", &id]);

    let output = run(&dir, &["task", "edit", &id, "--title", "new title"]);
    let stored = stored_tasks(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    assert!(stdout(&output).contains("Updated task: new title"));
    assert_eq!(stored["records"][&id]["title"], "new title");
    assert_eq!(stored["records"][&id]["completed"], true);
}

#[test]
fn edit_command_requires_a_field() {
    let dir = temp_path("cli-task-edit-empty");
    let id = add_task(&dir, "old");

    let output = run(&dir, &["task", "edit", &id]);
    std::fs::remove_dir_all(&dir).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nothing to update"));
}

#[test]
fn unknown_id_is_rejected() {
    let dir = temp_path("cli-task-unknown");
    add_task(&dir, "real");

    let output = run(&dir, &["task", "toggle", "12345"]);
    std::fs::remove_dir_all(&dir).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - task not found"));
}

#[test]
fn delete_is_idempotent_and_restore_brings_task_back() {
    let dir = temp_path("cli-task-trash");
    let first = add_task(&dir, "first");
    let second = add_task(&dir, "second");

    let deleted = run(&dir, &["task", "delete", &first]);
    let after_delete = stored_tasks(&dir);
    let deleted_again = run(&dir, &["task", "delete", &first]);
    let after_second_delete = stored_tasks(&dir);
    let restored = run(&dir, &["task", "restore", &first]);
    let after_restore = stored_tasks(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(stdout(&deleted).contains("Deleted task: first"));
    assert_eq!(after_delete["activeIds"], serde_json::json!([second]));
    assert_eq!(after_delete["trashedIds"], serde_json::json!([first]));

    assert!(deleted_again.status.success());
    assert!(stdout(&deleted_again).contains("Task already in trash: first"));
    assert_eq!(after_second_delete, after_delete);

    assert!(stdout(&restored).contains("Restored task: first"));
    assert_eq!(after_restore["activeIds"], serde_json::json!([second, first]));
    assert_eq!(after_restore["trashedIds"], serde_json::json!([]));
}

#[test]
fn list_command_filters_active_and_trash() {
    let dir = temp_path("cli-task-list");
    add_task(&dir, "keep me");
    let gone = add_task(&dir, "throw me");
    run(&dir, &["task", "delete", &gone]);

    let active = run(&dir, &["task", "list"]);
    let trash = run(&dir, &["task", "list", "--trash", "--json"]);
    std::fs::remove_dir_all(&dir).ok();

    let active_text = stdout(&active);
    assert!(active_text.contains("keep me"));
    assert!(!active_text.contains("throw me"));

    let trashed: serde_json::Value = serde_json::from_str(stdout(&trash).trim()).unwrap();
    let entries = trashed.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["title"], "throw me");
    assert_eq!(entries[0]["status"], "trashed");
}

#[test]
fn list_command_reports_empty_lists() {
    let dir = temp_path("cli-task-empty");
    let active = run(&dir, &["task", "list"]);
    let trash = run(&dir, &["task", "list", "--trash"]);
    std::fs::remove_dir_all(&dir).ok();

    assert!(stdout(&active).contains("No tasks."));
    assert!(stdout(&trash).contains("Trash is empty."));
}

#[test]
fn show_command_prints_details() {
    let dir = temp_path("cli-task-show");
    let id = add_task(&dir, "show me");

    let output = run(&dir, &["task", "show", &id]);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains(&format!("ID: {id}")));
    assert!(text.contains("Title: show me"));
    assert!(text.contains("State: active"));
}

#[test]
fn malformed_store_falls_back_to_empty_state() {
    let dir = temp_path("cli-task-malformed");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("tasks.json"), "{ this is not json").unwrap();

    let list = run(&dir, &["task", "list"]);
    let added = run(&dir, &["task", "add", "fresh start"]);
    let stored = stored_tasks(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(list.status.success());
    assert!(stdout(&list).contains("No tasks."));
    assert!(added.status.success());
    assert_eq!(stored["activeIds"].as_array().unwrap().len(), 1);
}
