use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("flow-{nanos}-{file_name}"))
}

fn run(store_path: &Path, args: &[&str]) -> Output {
    let scratch = store_path.with_extension("d");
    Command::new(env!("CARGO_BIN_EXE_flow"))
        .args(args)
        .env("HOME", &scratch)
        .env("FLOW_STORE_PATH", store_path)
        .env("FLOW_CONFIG_PATH", scratch.join("config.json"))
        .env("FLOW_LOG_DIR", scratch.join("logs"))
        .env("FLOW_DISABLE_NOTIFICATIONS", "1")
        .env_remove("FLOW_LOG")
        .output()
        .expect("failed to run flow")
}

fn cleanup(store_path: &Path) {
    std::fs::remove_file(store_path).ok();
    std::fs::remove_dir_all(store_path.with_extension("d")).ok();
}

#[test]
fn history_lists_newest_first_and_clear_empties_it() {
    let store_path = temp_path("cli-pomodoro-history.json");
    let content = serde_json::json!({
        "schema_version": 2,
        "tasks": [],
        "notes": [],
        "sessions": [
            {
                "id": "session-1",
                "task_name": "Morning block",
                "duration_minutes": 25,
                "completed_at": "2025-12-20T09:25:00Z"
            },
            {
                "id": "session-2",
                "task_name": "Afternoon block",
                "note": "deep work",
                "duration_minutes": 50,
                "completed_at": "2025-12-20T15:50:00Z"
            }
        ]
    });
    std::fs::write(&store_path, serde_json::to_string_pretty(&content).unwrap()).unwrap();

    let json = run(&store_path, &["--json", "pomodoro", "history"]);
    let table = run(&store_path, &["pomodoro", "history"]);
    let cleared = run(&store_path, &["pomodoro", "clear"]);
    let empty = run(&store_path, &["pomodoro", "history"]);
    cleanup(&store_path);

    assert!(json.status.success());
    let value: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(value[0]["id"], "session-2");
    assert_eq!(value[1]["id"], "session-1");

    let stdout = String::from_utf8_lossy(&table.stdout);
    assert!(stdout.contains("Afternoon block"));
    assert!(stdout.contains("deep work"));

    assert!(String::from_utf8_lossy(&cleared.stdout).contains("Cleared 2 sessions"));
    assert!(String::from_utf8_lossy(&empty.stdout).contains("No sessions"));
}

#[test]
fn start_rejects_out_of_range_minutes() {
    let store_path = temp_path("cli-pomodoro-range.json");
    let zero = run(&store_path, &["pomodoro", "start", "--minutes", "0"]);
    let long = run(&store_path, &["pomodoro", "start", "--minutes", "121"]);
    let exists = store_path.exists();
    cleanup(&store_path);

    for output in [zero, long] {
        assert_eq!(output.status.code(), Some(1));
        assert!(
            String::from_utf8_lossy(&output.stderr)
                .contains("duration must be between 1 and 120 minutes")
        );
    }
    assert!(!exists);
}

#[test]
fn start_with_unknown_task_id_fails_before_counting() {
    let store_path = temp_path("cli-pomodoro-task.json");
    let output = run(
        &store_path,
        &["pomodoro", "start", "--minutes", "1", "--task-id", "task-404"],
    );
    cleanup(&store_path);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: not_found - task not found"));
}
