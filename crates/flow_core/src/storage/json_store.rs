use crate::config::config_dir;
use crate::error::AppError;
use crate::model::{Note, PomodoroSession, Task};
use crate::session::require_session;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 2;
const STORE_FILE_NAME: &str = "store.json";
const STORE_ENV_VAR: &str = "FLOW_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    schema_version: u32,
    tasks: Vec<Task>,
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    sessions: Vec<PomodoroSession>,
}

/// Everything one profile owns.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlowState {
    pub tasks: Vec<Task>,
    pub notes: Vec<Note>,
    pub sessions: Vec<PomodoroSession>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    let session = require_session()?;
    Ok(config_dir()?
        .join("users")
        .join(session.user)
        .join(STORE_FILE_NAME))
}

pub fn load_state(path: &Path) -> Result<FlowState, AppError> {
    if !path.exists() {
        return Ok(FlowState::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredState =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    ensure_unique_ids("task", stored.tasks.iter().map(|task| task.id.as_str()))?;
    ensure_unique_ids("note", stored.notes.iter().map(|note| note.id.as_str()))?;
    ensure_unique_ids(
        "session",
        stored.sessions.iter().map(|session| session.id.as_str()),
    )?;

    Ok(FlowState {
        tasks: stored.tasks,
        notes: stored.notes,
        sessions: stored.sessions,
    })
}

fn ensure_unique_ids<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::invalid_data(format!("duplicate {kind} id '{id}'")));
        }
    }
    Ok(())
}

pub fn save_state(path: &Path, state: &FlowState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredState {
        schema_version: SCHEMA_VERSION,
        tasks: state.tasks.clone(),
        notes: state.notes.clone(),
        sessions: state.sessions.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    debug!(
        "event=store_save path={} tasks={} notes={} sessions={}",
        path.display(),
        state.tasks.len(),
        state.notes.len(),
        state.sessions.len()
    );
    Ok(())
}

/// Loads the state, applies `change` and saves only when it succeeded.
pub fn update_state<T>(
    path: &Path,
    change: impl FnOnce(&mut FlowState) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut state = load_state(path)?;
    let outcome = change(&mut state)?;
    save_state(path, &state)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::{FlowState, SCHEMA_VERSION, load_state, save_state, update_state};
    use crate::error::AppError;
    use crate::model::{Note, PomodoroSession, Task};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("flow-{nanos}-{file_name}"))
    }

    fn sample_state() -> FlowState {
        FlowState {
            tasks: vec![Task {
                id: "task-1".to_string(),
                title: "demo".to_string(),
                note: None,
                priority: None,
                due_date: None,
                completed: false,
                created_at: "2025-12-20T00:00:00Z".to_string(),
                completed_at: None,
            }],
            notes: vec![Note {
                id: "note-1".to_string(),
                content: "idea".to_string(),
                completed: false,
                created_at: "2025-12-20T00:00:00Z".to_string(),
                last_edited: "2025-12-20T00:00:00Z".to_string(),
            }],
            sessions: vec![PomodoroSession {
                id: "session-1".to_string(),
                task_name: "demo".to_string(),
                note: None,
                duration_minutes: 25,
                completed_at: "2025-12-20T00:25:00Z".to_string(),
            }],
        }
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let path = temp_path("missing.json");
        assert_eq!(load_state(&path).unwrap(), FlowState::default());
    }

    #[test]
    fn save_and_load_preserves_all_collections() {
        let path = temp_path("state.json");
        let state = sample_state();

        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, state);
    }

    #[cfg(unix)]
    #[test]
    fn saved_store_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;
        let path = temp_path("private.json");

        save_state(&path, &FlowState::default()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        fs::remove_file(&path).ok();

        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn accepts_v1_schema_with_tasks_only() {
        let path = temp_path("v1-schema.json");
        let content = "{\n  \"schema_version\": 1,\n  \"tasks\": [\n    {\n      \"id\": \"task-1\",\n      \"title\": \"demo\",\n      \"created_at\": \"2025-12-20T00:00:00Z\"\n    }\n  ]\n}";
        fs::write(&path, content).unwrap();

        let loaded = load_state(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.tasks.len(), 1);
        assert!(!loaded.tasks[0].completed);
        assert_eq!(loaded.tasks[0].priority, None);
        assert!(loaded.notes.is_empty());
        assert!(loaded.sessions.is_empty());
    }

    #[test]
    fn rejects_unknown_priority_value() {
        let path = temp_path("bad-priority.json");
        let content = "{\n  \"schema_version\": 2,\n  \"tasks\": [\n    {\n      \"id\": \"task-1\",\n      \"title\": \"demo\",\n      \"priority\": \"someday\",\n      \"created_at\": \"2025-12-20T00:00:00Z\"\n    }\n  ]\n}";
        fs::write(&path, content).unwrap();

        let err = load_state(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn rejects_duplicate_note_ids() {
        let path = temp_path("dup-notes.json");
        let mut state = sample_state();
        state.notes.push(state.notes[0].clone());
        save_state(&path, &state).unwrap();

        let err = load_state(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
        assert!(err.message().contains("note-1"));
    }

    #[test]
    fn schema_version_must_be_known() {
        let path = temp_path("bad-schema.json");
        let bad = format!(
            "{{\n  \"schema_version\": {},\n  \"tasks\": []\n}}",
            SCHEMA_VERSION + 1
        );
        fs::write(&path, bad).unwrap();

        let err = load_state(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn update_state_skips_save_on_error() {
        let path = temp_path("update-error.json");
        save_state(&path, &sample_state()).unwrap();

        let err = update_state(&path, |state| {
            state.tasks.clear();
            Err::<(), _>(AppError::invalid_input("nope"))
        })
        .unwrap_err();
        let loaded = load_state(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(loaded.tasks.len(), 1);
    }
}
