use serde::{Deserialize, Serialize};

/// A finished pomodoro, appended to the history when the countdown ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSession {
    pub id: String,
    pub task_name: String,
    #[serde(default)]
    pub note: Option<String>,
    pub duration_minutes: u32,
    pub completed_at: String,
}
