//! Plain-text and JSON views of core records.
//!
//! Table cells stay uncolored so column widths line up; palette accents are
//! applied to the surrounding lines only.

use flow_core::config::Palette;
use flow_core::error::AppError;
use flow_core::model::{Note, PomodoroSession, Task};
use flow_core::pomodoro::Countdown;
use flow_core::task_api::task_overdue;
use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const TITLE_WIDTH: usize = 40;
const PROGRESS_WIDTH: usize = 20;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DONE")]
    done: &'static str,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "PRIORITY")]
    priority: String,
    #[tabled(rename = "DUE")]
    due: String,
}

#[derive(Tabled)]
struct NoteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DONE")]
    done: &'static str,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "LAST EDITED")]
    last_edited: String,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "COMPLETED")]
    completed_at: String,
    #[tabled(rename = "TASK")]
    task_name: String,
    #[tabled(rename = "MINUTES")]
    minutes: u32,
    #[tabled(rename = "NOTE")]
    note: String,
}

fn marker(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn render_table<R: Tabled>(rows: Vec<R>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::psql());
    table.to_string()
}

fn due_label(task: &Task) -> Result<String, AppError> {
    Ok(match task.due_date.as_deref() {
        Some(due) if task_overdue(task)? => format!("{due} (overdue)"),
        Some(due) => due.to_string(),
        None => "-".to_string(),
    })
}

pub fn tasks_table(tasks: &[Task]) -> Result<String, AppError> {
    let mut rows = Vec::with_capacity(tasks.len());
    for task in tasks {
        rows.push(TaskRow {
            id: task.id.clone(),
            done: marker(task.completed),
            title: truncate(&task.title, TITLE_WIDTH),
            priority: task
                .priority
                .map(|priority| priority.label().to_string())
                .unwrap_or_else(|| "-".to_string()),
            due: due_label(task)?,
        });
    }
    Ok(render_table(rows))
}

pub fn task_detail(task: &Task) -> Result<String, AppError> {
    let lines = [
        format!("ID:        {}", task.id),
        format!("Title:     {}", task.title),
        format!(
            "Status:    {}",
            if task.completed { "completed" } else { "active" }
        ),
        format!(
            "Priority:  {}",
            task.priority.map(|priority| priority.label()).unwrap_or("-")
        ),
        format!("Due:       {}", due_label(task)?),
        format!("Note:      {}", task.note.as_deref().unwrap_or("-")),
        format!("Created:   {}", task.created_at),
        format!(
            "Completed: {}",
            task.completed_at.as_deref().unwrap_or("-")
        ),
    ];
    Ok(lines.join("\n"))
}

/// Task record plus its computed `overdue` flag.
pub fn task_json(task: &Task) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(task)?;
    if let Value::Object(map) = &mut value {
        map.insert("overdue".to_string(), Value::Bool(task_overdue(task)?));
    }
    Ok(value)
}

pub fn tasks_json(tasks: &[Task]) -> Result<Value, AppError> {
    let mut payload = Vec::with_capacity(tasks.len());
    for task in tasks {
        payload.push(task_json(task)?);
    }
    Ok(Value::Array(payload))
}

pub fn notes_table(notes: &[Note]) -> String {
    let rows = notes
        .iter()
        .map(|note| NoteRow {
            id: note.id.clone(),
            done: marker(note.completed),
            title: truncate(note.title(), TITLE_WIDTH),
            last_edited: note.last_edited.clone(),
        })
        .collect();
    render_table::<NoteRow>(rows)
}

pub fn note_detail(note: &Note, palette: &Palette) -> String {
    format!(
        "{} {}\n{}\n\n{}",
        marker(note.completed),
        palette.accentize(note.title()),
        palette.mutedize(&format!(
            "{} | created {} | edited {}",
            note.id, note.created_at, note.last_edited
        )),
        note.content
    )
}

pub fn sessions_table(sessions: &[PomodoroSession]) -> String {
    let rows = sessions
        .iter()
        .map(|session| SessionRow {
            completed_at: session.completed_at.clone(),
            task_name: truncate(&session.task_name, TITLE_WIDTH),
            minutes: session.duration_minutes,
            note: session
                .note
                .as_deref()
                .map(|note| truncate(note, TITLE_WIDTH))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    render_table::<SessionRow>(rows)
}

/// One redrawable status line for a running countdown.
pub fn countdown_line(countdown: &Countdown, task_name: &str, palette: &Palette) -> String {
    let filled = ((countdown.progress() * PROGRESS_WIDTH as f64).round() as usize)
        .min(PROGRESS_WIDTH);
    let bar = format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    );
    format!(
        "{} {} {}",
        palette.accentize(&countdown.remaining_display()),
        bar,
        palette.mutedize(task_name)
    )
}

#[cfg(test)]
mod tests {
    use super::{countdown_line, notes_table, sessions_table, task_detail, task_json, tasks_table};
    use flow_core::config::palette_for_theme;
    use flow_core::model::{Note, PomodoroSession, Priority, Task};
    use flow_core::pomodoro::Countdown;

    fn task(id: &str, due: Option<&str>, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("{id} title"),
            note: None,
            priority: Some(Priority::High),
            due_date: due.map(str::to_string),
            completed,
            created_at: "2025-12-20T00:00:00Z".to_string(),
            completed_at: None,
        }
    }

    #[test]
    fn tasks_table_marks_overdue_and_done() {
        let rendered = tasks_table(&[
            task("task-1", Some("2000-01-01T00:00:00Z"), false),
            task("task-2", Some("2999-01-01T00:00:00Z"), false),
            task("task-3", None, true),
        ])
        .unwrap();

        assert!(rendered.contains("PRIORITY"));
        assert!(rendered.contains("2000-01-01T00:00:00Z (overdue)"));
        assert!(!rendered.contains("2999-01-01T00:00:00Z (overdue)"));
        assert!(rendered.contains("[x]"));
        assert!(rendered.contains("high"));
    }

    #[test]
    fn task_detail_lists_every_field() {
        let detail = task_detail(&task("task-1", None, false)).unwrap();
        assert!(detail.contains("ID:        task-1"));
        assert!(detail.contains("Status:    active"));
        assert!(detail.contains("Due:       -"));
    }

    #[test]
    fn task_json_adds_overdue_flag() {
        let value = task_json(&task("task-1", Some("2000-01-01T00:00:00Z"), false)).unwrap();
        assert_eq!(value["id"], "task-1");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["overdue"], true);
    }

    #[test]
    fn notes_table_uses_first_line_as_title() {
        let rendered = notes_table(&[Note {
            id: "note-1".to_string(),
            content: "\n  Groceries\nmilk".to_string(),
            completed: false,
            created_at: "2025-12-20T00:00:00Z".to_string(),
            last_edited: "2025-12-21T00:00:00Z".to_string(),
        }]);
        assert!(rendered.contains("Groceries"));
        assert!(!rendered.contains("milk"));
    }

    #[test]
    fn sessions_table_shows_minutes() {
        let rendered = sessions_table(&[PomodoroSession {
            id: "session-1".to_string(),
            task_name: "Write report".to_string(),
            note: None,
            duration_minutes: 25,
            completed_at: "2025-12-20T10:25:00Z".to_string(),
        }]);
        assert!(rendered.contains("Write report"));
        assert!(rendered.contains("25"));
    }

    #[test]
    fn countdown_line_without_theme_is_plain() {
        let countdown = Countdown::new(1).unwrap();
        let line = countdown_line(&countdown, "focus", &palette_for_theme(None));
        assert_eq!(line, "01:00 [--------------------] focus");
    }
}
