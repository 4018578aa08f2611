use crate::datetime::{
    format_rfc3339, local_offset, now_rfc3339, parse_datetime_input, parse_rfc3339,
};
use crate::error::AppError;
use crate::model::{Priority, Task};
use crate::notify::{ACTION_WAIT, Alert, Notifier, notifier_from_env};
use crate::storage::json_store;
use log::{info, warn};
use std::path::Path;
use std::str::FromStr;
use time::{OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub note: Option<String>,
    pub priority: Option<Priority>,
    /// Raw due date input, see [`parse_datetime_input`].
    pub due: Option<String>,
}

/// Field changes for [`update_task`]. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub note: Option<Option<String>>,
    pub priority: Option<Option<Priority>>,
    pub due: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.note.is_none()
            && self.priority.is_none()
            && self.due.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
    Today,
    Overdue,
}

impl FromStr for TaskFilter {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" | "pending" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            "today" => Ok(Self::Today),
            "overdue" => Ok(Self::Overdue),
            other => Err(AppError::invalid_input(format!(
                "unknown filter '{other}'; expected all|active|completed|today|overdue"
            ))),
        }
    }
}

#[derive(Debug)]
pub struct NotificationOutcome {
    pub tasks: Vec<Task>,
    pub failures: Vec<NotificationFailure>,
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub task_id: String,
    pub error: AppError,
}

pub fn add_task(new_task: &NewTask) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    add_task_with_path(&path, new_task)
}

pub fn update_task(id: &str, patch: &TaskPatch) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    update_task_with_path(&path, id, patch)
}

pub fn toggle_task(id: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    toggle_task_with_path(&path, id)
}

pub fn delete_task(id: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    delete_task_with_path(&path, id)
}

pub fn get_task(id: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    get_task_with_path(&path, id)
}

pub fn list_tasks(filter: TaskFilter) -> Result<Vec<Task>, AppError> {
    let path = json_store::store_path()?;
    let offset = local_offset();
    list_tasks_with_path(&path, filter, OffsetDateTime::now_utc().to_offset(offset))
}

pub fn notify_overdue() -> Result<NotificationOutcome, AppError> {
    let path = json_store::store_path()?;
    let notifier = notifier_from_env()?;
    notify_overdue_with_path(&path, notifier.as_ref(), OffsetDateTime::now_utc())
}

pub fn task_overdue(task: &Task) -> Result<bool, AppError> {
    task_overdue_at(task, OffsetDateTime::now_utc())
}

fn task_overdue_at(task: &Task, now: OffsetDateTime) -> Result<bool, AppError> {
    if task.completed {
        return Ok(false);
    }
    match task.due_date.as_deref() {
        Some(value) => Ok(parse_rfc3339(value, "due_date")? < now),
        None => Ok(false),
    }
}

fn required_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

fn required_title(title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn normalize_due(raw: &str, offset: UtcOffset) -> Result<String, AppError> {
    format_rfc3339(parse_datetime_input(raw, offset)?)
}

fn add_task_with_path(path: &Path, new_task: &NewTask) -> Result<Task, AppError> {
    let title = required_title(&new_task.title)?;
    let due_date = match new_task.due.as_deref() {
        Some(raw) => Some(normalize_due(raw, local_offset())?),
        None => None,
    };

    let task = Task {
        id: format!("task-{}", OffsetDateTime::now_utc().unix_timestamp_nanos()),
        title,
        note: optional_text(new_task.note.as_deref()),
        priority: new_task.priority,
        due_date,
        completed: false,
        created_at: now_rfc3339()?,
        completed_at: None,
    };

    json_store::update_state(path, |state| {
        state.tasks.push(task.clone());
        Ok(())
    })?;
    info!("event=task_add id={}", task.id);

    Ok(task)
}

fn update_task_with_path(path: &Path, id: &str, patch: &TaskPatch) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;
    if patch.is_empty() {
        return Err(AppError::invalid_input("nothing to update"));
    }

    let title = patch.title.as_deref().map(required_title).transpose()?;
    let due_date = match patch.due.as_ref() {
        Some(Some(raw)) => Some(Some(normalize_due(raw, local_offset())?)),
        Some(None) => Some(None),
        None => None,
    };

    let updated = json_store::update_state(path, |state| {
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == trimmed_id)
            .ok_or_else(|| AppError::not_found("task not found"))?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(note) = patch.note.as_ref() {
            task.note = optional_text(note.as_deref());
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = due_date {
            task.due_date = due_date;
        }
        Ok(task.clone())
    })?;
    info!("event=task_update id={}", updated.id);

    Ok(updated)
}

fn toggle_task_with_path(path: &Path, id: &str) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;
    let completed_at = now_rfc3339()?;

    let updated = json_store::update_state(path, |state| {
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == trimmed_id)
            .ok_or_else(|| AppError::not_found("task not found"))?;

        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(completed_at);
        Ok(task.clone())
    })?;
    info!(
        "event=task_toggle id={} completed={}",
        updated.id, updated.completed
    );

    Ok(updated)
}

fn delete_task_with_path(path: &Path, id: &str) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;

    let removed = json_store::update_state(path, |state| {
        let index = state
            .tasks
            .iter()
            .position(|task| task.id == trimmed_id)
            .ok_or_else(|| AppError::not_found("task not found"))?;
        Ok(state.tasks.remove(index))
    })?;
    info!("event=task_delete id={}", removed.id);

    Ok(removed)
}

fn get_task_with_path(path: &Path, id: &str) -> Result<Task, AppError> {
    let trimmed_id = required_id(id)?;

    json_store::load_state(path)?
        .tasks
        .into_iter()
        .find(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("task not found"))
}

fn list_tasks_with_path(
    path: &Path,
    filter: TaskFilter,
    now_local: OffsetDateTime,
) -> Result<Vec<Task>, AppError> {
    let tasks = json_store::load_state(path)?.tasks;
    let mut filtered = filter_tasks(&tasks, filter, now_local)?;
    sort_tasks(&mut filtered)?;
    Ok(filtered)
}

fn filter_tasks(
    tasks: &[Task],
    filter: TaskFilter,
    now_local: OffsetDateTime,
) -> Result<Vec<Task>, AppError> {
    let today = now_local.date();
    let mut filtered = Vec::new();

    for task in tasks {
        let matches = match filter {
            TaskFilter::All => true,
            TaskFilter::Active => !task.completed,
            TaskFilter::Completed => task.completed,
            TaskFilter::Today => match task.due_date.as_deref() {
                Some(value) if !task.completed => {
                    let due = parse_rfc3339(value, "due_date")?;
                    due.to_offset(now_local.offset()).date() <= today
                }
                _ => false,
            },
            TaskFilter::Overdue => task_overdue_at(task, now_local)?,
        };

        if matches {
            filtered.push(task.clone());
        }
    }

    Ok(filtered)
}

/// Orders open tasks before completed ones, then by due date (undated last),
/// then by priority (unset last). Ties keep their stored order.
pub fn sort_tasks(tasks: &mut Vec<Task>) -> Result<(), AppError> {
    let mut keyed = Vec::with_capacity(tasks.len());
    for task in tasks.drain(..) {
        let due = match task.due_date.as_deref() {
            Some(value) => parse_rfc3339(value, "due_date")?.unix_timestamp_nanos(),
            None => i128::MAX,
        };
        let rank = task.priority.map(Priority::rank).unwrap_or(u8::MAX);
        keyed.push(((task.completed, due, rank), task));
    }

    keyed.sort_by_key(|(key, _)| *key);
    tasks.extend(keyed.into_iter().map(|(_, task)| task));
    Ok(())
}

fn notify_overdue_with_path(
    path: &Path,
    notifier: &dyn Notifier,
    now: OffsetDateTime,
) -> Result<NotificationOutcome, AppError> {
    let state = json_store::load_state(path)?;
    let mut notified = Vec::new();
    let mut failures = Vec::new();

    for task in &state.tasks {
        if !task_overdue_at(task, now)? {
            continue;
        }

        let alert = Alert::new("Task overdue", format!("{} ({})", task.title, task.id))
            .with_show_id(task.id.clone());
        match notifier.notify(&alert) {
            Ok(()) => notified.push(task.clone()),
            Err(err) => {
                warn!("event=notify_failed id={} error={}", task.id, err);
                failures.push(NotificationFailure {
                    task_id: task.id.clone(),
                    error: err,
                })
            }
        }
    }

    if !notified.is_empty() {
        notifier.wait_for_actions(ACTION_WAIT);
    }

    Ok(NotificationOutcome {
        tasks: notified,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        NewTask, TaskFilter, TaskPatch, add_task_with_path, delete_task_with_path, filter_tasks,
        get_task_with_path, list_tasks_with_path, notify_overdue_with_path, sort_tasks,
        toggle_task_with_path, update_task_with_path,
    };
    use crate::error::AppError;
    use crate::model::{Priority, Task};
    use crate::notify::{ACTION_WAIT, Alert, Notifier};
    use crate::storage::json_store;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use time::macros::datetime;

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("flow-{nanos}-{file_name}"))
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            note: None,
            priority: None,
            due_date: None,
            completed: false,
            created_at: "2025-12-01T00:00:00Z".to_string(),
            completed_at: None,
        }
    }

    fn seed(path: &PathBuf, tasks: Vec<Task>) {
        json_store::save_state(
            path,
            &json_store::FlowState {
                tasks,
                ..Default::default()
            },
        )
        .unwrap();
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn add_task_rejects_blank_title() {
        let path = temp_path("blank-title.json");
        let err = add_task_with_path(
            &path,
            &NewTask {
                title: "  ".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert!(!path.exists());
    }

    #[test]
    fn add_task_writes_trimmed_fields_to_store() {
        let path = temp_path("add-task.json");
        let task = add_task_with_path(
            &path,
            &NewTask {
                title: "  write report ".to_string(),
                note: Some("   ".to_string()),
                priority: Some(Priority::High),
                due: Some("2025-12-24T09:00:00Z".to_string()),
            },
        )
        .unwrap();
        let loaded = json_store::load_state(&path).unwrap().tasks;
        std::fs::remove_file(&path).ok();

        assert!(task.id.starts_with("task-"));
        assert_eq!(loaded, vec![task.clone()]);
        assert_eq!(task.title, "write report");
        assert_eq!(task.note, None);
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.due_date.as_deref(), Some("2025-12-24T09:00:00Z"));
        assert!(!task.completed);
    }

    #[test]
    fn add_task_rejects_bad_due_date() {
        let path = temp_path("bad-due.json");
        let err = add_task_with_path(
            &path,
            &NewTask {
                title: "demo".to_string(),
                due: Some("soon".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();

        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn update_task_patches_and_clears_fields() {
        let path = temp_path("update-task.json");
        let mut original = task("task-1");
        original.note = Some("old note".to_string());
        original.priority = Some(Priority::Low);
        original.due_date = Some("2025-12-22T09:00:00Z".to_string());
        seed(&path, vec![original]);

        let updated = update_task_with_path(
            &path,
            "task-1",
            &TaskPatch {
                title: Some(" new title ".to_string()),
                note: Some(None),
                priority: Some(Some(Priority::Urgent)),
                due: Some(None),
            },
        )
        .unwrap();
        let loaded = get_task_with_path(&path, "task-1").unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(updated.title, "new title");
        assert_eq!(updated.note, None);
        assert_eq!(updated.priority, Some(Priority::Urgent));
        assert_eq!(updated.due_date, None);
        assert_eq!(loaded, updated);
    }

    #[test]
    fn update_task_rejects_empty_patch_and_blank_title() {
        let path = temp_path("update-reject.json");
        seed(&path, vec![task("task-1")]);

        let empty = update_task_with_path(&path, "task-1", &TaskPatch::default()).unwrap_err();
        let blank = update_task_with_path(
            &path,
            "task-1",
            &TaskPatch {
                title: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        let missing = update_task_with_path(
            &path,
            "task-2",
            &TaskPatch {
                title: Some("x".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        std::fs::remove_file(&path).ok();

        assert_eq!(empty.code(), "invalid_input");
        assert_eq!(blank.code(), "invalid_input");
        assert_eq!(missing.code(), "not_found");
    }

    #[test]
    fn toggle_task_flips_completed_and_stamp() {
        let path = temp_path("toggle-task.json");
        seed(&path, vec![task("task-1")]);

        let done = toggle_task_with_path(&path, "task-1").unwrap();
        let reopened = toggle_task_with_path(&path, "task-1").unwrap();
        std::fs::remove_file(&path).ok();

        assert!(done.completed);
        assert!(done.completed_at.is_some());
        assert!(!reopened.completed);
        assert_eq!(reopened.completed_at, None);
    }

    #[test]
    fn toggle_task_rejects_blank_and_unknown_ids() {
        let path = temp_path("toggle-missing.json");
        seed(&path, vec![task("task-1")]);

        let blank = toggle_task_with_path(&path, " ").unwrap_err();
        let missing = toggle_task_with_path(&path, "task-2").unwrap_err();
        std::fs::remove_file(&path).ok();

        assert_eq!(blank.code(), "invalid_input");
        assert_eq!(missing.code(), "not_found");
    }

    #[test]
    fn delete_task_removes_task() {
        let path = temp_path("delete-task.json");
        seed(&path, vec![task("task-1"), task("task-2")]);

        let removed = delete_task_with_path(&path, "task-1").unwrap();
        let remaining = json_store::load_state(&path).unwrap().tasks;
        std::fs::remove_file(&path).ok();

        assert_eq!(removed.id, "task-1");
        assert_eq!(ids(&remaining), vec!["task-2"]);
    }

    #[test]
    fn delete_task_reports_missing_task() {
        let path = temp_path("delete-missing.json");
        seed(&path, Vec::new());

        let err = delete_task_with_path(&path, "task-1").unwrap_err();
        std::fs::remove_file(&path).ok();

        assert_eq!(err, AppError::not_found("task not found"));
    }

    #[test]
    fn sort_tasks_orders_by_completion_due_date_and_priority() {
        let mut completed = task("completed");
        completed.completed = true;
        completed.due_date = Some("2025-12-01T00:00:00Z".to_string());

        let mut undated_high = task("undated-high");
        undated_high.priority = Some(Priority::High);
        let undated_none = task("undated-none");

        let mut late = task("late");
        late.due_date = Some("2025-12-24T00:00:00Z".to_string());

        let mut early_low = task("early-low");
        early_low.due_date = Some("2025-12-20T00:00:00Z".to_string());
        early_low.priority = Some(Priority::Low);

        let mut early_urgent = task("early-urgent");
        early_urgent.due_date = Some("2025-12-20T01:00:00+01:00".to_string());
        early_urgent.priority = Some(Priority::Urgent);

        let mut tasks = vec![
            completed,
            undated_none,
            undated_high,
            late,
            early_low,
            early_urgent,
        ];
        sort_tasks(&mut tasks).unwrap();

        assert_eq!(
            ids(&tasks),
            vec![
                "early-urgent",
                "early-low",
                "late",
                "undated-high",
                "undated-none",
                "completed"
            ]
        );
    }

    #[test]
    fn sort_tasks_keeps_insertion_order_for_ties() {
        let mut tasks = vec![task("b"), task("a"), task("c")];
        sort_tasks(&mut tasks).unwrap();
        assert_eq!(ids(&tasks), vec!["b", "a", "c"]);
    }

    #[test]
    fn sort_tasks_reports_invalid_due_date() {
        let mut bad = task("bad");
        bad.due_date = Some("not-a-date".to_string());
        let err = sort_tasks(&mut vec![bad]).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn filter_tasks_selects_today_and_overdue() {
        let now = datetime!(2025-12-20 12:00 UTC);

        let mut due_this_morning = task("morning");
        due_this_morning.due_date = Some("2025-12-20T08:00:00Z".to_string());
        let mut due_tonight = task("tonight");
        due_tonight.due_date = Some("2025-12-20T20:00:00Z".to_string());
        let mut due_tomorrow = task("tomorrow");
        due_tomorrow.due_date = Some("2025-12-21T09:00:00Z".to_string());
        let mut finished = task("finished");
        finished.due_date = Some("2025-12-19T09:00:00Z".to_string());
        finished.completed = true;
        let undated = task("undated");

        let tasks = vec![
            due_this_morning,
            due_tonight,
            due_tomorrow,
            finished,
            undated,
        ];

        let today = filter_tasks(&tasks, TaskFilter::Today, now).unwrap();
        assert_eq!(ids(&today), vec!["morning", "tonight"]);

        let overdue = filter_tasks(&tasks, TaskFilter::Overdue, now).unwrap();
        assert_eq!(ids(&overdue), vec!["morning"]);

        let active = filter_tasks(&tasks, TaskFilter::Active, now).unwrap();
        assert_eq!(active.len(), 4);

        let completed = filter_tasks(&tasks, TaskFilter::Completed, now).unwrap();
        assert_eq!(ids(&completed), vec!["finished"]);
    }

    #[test]
    fn filter_today_uses_local_calendar_day() {
        let now = datetime!(2025-12-20 23:30 +02:00);
        let mut after_local_midnight = task("after-midnight");
        after_local_midnight.due_date = Some("2025-12-20T22:30:00Z".to_string());

        let today = filter_tasks(&[after_local_midnight], TaskFilter::Today, now).unwrap();
        assert!(today.is_empty());
    }

    #[test]
    fn list_tasks_filters_then_sorts() {
        let path = temp_path("list-tasks.json");
        let mut low = task("low");
        low.priority = Some(Priority::Low);
        let mut high = task("high");
        high.priority = Some(Priority::High);
        let mut done = task("done");
        done.completed = true;
        seed(&path, vec![done, low, high]);

        let all = list_tasks_with_path(&path, TaskFilter::All, datetime!(2025-12-20 12:00 UTC))
            .unwrap();
        let active =
            list_tasks_with_path(&path, TaskFilter::Active, datetime!(2025-12-20 12:00 UTC))
                .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ids(&all), vec!["high", "low", "done"]);
        assert_eq!(ids(&active), vec!["high", "low"]);
    }

    #[test]
    fn filter_parses_names() {
        assert_eq!("Done".parse::<TaskFilter>().unwrap(), TaskFilter::Completed);
        assert_eq!("overdue".parse::<TaskFilter>().unwrap(), TaskFilter::Overdue);
        assert_eq!(
            "later".parse::<TaskFilter>().unwrap_err().code(),
            "invalid_input"
        );
    }

    struct RecordingNotifier {
        alerts: RefCell<Vec<Alert>>,
        fail_for: Option<String>,
        waits: Cell<u32>,
    }

    impl RecordingNotifier {
        fn new(fail_for: Option<&str>) -> Self {
            Self {
                alerts: RefCell::new(Vec::new()),
                fail_for: fail_for.map(str::to_string),
                waits: Cell::new(0),
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, alert: &Alert) -> Result<(), AppError> {
            if alert.show_id == self.fail_for {
                return Err(AppError::io("notification daemon unavailable"));
            }
            self.alerts.borrow_mut().push(alert.clone());
            Ok(())
        }

        fn wait_for_actions(&self, timeout: Duration) {
            assert_eq!(timeout, ACTION_WAIT);
            self.waits.set(self.waits.get() + 1);
        }
    }

    #[test]
    fn notify_overdue_alerts_open_overdue_tasks_only() {
        let path = temp_path("notify.json");
        let mut overdue = task("overdue");
        overdue.due_date = Some("2025-12-19T09:00:00Z".to_string());
        let mut finished = task("finished");
        finished.due_date = Some("2025-12-19T09:00:00Z".to_string());
        finished.completed = true;
        let mut upcoming = task("upcoming");
        upcoming.due_date = Some("2025-12-21T09:00:00Z".to_string());
        seed(&path, vec![overdue, finished, upcoming, task("undated")]);

        let notifier = RecordingNotifier::new(None);
        let outcome =
            notify_overdue_with_path(&path, &notifier, datetime!(2025-12-20 12:00 UTC)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ids(&outcome.tasks), vec!["overdue"]);
        assert!(outcome.failures.is_empty());
        let alerts = notifier.alerts.borrow();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].show_id.as_deref(), Some("overdue"));
        assert_eq!(alerts[0].action().as_deref(), Some("show:overdue"));
        assert_eq!(notifier.waits.get(), 1);
    }

    #[test]
    fn notify_overdue_skips_waiting_when_nothing_was_sent() {
        let path = temp_path("notify-none.json");
        let mut upcoming = task("upcoming");
        upcoming.due_date = Some("2025-12-21T09:00:00Z".to_string());
        let mut only_failing = task("failing");
        only_failing.due_date = Some("2025-12-19T09:00:00Z".to_string());
        seed(&path, vec![upcoming, only_failing]);

        let notifier = RecordingNotifier::new(Some("failing"));
        let outcome =
            notify_overdue_with_path(&path, &notifier, datetime!(2025-12-20 12:00 UTC)).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(outcome.tasks.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(notifier.waits.get(), 0);
    }

    #[test]
    fn notify_overdue_collects_failures() {
        let path = temp_path("notify-fail.json");
        let mut first = task("first");
        first.due_date = Some("2025-12-19T09:00:00Z".to_string());
        let mut second = task("second");
        second.due_date = Some("2025-12-18T09:00:00Z".to_string());
        seed(&path, vec![first, second]);

        let notifier = RecordingNotifier::new(Some("first"));
        let outcome =
            notify_overdue_with_path(&path, &notifier, datetime!(2025-12-20 12:00 UTC)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ids(&outcome.tasks), vec!["second"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].task_id, "first");
        assert_eq!(outcome.failures[0].error.code(), "io_error");
        assert_eq!(notifier.waits.get(), 1);
    }
}
