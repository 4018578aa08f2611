use crate::error::AppError;
use log::{info, warn};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const APP_NAME: &str = "flow";
/// How long a one-shot command keeps running so an alert's "Open" click still lands.
pub const ACTION_WAIT: Duration = Duration::from_secs(30);
const ACTION_POLL: Duration = Duration::from_millis(100);

/// A desktop notification. `show_id` names a task to open when clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub show_id: Option<String>,
}

impl Alert {
    pub fn new<T: Into<String>, B: Into<String>>(title: T, body: B) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            show_id: None,
        }
    }

    pub fn with_show_id<I: Into<String>>(mut self, id: I) -> Self {
        self.show_id = Some(id.into());
        self
    }

    /// Activation argument for the "Open" button, if any.
    pub fn action(&self) -> Option<String> {
        self.show_id.as_deref().map(activation_argument)
    }
}

pub trait Notifier {
    fn notify(&self, alert: &Alert) -> Result<(), AppError>;

    /// Blocks until alerts sent so far are clicked or dismissed, at most `timeout`.
    fn wait_for_actions(&self, _timeout: Duration) {}
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _alert: &Alert) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var("FLOW_DISABLE_NOTIFICATIONS").is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => Ok(Box::new(NoopNotifier)),
            other => Err(other),
        },
    }
}

const ACTION_PREFIX: &str = "show:";

pub fn activation_argument(task_id: &str) -> String {
    format!("{ACTION_PREFIX}{task_id}")
}

pub fn parse_activation_argument(argument: &str) -> Option<String> {
    argument
        .strip_prefix(ACTION_PREFIX)
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
}

/// Handles an "Open" click: runs `task show <id>` in a new process.
pub fn open_from_alert(task_id: &str) {
    match launch_show(task_id) {
        Ok(()) => info!("event=alert_open id={}", task_id),
        Err(err) => warn!("event=alert_open status=error id={} error={}", task_id, err),
    }
}

/// Joins the listener threads that finish before `timeout`; returns how many did.
pub fn wait_until_finished(handles: Vec<JoinHandle<()>>, timeout: Duration) -> usize {
    let deadline = Instant::now() + timeout;
    let mut pending = handles;
    let mut finished = 0;

    loop {
        let (done, still_running): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(JoinHandle::is_finished);
        for handle in done {
            if handle.join().is_err() {
                warn!("event=alert_listener status=panicked");
            }
            finished += 1;
        }
        pending = still_running;

        if pending.is_empty() || Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(ACTION_POLL);
    }

    if !pending.is_empty() {
        info!("event=alert_wait status=timeout pending={}", pending.len());
    }
    finished
}

pub fn launch_show(task_id: &str) -> Result<(), AppError> {
    let exe = std::env::current_exe().map_err(|err| AppError::io(err.to_string()))?;
    std::process::Command::new(exe)
        .args(["task", "show", task_id])
        .spawn()
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier::default()))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
