use crate::error::AppError;
use crate::notify::{
    APP_NAME, Alert, Notifier, open_from_alert, parse_activation_argument, wait_until_finished,
};
use notify_rust::Notification;
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;

/// Keeps a listener thread per alert with an "Open" action until the
/// command waits on them.
#[derive(Default)]
pub struct LinuxNotifier {
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl Notifier for LinuxNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.appname(APP_NAME);
        notification.summary(&alert.title);
        notification.body(&alert.body);
        let action = alert.action();
        if let Some(action) = action.as_deref() {
            notification.action(action, "Open");
        }

        let handle = notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        if let Some(task_id) = alert.show_id.clone() {
            let listener = std::thread::spawn(move || {
                handle.wait_for_action(|selected| {
                    let target = parse_activation_argument(selected)
                        .or_else(|| (selected == "default").then(|| task_id.clone()));
                    if let Some(id) = target {
                        open_from_alert(&id);
                    }
                });
            });
            if let Ok(mut listeners) = self.listeners.lock() {
                listeners.push(listener);
            }
        }

        Ok(())
    }

    fn wait_for_actions(&self, timeout: Duration) {
        let listeners = match self.listeners.lock() {
            Ok(mut listeners) => std::mem::take(&mut *listeners),
            Err(_) => return,
        };
        wait_until_finished(listeners, timeout);
    }
}
