use crate::error::AppError;
use crate::notify::{APP_NAME, Alert, Notifier, open_from_alert, parse_activation_argument};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), AppError> {
        let mut toast = Toast::new(Toast::POWERSHELL_APP_ID)
            .title(APP_NAME)
            .text1(&alert.title)
            .text2(&alert.body);

        let action = alert.action();
        if let Some(action) = action.as_deref() {
            toast = toast.add_button("Open", action);
        }

        let show_id = alert.show_id.clone();
        toast
            .on_activated(move |args| {
                let target = args
                    .as_deref()
                    .and_then(parse_activation_argument)
                    .or_else(|| show_id.clone());
                if let Some(id) = target {
                    open_from_alert(&id);
                }
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
