use crate::datetime::{now_rfc3339, parse_rfc3339};
use crate::error::AppError;
use crate::model::PomodoroSession;
use crate::notify::{Alert, Notifier};
use crate::pomodoro::{Countdown, Tick, Ticker, TimerControl, TimerStatus};
use crate::storage::json_store;
use log::{info, warn};
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};
use time::OffsetDateTime;

pub const DEFAULT_TASK_NAME: &str = "Focus session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub minutes: u32,
    pub task_name: Option<String>,
    pub note: Option<String>,
}

/// Runs a full countdown and records it. `on_tick` sees the timer after every second.
///
/// Controls queued on `controls` are applied before each tick. Once every sender
/// is gone a paused or reset timer resumes, so the session can still finish.
pub fn run_session(
    request: &SessionRequest,
    ticker: &mut dyn Ticker,
    controls: &Receiver<TimerControl>,
    notifier: &dyn Notifier,
    on_tick: impl FnMut(&Countdown),
) -> Result<PomodoroSession, AppError> {
    let path = json_store::store_path()?;
    run_session_with_path(&path, request, ticker, controls, notifier, on_tick)
}

/// Task name for a session started from an existing task.
pub fn task_name_for(task_id: &str) -> Result<String, AppError> {
    Ok(crate::task_api::get_task(task_id)?.title)
}

pub fn history() -> Result<Vec<PomodoroSession>, AppError> {
    let path = json_store::store_path()?;
    history_with_path(&path)
}

pub fn clear_history() -> Result<usize, AppError> {
    let path = json_store::store_path()?;
    clear_history_with_path(&path)
}

fn run_session_with_path(
    path: &Path,
    request: &SessionRequest,
    ticker: &mut dyn Ticker,
    controls: &Receiver<TimerControl>,
    notifier: &dyn Notifier,
    mut on_tick: impl FnMut(&Countdown),
) -> Result<PomodoroSession, AppError> {
    let mut countdown = Countdown::new(request.minutes)?;
    let task_name = request
        .task_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_TASK_NAME)
        .to_string();
    let note = request
        .note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_string);

    info!(
        "event=pomodoro_start minutes={} task={}",
        countdown.minutes(),
        task_name
    );
    countdown.start();
    on_tick(&countdown);
    loop {
        ticker.wait();
        apply_controls(&mut countdown, controls);
        let tick = countdown.tick();
        on_tick(&countdown);
        if tick == Tick::Finished {
            break;
        }
    }

    let session = PomodoroSession {
        id: format!("session-{}", OffsetDateTime::now_utc().unix_timestamp_nanos()),
        task_name,
        note,
        duration_minutes: countdown.minutes(),
        completed_at: now_rfc3339()?,
    };
    json_store::update_state(path, |state| {
        state.sessions.push(session.clone());
        Ok(())
    })?;
    info!(
        "event=pomodoro_complete id={} minutes={}",
        session.id, session.duration_minutes
    );

    let alert = Alert::new(
        "Time's up!",
        format!("Great focus session: {}", session.task_name),
    );
    if let Err(err) = notifier.notify(&alert) {
        warn!("event=notify_failed id={} error={}", session.id, err);
    }

    Ok(session)
}

fn apply_controls(countdown: &mut Countdown, controls: &Receiver<TimerControl>) {
    loop {
        match controls.try_recv() {
            Ok(control) => {
                if let Err(err) = countdown.apply(control) {
                    warn!("event=pomodoro_control status=error error={}", err);
                    continue;
                }
                info!(
                    "event=pomodoro_control control={:?} status={:?} remaining={}",
                    control,
                    countdown.status(),
                    countdown.remaining_secs()
                );
            }
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                if matches!(countdown.status(), TimerStatus::Paused | TimerStatus::Idle) {
                    countdown.start();
                    info!("event=pomodoro_control control=resume reason=input_closed");
                }
                return;
            }
        }
    }
}

fn history_with_path(path: &Path) -> Result<Vec<PomodoroSession>, AppError> {
    let sessions = json_store::load_state(path)?.sessions;
    let mut keyed = Vec::with_capacity(sessions.len());
    for session in sessions {
        let completed = parse_rfc3339(&session.completed_at, "completed_at")?;
        keyed.push((completed, session));
    }
    keyed.sort_by(|(left, _), (right, _)| right.cmp(left));
    Ok(keyed.into_iter().map(|(_, session)| session).collect())
}

fn clear_history_with_path(path: &Path) -> Result<usize, AppError> {
    let removed = json_store::update_state(path, |state| {
        let removed = state.sessions.len();
        state.sessions.clear();
        Ok(removed)
    })?;
    info!("event=pomodoro_clear removed={}", removed);
    Ok(removed)
}
