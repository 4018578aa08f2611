//! Debounced saving for the note editor.
//!
//! Snapshots are handed to a worker thread. The worker waits until no new
//! snapshot arrived for the quiet period and then saves only the latest one.

use crate::error::AppError;
use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

pub struct Autosaver {
    sender: Option<Sender<String>>,
    worker: Option<JoinHandle<Result<usize, AppError>>>,
}

impl Autosaver {
    /// Starts the worker. `save` runs on the worker thread.
    pub fn spawn<F>(quiet_period: Duration, save: F) -> Self
    where
        F: FnMut(&str) -> Result<(), AppError> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<String>();
        let worker = std::thread::spawn(move || {
            let mut saver = DedupSaver::new(save);
            let mut pending: Option<String> = None;

            loop {
                let Some(snapshot) = pending.take() else {
                    match receiver.recv() {
                        Ok(snapshot) => pending = Some(snapshot),
                        Err(_) => break,
                    }
                    continue;
                };

                match receiver.recv_timeout(quiet_period) {
                    Ok(newer) => pending = Some(newer),
                    Err(RecvTimeoutError::Timeout) => saver.save(snapshot)?,
                    Err(RecvTimeoutError::Disconnected) => {
                        saver.save(snapshot)?;
                        break;
                    }
                }
            }

            Ok(saver.saves)
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Queues a snapshot. Once the worker has stopped on a failed save, that
    /// save's error is returned here.
    pub fn update(&mut self, content: impl Into<String>) -> Result<(), AppError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| AppError::invalid_data("autosave already finished"))?;
        if sender.send(content.into()).is_ok() {
            return Ok(());
        }

        match self.shutdown() {
            Err(err) => Err(err),
            Ok(_) => Err(AppError::io("autosave worker stopped")),
        }
    }

    /// Flushes the pending snapshot and returns how many saves ran.
    pub fn finish(mut self) -> Result<usize, AppError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<usize, AppError> {
        self.sender.take();
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| AppError::io("autosave worker panicked"))?,
            None => Ok(0),
        }
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("event=autosave_drop status=error error={}", err);
        }
    }
}

/// Skips blank snapshots and snapshots equal to the last saved one.
struct DedupSaver<F> {
    save: F,
    last_saved: Option<String>,
    saves: usize,
}

impl<F> DedupSaver<F>
where
    F: FnMut(&str) -> Result<(), AppError>,
{
    fn new(save: F) -> Self {
        Self {
            save,
            last_saved: None,
            saves: 0,
        }
    }

    fn save(&mut self, snapshot: String) -> Result<(), AppError> {
        if snapshot.trim().is_empty() || self.last_saved.as_deref() == Some(snapshot.as_str()) {
            debug!("event=autosave_skip bytes={}", snapshot.len());
            return Ok(());
        }

        (self.save)(&snapshot)?;
        debug!("event=autosave_save bytes={}", snapshot.len());
        self.last_saved = Some(snapshot);
        self.saves += 1;
        Ok(())
    }
}
