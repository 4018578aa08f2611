pub mod autosave;
pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod model;
pub mod note_api;
pub mod notify;
pub mod pomodoro;
pub mod pomodoro_api;
pub mod session;
pub mod storage;
pub mod task_api;
