pub mod ticker;
pub mod timer;

pub use ticker::{SleepTicker, Ticker};
pub use timer::{Countdown, Tick, TimerControl, TimerStatus};
