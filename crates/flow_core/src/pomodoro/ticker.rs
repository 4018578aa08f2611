use std::time::Duration;

/// Waits for the next countdown second.
pub trait Ticker {
    fn wait(&mut self);
}

pub struct SleepTicker {
    interval: Duration,
}

impl SleepTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for SleepTicker {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Ticker for SleepTicker {
    fn wait(&mut self) {
        std::thread::sleep(self.interval);
    }
}
