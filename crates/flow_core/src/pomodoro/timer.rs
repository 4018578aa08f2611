use crate::error::AppError;
use std::str::FromStr;

pub const DEFAULT_MINUTES: u32 = 25;
pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 120;

pub fn validate_minutes(minutes: u32) -> Result<u32, AppError> {
    if (MIN_MINUTES..=MAX_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(AppError::invalid_input(format!(
            "duration must be between {MIN_MINUTES} and {MAX_MINUTES} minutes"
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Finished,
}

/// What a single one-second tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Timer is not running; nothing changed.
    Inactive,
    Counting { remaining_secs: u32 },
    /// Reached zero on this tick.
    Finished,
}

/// Keyboard control for a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    /// Pause when running, resume otherwise.
    Toggle,
    /// Back to the full duration, stopped until the next toggle.
    Reset,
    /// New duration in minutes; resets like `Reset`.
    SetMinutes(u32),
}

impl FromStr for TimerControl {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let mut words = lowered.split_whitespace();
        let command = words.next().unwrap_or("");
        let argument = words.next();

        match (command, argument) {
            ("p" | "pause" | "resume" | "toggle" | "", None) => Ok(TimerControl::Toggle),
            ("r" | "reset", None) => Ok(TimerControl::Reset),
            ("m" | "minutes", Some(raw)) => {
                let minutes = raw.parse::<u32>().map_err(|_| {
                    AppError::invalid_input(format!("minutes must be a number, got '{raw}'"))
                })?;
                Ok(TimerControl::SetMinutes(validate_minutes(minutes)?))
            }
            _ => Err(AppError::invalid_input(format!(
                "unknown timer control '{lowered}' (use p to pause/resume, r to reset, m <minutes>)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    minutes: u32,
    remaining_secs: u32,
    status: TimerStatus,
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            minutes: DEFAULT_MINUTES,
            remaining_secs: DEFAULT_MINUTES * 60,
            status: TimerStatus::Idle,
        }
    }
}

impl Countdown {
    pub fn new(minutes: u32) -> Result<Self, AppError> {
        let minutes = validate_minutes(minutes)?;
        Ok(Self {
            minutes,
            remaining_secs: minutes * 60,
            status: TimerStatus::Idle,
        })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    /// Starts or resumes. A finished timer starts over from the full duration.
    pub fn start(&mut self) {
        if self.status == TimerStatus::Finished {
            self.remaining_secs = self.total_secs();
        }
        self.status = TimerStatus::Running;
    }

    pub fn pause(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
        }
    }

    pub fn toggle(&mut self) {
        if self.status == TimerStatus::Running {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn reset(&mut self) {
        self.remaining_secs = self.total_secs();
        self.status = TimerStatus::Idle;
    }

    pub fn apply(&mut self, control: TimerControl) -> Result<(), AppError> {
        match control {
            TimerControl::Toggle => self.toggle(),
            TimerControl::Reset => self.reset(),
            TimerControl::SetMinutes(minutes) => self.set_duration(minutes)?,
        }
        Ok(())
    }

    /// Changes the duration and resets the timer.
    pub fn set_duration(&mut self, minutes: u32) -> Result<(), AppError> {
        self.minutes = validate_minutes(minutes)?;
        self.reset();
        Ok(())
    }

    pub fn tick(&mut self) -> Tick {
        if self.status != TimerStatus::Running {
            return Tick::Inactive;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.status = TimerStatus::Finished;
            Tick::Finished
        } else {
            Tick::Counting {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// Elapsed share of the duration, `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        f64::from(total - self.remaining_secs) / f64::from(total)
    }

    pub fn remaining_display(&self) -> String {
        format_clock(self.remaining_secs)
    }

    fn total_secs(&self) -> u32 {
        self.minutes * 60
    }
}

/// `MM:SS`, minutes are not wrapped into hours.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
