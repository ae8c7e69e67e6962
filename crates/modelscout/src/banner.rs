//! Transient message slots that hide themselves after a fixed duration

use std::time::{Duration, Instant};

pub const ERROR_BANNER_DURATION: Duration = Duration::from_secs(5);
pub const SUCCESS_BANNER_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct Banner {
    duration: Duration,
    current: Option<(String, Instant)>,
}

impl Banner {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            current: None,
        }
    }

    /// Show a message, replacing any visible one and restarting the timer
    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        self.current = Some((message.into(), now + self.duration));
    }

    /// The visible message at `now`, if it has not expired
    pub fn message(&self, now: Instant) -> Option<&str> {
        match &self.current {
            Some((message, expires_at)) if now < *expires_at => Some(message.as_str()),
            _ => None,
        }
    }

    /// Forget an expired message
    pub fn tick(&mut self, now: Instant) {
        if matches!(&self.current, Some((_, expires_at)) if now >= *expires_at) {
            self.current = None;
        }
    }
}
