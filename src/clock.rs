//! Synthetic playback position.
//!
//! Playback devices report positions that are late, coarse or missing
//! altogether. The clock instead counts ticks: every tick after the first
//! one since the last reset is exactly one second of playback, however much
//! wall-clock time actually passed.

use std::time::{Duration, SystemTime};

use tokio::time::Instant;

#[derive(Clone, Debug)]
pub struct Clock {
    position: u64,
    last_tick: Option<Instant>,
    updated_at: SystemTime,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: 0,
            last_tick: None,
            updated_at: SystemTime::now(),
        }
    }

    /// Advances the position by one second, or only records the baseline
    /// when this is the first tick since a reset.
    pub fn tick(&mut self, now: Instant) {
        if self.last_tick.is_some() {
            self.position += 1;
            self.updated_at = SystemTime::now();
        }
        self.last_tick = Some(now);
    }

    /// Rewinds to the start for a newly armed track.
    pub fn reset_on_track_start(&mut self) {
        self.set(0);
    }

    /// Jumps to `position` seconds after a seek.
    pub fn reset_on_seek(&mut self, position: u64) {
        self.set(position);
    }

    fn set(&mut self, position: u64) {
        self.position = position;
        self.last_tick = None;
        self.updated_at = SystemTime::now();
    }

    /// Position in whole seconds.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.position)
    }

    /// When the position last changed.
    #[must_use]
    pub fn updated_at(&self) -> SystemTime {
        self.updated_at
    }
}
